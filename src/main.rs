use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        comments::CommentService,
        error::AppError,
        feed::FeedService,
        follows::FollowService,
        front_page::FrontPageService,
        groups::{CreateGroupCommand, GroupService},
        identity::IdentityService,
        posts::PostService,
    },
    cache::{CacheConfig, PageCache},
    config::{self, GroupsCommand, UsersCommand},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
        uploads::UploadStorage,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Users(args) => run_users(settings, args.command).await,
        config::Command::Groups(args) => run_groups(settings, args.command).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_http_state(repositories, &settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "yatube::serve",
        addr = %settings.server.addr,
        cache_enabled = settings.cache.enabled,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "yatube::serve", "server stopped");
    Ok(())
}

async fn run_users(settings: config::Settings, command: UsersCommand) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let identity = identity_service(&repositories);

    match command {
        UsersCommand::Create { username } => {
            let user = identity.create_user(&username).await?;
            println!("created user {} (id {})", user.username, user.id);
        }
        UsersCommand::Delete { username } => {
            identity.delete_user(&username).await?;
            println!("deleted user {username}");
        }
        UsersCommand::IssueToken { username, ttl_days } => {
            let ttl = match ttl_days {
                Some(days) => config::session_ttl_from_days(days)
                    .map_err(|err| AppError::unexpected(err.to_string()))?,
                None => settings.auth.session_ttl,
            };
            let issued = identity.issue_session(&username, ttl).await?;
            match issued.expires_at {
                Some(expires_at) => info!(
                    target = "yatube::identity",
                    user_id = issued.user.id,
                    %expires_at,
                    "session token issued"
                ),
                None => warn!(
                    target = "yatube::identity",
                    user_id = issued.user.id,
                    "session token issued without expiry"
                ),
            }
            println!("{}", issued.token);
        }
    }

    Ok(())
}

async fn run_groups(settings: config::Settings, command: GroupsCommand) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let groups = GroupService::new(repositories.clone(), repositories);

    match command {
        GroupsCommand::Create {
            slug,
            title,
            description,
        } => {
            let group = groups
                .create(CreateGroupCommand {
                    slug,
                    title,
                    description,
                })
                .await?;
            println!("created group {} (id {})", group.slug, group.id);
        }
        GroupsCommand::Delete { slug } => {
            groups.delete(&slug).await?;
            println!("deleted group {slug}");
        }
    }

    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn identity_service(repositories: &Arc<PostgresRepositories>) -> IdentityService {
    IdentityService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
    )
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<HttpState, AppError> {
    let uploads = Arc::new(
        UploadStorage::new(settings.uploads.directory.clone())
            .map_err(|err| AppError::from(InfraError::from(err)))?,
    );

    let feed = FeedService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
    );
    let cache = Arc::new(PageCache::new(&CacheConfig::from(&settings.cache)));
    let front_page = FrontPageService::new(feed.clone(), cache);

    let posts = PostService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        uploads.clone(),
    );
    let comments = CommentService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
    );
    let follows = FollowService::new(repositories.clone(), repositories.clone());
    let groups = GroupService::new(repositories.clone(), repositories.clone());
    let identity = identity_service(&repositories);

    Ok(HttpState {
        feed: Arc::new(feed),
        front_page: Arc::new(front_page),
        posts: Arc::new(posts),
        comments: Arc::new(comments),
        follows: Arc::new(follows),
        groups: Arc::new(groups),
        identity: Arc::new(identity),
        uploads,
        upload_limit: settings.uploads.body_limit(),
        cookie_secure: settings.auth.cookie_secure,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target = "yatube::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(target = "yatube::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!(target = "yatube::serve", "shutdown signal received");
}
