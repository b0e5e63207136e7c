use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::error::DomainError;
use crate::domain::groups::{validate_slug, validate_title};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("group slug `{0}` is already taken")]
    SlugTaken(String),
    #[error("group `{0}` not found")]
    UnknownGroup(String),
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub slug: String,
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupsRepo>,
    groups_write: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(groups: Arc<dyn GroupsRepo>, groups_write: Arc<dyn GroupsWriteRepo>) -> Self {
        Self {
            groups,
            groups_write,
        }
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create(&self, command: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let slug = command.slug.trim().to_string();
        let title = command.title.trim().to_string();
        validate_slug(&slug)?;
        validate_title(&title)?;

        if self.groups.find_group_by_slug(&slug).await?.is_some() {
            return Err(GroupError::SlugTaken(slug));
        }

        let group = self
            .groups_write
            .create_group(CreateGroupParams {
                slug: slug.clone(),
                title,
                description: command.description.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => GroupError::SlugTaken(slug),
                other => GroupError::Repo(other),
            })?;

        info!(target = "yatube::groups", group_id = group.id, slug = %group.slug, "group created");
        Ok(group)
    }

    /// Remove the group. Its posts stay published without a group.
    pub async fn delete(&self, slug: &str) -> Result<(), GroupError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| GroupError::UnknownGroup(slug.to_string()))?;
        self.groups_write.delete_group(group.id).await?;
        info!(target = "yatube::groups", group_id = group.id, slug = %group.slug, "group deleted");
        Ok(())
    }
}
