//! Application services orchestrating domain logic and persistence adapters.

pub mod comments;
pub mod error;
pub mod feed;
pub mod follows;
pub mod front_page;
pub mod groups;
pub mod identity;
pub mod pagination;
pub mod posts;
pub mod repos;
