//! Collaborator interfaces the engine consumes but does not own.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AppError;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => AppError::from(e),
        }
    }
}

/// User/identity store as seen by the credential resolver.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// `None` when no such user exists.
    async fn is_admin(&self, user_id: i64) -> RepositoryResult<Option<bool>>;
}
