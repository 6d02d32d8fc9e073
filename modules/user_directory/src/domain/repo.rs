use async_trait::async_trait;
use thiserror::Error;

use crate::contract::model::{NewUser, User};

/// Persistence failures the domain distinguishes.
#[derive(Error, Debug)]
pub enum RepoError {
    /// The storage-level unique constraint on `email` fired.
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Persist a new user; storage assigns the id.
    async fn save_new(&self, new_user: NewUser) -> Result<User, RepoError>;
    /// Overwrite an existing user by primary key.
    async fn save(&self, user: User) -> Result<User, RepoError>;
    /// All users, ascending by id.
    async fn find_all(&self) -> Result<Vec<User>, RepoError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn exists_by_email(&self, email: &str) -> Result<bool, RepoError>;
    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError>;
    /// Remove by id; a missing row is not an error.
    async fn delete_by_id(&self, id: i64) -> Result<(), RepoError>;
}
