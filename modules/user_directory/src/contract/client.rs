use async_trait::async_trait;

use crate::contract::{
    error::UserDirectoryError,
    model::{NewUser, User, UserUpdate},
};

/// Public API trait for the user_directory module that other modules can use
#[async_trait]
pub trait UserDirectoryApi: Send + Sync {
    /// Create a new user
    async fn create_user(&self, new_user: NewUser) -> Result<User, UserDirectoryError>;

    /// All users, ordered by ascending id
    async fn list_users(&self) -> Result<Vec<User>, UserDirectoryError>;

    /// Get a user by ID
    async fn get_user(&self, id: i64) -> Result<User, UserDirectoryError>;

    /// Look a user up by exact email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UserDirectoryError>;

    /// Replace name and email of a user
    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User, UserDirectoryError>;

    /// Delete a user by ID
    async fn delete_user(&self, id: i64) -> Result<(), UserDirectoryError>;
}
