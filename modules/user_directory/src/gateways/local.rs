use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::UserDirectoryApi,
    error::UserDirectoryError,
    model::{NewUser, User, UserUpdate},
};
use crate::domain::service::Service;

/// Local implementation of the UserDirectoryApi trait that delegates to the domain service
pub struct UserDirectoryLocalClient {
    service: Arc<Service>,
}

impl UserDirectoryLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl UserDirectoryApi for UserDirectoryLocalClient {
    async fn create_user(&self, new_user: NewUser) -> Result<User, UserDirectoryError> {
        self.service.create_user(new_user).await.map_err(Into::into)
    }

    async fn list_users(&self) -> Result<Vec<User>, UserDirectoryError> {
        self.service.list_users().await.map_err(Into::into)
    }

    async fn get_user(&self, id: i64) -> Result<User, UserDirectoryError> {
        self.service.get_user(id).await.map_err(Into::into)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UserDirectoryError> {
        self.service
            .find_user_by_email(email)
            .await
            .map_err(Into::into)
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User, UserDirectoryError> {
        self.service
            .update_user(id, update)
            .await
            .map_err(Into::into)
    }

    async fn delete_user(&self, id: i64) -> Result<(), UserDirectoryError> {
        self.service.delete_user(id).await.map_err(Into::into)
    }
}
