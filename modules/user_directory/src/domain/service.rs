use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::contract::model::{NewUser, User, UserUpdate};
use crate::domain::error::DomainError;
use crate::domain::repo::{RepoError, UsersRepository};

/// Domain service with business rules for user management.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_name_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_name_length: 255,
        }
    }
}

/// Storage failures become `Database`; a unique violation on email becomes a conflict.
fn map_repo_error(e: RepoError, email: &str) -> DomainError {
    match e {
        RepoError::UniqueViolation => {
            warn!("Email uniqueness enforced by storage");
            DomainError::email_already_exists(email.to_string())
        }
        RepoError::Storage(e) => DomainError::database(format!("{e:#}")),
    }
}

fn db_error(e: RepoError) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

impl Service {
    pub fn new(repo: Arc<dyn UsersRepository>, config: ServiceConfig) -> Self {
        Self { repo, config }
    }

    #[instrument(
        name = "user_directory.service.create_user",
        skip(self),
        fields(email = %new_user.email, name = %new_user.name)
    )]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");

        self.validate(&new_user.name, &new_user.email)?;

        // Fast path for the common case; the unique index still decides under races
        if self
            .repo
            .exists_by_email(&new_user.email)
            .await
            .map_err(db_error)?
        {
            return Err(DomainError::email_already_exists(new_user.email));
        }

        let email = new_user.email.clone();
        let user = self
            .repo
            .save_new(new_user)
            .await
            .map_err(|e| map_repo_error(e, &email))?;

        info!("Successfully created user with id={}", user.id);
        Ok(user)
    }

    #[instrument(name = "user_directory.service.list_users", skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        debug!("Listing users");
        let users = self.repo.find_all().await.map_err(db_error)?;
        debug!("Successfully listed {} users", users.len());
        Ok(users)
    }

    #[instrument(name = "user_directory.service.get_user", skip(self), fields(user_id = id))]
    pub async fn get_user(&self, id: i64) -> Result<User, DomainError> {
        debug!("Getting user by id");
        self.repo
            .find_by_id(id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(name = "user_directory.service.find_user_by_email", skip(self))]
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        debug!("Looking up user by email");
        self.repo.find_by_email(email).await.map_err(db_error)
    }

    #[instrument(
        name = "user_directory.service.update_user",
        skip(self, update),
        fields(user_id = id)
    )]
    pub async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User, DomainError> {
        info!("Updating user");

        let mut current = self
            .repo
            .find_by_id(id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| DomainError::user_not_found(id))?;

        self.validate(&update.name, &update.email)?;

        if update.email != current.email
            && self
                .repo
                .exists_by_email(&update.email)
                .await
                .map_err(db_error)?
        {
            return Err(DomainError::email_already_exists(update.email));
        }

        current.name = update.name;
        current.email = update.email;

        let email = current.email.clone();
        let user = self
            .repo
            .save(current)
            .await
            .map_err(|e| map_repo_error(e, &email))?;

        info!("Successfully updated user");
        Ok(user)
    }

    #[instrument(name = "user_directory.service.delete_user", skip(self), fields(user_id = id))]
    pub async fn delete_user(&self, id: i64) -> Result<(), DomainError> {
        info!("Deleting user");

        if !self.repo.exists_by_id(id).await.map_err(db_error)? {
            return Err(DomainError::user_not_found(id));
        }
        self.repo.delete_by_id(id).await.map_err(db_error)?;

        info!("Successfully deleted user");
        Ok(())
    }

    // --- validation helpers ---

    fn validate(&self, name: &str, email: &str) -> Result<(), DomainError> {
        self.validate_name(name)?;
        self.validate_email(email)
    }

    fn validate_name(&self, name: &str) -> Result<(), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::EmptyName);
        }
        let len = name.chars().count();
        if len > self.config.max_name_length {
            return Err(DomainError::name_too_long(len, self.config.max_name_length));
        }
        Ok(())
    }

    fn validate_email(&self, email: &str) -> Result<(), DomainError> {
        if email.trim().is_empty() || !email.contains('@') {
            return Err(DomainError::invalid_email(email.to_string()));
        }
        Ok(())
    }
}
