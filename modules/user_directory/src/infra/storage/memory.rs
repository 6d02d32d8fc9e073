//! In-memory repository: used when no database is configured and in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::contract::model::{NewUser, User};
use crate::domain::repo::{RepoError, UsersRepository};

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    last_id: i64,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// Ids start at 1 and are never reused, like an auto-increment column.
#[derive(Default)]
pub struct InMemoryUsersRepository {
    inner: RwLock<Inner>,
}

impl InMemoryUsersRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepository for InMemoryUsersRepository {
    async fn save_new(&self, new_user: NewUser) -> Result<User, RepoError> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&new_user.email, None) {
            return Err(RepoError::UniqueViolation);
        }
        inner.last_id += 1;
        let user = User {
            id: inner.last_id,
            name: new_user.name,
            email: new_user.email,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.id) {
            return Err(RepoError::Storage(anyhow::anyhow!(
                "save failed: no user with id {}",
                user.id
            )));
        }
        if inner.email_taken(&user.email, Some(user.id)) {
            return Err(RepoError::UniqueViolation);
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<User>, RepoError> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepoError> {
        Ok(self.inner.read().await.email_taken(email, None))
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self.inner.read().await.users.contains_key(&id))
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), RepoError> {
        self.inner.write().await.users.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn assigns_increasing_ids_and_never_reuses_them() {
        let repo = InMemoryUsersRepository::new();
        let a = repo.save_new(new_user("Ann", "ann@x.com")).await.unwrap();
        let b = repo.save_new(new_user("Bo", "bo@x.com")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        repo.delete_by_id(b.id).await.unwrap();
        let c = repo.save_new(new_user("Cy", "cy@x.com")).await.unwrap();
        assert_eq!(c.id, 3);

        let ids: Vec<i64> = repo.find_all().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn enforces_email_uniqueness() {
        let repo = InMemoryUsersRepository::new();
        let ann = repo.save_new(new_user("Ann", "ann@x.com")).await.unwrap();
        let bo = repo.save_new(new_user("Bo", "bo@x.com")).await.unwrap();

        let dup = repo.save_new(new_user("Other", "ann@x.com")).await;
        assert!(matches!(dup, Err(RepoError::UniqueViolation)));

        let steal = repo
            .save(User {
                email: ann.email.clone(),
                ..bo
            })
            .await;
        assert!(matches!(steal, Err(RepoError::UniqueViolation)));

        // Keeping your own email is fine
        let renamed = repo
            .save(User {
                name: "Ann2".into(),
                ..ann.clone()
            })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Ann2");
        assert_eq!(
            repo.find_by_email("ann@x.com").await.unwrap(),
            Some(renamed)
        );
    }

    #[tokio::test]
    async fn save_of_missing_user_is_a_storage_error() {
        let repo = InMemoryUsersRepository::new();
        let res = repo
            .save(User {
                id: 42,
                name: "Ghost".into(),
                email: "ghost@x.com".into(),
            })
            .await;
        assert!(matches!(res, Err(RepoError::Storage(_))));
        assert!(!repo.exists_by_id(42).await.unwrap());
    }
}
