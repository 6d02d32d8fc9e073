//! SeaORM-backed repository implementation for the domain port.
//!
//! Generic over `C: ConnectionTrait`, so it can be built over a
//! `DatabaseConnection` or a transaction.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, SqlErr,
};

use crate::contract::model::{NewUser, User};
use crate::domain::repo::{RepoError, UsersRepository};
use crate::infra::storage::entity::{Column, Entity as UserEntity};
use crate::infra::storage::mapper::{new_user_to_active, user_to_active};

/// SeaORM repository impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

/// Unique-index violations are reported separately so the service can answer with a conflict.
fn classify(e: DbErr, op: &'static str) -> RepoError {
    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        RepoError::UniqueViolation
    } else {
        RepoError::Storage(anyhow::Error::new(e).context(format!("{op} failed")))
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn save_new(&self, new_user: NewUser) -> Result<User, RepoError> {
        let m = new_user_to_active(new_user)
            .insert(&self.conn)
            .await
            .map_err(|e| classify(e, "save_new"))?;
        Ok(m.into())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let m = user_to_active(user)
            .update(&self.conn)
            .await
            .map_err(|e| classify(e, "save"))?;
        Ok(m.into())
    }

    async fn find_all(&self) -> Result<Vec<User>, RepoError> {
        let rows = UserEntity::find()
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .map_err(|e| classify(e, "find_all"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let found = UserEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(|e| classify(e, "find_by_id"))?;
        Ok(found.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let found = UserEntity::find()
            .filter(Column::Email.eq(email))
            .one(&self.conn)
            .await
            .map_err(|e| classify(e, "find_by_email"))?;
        Ok(found.map(Into::into))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, RepoError> {
        let count = UserEntity::find()
            .filter(Column::Email.eq(email))
            .count(&self.conn)
            .await
            .map_err(|e| classify(e, "exists_by_email"))?;
        Ok(count > 0)
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError> {
        let count = UserEntity::find_by_id(id)
            .count(&self.conn)
            .await
            .map_err(|e| classify(e, "exists_by_id"))?;
        Ok(count > 0)
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), RepoError> {
        UserEntity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .map_err(|e| classify(e, "delete_by_id"))?;
        Ok(())
    }
}
