use sea_orm::{ActiveValue::NotSet, Set};

use crate::contract::model::{NewUser, User};
use crate::infra::storage::entity::{ActiveModel as UserAM, Model as UserEntity};

impl From<UserEntity> for User {
    fn from(e: UserEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            email: e.email,
        }
    }
}

/// Insert model: the id is left to the auto-increment column.
pub fn new_user_to_active(u: NewUser) -> UserAM {
    UserAM {
        id: NotSet,
        name: Set(u.name),
        email: Set(u.email),
    }
}

/// Full replacement keyed by `u.id`.
pub fn user_to_active(u: User) -> UserAM {
    UserAM {
        id: Set(u.id),
        name: Set(u.name),
        email: Set(u.email),
    }
}
