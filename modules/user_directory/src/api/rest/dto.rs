use serde::{Deserialize, Serialize};

use crate::contract::model::{NewUser, User, UserUpdate};

/// REST DTO for user representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// REST DTO for creating a new user; a client-sent `id` is ignored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserReq {
    pub name: String,
    pub email: String,
}

/// REST DTO for replacing a user's details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserReq {
    pub name: String,
    pub email: String,
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
        }
    }
}

impl From<UpdateUserReq> for UserUpdate {
    fn from(req: UpdateUserReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
        }
    }
}
