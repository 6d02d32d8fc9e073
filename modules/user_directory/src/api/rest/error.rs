use axum::extract::rejection::JsonRejection;
use modkit::api::text_error::{bad_request, conflict, internal_error, not_found, TextErrorResponse};
use tracing::error;

use crate::domain::error::DomainError;

/// Map a domain error to the client-visible plain-text response.
pub fn map_domain_error(e: &DomainError) -> TextErrorResponse {
    match e {
        DomainError::UserNotFound { .. } => not_found(e.to_string()),
        DomainError::EmailAlreadyExists { .. } => conflict(e.to_string()),
        DomainError::InvalidEmail { .. } | DomainError::EmptyName | DomainError::NameTooLong { .. } => {
            bad_request(e.to_string())
        }
        DomainError::Database { message } => {
            error!(error = %message, "database failure");
            internal_error()
        }
    }
}

pub fn invalid_body(rejection: &JsonRejection) -> TextErrorResponse {
    bad_request(format!("Invalid request body: {}", rejection.body_text()))
}

/// Path ids are parsed by hand so the raw segment can be echoed back.
pub fn parse_user_id(raw: &str) -> Result<i64, TextErrorResponse> {
    raw.parse::<i64>()
        .map_err(|_| bad_request(format!("Invalid user id: {raw}")))
}
