use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Content type of every error body.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Error returned by REST handlers: a status plus a human-readable message,
/// rendered as the plain-text body `Error: <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextErrorResponse {
    pub status: StatusCode,
    pub message: String,
}

impl TextErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Exact body text sent to the client.
    pub fn body(&self) -> String {
        format!("Error: {}", self.message)
    }
}

impl std::fmt::Display for TextErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.body())
    }
}

impl IntoResponse for TextErrorResponse {
    fn into_response(self) -> Response {
        let body = self.body();
        let mut resp = (self.status, body).into_response();
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(TEXT_PLAIN_UTF8),
        );
        resp
    }
}

pub fn bad_request(message: impl Into<String>) -> TextErrorResponse {
    TextErrorResponse::new(StatusCode::BAD_REQUEST, message)
}

pub fn not_found(message: impl Into<String>) -> TextErrorResponse {
    TextErrorResponse::new(StatusCode::NOT_FOUND, message)
}

pub fn conflict(message: impl Into<String>) -> TextErrorResponse {
    TextErrorResponse::new(StatusCode::CONFLICT, message)
}

/// Details belong in the logs; the client only sees a generic message.
pub fn internal_error() -> TextErrorResponse {
    TextErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn renders_plain_text_with_prefix() {
        let resp = conflict("Email already exists").into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let ct = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert_eq!(ct, TEXT_PLAIN_UTF8);
        assert_eq!(body_text(resp).await, "Error: Email already exists");
    }

    #[test]
    fn convenience_constructors() {
        assert_eq!(bad_request("x").status, StatusCode::BAD_REQUEST);
        assert_eq!(not_found("x").status, StatusCode::NOT_FOUND);
        assert_eq!(conflict("x").status, StatusCode::CONFLICT);

        let internal = internal_error();
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.body(), "Error: Internal server error");
    }

    #[test]
    fn display_includes_status_and_body() {
        assert_eq!(
            not_found("User not found with id: 9").to_string(),
            "404 Error: User not found with id: 9"
        );
    }
}
