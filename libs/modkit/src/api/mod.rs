pub mod text_error;

pub use text_error::{TextErrorResponse, TEXT_PLAIN_UTF8};
