//! Error views: CAS rejections and HTTP error pages.

use askama::Template;
use axum::http::StatusCode;

/// Inline page shown when the CAS server rejects a ticket.
#[derive(Template)]
#[template(path = "cas_error.html")]
pub struct CasErrorView {
    pub message: String,
}

impl CasErrorView {
    pub fn new(message: &str) -> Self {
        Self { message: message.to_string() }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorView {
    pub status_line: String,
    pub code: String,
    pub message: String,
}

impl ErrorView {
    pub fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status_line: format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or("Error")),
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}
