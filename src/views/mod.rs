//! View models for the HTML pages.
//!
//! Handlers never build markup themselves: each page is an askama template
//! under `templates/`, and every interpolated value is HTML-escaped by the
//! template engine.

pub mod home;
pub mod error;

pub use home::{AnonymousView, WelcomeView};
pub use error::{CasErrorView, ErrorView};

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Render a template, falling back to a plain-text 500 when rendering fails.
pub fn render_template<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template rendering failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "template rendering error").into_response()
        }
    }
}

/// Error page carrying `status`.
pub fn render_error(status: StatusCode, code: &str, message: &str) -> Response {
    let mut resp = render_template(ErrorView::new(status, code, message));
    if resp.status().is_success() {
        *resp.status_mut() = status;
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Template)]
    #[template(source = "<p>Test: {{ value }}</p>", ext = "html")]
    struct TestTemplate {
        value: String,
    }

    #[tokio::test]
    async fn render_template_escapes_values() {
        let response = render_template(TestTemplate { value: "<b>hi</b>".to_string() });
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("&lt;b&gt;hi"));
        assert!(!body.contains("<b>"));
    }

    #[test]
    fn render_error_keeps_status() {
        let response = render_error(StatusCode::BAD_GATEWAY, "cas_unreachable", "down");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
