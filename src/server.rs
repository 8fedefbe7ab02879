//!
//! cas_client HTTP server
//! ----------------------
//! Axum router for the CAS client flow.
//!
//! Responsibilities:
//! - `/` echoes the signed-in identity, or links to `/login`.
//! - `/login` redirects the browser to the CAS login page with our callback.
//! - `/validateCASLogin` exchanges the returned ticket with the CAS server and
//!   signs the browser in.
//! - `/logout` drops the signed-in identity.
//!
//! Session state flows through `session::session_middleware`; handlers only
//! read a `SessionSnapshot` and return a `SessionUpdate`.

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Extension, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;

use crate::cas::{CasClient, ValidationResponse};
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::views::{self, AnonymousView, CasErrorView, WelcomeView};
use crate::session::{self, Identity, SessionSnapshot, SessionStore, SessionUpdate};

pub const LOGOUT_MESSAGE: &str = "Successfully logged out";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cas: CasClient,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let cas = CasClient::new(&config.cas_addr, &config.service_url, config.cas_timeout())
            .context("While creating CAS client")?;
        Ok(Self { cas, sessions: SessionStore::new(config.cookie_secure) })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route("/logout", get(logout))
        .route("/validateCASLogin", get(validate_cas_login))
        .layer(middleware::from_fn_with_state(state.sessions.clone(), session::session_middleware))
        .with_state(state)
}

/// Serve on an already bound listener until the process stops.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "cas_client configuration: http_port={}, cas_addr={}, service_url={}, cas_timeout_secs={}, cookie_secure={}",
        config.http_port, config.cas_addr, config.service_url, config.cas_timeout_secs, config.cookie_secure
    );
    let state = AppState::from_config(&config)?;
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;
    info!("Starting server on {}", addr);
    serve(listener, state).await
}

/// 302 Found; axum's `Redirect` has no 302 constructor.
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

async fn index(Extension(session): Extension<SessionSnapshot>) -> Response {
    match session.identity() {
        Some(identity) => views::render_template(WelcomeView::from(identity)),
        None => views::render_template(AnonymousView),
    }
}

async fn login(State(state): State<AppState>) -> Response {
    found(state.cas.login_url())
}

async fn logout(Extension(session): Extension<SessionSnapshot>) -> Response {
    if let Some(identity) = session.identity() {
        info!(user_email = %identity.user_email, "logout");
    }
    (Extension(SessionUpdate::SignOut), LOGOUT_MESSAGE).into_response()
}

#[derive(Debug, Deserialize)]
struct ValidateQuery {
    ticket: Option<String>,
}

async fn validate_cas_login(
    State(state): State<AppState>,
    query: Result<Query<ValidateQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query.map_err(|e| AppError::user("invalid_query".to_string(), e.body_text()))?;
    let ticket = query
        .ticket
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::user("missing_ticket", "missing required query parameter: ticket"))?;

    match state.cas.validate(ticket).await? {
        ValidationResponse::Rejected { message, .. } => Ok(views::render_template(CasErrorView::new(&message))),
        ValidationResponse::Authenticated { user_email, user_attributes } => {
            let identity = Identity { user_email, user_attributes };
            Ok((Extension(SessionUpdate::SignIn(identity)), found("/".to_string())).into_response())
        }
    }
}
