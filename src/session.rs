//! Cookie-identified, in-memory browser sessions.
//!
//! Handlers never touch the store directly. `session_middleware` hands each
//! request an immutable `SessionSnapshot` (request extension) and applies the
//! `SessionUpdate` a handler returns as a response part once it has finished.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{InvalidHeaderValue, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::tprintln;

pub const SESSION_COOKIE: &str = "cas_client_session";

/// Identity handed out by the CAS server for a validated ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_email: String,
    pub user_attributes: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    pub identity: Option<Identity>,
}

/// Read-only view of the caller's session for the duration of one request.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    data: SessionData,
}

impl SessionSnapshot {
    pub fn anonymous() -> Self { Self::default() }

    pub fn identity(&self) -> Option<&Identity> { self.data.identity.as_ref() }

    pub fn is_authenticated(&self) -> bool { self.data.identity.is_some() }
}

/// Session mutation requested by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    SignIn(Identity),
    SignOut,
}

fn gen_id() -> Result<String, getrandom::Error> {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Process-wide session map keyed by session id.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    cookie_secure: bool,
}

impl SessionStore {
    pub fn new(cookie_secure: bool) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), cookie_secure }
    }

    pub fn cookie_secure(&self) -> bool { self.cookie_secure }

    pub fn contains(&self, sid: &str) -> bool {
        self.sessions.read().contains_key(sid)
    }

    pub fn len(&self) -> usize { self.sessions.read().len() }

    pub fn is_empty(&self) -> bool { self.sessions.read().is_empty() }

    pub fn snapshot(&self, sid: Option<&str>) -> SessionSnapshot {
        let Some(sid) = sid else { return SessionSnapshot::anonymous(); };
        match self.sessions.read().get(sid) {
            Some(data) => SessionSnapshot { data: data.clone() },
            None => SessionSnapshot::anonymous(),
        }
    }

    /// Store `identity` under a freshly minted session id, dropping `previous`.
    pub fn sign_in(&self, previous: Option<&str>, identity: Identity) -> Result<String, getrandom::Error> {
        let sid = gen_id()?;
        let user = identity.user_email.clone();
        {
            let mut map = self.sessions.write();
            if let Some(old) = previous {
                map.remove(old);
            }
            map.insert(sid.clone(), SessionData { identity: Some(identity) });
        }
        tprintln!("session.sign_in user={} sid={}", user, sid);
        Ok(sid)
    }

    /// Returns true when a session was removed.
    pub fn sign_out(&self, sid: &str) -> bool {
        let removed = self.sessions.write().remove(sid);
        if let Some(data) = &removed {
            let user = data.identity.as_ref().map(|i| i.user_email.as_str()).unwrap_or("<anonymous>");
            tprintln!("session.sign_out user={} sid={}", user, sid);
        }
        removed.is_some()
    }
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all("cookie").iter() {
        let Ok(s) = cookie.to_str() else { continue; };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k.trim() == name { return Some(v.trim().to_string()); }
            }
        }
    }
    None
}

pub fn set_session_cookie(sid: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Lax; Path=/{}", SESSION_COOKIE, sid, secure))
}

pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; SameSite=Lax; Path=/{}",
        SESSION_COOKIE, secure
    ))
}

/// Load the snapshot before the handler runs, apply its update afterwards.
pub async fn session_middleware(State(store): State<SessionStore>, mut req: Request, next: Next) -> Response {
    // Unknown ids (e.g. from before a restart) are treated as no session at all
    let sid = parse_cookie(req.headers(), SESSION_COOKIE).filter(|sid| store.contains(sid));
    req.extensions_mut().insert(store.snapshot(sid.as_deref()));

    let mut resp = next.run(req).await;
    let Some(update) = resp.extensions_mut().remove::<SessionUpdate>() else { return resp; };

    let cookie = match update {
        SessionUpdate::SignIn(identity) => {
            let user = identity.user_email.clone();
            match store.sign_in(sid.as_deref(), identity) {
                Ok(new_sid) => {
                    info!(target: "session", user_email = %user, "signed in");
                    set_session_cookie(&new_sid, store.cookie_secure())
                }
                Err(e) => {
                    error!(target: "session", "failed to mint session id: {}", e);
                    return AppError::internal("session_error", "failed to create session").into_response();
                }
            }
        }
        SessionUpdate::SignOut => {
            let Some(sid) = sid else {
                debug!(target: "session", "sign out without a session");
                return resp;
            };
            if store.sign_out(&sid) {
                info!(target: "session", "signed out");
            }
            clear_session_cookie(store.cookie_secure())
        }
    };
    match cookie {
        Ok(v) => { resp.headers_mut().append(SET_COOKIE, v); }
        Err(e) => {
            error!(target: "session", "invalid session cookie header: {}", e);
            return AppError::internal("session_error", "failed to encode session cookie").into_response();
        }
    }
    resp
}
