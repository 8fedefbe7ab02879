//!
//! Server configuration
//! --------------------
//! Defaults, overridden by environment variables, overridden by CLI flags.

use std::time::Duration;

pub const DEFAULT_HTTP_PORT: u16 = 3001;
pub const DEFAULT_CAS_ADDR: &str = "http://localhost:3000";
pub const DEFAULT_CAS_TIMEOUT_SECS: u64 = 10;
pub const CALLBACK_PATH: &str = "/validateCASLogin";

pub const USAGE: &str = "cas_client\n\nUSAGE:\n  cas_client [--http-port N] [--cas-addr URL] [--service-url URL] [--cas-timeout-secs N] [--cookie-secure|--no-cookie-secure]\n\nOPTIONS:\n  --http-port N           HTTP listen port (env: CAS_CLIENT_HTTP_PORT, default 3001)\n  --cas-addr URL          CAS server base address (env: CAS_CLIENT_CAS_ADDR, default http://localhost:3000)\n  --service-url URL       Callback URL registered with CAS (env: CAS_CLIENT_SERVICE_URL, default http://localhost:<http-port>/validateCASLogin)\n  --cas-timeout-secs N    Timeout for the ticket validation call (env: CAS_CLIENT_CAS_TIMEOUT_SECS, default 10)\n  --cookie-secure [bool]  Mark the session cookie Secure (env: CAS_CLIENT_COOKIE_SECURE). Presence enables; or pass true/false.\n  --no-cookie-secure      Disable the Secure cookie attribute explicitly.\n";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub http_port: u16,
    /// Base address of the CAS server, e.g. `http://localhost:3000`.
    pub cas_addr: String,
    /// Callback URL passed to CAS as `service`.
    pub service_url: String,
    pub cas_timeout_secs: u64,
    pub cookie_secure: bool,
}

pub fn default_service_url(http_port: u16) -> String {
    format!("http://localhost:{}{}", http_port, CALLBACK_PATH)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            cas_addr: DEFAULT_CAS_ADDR.to_string(),
            service_url: default_service_url(DEFAULT_HTTP_PORT),
            cas_timeout_secs: DEFAULT_CAS_TIMEOUT_SECS,
            cookie_secure: false,
        }
    }
}

impl ServerConfig {
    /// Resolve from process arguments and the real environment.
    pub fn from_env_and_args(args: &[String]) -> Self {
        Self::resolve(args, |name| std::env::var(name).ok())
    }

    /// CLI arguments override environment, environment overrides defaults.
    pub fn resolve<F>(args: &[String], env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_http = env("CAS_CLIENT_HTTP_PORT").and_then(|v| v.trim().parse::<u16>().ok());
        let env_cas = env("CAS_CLIENT_CAS_ADDR").filter(|v| !v.trim().is_empty());
        let env_service = env("CAS_CLIENT_SERVICE_URL").filter(|v| !v.trim().is_empty());
        let env_timeout = env("CAS_CLIENT_CAS_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok());
        let env_secure = env("CAS_CLIENT_COOKIE_SECURE").and_then(|v| parse_bool(&v));

        let arg_http = parse_value_arg(args, "--http-port").and_then(|v| v.parse::<u16>().ok());
        let arg_cas = parse_value_arg(args, "--cas-addr");
        let arg_service = parse_value_arg(args, "--service-url");
        let arg_timeout = parse_value_arg(args, "--cas-timeout-secs").and_then(|v| v.parse::<u64>().ok());
        let arg_secure = parse_cookie_secure_arg(args);

        let http_port = arg_http.or(env_http).unwrap_or(DEFAULT_HTTP_PORT);
        Self {
            http_port,
            cas_addr: arg_cas.or(env_cas).unwrap_or_else(|| DEFAULT_CAS_ADDR.to_string()),
            service_url: arg_service.or(env_service).unwrap_or_else(|| default_service_url(http_port)),
            cas_timeout_secs: arg_timeout.or(env_timeout).unwrap_or(DEFAULT_CAS_TIMEOUT_SECS),
            cookie_secure: arg_secure.or(env_secure).unwrap_or(false),
        }
    }

    pub fn cas_timeout(&self) -> Duration {
        Duration::from_secs(self.cas_timeout_secs)
    }
}

pub fn wants_help(args: &[String]) -> bool {
    has_flag(args, "--help") || has_flag(args, "-h")
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Value following `flag`, if any and not itself a flag.
fn parse_value_arg(args: &[String], flag: &str) -> Option<String> {
    let i = args.iter().position(|a| a == flag)?;
    let next = args.get(i + 1)?;
    if next.starts_with("--") { return None; }
    Some(next.clone())
}

fn parse_cookie_secure_arg(args: &[String]) -> Option<bool> {
    let mut i = 0;
    while i < args.len() {
        let a = &args[i];
        if a == "--no-cookie-secure" {
            return Some(false);
        }
        if a == "--cookie-secure" {
            // If next token is present and not another flag, try parse bool; otherwise true
            if let Some(next) = args.get(i + 1) {
                if !next.starts_with('-') {
                    return Some(parse_bool(next).unwrap_or(true));
                }
            }
            return Some(true);
        }
        i += 1;
    }
    None
}
