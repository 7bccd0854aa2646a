//! Client configuration.
//!
//! The backend address is looked up in `EVENTS_API_BACKEND`, first at
//! runtime and then as baked in at build time, falling back to `localhost`.
//! A bare host is expanded into the full API base URL; an address that
//! already carries a scheme is used as the base URL itself.

use std::time::Duration;

use crate::error::{ApiError, Result};

pub const BACKEND_ENV: &str = "EVENTS_API_BACKEND";
pub const DEFAULT_BACKEND: &str = "localhost";
pub const API_PREFIX: &str = "/events-api/public/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration shared by the transport and the resource client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Build a configuration for an explicit base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            default_headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
        })
    }

    /// Build a configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let runtime = std::env::var(BACKEND_ENV).ok();
        let backend = resolve_backend(runtime.as_deref(), option_env!("EVENTS_API_BACKEND"));
        Self::new(&base_url_for_backend(backend))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add or replace a default header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.default_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    /// Join a resource path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Pick the first non-blank backend among the runtime and build-time values.
fn resolve_backend<'a>(runtime: Option<&'a str>, build_time: Option<&'a str>) -> &'a str {
    runtime
        .into_iter()
        .chain(build_time)
        .find(|v| !v.trim().is_empty())
        .unwrap_or(DEFAULT_BACKEND)
}

/// Expand a backend address into the API base URL.
pub fn base_url_for_backend(backend: &str) -> String {
    let backend = backend.trim().trim_end_matches('/');
    if backend.starts_with("http://") || backend.starts_with("https://") {
        backend.to_string()
    } else {
        format!("http://{backend}{API_PREFIX}")
    }
}

fn normalize_base_url(base_url: &str) -> Result<String> {
    let url = base_url.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(ApiError::Config("base URL cannot be empty".into()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ApiError::Config(
            "base URL must start with http:// or https://".into(),
        ));
    }
    Ok(url.to_string())
}
