//! Request/response middleware.
//!
//! # Design
//! A `Pipeline` holds an ordered list of middlewares. Before the transport
//! call each middleware's `on_request` runs in list order and may mutate
//! the request or abort it. After the call, the outcome (a 2xx response
//! or an `ApiError`, non-2xx statuses already classified) is threaded
//! through `on_response` in reverse order; a middleware may pass it along,
//! replace it, or recover from an error.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, RequestBody};
use crate::session::TokenStore;

pub const LOGIN_PATH: &str = "/login";

pub trait Middleware: Send + Sync {
    fn on_request(&self, _request: &mut HttpRequest) -> Result<()> {
        Ok(())
    }

    fn on_response(&self, _request: &HttpRequest, outcome: Result<HttpResponse>) -> Result<HttpResponse> {
        outcome
    }
}

/// Callback fired when the server rejects the session. Receives the login path.
pub type UnauthorizedHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Attaches the bearer token and forces a logout on 401.
pub struct AuthMiddleware {
    store: Arc<dyn TokenStore>,
    on_unauthorized: Option<UnauthorizedHandler>,
    login_path: String,
}

impl AuthMiddleware {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            on_unauthorized: None,
            login_path: LOGIN_PATH.to_string(),
        }
    }

    pub fn on_unauthorized<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_unauthorized = Some(Arc::new(handler));
        self
    }

    pub fn login_path(mut self, path: &str) -> Self {
        self.login_path = path.to_string();
        self
    }
}

impl Middleware for AuthMiddleware {
    fn on_request(&self, request: &mut HttpRequest) -> Result<()> {
        if let Some(token) = self.store.token() {
            request.set_header("Authorization", format!("Bearer {token}"));
        }
        Ok(())
    }

    fn on_response(&self, request: &HttpRequest, outcome: Result<HttpResponse>) -> Result<HttpResponse> {
        if let Err(ApiError::Unauthorized { .. }) = &outcome {
            warn!(url = %request.url, "Session rejected, clearing token");
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Failed to clear stored token");
            }
            if let Some(handler) = &self.on_unauthorized {
                handler(&self.login_path);
            }
        }
        outcome
    }
}

/// Observe-only request/response logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiagnosticMiddleware;

impl DiagnosticMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for DiagnosticMiddleware {
    fn on_request(&self, request: &mut HttpRequest) -> Result<()> {
        let body = match &request.body {
            RequestBody::Empty => "empty".to_string(),
            RequestBody::Json(_) => "json".to_string(),
            RequestBody::Multipart(form) => format!("multipart[{}]", form.names().join(",")),
        };
        debug!(
            method = %request.method,
            url = %request.url,
            query = ?request.query,
            body = %body,
            "Sending request"
        );
        Ok(())
    }

    fn on_response(&self, request: &HttpRequest, outcome: Result<HttpResponse>) -> Result<HttpResponse> {
        match &outcome {
            Ok(response) => {
                debug!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status,
                    "Received response"
                );
            }
            Err(ApiError::Validation { message, errors, .. }) => {
                warn!(
                    url = %request.url,
                    message = %message,
                    errors = ?errors,
                    "Validation failed"
                );
            }
            Err(ApiError::Network(reason)) => {
                error!(
                    method = %request.method,
                    url = %request.url,
                    reason = %reason,
                    "Network error: no response received"
                );
            }
            Err(e) => {
                warn!(
                    method = %request.method,
                    url = %request.url,
                    status = ?e.status(),
                    error = %e,
                    "Request failed"
                );
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::http::HttpMethod;
    use crate::session::MemoryTokenStore;

    fn request() -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, "http://localhost/events")
    }

    fn ok() -> Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "[]".to_string(),
        })
    }

    #[test]
    fn auth_attaches_bearer_token() {
        let store = Arc::new(MemoryTokenStore::with_token("abc"));
        let auth = AuthMiddleware::new(store);
        let mut req = request();
        auth.on_request(&mut req).unwrap();
        assert_eq!(req.header("Authorization"), Some("Bearer abc"));
    }

    #[test]
    fn auth_leaves_request_alone_without_token() {
        let auth = AuthMiddleware::new(Arc::new(MemoryTokenStore::new()));
        let mut req = request();
        auth.on_request(&mut req).unwrap();
        assert_eq!(req, request());
    }

    #[test]
    fn auth_clears_token_and_notifies_on_401() {
        let store = Arc::new(MemoryTokenStore::with_token("abc"));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(SeenPath::default());
        let auth = {
            let calls = calls.clone();
            let seen = seen.clone();
            AuthMiddleware::new(store.clone()).on_unauthorized(move |path| {
                calls.fetch_add(1, Ordering::SeqCst);
                seen.set(path);
            })
        };

        let outcome = auth.on_response(
            &request(),
            Err(ApiError::Unauthorized {
                body: "expired".to_string(),
            }),
        );

        assert!(matches!(outcome, Err(ApiError::Unauthorized { ref body }) if body == "expired"));
        assert!(store.token().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.get(), "/login");
    }

    #[test]
    fn auth_reports_custom_login_path() {
        let seen = Arc::new(SeenPath::default());
        let auth = {
            let seen = seen.clone();
            AuthMiddleware::new(Arc::new(MemoryTokenStore::with_token("abc")))
                .login_path("/account/sign-in")
                .on_unauthorized(move |path| seen.set(path))
        };

        let _ = auth.on_response(
            &request(),
            Err(ApiError::Unauthorized {
                body: String::new(),
            }),
        );
        assert_eq!(seen.get(), "/account/sign-in");
    }

    #[test]
    fn auth_ignores_other_errors() {
        let store = Arc::new(MemoryTokenStore::with_token("abc"));
        let calls = Arc::new(AtomicUsize::new(0));
        let auth = {
            let calls = calls.clone();
            AuthMiddleware::new(store.clone()).on_unauthorized(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        let outcome = auth.on_response(
            &request(),
            Err(ApiError::Http {
                status: 403,
                body: String::new(),
            }),
        );
        assert!(matches!(outcome, Err(ApiError::Http { status: 403, .. })));
        assert_eq!(store.token().as_deref(), Some("abc"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn diagnostics_pass_outcomes_through_unchanged() {
        let diag = DiagnosticMiddleware::new();
        let mut req = request();
        diag.on_request(&mut req).unwrap();
        assert_eq!(req, request());

        assert_eq!(diag.on_response(&req, ok()).unwrap(), ok().unwrap());

        let err = diag
            .on_response(&req, Err(ApiError::Network("refused".to_string())))
            .unwrap_err();
        assert!(matches!(err, ApiError::Network(ref r) if r == "refused"));
    }

    /// In-memory sink for formatted log lines.
    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn logged(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    #[test]
    fn diagnostics_log_validation_field_map() {
        let diag = DiagnosticMiddleware::new();
        let mut errors = std::collections::BTreeMap::new();
        errors.insert(
            "title".to_string(),
            vec!["The title field is required.".to_string()],
        );

        let out = logged(|| {
            let _ = diag.on_response(
                &request(),
                Err(ApiError::Validation {
                    message: "The given data was invalid.".to_string(),
                    errors,
                    body: String::new(),
                }),
            );
        });

        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains("Validation failed"), "{out}");
        assert!(out.contains("errors="), "{out}");
        assert!(out.contains("The title field is required."), "{out}");
    }

    #[test]
    fn diagnostics_log_network_failure_distinctly() {
        let diag = DiagnosticMiddleware::new();

        let out = logged(|| {
            let _ = diag.on_response(&request(), Err(ApiError::Network("refused".to_string())));
        });
        assert!(out.contains("ERROR"), "{out}");
        assert!(out.contains("Network error: no response received"), "{out}");
        assert!(out.contains("refused"), "{out}");

        let out = logged(|| {
            let _ = diag.on_response(
                &request(),
                Err(ApiError::Http {
                    status: 500,
                    body: String::new(),
                }),
            );
        });
        assert!(out.contains("Request failed"), "{out}");
        assert!(!out.contains("Network error"), "{out}");
    }

    #[test]
    fn diagnostics_log_request_and_status() {
        let diag = DiagnosticMiddleware::new();
        let out = logged(|| {
            let mut req = request();
            diag.on_request(&mut req).unwrap();
            diag.on_response(&req, ok()).unwrap();
        });
        assert!(out.contains("Sending request"), "{out}");
        assert!(out.contains("url=http://localhost/events"), "{out}");
        assert!(out.contains("status=200"), "{out}");
    }

    #[derive(Default)]
    struct SeenPath(std::sync::Mutex<String>);

    impl SeenPath {
        fn set(&self, path: &str) {
            *self.0.lock().unwrap() = path.to_string();
        }

        fn get(&self) -> String {
            self.0.lock().unwrap().clone()
        }
    }
}
