//! The configured HTTP pipeline shared by every resource operation.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::middleware::Middleware;
use crate::transport::{check_status, ReqwestTransport, Transport};

/// Transport plus an ordered middleware chain.
///
/// Cheap to clone; clones share the transport and middlewares.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    /// Pipeline over a reqwest transport built from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            middlewares: Vec::new(),
        }
    }

    /// Append a middleware. Request hooks run in insertion order, response
    /// hooks in reverse.
    pub fn layer(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    /// Run a request through the middlewares and the transport.
    pub async fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        for middleware in &self.middlewares {
            middleware.on_request(&mut request)?;
        }

        let outcome = self
            .transport
            .send(request.clone())
            .await
            .and_then(check_status);

        self.middlewares
            .iter()
            .rev()
            .fold(outcome, |outcome, middleware| {
                middleware.on_response(&request, outcome)
            })
    }

    pub async fn get(&self, path: &str, query: Vec<(String, String)>) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(HttpMethod::Get, self.url(path));
        request.query = query;
        self.execute(request).await
    }

    pub async fn post(&self, path: &str, body: RequestBody) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(HttpMethod::Post, self.url(path));
        request.body = body;
        self.execute(request).await
    }

    pub async fn put(&self, path: &str, body: RequestBody) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(HttpMethod::Put, self.url(path));
        request.body = body;
        self.execute(request).await
    }

    pub async fn delete(&self, path: &str) -> Result<HttpResponse> {
        self.execute(HttpRequest::new(HttpMethod::Delete, self.url(path)))
            .await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}
