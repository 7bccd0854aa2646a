//! Async API client for the events service.
//!
//! # Overview
//! `EventsClient` exposes list/get/create/update/delete and the
//! active/upcoming/past filters. Requests are built as plain data
//! (`HttpRequest`) and run through a `Pipeline`: an ordered middleware
//! chain wrapped around a `Transport`.
//!
//! # Design
//! - Every `build_*` method is pure, so request shapes (multipart fields,
//!   the `_method=PUT` override, validation failures) are testable without
//!   a network.
//! - Auth state lives in an injected `TokenStore`; a 401 clears it and
//!   fires a caller-supplied callback instead of navigating anywhere.
//! - Operations return the decoded response body (`serde_json::Value`).
//!   `Event::from_payload` gives typed access.
//!
//! ```ignore
//! use std::sync::Arc;
//! use events_core::{ClientConfig, EventsClient, ListParams, MemoryTokenStore};
//!
//! let store = Arc::new(MemoryTokenStore::with_token("secret"));
//! let client = EventsClient::with_session(ClientConfig::from_env()?, store, |login| {
//!     println!("session expired, go to {login}");
//! })?;
//! let events = client.list_events(ListParams::new()).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod pipeline;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{EventFilter, EventsClient};
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, PartValue, RequestBody};
pub use middleware::{AuthMiddleware, DiagnosticMiddleware, Middleware, LOGIN_PATH};
pub use pipeline::Pipeline;
pub use session::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{ActiveFlag, Event, EventId, EventUpdate, ImageFile, ListParams, NewEvent};
