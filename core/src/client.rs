//! Event resource operations.
//!
//! # Design
//! Each operation is split the same way: a `build_*` method produces an
//! `HttpRequest` without I/O (and is where create validation fails fast),
//! and the async method of the same name sends it through the `Pipeline`
//! and decodes the payload. Every async method returns the decoded body as
//! `serde_json::Value`; `Event::from_payload` turns it into typed data.

use std::sync::Arc;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
use crate::middleware::{AuthMiddleware, DiagnosticMiddleware};
use crate::pipeline::Pipeline;
use crate::session::TokenStore;
use crate::types::{EventId, EventUpdate, ListParams, NewEvent};

const METHOD_OVERRIDE: &str = "_method";

/// Server-side event filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    Active,
    Upcoming,
    Past,
}

impl EventFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventFilter::Active => "active",
            EventFilter::Upcoming => "upcoming",
            EventFilter::Past => "past",
        }
    }
}

/// Async client for the events API.
#[derive(Debug, Clone)]
pub struct EventsClient {
    pipeline: Pipeline,
}

impl EventsClient {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Client with the standard middleware chain: auth, then diagnostics.
    ///
    /// `on_unauthorized` is called with the login path whenever the server
    /// answers 401, after the token has been cleared.
    pub fn with_session<F>(config: ClientConfig, store: Arc<dyn TokenStore>, on_unauthorized: F) -> Result<Self>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let pipeline = Pipeline::new(config)?
            .layer(AuthMiddleware::new(store).on_unauthorized(on_unauthorized))
            .layer(DiagnosticMiddleware::new());
        Ok(Self::new(pipeline))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn build_list_events(&self, params: ListParams) -> HttpRequest {
        let mut request = HttpRequest::new(HttpMethod::Get, self.pipeline.url("/events"));
        request.query = params.into_pairs();
        request
    }

    pub fn build_get_event(&self, id: EventId) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.pipeline.url(&format!("/events/{id}")))
    }

    pub fn build_create_event(&self, input: &NewEvent) -> Result<HttpRequest> {
        let form = create_form(input)?;
        let mut request = HttpRequest::new(HttpMethod::Post, self.pipeline.url("/events"));
        request.body = RequestBody::Multipart(form);
        Ok(request)
    }

    pub fn build_update_event(&self, id: EventId, input: &EventUpdate) -> HttpRequest {
        let mut request =
            HttpRequest::new(HttpMethod::Post, self.pipeline.url(&format!("/events/{id}")));
        request.body = RequestBody::Multipart(update_form(input));
        request
    }

    pub fn build_delete_event(&self, id: EventId) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.pipeline.url(&format!("/events/{id}")))
    }

    pub fn build_filter_events(&self, filter: EventFilter) -> HttpRequest {
        HttpRequest::new(
            HttpMethod::Get,
            self.pipeline
                .url(&format!("/events/filter/{}", filter.as_str())),
        )
    }

    pub async fn list_events(&self, params: ListParams) -> Result<Value> {
        self.send(self.build_list_events(params)).await
    }

    pub async fn get_event(&self, id: EventId) -> Result<Value> {
        self.send(self.build_get_event(id)).await
    }

    /// Validates required fields before anything is sent.
    pub async fn create_event(&self, input: &NewEvent) -> Result<Value> {
        let request = self.build_create_event(input)?;
        self.send(request).await
    }

    pub async fn update_event(&self, id: EventId, input: &EventUpdate) -> Result<Value> {
        self.send(self.build_update_event(id, input)).await
    }

    pub async fn delete_event(&self, id: EventId) -> Result<Value> {
        self.send(self.build_delete_event(id)).await
    }

    pub async fn filter_events(&self, filter: EventFilter) -> Result<Value> {
        self.send(self.build_filter_events(filter)).await
    }

    pub async fn get_active_events(&self) -> Result<Value> {
        self.filter_events(EventFilter::Active).await
    }

    pub async fn get_upcoming_events(&self) -> Result<Value> {
        self.filter_events(EventFilter::Upcoming).await
    }

    pub async fn get_past_events(&self) -> Result<Value> {
        self.filter_events(EventFilter::Past).await
    }

    async fn send(&self, request: HttpRequest) -> Result<Value> {
        let response = self.pipeline.execute(request).await?;
        parse_payload(response)
    }
}

/// Decode a response body; an empty body decodes to `null`.
pub fn parse_payload(response: HttpResponse) -> Result<Value> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Multipart body for a create. Fails when a required field is missing.
pub fn create_form(input: &NewEvent) -> Result<MultipartForm> {
    let missing = input.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let mut form = MultipartForm::new()
        .text("title", text(&input.title))
        .text("description", text(&input.description))
        .text("location", text(&input.location))
        .text("event_date", text(&input.event_date))
        .text("color", text(&input.color))
        .text(
            "is_active",
            input
                .is_active
                .as_ref()
                .map_or(0, |flag| flag.to_wire())
                .to_string(),
        );
    if let Some(image) = &input.image {
        form = form.file("image", image.clone());
    }
    Ok(form)
}

/// Multipart body for an update: present fields only, plus `_method=PUT`.
pub fn update_form(input: &EventUpdate) -> MultipartForm {
    let text_fields = [
        ("title", &input.title),
        ("description", &input.description),
        ("location", &input.location),
        ("event_date", &input.event_date),
        ("color", &input.color),
    ];

    let mut form = MultipartForm::new();
    for (name, value) in text_fields {
        if let Some(value) = value {
            form = form.text(name, value.clone());
        }
    }
    if let Some(flag) = &input.is_active {
        form = form.text("is_active", flag.to_wire().to_string());
    }
    if let Some(image) = &input.image {
        form = form.file("image", image.clone());
    }
    form.text(METHOD_OVERRIDE, "PUT")
}
