//! Domain types for the events API.
//!
//! # Design
//! `Event` mirrors what the server returns. `NewEvent` and `EventUpdate` are
//! the two input schemas; each has an explicit serializer in `client.rs`
//! mapping its fields onto multipart parts, so no field is discovered at
//! runtime. The server schema is owned by the server: `mock-server` defines
//! its own copy and the integration tests catch drift.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ApiError, Result};

pub type EventId = u64;

/// An event as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: String,
    pub color: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "bool_from_wire")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Event {
    /// Decode an event from a response payload, unwrapping a `{"data": ..}`
    /// envelope when the server uses one.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self> {
        let inner = payload.get("data").unwrap_or(payload);
        serde_json::from_value(inner.clone()).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Decode a list of events, with or without a `{"data": [..]}` envelope.
    pub fn list_from_payload(payload: &serde_json::Value) -> Result<Vec<Self>> {
        let inner = payload.get("data").unwrap_or(payload);
        serde_json::from_value(inner.clone()).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Accepts `true`/`false` as well as `1`/`0` (and their string forms).
/// `null` reads as inactive.
fn bool_from_wire<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<ActiveFlag>::deserialize(deserializer)? {
        Some(ActiveFlag::Text(s)) => s == "1" || s == "true",
        Some(flag) => flag.to_wire() == 1,
        None => false,
    })
}

/// Boolean-like input for `is_active`.
///
/// Only `true`, `"true"` and `1` count as active; everything else is `0` on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActiveFlag {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl ActiveFlag {
    pub fn to_wire(&self) -> u8 {
        match self {
            ActiveFlag::Bool(true) | ActiveFlag::Number(1) => 1,
            ActiveFlag::Text(s) if s == "true" => 1,
            _ => 0,
        }
    }
}

impl Default for ActiveFlag {
    fn default() -> Self {
        ActiveFlag::Bool(false)
    }
}

impl From<bool> for ActiveFlag {
    fn from(value: bool) -> Self {
        ActiveFlag::Bool(value)
    }
}

impl From<i64> for ActiveFlag {
    fn from(value: i64) -> Self {
        ActiveFlag::Number(value)
    }
}

impl From<i32> for ActiveFlag {
    fn from(value: i32) -> Self {
        ActiveFlag::Number(i64::from(value))
    }
}

impl From<&str> for ActiveFlag {
    fn from(value: &str) -> Self {
        ActiveFlag::Text(value.to_string())
    }
}

impl From<String> for ActiveFlag {
    fn from(value: String) -> Self {
        ActiveFlag::Text(value)
    }
}

/// A file to upload as the event image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, inferring its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        Ok(Self {
            file_name,
            content_type: mime_type_for_file(path).to_string(),
            bytes,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn mime_type_for_file(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Input for creating an event.
///
/// Every field except `is_active` is required; `Option` and empty strings
/// are allowed here so that validation can report all missing names at once.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<String>,
    pub color: Option<String>,
    pub image: Option<ImageFile>,
    pub is_active: Option<ActiveFlag>,
}

impl NewEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, v: impl Into<String>) -> Self {
        self.title = Some(v.into());
        self
    }

    pub fn description(mut self, v: impl Into<String>) -> Self {
        self.description = Some(v.into());
        self
    }

    pub fn location(mut self, v: impl Into<String>) -> Self {
        self.location = Some(v.into());
        self
    }

    pub fn event_date(mut self, v: impl Into<String>) -> Self {
        self.event_date = Some(v.into());
        self
    }

    pub fn color(mut self, v: impl Into<String>) -> Self {
        self.color = Some(v.into());
        self
    }

    pub fn image(mut self, v: ImageFile) -> Self {
        self.image = Some(v);
        self
    }

    pub fn is_active(mut self, v: impl Into<ActiveFlag>) -> Self {
        self.is_active = Some(v.into());
        self
    }

    /// Names of required fields that are absent or empty, in schema order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let text = [
            ("title", &self.title),
            ("description", &self.description),
            ("location", &self.location),
            ("event_date", &self.event_date),
            ("color", &self.color),
        ];
        let mut missing: Vec<&'static str> = text
            .into_iter()
            .filter(|(_, v)| v.as_deref().map_or(true, |s| s.trim().is_empty()))
            .map(|(name, _)| name)
            .collect();
        if self.image.as_ref().map_or(true, ImageFile::is_empty) {
            missing.push("image");
        }
        missing
    }
}

/// Partial update; `None` leaves the server value unchanged.
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<String>,
    pub color: Option<String>,
    pub image: Option<ImageFile>,
    pub is_active: Option<ActiveFlag>,
}

impl EventUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, v: impl Into<String>) -> Self {
        self.title = Some(v.into());
        self
    }

    pub fn description(mut self, v: impl Into<String>) -> Self {
        self.description = Some(v.into());
        self
    }

    pub fn location(mut self, v: impl Into<String>) -> Self {
        self.location = Some(v.into());
        self
    }

    pub fn event_date(mut self, v: impl Into<String>) -> Self {
        self.event_date = Some(v.into());
        self
    }

    pub fn color(mut self, v: impl Into<String>) -> Self {
        self.color = Some(v.into());
        self
    }

    pub fn image(mut self, v: ImageFile) -> Self {
        self.image = Some(v);
        self
    }

    pub fn is_active(mut self, v: impl Into<ActiveFlag>) -> Self {
        self.is_active = Some(v.into());
        self
    }
}

/// Query parameters for `list_events`, passed through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pairs: Vec<(String, String)>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}
