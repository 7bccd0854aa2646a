//! HTTP request and response types as plain data.
//!
//! # Design
//! `EventsClient` builds `HttpRequest` values without touching the network;
//! the pipeline hands them to a `Transport` for the actual I/O. Keeping the
//! request a plain value lets middlewares mutate it and lets tests inspect
//! exactly what would go on the wire, multipart fields included.

use crate::types::ImageFile;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    File(ImageFile),
}

/// A named multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

/// An ordered `multipart/form-data` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            value: PartValue::Text(value.into()),
        });
        self
    }

    pub fn file(mut self, name: &str, file: ImageFile) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            value: PartValue::File(file),
        });
        self
    }

    /// First text value stored under `name`.
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match &p.value {
            PartValue::Text(v) if p.name == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// First file stored under `name`.
    pub fn file_value(&self, name: &str) -> Option<&ImageFile> {
        self.parts.iter().find_map(|p| match &p.value {
            PartValue::File(f) if p.name == name => Some(f),
            _ => None,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(String),
    Multipart(MultipartForm),
}

impl RequestBody {
    pub fn as_multipart(&self) -> Option<&MultipartForm> {
        match self {
            RequestBody::Multipart(form) => Some(form),
            _ => None,
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute; `EventsClient` joins the configured base URL with the
/// resource path when building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost/events");
        req.set_header("authorization", "Bearer a");
        req.set_header("Authorization", "Bearer b");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer b"));
    }

    #[test]
    fn multipart_lookup_distinguishes_text_and_file() {
        let image = ImageFile::new("a.png", "image/png", vec![1, 2, 3]);
        let form = MultipartForm::new()
            .text("title", "Launch")
            .file("image", image.clone());
        assert_eq!(form.text_value("title"), Some("Launch"));
        assert_eq!(form.text_value("image"), None);
        assert_eq!(form.file_value("image"), Some(&image));
        assert_eq!(form.names(), vec!["title", "image"]);
        assert!(!form.contains("_method"));
    }
}
