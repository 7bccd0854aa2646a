//! Network execution of `HttpRequest` values.
//!
//! A `Transport` only performs I/O: it returns every response it receives,
//! whatever the status, and reports `ApiError::Network` when no response
//! arrived at all. Status interpretation happens in `check_status`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, PartValue, RequestBody};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// `Transport` backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::Config(format!("header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::Config(format!("header value for {name}: {e}")))?;
            headers.insert(name, value);
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(format!("events-core/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.http.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        let is_multipart = matches!(request.body, RequestBody::Multipart(_));
        for (name, value) in &request.headers {
            // reqwest sets the multipart content type with its boundary
            if is_multipart && name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.body(body),
            RequestBody::Multipart(form) => builder.multipart(to_reqwest_form(form)?),
        };

        let response = builder.send().await.map_err(network_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().await.map_err(network_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn network_error(e: reqwest::Error) -> ApiError {
    if e.is_builder() {
        ApiError::Config(e.to_string())
    } else if e.is_timeout() {
        ApiError::Network(format!("request timed out: {e}"))
    } else {
        ApiError::Network(e.to_string())
    }
}

fn to_reqwest_form(form: MultipartForm) -> Result<Form> {
    let mut out = Form::new();
    for part in form.parts {
        out = match part.value {
            PartValue::Text(value) => out.text(part.name, value),
            PartValue::File(file) => {
                let file_part = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.content_type)
                    .map_err(|e| ApiError::Serialization(format!("image content type: {e}")))?;
                out.part(part.name, file_part)
            }
        };
    }
    Ok(out)
}

#[derive(serde::Deserialize)]
struct ValidationBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

/// Map non-2xx statuses to the matching `ApiError` variant.
pub fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    match response.status {
        200..=299 => Ok(response),
        401 => Err(ApiError::Unauthorized {
            body: response.body,
        }),
        404 => Err(ApiError::NotFound {
            body: response.body,
        }),
        422 => {
            let parsed: Option<ValidationBody> = serde_json::from_str(&response.body).ok();
            let (message, errors) = match parsed {
                Some(v) => (
                    v.message.unwrap_or_else(|| "unprocessable entity".to_string()),
                    v.errors,
                ),
                None => ("unprocessable entity".to_string(), BTreeMap::new()),
            };
            Err(ApiError::Validation {
                message,
                errors,
                body: response.body,
            })
        }
        status => Err(ApiError::Http {
            status,
            body: response.body,
        }),
    }
}
