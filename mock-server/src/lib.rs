use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

const REQUIRED_FIELDS: [&str; 6] = ["title", "description", "location", "event_date", "color", "image"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: String,
    pub color: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Default)]
struct Store {
    next_id: u64,
    events: BTreeMap<u64, Event>,
}

pub struct AppState {
    store: RwLock<Store>,
    token: Option<String>,
}

pub type Db = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
}

/// API without authentication.
pub fn app() -> Router {
    router(None)
}

/// API that answers 401 unless `Authorization: Bearer <token>` matches.
pub fn app_with_token(token: &str) -> Router {
    router(Some(token.to_string()))
}

fn router(token: Option<String>) -> Router {
    let db: Db = Arc::new(AppState {
        store: RwLock::new(Store::default()),
        token,
    });
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/filter/{kind}", get(filter_events))
        .route(
            "/events/{id}",
            get(get_event).post(update_event).delete(delete_event),
        )
        .layer(middleware::from_fn_with_state(db.clone(), require_token))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

/// Serve `app` on an ephemeral local port in the background.
pub async fn spawn(app: Router) -> Result<SocketAddr, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = serve(listener, app).await {
            tracing::error!(error = %e, "mock server stopped");
        }
    });
    Ok(addr)
}

/// Error response with a Laravel-style JSON body.
#[derive(Debug)]
pub enum ApiFailure {
    NotFound,
    Unauthorized,
    BadRequest(String),
    MethodNotAllowed,
    Validation(BTreeMap<String, Vec<String>>),
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        match self {
            ApiFailure::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({"message": "Event not found"})),
            )
                .into_response(),
            ApiFailure::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Unauthenticated."})),
            )
                .into_response(),
            ApiFailure::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({"message": message}))).into_response()
            }
            ApiFailure::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({"message": "Method not allowed"})),
            )
                .into_response(),
            ApiFailure::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"message": "The given data was invalid.", "errors": errors})),
            )
                .into_response(),
        }
    }
}

async fn require_token(State(db): State<Db>, request: Request, next: Next) -> Response {
    if let Some(expected) = &db.token {
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            tracing::debug!(uri = %request.uri(), "rejecting request without valid token");
            return ApiFailure::Unauthorized.into_response();
        }
    }
    next.run(request).await
}

/// Text fields and the optional image of a multipart submission.
#[derive(Debug, Default)]
struct EventForm {
    text: HashMap<String, String>,
    image: Option<(String, usize)>,
}

impl EventForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiFailure> {
        let mut form = EventForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiFailure::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiFailure::BadRequest(e.to_string()))?;
            match (name.as_str(), file_name) {
                ("image", Some(file_name)) if !bytes.is_empty() => {
                    form.image = Some((file_name, bytes.len()));
                }
                ("image", _) => {}
                _ => {
                    let value = String::from_utf8(bytes.to_vec())
                        .map_err(|_| ApiFailure::BadRequest(format!("{name} is not UTF-8")))?;
                    form.text.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.text
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn is_active(&self) -> Option<bool> {
        self.text
            .get("is_active")
            .map(|v| matches!(v.as_str(), "1" | "true"))
    }

    fn stored_image(&self) -> Option<String> {
        self.image.as_ref().map(|(file_name, _)| {
            let ext = std::path::Path::new(file_name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("bin");
            format!("events/{}.{ext}", Uuid::new_v4())
        })
    }

    fn missing(&self) -> BTreeMap<String, Vec<String>> {
        REQUIRED_FIELDS
            .iter()
            .filter(|name| match **name {
                "image" => self.image.is_none(),
                other => self.field(other).is_none(),
            })
            .map(|name| {
                (
                    name.to_string(),
                    vec![format!("The {} field is required.", name.replace('_', " "))],
                )
            })
            .collect()
    }
}

async fn list_events(State(db): State<Db>, Query(query): Query<ListQuery>) -> Json<Vec<Event>> {
    let store = db.store.read().await;
    let needle = query.search.map(|s| s.to_lowercase());
    Json(
        store
            .events
            .values()
            .filter(|e| {
                needle
                    .as_deref()
                    .map_or(true, |n| e.title.to_lowercase().contains(n))
            })
            .cloned()
            .collect(),
    )
}

async fn create_event(
    State(db): State<Db>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Event>), ApiFailure> {
    let form = EventForm::read(multipart).await?;
    let missing = form.missing();
    if !missing.is_empty() {
        return Err(ApiFailure::Validation(missing));
    }

    let now = Utc::now().to_rfc3339();
    let mut store = db.store.write().await;
    store.next_id += 1;
    let text = |name: &str| form.field(name).unwrap_or_default().to_string();
    let event = Event {
        id: store.next_id,
        title: text("title"),
        description: text("description"),
        location: text("location"),
        event_date: text("event_date"),
        color: text("color"),
        image: form.stored_image(),
        is_active: form.is_active().unwrap_or(false),
        created_at: now.clone(),
        updated_at: now,
    };
    store.events.insert(event.id, event.clone());
    tracing::info!(id = event.id, title = %event.title, "event created");
    Ok((StatusCode::CREATED, Json(event)))
}

async fn get_event(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Event>, ApiFailure> {
    let store = db.store.read().await;
    store.events.get(&id).cloned().map(Json).ok_or(ApiFailure::NotFound)
}

/// `POST /events/{id}` carrying `_method=PUT`.
async fn update_event(
    State(db): State<Db>,
    Path(id): Path<u64>,
    multipart: Multipart,
) -> Result<Json<Event>, ApiFailure> {
    let form = EventForm::read(multipart).await?;
    if form.text.get("_method").map(String::as_str) != Some("PUT") {
        return Err(ApiFailure::MethodNotAllowed);
    }

    let mut store = db.store.write().await;
    let event = store.events.get_mut(&id).ok_or(ApiFailure::NotFound)?;
    for (name, slot) in [
        ("title", &mut event.title),
        ("description", &mut event.description),
        ("location", &mut event.location),
        ("event_date", &mut event.event_date),
        ("color", &mut event.color),
    ] {
        if let Some(value) = form.field(name) {
            *slot = value.to_string();
        }
    }
    if let Some(active) = form.is_active() {
        event.is_active = active;
    }
    if let Some(image) = form.stored_image() {
        event.image = Some(image);
    }
    event.updated_at = Utc::now().to_rfc3339();
    Ok(Json(event.clone()))
}

async fn delete_event(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let mut store = db.store.write().await;
    store.events.remove(&id).ok_or(ApiFailure::NotFound)?;
    Ok(Json(json!({"message": "Event deleted successfully"})))
}

async fn filter_events(
    State(db): State<Db>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<Event>>, ApiFailure> {
    let kind = kind.as_str();
    if !matches!(kind, "active" | "upcoming" | "past") {
        return Err(ApiFailure::NotFound);
    }
    let today = Utc::now().date_naive();
    let keep = |e: &Event| match kind {
        "active" => e.is_active,
        "upcoming" => event_day(e).is_some_and(|d| d >= today),
        _ => event_day(e).is_some_and(|d| d < today),
    };
    let store = db.store.read().await;
    Ok(Json(store.events.values().filter(|e| keep(*e)).cloned().collect()))
}

fn event_day(event: &Event) -> Option<NaiveDate> {
    let date = event.event_date.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
