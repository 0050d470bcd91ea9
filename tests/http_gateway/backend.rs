use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, put};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use tracknest::{EntryGroup, Session};

/// In-memory stand-in for the groups endpoints.
#[derive(Clone)]
pub struct Backend {
    groups: Arc<Mutex<Vec<EntryGroup>>>,
    detail_updates: Arc<Mutex<Vec<i64>>>,
    bearer: String,
}

impl Backend {
    pub fn groups(&self) -> Vec<EntryGroup> {
        self.groups.lock().unwrap().clone()
    }

    /// Ids updated through `PUT /groups/{id}/details`.
    pub fn detail_updates(&self) -> Vec<i64> {
        self.detail_updates.lock().unwrap().clone()
    }

    fn check(&self, headers: &HeaderMap) -> Result<(), StatusCode> {
        match headers.get(header::AUTHORIZATION) {
            Some(value) if value.to_str().ok() == Some(self.bearer.as_str()) => Ok(()),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}

pub fn token(sub: &str, authorities: &[&str]) -> String {
    let payload = json!({ "sub": sub, "authorities": authorities });
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.signature",
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

pub fn session(sub: &str, authorities: &[&str]) -> Session {
    Session::from_token(token(sub, authorities)).unwrap()
}

async fn list(
    State(backend): State<Backend>,
    headers: HeaderMap,
) -> Result<Json<Vec<EntryGroup>>, StatusCode> {
    backend.check(&headers)?;
    Ok(Json(backend.groups()))
}

async fn search(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<EntryGroup>>, StatusCode> {
    backend.check(&headers)?;
    let field = params.get("field").ok_or(StatusCode::BAD_REQUEST)?;
    let query = params.get("query").ok_or(StatusCode::BAD_REQUEST)?.to_lowercase();
    if field != "name" {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(
        backend
            .groups()
            .into_iter()
            .filter(|g| g.name.to_lowercase().contains(&query))
            .collect(),
    ))
}

async fn create(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(mut group): Json<EntryGroup>,
) -> Result<Json<EntryGroup>, StatusCode> {
    backend.check(&headers)?;
    let mut groups = backend.groups.lock().unwrap();
    group.id = groups.iter().map(|g| g.id).max().unwrap_or(0) + 1;
    groups.push(group.clone());
    Ok(Json(group))
}

async fn update(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(mut group): Json<EntryGroup>,
) -> Result<Json<EntryGroup>, StatusCode> {
    backend.check(&headers)?;
    let mut groups = backend.groups.lock().unwrap();
    let slot = groups
        .iter_mut()
        .find(|g| g.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    group.id = id;
    *slot = group.clone();
    Ok(Json(group))
}

async fn update_details(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(group): Json<EntryGroup>,
) -> Result<Json<EntryGroup>, StatusCode> {
    let updated = update(State(backend.clone()), headers, Path(id), Json(group)).await?;
    backend.detail_updates.lock().unwrap().push(id);
    Ok(updated)
}

async fn delete(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> StatusCode {
    if let Err(status) = backend.check(&headers) {
        return status;
    }
    let mut groups = backend.groups.lock().unwrap();
    let before = groups.len();
    groups.retain(|g| g.id != id);
    if groups.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

/// Bind to port 0 and return the backend with its base URL.
pub async fn start(seed: Vec<EntryGroup>, session: &Session) -> (Backend, String) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let backend = Backend {
        groups: Arc::new(Mutex::new(seed)),
        detail_updates: Arc::new(Mutex::new(Vec::new())),
        bearer: session.bearer(),
    };
    let app = Router::new()
        .route("/api/groups", get(list).post(create))
        .route("/api/groups/search", get(search))
        .route("/api/groups/:id", put(update).delete(delete))
        .route("/api/groups/:id/details", put(update_details))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (backend, format!("http://{addr}/api"))
}
