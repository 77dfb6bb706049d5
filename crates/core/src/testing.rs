//! Local HTTP backend used by the client tests.

use std::{collections::HashMap, net::TcpListener as StdListener, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::{config::ApiConfig, error::RequestError, transport::ApiTransport};

/// Base URL of a port nothing listens on.
pub(crate) fn unreachable_base_url() -> anyhow::Result<String> {
    let listener = StdListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(format!("http://127.0.0.1:{port}/api"))
}

#[derive(Default)]
struct MockData {
    collections: HashMap<String, Vec<Value>>,
    next_id: u64,
    fail: Option<u16>,
    last_authorization: Option<String>,
    password: String,
    profile: Value,
}

type Shared = Arc<Mutex<MockData>>;

/// In-process stand-in for the REST backend.
///
/// Accepts `admin`/`admin123` (token session) and `plain`/`plain123` (bare user).
/// `ghost`/`ghost123` is a driver account that lacks its `driverId`.
pub(crate) struct MockBackend {
    base_url: String,
    data: Shared,
}

impl MockBackend {
    pub(crate) async fn start() -> anyhow::Result<Self> {
        let data: Shared = Arc::new(Mutex::new(MockData {
            password: "admin123".to_string(),
            profile: json!({
                "id": "1",
                "name": "Juan Pérez",
                "email": "admin@etransa.com",
                "role": "admin",
                "phone": "999888777",
                "createdAt": "2024-01-15",
                "lastLogin": "2024-06-01T08:00:00Z"
            }),
            ..MockData::default()
        }));

        let router = Router::new()
            .route("/api/administrador/login", post(login))
            .route("/api/auth/login", post(login))
            .route("/api/profile", get(get_profile).put(put_profile))
            .route("/api/profile/password", put(put_password))
            .route("/api/:collection", get(list).post(create))
            .route(
                "/api/:collection/:id",
                get(fetch).put(update).delete(remove),
            )
            .with_state(Arc::clone(&data));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}/api"),
            data,
        })
    }

    pub(crate) fn config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            timeout_secs: 5,
            ..ApiConfig::default()
        }
    }

    pub(crate) fn transport(&self) -> Result<ApiTransport, RequestError> {
        ApiTransport::new(&self.config())
    }

    /// Answer every later request with `status`.
    pub(crate) fn fail_with(&self, status: u16) {
        self.data.lock().fail = Some(status);
    }

    pub(crate) fn last_authorization(&self) -> Option<String> {
        self.data.lock().last_authorization.clone()
    }

    pub(crate) fn password(&self) -> String {
        self.data.lock().password.clone()
    }
}

/// Records the Authorization header and returns the injected failure, if any.
fn observe(data: &Shared, headers: &HeaderMap) -> Option<Response> {
    let mut data = data.lock();
    data.last_authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    data.fail
        .and_then(|code| StatusCode::from_u16(code).ok())
        .map(IntoResponse::into_response)
}

fn merge_object(target: &mut Value, patch: Value) {
    if let (Some(target), Value::Object(patch)) = (target.as_object_mut(), patch) {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
}

async fn login(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = observe(&data, &headers) {
        return failure;
    }
    let field = |names: [&str; 2]| {
        names
            .iter()
            .find_map(|name| body.get(*name).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string()
    };
    let username = field(["correo", "username"]);
    let password = field(["contrasena", "password"]);
    let expected = data.lock().password.clone();

    match (username.as_str(), password.as_str()) {
        ("admin", given) if given == expected => Json(json!({
            "token": "tok-admin",
            "user": {
                "id": "1",
                "username": "admin",
                "name": "Juan Pérez",
                "email": "admin@etransa.com",
                "role": "admin"
            }
        }))
        .into_response(),
        ("plain", "plain123") => Json(json!({
            "id": "2",
            "username": "plain",
            "name": "María García",
            "email": "readmin@etransa.com",
            "role": "readmin"
        }))
        .into_response(),
        ("ghost", "ghost123") => Json(json!({
            "token": "tok-ghost",
            "user": {
                "id": "9",
                "username": "ghost",
                "name": "Sin Registro",
                "email": "ghost@etransa.com",
                "role": "driver"
            }
        }))
        .into_response(),
        ("garbled", _) => (StatusCode::OK, "<html>ok</html>").into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn get_profile(State(data): State<Shared>, headers: HeaderMap) -> Response {
    if let Some(failure) = observe(&data, &headers) {
        return failure;
    }
    Json(data.lock().profile.clone()).into_response()
}

async fn put_profile(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = observe(&data, &headers) {
        return failure;
    }
    let mut data = data.lock();
    merge_object(&mut data.profile, body);
    Json(data.profile.clone()).into_response()
}

async fn put_password(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = observe(&data, &headers) {
        return failure;
    }
    let mut data = data.lock();
    let current = body.get("currentPassword").and_then(Value::as_str);
    let new = body.get("newPassword").and_then(Value::as_str);
    match (current, new) {
        (Some(current), Some(new)) if current == data.password => {
            data.password = new.to_string();
            StatusCode::NO_CONTENT.into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn list(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(collection): Path<String>,
) -> Response {
    if let Some(failure) = observe(&data, &headers) {
        return failure;
    }
    let records = data
        .lock()
        .collections
        .get(&collection)
        .cloned()
        .unwrap_or_default();
    Json(records).into_response()
}

async fn create(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(collection): Path<String>,
    Json(mut body): Json<Value>,
) -> Response {
    if let Some(failure) = observe(&data, &headers) {
        return failure;
    }
    let mut data = data.lock();
    data.next_id += 1;
    let id = format!("srv{}", data.next_id);
    let mut stamp = json!({ "id": id });
    if collection == "admins" {
        stamp["createdAt"] = json!("2024-03-01");
    }
    merge_object(&mut body, stamp);
    data.collections
        .entry(collection)
        .or_default()
        .push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn fetch(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    if let Some(failure) = observe(&data, &headers) {
        return failure;
    }
    let data = data.lock();
    let found = data
        .collections
        .get(&collection)
        .and_then(|records| records.iter().find(|record| record["id"] == id.as_str()));
    match found {
        Some(record) => Json(record.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = observe(&data, &headers) {
        return failure;
    }
    let mut data = data.lock();
    let found = data
        .collections
        .get_mut(&collection)
        .and_then(|records| records.iter_mut().find(|record| record["id"] == id.as_str()));
    match found {
        Some(record) => {
            merge_object(record, body);
            Json(record.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn remove(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    if let Some(failure) = observe(&data, &headers) {
        return failure;
    }
    let mut data = data.lock();
    let Some(records) = data.collections.get_mut(&collection) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let before = records.len();
    records.retain(|record| record["id"] != id.as_str());
    if records.len() == before {
        StatusCode::NOT_FOUND.into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}
