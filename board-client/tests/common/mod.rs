#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use board_client::{BoardClient, Member, MemorySessionStore, Session};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub uri: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("recorded body must be json")
    }
}

/// Заглушка backend: отвечает заранее заданным статусом и телом по паре
/// (метод, путь) и запоминает все входящие запросы.
#[derive(Clone, Default)]
pub struct StubBackend {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .expect("stub lock")
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    pub async fn start(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("stub must bind");
        let addr = listener.local_addr().expect("stub must have address");
        let app = Router::new().fallback(handle).with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server failed");
        });
        format!("http://{addr}")
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("stub lock").clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests()
            .pop()
            .expect("at least one request must be recorded")
    }
}

async fn handle(
    State(stub): State<StubBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    stub.requests.lock().expect("stub lock").push(Recorded {
        method: method.to_string(),
        uri: uri.to_string(),
        authorization: header(AUTHORIZATION),
        content_type: header(CONTENT_TYPE),
        body,
    });

    let (status, body) = stub
        .responses
        .lock()
        .expect("stub lock")
        .get(&(method.to_string(), uri.path().to_string()))
        .cloned()
        .unwrap_or((404, "{}".to_string()));

    let status = StatusCode::from_u16(status).expect("valid status");
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, [(CONTENT_TYPE, "application/json")], body).into_response()
}

pub fn member(id: i64, username: &str) -> Member {
    Member {
        id,
        username: username.to_string(),
        email: None,
    }
}

pub fn logged_in_store(token: &str, user: Member) -> MemorySessionStore {
    MemorySessionStore::with_session(Session::new(token, user).expect("valid session"))
}

pub fn client(base_url: &str, store: &MemorySessionStore) -> BoardClient {
    BoardClient::new(base_url, Arc::new(store.clone())).expect("client must build")
}

/// Адрес, на котором гарантированно никто не слушает.
pub async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener must bind");
    let addr = listener.local_addr().expect("listener must have address");
    drop(listener);
    format!("http://{addr}")
}
