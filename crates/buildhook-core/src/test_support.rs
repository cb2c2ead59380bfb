//! Local webhook receivers for tests

use std::sync::{
    Arc,
    Mutex,
};
use std::time::Duration;

use axum::extract::{
    Path,
    State,
};
use axum::http::{
    header::CONTENT_TYPE,
    HeaderMap,
    StatusCode,
};
use axum::response::{
    IntoResponse,
    Redirect,
    Response,
};
use axum::routing::{
    get,
    post,
};
use axum::Router;

#[derive(Debug, Clone)]
pub(crate) struct ReceivedRequest {
    pub code: u16,
    pub content_type: Option<String>,
    pub body: String,
}

type Received = Arc<Mutex<Vec<ReceivedRequest>>>;

pub(crate) struct Receiver {
    base_url: String,
    received: Received,
}

impl Receiver {
    /// URL answering with the given status code
    pub fn url(&self, code: u16) -> String {
        format!("{}/hooks/{}", self.base_url, code)
    }

    /// URL that answers long after any test timeout
    pub fn slow_url(&self) -> String {
        format!("{}/slow", self.base_url)
    }

    /// URL answering `303 See Other` towards a page that accepts GET
    pub fn redirect_url(&self) -> String {
        format!("{}/moved", self.base_url)
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }
}

async fn receive(
    State(received): State<Received>, Path(code): Path<u16>, headers: HeaderMap, body: String,
) -> Response {
    received.lock().unwrap().push(ReceivedRequest {
        code,
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_success() {
        status.into_response()
    } else {
        (status, format!("rejected with {code}")).into_response()
    }
}

async fn moved() -> Redirect {
    Redirect::to("/login")
}

async fn login() -> StatusCode {
    StatusCode::OK
}

async fn slow() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(5)).await;
    StatusCode::OK
}

pub(crate) async fn spawn_receiver() -> Receiver {
    let received = Received::default();
    let app = Router::new()
        .route("/hooks/{code}", post(receive))
        .route("/slow", post(slow))
        .route("/moved", post(moved))
        .route("/login", get(login))
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Receiver {
        base_url: format!("http://{addr}"),
        received,
    }
}

/// URL of a port nothing listens on
pub(crate) async fn unused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/hooks")
}
