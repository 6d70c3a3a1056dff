//! Stand-in for the Xome API that reproduces its inconsistent response shapes.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, delete, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Header the real API uses to report its version.
pub const API_VERSION_HEADER: &str = "xome-api-version";

pub const API_VERSION: &str = "v1.0";

/// Request details reflected back by `/echo`.
#[derive(Debug, Serialize)]
pub struct Echo {
    pub method: String,
    pub query: BTreeMap<String, String>,
    pub content_type: Option<String>,
    pub body: String,
    pub api_key: Option<String>,
    pub api_username: Option<String>,
    pub authorization: Option<String>,
    pub user_agent: Option<String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/flag", get(flag))
        .route("/listings", post(create_listing))
        .route("/listings/{id}", delete(delete_listing))
        .route("/oauth/access_token", get(access_token))
        .route("/fail", get(fail))
        .route("/text", get(text))
        .route("/slow", get(slow))
        .route("/echo", any(echo))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn ping() -> Response {
    ([(API_VERSION_HEADER, API_VERSION)], Json(json!({"status": "ok"}))).into_response()
}

async fn flag() -> Response {
    json_text(StatusCode::OK, "true")
}

async fn create_listing() -> Response {
    json_text(StatusCode::CREATED, "42")
}

async fn delete_listing(Path(_id): Path<u64>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn access_token() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        "access_token=long-lived-token&expires=5183999",
    )
        .into_response()
}

async fn fail() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": {"message": "bad token", "type": "OAuthException", "code": 190}
        })),
    )
        .into_response()
}

async fn text() -> Response {
    json_text(StatusCode::OK, "\"just a string\"")
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({}))
}

async fn echo(
    method: Method,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: String,
) -> Json<Echo> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(Echo {
        method: method.to_string(),
        query,
        content_type: header_value("content-type"),
        body,
        api_key: header_value("api-key"),
        api_username: header_value("api-username"),
        authorization: header_value("authorization"),
        user_agent: header_value("user-agent"),
    })
}

fn json_text(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
