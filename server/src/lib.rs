//! HTTP and websocket transport shell.
//!
//! The shell is deliberately thin: it frames byte payloads in and out of a
//! generic [`RpcHandler`] and owns nothing else. `POST /` carries JSON-RPC
//! over HTTP, `GET /` answers with the literal `"JSON-RPC"` banner, and
//! `/ws` upgrades to a websocket whose frames are dispatched through the
//! same handler with a writer handle attached for subscriptions.

use axum::{
    http::{header, Method},
    routing::get,
    Extension, Router,
};
use std::{future::Future, net::SocketAddr};
use tower_http::cors::{Any, CorsLayer};

mod ws;

pub use axum::body::Bytes;
pub use ws::WsSessionHandle;

/// Request handler plugged into the transport.
#[async_trait::async_trait]
pub trait RpcHandler: Clone + Send + Sync + 'static {
    /// Handles one HTTP request body, returning the serialized response.
    async fn on_request(&self, body: Bytes) -> String;

    /// Handles one websocket frame. `session` stays valid after the call
    /// returns and can be retained as a notification writer.
    async fn on_ws_request(&self, body: Bytes, session: WsSessionHandle) -> String;
}

/// Serves `handler` on `addr` over HTTP `/` and websocket `/ws`.
pub fn serve_http_ws<Handler: RpcHandler>(
    addr: SocketAddr,
    handler: Handler,
) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&addr).serve(router(handler).into_make_service())
}

/// Builds the service router; exposed for embedding into an existing
/// server.
pub fn router<Handler: RpcHandler>(handler: Handler) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(http_info).post(http_handle::<Handler>))
        .route("/ws", get(ws::handle_upgrade::<Handler>))
        .layer(Extension(handler))
        .layer(cors)
}

async fn http_info() -> &'static str {
    "JSON-RPC"
}

async fn http_handle<Handler: RpcHandler>(
    Extension(handler): Extension<Handler>,
    body: Bytes,
) -> impl axum::response::IntoResponse {
    let response = handler.on_request(body).await;
    ([(header::CONTENT_TYPE, "application/json")], response)
}
