use crate::{Bytes, RpcHandler};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use futures::{SinkExt, StreamExt};
use std::io;
use tokio::sync::mpsc;
use tracing::trace;

/// Entrypoint invoked by the axum server for a websocket upgrade request.
pub async fn handle_upgrade<Handler: RpcHandler>(
    ws: WebSocketUpgrade,
    Extension(handler): Extension<Handler>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, handler))
}

/// Cloneable writer half of an established websocket connection.
///
/// Writes are queued onto the connection's send task, so a slow peer never
/// blocks the caller. Once the peer is gone every write fails, which is
/// how subscription owners learn the connection died.
#[derive(Clone, Debug)]
pub struct WsSessionHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl WsSessionHandle {
    /// Queues a text frame for delivery to the peer.
    pub fn write_message(&self, msg: &str) -> io::Result<()> {
        self.tx
            .send(Message::Text(msg.to_string()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "websocket connection closed"))
    }
}

async fn handle_socket<Handler: RpcHandler>(socket: WebSocket, handler: Handler) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // dedicated writer so that responses and subscription notifications
    // share one ordered queue
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let session = WsSessionHandle { tx: tx.clone() };
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            incoming = stream.next() => {
                let Some(Ok(msg)) = incoming else {
                    trace!(target: "rpc::ws", "client disconnected");
                    break;
                };
                let body = match msg {
                    Message::Text(text) => Bytes::from(text.into_bytes()),
                    Message::Binary(data) => Bytes::from(data),
                    Message::Ping(payload) => {
                        let _ = tx.send(Message::Pong(payload));
                        continue;
                    }
                    Message::Close(_) => {
                        trace!(target: "rpc::ws", "ws client disconnected");
                        break;
                    }
                    _ => continue,
                };
                let response = handler.on_ws_request(body, session.clone()).await;
                if tx.send(Message::Text(response)).is_err() {
                    break;
                }
            }
        }
    }
    send_task.abort();
}
