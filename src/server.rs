//! Glue between the dispatcher and the transport shell.

use crate::{
    dispatcher::{DispatchError, Dispatcher},
    filter::WsConn,
};
use bellows_server::{Bytes, RpcHandler, WsSessionHandle};
use std::{io, sync::Arc};
use tracing::error;

/// [`RpcHandler`] implementation backed by a [`Dispatcher`].
#[derive(Clone)]
pub(crate) struct RpcService {
    dispatcher: Arc<Dispatcher>,
}

impl RpcService {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait::async_trait]
impl RpcHandler for RpcService {
    async fn on_request(&self, body: Bytes) -> String {
        render(self.dispatcher.handle(&body))
    }

    async fn on_ws_request(&self, body: Bytes, session: WsSessionHandle) -> String {
        let conn: Arc<dyn WsConn> = Arc::new(session);
        render(self.dispatcher.handle_ws(&body, &conn))
    }
}

impl WsConn for WsSessionHandle {
    fn write_message(&self, msg: &str) -> io::Result<()> {
        WsSessionHandle::write_message(self, msg)
    }
}

/// Renders a dispatch outcome into the payload written back to the peer:
/// the response on success, a serialized error envelope carrying the
/// request's id on failure.
fn render(outcome: Result<Vec<u8>, DispatchError>) -> String {
    match outcome {
        Ok(response) => String::from_utf8_lossy(&response).into_owned(),
        Err(fail) => serde_json::to_string(&fail.into_response()).unwrap_or_else(|err| {
            error!(target: "rpc", %err, "failed to serialize error response");
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"internal error"}}"#
                .to_string()
        }),
    }
}
