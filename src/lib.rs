//! Ethereum-compatible JSON-RPC service over HTTP and websocket.
//!
//! An embedder plugs in a typed backend (chain state, block store,
//! transaction pool, event source) through the [`Blockchain`] trait; the
//! service translates wire-level JSON-RPC calls into backend operations,
//! manages long-lived client filters driven by chain events, and streams
//! notifications to websocket peers.
//!
//! [`spawn`] wires everything together:
//!
//! ```rust,ignore
//! let handle = bellows::spawn(RpcConfig::default(), backend).await;
//! println!("listening on {}", handle.http_endpoint());
//! ```

mod config;
mod server;

pub mod chain;
pub mod dispatcher;
pub mod error;
pub mod eth;
pub mod filter;
pub mod net;
pub mod web3;

pub use chain::Blockchain;
pub use config::RpcConfig;
pub use dispatcher::{DispatchError, Dispatcher, Namespace};
pub use error::ApiError;
pub use eth::Eth;
pub use filter::FilterManager;
pub use net::{Net, NetBackend};
pub use web3::{Web3, Web3Backend};

use std::{net::SocketAddr, sync::Arc};
use tokio::task::JoinHandle;

/// Full backend surface needed by [`spawn`]: the chain capability
/// interface plus the `net`/`web3` facade seams.
pub trait FullBackend: Blockchain + NetBackend + Web3Backend {}

impl<T: Blockchain + NetBackend + Web3Backend> FullBackend for T {}

/// Builds the dispatcher, starts the filter manager and serves the RPC
/// endpoints, returning a handle to the running service.
pub async fn spawn<B: FullBackend>(config: RpcConfig, backend: Arc<B>) -> RpcHandle {
    let filters = Arc::new(FilterManager::new(backend.clone(), config.filter_timeout));
    let filter_task = tokio::spawn(Arc::clone(&filters).run());

    let eth = Arc::new(Eth::new(backend.clone(), Arc::clone(&filters)));
    let net = Arc::new(Net::new(backend.clone()));
    let web3 = Arc::new(Web3::new(backend.clone()));

    let mut dispatcher = Dispatcher::default().with_filter_manager(filters);
    dispatcher.register("eth", eth::namespace(eth));
    dispatcher.register("net", net::namespace(net));
    dispatcher.register("web3", web3::namespace(web3));

    let addr = config.addr;
    let service = server::RpcService::new(Arc::new(dispatcher));
    let server_task = tokio::spawn(bellows_server::serve_http_ws(addr, service));

    tracing::info!(target: "rpc", %addr, "rpc server started");

    RpcHandle { addr, server: server_task, filters: filter_task }
}

/// Handle to a spawned RPC service.
pub struct RpcHandle {
    addr: SocketAddr,
    server: JoinHandle<hyper::Result<()>>,
    filters: JoinHandle<()>,
}

impl RpcHandle {
    /// The address the server is bound to.
    pub fn socket_address(&self) -> &SocketAddr {
        &self.addr
    }

    /// The HTTP endpoint.
    pub fn http_endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The websocket endpoint.
    pub fn ws_endpoint(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Aborts the server and the filter manager's event loop.
    pub fn shutdown(&self) {
        self.server.abort();
        self.filters.abort();
    }
}
