//! The `net` endpoint.

use crate::{dispatcher::Namespace, error::Result};
use bellows_core::eth::HexU64;
use std::sync::Arc;

/// Backend surface for the `net` namespace.
pub trait NetBackend: Send + Sync + 'static {
    fn chain_id(&self) -> u64;
    fn peer_count(&self) -> usize;
    fn listening(&self) -> bool;
}

/// The `net` JSON-RPC endpoint.
pub struct Net {
    backend: Arc<dyn NetBackend>,
}

impl Net {
    pub fn new(backend: Arc<dyn NetBackend>) -> Self {
        Self { backend }
    }

    /// Network id, by convention the chain id.
    pub fn version(&self) -> Result<HexU64> {
        Ok(self.backend.chain_id().into())
    }

    /// Whether the client is actively listening for network connections.
    pub fn listening(&self) -> Result<bool> {
        Ok(self.backend.listening())
    }

    /// Number of peers currently connected to the client.
    pub fn peer_count(&self) -> Result<HexU64> {
        Ok((self.backend.peer_count() as u64).into())
    }
}

/// Builds the dispatch namespace for a [`Net`] endpoint.
pub fn namespace(net: Arc<Net>) -> Namespace<Net> {
    Namespace::new(net)
        .method("version", |n: &Net, ()| n.version())
        .method("listening", |n: &Net, ()| n.listening())
        .method("peerCount", |n: &Net, ()| n.peer_count())
}
