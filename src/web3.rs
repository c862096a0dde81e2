//! The `web3` endpoint.

use crate::{dispatcher::Namespace, error::Result};
use bellows_core::eth::HexBytes;
use ethers_core::utils::keccak256;
use std::sync::Arc;

/// Backend surface for the `web3` namespace.
pub trait Web3Backend: Send + Sync + 'static {
    fn client_version(&self) -> String;
}

/// The `web3` JSON-RPC endpoint.
pub struct Web3 {
    backend: Arc<dyn Web3Backend>,
}

impl Web3 {
    pub fn new(backend: Arc<dyn Web3Backend>) -> Self {
        Self { backend }
    }

    pub fn client_version(&self) -> Result<String> {
        Ok(self.backend.client_version())
    }

    /// Keccak-256 of the input (the legacy variant, not the standardized
    /// SHA3-256).
    pub fn sha3(&self, input: HexBytes) -> Result<HexBytes> {
        Ok(HexBytes(keccak256(input.as_slice()).to_vec()))
    }
}

/// Builds the dispatch namespace for a [`Web3`] endpoint.
pub fn namespace(web3: Arc<Web3>) -> Namespace<Web3> {
    Namespace::new(web3)
        .method("clientVersion", |w: &Web3, ()| w.client_version())
        .method("sha3", |w: &Web3, (input,): (HexBytes,)| w.sha3(input))
}
