//! Service configuration.

use crate::filter::DEFAULT_FILTER_TIMEOUT;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

/// Configuration for [`spawn`](crate::spawn).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcConfig {
    /// Address the HTTP/websocket server binds to.
    pub addr: SocketAddr,
    /// Idle expiry for polling filters.
    pub filter_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8545),
            filter_timeout: DEFAULT_FILTER_TIMEOUT,
        }
    }
}

impl RpcConfig {
    /// Sets the address to bind to.
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Sets the idle expiry for polling filters.
    pub fn with_filter_timeout(mut self, timeout: Duration) -> Self {
        self.filter_timeout = timeout;
        self
    }
}
