//! Subscription bindings for the websocket pubsub surface.

use ethers_core::{
    rand::{distributions::Alphanumeric, thread_rng, Rng},
    utils::hex,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscription kind accepted by `eth_subscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionKind {
    /// New canonical head headers.
    NewHeads,
    /// Logs matching a filter.
    Logs,
    /// Hashes of transactions entering the pool.
    NewPendingTransactions,
}

/// An `eth_subscription` notification pushed to a websocket peer.
#[derive(Clone, Debug, Serialize)]
pub struct SubscriptionMessage {
    jsonrpc: &'static str,
    method: &'static str,
    params: SubscriptionOutput,
}

#[derive(Clone, Debug, Serialize)]
struct SubscriptionOutput {
    subscription: String,
    result: Value,
}

impl SubscriptionMessage {
    pub fn new(subscription: impl Into<String>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: "eth_subscription",
            params: SubscriptionOutput { subscription: subscription.into(), result },
        }
    }
}

/// Returns a fresh unguessable hex identifier for filters and
/// subscriptions.
pub fn hex_id() -> String {
    let seed: String =
        (&mut thread_rng()).sample_iter(Alphanumeric).map(char::from).take(16).collect();
    format!("0x{}", hex::encode(seed))
}
