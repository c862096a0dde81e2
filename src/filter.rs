//! Support for log, block and pending-transaction filters driven by chain
//! events.
//!
//! The [`FilterManager`] owns every active filter. Polling filters
//! accumulate deltas in a bounded per-filter buffer drained by
//! `eth_getFilterChanges`; subscription filters push notifications through
//! a websocket writer as events arrive. One background task consumes the
//! backend's chain-event subscription and fans deltas out; a periodic
//! sweep evicts polling filters that have not been polled within the
//! timeout.

use crate::{
    chain::{Blockchain, ChainEvent},
    error::ApiError,
};
use bellows_core::eth::{
    subscription::{hex_id, SubscriptionMessage},
    Header, LogFilter,
};
use ethers_core::types::{Log, TransactionReceipt, H256};
use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::HashMap,
    io,
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};
use tracing::{trace, warn};

/// Idle timeout after which a polling filter is evicted.
pub const DEFAULT_FILTER_TIMEOUT: Duration = Duration::from_secs(60);

/// Cap on items buffered for a polling filter; exceeding it invalidates
/// the filter.
const MAX_BUFFERED_ITEMS: usize = 4096;

/// Writer half of a websocket connection, used to push subscription
/// notifications. A failed write permanently terminates the subscription.
pub trait WsConn: Send + Sync {
    fn write_message(&self, msg: &str) -> io::Result<()>;
}

/// Batch of accumulated deltas returned by a filter poll.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterChanges {
    /// Log deltas of a log filter. Reverted logs carry `removed: true`.
    Logs(Vec<Log>),
    /// Head hashes of a block filter, or transaction hashes of a
    /// pending-transaction filter.
    Hashes(Vec<H256>),
}

enum FilterKind {
    Log { filter: LogFilter, pending: Vec<Log> },
    Block { cursor: HeadCursor },
    // installable over the wire, but nothing feeds it yet: the chain
    // event stream carries no pending-transaction payload
    PendingTx { pending: Vec<H256> },
}

struct FilterEntry {
    kind: FilterKind,
    ws: Option<Arc<dyn WsConn>>,
    last_poll: Instant,
}

impl FilterEntry {
    fn is_polling(&self) -> bool {
        self.ws.is_none()
    }

    fn expired(&self, timeout: Duration) -> bool {
        self.is_polling() && self.last_poll.elapsed() > timeout
    }
}

/// Marker returned by delivery helpers when a filter must be dropped,
/// either because its websocket writer failed or its buffer overflowed.
struct FilterDead;

/// Owns every active filter and fans chain events out to them.
pub struct FilterManager {
    chain: Arc<dyn Blockchain>,
    filters: Mutex<HashMap<String, FilterEntry>>,
    block_stream: BlockStream,
    timeout: Duration,
}

impl FilterManager {
    pub fn new(chain: Arc<dyn Blockchain>, timeout: Duration) -> Self {
        Self { chain, filters: Mutex::new(HashMap::new()), block_stream: BlockStream::default(), timeout }
    }

    /// Drains the backend's chain-event subscription until it closes,
    /// delivering deltas to live filters. Expired polling filters are
    /// swept once per timeout period.
    pub async fn run(self: Arc<Self>) {
        let mut events = self.chain.subscribe_events();
        let mut sweep = tokio::time::interval(self.timeout);
        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(event) => self.on_chain_event(event),
                    None => {
                        trace!(target: "node::filter", "chain subscription closed");
                        break;
                    }
                },
                _ = sweep.tick() => self.evict(),
            }
        }
    }

    /// Installs a log filter; `ws == None` selects polling mode.
    pub fn new_log_filter(&self, filter: LogFilter, ws: Option<Arc<dyn WsConn>>) -> String {
        self.add_filter(FilterKind::Log { filter, pending: Vec::new() }, ws)
    }

    /// Installs a block filter. In polling mode the block stream cursor is
    /// captured now, so only heads appended after this call are reported.
    pub fn new_block_filter(&self, ws: Option<Arc<dyn WsConn>>) -> String {
        let cursor = self.block_stream.head();
        self.add_filter(FilterKind::Block { cursor }, ws)
    }

    /// Installs a pending-transaction filter.
    pub fn new_pending_tx_filter(&self, ws: Option<Arc<dyn WsConn>>) -> String {
        self.add_filter(FilterKind::PendingTx { pending: Vec::new() }, ws)
    }

    fn add_filter(&self, kind: FilterKind, ws: Option<Arc<dyn WsConn>>) -> String {
        let id = hex_id();
        trace!(target: "node::filter", %id, "installing filter");
        self.filters
            .lock()
            .insert(id.clone(), FilterEntry { kind, ws, last_poll: Instant::now() });
        id
    }

    /// Drains and returns the deltas accumulated for a polling filter
    /// since the previous poll, refreshing its idle timer.
    /// Subscription-mode ids are not pollable and report the same error
    /// as an unknown id.
    pub fn filter_changes(&self, id: &str) -> Result<FilterChanges, ApiError> {
        let mut filters = self.filters.lock();
        let entry = filters.get_mut(id).ok_or(ApiError::FilterDoesNotExist)?;
        if !entry.is_polling() {
            return Err(ApiError::FilterDoesNotExist);
        }
        if entry.expired(self.timeout) {
            filters.remove(id);
            return Err(ApiError::FilterDoesNotExist);
        }
        entry.last_poll = Instant::now();
        let changes = match &mut entry.kind {
            FilterKind::Log { pending, .. } => FilterChanges::Logs(std::mem::take(pending)),
            FilterKind::Block { cursor } => {
                let (headers, next) = cursor.updates();
                *cursor = next;
                FilterChanges::Hashes(headers.into_iter().map(|header| header.hash).collect())
            }
            FilterKind::PendingTx { pending } => FilterChanges::Hashes(std::mem::take(pending)),
        };
        Ok(changes)
    }

    /// Removes the filter, returning whether it existed.
    pub fn uninstall(&self, id: &str) -> bool {
        trace!(target: "node::filter", %id, "uninstalling filter");
        self.filters.lock().remove(id).is_some()
    }

    /// Whether `id` names a live filter. Expired filters are already
    /// gone as far as callers can tell, even between sweeps.
    pub fn exists(&self, id: &str) -> bool {
        match self.filters.lock().get(id) {
            Some(entry) => !entry.expired(self.timeout),
            None => false,
        }
    }

    fn on_chain_event(&self, event: ChainEvent) {
        for header in &event.new_chain {
            self.block_stream.push(header.clone());
        }

        // receipts are fetched before taking the filter lock so pollers
        // are not stalled behind backend lookups
        let reverted = self.chain_receipts(&event.old_chain);
        let applied = self.chain_receipts(&event.new_chain);

        let mut dead = Vec::new();
        let mut filters = self.filters.lock();
        for (id, entry) in filters.iter_mut() {
            let delivered = match &mut entry.kind {
                FilterKind::Log { filter, pending } => {
                    deliver_logs(id, filter, pending, entry.ws.as_deref(), &reverted, &applied)
                }
                FilterKind::Block { .. } => {
                    deliver_heads(id, entry.ws.as_deref(), &event.new_chain)
                }
                FilterKind::PendingTx { .. } => Ok(()),
            };
            if delivered.is_err() {
                dead.push(id.clone());
            }
        }
        for id in dead {
            trace!(target: "node::filter", %id, "removing dead filter");
            filters.remove(&id);
        }
    }

    /// Receipts for each given header, in order. A block whose receipts
    /// cannot be fetched is logged and skipped.
    fn chain_receipts(&self, headers: &[Header]) -> Vec<Vec<TransactionReceipt>> {
        let mut receipts = Vec::with_capacity(headers.len());
        for header in headers {
            match self.chain.get_receipts_by_hash(header.hash) {
                Ok(block_receipts) => receipts.push(block_receipts),
                Err(err) => {
                    warn!(
                        target: "node::filter",
                        block = ?header.hash,
                        %err,
                        "failed to fetch receipts, skipping block",
                    );
                }
            }
        }
        receipts
    }

    /// Removes polling filters that were not polled within the timeout.
    /// Subscription filters only die with their connection.
    fn evict(&self) {
        trace!(target: "node::filter", "evicting stale filters");
        self.filters.lock().retain(|_, entry| !entry.expired(self.timeout));
    }
}

/// Delivers the matching logs of one chain event to a single log filter:
/// reverted blocks first (`removed: true`), then applied blocks, each in
/// chain order.
fn deliver_logs(
    id: &str,
    filter: &LogFilter,
    pending: &mut Vec<Log>,
    ws: Option<&dyn WsConn>,
    reverted: &[Vec<TransactionReceipt>],
    applied: &[Vec<TransactionReceipt>],
) -> Result<(), FilterDead> {
    for (removed, blocks) in [(true, reverted), (false, applied)] {
        for receipts in blocks {
            for receipt in receipts {
                for log in &receipt.logs {
                    if !filter.matches(log) {
                        continue;
                    }
                    let mut log = log.clone();
                    log.removed = Some(removed);
                    match ws {
                        Some(conn) => notify(conn, id, serde_json::to_value(&log))?,
                        None => {
                            pending.push(log);
                            if pending.len() > MAX_BUFFERED_ITEMS {
                                warn!(target: "node::filter", %id, "filter buffer overflow");
                                return Err(FilterDead);
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Pushes each newly applied head hash to a subscription-mode block
/// filter. Polling block filters read the shared stream on demand instead.
fn deliver_heads(id: &str, ws: Option<&dyn WsConn>, new_chain: &[Header]) -> Result<(), FilterDead> {
    let Some(conn) = ws else { return Ok(()) };
    for header in new_chain {
        notify(conn, id, serde_json::to_value(header.hash))?;
    }
    Ok(())
}

fn notify(
    conn: &dyn WsConn,
    id: &str,
    result: serde_json::Result<Value>,
) -> Result<(), FilterDead> {
    let result = match result {
        Ok(result) => result,
        Err(err) => {
            warn!(target: "node::filter", %id, %err, "failed to encode notification");
            return Ok(());
        }
    };
    let msg = SubscriptionMessage::new(id, result);
    let text = match serde_json::to_string(&msg) {
        Ok(text) => text,
        Err(err) => {
            warn!(target: "node::filter", %id, %err, "failed to encode notification");
            return Ok(());
        }
    };
    conn.write_message(&text).map_err(|err| {
        trace!(target: "node::filter", %id, %err, "websocket writer failed");
        FilterDead
    })
}

/// Append-only stream of canonical head headers shared by all block
/// filters.
///
/// Appending swaps the tail pointer under a producer-side mutex; readers
/// hold a cursor into the list and walk `next` links lock-free. Nodes stay
/// alive as long as any cursor references them and become collectable
/// naturally afterwards.
#[derive(Default)]
pub struct BlockStream {
    tail: Mutex<Arc<StreamNode>>,
}

#[derive(Default)]
struct StreamNode {
    // `None` only for the sentinel root node
    header: Option<Header>,
    next: OnceLock<Arc<StreamNode>>,
}

/// Read position in a [`BlockStream`].
#[derive(Clone)]
pub struct HeadCursor(Arc<StreamNode>);

impl BlockStream {
    /// Appends a header to the stream.
    pub fn push(&self, header: Header) {
        let node = Arc::new(StreamNode { header: Some(header), next: OnceLock::new() });
        let mut tail = self.tail.lock();
        // the tail's next link is always unset while it is the tail
        let _ = tail.next.set(node.clone());
        *tail = node;
    }

    /// Returns a cursor at the current tail; headers pushed after this
    /// call become visible through it.
    pub fn head(&self) -> HeadCursor {
        HeadCursor(self.tail.lock().clone())
    }
}

impl HeadCursor {
    /// Returns every header appended since this cursor's position, in
    /// append order, plus the cursor for the next call.
    pub fn updates(&self) -> (Vec<Header>, HeadCursor) {
        let mut headers = Vec::new();
        let mut node = self.0.clone();
        while let Some(next) = node.next.get() {
            let next = next.clone();
            if let Some(header) = &next.header {
                headers.push(header.clone());
            }
            node = next;
        }
        (headers, HeadCursor(node))
    }
}
