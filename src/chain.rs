//! The capability interface an embedder provides to the RPC service.

use bellows_core::eth::{Block, Header};
use ethers_core::types::{Address, Log, Transaction, TransactionReceipt, H256, U256};
use futures::channel::mpsc::UnboundedReceiver;

/// Errors crossing the backend boundary.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Stream of chain events handed out by [`Blockchain::subscribe_events`].
/// Dropping the sending half closes the subscription and terminates the
/// filter manager's event loop.
pub type ChainEvents = UnboundedReceiver<ChainEvent>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChainEventType {
    /// New canonical head.
    #[default]
    Head,
    /// Chain reorganization.
    Reorg,
    /// Chain fork.
    Fork,
}

/// A canonical-chain update passed to event listeners.
#[derive(Clone, Debug, Default)]
pub struct ChainEvent {
    /// Headers removed from the canonical chain, oldest first. Non-empty
    /// only for reorgs.
    pub old_chain: Vec<Header>,
    /// Headers applied to the canonical chain (or a fork), oldest first.
    pub new_chain: Vec<Header>,
    pub kind: ChainEventType,
}

/// Account state under some state root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}

/// Normalized input for [`Blockchain::get_logs`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetLogsInput {
    pub from: u64,
    pub to: u64,
    pub addresses: Vec<Address>,
    pub topics: Vec<Vec<H256>>,
}

/// A transaction looked up by hash, with its receipt when already mined.
#[derive(Clone, Debug)]
pub struct TransactionResult {
    pub transaction: Transaction,
    pub receipt: Option<TransactionReceipt>,
}

/// Chain state, block store, transaction pool and event source, as seen by
/// the RPC service. All calls are synchronous and expected to be short.
pub trait Blockchain: Send + Sync + 'static {
    /// Chain id of the network.
    fn chain_id(&self) -> u64;

    /// Current canonical head, if the chain has one.
    fn header(&self) -> Option<Header>;

    /// Receipts of the block with the given hash.
    fn get_receipts_by_hash(&self, hash: H256) -> BackendResult<Vec<TransactionReceipt>>;

    fn get_block_by_hash(&self, hash: H256, full: bool) -> Option<Block>;

    fn get_block_by_number(&self, number: u64, full: bool) -> Option<Block>;

    fn get_header_by_number(&self, number: u64) -> Option<Header>;

    /// Estimates the gas needed to execute `tx` on top of `header`.
    fn estimate_gas(&self, tx: &Transaction, header: &Header) -> BackendResult<u64>;

    /// Executes `tx` against the state at `header` without mining it.
    fn call(&self, tx: &Transaction, header: &Header) -> BackendResult<Vec<u8>>;

    /// Hands a raw transaction to the pool, returning its hash.
    fn add_tx(&self, raw: &[u8]) -> BackendResult<H256>;

    fn get_transaction_by_hash(&self, hash: H256) -> BackendResult<Option<TransactionResult>>;

    /// Subscribes to canonical chain events.
    fn subscribe_events(&self) -> ChainEvents;

    /// Average gas price over the recent chain.
    fn get_avg_gas_price(&self) -> U256;

    /// Next nonce for `address` according to the transaction pool.
    fn get_pending_nonce(&self, address: Address) -> Option<u64>;

    fn get_account(&self, state_root: H256, address: Address) -> BackendResult<Option<Account>>;

    /// Value of a storage slot, or `None` if the slot was never written.
    fn get_storage(
        &self,
        state_root: H256,
        address: Address,
        slot: H256,
    ) -> BackendResult<Option<Vec<u8>>>;

    /// Contract code by its hash.
    fn get_code(&self, code_hash: H256) -> BackendResult<Vec<u8>>;

    /// Logs within a resolved block range.
    fn get_logs(&self, input: &GetLogsInput) -> BackendResult<Vec<Log>>;
}
