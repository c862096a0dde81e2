//! In-memory backend used by the integration tests.

use bellows::chain::{
    Account, BackendResult, Blockchain, ChainEvent, ChainEvents, GetLogsInput, TransactionResult,
};
use bellows::{NetBackend, Web3Backend};
use bellows_core::eth::{Block, Header};
use ethers_core::types::{Address, Log, Transaction, TransactionReceipt, H256, U256};
use futures::channel::mpsc::{self, UnboundedSender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct MockAccount {
    pub account: Account,
    pub code: Vec<u8>,
    pub storage: HashMap<H256, Vec<u8>>,
}

pub struct MockChain {
    pub chain_id: u64,
    blocks: Mutex<Vec<Block>>,
    accounts: Mutex<HashMap<Address, MockAccount>>,
    receipts: Mutex<HashMap<H256, Vec<TransactionReceipt>>>,
    logs_input: Mutex<Option<GetLogsInput>>,
    added_tx: Mutex<Option<Vec<u8>>>,
    pending_nonces: Mutex<HashMap<Address, u64>>,
    events_rx: Mutex<Option<ChainEvents>>,
    events_tx: UnboundedSender<ChainEvent>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded();
        Arc::new(Self {
            chain_id: 1,
            blocks: Mutex::new(Vec::new()),
            accounts: Mutex::new(HashMap::new()),
            receipts: Mutex::new(HashMap::new()),
            logs_input: Mutex::new(None),
            added_tx: Mutex::new(None),
            pending_nonces: Mutex::new(HashMap::new()),
            events_rx: Mutex::new(Some(events_rx)),
            events_tx,
        })
    }

    pub fn push_header(&self, header: Header) {
        self.blocks.lock().push(Block::from(header));
    }

    pub fn add_account(&self, address: Address, account: MockAccount) {
        self.accounts.lock().insert(address, account);
    }

    pub fn add_receipts(&self, block: H256, receipts: Vec<TransactionReceipt>) {
        self.receipts.lock().insert(block, receipts);
    }

    pub fn set_pending_nonce(&self, address: Address, nonce: u64) {
        self.pending_nonces.lock().insert(address, nonce);
    }

    pub fn emit_event(&self, event: ChainEvent) {
        self.events_tx.unbounded_send(event).expect("subscription open");
    }

    pub fn recorded_logs_input(&self) -> Option<GetLogsInput> {
        self.logs_input.lock().clone()
    }

    pub fn recorded_raw_tx(&self) -> Option<Vec<u8>> {
        self.added_tx.lock().clone()
    }
}

impl Blockchain for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn header(&self) -> Option<Header> {
        self.blocks.lock().last().map(|block| block.header.clone())
    }

    fn get_receipts_by_hash(&self, hash: H256) -> BackendResult<Vec<TransactionReceipt>> {
        Ok(self.receipts.lock().get(&hash).cloned().unwrap_or_default())
    }

    fn get_block_by_hash(&self, hash: H256, _full: bool) -> Option<Block> {
        self.blocks.lock().iter().find(|block| block.header.hash == hash).cloned()
    }

    fn get_block_by_number(&self, number: u64, _full: bool) -> Option<Block> {
        self.blocks.lock().iter().find(|block| block.header.number.as_u64() == number).cloned()
    }

    fn get_header_by_number(&self, number: u64) -> Option<Header> {
        self.get_block_by_number(number, false).map(|block| block.header)
    }

    fn estimate_gas(&self, _tx: &Transaction, _header: &Header) -> BackendResult<u64> {
        Ok(21_000)
    }

    fn call(&self, _tx: &Transaction, _header: &Header) -> BackendResult<Vec<u8>> {
        Ok(vec![0xca, 0x11])
    }

    fn add_tx(&self, raw: &[u8]) -> BackendResult<H256> {
        *self.added_tx.lock() = Some(raw.to_vec());
        Ok(H256::from_low_u64_be(1))
    }

    fn get_transaction_by_hash(&self, _hash: H256) -> BackendResult<Option<TransactionResult>> {
        Ok(None)
    }

    fn subscribe_events(&self) -> ChainEvents {
        self.events_rx.lock().take().expect("single subscriber")
    }

    fn get_avg_gas_price(&self) -> U256 {
        U256::from(1_000u64)
    }

    fn get_pending_nonce(&self, address: Address) -> Option<u64> {
        self.pending_nonces.lock().get(&address).copied()
    }

    fn get_account(&self, _state_root: H256, address: Address) -> BackendResult<Option<Account>> {
        Ok(self.accounts.lock().get(&address).map(|mock| mock.account.clone()))
    }

    fn get_storage(
        &self,
        _state_root: H256,
        address: Address,
        slot: H256,
    ) -> BackendResult<Option<Vec<u8>>> {
        let accounts = self.accounts.lock();
        Ok(accounts.get(&address).and_then(|mock| mock.storage.get(&slot).cloned()))
    }

    fn get_code(&self, code_hash: H256) -> BackendResult<Vec<u8>> {
        let accounts = self.accounts.lock();
        accounts
            .values()
            .find(|mock| mock.account.code_hash == code_hash)
            .map(|mock| mock.code.clone())
            .ok_or_else(|| "code not found".into())
    }

    fn get_logs(&self, input: &GetLogsInput) -> BackendResult<Vec<Log>> {
        *self.logs_input.lock() = Some(input.clone());
        Ok(Vec::new())
    }
}

impl NetBackend for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn peer_count(&self) -> usize {
        10
    }

    fn listening(&self) -> bool {
        true
    }
}

impl Web3Backend for MockChain {
    fn client_version(&self) -> String {
        "bellows/test".to_string()
    }
}
