//! The `eth` endpoint.

use crate::{
    chain::{Blockchain, GetLogsInput},
    dispatcher::Namespace,
    error::{ApiError, Result},
    filter::{FilterChanges, FilterManager},
};
use bellows_core::eth::{
    Block, BlockNumber, CallRequest, Header, HexBig, HexBytes, HexU64, LogFilter,
};
use ethers_core::{
    types::{Address, Log, Transaction, TransactionReceipt, H256},
    utils::{keccak256, rlp},
};
use std::sync::Arc;

/// Gas limit applied to calls that do not specify one.
const DEFAULT_CALL_GAS: u64 = 1_000_000;

/// The `eth` JSON-RPC endpoint: chain queries, state queries, call
/// execution and filter management, all delegated to the backend and the
/// filter manager.
pub struct Eth {
    chain: Arc<dyn Blockchain>,
    filters: Arc<FilterManager>,
}

impl Eth {
    pub fn new(chain: Arc<dyn Blockchain>, filters: Arc<FilterManager>) -> Self {
        Self { chain, filters }
    }

    pub fn chain_id(&self) -> Result<HexU64> {
        Ok(self.chain.chain_id().into())
    }

    /// Height of the current head.
    pub fn block_number(&self) -> Result<HexU64> {
        let header = self.chain.header().ok_or(ApiError::HeadNotAvailable)?;
        Ok(header.number)
    }

    pub fn block_by_number(&self, number: BlockNumber, full: bool) -> Result<Block> {
        let header = self.resolve_header(number)?;
        let height = header.number.as_u64();
        self.chain.get_block_by_number(height, full).ok_or(ApiError::BlockNotFound(height))
    }

    pub fn block_by_hash(&self, hash: H256, full: bool) -> Result<Block> {
        self.chain.get_block_by_hash(hash, full).ok_or(ApiError::BlockByHashNotFound(hash))
    }

    /// Validates and submits a raw transaction, returning its hash.
    pub fn send_raw_transaction(&self, raw: HexBytes) -> Result<HexBytes> {
        // decoded only for validation, the pool receives the raw payload
        rlp::decode::<Transaction>(raw.as_slice()).map_err(|_| ApiError::InvalidRawTransaction)?;
        let hash = self.chain.add_tx(raw.as_slice())?;
        Ok(HexBytes::from(hash.as_bytes()))
    }

    pub fn transaction_by_hash(&self, hash: H256) -> Result<Option<Transaction>> {
        Ok(self.chain.get_transaction_by_hash(hash)?.map(|found| found.transaction))
    }

    pub fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        Ok(self.chain.get_transaction_by_hash(hash)?.and_then(|found| found.receipt))
    }

    /// Value of the contract storage slot at the referenced block.
    pub fn storage_at(&self, address: Address, slot: H256, number: BlockNumber) -> Result<HexBytes> {
        let header = self.resolve_header(number)?;
        let value = self.chain.get_storage(header.state_root, address, slot)?;
        Ok(HexBytes(value.unwrap_or_default()))
    }

    pub fn gas_price(&self) -> Result<HexBig> {
        Ok(HexBig(self.chain.get_avg_gas_price()))
    }

    /// Executes a call against the state at the referenced block.
    pub fn call(&self, args: CallRequest, number: BlockNumber) -> Result<HexBytes> {
        let transaction = self.normalize_call(&args)?;
        let header = self.resolve_header(number)?;
        let output = self.chain.call(&transaction, &header)?;
        Ok(HexBytes(output))
    }

    pub fn estimate_gas(&self, args: CallRequest, number: Option<BlockNumber>) -> Result<HexU64> {
        let transaction = self.normalize_call(&args)?;
        let header = self.resolve_header(number.unwrap_or_default())?;
        let gas = self.chain.estimate_gas(&transaction, &header)?;
        Ok(gas.into())
    }

    /// Logs matching the filter. With a block hash the filter runs over
    /// that block's receipts; otherwise the range is resolved against the
    /// head (`pending` and `earliest` flatten to `latest`) and delegated
    /// to the backend.
    pub fn logs(&self, filter: LogFilter) -> Result<Vec<Log>> {
        if let Some(hash) = filter.block_hash {
            let receipts = self.chain.get_receipts_by_hash(hash)?;
            let mut matches = Vec::new();
            for receipt in receipts {
                for log in receipt.logs {
                    if filter.matches(&log) {
                        matches.push(log);
                    }
                }
            }
            return Ok(matches);
        }

        let head = self.chain.header().ok_or(ApiError::HeadNotAvailable)?;
        let resolve = |number: BlockNumber| match number {
            BlockNumber::Number(height) => height,
            _ => head.number.as_u64(),
        };
        let from = resolve(filter.from_block);
        let to = resolve(filter.to_block);
        if to < from {
            return Err(ApiError::IncorrectRange);
        }

        let input = GetLogsInput { from, to, addresses: filter.addresses, topics: filter.topics };
        Ok(self.chain.get_logs(&input)?)
    }

    /// Balance of the account at the referenced block; missing accounts
    /// report zero.
    pub fn balance(&self, address: Address, number: BlockNumber) -> Result<HexBig> {
        let header = self.resolve_header(number)?;
        let account = self.chain.get_account(header.state_root, address)?;
        Ok(HexBig(account.map(|account| account.balance).unwrap_or_default()))
    }

    pub fn transaction_count(&self, address: Address, number: BlockNumber) -> Result<HexU64> {
        Ok(self.next_nonce(address, number)?.into())
    }

    /// Code of the account at the referenced block; missing accounts
    /// report empty code.
    pub fn code(&self, address: Address, number: BlockNumber) -> Result<HexBytes> {
        let header = self.resolve_header(number)?;
        let Some(account) = self.chain.get_account(header.state_root, address)? else {
            return Ok(HexBytes::default());
        };
        Ok(HexBytes(self.chain.get_code(account.code_hash)?))
    }

    pub fn new_filter(&self, filter: LogFilter) -> Result<String> {
        Ok(self.filters.new_log_filter(filter, None))
    }

    pub fn new_block_filter(&self) -> Result<String> {
        Ok(self.filters.new_block_filter(None))
    }

    pub fn new_pending_transaction_filter(&self) -> Result<String> {
        Ok(self.filters.new_pending_tx_filter(None))
    }

    pub fn get_filter_changes(&self, id: String) -> Result<FilterChanges> {
        self.filters.filter_changes(&id)
    }

    pub fn uninstall_filter(&self, id: String) -> Result<bool> {
        Ok(self.filters.uninstall(&id))
    }

    pub fn unsubscribe(&self, id: String) -> Result<bool> {
        Ok(self.filters.uninstall(&id))
    }

    /// Shared header-resolution policy: `latest` is the head, absolute
    /// heights are looked up, `earliest` and `pending` are not served.
    fn resolve_header(&self, number: BlockNumber) -> Result<Header> {
        match number {
            BlockNumber::Latest => self.chain.header().ok_or(ApiError::HeadNotAvailable),
            BlockNumber::Earliest => Err(ApiError::EarliestHeaderNotSupported),
            BlockNumber::Pending => Err(ApiError::PendingHeaderNotSupported),
            BlockNumber::Number(height) => {
                self.chain.get_header_by_number(height).ok_or(ApiError::HeaderNotFound(height))
            }
        }
    }

    /// Next nonce for `address`: the pool's pending nonce when asked for
    /// `pending` and the pool knows the address, the account nonce at the
    /// resolved block otherwise.
    fn next_nonce(&self, address: Address, number: BlockNumber) -> Result<u64> {
        let number = if number == BlockNumber::Pending {
            if let Some(nonce) = self.chain.get_pending_nonce(address) {
                return Ok(nonce);
            }
            BlockNumber::Latest
        } else {
            number
        };
        let header = self.resolve_header(number)?;
        let account = self.chain.get_account(header.state_root, address)?;
        Ok(account.map(|account| account.nonce).unwrap_or_default())
    }

    /// Fills in the defaults of caller-supplied transaction arguments and
    /// finalizes them into a transaction the backend can execute.
    fn normalize_call(&self, args: &CallRequest) -> Result<Transaction> {
        let from = args.from.ok_or(ApiError::MissingSender)?;
        if args.data.is_some() && args.input.is_some() {
            return Err(ApiError::ConflictingCallData);
        }

        let nonce = match args.nonce {
            Some(nonce) => nonce.as_u64(),
            None => self.next_nonce(from, BlockNumber::Pending)?,
        };
        let payload = args.data.as_ref().or(args.input.as_ref());
        if args.to.is_none() && payload.is_none() {
            return Err(ApiError::MissingCreationData);
        }

        let mut transaction = Transaction {
            from,
            to: args.to,
            nonce: nonce.into(),
            gas: args.gas.map(HexU64::as_u64).unwrap_or(DEFAULT_CALL_GAS).into(),
            gas_price: Some(
                args.gas_price.map(Into::into).unwrap_or_else(|| self.chain.get_avg_gas_price()),
            ),
            value: args.value.map(Into::into).unwrap_or_default(),
            input: payload.map(|data| data.0.clone()).unwrap_or_default().into(),
            ..Default::default()
        };
        transaction.hash = H256::from(keccak256(transaction.rlp()));
        Ok(transaction)
    }
}

/// Builds the dispatch namespace for an [`Eth`] endpoint.
pub fn namespace(eth: Arc<Eth>) -> Namespace<Eth> {
    Namespace::new(eth)
        .method("chainId", |e: &Eth, ()| e.chain_id())
        .method("blockNumber", |e: &Eth, ()| e.block_number())
        .method("getBlockByNumber", |e: &Eth, (number, full): (BlockNumber, bool)| {
            e.block_by_number(number, full)
        })
        .method("getBlockByHash", |e: &Eth, (hash, full): (H256, bool)| {
            e.block_by_hash(hash, full)
        })
        .method("sendRawTransaction", |e: &Eth, (raw,): (HexBytes,)| e.send_raw_transaction(raw))
        .method("getTransactionByHash", |e: &Eth, (hash,): (H256,)| e.transaction_by_hash(hash))
        .method("getTransactionReceipt", |e: &Eth, (hash,): (H256,)| e.transaction_receipt(hash))
        .method("getStorageAt", |e: &Eth, (address, slot, number): (Address, H256, BlockNumber)| {
            e.storage_at(address, slot, number)
        })
        .method("gasPrice", |e: &Eth, ()| e.gas_price())
        .method("call", |e: &Eth, (args, number): (CallRequest, BlockNumber)| {
            e.call(args, number)
        })
        .method("estimateGas", |e: &Eth, (args, number): (CallRequest, Option<BlockNumber>)| {
            e.estimate_gas(args, number)
        })
        .method("getLogs", |e: &Eth, (filter,): (LogFilter,)| e.logs(filter))
        .method("getBalance", |e: &Eth, (address, number): (Address, BlockNumber)| {
            e.balance(address, number)
        })
        .method("getTransactionCount", |e: &Eth, (address, number): (Address, BlockNumber)| {
            e.transaction_count(address, number)
        })
        .method("getCode", |e: &Eth, (address, number): (Address, BlockNumber)| {
            e.code(address, number)
        })
        .method("newFilter", |e: &Eth, (filter,): (LogFilter,)| e.new_filter(filter))
        .method("newBlockFilter", |e: &Eth, ()| e.new_block_filter())
        .method("newPendingTransactionFilter", |e: &Eth, ()| e.new_pending_transaction_filter())
        .method("getFilterChanges", |e: &Eth, (id,): (String,)| e.get_filter_changes(id))
        .method("uninstallFilter", |e: &Eth, (id,): (String,)| e.uninstall_filter(id))
        .method("unsubscribe", |e: &Eth, (id,): (String,)| e.unsubscribe(id))
}
