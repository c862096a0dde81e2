//! Block and header wire types.

use super::codec::{HexBytes, HexU64};
use ethers_core::types::{Bloom, Transaction, H256};
use serde::{Deserialize, Serialize};

/// A block header as served over the wire.
///
/// The hash is carried explicitly rather than recomputed: it is whatever
/// the backend assigned when the block was stored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub hash: H256,
    pub parent_hash: H256,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub number: HexU64,
    pub gas_limit: HexU64,
    pub gas_used: HexU64,
    pub timestamp: HexU64,
    pub extra_data: HexBytes,
}

/// The transactions of a block, as hashes or fully inlined bodies
/// depending on the `full` flag of the originating query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    Hashes(Vec<H256>),
    Full(Vec<Transaction>),
}

impl Default for BlockTransactions {
    fn default() -> Self {
        BlockTransactions::Hashes(Vec::new())
    }
}

/// A block: its header plus the transaction list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(flatten)]
    pub header: Header,
    pub transactions: BlockTransactions,
}

impl From<Header> for Block {
    fn from(header: Header) -> Self {
        Block { header, transactions: BlockTransactions::default() }
    }
}
