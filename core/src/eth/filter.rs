//! Log filter predicates and the block tag type used to address blocks in
//! RPC queries.

use ethers_core::types::{Address, Log, H256};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// A block height or one of the reserved `earliest`/`latest`/`pending`
/// tags. Decodes from the tag keywords or a `0x`-prefixed (or decimal)
/// unsigned height.
///
/// This is an input-only type: it never appears in responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlockNumber {
    Earliest,
    #[default]
    Latest,
    Pending,
    Number(u64),
}

impl FromStr for BlockNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("block number is empty".to_string());
        }
        match s {
            "earliest" => Ok(BlockNumber::Earliest),
            "latest" => Ok(BlockNumber::Latest),
            "pending" => Ok(BlockNumber::Pending),
            _ => {
                let (digits, radix) = match s.strip_prefix("0x") {
                    Some(digits) => (digits, 16),
                    None => (s, 10),
                };
                u64::from_str_radix(digits, radix)
                    .map(BlockNumber::Number)
                    .map_err(|err| format!("invalid block number {s:?}: {err}"))
            }
        }
    }
}

impl<'de> Deserialize<'de> for BlockNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A log subscription predicate.
///
/// `block_hash` targets a single block and takes precedence over the
/// `from_block`/`to_block` range at query time. An empty address set or
/// topic slot is a wildcard.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogFilter {
    pub block_hash: Option<H256>,
    pub from_block: BlockNumber,
    pub to_block: BlockNumber,
    pub addresses: Vec<Address>,
    pub topics: Vec<Vec<H256>>,
}

impl LogFilter {
    /// Whether `log` satisfies this filter.
    ///
    /// A log matches iff its address is in `addresses` (or the set is
    /// empty) and, for every topic slot, the log carries a topic at that
    /// position that is in the slot (or the slot is empty). A filter with
    /// more slots than the log has topics never matches.
    pub fn matches(&self, log: &Log) -> bool {
        if !self.addresses.is_empty() && !self.addresses.contains(&log.address) {
            return false;
        }
        if self.topics.len() > log.topics.len() {
            return false;
        }
        for (slot, topic) in self.topics.iter().zip(&log.topics) {
            if !slot.is_empty() && !slot.contains(topic) {
                return false;
            }
        }
        true
    }
}

// `address` and `topics` are schema-polymorphic on the wire: the former is
// a string or an array of strings, the latter an array whose elements are a
// string, an array of strings, or null.
impl<'de> Deserialize<'de> for LogFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            #[serde(default)]
            block_hash: Option<H256>,
            #[serde(default)]
            from_block: Option<BlockNumber>,
            #[serde(default)]
            to_block: Option<BlockNumber>,
            #[serde(default)]
            address: Option<Value>,
            #[serde(default)]
            topics: Option<Vec<Value>>,
        }

        let raw = Raw::deserialize(deserializer)?;

        let mut filter = LogFilter {
            block_hash: raw.block_hash,
            from_block: raw.from_block.unwrap_or_default(),
            to_block: raw.to_block.unwrap_or_default(),
            ..Default::default()
        };

        match raw.address {
            None => {}
            Some(Value::String(addr)) => filter.addresses.push(parse_scalar(&addr)?),
            Some(Value::Array(items)) => {
                for item in items {
                    match item {
                        Value::String(addr) => filter.addresses.push(parse_scalar(&addr)?),
                        _ => return Err(de::Error::custom("address expected")),
                    }
                }
            }
            Some(_) => {
                return Err(de::Error::custom(
                    "failed to decode address, expected a hex string or an array of hex strings",
                ))
            }
        }

        for slot in raw.topics.unwrap_or_default() {
            match slot {
                Value::Null => filter.topics.push(Vec::new()),
                Value::String(topic) => filter.topics.push(vec![parse_scalar(&topic)?]),
                Value::Array(items) => {
                    let mut set = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(topic) => set.push(parse_scalar(&topic)?),
                            _ => return Err(de::Error::custom("hash expected")),
                        }
                    }
                    filter.topics.push(set);
                }
                _ => {
                    return Err(de::Error::custom(
                        "failed to decode topics, expected a hex string, an array of hex strings or null",
                    ))
                }
            }
        }

        Ok(filter)
    }
}

fn parse_scalar<T: FromStr, E: de::Error>(raw: &str) -> Result<T, E>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(de::Error::custom)
}
