//! Transaction arguments for `eth_call` and `eth_estimateGas`.

use super::codec::{HexBig, HexBytes, HexU64};
use ethers_core::types::Address;
use serde::Deserialize;

/// Caller-supplied transaction fields. Everything except `from` is
/// optional; the endpoint fills in defaults before handing the call to the
/// backend.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub gas: Option<HexU64>,
    #[serde(default)]
    pub gas_price: Option<HexBig>,
    #[serde(default)]
    pub value: Option<HexBig>,
    #[serde(default)]
    pub input: Option<HexBytes>,
    #[serde(default)]
    pub data: Option<HexBytes>,
    #[serde(default)]
    pub nonce: Option<HexU64>,
}
