pub mod block;
pub mod call;
pub mod codec;
pub mod filter;
pub mod subscription;

pub use block::{Block, BlockTransactions, Header};
pub use call::CallRequest;
pub use codec::{HexBig, HexBytes, HexU64};
pub use filter::{BlockNumber, LogFilter};
