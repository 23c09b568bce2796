pub mod address;
pub mod client;
pub mod types;

pub use address::{NETCODES, netcode_of, validate_address};
pub use client::{BitcoindClient, NodeRpc, create_client};
pub use types::{Category, ChainInfo, TransactionDetail, WalletTransaction, btc_to_sats};
