use bitcoin::SignedAmount;
use coinbridge_core::AppError;
use serde::Deserialize;

/// Wallet view of a transaction, as returned by `gettransaction`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WalletTransaction {
    pub txid: String,
    /// Negative when the transaction conflicts with the best chain.
    pub confirmations: i64,
    #[serde(default)]
    pub details: Vec<TransactionDetail>,
}

/// One wallet-relevant output of a transaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionDetail {
    #[serde(default)]
    pub address: Option<String>,
    pub category: Category,
    /// BTC, negative for sends.
    pub amount: f64,
    #[serde(default)]
    pub vout: Option<u32>,
}

impl TransactionDetail {
    /// The detail amount in satoshis.
    pub fn amount_sats(&self) -> Result<i64, AppError> {
        btc_to_sats(self.amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Send,
    Receive,
    Generate,
    Immature,
    Orphan,
    #[serde(other)]
    Unknown,
}

/// Subset of `getinfo` the notifier relies on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChainInfo {
    pub blocks: i64,
    /// Spendable wallet balance in BTC.
    pub balance: f64,
}

/// Convert a daemon BTC value into satoshis.
pub fn btc_to_sats(btc: f64) -> Result<i64, AppError> {
    SignedAmount::from_btc(btc)
        .map(|amount| amount.to_sat())
        .map_err(|e| AppError::Decode(format!("invalid BTC amount {btc}: {e}")))
}
