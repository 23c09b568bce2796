use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ─── Transaction state ──────────────────────────────────────────────────────

/// Ledger state of a credit or debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    Unconfirmed,
    Complete,
}

impl TransactionState {
    pub fn from_confirmed(confirmed: bool) -> Self {
        if confirmed {
            Self::Complete
        } else {
            Self::Unconfirmed
        }
    }
}

// ─── Address ────────────────────────────────────────────────────────────────

/// A deposit address owned by a ledger user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Address {
    pub id: i64,
    pub address: String,
    pub user_id: i64,
    pub currency: String,
    pub network: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAddress {
    pub address: String,
    pub user_id: i64,
    pub currency: String,
    pub network: String,
}

// ─── Credit ─────────────────────────────────────────────────────────────────

/// Funds received on a user's deposit address. Amounts are in satoshis.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Credit {
    pub id: i64,
    pub amount: i64,
    pub address: String,
    pub currency: String,
    pub network: String,
    pub transaction_state: TransactionState,
    pub reference: Option<String>,
    pub ref_id: String,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
}

impl Credit {
    /// The txid part of `ref_id`.
    pub fn txid(&self) -> &str {
        self.ref_id.split(':').next().unwrap_or(&self.ref_id)
    }

    /// The output index suffix of `ref_id`, if it has one.
    pub fn output_index(&self) -> Option<usize> {
        self.ref_id.split_once(':')?.1.parse().ok()
    }
}

/// Insert-ready credit (no `id` or `created_at`).
#[derive(Debug, Clone)]
pub struct NewCredit {
    pub amount: i64,
    pub address: String,
    pub currency: String,
    pub network: String,
    pub transaction_state: TransactionState,
    pub reference: Option<String>,
    pub ref_id: String,
    pub user_id: i64,
}

// ─── Debit ──────────────────────────────────────────────────────────────────

/// Funds sent out of the hot wallet for a user. Amounts are in satoshis.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Debit {
    pub id: i64,
    pub amount: i64,
    pub address: String,
    pub currency: String,
    pub network: String,
    pub transaction_state: TransactionState,
    pub reference: Option<String>,
    pub ref_id: String,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewDebit {
    pub amount: i64,
    pub address: String,
    pub currency: String,
    pub network: String,
    pub transaction_state: TransactionState,
    pub reference: Option<String>,
    pub ref_id: String,
    pub user_id: i64,
}

// ─── HwBalance ──────────────────────────────────────────────────────────────

/// Hot wallet balance for one network, in satoshis.
///
/// The same shape is used for the current record and its history rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct HwBalance {
    pub network: String,
    pub currency: String,
    pub available: i64,
    pub total: i64,
    pub updated_at: NaiveDateTime,
}
