//! Hot wallet bookkeeping driven by bitcoind `walletnotify` / `blocknotify` hooks.
//!
//! - [`dispatch`] turns a daemon notification into ledger updates
//! - [`receive`] credits incoming outputs to the owning user, once per output
//! - [`send`] pays out through the daemon and debits the cached balance
//! - [`balance`] keeps the cached hot wallet balance and its history
//! - [`ledger`] is the credit / send-confirmation entry point into the ledger

pub mod balance;
pub mod dispatch;
pub mod ledger;
pub mod receive;
pub mod send;

#[cfg(test)]
mod testutil;

pub use dispatch::{BlockOutcome, Notification, TransactionOutcome, dispatch};
