//! coinbridge notifier — records bitcoind wallet activity in the ledger.
//!
//! Meant to be run by the daemon itself, one process per event:
//!
//! ```text
//! walletnotify=/usr/local/bin/notify transaction %s
//! blocknotify=/usr/local/bin/notify block %s
//! ```
//!
//! Flow:
//! 1. Load settings, open and migrate the ledger store
//! 2. Build the bitcoind RPC client
//! 3. Dispatch the notification: credit receives / confirm sends, or promote
//!    pending credits and refresh the hot wallet balance on a new block

use std::time::Duration;

use clap::{Parser, ValueEnum};
use coinbridge_core::{Settings, telemetry};
use coinbridge_node::create_client;
use coinbridge_storage as storage;
use coinbridge_wallet::{Notification, dispatch};
use eyre::{Result, eyre};

#[derive(Debug, Parser)]
#[command(name = "notify")]
#[command(about = "Record bitcoind wallet and block notifications in the ledger")]
#[command(version)]
struct Cli {
    /// Notification kind
    kind: Kind,

    /// Transaction id for `transaction`; ignored for `block`
    data: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Transaction,
    Block,
}

impl Cli {
    fn notification(&self) -> Result<Notification<'_>> {
        match self.kind {
            Kind::Transaction => self
                .data
                .as_deref()
                .map(Notification::Transaction)
                .ok_or_else(|| eyre!("a transaction notification needs a txid")),
            Kind::Block => Ok(Notification::Block),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Initialisation ──────────────────────────────────────────────────
    telemetry::init();
    let settings = Settings::from_env()?;
    let notification = cli.notification()?;

    tracing::debug!(network = %settings.network, ?notification, "Starting notifier");

    let pool = storage::connect(&settings.database_url).await?;
    storage::migrate(&pool).await?;

    let client = create_client(
        &settings.rpc_url,
        Duration::from_secs(settings.rpc_timeout_secs),
    )?;

    // ── Dispatch ────────────────────────────────────────────────────────
    let result = dispatch(&client, &pool, &settings, notification).await;
    pool.close().await;

    if let Err(e) = &result {
        tracing::error!(error = %e, ?notification, "Notification failed");
    }
    result
}
