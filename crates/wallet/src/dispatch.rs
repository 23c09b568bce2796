//! Entry point for bitcoind's `walletnotify` and `blocknotify` hooks.
//!
//! Transaction notifications classify every wallet detail of the transaction:
//! sends confirm the matching debit, receives go through [`process_receive`].
//! Block notifications promote pending credits that reached the confirmation
//! threshold and refresh the hot wallet balance from the daemon.
//!
//! The last processed height is persisted per network so repeated or stale
//! block notifications are skipped across process invocations.

use coinbridge_core::Settings;
use coinbridge_node::{Category, NodeRpc, btc_to_sats};
use coinbridge_storage::{SqlitePool, models::TransactionState, repos};

use crate::{balance, ledger, receive::process_receive};

/// A notification forwarded by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification<'a> {
    /// A wallet transaction appeared or changed; carries the txid.
    Transaction(&'a str),
    /// The chain tip moved.
    Block,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub credited: usize,
    pub sends_confirmed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The reported height was not above the last processed one.
    Stale { height: i64, last_seen: i64 },
    Processed { height: i64, confirmed: usize },
}

/// Handle one notification end to end.
pub async fn dispatch(
    rpc: &dyn NodeRpc,
    pool: &SqlitePool,
    settings: &Settings,
    notification: Notification<'_>,
) -> eyre::Result<()> {
    match notification {
        Notification::Transaction(txid) => {
            let outcome = handle_transaction(rpc, pool, settings, txid).await?;
            tracing::info!(
                txid,
                credited = outcome.credited,
                sends_confirmed = outcome.sends_confirmed,
                skipped = outcome.skipped,
                "Transaction notification handled"
            );
        }
        Notification::Block => match handle_block(rpc, pool, settings).await? {
            BlockOutcome::Stale { height, last_seen } => {
                tracing::debug!(height, last_seen, "Stale block notification ignored");
            }
            BlockOutcome::Processed { height, confirmed } => {
                tracing::info!(height, confirmed, "Block notification handled");
            }
        },
    }
    Ok(())
}

/// Route each detail of `txid` to send confirmation or receive processing.
///
/// Details are referenced as `txid:index` by their position in the daemon's list.
pub async fn handle_transaction(
    rpc: &dyn NodeRpc,
    pool: &SqlitePool,
    settings: &Settings,
    txid: &str,
) -> eyre::Result<TransactionOutcome> {
    let tx = rpc.get_transaction(txid).await?;
    let confirmed = tx.confirmations >= settings.confirmations;
    let mut outcome = TransactionOutcome::default();

    for (index, detail) in tx.details.iter().enumerate() {
        let ref_id = format!("{txid}:{index}");
        match detail.category {
            Category::Send => {
                let Some(address) = detail.address.as_deref() else {
                    tracing::warn!(%ref_id, "send without address, skipping");
                    outcome.skipped += 1;
                    continue;
                };
                let amount = detail.amount_sats()?.abs();
                if ledger::confirm_send(pool, &settings.network, address, amount, &ref_id).await? {
                    outcome.sends_confirmed += 1;
                }
            }
            Category::Receive => {
                if process_receive(pool, settings, &ref_id, detail, confirmed).await? {
                    outcome.credited += 1;
                }
            }
            other => {
                tracing::debug!(%ref_id, category = ?other, "Ignoring wallet detail");
                outcome.skipped += 1;
            }
        }
    }

    Ok(outcome)
}

/// Promote pending credits that reached the threshold and refresh the balance.
pub async fn handle_block(
    rpc: &dyn NodeRpc,
    pool: &SqlitePool,
    settings: &Settings,
) -> eyre::Result<BlockOutcome> {
    let network = settings.network.as_str();
    let info = rpc.get_info().await?;

    if let Some(last_seen) = repos::get_last_block(pool, network).await? {
        if info.blocks <= last_seen {
            return Ok(BlockOutcome::Stale {
                height: info.blocks,
                last_seen,
            });
        }
    }

    let pending = repos::get_credits_by_state(pool, network, TransactionState::Unconfirmed).await?;
    let mut promotions: Vec<(i64, String)> = Vec::new();
    for credit in &pending {
        let tx = rpc.get_transaction(credit.txid()).await?;
        if tx.confirmations < settings.confirmations {
            continue;
        }
        let index = credit
            .output_index()
            .or_else(|| {
                tx.details.iter().position(|d| {
                    d.category == Category::Receive && d.address.as_deref() == Some(credit.address.as_str())
                })
            })
            .unwrap_or(0);
        let canonical = format!("{}:{}", tx.txid, index);

        // a ref id held by another credit would fail the whole batch on the UNIQUE constraint
        let claimed_in_batch = promotions.iter().any(|(_, r)| *r == canonical);
        let held_by_other = repos::get_credit_by_ref(pool, &canonical)
            .await?
            .is_some_and(|other| other.id != credit.id);
        let ref_id = if canonical != credit.ref_id && (claimed_in_batch || held_by_other) {
            tracing::warn!(
                ref_id = %credit.ref_id,
                %canonical,
                "Canonical ref id already taken, keeping the current one"
            );
            credit.ref_id.clone()
        } else {
            canonical
        };
        promotions.push((credit.id, ref_id));
    }

    let confirmed = match commit_promotions(pool, network, info.blocks, &promotions).await {
        Ok(()) => promotions.len(),
        Err(e) => {
            tracing::error!(error = %e, height = info.blocks, "Credit confirmation failed, rolled back");
            0
        }
    };

    let available = btc_to_sats(info.balance)?;
    let total = btc_to_sats(rpc.get_balance().await?)?;
    balance::record_snapshot(pool, network, settings.currency(), available, total).await?;

    Ok(BlockOutcome::Processed {
        height: info.blocks,
        confirmed,
    })
}

async fn commit_promotions(
    pool: &SqlitePool,
    network: &str,
    height: i64,
    promotions: &[(i64, String)],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for (id, ref_id) in promotions {
        repos::complete_credit(&mut *tx, *id, ref_id).await?;
    }
    repos::set_last_block(&mut *tx, network, height).await?;
    tx.commit().await
}
