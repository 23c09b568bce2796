//! Credit and send-confirmation entry points of the ledger core.

use coinbridge_storage::{SqlitePool, models::NewCredit, repos};

/// Record a credit. Returns `false` if its reference id is already taken.
pub async fn process_credit(pool: &SqlitePool, credit: &NewCredit) -> eyre::Result<bool> {
    let created = repos::insert_credit(pool, credit).await?;
    if created {
        tracing::info!(
            ref_id = %credit.ref_id,
            user_id = credit.user_id,
            amount = credit.amount,
            state = ?credit.transaction_state,
            "Credit recorded"
        );
    }
    Ok(created)
}

/// Mark the debit behind an on-chain send as complete.
///
/// A debit already tagged with `ref_id` is completed directly. Otherwise the
/// oldest pending debit for the same address and amount claims the reference.
pub async fn confirm_send(
    pool: &SqlitePool,
    network: &str,
    address: &str,
    amount: i64,
    ref_id: &str,
) -> eyre::Result<bool> {
    if repos::complete_debit_by_ref(pool, network, ref_id).await? {
        tracing::info!(ref_id, "Send confirmed");
        return Ok(true);
    }

    if repos::claim_pending_debit(pool, network, address, amount, ref_id).await? {
        tracing::info!(ref_id, address, amount, "Send matched to pending debit");
        return Ok(true);
    }

    tracing::warn!(ref_id, address, amount, "No debit matches send");
    Ok(false)
}
