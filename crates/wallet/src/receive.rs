use coinbridge_core::Settings;
use coinbridge_node::TransactionDetail;
use coinbridge_storage::{
    SqlitePool,
    models::{NewCredit, TransactionState},
    repos,
};

use crate::{balance, ledger};

/// Credit an incoming output to the user owning its address.
///
/// Each `ref_id` is credited at most once. Outputs paying an address the
/// ledger does not know are left alone. Returns whether a credit was created.
pub async fn process_receive(
    pool: &SqlitePool,
    settings: &Settings,
    ref_id: &str,
    detail: &TransactionDetail,
    confirmed: bool,
) -> eyre::Result<bool> {
    if repos::credit_exists(pool, ref_id).await? {
        tracing::info!(ref_id, "txid already known, skipping");
        return Ok(false);
    }

    let Some(address) = detail.address.as_deref() else {
        tracing::warn!(ref_id, "receive without address, skipping");
        return Ok(false);
    };
    let Some(owner) = repos::get_address(pool, address).await? else {
        tracing::warn!(ref_id, address, "address not known, skipping");
        return Ok(false);
    };

    let amount = detail.amount_sats()?;
    let credit = NewCredit {
        amount,
        address: address.to_string(),
        currency: settings.currency().to_string(),
        network: settings.network.clone(),
        transaction_state: TransactionState::from_confirmed(confirmed),
        reference: Some("tx received".into()),
        ref_id: ref_id.to_string(),
        user_id: owner.user_id,
    };

    tracing::info!(ref_id, user_id = owner.user_id, "Crediting receive");
    if !ledger::process_credit(pool, &credit).await? {
        // another notification inserted it between the lookup and the insert
        tracing::info!(ref_id, "credit already recorded, skipping");
        return Ok(false);
    }

    // unconfirmed funds count toward total only
    balance::adjust_balance(pool, &settings.network, None, Some(amount)).await?;
    Ok(true)
}
