use bitcoin::Amount;
use coinbridge_node::NodeRpc;
use coinbridge_storage::SqlitePool;

use crate::balance;

/// Pay `amount` to `address` from the daemon's wallet and debit the cached balance.
///
/// Funds are not checked up front; the daemon's refusal propagates. Once the
/// daemon has broadcast, the txid is returned even if the balance update fails.
pub async fn send_to_address(
    rpc: &dyn NodeRpc,
    pool: &SqlitePool,
    network: &str,
    address: &str,
    amount: Amount,
) -> eyre::Result<String> {
    let txid = rpc.send_to_address(address, amount).await?;
    let sats = i64::try_from(amount.to_sat())?;
    tracing::info!(%txid, address, amount = sats, "Sent from hot wallet");

    if let Err(e) = balance::adjust_balance(pool, network, Some(-sats), Some(-sats)).await {
        tracing::error!(error = %e, %txid, "Sent, but the cached balance was not debited");
    }
    Ok(txid)
}

/// Ask the daemon for a fresh receiving address.
pub async fn get_new_address(rpc: &dyn NodeRpc) -> eyre::Result<String> {
    let address = rpc.get_new_address().await?;
    tracing::debug!(%address, "Issued new address");
    Ok(address)
}
