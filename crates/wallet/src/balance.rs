use coinbridge_core::AppError;
use coinbridge_storage::{SqlitePool, models::HwBalance, repos};

/// The current hot wallet balance for `network`.
pub async fn get_balance(pool: &SqlitePool, network: &str) -> eyre::Result<HwBalance> {
    repos::get_current_balance(pool, network)
        .await?
        .ok_or_else(|| AppError::BalanceNotSeeded(network.to_string()).into())
}

/// Shift the current balance by the given satoshi deltas.
///
/// `None` leaves that side untouched; with both `None` nothing is written.
/// An unseeded network is an error. A failed write is logged and dropped.
pub async fn adjust_balance(
    pool: &SqlitePool,
    network: &str,
    available: Option<i64>,
    total: Option<i64>,
) -> eyre::Result<()> {
    if available.is_none() && total.is_none() {
        return Ok(());
    }

    match write_adjustment(pool, network, available.unwrap_or(0), total.unwrap_or(0)).await {
        Ok(Some(balance)) => {
            tracing::info!(
                network,
                available = balance.available,
                total = balance.total,
                "Hot wallet balance adjusted"
            );
            Ok(())
        }
        Ok(None) => Err(AppError::BalanceNotSeeded(network.to_string()).into()),
        Err(e) => {
            tracing::error!(error = %e, network, "Balance adjustment failed, rolled back");
            Ok(())
        }
    }
}

async fn write_adjustment(
    pool: &SqlitePool,
    network: &str,
    available: i64,
    total: i64,
) -> Result<Option<HwBalance>, sqlx::Error> {
    let now = chrono::Utc::now().naive_utc();
    let mut tx = pool.begin().await?;

    if !repos::apply_balance_delta(&mut *tx, network, available, total, now).await? {
        return Ok(None);
    }
    let balance = repos::get_current_balance(&mut *tx, network)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    repos::insert_balance_history(&mut *tx, &balance).await?;

    tx.commit().await?;
    Ok(Some(balance))
}

/// Replace the current balance with values reported by the daemon.
///
/// Seeds the record when the network has none yet. A failed write is logged and dropped.
pub async fn record_snapshot(
    pool: &SqlitePool,
    network: &str,
    currency: &str,
    available: i64,
    total: i64,
) -> eyre::Result<()> {
    let balance = HwBalance {
        network: network.to_string(),
        currency: currency.to_string(),
        available,
        total,
        updated_at: chrono::Utc::now().naive_utc(),
    };

    let result: Result<(), sqlx::Error> = async {
        let mut tx = pool.begin().await?;
        repos::upsert_balance(&mut *tx, &balance).await?;
        repos::insert_balance_history(&mut *tx, &balance).await?;
        tx.commit().await
    }
    .await;

    match result {
        Ok(()) => tracing::info!(network, available, total, "Hot wallet balance refreshed"),
        Err(e) => tracing::error!(error = %e, network, "Balance snapshot failed, rolled back"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{NETWORK, memory_pool};

    async fn seeded(available: i64, total: i64) -> SqlitePool {
        let pool = memory_pool().await;
        record_snapshot(&pool, NETWORK, "BTC", available, total)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn adjust_appends_exactly_one_history_row() {
        let pool = seeded(100, 100).await;
        let before = repos::get_balance_history(&pool, NETWORK).await.unwrap().len();

        adjust_balance(&pool, NETWORK, Some(-5), Some(-5))
            .await
            .unwrap();

        let balance = get_balance(&pool, NETWORK).await.unwrap();
        assert_eq!((balance.available, balance.total), (95, 95));
        assert_eq!(balance.currency, "BTC");

        let history = repos::get_balance_history(&pool, NETWORK).await.unwrap();
        assert_eq!(history.len(), before + 1);
        assert_eq!(history.last().map(|b| (b.available, b.total)), Some((95, 95)));
    }

    #[tokio::test]
    async fn adjust_without_deltas_writes_nothing() {
        let pool = seeded(100, 100).await;

        adjust_balance(&pool, NETWORK, None, None).await.unwrap();

        assert_eq!(repos::get_balance_history(&pool, NETWORK).await.unwrap().len(), 1);
        let balance = get_balance(&pool, NETWORK).await.unwrap();
        assert_eq!((balance.available, balance.total), (100, 100));
    }

    #[tokio::test]
    async fn omitted_side_is_left_unchanged() {
        let pool = seeded(100, 100).await;

        adjust_balance(&pool, NETWORK, None, Some(40)).await.unwrap();

        let balance = get_balance(&pool, NETWORK).await.unwrap();
        assert_eq!((balance.available, balance.total), (100, 140));
    }

    #[tokio::test]
    async fn unseeded_network_is_reported() {
        let pool = memory_pool().await;

        let read = get_balance(&pool, NETWORK).await.unwrap_err();
        let adjust = adjust_balance(&pool, NETWORK, Some(1), None).await.unwrap_err();

        for err in [read, adjust] {
            assert!(matches!(
                err.downcast_ref::<AppError>(),
                Some(AppError::BalanceNotSeeded(_))
            ));
        }
        assert!(repos::get_balance_history(&pool, NETWORK).await.unwrap().is_empty());
    }

    async fn reject_history_writes(pool: &SqlitePool) {
        sqlx::query(
            "CREATE TRIGGER reject_history BEFORE INSERT ON hw_balance_history BEGIN SELECT RAISE(ABORT, 'history full'); END",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn failed_adjustment_is_dropped_and_rolled_back() {
        let pool = seeded(100, 100).await;
        reject_history_writes(&pool).await;

        adjust_balance(&pool, NETWORK, Some(-5), Some(-5))
            .await
            .unwrap();

        let balance = get_balance(&pool, NETWORK).await.unwrap();
        assert_eq!((balance.available, balance.total), (100, 100));
    }

    #[tokio::test]
    async fn failed_snapshot_is_dropped_and_rolled_back() {
        let pool = seeded(100, 100).await;
        reject_history_writes(&pool).await;

        record_snapshot(&pool, NETWORK, "BTC", 70, 90).await.unwrap();

        let balance = get_balance(&pool, NETWORK).await.unwrap();
        assert_eq!((balance.available, balance.total), (100, 100));
        assert_eq!(repos::get_balance_history(&pool, NETWORK).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn snapshot_overwrites_current_and_keeps_history() {
        let pool = seeded(100, 100).await;

        record_snapshot(&pool, NETWORK, "BTC", 70, 90).await.unwrap();

        let balance = get_balance(&pool, NETWORK).await.unwrap();
        assert_eq!((balance.available, balance.total), (70, 90));

        let history: Vec<_> = repos::get_balance_history(&pool, NETWORK)
            .await
            .unwrap()
            .into_iter()
            .map(|b| (b.available, b.total))
            .collect();
        assert_eq!(history, vec![(100, 100), (70, 90)]);
    }
}
