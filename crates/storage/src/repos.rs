use chrono::NaiveDateTime;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::models::*;

// ─── Address Queries ────────────────────────────────────────────────────────

/// Register a deposit address for a user (ignore if already known).
pub async fn insert_address<'e, E>(executor: E, address: &NewAddress) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO addresses (address, user_id, currency, network)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (address) DO NOTHING
        "#,
    )
    .bind(&address.address)
    .bind(address.user_id)
    .bind(&address.currency)
    .bind(&address.network)
    .execute(executor)
    .await?;
    Ok(())
}

/// Look up a known deposit address.
pub async fn get_address(pool: &SqlitePool, address: &str) -> Result<Option<Address>, sqlx::Error> {
    sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE address = $1")
        .bind(address)
        .fetch_optional(pool)
        .await
}

// ─── Credit Queries ─────────────────────────────────────────────────────────

/// Whether a credit with this reference id exists.
pub async fn credit_exists(pool: &SqlitePool, ref_id: &str) -> Result<bool, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM credits WHERE ref_id = $1")
        .bind(ref_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0 > 0)
}

/// Insert a credit. Returns `false` when `ref_id` is already taken.
pub async fn insert_credit<'e, E>(executor: E, credit: &NewCredit) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO credits (amount, address, currency, network, transaction_state, reference, ref_id, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (ref_id) DO NOTHING
        "#,
    )
    .bind(credit.amount)
    .bind(&credit.address)
    .bind(&credit.currency)
    .bind(&credit.network)
    .bind(credit.transaction_state)
    .bind(&credit.reference)
    .bind(&credit.ref_id)
    .bind(credit.user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Get a credit by reference id.
pub async fn get_credit_by_ref(pool: &SqlitePool, ref_id: &str) -> Result<Option<Credit>, sqlx::Error> {
    sqlx::query_as::<_, Credit>("SELECT * FROM credits WHERE ref_id = $1")
        .bind(ref_id)
        .fetch_optional(pool)
        .await
}

/// Get all credits on a network in the given state, oldest first.
pub async fn get_credits_by_state(
    pool: &SqlitePool,
    network: &str,
    state: TransactionState,
) -> Result<Vec<Credit>, sqlx::Error> {
    sqlx::query_as::<_, Credit>(
        "SELECT * FROM credits WHERE network = $1 AND transaction_state = $2 ORDER BY id",
    )
    .bind(network)
    .bind(state)
    .fetch_all(pool)
    .await
}

/// Mark a credit complete and give it its canonical reference id.
pub async fn complete_credit<'e, E>(executor: E, id: i64, ref_id: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE credits SET transaction_state = $1, ref_id = $2 WHERE id = $3")
        .bind(TransactionState::Complete)
        .bind(ref_id)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

// ─── Debit Queries ──────────────────────────────────────────────────────────

/// Record a debit awaiting its on-chain send.
pub async fn insert_debit<'e, E>(executor: E, debit: &NewDebit) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO debits (amount, address, currency, network, transaction_state, reference, ref_id, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(debit.amount)
    .bind(&debit.address)
    .bind(&debit.currency)
    .bind(&debit.network)
    .bind(debit.transaction_state)
    .bind(&debit.reference)
    .bind(&debit.ref_id)
    .bind(debit.user_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Get debits on a network, oldest first.
pub async fn get_debits(pool: &SqlitePool, network: &str) -> Result<Vec<Debit>, sqlx::Error> {
    sqlx::query_as::<_, Debit>("SELECT * FROM debits WHERE network = $1 ORDER BY id")
        .bind(network)
        .fetch_all(pool)
        .await
}

/// Mark the debit carrying `ref_id` complete. Returns `false` if there is none.
pub async fn complete_debit_by_ref<'e, E>(
    executor: E,
    network: &str,
    ref_id: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE debits SET transaction_state = $1 WHERE network = $2 AND ref_id = $3",
    )
    .bind(TransactionState::Complete)
    .bind(network)
    .bind(ref_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Claim the oldest unconfirmed debit matching a send seen on chain.
///
/// Matches on address and amount among debits whose ref id is still empty or
/// holds only the bare txid. The claimed debit takes `ref_id` and is completed.
pub async fn claim_pending_debit<'e, E>(
    executor: E,
    network: &str,
    address: &str,
    amount: i64,
    ref_id: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let txid = ref_id.split(':').next().unwrap_or(ref_id);
    let result = sqlx::query(
        r#"
        UPDATE debits SET ref_id = $1, transaction_state = $2
        WHERE id = (
            SELECT id FROM debits
            WHERE network = $3 AND address = $4 AND amount = $5
              AND transaction_state = $6
              AND (ref_id = '' OR ref_id = $7)
            ORDER BY id
            LIMIT 1
        )
        "#,
    )
    .bind(ref_id)
    .bind(TransactionState::Complete)
    .bind(network)
    .bind(address)
    .bind(amount)
    .bind(TransactionState::Unconfirmed)
    .bind(txid)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

// ─── Balance Queries ────────────────────────────────────────────────────────

/// Get the current hot wallet balance for a network.
pub async fn get_current_balance<'e, E>(
    executor: E,
    network: &str,
) -> Result<Option<HwBalance>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, HwBalance>("SELECT * FROM hw_balances WHERE network = $1")
        .bind(network)
        .fetch_optional(executor)
        .await
}

/// Add deltas to the current balance. Returns `false` if the network has no balance row.
pub async fn apply_balance_delta<'e, E>(
    executor: E,
    network: &str,
    delta_available: i64,
    delta_total: i64,
    at: NaiveDateTime,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE hw_balances
        SET available = available + $1, total = total + $2, updated_at = $3
        WHERE network = $4
        "#,
    )
    .bind(delta_available)
    .bind(delta_total)
    .bind(at)
    .bind(network)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Overwrite (or create) the current balance for a network.
pub async fn upsert_balance<'e, E>(executor: E, balance: &HwBalance) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO hw_balances (network, currency, available, total, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (network) DO UPDATE
        SET currency = $2, available = $3, total = $4, updated_at = $5
        "#,
    )
    .bind(&balance.network)
    .bind(&balance.currency)
    .bind(balance.available)
    .bind(balance.total)
    .bind(balance.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Append a balance value to the history log.
pub async fn insert_balance_history<'e, E>(executor: E, balance: &HwBalance) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO hw_balance_history (network, currency, available, total, time)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&balance.network)
    .bind(&balance.currency)
    .bind(balance.available)
    .bind(balance.total)
    .bind(balance.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Balance history for a network, oldest first.
pub async fn get_balance_history(pool: &SqlitePool, network: &str) -> Result<Vec<HwBalance>, sqlx::Error> {
    sqlx::query_as::<_, HwBalance>(
        r#"
        SELECT network, currency, available, total, time AS updated_at
        FROM hw_balance_history
        WHERE network = $1
        ORDER BY id
        "#,
    )
    .bind(network)
    .fetch_all(pool)
    .await
}

// ─── Notifier State ─────────────────────────────────────────────────────────

/// Get the highest block a block notification was processed for.
pub async fn get_last_block(pool: &SqlitePool, network: &str) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT value FROM notifier_state WHERE network = $1 AND key = 'last_block'",
    )
    .bind(network)
    .fetch_optional(pool)
    .await?;
    Ok(row.and_then(|r| r.0.parse::<i64>().ok()))
}

/// Persist the last processed block height.
pub async fn set_last_block<'e, E>(executor: E, network: &str, height: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO notifier_state (network, key, value)
        VALUES ($1, 'last_block', $2)
        ON CONFLICT (network, key) DO UPDATE SET value = $2
        "#,
    )
    .bind(network)
    .bind(height.to_string())
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_pool;

    fn new_credit(ref_id: &str) -> NewCredit {
        NewCredit {
            amount: 150_000_000,
            address: "addr-1".into(),
            currency: "BTC".into(),
            network: "Bitcoin".into(),
            transaction_state: TransactionState::Unconfirmed,
            reference: Some("tx received".into()),
            ref_id: ref_id.into(),
            user_id: 7,
        }
    }

    fn new_debit(amount: i64, ref_id: &str) -> NewDebit {
        NewDebit {
            amount,
            address: "dest".into(),
            currency: "BTC".into(),
            network: "Bitcoin".into(),
            transaction_state: TransactionState::Unconfirmed,
            reference: None,
            ref_id: ref_id.into(),
            user_id: 7,
        }
    }

    #[tokio::test]
    async fn duplicate_credit_ref_is_rejected_by_the_store() {
        let pool = memory_pool().await;

        assert!(insert_credit(&pool, &new_credit("abc:0")).await.unwrap());
        assert!(!insert_credit(&pool, &new_credit("abc:0")).await.unwrap());
        assert!(insert_credit(&pool, &new_credit("abc:1")).await.unwrap());

        assert!(credit_exists(&pool, "abc:0").await.unwrap());
        assert!(!credit_exists(&pool, "abc").await.unwrap());
    }

    #[tokio::test]
    async fn credit_state_round_trips_as_text() {
        let pool = memory_pool().await;
        insert_credit(&pool, &new_credit("abc:0")).await.unwrap();

        let pending = get_credits_by_state(&pool, "Bitcoin", TransactionState::Unconfirmed)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].txid(), "abc");
        assert_eq!(pending[0].output_index(), Some(0));

        complete_credit(&pool, pending[0].id, "def:0").await.unwrap();

        let credit = get_credit_by_ref(&pool, "def:0").await.unwrap().unwrap();
        assert_eq!(credit.transaction_state, TransactionState::Complete);
        assert!(
            get_credits_by_state(&pool, "Bitcoin", TransactionState::Unconfirmed)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn pending_debit_is_claimed_once() {
        let pool = memory_pool().await;
        insert_debit(&pool, &new_debit(25_000_000, "")).await.unwrap();

        assert!(
            claim_pending_debit(&pool, "Bitcoin", "dest", 25_000_000, "tx1:1")
                .await
                .unwrap()
        );
        assert!(
            !claim_pending_debit(&pool, "Bitcoin", "dest", 25_000_000, "tx2:0")
                .await
                .unwrap()
        );

        let debits = get_debits(&pool, "Bitcoin").await.unwrap();
        assert_eq!(debits[0].ref_id, "tx1:1");
        assert_eq!(debits[0].transaction_state, TransactionState::Complete);
    }

    #[tokio::test]
    async fn balance_delta_requires_a_seeded_row() {
        let pool = memory_pool().await;
        let now = chrono::Utc::now().naive_utc();

        assert!(!apply_balance_delta(&pool, "Bitcoin", 1, 1, now).await.unwrap());

        let seed = HwBalance {
            network: "Bitcoin".into(),
            currency: "BTC".into(),
            available: 100,
            total: 100,
            updated_at: now,
        };
        upsert_balance(&pool, &seed).await.unwrap();

        assert!(apply_balance_delta(&pool, "Bitcoin", -5, 10, now).await.unwrap());
        let current = get_current_balance(&pool, "Bitcoin").await.unwrap().unwrap();
        assert_eq!((current.available, current.total), (95, 110));
    }

    #[tokio::test]
    async fn last_block_watermark_is_per_network() {
        let pool = memory_pool().await;

        assert_eq!(get_last_block(&pool, "Bitcoin").await.unwrap(), None);

        set_last_block(&pool, "Bitcoin", 100).await.unwrap();
        set_last_block(&pool, "Bitcoin", 101).await.unwrap();

        assert_eq!(get_last_block(&pool, "Bitcoin").await.unwrap(), Some(101));
        assert_eq!(get_last_block(&pool, "Testnet").await.unwrap(), None);
    }
}
