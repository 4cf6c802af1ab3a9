use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{LoyaltyTransaction, LOYALTY_KIND_EARNED};

/// Whether an `earned` ledger entry already exists for the order. The award flow checks this before writing, so
/// replayed completions can never double-award.
pub async fn earned_transaction_exists(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM loyalty_transactions WHERE order_id = $1 AND kind = $2 LIMIT 1")
            .bind(order_id)
            .bind(LOYALTY_KIND_EARNED)
            .fetch_optional(conn)
            .await?;
    Ok(row.is_some())
}

pub async fn insert_earned_transaction(
    user_id: i64,
    order_id: i64,
    points: i64,
    description: &str,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<LoyaltyTransaction, sqlx::Error> {
    let entry: LoyaltyTransaction = sqlx::query_as(
        r#"
            INSERT INTO loyalty_transactions (user_id, order_id, points, kind, description, reference)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(order_id)
    .bind(points)
    .bind(LOYALTY_KIND_EARNED)
    .bind(description)
    .bind(reference)
    .fetch_one(conn)
    .await?;
    debug!("🎁️ Loyalty ledger entry {} recorded: {points} points for user {user_id}", entry.id);
    Ok(entry)
}
