use csp_common::Money;
use log::debug;
use sqlx::SqliteConnection;

use crate::{db_types::User, traits::PaymentGatewayError};

pub async fn user_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn user_by_telegram_id(
    telegram_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, sqlx::Error> {
    let user =
        sqlx::query_as("SELECT * FROM users WHERE telegram_id = $1").bind(telegram_id).fetch_optional(conn).await?;
    Ok(user)
}

/// Fetches the user for the telegram id, creating a fresh record if none exists. The username is refreshed when
/// it has changed on the messenger side.
pub async fn fetch_or_create_user(
    telegram_id: &str,
    username: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<User, PaymentGatewayError> {
    if let Some(user) = user_by_telegram_id(telegram_id, conn).await? {
        if user.username.as_deref() != username {
            let user = sqlx::query_as(
                "UPDATE users SET username = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
            )
            .bind(username)
            .bind(user.id)
            .fetch_one(conn)
            .await?;
            return Ok(user);
        }
        return Ok(user);
    }
    let user = sqlx::query_as(
        r#"
            INSERT INTO users (telegram_id, username) VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(telegram_id)
    .bind(username)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ New user created for telegram id {telegram_id}");
    Ok(user)
}

/// Adds the earned points and the order value to the user's running totals. Called once per paid order, inside
/// the same transaction as the loyalty ledger insert.
pub async fn incr_loyalty_totals(
    user_id: i64,
    points: i64,
    spent: Money,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentGatewayError> {
    let result = sqlx::query(
        r#"
            UPDATE users SET
                loyalty_points = loyalty_points + $1,
                total_spent = total_spent + $2,
                total_orders = total_orders + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
        "#,
    )
    .bind(points)
    .bind(spent)
    .bind(user_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(PaymentGatewayError::UserNotFound(user_id));
    }
    Ok(())
}
