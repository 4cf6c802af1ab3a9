use chrono::{Duration, Utc};
use log::debug;
use rand::Rng;
use sqlx::SqliteConnection;

use crate::{
    db_types::{DeliveryToken, NewOrder, Order, OrderItem, OrderNumber, OrderStatus, PaymentStatus},
    traits::PaymentGatewayError,
};

const DEFAULT_DOWNLOAD_EXPIRY_DAYS: i64 = 30;
const DEFAULT_DOWNLOAD_LIMIT: i64 = 5;

/// Inserts a new order and its item snapshots. This is not atomic. You can embed this call inside a transaction
/// if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// The stored totals are computed here from the item lines and adjustments, so the total invariant holds for
/// every persisted order.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentGatewayError> {
    order.validate()?;
    if fetch_order_by_number(&order.order_number, conn).await?.is_some() {
        return Err(PaymentGatewayError::OrderAlreadyExists(order.order_number));
    }
    let subtotal = order.subtotal();
    let total = order.total_amount();
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                subtotal,
                discount_amount,
                tax_amount,
                shipping_amount,
                total_amount,
                currency
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(subtotal)
    .bind(order.discount_amount)
    .bind(order.tax_amount)
    .bind(order.shipping_amount)
    .bind(total)
    .bind(&order.currency)
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query(
            r#"
                INSERT INTO order_items (
                    order_id,
                    product_id,
                    product_name,
                    product_sku,
                    product_kind,
                    quantity,
                    unit_price,
                    line_total,
                    download_expiry_days,
                    download_limit
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10);
            "#,
        )
        .bind(inserted.id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(&item.product_sku)
        .bind(item.product_kind)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.line_total())
        .bind(item.download_expiry_days)
        .bind(item.download_limit)
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order {} inserted with id {} ({} items)", inserted.order_number, inserted.id, order.items.len());
    Ok(inserted)
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Mirrors the latest payment status onto the order row. Does not touch the business status.
pub(crate) async fn sync_payment_status(
    id: i64,
    payment_status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(payment_status)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Advances the order to `Paid` if it is still `Pending`. The status guard means a replayed completion cannot
/// touch an order an admin has since moved along (or cancelled).
pub(crate) async fn mark_paid(id: i64, conn: &mut SqliteConnection) -> Result<Order, PaymentGatewayError> {
    let updated: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, payment_status = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(OrderStatus::Paid)
    .bind(PaymentStatus::Finished)
    .bind(id)
    .bind(OrderStatus::Pending)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => Ok(order),
        // The order left Pending through another path. Re-read it so callers still get the current row.
        None => {
            let order = fetch_order_by_id(id, conn).await?;
            order.ok_or(PaymentGatewayError::DatabaseError(format!("order id {id} vanished during mark_paid")))
        },
    }
}

fn new_download_token() -> String {
    let mut rng = rand::thread_rng();
    (0..32).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Issues download tokens for the digital items of an order that do not already carry one.
///
/// The `download_token IS NULL` guard makes this idempotent: replayed completions never regenerate tokens, reset
/// counters or extend expiry windows. Physical items are never touched.
pub async fn issue_delivery_tokens(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<DeliveryToken>, PaymentGatewayError> {
    let items = fetch_order_items(order_id, &mut *conn).await?;
    let mut issued = Vec::new();
    for item in items.iter().filter(|i| i.product_kind == crate::db_types::ProductKind::Digital) {
        if item.download_token.is_some() {
            continue;
        }
        let token = new_download_token();
        let expiry_days = item.download_expiry_days.unwrap_or(DEFAULT_DOWNLOAD_EXPIRY_DAYS);
        let limit = item.download_limit.unwrap_or(DEFAULT_DOWNLOAD_LIMIT);
        let expires_at = Utc::now() + Duration::days(expiry_days);
        let result = sqlx::query(
            r#"
                UPDATE order_items SET download_token = $1, download_expires_at = $2, downloads_remaining = $3
                WHERE id = $4 AND download_token IS NULL;
            "#,
        )
        .bind(&token)
        .bind(expires_at)
        .bind(limit)
        .bind(item.id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 1 {
            debug!("📦️ Issued download token for order item {} (expires {expires_at})", item.id);
            issued.push(DeliveryToken { order_item_id: item.id, token, expires_at, downloads_remaining: limit });
        }
    }
    Ok(issued)
}
