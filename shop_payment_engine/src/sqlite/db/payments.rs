use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus, PaymentUpdate},
    traits::PaymentGatewayError,
};

/// Records a payment attempt that has just been opened with the processor. This is not atomic; embed it inside
/// a transaction and pass `&mut *tx` where atomicity is required.
pub async fn insert_payment(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentGatewayError> {
    if fetch_payment_by_payment_id(&payment.payment_id, &mut *conn).await?.is_some() {
        return Err(PaymentGatewayError::PaymentAlreadyExists(payment.payment_id));
    }
    let inserted: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                order_id,
                payment_id,
                status,
                pay_address,
                price_amount,
                price_currency,
                pay_amount,
                pay_currency,
                purchase_id,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(&payment.payment_id)
    .bind(payment.status)
    .bind(&payment.pay_address)
    .bind(payment.price_amount)
    .bind(&payment.price_currency)
    .bind(payment.pay_amount)
    .bind(&payment.pay_currency)
    .bind(&payment.purchase_id)
    .bind(payment.expires_at)
    .fetch_one(conn)
    .await?;
    debug!("💰️ Payment {} recorded for order id {}", inserted.payment_id, inserted.order_id);
    Ok(inserted)
}

pub async fn fetch_payment_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE payment_id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payments_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

/// The non-terminal payment currently in flight for the order, if any.
pub async fn fetch_open_payment_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            SELECT * FROM payments
            WHERE order_id = $1 AND status NOT IN ('Finished', 'Failed', 'Refunded', 'Expired')
            ORDER BY created_at DESC LIMIT 1;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Refreshes the incidental fields of a payment without touching its status. Used when a replayed report carries
/// fuller data (txid, actual amount) than the one that drove the transition.
pub(crate) async fn refresh_incidental_fields(
    update: &PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentGatewayError> {
    let payment: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments SET
                actually_paid = COALESCE($1, actually_paid),
                actually_paid_currency = COALESCE($2, actually_paid_currency),
                txid = COALESCE($3, txid),
                network = COALESCE($4, network),
                updated_at = CURRENT_TIMESTAMP
            WHERE payment_id = $5
            RETURNING *;
        "#,
    )
    .bind(update.actually_paid)
    .bind(&update.actually_paid_currency)
    .bind(&update.txid)
    .bind(&update.network)
    .bind(&update.payment_id)
    .fetch_optional(conn)
    .await?;
    payment.ok_or_else(|| PaymentGatewayError::PaymentNotFound(update.payment_id.clone()))
}

/// Moves the payment from `old_status` to the reported status with a compare-and-set on the old status.
///
/// Returns `None` when no row matched, meaning another writer changed the status between our read and this
/// write. Callers re-read the row and classify the report against the fresher state instead of retrying.
pub(crate) async fn try_transition(
    update: &PaymentUpdate,
    old_status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET
                status = $1,
                actually_paid = COALESCE($2, actually_paid),
                actually_paid_currency = COALESCE($3, actually_paid_currency),
                txid = COALESCE($4, txid),
                network = COALESCE($5, network),
                updated_at = CURRENT_TIMESTAMP
            WHERE payment_id = $6 AND status = $7
            RETURNING *;
        "#,
    )
    .bind(update.status)
    .bind(update.actually_paid)
    .bind(&update.actually_paid_currency)
    .bind(&update.txid)
    .bind(&update.network)
    .bind(&update.payment_id)
    .bind(old_status)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}
