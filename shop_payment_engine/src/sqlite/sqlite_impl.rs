//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, loyalty, new_pool, orders, payments, users};
use crate::{
    db_types::{
        DeliveryToken,
        LoyaltyTransaction,
        NewOrder,
        NewPayment,
        Order,
        OrderItem,
        OrderNumber,
        Payment,
        PaymentStatus,
        PaymentUpdate,
        User,
    },
    traits::{PaymentGatewayDatabase, PaymentGatewayError, ReconciliationOutcome},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_or_create_user(
        &self,
        telegram_id: &str,
        username: Option<&str>,
    ) -> Result<User, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_or_create_user(telegram_id, username, &mut conn).await
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::user_by_id(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_number, order.id);
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_id(payment.order_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::DatabaseError(format!("no order with id {}", payment.order_id)))?;
        if let Some(open) = payments::fetch_open_payment_for_order(order.id, &mut tx).await? {
            warn!("🗃️ Order {} already has payment {} in flight", order.order_number, open.payment_id);
            return Err(PaymentGatewayError::PaymentInProgress(order.order_number));
        }
        let payment = payments::insert_payment(payment, &mut tx).await?;
        orders::sync_payment_status(order.id, payment.status, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_payment_id(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_payments_for_order(order_id, &mut conn).await?;
        Ok(payments)
    }

    /// Applies a status report inside a single transaction.
    ///
    /// The transition itself is a compare-and-set on the stored status, so when two reports race, exactly one
    /// claims the transition and the loser is classified against the fresher row. The `Finished` transition and
    /// the order's move to `Paid` commit together.
    async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<ReconciliationOutcome, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment_by_payment_id(&update.payment_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::PaymentNotFound(update.payment_id.clone()))?;
        let old_status = payment.status;
        if update.status == old_status {
            // A replay. Keep the richer incidental data but change no state.
            let payment = payments::refresh_incidental_fields(&update, &mut tx).await?;
            tx.commit().await?;
            debug!("🗃️ Payment {} report replayed with status {old_status}. No transition.", payment.payment_id);
            return Ok(ReconciliationOutcome::Unchanged { payment });
        }
        if old_status.is_terminal() {
            tx.commit().await?;
            warn!(
                "🗃️ Payment {} is already {old_status}; ignoring late report of {}",
                payment.payment_id, update.status
            );
            return Ok(ReconciliationOutcome::Stale { payment });
        }
        match payments::try_transition(&update, old_status, &mut tx).await? {
            Some(payment) => {
                if payment.status == PaymentStatus::Finished {
                    let order = orders::mark_paid(payment.order_id, &mut tx).await?;
                    tx.commit().await?;
                    info!(
                        "🗃️ Payment {} finished. Order {} is paid ({}).",
                        payment.payment_id, order.order_number, order.total_amount
                    );
                    Ok(ReconciliationOutcome::Completed { payment, order })
                } else {
                    orders::sync_payment_status(payment.order_id, payment.status, &mut tx).await?;
                    tx.commit().await?;
                    debug!("🗃️ Payment {} moved {old_status} -> {}", payment.payment_id, payment.status);
                    Ok(ReconciliationOutcome::Updated { payment })
                }
            },
            None => {
                // Another writer claimed the transition between our read and the compare-and-set. Classify this
                // report against the fresher row instead of retrying.
                let payment = payments::fetch_payment_by_payment_id(&update.payment_id, &mut tx)
                    .await?
                    .ok_or_else(|| PaymentGatewayError::PaymentNotFound(update.payment_id.clone()))?;
                tx.commit().await?;
                if payment.status == update.status {
                    debug!("🗃️ Payment {} already moved to {} concurrently.", payment.payment_id, payment.status);
                    Ok(ReconciliationOutcome::Unchanged { payment })
                } else {
                    warn!(
                        "🗃️ Payment {} changed to {} while applying a report of {}. Report dropped.",
                        payment.payment_id, payment.status, update.status
                    );
                    Ok(ReconciliationOutcome::Stale { payment })
                }
            },
        }
    }

    async fn award_loyalty_points(&self, order: &Order) -> Result<Option<LoyaltyTransaction>, PaymentGatewayError> {
        let points = order.total_amount.whole_units();
        if points <= 0 {
            debug!("🎁️ Order {} rounds to zero points. No loyalty entry.", order.order_number);
            return Ok(None);
        }
        let mut tx = self.pool.begin().await?;
        if loyalty::earned_transaction_exists(order.id, &mut tx).await? {
            debug!("🎁️ Order {} has already earned its points. Skipping.", order.order_number);
            return Ok(None);
        }
        let user = users::user_by_id(order.user_id, &mut tx)
            .await?
            .ok_or(PaymentGatewayError::UserNotFound(order.user_id))?;
        let description = format!("Points earned for order {}", order.order_number);
        let entry = loyalty::insert_earned_transaction(
            user.id,
            order.id,
            points,
            &description,
            order.order_number.as_str(),
            &mut tx,
        )
        .await?;
        users::incr_loyalty_totals(user.id, points, order.total_amount, &mut tx).await?;
        tx.commit().await?;
        info!("🎁️ Awarded {points} points to user {} for order {}", user.id, order.order_number);
        Ok(Some(entry))
    }

    async fn issue_delivery_tokens(&self, order: &Order) -> Result<Vec<DeliveryToken>, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let tokens = orders::issue_delivery_tokens(order.id, &mut tx).await?;
        tx.commit().await?;
        if !tokens.is_empty() {
            info!("📦️ Issued {} download token(s) for order {}", tokens.len(), order.order_number);
        }
        Ok(tokens)
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
