use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use csp_common::Money;
use log::*;
use nowpayments_tools::IpnPayload;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     OrderNumber       -------------------------------------------------------
/// The human-readable order number, e.g. `ORD-20240101-ABC123`. Generated at checkout and used as the public
/// identifier for the order everywhere outside the database.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     OrderStatus       -------------------------------------------------------
/// The business-facing order lifecycle. Only `Pending -> Paid` is driven by the reconciliation engine; the later
/// states are operator-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Checkout has started and no completed payment has been received.
    Pending,
    /// A payment has been received in full.
    Paid,
    /// The order is being prepared by the operator.
    Processing,
    /// The order has been handed to a carrier.
    Shipped,
    /// The order has reached the customer.
    Delivered,
    /// The order was cancelled by the customer or an admin.
    Cancelled,
    /// The payment was returned to the customer.
    Refunded,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct StatusConversionError(pub String);

impl FromStr for OrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            s => Err(StatusConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatus::Pending
        })
    }
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
/// The processor-facing payment state machine.
///
/// Happy path: `Pending -> Waiting -> Confirming -> Confirmed -> Sending -> Finished`, with `PartiallyPaid`,
/// `Failed`, `Refunded` and `Expired` reachable as side branches from any non-terminal state. Once a payment is
/// terminal it is never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Waiting,
    Confirming,
    Confirmed,
    Sending,
    PartiallyPaid,
    Finished,
    Failed,
    Refunded,
    Expired,
}

impl PaymentStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Refunded | Self::Expired)
    }

    /// Map the processor's wire status string to the internal status. Unknown strings map to `Pending`, matching
    /// the processor's documented behavior of adding new intermediate statuses over time.
    pub fn from_gateway(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "waiting" => Self::Waiting,
            "confirming" => Self::Confirming,
            "confirmed" => Self::Confirmed,
            "sending" => Self::Sending,
            "partially_paid" => Self::PartiallyPaid,
            "finished" => Self::Finished,
            "failed" => Self::Failed,
            "refunded" => Self::Refunded,
            "expired" => Self::Expired,
            other => {
                warn!("💰️ Unknown gateway payment status '{other}'. Treating it as Pending.");
                Self::Pending
            },
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Waiting => "Waiting",
            PaymentStatus::Confirming => "Confirming",
            PaymentStatus::Confirmed => "Confirmed",
            PaymentStatus::Sending => "Sending",
            PaymentStatus::PartiallyPaid => "PartiallyPaid",
            PaymentStatus::Finished => "Finished",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
            PaymentStatus::Expired => "Expired",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Waiting" => Ok(Self::Waiting),
            "Confirming" => Ok(Self::Confirming),
            "Confirmed" => Ok(Self::Confirmed),
            "Sending" => Ok(Self::Sending),
            "PartiallyPaid" => Ok(Self::PartiallyPaid),
            "Finished" => Ok(Self::Finished),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            "Expired" => Ok(Self::Expired),
            s => Err(StatusConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------     ProductKind       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ProductKind {
    /// Fulfilled by issuing time-limited download tokens.
    Digital,
    /// Fulfilled by the operator; untouched by digital delivery.
    Physical,
}

impl Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductKind::Digital => write!(f, "Digital"),
            ProductKind::Physical => write!(f, "Physical"),
        }
    }
}

impl From<String> for ProductKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Digital" => Self::Digital,
            "Physical" => Self::Physical,
            _ => {
                error!("Invalid product kind: {value}. But this conversion cannot fail. Defaulting to Physical");
                Self::Physical
            },
        }
    }
}

//--------------------------------------        User           -------------------------------------------------------
/// The long-lived customer root. The loyalty counters are mutated exclusively by the fulfillment handlers.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: String,
    pub username: Option<String>,
    pub loyalty_points: i64,
    pub total_spent: Money,
    pub total_orders: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub user_id: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub total_amount: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// `total_amount == subtotal - discount_amount + tax_amount + shipping_amount` must hold after every mutation.
    pub fn total_is_consistent(&self) -> bool {
        self.total_amount == self.subtotal - self.discount_amount + self.tax_amount + self.shipping_amount
            && !self.total_amount.is_negative()
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order: {0}")]
pub struct OrderValidationError(pub String);

//--------------------------------------      NewOrder         -------------------------------------------------------
/// A purchase intent entering the ledger. Totals are computed here, once, so the stored order always satisfies
/// the total invariant.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: i64,
    pub currency: String,
    pub items: Vec<NewOrderItem>,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
}

impl NewOrder {
    pub fn new(order_number: OrderNumber, user_id: i64, currency: impl Into<String>) -> Self {
        Self {
            order_number,
            user_id,
            currency: currency.into(),
            items: Vec::new(),
            discount_amount: Money::default(),
            tax_amount: Money::default(),
            shipping_amount: Money::default(),
        }
    }

    pub fn with_item(mut self, item: NewOrderItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_adjustments(mut self, discount: Money, tax: Money, shipping: Money) -> Self {
        self.discount_amount = discount;
        self.tax_amount = tax;
        self.shipping_amount = shipping;
        self
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(|i| i.line_total()).sum()
    }

    pub fn total_amount(&self) -> Money {
        self.subtotal() - self.discount_amount + self.tax_amount + self.shipping_amount
    }

    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.items.is_empty() {
            return Err(OrderValidationError("an order must contain at least one item".into()));
        }
        if self.items.iter().any(|i| i.quantity <= 0) {
            return Err(OrderValidationError("item quantities must be positive".into()));
        }
        if self.items.iter().any(|i| i.unit_price.is_negative()) {
            return Err(OrderValidationError("item prices cannot be negative".into()));
        }
        if self.total_amount().is_negative() {
            return Err(OrderValidationError("the order total cannot be negative".into()));
        }
        Ok(())
    }
}

//--------------------------------------    NewOrderItem       -------------------------------------------------------
/// A product snapshot taken at order time. Later product edits never retroactively alter order history.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub product_name: String,
    #[serde(default)]
    pub product_sku: Option<String>,
    pub product_kind: ProductKind,
    pub quantity: i64,
    pub unit_price: Money,
    /// Per-product override for the delivery-link lifetime; default policy is 30 days.
    #[serde(default)]
    pub download_expiry_days: Option<i64>,
    /// Per-product override for the download counter; default policy is 5.
    #[serde(default)]
    pub download_limit: Option<i64>,
}

impl NewOrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------      OrderDraft       -------------------------------------------------------
/// The wire form of a checkout request: the cart plus adjustments. The order number and user linkage are filled
/// in server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDraft {
    #[serde(default = "default_currency")]
    pub currency: String,
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub discount_amount: Money,
    #[serde(default)]
    pub tax_amount: Money,
    #[serde(default)]
    pub shipping_amount: Money,
}

fn default_currency() -> String {
    "USD".to_string()
}

//--------------------------------------      OrderItem        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub product_kind: ProductKind,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub download_expiry_days: Option<i64>,
    pub download_limit: Option<i64>,
    pub download_token: Option<String>,
    pub download_expires_at: Option<DateTime<Utc>>,
    pub downloads_remaining: Option<i64>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Payment         -------------------------------------------------------
/// One processor-side payment attempt, tied to exactly one order. An order may accumulate several payments if
/// earlier attempts expire, but at most one may be non-terminal at a time.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    /// The external payment identifier assigned by the gateway.
    pub payment_id: String,
    pub status: PaymentStatus,
    pub pay_address: String,
    pub price_amount: Money,
    pub price_currency: String,
    pub pay_amount: f64,
    pub pay_currency: String,
    pub actually_paid: f64,
    pub actually_paid_currency: Option<String>,
    /// The purchase reference we submitted when creating the payment.
    pub purchase_id: String,
    /// Blockchain transaction id, reported by the gateway once it sees the transfer.
    pub txid: Option<String>,
    pub network: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewPayment       -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i64,
    pub payment_id: String,
    pub status: PaymentStatus,
    pub pay_address: String,
    pub price_amount: Money,
    pub price_currency: String,
    pub pay_amount: f64,
    pub pay_currency: String,
    pub purchase_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

//--------------------------------------    PaymentUpdate      -------------------------------------------------------
/// A validated status report for a known payment, parsed from an IPN body or a manual status poll. This is the
/// only input the reconciliation state machine accepts.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub actually_paid: Option<f64>,
    pub actually_paid_currency: Option<String>,
    pub txid: Option<String>,
    pub network: Option<String>,
}

impl From<IpnPayload> for PaymentUpdate {
    fn from(ipn: IpnPayload) -> Self {
        let status = PaymentStatus::from_gateway(&ipn.payment_status);
        let txid = ipn.txid().map(String::from);
        let network = ipn.network().map(String::from);
        Self {
            payment_id: ipn.payment_id,
            status,
            actually_paid: ipn.actually_paid,
            actually_paid_currency: ipn.actually_paid_currency,
            txid,
            network,
        }
    }
}

//-------------------------------------- LoyaltyTransaction    -------------------------------------------------------
/// An immutable, append-only ledger entry proving why a user's point balance changed. Never mutated or deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LoyaltyTransaction {
    pub id: i64,
    pub user_id: i64,
    pub order_id: Option<i64>,
    pub points: i64,
    pub kind: String,
    pub description: String,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const LOYALTY_KIND_EARNED: &str = "earned";

//--------------------------------------    DeliveryToken      -------------------------------------------------------
/// A freshly issued digital-delivery grant for one order item.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryToken {
    pub order_item_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub downloads_remaining: i64,
}
