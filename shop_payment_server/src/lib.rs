//! # Crypto shop payment server
//! This module hosts the HTTP surface of the payment engine. It is responsible for:
//! Listening for incoming payment notifications (IPN) from NOWPayments.
//! Verifying the notification signature and feeding the body to the reconciliation engine.
//! Exposing the checkout and payment endpoints that the storefront calls.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/payment-ipn`: The webhook route for receiving signed payment notifications from the processor.
//! * `/api/checkout`: Opens a new order.
//! * `/api/orders/{order_number}`: The order with its items and payments.
//! * `/api/orders/{order_number}/payments`: Opens a payment for the order.
//! * `/api/payments/{payment_id}`: The locally recorded payment.
//! * `/api/payments/{payment_id}/refresh`: Polls the processor and reconciles the answer.
//! * `/api/currencies`: The cryptocurrencies customers may pay with.
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
