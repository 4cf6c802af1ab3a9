//! Small helpers that don't warrant their own module.
use chrono::Utc;
use rand::Rng;

use crate::db_types::OrderNumber;

const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates a fresh order number of the form `ORD-YYYYMMDD-XXXXXX`.
///
/// The suffix alphabet omits the lookalike characters (0/O, 1/I) since customers read these numbers back over
/// chat. Uniqueness is enforced by the database; the 32^6 suffix space makes a retry vanishingly rare.
pub fn new_order_number() -> OrderNumber {
    let date = Utc::now().format("%Y%m%d");
    let mut rng = rand::thread_rng();
    let suffix: String =
        (0..6).map(|_| ORDER_NUMBER_ALPHABET[rng.gen_range(0..ORDER_NUMBER_ALPHABET.len())] as char).collect();
    OrderNumber(format!("ORD-{date}-{suffix}"))
}
