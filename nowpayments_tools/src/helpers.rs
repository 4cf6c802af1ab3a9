use rand::Rng;

/// Generate a fresh purchase reference for a payment attempt. The random suffix keeps retries for the same order
/// distinguishable on the processor side.
pub fn new_purchase_id(order_number: &str) -> String {
    let suffix: String = {
        let mut rng = rand::thread_rng();
        (0..8).map(|_| format!("{:x}", rng.gen_range(0..16u8))).collect()
    };
    format!("order_{order_number}_{suffix}")
}

/// Render the payment URI that customer-facing surfaces encode into a QR code,
/// e.g. `btc:3EZ2uTdV...?amount=0.0021`. Rendering the image itself is the presentation layer's job.
pub fn payment_uri(pay_currency: &str, pay_address: &str, pay_amount: f64) -> String {
    format!("{}:{pay_address}?amount={pay_amount}", pay_currency.to_lowercase())
}
