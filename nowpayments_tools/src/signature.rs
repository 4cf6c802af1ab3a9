//! IPN signature verification.
//!
//! NOWPayments signs every notification by computing HMAC-SHA512 over the raw request body with the merchant's
//! IPN secret, and sends the hex digest in the `x-nowpayments-sig` header. This is the trust boundary for the
//! whole reconciliation flow: a body that does not verify must be discarded before it is even parsed.

use csp_common::Secret;
use hmac::{Hmac, Mac};
use log::warn;
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Verify the signature over the raw notification body. Comparison happens in constant time via
/// [`Mac::verify_slice`], so a forged signature leaks nothing about the expected digest.
pub fn verify_ipn_signature(secret: &Secret<String>, body: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        warn!("🔐️ The IPN secret is empty. Rejecting notification unconditionally.");
        return false;
    }
    let Some(sig_bytes) = decode_hex(signature) else {
        warn!("🔐️ IPN signature is not valid hex. Rejecting notification.");
        return false;
    };
    let mut mac = match HmacSha512::new_from_slice(secret.reveal().as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            warn!("🔐️ Could not initialise HMAC from IPN secret. {e}");
            return false;
        },
    };
    mac.update(body);
    mac.verify_slice(&sig_bytes).is_ok()
}

/// Compute the hex signature for a body. The counterpart of [`verify_ipn_signature`]; used by tests and tooling
/// to forge processor notifications.
pub fn sign_ipn_body(secret: &Secret<String>, body: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.reveal().as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok()).collect()
}
