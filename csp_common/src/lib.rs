mod money;

pub mod helpers;
mod secret;

pub use money::{Money, MoneyConversionError};
pub use secret::Secret;
