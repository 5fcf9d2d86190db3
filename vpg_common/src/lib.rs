mod helpers;
mod rupiah;

pub mod op;
mod secret;

pub use helpers::{mask_identifier, parse_boolean_flag};
pub use rupiah::{Rupiah, RupiahConversionError, RUPIAH_CURRENCY_CODE};
pub use secret::Secret;
