//! Quote provider port trait.

use rust_decimal::Decimal;

use crate::domain::error::PapertradeError;

/// A price for a symbol at lookup time.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
}

/// External price source. The core treats it as an opaque capability.
///
/// `Ok(None)` means the symbol is unknown or currently unavailable. Provider
/// infrastructure failures must surface as `ProviderUnavailable`, never as a
/// zero-price quote.
pub trait QuotePort {
    fn lookup(&self, symbol: &str) -> Result<Option<Quote>, PapertradeError>;
}
