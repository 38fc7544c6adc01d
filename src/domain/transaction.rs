//! Transaction records and symbol normalization.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::PapertradeError;

/// An immutable ledger record of one executed trade.
///
/// `shares` is signed: positive for a buy, negative for a sell. Records are
/// append-only; cash and holdings are always recomputable by replaying them.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub symbol: String,
    pub shares: i64,
    pub price: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_buy(&self) -> bool {
        self.shares > 0
    }

    pub fn is_sell(&self) -> bool {
        self.shares < 0
    }

    /// Change this record applies to the account's cash balance.
    /// Negative for a buy (cash out), positive for a sell (cash in).
    pub fn cash_delta(&self) -> Decimal {
        -(Decimal::from(self.shares) * self.price)
    }
}

/// Normalize a ticker symbol: trim whitespace, reject empty, uppercase.
///
/// Symbol matching is case-insensitive at the boundary; everything past this
/// point (lookups, storage, aggregation) sees the uppercase form only.
pub fn normalize_symbol(symbol: &str) -> Result<String, PapertradeError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(PapertradeError::InvalidInput {
            reason: "symbol must not be empty".into(),
        });
    }
    Ok(trimmed.to_uppercase())
}
