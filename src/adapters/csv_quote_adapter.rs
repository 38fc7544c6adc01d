//! CSV quote table adapter.
//!
//! Loads a `symbol,price` table from a CSV file and serves lookups from it.
//! Stands in for a network quote service behind the same [`QuotePort`]
//! contract; the core never sees the difference.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::domain::error::PapertradeError;
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::{Quote, QuotePort};

pub struct CsvQuoteAdapter {
    prices: HashMap<String, Decimal>,
}

impl CsvQuoteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PapertradeError> {
        let path =
            config
                .get_string("quotes", "path")
                .ok_or_else(|| PapertradeError::ConfigMissing {
                    section: "quotes".into(),
                    key: "path".into(),
                })?;
        Self::from_file(path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PapertradeError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| PapertradeError::ProviderUnavailable {
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;
        Self::from_csv(&content)
    }

    /// Parse a `symbol,price` CSV (header row expected). Symbols are stored
    /// uppercase; prices must be strictly positive decimals.
    pub fn from_csv(content: &str) -> Result<Self, PapertradeError> {
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut prices = HashMap::new();

        for result in rdr.records() {
            let record = result.map_err(|e| PapertradeError::ProviderUnavailable {
                reason: format!("CSV parse error: {}", e),
            })?;

            let symbol = record
                .get(0)
                .ok_or_else(|| PapertradeError::ProviderUnavailable {
                    reason: "missing symbol column".into(),
                })?
                .trim()
                .to_uppercase();
            let price_str =
                record
                    .get(1)
                    .ok_or_else(|| PapertradeError::ProviderUnavailable {
                        reason: format!("missing price column for {symbol}"),
                    })?;
            let price = Decimal::from_str(price_str.trim()).map_err(|e| {
                PapertradeError::ProviderUnavailable {
                    reason: format!("invalid price for {symbol}: {e}"),
                }
            })?;
            if price <= Decimal::ZERO {
                return Err(PapertradeError::ProviderUnavailable {
                    reason: format!("non-positive price for {symbol}: {price}"),
                });
            }

            prices.insert(symbol, price);
        }

        tracing::debug!(symbols = prices.len(), "quote table loaded");
        Ok(Self { prices })
    }
}

impl QuotePort for CsvQuoteAdapter {
    fn lookup(&self, symbol: &str) -> Result<Option<Quote>, PapertradeError> {
        let symbol = symbol.trim().to_uppercase();
        Ok(self.prices.get(&symbol).map(|&price| Quote {
            symbol,
            price,
        }))
    }
}
