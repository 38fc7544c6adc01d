#![allow(dead_code)]

use papertrade::adapters::sqlite_ledger::SqliteLedger;
use papertrade::domain::error::PapertradeError;
use papertrade::ports::quote_port::{Quote, QuotePort};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub struct MockQuotePort {
    pub prices: HashMap<String, Decimal>,
    pub down: bool,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            down: false,
        }
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    /// A provider whose every lookup fails with an infrastructure error.
    pub fn down() -> Self {
        Self {
            prices: HashMap::new(),
            down: true,
        }
    }
}

impl QuotePort for MockQuotePort {
    fn lookup(&self, symbol: &str) -> Result<Option<Quote>, PapertradeError> {
        if self.down {
            return Err(PapertradeError::ProviderUnavailable {
                reason: "mock provider down".into(),
            });
        }
        Ok(self.prices.get(symbol).map(|&price| Quote {
            symbol: symbol.to_string(),
            price,
        }))
    }
}

pub fn open_ledger() -> SqliteLedger {
    let ledger = SqliteLedger::in_memory().unwrap();
    ledger.initialize_schema().unwrap();
    ledger
}

pub fn funded_account(ledger: &SqliteLedger, name: &str, cash: Decimal) -> i64 {
    ledger.open_account(name, cash).unwrap().id
}
