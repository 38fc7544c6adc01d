//! Portfolio read views derived from the ledger plus live quotes.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::error::PapertradeError;
use super::holding::net_holdings;
use super::transaction::Transaction;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

/// One priced holding in a portfolio report.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioLine {
    pub symbol: String,
    pub shares: i64,
    pub price: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReport {
    pub cash: Decimal,
    pub lines: Vec<PortfolioLine>,
    pub total_value: Decimal,
}

/// Builds read views by folding the ledger and pricing holdings.
///
/// All methods are pure functions of the ledger snapshot they read; no side
/// effects, so repeated calls with no intervening trade return identical
/// results.
pub struct PortfolioAggregator<'a> {
    ledger: &'a dyn LedgerPort,
    quotes: &'a dyn QuotePort,
}

impl<'a> PortfolioAggregator<'a> {
    pub fn new(ledger: &'a dyn LedgerPort, quotes: &'a dyn QuotePort) -> Self {
        Self { ledger, quotes }
    }

    /// Net shares per symbol, zero nets omitted.
    pub fn current_holdings(
        &self,
        account_id: i64,
    ) -> Result<BTreeMap<String, i64>, PapertradeError> {
        let transactions = self.ledger.list_transactions(account_id)?;
        Ok(net_holdings(&transactions))
    }

    /// Price every non-zero holding and total up with cash.
    ///
    /// A symbol whose quote is unavailable is excluded from the report rather
    /// than failing the call; a stale or delisted symbol must not block
    /// viewing the rest of the portfolio. Provider infrastructure errors
    /// still propagate.
    pub fn portfolio_value(&self, account_id: i64) -> Result<PortfolioReport, PapertradeError> {
        let cash = self.ledger.get_cash(account_id)?;
        let holdings = self.current_holdings(account_id)?;

        let mut lines = Vec::with_capacity(holdings.len());
        for (symbol, shares) in holdings {
            match self.quotes.lookup(&symbol)? {
                Some(quote) => {
                    let value = Decimal::from(shares) * quote.price;
                    lines.push(PortfolioLine {
                        symbol,
                        shares,
                        price: quote.price,
                        value,
                    });
                }
                None => {
                    tracing::debug!(symbol = %symbol, "no quote, excluding from report");
                }
            }
        }

        let total_value = cash + lines.iter().map(|l| l.value).sum::<Decimal>();
        Ok(PortfolioReport {
            cash,
            lines,
            total_value,
        })
    }

    /// Full transaction history, newest first, for audit display.
    pub fn history(&self, account_id: i64) -> Result<Vec<Transaction>, PapertradeError> {
        self.ledger.list_transactions(account_id)
    }
}
