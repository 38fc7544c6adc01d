//! Trade engine: validation, pricing, and execution of buy/sell requests.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::error::PapertradeError;
use super::holding::net_shares;
use super::portfolio::{PortfolioAggregator, PortfolioReport};
use super::transaction::{normalize_symbol, Transaction};
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::{Quote, QuotePort};

/// A validated trade request. Construction is the input boundary: the symbol
/// is normalized to uppercase and the share count is strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub account_id: i64,
    pub symbol: String,
    pub shares: i64,
}

impl TradeRequest {
    pub fn new(account_id: i64, symbol: &str, shares: i64) -> Result<Self, PapertradeError> {
        let symbol = normalize_symbol(symbol)?;
        if shares <= 0 {
            return Err(PapertradeError::InvalidInput {
                reason: format!("share count must be positive, got {shares}"),
            });
        }
        Ok(Self {
            account_id,
            symbol,
            shares,
        })
    }
}

/// Validates and executes trades against the ledger store.
///
/// Each request is priced exactly once; the quoted price is used for the
/// affordability check and is the price recorded in the ledger. The cash and
/// holdings pre-checks here give fast rejections, but the authoritative
/// checks happen inside the store's atomic `record_trade`, so concurrent
/// trades on one account cannot spend the same cash or sell the same shares
/// twice.
pub struct TradeEngine<'a> {
    ledger: &'a dyn LedgerPort,
    quotes: &'a dyn QuotePort,
}

impl<'a> TradeEngine<'a> {
    pub fn new(ledger: &'a dyn LedgerPort, quotes: &'a dyn QuotePort) -> Self {
        Self { ledger, quotes }
    }

    /// Buy `shares` of `symbol` at the current quote.
    pub fn buy(
        &self,
        account_id: i64,
        symbol: &str,
        shares: i64,
    ) -> Result<Transaction, PapertradeError> {
        let request = TradeRequest::new(account_id, symbol, shares)?;
        let quote = self.quote_once(&request.symbol)?;

        let cost = Decimal::from(request.shares) * quote.price;
        let cash = self.ledger.get_cash(request.account_id)?;
        if cost > cash {
            tracing::debug!(
                symbol = %request.symbol,
                %cost,
                %cash,
                "buy rejected: insufficient funds"
            );
            return Err(PapertradeError::InsufficientFunds {
                needed: cost,
                available: cash,
            });
        }

        let tx = self
            .ledger
            .record_trade(request.account_id, &request.symbol, request.shares, quote.price)?;
        tracing::info!(
            account_id = tx.account_id,
            symbol = %tx.symbol,
            shares = tx.shares,
            price = %tx.price,
            "buy executed"
        );
        Ok(tx)
    }

    /// Sell `shares` of `symbol` at the current quote.
    ///
    /// Rejected with `InsufficientShares` if the request exceeds the net
    /// holding derived from the ledger; a sell of exactly the full held
    /// quantity succeeds and drops the symbol's net to zero.
    pub fn sell(
        &self,
        account_id: i64,
        symbol: &str,
        shares: i64,
    ) -> Result<Transaction, PapertradeError> {
        let request = TradeRequest::new(account_id, symbol, shares)?;

        let transactions = self.ledger.list_transactions(request.account_id)?;
        let held = net_shares(&transactions, &request.symbol);
        if request.shares > held {
            tracing::debug!(
                symbol = %request.symbol,
                requested = request.shares,
                held,
                "sell rejected: insufficient shares"
            );
            return Err(PapertradeError::InsufficientShares {
                symbol: request.symbol,
                requested: request.shares,
                held,
            });
        }

        let quote = self.quote_once(&request.symbol)?;
        let tx = self.ledger.record_trade(
            request.account_id,
            &request.symbol,
            -request.shares,
            quote.price,
        )?;
        tracing::info!(
            account_id = tx.account_id,
            symbol = %tx.symbol,
            shares = tx.shares,
            price = %tx.price,
            "sell executed"
        );
        Ok(tx)
    }

    /// Current holdings, priced, with cash and total value.
    pub fn portfolio(&self, account_id: i64) -> Result<PortfolioReport, PapertradeError> {
        PortfolioAggregator::new(self.ledger, self.quotes).portfolio_value(account_id)
    }

    /// Net shares per symbol without pricing.
    pub fn holdings(&self, account_id: i64) -> Result<BTreeMap<String, i64>, PapertradeError> {
        PortfolioAggregator::new(self.ledger, self.quotes).current_holdings(account_id)
    }

    /// Transaction history, newest first.
    pub fn history(&self, account_id: i64) -> Result<Vec<Transaction>, PapertradeError> {
        PortfolioAggregator::new(self.ledger, self.quotes).history(account_id)
    }

    fn quote_once(&self, symbol: &str) -> Result<Quote, PapertradeError> {
        self.quotes
            .lookup(symbol)?
            .ok_or_else(|| PapertradeError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }
}
