//! Ledger store port trait.

use rust_decimal::Decimal;

use crate::domain::error::PapertradeError;
use crate::domain::transaction::Transaction;

/// Durable append-only trade ledger plus a per-account cash balance.
///
/// Cash is a cached projection of the ledger; `record_trade` keeps the two
/// coupled by performing the affordability check, the cash update and the
/// transaction append as one atomic unit per account. On any failure no
/// partial state (cash moved but record missing, or the reverse) is ever
/// observable.
pub trait LedgerPort {
    /// Current cash balance. `AccountNotFound` if the account does not exist.
    fn get_cash(&self, account_id: i64) -> Result<Decimal, PapertradeError>;

    /// Full transaction history, newest first. Empty if none.
    fn list_transactions(&self, account_id: i64) -> Result<Vec<Transaction>, PapertradeError>;

    /// Atomically record a trade: re-read cash, check
    /// `cash - shares * price >= 0`, update cash, append the record.
    ///
    /// `shares` is signed (positive buy, negative sell). Fails with
    /// `InsufficientFunds` if the resulting cash would be negative, or with
    /// `InsufficientShares` if a sell would take the symbol's net holding
    /// below zero. Both checks happen inside the same atomic step as the
    /// write, so concurrent trades on one account cannot spend the same cash
    /// or sell the same shares twice.
    fn record_trade(
        &self,
        account_id: i64,
        symbol: &str,
        shares: i64,
        price: Decimal,
    ) -> Result<Transaction, PapertradeError>;
}
