//! Holding aggregation: net share counts derived from the ledger.
//!
//! Holdings are never stored. They are recomputed on demand by folding the
//! transaction history, which keeps them incapable of drifting from the
//! ledger.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::transaction::Transaction;

/// Fold transactions into net shares per symbol, dropping zero nets.
pub fn net_holdings(transactions: &[Transaction]) -> BTreeMap<String, i64> {
    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    for tx in transactions {
        *totals.entry(tx.symbol.clone()).or_insert(0) += tx.shares;
    }
    totals.retain(|_, net| *net != 0);
    totals
}

/// Net shares held of a single symbol.
pub fn net_shares(transactions: &[Transaction], symbol: &str) -> i64 {
    transactions
        .iter()
        .filter(|tx| tx.symbol == symbol)
        .map(|tx| tx.shares)
        .sum()
}

/// Replay the ledger to recompute cash from the starting balance.
///
/// Cash conservation invariant: this must reproduce the stored balance
/// exactly for every account.
pub fn replay_cash(starting_cash: Decimal, transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .fold(starting_cash, |cash, tx| cash + tx.cash_delta())
}
