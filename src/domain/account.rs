//! Account identity and cash balance.

use rust_decimal::Decimal;

/// A trading account. Cash is mutated only through the ledger store's atomic
/// trade recording; `starting_cash` is fixed at creation so the ledger can be
/// audited against the stored balance at any time.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub cash: Decimal,
    pub starting_cash: Decimal,
}
