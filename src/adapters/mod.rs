//! Concrete adapter implementations for ports.

pub mod csv_quote_adapter;
pub mod file_config_adapter;
pub mod sqlite_ledger;
