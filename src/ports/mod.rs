//! Port traits at the seams of the domain.

pub mod config_port;
pub mod ledger_port;
pub mod quote_port;
