//! Core domain types and logic.

pub mod account;
pub mod engine;
pub mod error;
pub mod holding;
pub mod portfolio;
pub mod transaction;
