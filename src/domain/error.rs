//! Domain error types.

use rust_decimal::Decimal;

/// Top-level error type for papertrade.
///
/// Business-rule rejections (insufficient funds/shares, unknown symbol) carry
/// the numbers a caller needs to build an error message; infrastructure
/// failures (database, quote provider) are kept distinct so callers can
/// retry them.
#[derive(Debug, thiserror::Error)]
pub enum PapertradeError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("no such account: {account}")]
    AccountNotFound { account: String },

    #[error("no quote available for {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("quote provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("insufficient shares of {symbol}: asked to sell {requested}, hold {held}")]
    InsufficientShares {
        symbol: String,
        requested: i64,
        held: i64,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PapertradeError> for std::process::ExitCode {
    fn from(err: &PapertradeError) -> Self {
        let code: u8 = match err {
            PapertradeError::Io(_) => 1,
            PapertradeError::ConfigParse { .. }
            | PapertradeError::ConfigMissing { .. }
            | PapertradeError::ConfigInvalid { .. }
            | PapertradeError::InvalidInput { .. } => 2,
            PapertradeError::Database { .. } | PapertradeError::DatabaseQuery { .. } => 3,
            PapertradeError::UnknownSymbol { .. }
            | PapertradeError::ProviderUnavailable { .. } => 4,
            PapertradeError::AccountNotFound { .. } => 5,
            PapertradeError::InsufficientFunds { .. }
            | PapertradeError::InsufficientShares { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
