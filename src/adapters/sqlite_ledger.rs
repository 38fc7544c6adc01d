//! SQLite ledger store adapter.
//!
//! Accounts and their append-only transaction history live in one SQLite
//! database. Money columns are stored as decimal TEXT and parsed into
//! [`rust_decimal::Decimal`], so balances survive round-trips exactly.

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::account::Account;
use crate::domain::error::PapertradeError;
use crate::domain::transaction::Transaction;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;

pub struct SqliteLedger {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteLedger {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PapertradeError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| PapertradeError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path).with_init(|conn| {
            // Concurrent writers queue on the busy timeout instead of erroring.
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.pragma_update(None, "foreign_keys", "ON")
        });
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| PapertradeError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn open_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, PapertradeError> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.pragma_update(None, "foreign_keys", "ON")
        });
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e: r2d2::Error| PapertradeError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, PapertradeError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| PapertradeError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), PapertradeError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                cash TEXT NOT NULL,
                starting_cash TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                symbol TEXT NOT NULL,
                shares INTEGER NOT NULL,
                price TEXT NOT NULL,
                executed_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_account_symbol
                ON transactions(account_id, symbol);",
        )
        .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        tracing::debug!("ledger schema initialized");
        Ok(())
    }

    /// Create an account with the given starting cash.
    pub fn open_account(
        &self,
        name: &str,
        starting_cash: Decimal,
    ) -> Result<Account, PapertradeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PapertradeError::InvalidInput {
                reason: "account name must not be empty".into(),
            });
        }
        if starting_cash < Decimal::ZERO {
            return Err(PapertradeError::InvalidInput {
                reason: format!("starting cash must not be negative, got {starting_cash}"),
            });
        }

        let conn = self.conn()?;
        let cash_text = starting_cash.to_string();
        conn.execute(
            "INSERT INTO accounts (name, cash, starting_cash) VALUES (?1, ?2, ?2)",
            params![name, cash_text],
        )
        .map_err(|e: rusqlite::Error| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                PapertradeError::InvalidInput {
                    reason: format!("account name {name} is already taken"),
                }
            }
            other => PapertradeError::DatabaseQuery {
                reason: other.to_string(),
            },
        })?;

        Ok(Account {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            cash: starting_cash,
            starting_cash,
        })
    }

    /// Look an account up by name.
    pub fn find_account(&self, name: &str) -> Result<Option<Account>, PapertradeError> {
        let conn = self.conn()?;
        let row: Option<(i64, String, String, String)> = conn
            .query_row(
                "SELECT id, name, cash, starting_cash FROM accounts WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        match row {
            Some((id, name, cash, starting_cash)) => Ok(Some(Account {
                id,
                name,
                cash: parse_decimal(&cash)?,
                starting_cash: parse_decimal(&starting_cash)?,
            })),
            None => Ok(None),
        }
    }

    pub fn get_account(&self, account_id: i64) -> Result<Account, PapertradeError> {
        let conn = self.conn()?;
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT name, cash, starting_cash FROM accounts WHERE id = ?1",
                params![account_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let (name, cash, starting_cash) =
            row.ok_or_else(|| PapertradeError::AccountNotFound {
                account: account_id.to_string(),
            })?;
        Ok(Account {
            id: account_id,
            name,
            cash: parse_decimal(&cash)?,
            starting_cash: parse_decimal(&starting_cash)?,
        })
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, PapertradeError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| PapertradeError::Database {
                reason: e.to_string(),
            })
    }
}

impl LedgerPort for SqliteLedger {
    fn get_cash(&self, account_id: i64) -> Result<Decimal, PapertradeError> {
        let conn = self.conn()?;
        let cash: Option<String> = conn
            .query_row(
                "SELECT cash FROM accounts WHERE id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let cash = cash.ok_or_else(|| PapertradeError::AccountNotFound {
            account: account_id.to_string(),
        })?;
        parse_decimal(&cash)
    }

    fn list_transactions(&self, account_id: i64) -> Result<Vec<Transaction>, PapertradeError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, symbol, shares, price, executed_at
                 FROM transactions
                 WHERE account_id = ?1
                 ORDER BY id DESC",
            )
            .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map(params![account_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut transactions = Vec::new();
        for row in rows {
            let (id, symbol, shares, price, executed_at) =
                row.map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            transactions.push(Transaction {
                id,
                account_id,
                symbol,
                shares,
                price: parse_decimal(&price)?,
                executed_at: parse_timestamp(&executed_at)?,
            });
        }

        Ok(transactions)
    }

    fn record_trade(
        &self,
        account_id: i64,
        symbol: &str,
        shares: i64,
        price: Decimal,
    ) -> Result<Transaction, PapertradeError> {
        let mut conn = self.conn()?;

        // IMMEDIATE takes the write lock up front, making the read-check-write
        // below one isolated unit per database. Dropping `tx` on any error
        // path rolls the whole unit back.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e: rusqlite::Error| PapertradeError::Database {
                reason: e.to_string(),
            })?;

        let cash: Option<String> = tx
            .query_row(
                "SELECT cash FROM accounts WHERE id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        let cash = parse_decimal(&cash.ok_or_else(|| PapertradeError::AccountNotFound {
            account: account_id.to_string(),
        })?)?;

        let cost = Decimal::from(shares) * price;
        let new_cash = cash - cost;
        if new_cash < Decimal::ZERO {
            return Err(PapertradeError::InsufficientFunds {
                needed: cost,
                available: cash,
            });
        }

        // Sells re-check the net holding inside the same isolated unit, so
        // concurrent sells cannot both dispose of the same shares.
        if shares < 0 {
            let held: i64 = tx
                .query_row(
                    "SELECT COALESCE(SUM(shares), 0) FROM transactions
                     WHERE account_id = ?1 AND symbol = ?2",
                    params![account_id, symbol],
                    |row| row.get(0),
                )
                .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            if held + shares < 0 {
                return Err(PapertradeError::InsufficientShares {
                    symbol: symbol.to_string(),
                    requested: -shares,
                    held,
                });
            }
        }

        let executed_at = Utc::now();
        tx.execute(
            "UPDATE accounts SET cash = ?1 WHERE id = ?2",
            params![new_cash.to_string(), account_id],
        )
        .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
            reason: e.to_string(),
        })?;
        tx.execute(
            "INSERT INTO transactions (account_id, symbol, shares, price, executed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account_id,
                symbol,
                shares,
                price.to_string(),
                executed_at.to_rfc3339()
            ],
        )
        .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
            reason: e.to_string(),
        })?;
        let id = tx.last_insert_rowid();

        tx.commit()
            .map_err(|e: rusqlite::Error| PapertradeError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(Transaction {
            id,
            account_id,
            symbol: symbol.to_string(),
            shares,
            price,
            executed_at,
        })
    }
}

fn parse_decimal(text: &str) -> Result<Decimal, PapertradeError> {
    Decimal::from_str(text).map_err(|e| PapertradeError::Database {
        reason: format!("corrupt decimal value {text}: {e}"),
    })
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, PapertradeError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PapertradeError::Database {
            reason: format!("corrupt timestamp {text}: {e}"),
        })
}
