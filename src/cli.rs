//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use crate::adapters::csv_quote_adapter::CsvQuoteAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_ledger::SqliteLedger;
use crate::domain::account::Account;
use crate::domain::engine::TradeEngine;
use crate::domain::error::PapertradeError;
use crate::domain::holding::replay_cash;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

#[derive(Parser, Debug)]
#[command(name = "papertrade", about = "Paper-trading ledger and portfolio tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a new trading account
    OpenAccount {
        #[arg(long)]
        name: String,
        /// Starting cash; defaults to [account] starting_cash from config
        #[arg(long)]
        cash: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Buy shares at the current quote
    Buy {
        #[arg(long)]
        account: String,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        shares: i64,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Sell shares at the current quote
    Sell {
        #[arg(long)]
        account: String,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        shares: i64,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show current holdings with prices, cash, and total value
    Portfolio {
        #[arg(long)]
        account: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show transaction history, newest first
    History {
        #[arg(long)]
        account: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Look up the current price for a symbol
    Quote {
        #[arg(long)]
        symbol: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Verify stored cash against a replay of the ledger
    Audit {
        #[arg(long)]
        account: String,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::OpenAccount { name, cash, config } => {
            run_open_account(&name, cash.as_deref(), &config)
        }
        Command::Buy {
            account,
            symbol,
            shares,
            config,
        } => run_trade(&account, &symbol, shares, Side::Buy, &config),
        Command::Sell {
            account,
            symbol,
            shares,
            config,
        } => run_trade(&account, &symbol, shares, Side::Sell, &config),
        Command::Portfolio { account, config } => run_portfolio(&account, &config),
        Command::History { account, config } => run_history(&account, &config),
        Command::Quote { symbol, config } => run_quote(&symbol, &config),
        Command::Audit { account, config } => run_audit(&account, &config),
    }
}

enum Side {
    Buy,
    Sell,
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PapertradeError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn open_ledger(config: &dyn ConfigPort) -> Result<SqliteLedger, ExitCode> {
    let ledger = SqliteLedger::from_config(config).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    ledger.initialize_schema().map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    Ok(ledger)
}

fn open_quotes(config: &dyn ConfigPort) -> Result<CsvQuoteAdapter, ExitCode> {
    CsvQuoteAdapter::from_config(config).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn resolve_account(ledger: &SqliteLedger, name: &str) -> Result<Account, ExitCode> {
    match ledger.find_account(name) {
        Ok(Some(account)) => Ok(account),
        Ok(None) => {
            let err = PapertradeError::AccountNotFound {
                account: name.to_string(),
            };
            eprintln!("error: {err}");
            Err(ExitCode::from(&err))
        }
        Err(e) => {
            eprintln!("error: {e}");
            Err(ExitCode::from(&e))
        }
    }
}

fn run_open_account(name: &str, cash: Option<&str>, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(code) => return code,
    };

    let starting_cash = match cash {
        Some(text) => match Decimal::from_str(text) {
            Ok(amount) => amount,
            Err(_) => {
                let err = PapertradeError::InvalidInput {
                    reason: format!("cannot parse cash amount: {text}"),
                };
                eprintln!("error: {err}");
                return ExitCode::from(&err);
            }
        },
        None => match config.get_string("account", "starting_cash") {
            Some(text) => match Decimal::from_str(&text) {
                Ok(amount) => amount,
                Err(_) => {
                    let err = PapertradeError::ConfigInvalid {
                        section: "account".into(),
                        key: "starting_cash".into(),
                        reason: format!("cannot parse decimal: {text}"),
                    };
                    eprintln!("error: {err}");
                    return ExitCode::from(&err);
                }
            },
            None => Decimal::from(10_000),
        },
    };

    match ledger.open_account(name, starting_cash) {
        Ok(account) => {
            println!("Opened account {} with cash {}", account.name, account.cash);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_trade(
    account_name: &str,
    symbol: &str,
    shares: i64,
    side: Side,
    config_path: &PathBuf,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let quotes = match open_quotes(&config) {
        Ok(q) => q,
        Err(code) => return code,
    };
    let account = match resolve_account(&ledger, account_name) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let engine = TradeEngine::new(&ledger, &quotes);
    let result = match side {
        Side::Buy => engine.buy(account.id, symbol, shares),
        Side::Sell => engine.sell(account.id, symbol, shares),
    };

    match result {
        Ok(tx) => {
            let verb = if tx.is_buy() { "Bought" } else { "Sold" };
            let cash = ledger.get_cash(account.id).map(|c| c.to_string());
            println!(
                "{} {} {} at {} (cash: {})",
                verb,
                tx.shares.abs(),
                tx.symbol,
                tx.price,
                cash.unwrap_or_else(|_| "?".into()),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_portfolio(account_name: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let quotes = match open_quotes(&config) {
        Ok(q) => q,
        Err(code) => return code,
    };
    let account = match resolve_account(&ledger, account_name) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let engine = TradeEngine::new(&ledger, &quotes);
    let report = match engine.portfolio(account.id) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    if !report.lines.is_empty() {
        println!("{:<8} {:>10} {:>12} {:>14}", "SYMBOL", "SHARES", "PRICE", "VALUE");
        for line in &report.lines {
            println!(
                "{:<8} {:>10} {:>12} {:>14}",
                line.symbol, line.shares, line.price, line.value
            );
        }
    }
    println!("Cash:  {}", report.cash);
    println!("Total: {}", report.total_value);
    ExitCode::SUCCESS
}

fn run_history(account_name: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let account = match resolve_account(&ledger, account_name) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let history = match ledger.list_transactions(account.id) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    if history.is_empty() {
        eprintln!("No transactions for {}", account.name);
        return ExitCode::SUCCESS;
    }

    for tx in &history {
        let side = if tx.is_buy() { "BUY " } else { "SELL" };
        println!(
            "{}  {}  {:<8} {:>8} @ {}",
            tx.executed_at.format("%Y-%m-%d %H:%M:%S"),
            side,
            tx.symbol,
            tx.shares.abs(),
            tx.price,
        );
    }
    ExitCode::SUCCESS
}

fn run_quote(symbol: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let quotes = match open_quotes(&config) {
        Ok(q) => q,
        Err(code) => return code,
    };

    match quotes.lookup(symbol) {
        Ok(Some(quote)) => {
            println!("{}: {}", quote.symbol, quote.price);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            let err = PapertradeError::UnknownSymbol {
                symbol: symbol.trim().to_uppercase(),
            };
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_audit(account_name: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let ledger = match open_ledger(&config) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let account = match resolve_account(&ledger, account_name) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let history = match ledger.list_transactions(account.id) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    let replayed = replay_cash(account.starting_cash, &history);
    if replayed == account.cash {
        println!(
            "Audit OK: {} transactions replay from {} to {}",
            history.len(),
            account.starting_cash,
            account.cash,
        );
        ExitCode::SUCCESS
    } else {
        let err = PapertradeError::Database {
            reason: format!(
                "ledger does not replay to stored cash: replayed {replayed}, stored {}",
                account.cash
            ),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    }
}
