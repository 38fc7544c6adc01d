//! End-to-end tests through the real SQLite ledger store.
//!
//! Covers the full trade lifecycle (buy, rejected sell, closing sell,
//! unknown symbol), cash-conservation replay, read-view idempotence, and
//! concurrent trades racing for the same cash.

mod common;

use common::*;
use papertrade::adapters::sqlite_ledger::SqliteLedger;
use papertrade::domain::engine::TradeEngine;
use papertrade::domain::error::PapertradeError;
use papertrade::domain::holding::{net_holdings, replay_cash};
use papertrade::ports::ledger_port::LedgerPort;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod trading_scenario {
    use super::*;

    #[test]
    fn full_lifecycle_on_one_account() {
        let ledger = open_ledger();
        let account_id = funded_account(&ledger, "alice", dec!(10000.00));

        // Buy 10 aapl at 150.00.
        let quotes = MockQuotePort::new().with_price("AAPL", dec!(150.00));
        let engine = TradeEngine::new(&ledger, &quotes);
        let tx = engine.buy(account_id, "aapl", 10).unwrap();
        assert_eq!(tx.symbol, "AAPL");
        assert_eq!(ledger.get_cash(account_id).unwrap(), dec!(8500.00));
        assert_eq!(engine.holdings(account_id).unwrap().get("AAPL"), Some(&10));

        // Selling 15 exceeds the holding; nothing changes.
        let err = engine.sell(account_id, "AAPL", 15).unwrap_err();
        assert!(matches!(err, PapertradeError::InsufficientShares { .. }));
        assert_eq!(ledger.get_cash(account_id).unwrap(), dec!(8500.00));
        assert_eq!(ledger.list_transactions(account_id).unwrap().len(), 1);

        // Sell the full holding at 160.00; the symbol drops out.
        let quotes = MockQuotePort::new().with_price("AAPL", dec!(160.00));
        let engine = TradeEngine::new(&ledger, &quotes);
        engine.sell(account_id, "AAPL", 10).unwrap();
        assert_eq!(ledger.get_cash(account_id).unwrap(), dec!(10100.00));
        assert!(engine.holdings(account_id).unwrap().is_empty());

        // Unknown symbol leaves no trace.
        let err = engine.buy(account_id, "ZZZZ", 1).unwrap_err();
        assert!(matches!(err, PapertradeError::UnknownSymbol { .. }));
        assert_eq!(ledger.get_cash(account_id).unwrap(), dec!(10100.00));
        assert_eq!(ledger.list_transactions(account_id).unwrap().len(), 2);
    }

    #[test]
    fn replay_matches_stored_cash_after_lifecycle() {
        let ledger = open_ledger();
        let account_id = funded_account(&ledger, "alice", dec!(10000.00));

        let quotes = MockQuotePort::new()
            .with_price("AAPL", dec!(150.00))
            .with_price("MSFT", dec!(402.75));
        let engine = TradeEngine::new(&ledger, &quotes);
        engine.buy(account_id, "AAPL", 10).unwrap();
        engine.buy(account_id, "MSFT", 4).unwrap();
        engine.sell(account_id, "AAPL", 3).unwrap();

        let account = ledger.get_account(account_id).unwrap();
        let history = ledger.list_transactions(account_id).unwrap();
        assert_eq!(replay_cash(account.starting_cash, &history), account.cash);
    }

    #[test]
    fn rejected_buy_changes_nothing() {
        let ledger = open_ledger();
        let account_id = funded_account(&ledger, "alice", dec!(100.00));

        let quotes = MockQuotePort::new().with_price("AAPL", dec!(150.00));
        let engine = TradeEngine::new(&ledger, &quotes);

        let err = engine.buy(account_id, "AAPL", 1).unwrap_err();
        assert!(matches!(err, PapertradeError::InsufficientFunds { .. }));
        assert_eq!(ledger.get_cash(account_id).unwrap(), dec!(100.00));
        assert!(ledger.list_transactions(account_id).unwrap().is_empty());
    }

    #[test]
    fn accounts_are_isolated() {
        let ledger = open_ledger();
        let alice = funded_account(&ledger, "alice", dec!(10000.00));
        let bob = funded_account(&ledger, "bob", dec!(500.00));

        let quotes = MockQuotePort::new().with_price("AAPL", dec!(150.00));
        let engine = TradeEngine::new(&ledger, &quotes);
        engine.buy(alice, "AAPL", 10).unwrap();

        assert_eq!(ledger.get_cash(bob).unwrap(), dec!(500.00));
        assert!(engine.holdings(bob).unwrap().is_empty());
        assert!(matches!(
            engine.sell(bob, "AAPL", 1),
            Err(PapertradeError::InsufficientShares { held: 0, .. })
        ));
    }

    #[test]
    fn provider_outage_surfaces_as_error() {
        let ledger = open_ledger();
        let account_id = funded_account(&ledger, "alice", dec!(10000.00));

        let quotes = MockQuotePort::down();
        let engine = TradeEngine::new(&ledger, &quotes);

        assert!(matches!(
            engine.buy(account_id, "AAPL", 1),
            Err(PapertradeError::ProviderUnavailable { .. })
        ));
        assert_eq!(ledger.get_cash(account_id).unwrap(), dec!(10000.00));
    }
}

mod read_views {
    use super::*;

    #[test]
    fn portfolio_and_history_are_idempotent() {
        let ledger = open_ledger();
        let account_id = funded_account(&ledger, "alice", dec!(10000.00));

        let quotes = MockQuotePort::new().with_price("AAPL", dec!(150.00));
        let engine = TradeEngine::new(&ledger, &quotes);
        engine.buy(account_id, "AAPL", 10).unwrap();

        let first = engine.portfolio(account_id).unwrap();
        let second = engine.portfolio(account_id).unwrap();
        assert_eq!(first, second);

        assert_eq!(
            engine.history(account_id).unwrap(),
            engine.history(account_id).unwrap()
        );
    }

    #[test]
    fn portfolio_skips_delisted_symbol_but_keeps_the_rest() {
        let ledger = open_ledger();
        let account_id = funded_account(&ledger, "alice", dec!(10000.00));

        let quotes = MockQuotePort::new()
            .with_price("AAPL", dec!(150.00))
            .with_price("GONE", dec!(10.00));
        let engine = TradeEngine::new(&ledger, &quotes);
        engine.buy(account_id, "AAPL", 10).unwrap();
        engine.buy(account_id, "GONE", 5).unwrap();

        // GONE is delisted before the next portfolio view.
        let quotes = MockQuotePort::new().with_price("AAPL", dec!(155.00));
        let engine = TradeEngine::new(&ledger, &quotes);
        let report = engine.portfolio(account_id).unwrap();

        assert_eq!(report.lines.len(), 1);
        assert_eq!(report.lines[0].symbol, "AAPL");
        assert_eq!(report.lines[0].value, dec!(1550.00));
        assert_eq!(report.cash, dec!(8450.00));
        assert_eq!(report.total_value, dec!(10000.00));
    }

    #[test]
    fn history_is_newest_first() {
        let ledger = open_ledger();
        let account_id = funded_account(&ledger, "alice", dec!(10000.00));

        let quotes = MockQuotePort::new()
            .with_price("AAPL", dec!(150.00))
            .with_price("MSFT", dec!(400.00));
        let engine = TradeEngine::new(&ledger, &quotes);
        engine.buy(account_id, "AAPL", 1).unwrap();
        engine.buy(account_id, "MSFT", 1).unwrap();

        let history = engine.history(account_id).unwrap();
        assert_eq!(history[0].symbol, "MSFT");
        assert_eq!(history[1].symbol, "AAPL");
    }
}

mod concurrent_trades {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn racing_buys_never_overspend() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ledger.db");

        let ledger = Arc::new(SqliteLedger::open_file(&db_path).unwrap());
        ledger.initialize_schema().unwrap();
        // 1000 of cash at 150 a share: at most 6 single-share buys can clear.
        let account_id = ledger.open_account("alice", dec!(1000.00)).unwrap().id;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                let quotes = MockQuotePort::new().with_price("AAPL", dec!(150.00));
                let engine = TradeEngine::new(&*ledger, &quotes);
                engine.buy(account_id, "AAPL", 1)
            }));
        }

        let mut approved = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => approved += 1,
                Err(PapertradeError::InsufficientFunds { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(approved, 6);
        assert_eq!(rejected, 2);

        let cash = ledger.get_cash(account_id).unwrap();
        assert_eq!(cash, dec!(100.00));
        assert!(cash >= Decimal::ZERO);

        let history = ledger.list_transactions(account_id).unwrap();
        assert_eq!(history.len(), 6);
        assert_eq!(net_holdings(&history).get("AAPL"), Some(&6));
        assert_eq!(replay_cash(dec!(1000.00), &history), cash);
    }

    #[test]
    fn racing_sells_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ledger.db");

        let ledger = Arc::new(SqliteLedger::open_file(&db_path).unwrap());
        ledger.initialize_schema().unwrap();
        let account_id = ledger.open_account("alice", dec!(10000.00)).unwrap().id;
        ledger
            .record_trade(account_id, "AAPL", 4, dec!(150.00))
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                let quotes = MockQuotePort::new().with_price("AAPL", dec!(160.00));
                let engine = TradeEngine::new(&*ledger, &quotes);
                engine.sell(account_id, "AAPL", 1)
            }));
        }

        let mut approved = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => approved += 1,
                Err(PapertradeError::InsufficientShares { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(approved, 4);

        let history = ledger.list_transactions(account_id).unwrap();
        assert!(!net_holdings(&history).contains_key("AAPL"));

        let account = ledger.get_account(account_id).unwrap();
        assert_eq!(replay_cash(account.starting_cash, &history), account.cash);
    }
}
