//! # bahi-db: Storage and Settlement Services for Bahi
//!
//! Every database operation and every transaction boundary of the Bahi
//! settlement engine. SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bahi Settlement Flow                             │
//! │                                                                         │
//! │  Billing UI / HTTP handler                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bahi-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   SettlementService                                             │   │
//! │  │     ├── OrderOrchestrator ──┐                                   │   │
//! │  │     ├── PaymentLedgerService├──► UnitOfWork + Coordinator       │   │
//! │  │     └── StockLedger ────────┘          │                        │   │
//! │  │                                        ▼                        │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ item, order,  │    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │ payment, stock│    │ 001_init.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)   <data dir>/bahi.db                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `SettlementConfig` (TOML file + `BAHI_*` environment)
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Table-level data access
//! - [`unit_of_work`] - Transactions and per-order locks
//! - [`ledger`] - Payment and stock ledgers
//! - [`settlement`] - Order orchestration and the service façade
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bahi_db::{Database, SettlementConfig, SettlementService};
//!
//! let config = SettlementConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let service = SettlementService::new(&db, &config);
//!
//! let settlement = service.create_order(request).await?;
//! let history = service.get_stock_history(&item_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod settlement;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, SettlementConfig};
pub use error::{DbError, DbResult};
pub use ledger::{PaymentLedgerService, StockLedger};
pub use pool::{Database, DbConfig};
pub use settlement::{
    CreateOrderRequest, OrderLineRequest, OrderOrchestrator, Settlement, SettlementError,
    SettlementResult, SettlementService,
};
pub use unit_of_work::{Coordinator, OrderGuard, UnitOfWork};

// Repository re-exports for convenience
pub use repository::item::ItemRepository;
pub use repository::order::OrderRepository;
pub use repository::payment::PaymentRepository;
pub use repository::sequence::SequenceRepository;
pub use repository::stock::StockRepository;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, with debug output for Bahi
/// crates and only warnings from sqlx. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bahi_db=debug,bahi_core=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
