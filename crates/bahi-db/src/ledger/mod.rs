//! # Ledgers
//!
//! - [`payment`] - installments and the recomputed balance of each order
//! - [`stock`] - append-only stock movements and the live stock counter

pub mod payment;
pub mod stock;

pub use payment::PaymentLedgerService;
pub use stock::StockLedger;
