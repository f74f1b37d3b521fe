//! # Repository Module
//!
//! Data access for each table.
//!
//! ## Connection-Scoped Repositories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Every repository function takes `&mut SqliteConnection`:               │
//! │                                                                         │
//! │    uow.conn()      → writes that must commit or abort together          │
//! │    db.acquire()    → plain reads                                        │
//! │                                                                         │
//! │  ┌───────────────┐ ┌───────────────┐ ┌───────────────┐                  │
//! │  │ItemRepository │ │OrderRepository│ │PaymentRepo... │                  │
//! │  │ items         │ │ orders        │ │ payment_*     │                  │
//! │  └───────────────┘ │ order_lines   │ └───────────────┘                  │
//! │  ┌───────────────┐ └───────────────┘ ┌───────────────┐                  │
//! │  │StockRepository│                   │SequenceRepo...│                  │
//! │  │ stock_ledger  │                   │order_sequences│                  │
//! │  └───────────────┘                   └───────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No repository ever begins or commits a transaction.

pub mod item;
pub mod order;
pub mod payment;
pub mod sequence;
pub mod stock;

pub use item::ItemRepository;
pub use order::OrderRepository;
pub use payment::PaymentRepository;
pub use sequence::SequenceRepository;
pub use stock::StockRepository;
