//! # Settlement
//!
//! Order orchestration and the public service façade.
//!
//! - [`orchestrator`] - create / get / cancel orders atomically
//! - [`service`] - `SettlementService`, the single entry point
//! - [`error`] - `SettlementError`, what every operation returns on failure

pub mod error;
pub mod orchestrator;
pub mod service;

pub use error::{SettlementError, SettlementResult};
pub use orchestrator::{CreateOrderRequest, OrderLineRequest, OrderOrchestrator, Settlement};
pub use service::SettlementService;
