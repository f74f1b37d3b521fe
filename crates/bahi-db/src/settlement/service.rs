//! # Settlement Service
//!
//! The façade the billing UI and HTTP layer call. Every method is one
//! request and runs in exactly one unit of work (reads use a plain
//! connection).
//!
//! ## Example
//! ```rust,ignore
//! let config = SettlementConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let service = SettlementService::new(&db, &config);
//!
//! let settlement = service.create_order(request).await?;
//! let ledger = service
//!     .add_installment(&settlement.order.id, &InstallmentInput::new(amount, PaymentMethod::Cash))
//!     .await?;
//! ```

use crate::config::SettlementConfig;
use crate::ledger::{PaymentLedgerService, StockLedger};
use crate::pool::Database;
use crate::settlement::error::SettlementResult;
use crate::settlement::orchestrator::{CreateOrderRequest, OrderOrchestrator, Settlement};
use bahi_core::{InstallmentInput, Order, PaymentLedger, StockLedgerEntry};

/// Entry point for every settlement operation.
#[derive(Debug, Clone)]
pub struct SettlementService {
    orders: OrderOrchestrator,
    payments: PaymentLedgerService,
    stock: StockLedger,
}

impl SettlementService {
    pub fn new(db: &Database, config: &SettlementConfig) -> Self {
        SettlementService {
            orders: OrderOrchestrator::new(db.clone(), config.home_region()),
            payments: PaymentLedgerService::new(db.clone()),
            stock: StockLedger::new(db.clone(), config.history_page_size()),
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn create_order(&self, request: CreateOrderRequest) -> SettlementResult<Settlement> {
        self.orders.create_order(request).await
    }

    pub async fn get_order(&self, order_id: &str) -> SettlementResult<Order> {
        self.orders.get_order(order_id).await
    }

    pub async fn cancel_order(&self, order_id: &str, reason: &str) -> SettlementResult<Order> {
        self.orders.cancel_order(order_id, reason).await
    }

    // =========================================================================
    // Payments
    // =========================================================================

    pub async fn add_installment(
        &self,
        order_id: &str,
        input: &InstallmentInput,
    ) -> SettlementResult<PaymentLedger> {
        self.payments.add_installment(order_id, input).await
    }

    pub async fn update_installment(
        &self,
        order_id: &str,
        installment_id: &str,
        input: &InstallmentInput,
    ) -> SettlementResult<PaymentLedger> {
        self.payments
            .update_installment(order_id, installment_id, input)
            .await
    }

    pub async fn remove_installment(
        &self,
        order_id: &str,
        installment_id: &str,
    ) -> SettlementResult<PaymentLedger> {
        self.payments
            .remove_installment(order_id, installment_id)
            .await
    }

    pub async fn get_ledger(&self, order_id: &str) -> SettlementResult<PaymentLedger> {
        self.payments.get_ledger(order_id).await
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Newest page of an item's stock history, sized by configuration.
    pub async fn get_stock_history(&self, item_id: &str) -> SettlementResult<Vec<StockLedgerEntry>> {
        self.stock.history(item_id, None).await
    }

    /// Next page of history, older than entry `before`.
    pub async fn get_stock_history_before(
        &self,
        item_id: &str,
        before: i64,
        limit: Option<u32>,
    ) -> SettlementResult<Vec<StockLedgerEntry>> {
        self.stock.history_before(item_id, before, limit).await
    }

    pub async fn adjust_stock(
        &self,
        item_id: &str,
        delta: i64,
        reason: &str,
    ) -> SettlementResult<StockLedgerEntry> {
        self.stock.adjust(item_id, delta, reason).await
    }
}
