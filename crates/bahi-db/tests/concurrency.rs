//! Concurrent settlement against a file database with several pooled
//! connections (WAL), where writers really do race each other.

use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use bahi_core::{
    CounterpartySnapshot, InstallmentInput, Item, LedgerStatus, Money, OrderKind, PaymentMethod,
    TaxRate,
};
use bahi_db::{
    CreateOrderRequest, Database, DbConfig, ItemRepository, OrderLineRequest, Settlement,
    SettlementConfig, SettlementError, SettlementResult, SettlementService,
};

const ROUNDS: usize = 20;

// =============================================================================
// Helpers
// =============================================================================

async fn setup() -> (TempDir, Database, SettlementService) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("bahi.db"))
        .max_connections(5)
        .busy_timeout(Duration::from_secs(10));
    let db = Database::new(config).await.unwrap();
    let service = SettlementService::new(&db, &SettlementConfig::default());
    (dir, db, service)
}

async fn add_item(db: &Database, stock: i64) -> String {
    let now = Utc::now();
    let item = Item {
        id: Uuid::new_v4().to_string(),
        name: "Masala Chai 250g".to_string(),
        hsn_code: Some("0902".to_string()),
        unit_price: Money::from_minor(12_500),
        tax_rate: TaxRate::from_bps(500),
        current_stock: stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let mut conn = db.acquire().await.unwrap();
    ItemRepository::insert(&mut conn, &item).await.unwrap();
    item.id
}

async fn stock_of(db: &Database, item_id: &str) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    ItemRepository::current_stock(&mut conn, item_id)
        .await
        .unwrap()
        .unwrap()
}

fn sale(item_id: &str, quantity: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        kind: OrderKind::Sale,
        counterparty: CounterpartySnapshot {
            id: None,
            name: "Counter Sale".to_string(),
            region_code: "27".to_string(),
        },
        lines: vec![OrderLineRequest {
            item_id: item_id.to_string(),
            quantity,
            unit_price: None,
            discount: None,
        }],
        initial_payment: None,
        notes: None,
    }
}

/// Runs two sales at once and returns both outcomes.
async fn race(
    service: &SettlementService,
    first: CreateOrderRequest,
    second: CreateOrderRequest,
) -> [SettlementResult<Settlement>; 2] {
    let a = {
        let service = service.clone();
        tokio::spawn(async move { service.create_order(first).await })
    };
    let b = {
        let service = service.clone();
        tokio::spawn(async move { service.create_order(second).await })
    };
    [a.await.unwrap(), b.await.unwrap()]
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_on_unrelated_items_all_commit() {
    let (_dir, db, service) = setup().await;

    for _ in 0..ROUNDS {
        let tea = add_item(&db, 10).await;
        let sugar = add_item(&db, 10).await;

        let results = race(&service, sale(&tea, 1), sale(&sugar, 1)).await;
        for result in &results {
            assert!(result.is_ok(), "sale failed: {:?}", result.as_ref().err());
        }

        assert_eq!(stock_of(&db, &tea).await, 9);
        assert_eq!(stock_of(&db, &sugar).await, 9);
    }

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(orders, 2 * ROUNDS as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_race_never_oversells() {
    let (_dir, db, service) = setup().await;

    for _ in 0..ROUNDS {
        let item = add_item(&db, 1).await;

        let results = race(&service, sale(&item, 1), sale(&item, 1)).await;
        let won = results.iter().filter(|r| r.is_ok()).count();
        let short = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(SettlementError::InsufficientStock { requested: 1, available: 0, .. })
                )
            })
            .count();

        let errors: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(won, 1, "errors: {:?}", errors);
        assert_eq!(short, 1);
        assert_eq!(stock_of(&db, &item).await, 0);

        let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_ledger WHERE item_id = ?1")
            .bind(&item)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(entries, 1);
    }

    let lowest_stock: i64 = sqlx::query_scalar("SELECT MIN(current_stock) FROM items")
        .fetch_one(db.pool())
        .await
        .unwrap();
    let lowest_closing: i64 = sqlx::query_scalar("SELECT MIN(closing_stock) FROM stock_ledger")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(lowest_stock, 0);
    assert_eq!(lowest_closing, 0);
}

// =============================================================================
// Payments
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_on_different_orders() {
    let (_dir, db, service) = setup().await;
    let item = add_item(&db, 10).await;

    let mut order_ids = Vec::new();
    for _ in 0..2 {
        let settlement = service.create_order(sale(&item, 1)).await.unwrap();
        order_ids.push(settlement.order.id);
    }

    // 4 installments per order, all in flight together
    let tasks: Vec<_> = order_ids
        .iter()
        .flat_map(|order_id| std::iter::repeat(order_id.clone()).take(4))
        .map(|order_id| {
            let service = service.clone();
            tokio::spawn(async move {
                let input = InstallmentInput::new(Money::from_minor(1_000), PaymentMethod::Upi);
                service.add_installment(&order_id, &input).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    for order_id in &order_ids {
        let ledger = service.get_ledger(order_id).await.unwrap();
        assert_eq!(ledger.installments().len(), 4);
        assert_eq!(ledger.total_paid(), Money::from_minor(4_000));
        assert_eq!(ledger.balance(), ledger.order_total() - Money::from_minor(4_000));
        assert_eq!(ledger.status(), LedgerStatus::PartiallyPaid);
    }
    assert_eq!(db.coordinator().active_locks(), 0);
}
