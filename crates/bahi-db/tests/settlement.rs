//! End-to-end settlement tests against an in-memory database.

use chrono::Utc;
use uuid::Uuid;

use bahi_core::stock::is_continuous;
use bahi_core::{
    CounterpartySnapshot, DiscountInput, InstallmentInput, Item, LedgerStatus, Money, OrderKind,
    OrderStatus, PaymentMethod, StockDirection, TaxRate, ValidationError,
};
use bahi_db::{
    CreateOrderRequest, Database, DbConfig, ItemRepository, OrderLineRequest, SettlementConfig,
    SettlementError, SettlementService,
};

// =============================================================================
// Helpers
// =============================================================================

async fn setup() -> (Database, SettlementService) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let service = SettlementService::new(&db, &SettlementConfig::default());
    (db, service)
}

async fn add_item(db: &Database, price_minor: i64, tax_bps: u32, stock: i64) -> String {
    let now = Utc::now();
    let item = Item {
        id: Uuid::new_v4().to_string(),
        name: format!("Item {}", price_minor),
        hsn_code: Some("9999".to_string()),
        unit_price: Money::from_minor(price_minor),
        tax_rate: TaxRate::from_bps(tax_bps),
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

async fn row_count(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(db.pool())
        .await
        .unwrap()
}

fn line(item_id: &str, quantity: i64) -> OrderLineRequest {
    OrderLineRequest {
        item_id: item_id.to_string(),
        quantity,
        unit_price: None,
        discount: None,
    }
}

fn request(kind: OrderKind, region: &str, lines: Vec<OrderLineRequest>) -> CreateOrderRequest {
    CreateOrderRequest {
        kind,
        counterparty: CounterpartySnapshot {
            id: None,
            name: "Mehta General Stores".to_string(),
            region_code: region.to_string(),
        },
        lines,
        initial_payment: None,
        notes: None,
    }
}

fn cash(major: i64) -> InstallmentInput {
    InstallmentInput::new(Money::from_major(major), PaymentMethod::Cash)
}

// =============================================================================
// Tax scenarios
// =============================================================================

#[tokio::test]
async fn test_same_region_sale_splits_tax() {
    let (db, service) = setup().await;
    let item = add_item(&db, 10_000, 1800, 10).await;

    let settlement = service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 2)]))
        .await
        .unwrap();

    let totals = settlement.order.totals;
    assert_eq!(totals.taxable, Money::from_major(200));
    assert_eq!(totals.component_a, Money::from_major(18));
    assert_eq!(totals.component_b, Money::from_major(18));
    assert!(totals.cross_region.is_zero());
    assert_eq!(totals.grand_total, Money::from_major(236));
    assert_eq!(settlement.ledger.balance(), Money::from_major(236));
    assert_eq!(settlement.ledger.status(), LedgerStatus::Unpaid);
}

#[tokio::test]
async fn test_cross_region_sale_uses_single_component() {
    let (db, service) = setup().await;
    let item = add_item(&db, 10_000, 1800, 10).await;

    let settlement = service
        .create_order(request(OrderKind::Sale, "29", vec![line(&item, 2)]))
        .await
        .unwrap();

    let totals = settlement.order.totals;
    assert_eq!(totals.taxable, Money::from_major(200));
    assert!(totals.component_a.is_zero());
    assert!(totals.component_b.is_zero());
    assert_eq!(totals.cross_region, Money::from_major(36));
    assert_eq!(totals.grand_total, Money::from_major(236));
}

#[tokio::test]
async fn test_line_totals_sum_to_grand_total() {
    let (db, service) = setup().await;
    let rice = add_item(&db, 5_250, 500, 100).await;
    let soap = add_item(&db, 3_333, 1800, 100).await;
    let book = add_item(&db, 999, 1200, 100).await;

    let mut lines = vec![line(&rice, 3), line(&soap, 7), line(&book, 11)];
    lines[1].discount = Some(DiscountInput::Percent(750));
    lines[2].discount = Some(DiscountInput::Amount(Money::from_minor(101)));

    let settlement = service
        .create_order(request(OrderKind::Sale, "27", lines))
        .await
        .unwrap();

    let order = &settlement.order;
    let line_sum = Money::checked_sum(order.lines.iter().map(|l| l.amounts.line_total)).unwrap();
    assert_eq!(line_sum, order.totals.grand_total);

    for l in &order.lines {
        let tax = l.amounts.tax;
        assert!(tax.cross_region.is_zero() || (tax.component_a + tax.component_b).is_zero());
        assert!((0..=1).contains(&(tax.component_b.minor() - tax.component_a.minor())));
    }

    let reloaded = service.get_order(&order.id).await.unwrap();
    assert_eq!(reloaded.totals, order.totals);
    assert_eq!(reloaded.lines.len(), 3);
    assert_eq!(reloaded.lines[1].amounts.discount.percent_bps(), 750);
}

// =============================================================================
// Atomicity
// =============================================================================

#[tokio::test]
async fn test_insufficient_stock_leaves_nothing_behind() {
    let (db, service) = setup().await;
    let item = add_item(&db, 10_000, 0, 3).await;

    let err = service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 5)]))
        .await
        .unwrap_err();

    match err {
        SettlementError::InsufficientStock {
            item_id,
            requested,
            available,
        } => {
            assert_eq!(item_id, item);
            assert_eq!(requested, 5);
            assert_eq!(available, 3);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(stock_of(&db, &item).await, 3);
    assert_eq!(row_count(&db, "orders").await, 0);
    assert_eq!(row_count(&db, "order_lines").await, 0);
    assert_eq!(row_count(&db, "payment_ledgers").await, 0);
    assert_eq!(row_count(&db, "stock_ledger").await, 0);
    assert_eq!(row_count(&db, "order_sequences").await, 0);
}

#[tokio::test]
async fn test_failure_at_second_stock_entry_rolls_back_everything() {
    let (db, service) = setup().await;
    let first = add_item(&db, 10_000, 1800, 10).await;
    let second = add_item(&db, 20_000, 500, 10).await;

    sqlx::query(
        r#"
        CREATE TRIGGER fail_second_stock_entry
        BEFORE INSERT ON stock_ledger
        WHEN (SELECT COUNT(*) FROM stock_ledger) >= 1
        BEGIN
            SELECT RAISE(ABORT, 'injected failure');
        END
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let mut req = request(OrderKind::Sale, "27", vec![line(&first, 2), line(&second, 1)]);
    req.initial_payment = Some(cash(100));

    let err = service.create_order(req).await.unwrap_err();
    assert!(matches!(err, SettlementError::PersistenceFailure(_)));
    assert!(err.is_retryable());

    assert_eq!(stock_of(&db, &first).await, 10);
    assert_eq!(stock_of(&db, &second).await, 10);
    assert_eq!(row_count(&db, "orders").await, 0);
    assert_eq!(row_count(&db, "order_lines").await, 0);
    assert_eq!(row_count(&db, "payment_ledgers").await, 0);
    assert_eq!(row_count(&db, "payment_installments").await, 0);
    assert_eq!(row_count(&db, "stock_ledger").await, 0);
}

#[tokio::test]
async fn test_concurrent_sales_of_last_unit() {
    let (db, service) = setup().await;
    let item = add_item(&db, 10_000, 0, 1).await;

    let a = {
        let service = service.clone();
        let req = request(OrderKind::Sale, "27", vec![line(&item, 1)]);
        tokio::spawn(async move { service.create_order(req).await })
    };
    let b = {
        let service = service.clone();
        let req = request(OrderKind::Sale, "27", vec![line(&item, 1)]);
        tokio::spawn(async move { service.create_order(req).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let won = results.iter().filter(|r| r.is_ok()).count();
    let short = results
        .iter()
        .filter(|r| matches!(r, Err(SettlementError::InsufficientStock { available: 0, .. })))
        .count();

    assert_eq!(won, 1);
    assert_eq!(short, 1);
    assert_eq!(stock_of(&db, &item).await, 0);
}

// =============================================================================
// Payment ledger
// =============================================================================

#[tokio::test]
async fn test_installments_drive_order_status() {
    let (db, service) = setup().await;
    let item = add_item(&db, 100_000, 0, 5).await;

    let settlement = service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 1)]))
        .await
        .unwrap();
    let order_id = settlement.order.id.clone();
    assert_eq!(settlement.ledger.order_total(), Money::from_major(1000));

    let ledger = service.add_installment(&order_id, &cash(400)).await.unwrap();
    assert_eq!(ledger.balance(), Money::from_major(600));
    assert_eq!(ledger.status(), LedgerStatus::PartiallyPaid);
    assert_eq!(service.get_order(&order_id).await.unwrap().status, OrderStatus::Pending);

    let ledger = service.add_installment(&order_id, &cash(600)).await.unwrap();
    assert!(ledger.balance().is_zero());
    assert_eq!(ledger.status(), LedgerStatus::FullyPaid);
    assert_eq!(service.get_order(&order_id).await.unwrap().status, OrderStatus::Completed);

    let six_hundred = ledger
        .installments()
        .iter()
        .find(|i| i.amount == Money::from_major(600))
        .unwrap()
        .id
        .clone();
    let ledger = service.remove_installment(&order_id, &six_hundred).await.unwrap();
    assert_eq!(ledger.balance(), Money::from_major(600));
    assert_eq!(ledger.status(), LedgerStatus::PartiallyPaid);
    assert_eq!(service.get_order(&order_id).await.unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_update_installment_and_stored_totals_agree() {
    let (db, service) = setup().await;
    let item = add_item(&db, 50_000, 0, 5).await;

    let mut req = request(OrderKind::Sale, "27", vec![line(&item, 1)]);
    req.initial_payment = Some(cash(100));
    let settlement = service.create_order(req).await.unwrap();
    let order_id = settlement.order.id.clone();
    let installment_id = settlement.ledger.installments()[0].id.clone();

    let mut edit = InstallmentInput::new(Money::from_major(550), PaymentMethod::Upi);
    edit.note = Some("paid in full, overpaid by 50".to_string());
    let ledger = service
        .update_installment(&order_id, &installment_id, &edit)
        .await
        .unwrap();

    assert_eq!(ledger.installments().len(), 1);
    assert_eq!(ledger.installments()[0].method, PaymentMethod::Upi);
    assert_eq!(ledger.balance(), Money::from_major(-50));
    assert_eq!(ledger.status(), LedgerStatus::FullyPaid);

    let (total_paid, balance, status): (i64, i64, String) = sqlx::query_as(
        "SELECT total_paid, balance, status FROM payment_ledgers WHERE order_id = ?1",
    )
    .bind(&order_id)
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(total_paid, 55_000);
    assert_eq!(balance, -5_000);
    assert_eq!(status, "fully_paid");

    let reread = service.get_ledger(&order_id).await.unwrap();
    assert_eq!(reread.totals(), ledger.totals());
}

#[tokio::test]
async fn test_unknown_installment_is_not_found() {
    let (db, service) = setup().await;
    let item = add_item(&db, 10_000, 0, 5).await;

    let mut with_payment = request(OrderKind::Sale, "27", vec![line(&item, 1)]);
    with_payment.initial_payment = Some(cash(10));
    let first = service.create_order(with_payment).await.unwrap();
    let second = service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 1)]))
        .await
        .unwrap();

    let missing = Uuid::new_v4().to_string();
    let err = service
        .remove_installment(&first.order.id, &missing)
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::NotFound { .. }));

    // An installment of another order does not belong to this ledger.
    let foreign = first.ledger.installments()[0].id.clone();
    let err = service
        .update_installment(&second.order.id, &foreign, &cash(5))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::NotFound { .. }));

    let err = service.get_ledger(&missing).await.unwrap_err();
    assert!(matches!(err, SettlementError::NotFound { .. }));

    let err = service
        .add_installment(&first.order.id, &cash(0))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Validation(_)));
}

// =============================================================================
// Stock ledger
// =============================================================================

#[tokio::test]
async fn test_stock_history_is_continuous() {
    let (db, service) = setup().await;
    let item = add_item(&db, 10_000, 0, 0).await;

    service
        .create_order(request(OrderKind::Purchase, "27", vec![line(&item, 20)]))
        .await
        .unwrap();
    service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 3)]))
        .await
        .unwrap();
    service.adjust_stock(&item, -2, "damaged").await.unwrap();
    service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 4)]))
        .await
        .unwrap();

    let history = service.get_stock_history(&item).await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(is_continuous(&history));
    assert_eq!(history[0].closing_stock, 11);
    assert_eq!(history[3].direction, StockDirection::In);
    assert_eq!(history[3].opening_stock, 0);
    assert_eq!(history[1].direction, StockDirection::Adjustment);
    assert!(history[1].reference.is_none());
    assert_eq!(
        history[0].reference.as_ref().map(|r| r.kind),
        Some(OrderKind::Sale)
    );
    assert_eq!(stock_of(&db, &item).await, 11);

    let older = service
        .get_stock_history_before(&item, history[1].entry_no, None)
        .await
        .unwrap();
    assert_eq!(older.len(), 2);
    assert_eq!(older[0].entry_no, history[2].entry_no);
}

#[tokio::test]
async fn test_history_respects_configured_page_size() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let mut config = SettlementConfig::default();
    config.ledger.history_page_size = 2;
    let service = SettlementService::new(&db, &config);
    let item = add_item(&db, 1_000, 0, 0).await;

    for _ in 0..5 {
        service.adjust_stock(&item, 1, "recount").await.unwrap();
    }

    let page = service.get_stock_history(&item).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].closing_stock, 5);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_sale_restores_stock() {
    let (db, service) = setup().await;
    let item = add_item(&db, 10_000, 1800, 10).await;

    let settlement = service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 4)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, &item).await, 6);

    let order = service
        .cancel_order(&settlement.order.id, "customer returned goods")
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(!order.is_active);
    assert_eq!(order.cancel_reason.as_deref(), Some("customer returned goods"));
    assert!(order.cancelled_at.is_some());
    assert_eq!(stock_of(&db, &item).await, 10);

    let history = service.get_stock_history(&item).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].direction, StockDirection::Adjustment);
    assert_eq!(history[0].quantity_delta, 4);
    assert!(is_continuous(&history));

    let err = service
        .cancel_order(&settlement.order.id, "again")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SettlementError::Validation(ValidationError::InvalidTransition { .. })
    ));

    // Payments on a cancelled order never move it out of cancelled.
    service
        .add_installment(&settlement.order.id, &cash(236))
        .await
        .unwrap();
    assert_eq!(
        service.get_order(&settlement.order.id).await.unwrap().status,
        OrderStatus::Cancelled
    );
}

#[tokio::test]
async fn test_cancel_purchase_needs_stock_on_hand() {
    let (db, service) = setup().await;
    let item = add_item(&db, 10_000, 0, 0).await;

    let purchase = service
        .create_order(request(OrderKind::Purchase, "27", vec![line(&item, 5)]))
        .await
        .unwrap();
    service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 4)]))
        .await
        .unwrap();

    let err = service
        .cancel_order(&purchase.order.id, "wrong supplier")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SettlementError::InsufficientStock { requested: 5, available: 1, .. }
    ));
    assert_eq!(stock_of(&db, &item).await, 1);
    assert_eq!(
        service.get_order(&purchase.order.id).await.unwrap().status,
        OrderStatus::Pending
    );
}

// =============================================================================
// Order numbers
// =============================================================================

#[tokio::test]
async fn test_order_numbers_are_sequential_per_kind() {
    let (db, service) = setup().await;
    let item = add_item(&db, 1_000, 0, 0).await;
    let today = Utc::now().format("%Y%m%d").to_string();

    let p1 = service
        .create_order(request(OrderKind::Purchase, "27", vec![line(&item, 10)]))
        .await
        .unwrap();
    let s1 = service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 1)]))
        .await
        .unwrap();
    let s2 = service
        .create_order(request(OrderKind::Sale, "27", vec![line(&item, 1)]))
        .await
        .unwrap();

    assert_eq!(p1.order.number, format!("PUR-{}-0001", today));
    assert_eq!(s1.order.number, format!("INV-{}-0001", today));
    assert_eq!(s2.order.number, format!("INV-{}-0002", today));
}
