//! # Seed Data Generator
//!
//! Populates the item master with stocked items for development, then runs
//! one sample sale through the settlement service.
//!
//! ## Usage
//! ```bash
//! # Generate 200 items (default) in the configured database
//! cargo run -p bahi-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p bahi-db --bin seed -- --count 1000
//!
//! # Specify database path (overrides bahi.toml and BAHI_DB_PATH)
//! cargo run -p bahi-db --bin seed -- --db ./data/bahi.db
//! ```
//!
//! ## Generated Items
//! - Name: `{product} {pack}` across grocery, household and stationery goods
//! - HSN code per category
//! - Price: ₹10.00 - ₹499.00 plus a pack-size addon
//! - Tax rate: 0 %, 5 %, 12 %, 18 % or 28 %
//! - Opening stock: 0 - 150

use chrono::Utc;
use std::env;
use std::path::PathBuf;

use bahi_core::{
    CounterpartySnapshot, InstallmentInput, Item, Money, OrderKind, PaymentMethod, TaxRate,
};
use bahi_db::{
    init_tracing, CreateOrderRequest, Database, ItemRepository, OrderLineRequest,
    SettlementConfig, SettlementService,
};
use uuid::Uuid;

/// (HSN code, products) per category
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "1006",
        &[
            "Basmati Rice",
            "Sona Masoori Rice",
            "Poha",
            "Idli Rice",
            "Brown Rice",
        ],
    ),
    (
        "0713",
        &["Toor Dal", "Moong Dal", "Chana Dal", "Masoor Dal", "Urad Dal"],
    ),
    (
        "0910",
        &[
            "Turmeric Powder",
            "Red Chilli Powder",
            "Garam Masala",
            "Coriander Powder",
            "Jeera",
        ],
    ),
    (
        "3401",
        &["Bath Soap", "Detergent Bar", "Dishwash Bar", "Handwash", "Floor Cleaner"],
    ),
    (
        "4820",
        &["Ruled Notebook", "Long Book", "Drawing Book", "Register", "Graph Book"],
    ),
];

/// Pack sizes and price addon in paise
const PACKS: &[(&str, i64)] = &[
    ("500g", 0),
    ("1kg", 4_000),
    ("2kg", 9_000),
    ("5kg", 20_000),
    ("Pack of 3", 6_000),
];

/// Tax rates in basis points
const TAX_RATES: &[u32] = &[0, 500, 1200, 1800, 2800];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bahi Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of items to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: from bahi.toml)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = SettlementConfig::load(None)?;
    if let Some(path) = db_path {
        config.database.path = Some(path);
    }
    let db_file = config.database_path();
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    println!("🌱 Bahi Seed Data Generator");
    println!("===========================");
    println!("Database:    {}", db_file.display());
    println!("Home region: {}", config.home_region());
    println!("Items:       {}", count);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut conn = db.acquire().await?;
    let existing = ItemRepository::count(&mut conn).await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating items...");

    let mut generated = 0;
    let mut first_stocked: Option<Item> = None;
    let start = std::time::Instant::now();

    'outer: for (category_idx, (hsn_code, products)) in CATEGORIES.iter().enumerate() {
        for (product_idx, product_name) in products.iter().enumerate() {
            for (pack_idx, (pack_name, price_addon)) in PACKS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let item = generate_item(
                    hsn_code,
                    product_name,
                    pack_name,
                    *price_addon,
                    category_idx * 1000 + product_idx * 20 + pack_idx,
                );

                if let Err(e) = ItemRepository::insert(&mut conn, &item).await {
                    eprintln!("Failed to insert {}: {}", item.name, e);
                    continue;
                }

                if first_stocked.is_none() && item.current_stock >= 2 {
                    first_stocked = Some(item);
                }

                generated += 1;
                if generated % 50 == 0 {
                    println!("  Generated {} items...", generated);
                }
            }
        }
    }
    drop(conn);

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} items in {:?}", generated, elapsed);

    if let Some(item) = first_stocked {
        println!();
        println!("Running a sample sale...");

        let service = SettlementService::new(&db, &config);
        let settlement = service
            .create_order(CreateOrderRequest {
                kind: OrderKind::Sale,
                counterparty: CounterpartySnapshot {
                    id: None,
                    name: "Walk-in Customer".to_string(),
                    region_code: config.home_region().to_string(),
                },
                lines: vec![OrderLineRequest {
                    item_id: item.id.clone(),
                    quantity: 2,
                    unit_price: None,
                    discount: None,
                }],
                initial_payment: Some(InstallmentInput::new(
                    item.unit_price,
                    PaymentMethod::Cash,
                )),
                notes: Some("seed sample".to_string()),
            })
            .await?;

        let order = &settlement.order;
        println!("  {} for {}", order.number, order.totals.grand_total);
        println!(
            "  Paid {} / balance {}",
            settlement.ledger.total_paid(),
            settlement.ledger.balance()
        );
        println!(
            "  Stock of {}: {} → {}",
            item.name,
            settlement.stock_entries[0].opening_stock,
            settlement.stock_entries[0].closing_stock
        );
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Generates a single item with realistic data.
fn generate_item(hsn_code: &str, name: &str, pack: &str, price_addon: i64, seed: usize) -> Item {
    let now = Utc::now();

    // ₹10.00 - ₹499.00 + pack addon
    let base_price = 1_000 + ((seed * 37) % 48_900) as i64;
    let unit_price = Money::from_minor(base_price + price_addon);

    Item {
        id: Uuid::new_v4().to_string(),
        name: format!("{} {}", name, pack),
        hsn_code: Some(hsn_code.to_string()),
        unit_price,
        tax_rate: TaxRate::from_bps(TAX_RATES[seed % TAX_RATES.len()]),
        current_stock: (seed % 151) as i64,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
