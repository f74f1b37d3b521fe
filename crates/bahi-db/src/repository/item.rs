//! # Item Repository
//!
//! Reads of the item master and the atomic stock counter update.
//!
//! ## Conditional Stock Update
//! ```text
//! UPDATE items
//!    SET current_stock = current_stock + :delta
//!  WHERE id = :id
//!    AND (:delta >= 0 OR current_stock + :delta >= 0)
//! RETURNING current_stock
//!
//!   row returned  → closing stock, the movement happened
//!   no row        → item missing, or not enough stock (counter untouched)
//! ```
//!
//! The check and the decrement are one statement, so two concurrent sales
//! of the last unit cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bahi_core::{Item, Money, TaxRate};

/// Repository for the `items` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemRepository;

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: String,
    name: String,
    hsn_code: Option<String>,
    unit_price: i64,
    tax_rate_bps: u32,
    current_stock: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            name: row.name,
            hsn_code: row.hsn_code,
            unit_price: Money::from_minor(row.unit_price),
            tax_rate: TaxRate::from_bps(row.tax_rate_bps),
            current_stock: row.current_stock,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl ItemRepository {
    /// Inserts an item. Master data belongs to another component; this is
    /// used by the seed binary and tests.
    pub async fn insert(conn: &mut SqliteConnection, item: &Item) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, hsn_code, unit_price, tax_rate_bps,
                current_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.hsn_code)
        .bind(item.unit_price.minor())
        .bind(item.tax_rate.bps())
        .bind(item.current_stock)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Gets an item by ID, active or not.
    pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, name, hsn_code, unit_price, tax_rate_bps,
                   current_stock, is_active, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(Item::from))
    }

    /// Gets an active item; missing and inactive items are both NotFound.
    pub async fn get_active(conn: &mut SqliteConnection, id: &str) -> DbResult<Item> {
        match Self::get(conn, id).await? {
            Some(item) if item.is_active => Ok(item),
            _ => Err(DbError::not_found("Item", id)),
        }
    }

    /// Current stock counter, `None` when the item does not exist.
    pub async fn current_stock(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT current_stock FROM items WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(stock)
    }

    /// Applies a signed delta to the stock counter if the result stays
    /// non-negative. Returns the new stock, or `None` when nothing matched.
    pub async fn apply_stock_delta(
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        debug!(id = %id, delta, "Applying stock delta");

        let closing: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE items
            SET current_stock = current_stock + ?2,
                updated_at = ?3
            WHERE id = ?1
              AND (?2 >= 0 OR current_stock + ?2 >= 0)
            RETURNING current_stock
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .fetch_optional(conn)
        .await?;

        Ok(closing)
    }

    /// Number of items (seed binary uses this to skip re-seeding).
    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(conn)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    fn item(stock: i64) -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4().to_string(),
            name: "Basmati Rice 5kg".to_string(),
            hsn_code: Some("1006".to_string()),
            unit_price: Money::from_minor(52_500),
            tax_rate: TaxRate::from_bps(500),
            current_stock: stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let rice = item(10);

        ItemRepository::insert(&mut conn, &rice).await.unwrap();
        let loaded = ItemRepository::get_active(&mut conn, &rice.id).await.unwrap();

        assert_eq!(loaded.name, rice.name);
        assert_eq!(loaded.unit_price, rice.unit_price);
        assert_eq!(loaded.tax_rate.bps(), 500);
        assert_eq!(ItemRepository::count(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_inactive_item_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let mut retired = item(10);
        retired.is_active = false;
        ItemRepository::insert(&mut conn, &retired).await.unwrap();

        let result = ItemRepository::get_active(&mut conn, &retired.id).await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_conditional_decrement() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let rice = item(3);
        ItemRepository::insert(&mut conn, &rice).await.unwrap();

        let closing = ItemRepository::apply_stock_delta(&mut conn, &rice.id, -2, Utc::now())
            .await
            .unwrap();
        assert_eq!(closing, Some(1));

        let refused = ItemRepository::apply_stock_delta(&mut conn, &rice.id, -2, Utc::now())
            .await
            .unwrap();
        assert_eq!(refused, None);
        assert_eq!(
            ItemRepository::current_stock(&mut conn, &rice.id).await.unwrap(),
            Some(1)
        );

        let missing = ItemRepository::apply_stock_delta(&mut conn, "missing", 5, Utc::now())
            .await
            .unwrap();
        assert_eq!(missing, None);
    }
}
