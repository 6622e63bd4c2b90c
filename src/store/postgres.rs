use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::access::User;
use crate::domain::inventory::Product;
use crate::domain::order::{Order, OrderItem};
use crate::domain::route::{Route, RouteShipment};
use crate::domain::scan::ScanLogEntry;
use crate::domain::shipment::{Shipment, ShipmentStatus};
use super::{Store, StoreError, StoreResult, UnitOfWork};

// ============================================================================
// PostgreSQL Store
// ============================================================================
//
// One sqlx transaction per unit of work.
//
// Concurrency:
// - products are locked with SELECT ... FOR UPDATE in id order, so two orders
//   for the last unit serialize on the row and the loser sees the new stock
// - stock decrement and shipment transitions are conditional UPDATEs; a stale
//   precondition affects zero rows instead of overwriting
// - route_shipments.shipment_id is UNIQUE; the second link fails cleanly
//
// ============================================================================

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

// ============================================================================
// Row Mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            role: row.role.parse().map_err(StoreError::Corrupt)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    stock: i32,
    is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ShipmentRow {
    id: Uuid,
    order_id: Uuid,
    status: String,
    code: String,
    proof_photo_url: Option<String>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = StoreError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        Ok(Shipment {
            id: row.id,
            order_id: row.order_id,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            code: row.code,
            proof_photo_url: row.proof_photo_url,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    driver_id: Uuid,
    route_date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RouteRow> for Route {
    type Error = StoreError;

    fn try_from(row: RouteRow) -> Result<Self, Self::Error> {
        Ok(Route {
            id: row.id,
            driver_id: row.driver_id,
            route_date: row.route_date,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScanLogRow {
    id: Uuid,
    actor_id: Uuid,
    shipment_id: Uuid,
    action: String,
    code: String,
    outcome: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ScanLogRow> for ScanLogEntry {
    type Error = StoreError;

    fn try_from(row: ScanLogRow) -> Result<Self, Self::Error> {
        Ok(ScanLogEntry {
            id: row.id,
            actor_id: row.actor_id,
            shipment_id: row.shipment_id,
            action: row.action.parse().map_err(StoreError::Corrupt)?,
            code: row.code,
            outcome: row.outcome.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
        })
    }
}

const SHIPMENT_COLUMNS: &str =
    "id, order_id, status, code, proof_photo_url, delivered_at, created_at";

// ============================================================================
// Unit of Work
// ============================================================================

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT id, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StoreError::from_sqlx)?;

        row.map(User::try_from).transpose()
    }

    async fn lock_products(&mut self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, name, price, stock, is_active
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2
            WHERE id = $1 AND is_active AND stock >= $2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, total_amount, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(())
    }

    async fn insert_order_items(&mut self, items: &[OrderItem]) -> StoreResult<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, price_at_order)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price_at_order)
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::from_sqlx)?;
        }

        Ok(())
    }

    async fn insert_shipment(&mut self, shipment: &Shipment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shipments (id, order_id, status, code, proof_photo_url, delivered_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(shipment.id)
        .bind(shipment.order_id)
        .bind(shipment.status.as_str())
        .bind(&shipment.code)
        .bind(&shipment.proof_photo_url)
        .bind(shipment.delivered_at)
        .bind(shipment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(())
    }

    async fn find_shipment(&mut self, id: Uuid) -> StoreResult<Option<Shipment>> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        row.map(Shipment::try_from).transpose()
    }

    async fn find_shipment_by_code(&mut self, code: &str) -> StoreResult<Option<Shipment>> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        row.map(Shipment::try_from).transpose()
    }

    async fn transition_shipment(
        &mut self,
        id: Uuid,
        from: ShipmentStatus,
        to: ShipmentStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Shipment>> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            r#"
            UPDATE shipments
            SET status = $3, delivered_at = COALESCE($4, delivered_at)
            WHERE id = $1 AND status = $2
            RETURNING {SHIPMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(delivered_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        row.map(Shipment::try_from).transpose()
    }

    async fn set_proof_photo(&mut self, id: Uuid, url: &str) -> StoreResult<Option<Shipment>> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "UPDATE shipments SET proof_photo_url = $2 WHERE id = $1 RETURNING {SHIPMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        row.map(Shipment::try_from).transpose()
    }

    async fn insert_route(&mut self, route: &Route) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO routes (id, driver_id, route_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(route.id)
        .bind(route.driver_id)
        .bind(route.route_date)
        .bind(route.status.as_str())
        .bind(route.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(())
    }

    async fn find_route(&mut self, id: Uuid) -> StoreResult<Option<Route>> {
        let row: Option<RouteRow> = sqlx::query_as(
            "SELECT id, driver_id, route_date, status, created_at FROM routes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        row.map(Route::try_from).transpose()
    }

    async fn insert_route_shipment(&mut self, link: &RouteShipment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO route_shipments (id, route_id, shipment_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(link.id)
        .bind(link.route_id)
        .bind(link.shipment_id)
        .bind(link.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(())
    }

    async fn driver_owns_shipment(&mut self, driver_id: Uuid, shipment_id: Uuid) -> StoreResult<bool> {
        let owned: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM route_shipments rs
                INNER JOIN routes r ON r.id = rs.route_id
                WHERE rs.shipment_id = $1 AND r.driver_id = $2
            )
            "#,
        )
        .bind(shipment_id)
        .bind(driver_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(owned)
    }

    async fn append_scan_log(&mut self, entry: &ScanLogEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scan_logs (id, actor_id, shipment_id, action, code, outcome, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.actor_id)
        .bind(entry.shipment_id)
        .bind(entry.action.as_str())
        .bind(&entry.code)
        .bind(entry.outcome.as_str())
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(())
    }

    async fn list_scan_logs(&mut self, shipment_id: Uuid) -> StoreResult<Vec<ScanLogEntry>> {
        let rows: Vec<ScanLogRow> = sqlx::query_as(
            r#"
            SELECT id, actor_id, shipment_id, action, code, outcome, created_at
            FROM scan_logs
            WHERE shipment_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(shipment_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        rows.into_iter().map(ScanLogEntry::try_from).collect()
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(StoreError::from_sqlx)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(StoreError::from_sqlx)
    }
}
