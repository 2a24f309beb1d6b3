//! Postgres-backed stock store.
//!
//! Persists stock records, reservations, and the audit ledger in PostgreSQL.
//! Row locks map directly to `SELECT ... FOR UPDATE`; each unit of work is one
//! database transaction, so commit/rollback atomicity and lock lifetime come
//! from the database itself.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StockError` as follows:
//!
//! | PostgreSQL Error Code | StockError | Scenario |
//! |-----------------------|------------|----------|
//! | `40001` (serialization failure) | `ConcurrencyConflict` | Concurrent transaction won |
//! | `40P01` (deadlock detected) | `ConcurrencyConflict` | Lock cycle broken by the server |
//! | `55P03` (lock not available) | `ConcurrencyConflict` | `lock_timeout` elapsed |
//! | `23505` (unique violation) on stock insert | `DuplicateSku` | Concurrent insert of the same SKU won the race |
//! | `23505` elsewhere | `ConcurrencyConflict` | Lost insert race; retryable |
//! | Any other database error | `Storage` | Constraint/IO/schema problems |
//! | Non-database errors (pool, network) | `Storage` | Connection failures etc. |
//!
//! ## Sync Bridge
//!
//! `StockStore` is a synchronous trait; sqlx is async. Like the rest of the
//! blocking call sites in this codebase, the impl grabs the current tokio
//! runtime handle and `block_on`s the async inner methods. Call it from a
//! blocking-friendly context (`spawn_blocking`, a dedicated thread), not from
//! an async task on a current-thread runtime.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use shopstack_core::{
    OperatorId, Page, Pagination, ReservationId, SkuId, StockError, StockResult,
};
use shopstack_inventory::{
    LedgerEntry, LowStockLevel, Reservation, StockRecord, StockStore, StockUnitOfWork,
    TransactionFilter,
};

/// Postgres-backed stock store.
#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: Arc<PgPool>,
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stock_records (
        sku_id              TEXT PRIMARY KEY,
        total               BIGINT NOT NULL,
        available           BIGINT NOT NULL,
        reserved            BIGINT NOT NULL,
        warning_threshold   BIGINT NOT NULL,
        critical_threshold  BIGINT NOT NULL,
        active              BOOLEAN NOT NULL,
        created_at          TIMESTAMPTZ NOT NULL,
        updated_at          TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_reservations (
        id            UUID PRIMARY KEY,
        sku_id        TEXT NOT NULL REFERENCES stock_records (sku_id),
        kind          TEXT NOT NULL,
        reference_id  TEXT NOT NULL,
        holder_id     TEXT NOT NULL,
        quantity      BIGINT NOT NULL,
        expires_at    TIMESTAMPTZ NOT NULL,
        active        BOOLEAN NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL,
        released_at   TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_reservations_reference
        ON stock_reservations (reference_id) WHERE active",
    "CREATE INDEX IF NOT EXISTS idx_reservations_holder
        ON stock_reservations (holder_id) WHERE active",
    "CREATE INDEX IF NOT EXISTS idx_reservations_expiry
        ON stock_reservations (expires_at) WHERE active",
    r#"
    CREATE TABLE IF NOT EXISTS stock_ledger (
        id               UUID PRIMARY KEY,
        sku_id           TEXT NOT NULL,
        kind             TEXT NOT NULL,
        quantity_change  BIGINT NOT NULL,
        quantity_before  BIGINT NOT NULL,
        quantity_after   BIGINT NOT NULL,
        reference_kind   TEXT NOT NULL,
        reference_id     TEXT,
        operator_id      UUID,
        reason           TEXT,
        created_at       TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ledger_sku_created
        ON stock_ledger (sku_id, created_at DESC)",
];

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> StockResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(sku = %sku), err)]
    pub async fn get_stock_async(&self, sku: &SkuId) -> StockResult<Option<StockRecord>> {
        let row = sqlx::query(
            "SELECT * FROM stock_records WHERE sku_id = $1",
        )
        .bind(sku.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_stock", e))?;
        row.map(|r| record_from_row(&r)).transpose()
    }

    pub async fn batch_get_stock_async(&self, skus: &[SkuId]) -> StockResult<Vec<StockRecord>> {
        let mut tokens: Vec<String> = skus.iter().map(|s| s.as_str().to_string()).collect();
        tokens.sort_unstable();
        tokens.dedup();
        let rows = sqlx::query(
            "SELECT * FROM stock_records WHERE sku_id = ANY($1) ORDER BY sku_id",
        )
        .bind(&tokens)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("batch_get_stock", e))?;
        rows.iter().map(record_from_row).collect()
    }

    pub async fn scan_stock_async(&self, pagination: Pagination) -> StockResult<Page<StockRecord>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_records")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("scan_stock", e))?;
        let rows = sqlx::query(
            "SELECT * FROM stock_records ORDER BY sku_id LIMIT $1 OFFSET $2",
        )
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("scan_stock", e))?;
        let items: Vec<StockRecord> = rows
            .iter()
            .map(record_from_row)
            .collect::<StockResult<_>>()?;
        Ok(page(items, total as u64, pagination))
    }

    pub async fn list_low_stock_async(
        &self,
        level: LowStockLevel,
        pagination: Pagination,
    ) -> StockResult<Page<StockRecord>> {
        let critical = matches!(level, LowStockLevel::Critical);
        let condition = "active AND available <= \
             (CASE WHEN $1 THEN critical_threshold ELSE warning_threshold END)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM stock_records WHERE {condition}"
        ))
        .bind(critical)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_low_stock", e))?;

        let rows = sqlx::query(&format!(
            "SELECT * FROM stock_records WHERE {condition}
             ORDER BY available ASC, sku_id LIMIT $2 OFFSET $3"
        ))
        .bind(critical)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_low_stock", e))?;
        let items: Vec<StockRecord> = rows
            .iter()
            .map(record_from_row)
            .collect::<StockResult<_>>()?;
        Ok(page(items, total as u64, pagination))
    }

    pub async fn list_transactions_async(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> StockResult<Page<LedgerEntry>> {
        let sku: Option<&str> = filter.sku_id.as_ref().map(|s| s.as_str());
        let kind: Option<&str> = filter.kind.map(|k| k.as_str());
        let operator: Option<Uuid> = filter.operator_id.map(|o| *o.as_uuid());
        let condition = "($1::text IS NULL OR sku_id = $1)
             AND ($2::text IS NULL OR kind = $2)
             AND ($3::uuid IS NULL OR operator_id = $3)
             AND ($4::timestamptz IS NULL OR created_at >= $4)
             AND ($5::timestamptz IS NULL OR created_at < $5)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM stock_ledger WHERE {condition}"
        ))
        .bind(sku)
        .bind(kind)
        .bind(operator)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;

        let rows = sqlx::query(&format!(
            "SELECT * FROM stock_ledger WHERE {condition}
             ORDER BY created_at DESC, id DESC LIMIT $6 OFFSET $7"
        ))
        .bind(sku)
        .bind(kind)
        .bind(operator)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;
        let items: Vec<LedgerEntry> = rows
            .iter()
            .map(entry_from_row)
            .collect::<StockResult<_>>()?;
        Ok(page(items, total as u64, pagination))
    }

    pub async fn get_reservation_async(
        &self,
        id: &ReservationId,
    ) -> StockResult<Option<Reservation>> {
        let row = sqlx::query("SELECT * FROM stock_reservations WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_reservation", e))?;
        row.map(|r| reservation_from_row(&r)).transpose()
    }

    pub async fn reservations_for_reference_async(
        &self,
        reference_id: &str,
    ) -> StockResult<Vec<Reservation>> {
        let rows = sqlx::query(
            "SELECT * FROM stock_reservations WHERE reference_id = $1
             ORDER BY created_at, id",
        )
        .bind(reference_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reservations_for_reference", e))?;
        rows.iter().map(reservation_from_row).collect()
    }

    pub async fn expired_reservations_async(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StockResult<Vec<Reservation>> {
        let rows = sqlx::query(
            "SELECT * FROM stock_reservations
             WHERE active AND expires_at < $1
             ORDER BY expires_at, id LIMIT $2",
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("expired_reservations", e))?;
        rows.iter().map(reservation_from_row).collect()
    }
}

/// One database transaction holding `FOR UPDATE` row locks.
pub struct PgUow {
    tx: Option<Transaction<'static, Postgres>>,
    handle: tokio::runtime::Handle,
}

impl PgUow {
    fn tx(&mut self) -> StockResult<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| StockError::storage("transaction already consumed"))
    }
}

impl StockUnitOfWork for PgUow {
    fn lock_stock(&mut self, sku: &SkuId) -> StockResult<Option<StockRecord>> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle.block_on(async {
            let row = sqlx::query("SELECT * FROM stock_records WHERE sku_id = $1 FOR UPDATE")
                .bind(sku.as_str())
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("lock_stock", e))?;
            row.map(|r| record_from_row(&r)).transpose()
        })
    }

    fn insert_stock(&mut self, record: &StockRecord) -> StockResult<()> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle.block_on(async {
            sqlx::query(
                "INSERT INTO stock_records
                 (sku_id, total, available, reserved, warning_threshold,
                  critical_threshold, active, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(record.sku_id.as_str())
            .bind(record.total)
            .bind(record.available)
            .bind(record.reserved)
            .bind(record.warning_threshold)
            .bind(record.critical_threshold)
            .bind(record.active)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                // `lock_stock` on a missing row locks nothing, so two
                // concurrent creates race to this insert; the unique key
                // settles it.
                if is_unique_violation(&e) {
                    StockError::DuplicateSku(record.sku_id.clone())
                } else {
                    map_sqlx_error("insert_stock", e)
                }
            })?;
            Ok(())
        })
    }

    fn update_stock(&mut self, record: &StockRecord) -> StockResult<()> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle.block_on(async {
            let result = sqlx::query(
                "UPDATE stock_records SET
                 total = $2, available = $3, reserved = $4,
                 warning_threshold = $5, critical_threshold = $6,
                 active = $7, updated_at = $8
                 WHERE sku_id = $1",
            )
            .bind(record.sku_id.as_str())
            .bind(record.total)
            .bind(record.available)
            .bind(record.reserved)
            .bind(record.warning_threshold)
            .bind(record.critical_threshold)
            .bind(record.active)
            .bind(record.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_stock", e))?;
            if result.rows_affected() != 1 {
                return Err(StockError::storage(format!(
                    "update_stock touched {} rows for {}",
                    result.rows_affected(),
                    record.sku_id
                )));
            }
            Ok(())
        })
    }

    fn insert_reservation(&mut self, reservation: &Reservation) -> StockResult<()> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle.block_on(async {
            sqlx::query(
                "INSERT INTO stock_reservations
                 (id, sku_id, kind, reference_id, holder_id, quantity,
                  expires_at, active, created_at, released_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(reservation.id.as_uuid())
            .bind(reservation.sku_id.as_str())
            .bind(reservation.kind.as_str())
            .bind(&reservation.reference_id)
            .bind(&reservation.holder_id)
            .bind(reservation.quantity)
            .bind(reservation.expires_at)
            .bind(reservation.active)
            .bind(reservation.created_at)
            .bind(reservation.released_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("insert_reservation", e))?;
            Ok(())
        })
    }

    fn update_reservation(&mut self, reservation: &Reservation) -> StockResult<()> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle.block_on(async {
            let result = sqlx::query(
                "UPDATE stock_reservations SET
                 quantity = $2, expires_at = $3, active = $4, released_at = $5
                 WHERE id = $1",
            )
            .bind(reservation.id.as_uuid())
            .bind(reservation.quantity)
            .bind(reservation.expires_at)
            .bind(reservation.active)
            .bind(reservation.released_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_reservation", e))?;
            if result.rows_affected() != 1 {
                return Err(StockError::storage(format!(
                    "update_reservation touched {} rows for {}",
                    result.rows_affected(),
                    reservation.id
                )));
            }
            Ok(())
        })
    }

    fn active_reservations_for_reference(
        &mut self,
        reference_id: &str,
    ) -> StockResult<Vec<Reservation>> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle.block_on(async {
            let rows = sqlx::query(
                "SELECT * FROM stock_reservations
                 WHERE reference_id = $1 AND active
                 ORDER BY created_at, id",
            )
            .bind(reference_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("active_reservations_for_reference", e))?;
            rows.iter().map(reservation_from_row).collect()
        })
    }

    fn active_reservations_for_holder(
        &mut self,
        holder_id: &str,
    ) -> StockResult<Vec<Reservation>> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle.block_on(async {
            let rows = sqlx::query(
                "SELECT * FROM stock_reservations
                 WHERE holder_id = $1 AND active
                 ORDER BY created_at, id",
            )
            .bind(holder_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("active_reservations_for_holder", e))?;
            rows.iter().map(reservation_from_row).collect()
        })
    }

    fn append_entry(&mut self, entry: &LedgerEntry) -> StockResult<()> {
        let handle = self.handle.clone();
        let tx = self.tx()?;
        handle.block_on(async {
            sqlx::query(
                "INSERT INTO stock_ledger
                 (id, sku_id, kind, quantity_change, quantity_before,
                  quantity_after, reference_kind, reference_id, operator_id,
                  reason, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(entry.id.as_uuid())
            .bind(entry.sku_id.as_str())
            .bind(entry.kind.as_str())
            .bind(entry.quantity_change)
            .bind(entry.quantity_before)
            .bind(entry.quantity_after)
            .bind(entry.reference_kind.as_str())
            .bind(entry.reference_id.as_deref())
            .bind(entry.operator_id.map(|o| *o.as_uuid()))
            .bind(entry.reason.as_deref())
            .bind(entry.created_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("append_entry", e))?;
            Ok(())
        })
    }

    fn commit(mut self) -> StockResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StockError::storage("transaction already consumed"))?;
        self.handle
            .block_on(tx.commit())
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

// Dropping a PgUow without commit drops the sqlx transaction, which queues a
// rollback on the pooled connection.

impl StockStore for PostgresStockStore {
    type Uow<'a>
        = PgUow
    where
        Self: 'a;

    fn begin(&self) -> StockResult<Self::Uow<'_>> {
        let handle = runtime_handle()?;
        let tx = handle
            .block_on(self.pool.begin())
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(PgUow {
            tx: Some(tx),
            handle,
        })
    }

    fn get_stock(&self, sku: &SkuId) -> StockResult<Option<StockRecord>> {
        runtime_handle()?.block_on(self.get_stock_async(sku))
    }

    fn batch_get_stock(&self, skus: &[SkuId]) -> StockResult<Vec<StockRecord>> {
        runtime_handle()?.block_on(self.batch_get_stock_async(skus))
    }

    fn scan_stock(&self, pagination: Pagination) -> StockResult<Page<StockRecord>> {
        runtime_handle()?.block_on(self.scan_stock_async(pagination))
    }

    fn list_low_stock(
        &self,
        level: LowStockLevel,
        pagination: Pagination,
    ) -> StockResult<Page<StockRecord>> {
        runtime_handle()?.block_on(self.list_low_stock_async(level, pagination))
    }

    fn list_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> StockResult<Page<LedgerEntry>> {
        runtime_handle()?.block_on(self.list_transactions_async(filter, pagination))
    }

    fn get_reservation(&self, id: &ReservationId) -> StockResult<Option<Reservation>> {
        runtime_handle()?.block_on(self.get_reservation_async(id))
    }

    fn reservations_for_reference(&self, reference_id: &str) -> StockResult<Vec<Reservation>> {
        runtime_handle()?.block_on(self.reservations_for_reference_async(reference_id))
    }

    fn expired_reservations(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StockResult<Vec<Reservation>> {
        runtime_handle()?.block_on(self.expired_reservations_async(now, limit))
    }
}

fn runtime_handle() -> StockResult<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StockError::storage(
            "PostgresStockStore requires a tokio runtime; \
             call from spawn_blocking inside one",
        )
    })
}

fn page<T>(items: Vec<T>, total: u64, pagination: Pagination) -> Page<T> {
    let has_more = (pagination.offset as u64 + items.len() as u64) < total;
    Page {
        items,
        total,
        pagination,
        has_more,
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn map_sqlx_error(operation: &str, e: sqlx::Error) -> StockError {
    if let sqlx::Error::Database(db) = &e {
        if let Some(code) = db.code() {
            return match code.as_ref() {
                // serialization failure, deadlock, lock timeout, or a lost
                // insert race: the caller may retry the identical request
                "40001" | "40P01" | "55P03" | "23505" => {
                    StockError::conflict(format!("{operation}: {db}"))
                }
                _ => StockError::storage(format!("{operation}: {db}")),
            };
        }
    }
    StockError::storage(format!("{operation}: {e}"))
}

fn decode<'r, T>(row: &'r PgRow, column: &str) -> StockResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StockError::storage(format!("bad column {column}: {e}")))
}

fn record_from_row(row: &PgRow) -> StockResult<StockRecord> {
    Ok(StockRecord {
        sku_id: SkuId::new(decode::<String>(row, "sku_id")?)?,
        total: decode(row, "total")?,
        available: decode(row, "available")?,
        reserved: decode(row, "reserved")?,
        warning_threshold: decode(row, "warning_threshold")?,
        critical_threshold: decode(row, "critical_threshold")?,
        active: decode(row, "active")?,
        created_at: decode(row, "created_at")?,
        updated_at: decode(row, "updated_at")?,
    })
}

fn reservation_from_row(row: &PgRow) -> StockResult<Reservation> {
    Ok(Reservation {
        id: ReservationId::from_uuid(decode(row, "id")?),
        sku_id: SkuId::new(decode::<String>(row, "sku_id")?)?,
        kind: decode::<String>(row, "kind")?.parse()?,
        reference_id: decode(row, "reference_id")?,
        holder_id: decode(row, "holder_id")?,
        quantity: decode(row, "quantity")?,
        expires_at: decode(row, "expires_at")?,
        active: decode(row, "active")?,
        created_at: decode(row, "created_at")?,
        released_at: decode(row, "released_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> StockResult<LedgerEntry> {
    Ok(LedgerEntry {
        id: shopstack_core::EntryId::from_uuid(decode(row, "id")?),
        sku_id: SkuId::new(decode::<String>(row, "sku_id")?)?,
        kind: decode::<String>(row, "kind")?.parse()?,
        quantity_change: decode(row, "quantity_change")?,
        quantity_before: decode(row, "quantity_before")?,
        quantity_after: decode(row, "quantity_after")?,
        reference_kind: decode::<String>(row, "reference_kind")?.parse()?,
        reference_id: decode(row, "reference_id")?,
        operator_id: decode::<Option<Uuid>>(row, "operator_id")?.map(OperatorId::from_uuid),
        reason: decode(row, "reason")?,
        created_at: decode(row, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_reports_has_more_from_offset_and_total() {
        let first = page(
            vec![1, 2, 3],
            10,
            Pagination {
                limit: 3,
                offset: 0,
            },
        );
        assert!(first.has_more);

        let last = page(
            vec![9, 10],
            10,
            Pagination {
                limit: 3,
                offset: 8,
            },
        );
        assert!(!last.has_more);

        let empty = page(Vec::<i32>::new(), 0, Pagination::default());
        assert!(!empty.has_more);
    }
}
