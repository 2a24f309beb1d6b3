//! Stock ledger: per-SKU quantity state and administrative adjustments.

use tracing::{info, instrument};

use shopstack_core::{
    Clock, OperatorId, Page, Pagination, SkuId, StockError, StockResult, SystemClock,
};

use crate::entry::LedgerEntry;
use crate::record::{AdjustmentKind, LowStockLevel, StockRecord};
use crate::store::{StockStore, StockUnitOfWork};

/// Upper bound on `batch_get_stock` input size.
pub const BATCH_GET_MAX: usize = 100;

/// Request to create the stock record for a new SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStock {
    pub sku_id: SkuId,
    pub initial_quantity: i64,
    pub warning_threshold: i64,
    pub critical_threshold: i64,
    pub operator_id: Option<OperatorId>,
}

/// Request for a manual administrative adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustStock {
    pub sku_id: SkuId,
    pub kind: AdjustmentKind,
    pub quantity: i64,
    pub reason: Option<String>,
    pub operator_id: Option<OperatorId>,
}

/// Owner of per-SKU quantity state.
///
/// All mutations funnel through the store's locked unit-of-work path and
/// write exactly one audit entry; reads are non-locking snapshots.
#[derive(Debug)]
pub struct StockLedger<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S> StockLedger<S>
where
    S: StockStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemClock,
        }
    }
}

impl<S, C> StockLedger<S, C>
where
    S: StockStore,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Create the stock record for a SKU, with all initial quantity available.
    ///
    /// Writes a `restock` ledger entry in the same unit of work. Fails with
    /// [`StockError::DuplicateSku`] when a record already exists.
    #[instrument(skip(self, req), fields(sku = %req.sku_id, qty = req.initial_quantity), err)]
    pub fn create_stock(&self, req: CreateStock) -> StockResult<StockRecord> {
        let now = self.clock.now();
        let record = StockRecord::new(
            req.sku_id.clone(),
            req.initial_quantity,
            req.warning_threshold,
            req.critical_threshold,
            now,
        )?;

        let mut uow = self.store.begin()?;
        if uow.lock_stock(&req.sku_id)?.is_some() {
            return Err(StockError::DuplicateSku(req.sku_id));
        }
        uow.insert_stock(&record)?;
        uow.append_entry(&LedgerEntry::restock(&record, req.operator_id, now))?;
        uow.commit()?;

        info!(sku = %record.sku_id, total = record.total, "stock record created");
        Ok(record)
    }

    /// Snapshot of one record, or [`StockError::NotFound`].
    pub fn get_stock(&self, sku: &SkuId) -> StockResult<StockRecord> {
        self.store
            .get_stock(sku)?
            .ok_or_else(|| StockError::NotFound(sku.clone()))
    }

    /// Snapshot of up to [`BATCH_GET_MAX`] records; missing SKUs are silently
    /// omitted rather than treated as errors.
    pub fn batch_get_stock(&self, skus: &[SkuId]) -> StockResult<Vec<StockRecord>> {
        if skus.len() > BATCH_GET_MAX {
            return Err(StockError::validation(format!(
                "batch_get_stock accepts at most {BATCH_GET_MAX} SKUs, got {}",
                skus.len()
            )));
        }
        self.store.batch_get_stock(skus)
    }

    /// Manual administrative correction of total stock.
    ///
    /// Writes one `adjust` entry whose `quantity_change` is the signed delta
    /// of the total quantity.
    #[instrument(skip(self, req), fields(sku = %req.sku_id, kind = ?req.kind, qty = req.quantity), err)]
    pub fn adjust_stock(&self, req: AdjustStock) -> StockResult<StockRecord> {
        let now = self.clock.now();
        let mut uow = self.store.begin()?;

        let mut record = uow
            .lock_stock(&req.sku_id)?
            .ok_or_else(|| StockError::NotFound(req.sku_id.clone()))?;
        if !record.active {
            return Err(StockError::validation(format!(
                "stock record is deactivated: {}",
                req.sku_id
            )));
        }

        let total_before = record.total;
        let available_before = record.available;
        match req.kind {
            AdjustmentKind::Increase => record.increase(req.quantity)?,
            AdjustmentKind::Decrease => record.decrease(req.quantity)?,
            AdjustmentKind::Set => record.set_total(req.quantity)?,
        }
        record.updated_at = now;

        uow.update_stock(&record)?;
        uow.append_entry(&LedgerEntry::adjust(
            &record,
            record.total - total_before,
            available_before,
            req.operator_id,
            req.reason,
            now,
        ))?;
        uow.commit()?;

        info!(
            sku = %record.sku_id,
            total = record.total,
            available = record.available,
            "stock adjusted"
        );
        Ok(record)
    }

    /// Update the low-stock thresholds.
    ///
    /// No ordering constraint between warning and critical is enforced here;
    /// an inverted pair is reported by the consistency checker instead of
    /// being rejected inline.
    #[instrument(skip(self), fields(sku = %sku), err)]
    pub fn update_thresholds(
        &self,
        sku: &SkuId,
        warning_threshold: i64,
        critical_threshold: i64,
    ) -> StockResult<StockRecord> {
        if warning_threshold < 0 || critical_threshold < 0 {
            return Err(StockError::validation("thresholds cannot be negative"));
        }

        let mut uow = self.store.begin()?;
        let mut record = uow
            .lock_stock(sku)?
            .ok_or_else(|| StockError::NotFound(sku.clone()))?;
        record.warning_threshold = warning_threshold;
        record.critical_threshold = critical_threshold;
        record.updated_at = self.clock.now();
        uow.update_stock(&record)?;
        uow.commit()?;
        Ok(record)
    }

    /// Flip the active flag. Records are never deleted; retiring a SKU
    /// deactivates it, which blocks further quantity mutations.
    #[instrument(skip(self), fields(sku = %sku, active), err)]
    pub fn set_active(&self, sku: &SkuId, active: bool) -> StockResult<StockRecord> {
        let mut uow = self.store.begin()?;
        let mut record = uow
            .lock_stock(sku)?
            .ok_or_else(|| StockError::NotFound(sku.clone()))?;
        record.active = active;
        record.updated_at = self.clock.now();
        uow.update_stock(&record)?;
        uow.commit()?;
        Ok(record)
    }

    /// Active records at or below the given low-stock level.
    pub fn list_low_stock(
        &self,
        level: LowStockLevel,
        pagination: Pagination,
    ) -> StockResult<Page<StockRecord>> {
        self.store.list_low_stock(level, pagination)
    }
}
