//! Storage abstraction for the stock engine.
//!
//! The engine is agnostic to the concrete store; it only requires two things:
//! transactional units of work, and a per-SKU row lock acquired inside one.
//!
//! ## Mutation discipline
//!
//! Every mutating operation follows the same sequence:
//!
//! 1. `begin()` a unit of work
//! 2. `lock_stock()` each affected SKU (sorted by `sku_id` — deterministic
//!    lock order prevents deadlocks between multi-SKU calls)
//! 3. read-check business rules against the locked rows
//! 4. write stock/reservation updates plus exactly one ledger entry per
//!    mutation via `append_entry()`
//! 5. `commit()` — dropping the unit of work without committing rolls
//!    everything back
//!
//! No stock change is ever partially applied: implementations must make
//! `commit` atomic and hold row locks until commit or rollback.
//!
//! ## Reads
//!
//! The read methods on [`StockStore`] are non-locking snapshot reads; they may
//! observe state a concurrent writer is about to change and guarantee nothing
//! stronger than the backend's default isolation.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use shopstack_core::{Page, Pagination, ReservationId, SkuId, StockResult};

use crate::entry::LedgerEntry;
use crate::record::{LowStockLevel, StockRecord};
use crate::recorder::TransactionFilter;
use crate::reservation::Reservation;

/// One transactional unit of work against the stock store.
///
/// Implementations roll back on drop; only `commit` makes staged writes
/// visible. Row locks taken via `lock_stock` are held until then.
pub trait StockUnitOfWork {
    /// Acquire the pessimistic row lock for a SKU and return the current
    /// record (`SELECT ... FOR UPDATE` semantics). `None` means no record
    /// exists; the key is still locked so a subsequent insert is race-free.
    ///
    /// Re-locking a SKU already held by this unit of work is a no-op returning
    /// the current in-transaction view.
    fn lock_stock(&mut self, sku: &SkuId) -> StockResult<Option<StockRecord>>;

    /// Insert a new stock record. The SKU must be locked by this unit of work.
    fn insert_stock(&mut self, record: &StockRecord) -> StockResult<()>;

    /// Update a stock record. The SKU must be locked by this unit of work.
    fn update_stock(&mut self, record: &StockRecord) -> StockResult<()>;

    fn insert_reservation(&mut self, reservation: &Reservation) -> StockResult<()>;

    fn update_reservation(&mut self, reservation: &Reservation) -> StockResult<()>;

    /// Active reservations sharing a reference, oldest first. The ordering is
    /// load-bearing: deductions consume holds oldest-first.
    fn active_reservations_for_reference(
        &mut self,
        reference_id: &str,
    ) -> StockResult<Vec<Reservation>>;

    /// Active reservations owned by a holder, oldest first.
    fn active_reservations_for_holder(&mut self, holder_id: &str)
        -> StockResult<Vec<Reservation>>;

    /// Append one immutable audit row.
    fn append_entry(&mut self, entry: &LedgerEntry) -> StockResult<()>;

    /// Commit all staged writes atomically and release row locks.
    fn commit(self) -> StockResult<()>
    where
        Self: Sized;
}

/// Storage backend for stock records, reservations, and the audit ledger.
pub trait StockStore: Send + Sync {
    type Uow<'a>: StockUnitOfWork
    where
        Self: 'a;

    /// Open a transactional unit of work.
    fn begin(&self) -> StockResult<Self::Uow<'_>>;

    /// Snapshot read of one record.
    fn get_stock(&self, sku: &SkuId) -> StockResult<Option<StockRecord>>;

    /// Snapshot read of many records; missing SKUs are silently omitted.
    fn batch_get_stock(&self, skus: &[SkuId]) -> StockResult<Vec<StockRecord>>;

    /// Page through every stock record, ordered by `sku_id`.
    fn scan_stock(&self, pagination: Pagination) -> StockResult<Page<StockRecord>>;

    /// Active records at or below the given low-stock level, ordered by
    /// ascending available quantity (worst first).
    fn list_low_stock(
        &self,
        level: LowStockLevel,
        pagination: Pagination,
    ) -> StockResult<Page<StockRecord>>;

    /// Query the audit ledger, newest entries first.
    fn list_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> StockResult<Page<LedgerEntry>>;

    fn get_reservation(&self, id: &ReservationId) -> StockResult<Option<Reservation>>;

    /// Every reservation (any state) sharing a reference, oldest first.
    fn reservations_for_reference(&self, reference_id: &str) -> StockResult<Vec<Reservation>>;

    /// Active reservations whose `expires_at` is strictly before `now`,
    /// oldest expiry first, capped at `limit`.
    fn expired_reservations(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StockResult<Vec<Reservation>>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    type Uow<'a>
        = S::Uow<'a>
    where
        Self: 'a;

    fn begin(&self) -> StockResult<Self::Uow<'_>> {
        (**self).begin()
    }

    fn get_stock(&self, sku: &SkuId) -> StockResult<Option<StockRecord>> {
        (**self).get_stock(sku)
    }

    fn batch_get_stock(&self, skus: &[SkuId]) -> StockResult<Vec<StockRecord>> {
        (**self).batch_get_stock(skus)
    }

    fn scan_stock(&self, pagination: Pagination) -> StockResult<Page<StockRecord>> {
        (**self).scan_stock(pagination)
    }

    fn list_low_stock(
        &self,
        level: LowStockLevel,
        pagination: Pagination,
    ) -> StockResult<Page<StockRecord>> {
        (**self).list_low_stock(level, pagination)
    }

    fn list_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> StockResult<Page<LedgerEntry>> {
        (**self).list_transactions(filter, pagination)
    }

    fn get_reservation(&self, id: &ReservationId) -> StockResult<Option<Reservation>> {
        (**self).get_reservation(id)
    }

    fn reservations_for_reference(&self, reference_id: &str) -> StockResult<Vec<Reservation>> {
        (**self).reservations_for_reference(reference_id)
    }

    fn expired_reservations(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StockResult<Vec<Reservation>> {
        (**self).expired_reservations(now, limit)
    }
}
