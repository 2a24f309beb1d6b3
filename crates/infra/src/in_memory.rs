//! In-memory stock store.
//!
//! Intended for tests/dev, but it implements the full concurrency contract:
//! `lock_stock` takes a real blocking per-SKU row lock (Mutex + Condvar over
//! a held-key set), writes are staged in the unit of work and applied
//! atomically at commit, and dropping an uncommitted unit of work discards
//! everything. Lock waits beyond a timeout surface as `ConcurrencyConflict`,
//! mirroring a database lock-wait timeout.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use shopstack_core::{Page, Pagination, ReservationId, SkuId, StockError, StockResult};
use shopstack_inventory::{
    LedgerEntry, LowStockLevel, Reservation, StockRecord, StockStore, StockUnitOfWork,
    TransactionFilter,
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct StoreData {
    stocks: BTreeMap<SkuId, StockRecord>,
    reservations: BTreeMap<ReservationId, Reservation>,
    /// Append-only; insertion order is creation order.
    journal: Vec<LedgerEntry>,
}

/// In-memory store with pessimistic per-SKU row locks.
#[derive(Debug)]
pub struct InMemoryStockStore {
    data: Mutex<StoreData>,
    locked_rows: Mutex<HashSet<SkuId>>,
    row_released: Condvar,
    lock_timeout: Duration,
}

impl Default for InMemoryStockStore {
    fn default() -> Self {
        Self {
            data: Mutex::new(StoreData::default()),
            locked_rows: Mutex::new(HashSet::new()),
            row_released: Condvar::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorten the lock-wait timeout (contention tests).
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    fn data(&self) -> StockResult<MutexGuard<'_, StoreData>> {
        self.data
            .lock()
            .map_err(|_| StockError::storage("store mutex poisoned"))
    }

    /// The lock table guards a plain set of held SKUs, so a panic while it
    /// was locked leaves nothing half-written; recover the guard rather than
    /// leaking every held row lock forever.
    fn lock_table(&self) -> MutexGuard<'_, HashSet<SkuId>> {
        self.locked_rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Block until the row lock for `sku` is free, then take it.
    fn acquire_row(&self, sku: &SkuId) -> StockResult<()> {
        let deadline = Instant::now() + self.lock_timeout;
        let mut held = self.lock_table();
        while held.contains(sku) {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or_else(|| StockError::conflict(format!("lock wait timeout on {sku}")))?;
            let (guard, wait) = self
                .row_released
                .wait_timeout(held, remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            held = guard;
            if wait.timed_out() && held.contains(sku) {
                return Err(StockError::conflict(format!("lock wait timeout on {sku}")));
            }
        }
        held.insert(sku.clone());
        Ok(())
    }

    fn release_rows(&self, skus: &[SkuId]) {
        if skus.is_empty() {
            return;
        }
        {
            let mut held = self.lock_table();
            for sku in skus {
                held.remove(sku);
            }
        }
        self.row_released.notify_all();
    }
}

/// One staged transaction against [`InMemoryStockStore`].
#[derive(Debug)]
pub struct InMemoryUow<'a> {
    store: &'a InMemoryStockStore,
    held: Vec<SkuId>,
    staged_stocks: BTreeMap<SkuId, StockRecord>,
    staged_reservations: BTreeMap<ReservationId, Reservation>,
    staged_entries: Vec<LedgerEntry>,
}

impl InMemoryUow<'_> {
    fn ensure_locked(&self, sku: &SkuId) -> StockResult<()> {
        if self.held.contains(sku) {
            Ok(())
        } else {
            Err(StockError::storage(format!(
                "stock row written without holding its lock: {sku}"
            )))
        }
    }

    /// Committed reservations for a predicate, overlaid with staged writes,
    /// oldest first.
    fn merged_reservations(
        &mut self,
        predicate: impl Fn(&Reservation) -> bool,
    ) -> StockResult<Vec<Reservation>> {
        let mut merged: BTreeMap<ReservationId, Reservation> = self
            .store
            .data()?
            .reservations
            .iter()
            .filter(|(_, r)| predicate(r))
            .map(|(id, r)| (*id, r.clone()))
            .collect();
        for (id, staged) in &self.staged_reservations {
            if predicate(staged) {
                merged.insert(*id, staged.clone());
            } else {
                merged.remove(id);
            }
        }
        let mut out: Vec<Reservation> = merged.into_values().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }
}

impl StockUnitOfWork for InMemoryUow<'_> {
    fn lock_stock(&mut self, sku: &SkuId) -> StockResult<Option<StockRecord>> {
        if !self.held.contains(sku) {
            self.store.acquire_row(sku)?;
            self.held.push(sku.clone());
        }
        if let Some(staged) = self.staged_stocks.get(sku) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.store.data()?.stocks.get(sku).cloned())
    }

    fn insert_stock(&mut self, record: &StockRecord) -> StockResult<()> {
        self.ensure_locked(&record.sku_id)?;
        if self.staged_stocks.contains_key(&record.sku_id)
            || self.store.data()?.stocks.contains_key(&record.sku_id)
        {
            return Err(StockError::DuplicateSku(record.sku_id.clone()));
        }
        self.staged_stocks.insert(record.sku_id.clone(), record.clone());
        Ok(())
    }

    fn update_stock(&mut self, record: &StockRecord) -> StockResult<()> {
        self.ensure_locked(&record.sku_id)?;
        self.staged_stocks.insert(record.sku_id.clone(), record.clone());
        Ok(())
    }

    fn insert_reservation(&mut self, reservation: &Reservation) -> StockResult<()> {
        self.staged_reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    fn update_reservation(&mut self, reservation: &Reservation) -> StockResult<()> {
        self.staged_reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    fn active_reservations_for_reference(
        &mut self,
        reference_id: &str,
    ) -> StockResult<Vec<Reservation>> {
        let reference = reference_id.to_string();
        self.merged_reservations(move |r| r.active && r.reference_id == reference)
    }

    fn active_reservations_for_holder(
        &mut self,
        holder_id: &str,
    ) -> StockResult<Vec<Reservation>> {
        let holder = holder_id.to_string();
        self.merged_reservations(move |r| r.active && r.holder_id == holder)
    }

    fn append_entry(&mut self, entry: &LedgerEntry) -> StockResult<()> {
        self.staged_entries.push(entry.clone());
        Ok(())
    }

    fn commit(mut self) -> StockResult<()> {
        {
            let mut data = self.store.data()?;
            for (sku, record) in std::mem::take(&mut self.staged_stocks) {
                data.stocks.insert(sku, record);
            }
            for (id, reservation) in std::mem::take(&mut self.staged_reservations) {
                data.reservations.insert(id, reservation);
            }
            data.journal.append(&mut self.staged_entries);
        }
        // Row locks are released by Drop.
        Ok(())
    }
}

impl Drop for InMemoryUow<'_> {
    fn drop(&mut self) {
        // Uncommitted staged writes are simply discarded (rollback).
        let held = std::mem::take(&mut self.held);
        self.store.release_rows(&held);
    }
}

impl StockStore for InMemoryStockStore {
    type Uow<'a>
        = InMemoryUow<'a>
    where
        Self: 'a;

    fn begin(&self) -> StockResult<Self::Uow<'_>> {
        Ok(InMemoryUow {
            store: self,
            held: Vec::new(),
            staged_stocks: BTreeMap::new(),
            staged_reservations: BTreeMap::new(),
            staged_entries: Vec::new(),
        })
    }

    fn get_stock(&self, sku: &SkuId) -> StockResult<Option<StockRecord>> {
        Ok(self.data()?.stocks.get(sku).cloned())
    }

    fn batch_get_stock(&self, skus: &[SkuId]) -> StockResult<Vec<StockRecord>> {
        let data = self.data()?;
        let mut seen = HashSet::new();
        Ok(skus
            .iter()
            .filter(|sku| seen.insert((*sku).clone()))
            .filter_map(|sku| data.stocks.get(sku).cloned())
            .collect())
    }

    fn scan_stock(&self, pagination: Pagination) -> StockResult<Page<StockRecord>> {
        let all: Vec<StockRecord> = self.data()?.stocks.values().cloned().collect();
        Ok(Page::from_vec(all, pagination))
    }

    fn list_low_stock(
        &self,
        level: LowStockLevel,
        pagination: Pagination,
    ) -> StockResult<Page<StockRecord>> {
        let mut matching: Vec<StockRecord> = self
            .data()?
            .stocks
            .values()
            .filter(|r| r.active && r.matches_level(level))
            .cloned()
            .collect();
        // Worst first.
        matching.sort_by_key(|r| r.available);
        Ok(Page::from_vec(matching, pagination))
    }

    fn list_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> StockResult<Page<LedgerEntry>> {
        let matching: Vec<LedgerEntry> = self
            .data()?
            .journal
            .iter()
            .rev() // newest first
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        Ok(Page::from_vec(matching, pagination))
    }

    fn get_reservation(&self, id: &ReservationId) -> StockResult<Option<Reservation>> {
        Ok(self.data()?.reservations.get(id).cloned())
    }

    fn reservations_for_reference(&self, reference_id: &str) -> StockResult<Vec<Reservation>> {
        let mut out: Vec<Reservation> = self
            .data()?
            .reservations
            .values()
            .filter(|r| r.reference_id == reference_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    fn expired_reservations(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StockResult<Vec<Reservation>> {
        let mut out: Vec<Reservation> = self
            .data()?
            .reservations
            .values()
            .filter(|r| r.active && r.is_expired(now))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.expires_at.cmp(&b.expires_at).then(a.id.cmp(&b.id)));
        out.truncate(limit as usize);
        Ok(out)
    }
}
