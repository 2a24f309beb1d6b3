//! Reservation lifecycle: holds, releases, and deductions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, instrument};

use shopstack_core::{Clock, ReservationId, SkuId, StockError, StockResult, SystemClock};

use crate::entry::LedgerEntry;
use crate::record::StockRecord;
use crate::reservation::{Reservation, ReservationKind};
use crate::store::{StockStore, StockUnitOfWork};

/// One line of a reserve request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveItem {
    pub sku_id: SkuId,
    pub quantity: i64,
}

/// Request to place a hold group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveRequest {
    pub kind: ReservationKind,
    /// Caller-supplied grouping key; the canonical address of the hold group.
    pub reference_id: String,
    /// Owner of the holds (cart session / customer token).
    pub holder_id: String,
    pub items: Vec<ReserveItem>,
    /// Time-to-live; the group expires at `now + ttl`.
    pub ttl: Duration,
}

/// One placed hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedItem {
    pub reservation_id: ReservationId,
    pub sku_id: SkuId,
    pub quantity: i64,
    pub available_after: i64,
}

/// Result of a successful reserve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveOutcome {
    pub reference_id: String,
    pub expires_at: DateTime<Utc>,
    /// Per-item results, in `sku_id` order.
    pub items: Vec<ReservedItem>,
}

/// Aggregate result of releasing holds. All-zero when nothing was active
/// (repeated releases are no-ops).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub reservations_released: u64,
    pub quantity_released: i64,
}

impl ReleaseOutcome {
    pub(crate) fn tally(released: &[Reservation]) -> Self {
        Self {
            reservations_released: released.len() as u64,
            quantity_released: released.iter().map(|r| r.quantity).sum(),
        }
    }
}

/// Aggregate result of a holder-wide bulk release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderReleaseOutcome {
    pub groups_released: u64,
    pub reservations_released: u64,
    pub quantity_released: i64,
}

/// One line of a deduct request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductItem {
    pub sku_id: SkuId,
    pub quantity: i64,
    /// Reference of the hold group to consume. `None` means a direct sale
    /// with no prior hold: quantity comes straight out of available.
    pub reservation_ref: Option<String>,
}

/// One fulfilled deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductedItem {
    pub sku_id: SkuId,
    pub quantity: i64,
    pub from_reservation: bool,
}

/// Result of a successful deduct call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductOutcome {
    pub order_ref: String,
    /// Per-item results, in `sku_id` order.
    pub items: Vec<DeductedItem>,
    pub total_deducted: i64,
}

/// Owner of the reservation lifecycle.
///
/// Stock quantities are only ever mutated through the store's locked
/// unit-of-work path shared with [`crate::ledger::StockLedger`]. Multi-SKU
/// calls lock rows in sorted `sku_id` order so concurrent calls cannot
/// deadlock on each other.
#[derive(Debug)]
pub struct ReservationManager<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S> ReservationManager<S>
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

impl<S, C> ReservationManager<S, C>
where
    S: StockStore,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Place a hold group: all items succeed or none do.
    ///
    /// In a single unit of work covering every item, each SKU row is locked
    /// (sorted order), checked for sufficient availability, and mutated:
    /// `available -= qty; reserved += qty`, one reservation row and one
    /// `reserve` ledger entry per item. The first failure rolls the entire
    /// call back — no partial reservation ever survives.
    #[instrument(
        skip(self, req),
        fields(reference = %req.reference_id, kind = ?req.kind, items = req.items.len()),
        err
    )]
    pub fn reserve(&self, req: ReserveRequest) -> StockResult<ReserveOutcome> {
        if req.items.is_empty() {
            return Err(StockError::validation("reserve requires at least one item"));
        }
        if req.ttl <= Duration::zero() {
            return Err(StockError::validation("reservation ttl must be positive"));
        }
        for item in &req.items {
            if item.quantity <= 0 {
                return Err(StockError::validation(format!(
                    "reserve quantity must be positive for {}",
                    item.sku_id
                )));
            }
        }

        let mut items = req.items;
        items.sort_by(|a, b| a.sku_id.cmp(&b.sku_id));
        if items.windows(2).any(|w| w[0].sku_id == w[1].sku_id) {
            return Err(StockError::validation(
                "reserve items must not repeat a SKU; merge quantities first",
            ));
        }

        let now = self.clock.now();
        let expires_at = now + req.ttl;

        let mut uow = self.store.begin()?;
        let mut reserved = Vec::with_capacity(items.len());
        for item in &items {
            let mut record = uow
                .lock_stock(&item.sku_id)?
                .ok_or_else(|| StockError::NotFound(item.sku_id.clone()))?;
            if !record.active {
                return Err(StockError::validation(format!(
                    "stock record is deactivated: {}",
                    item.sku_id
                )));
            }

            record.reserve(item.quantity)?;
            record.updated_at = now;
            uow.update_stock(&record)?;

            let reservation = Reservation::new(
                req.kind,
                req.reference_id.clone(),
                req.holder_id.clone(),
                item.sku_id.clone(),
                item.quantity,
                expires_at,
                now,
            );
            uow.insert_reservation(&reservation)?;
            uow.append_entry(&LedgerEntry::reserve(
                &record,
                item.quantity,
                req.kind.into(),
                &req.reference_id,
                now,
            ))?;

            reserved.push(ReservedItem {
                reservation_id: reservation.id,
                sku_id: item.sku_id.clone(),
                quantity: item.quantity,
                available_after: record.available,
            });
        }
        uow.commit()?;

        info!(
            reference = %req.reference_id,
            items = reserved.len(),
            "hold group placed"
        );
        Ok(ReserveOutcome {
            reference_id: req.reference_id,
            expires_at,
            items: reserved,
        })
    }

    /// Release every active hold in a group.
    ///
    /// Idempotent: a second release of the same reference finds no active
    /// rows and returns an all-zero outcome without touching stock.
    #[instrument(skip(self), fields(reference = %reference_id), err)]
    pub fn release(&self, reference_id: &str) -> StockResult<ReleaseOutcome> {
        let now = self.clock.now();
        let mut uow = self.store.begin()?;
        let candidates = uow.active_reservations_for_reference(reference_id)?;
        if candidates.is_empty() {
            return Ok(ReleaseOutcome::default());
        }

        let released = release_active(&mut uow, candidates, None, now)?;
        uow.commit()?;

        let outcome = ReleaseOutcome::tally(&released);
        info!(
            reference = %reference_id,
            released = outcome.reservations_released,
            quantity = outcome.quantity_released,
            "hold group released"
        );
        Ok(outcome)
    }

    /// Release every active hold owned by a holder, across all of its groups.
    ///
    /// This is a bulk convenience over the canonical reference addressing:
    /// the holder's active groups are resolved first, then released through
    /// the same locked sequence, atomically in one unit of work.
    #[instrument(skip(self), fields(holder = %holder_id), err)]
    pub fn release_all_for_holder(&self, holder_id: &str) -> StockResult<HolderReleaseOutcome> {
        let now = self.clock.now();
        let mut uow = self.store.begin()?;
        let candidates = uow.active_reservations_for_holder(holder_id)?;
        if candidates.is_empty() {
            return Ok(HolderReleaseOutcome::default());
        }

        let released = release_active(&mut uow, candidates, None, now)?;
        uow.commit()?;

        // Count groups among the rows actually released, not the pre-lock
        // snapshot: a concurrent release may have drained a group already.
        let groups = {
            let mut refs: Vec<&str> = released.iter().map(|r| r.reference_id.as_str()).collect();
            refs.sort_unstable();
            refs.dedup();
            refs.len() as u64
        };

        let outcome = ReleaseOutcome::tally(&released);
        info!(
            holder = %holder_id,
            groups,
            released = outcome.reservations_released,
            "holder holds released"
        );
        Ok(HolderReleaseOutcome {
            groups_released: groups,
            reservations_released: outcome.reservations_released,
            quantity_released: outcome.quantity_released,
        })
    }

    /// Permanently deduct stock upon fulfillment: all items or none.
    ///
    /// Items carrying a `reservation_ref` consume that group's remaining
    /// holds oldest-first, drawing from `reserved` and `total` (available was
    /// already decremented at reserve time). Items without draw directly from
    /// `available` and `total`. Fully-consumed reservations go inactive.
    #[instrument(skip(self, items), fields(order = %order_ref, items = items.len()), err)]
    pub fn deduct(&self, order_ref: &str, items: Vec<DeductItem>) -> StockResult<DeductOutcome> {
        if items.is_empty() {
            return Err(StockError::validation("deduct requires at least one item"));
        }
        for item in &items {
            if item.quantity <= 0 {
                return Err(StockError::validation(format!(
                    "deduct quantity must be positive for {}",
                    item.sku_id
                )));
            }
        }

        let mut items = items;
        items.sort_by(|a, b| a.sku_id.cmp(&b.sku_id));
        if items.windows(2).any(|w| w[0].sku_id == w[1].sku_id) {
            return Err(StockError::validation(
                "deduct items must not repeat a SKU; merge quantities first",
            ));
        }

        let now = self.clock.now();
        let mut uow = self.store.begin()?;
        let mut deducted = Vec::with_capacity(items.len());
        let mut total_deducted = 0i64;

        for item in &items {
            let mut record = uow
                .lock_stock(&item.sku_id)?
                .ok_or_else(|| StockError::NotFound(item.sku_id.clone()))?;
            let available_before = record.available;

            match &item.reservation_ref {
                Some(reference) => {
                    let mut holds: Vec<Reservation> = uow
                        .active_reservations_for_reference(reference)?
                        .into_iter()
                        .filter(|r| r.sku_id == item.sku_id)
                        .collect();
                    let remaining: i64 = holds.iter().map(|r| r.quantity).sum();
                    if remaining < item.quantity {
                        return Err(StockError::InsufficientStock {
                            sku: item.sku_id.clone(),
                            requested: item.quantity,
                            available: remaining,
                        });
                    }

                    let mut need = item.quantity;
                    for hold in &mut holds {
                        if need == 0 {
                            break;
                        }
                        need -= hold.consume(need, now);
                        uow.update_reservation(hold)?;
                    }
                    record.deduct_reserved(item.quantity)?;
                }
                None => {
                    record.deduct_available(item.quantity)?;
                }
            }

            record.updated_at = now;
            uow.update_stock(&record)?;
            uow.append_entry(&LedgerEntry::deduct(
                &record,
                item.quantity,
                available_before,
                order_ref,
                now,
            ))?;

            total_deducted += item.quantity;
            deducted.push(DeductedItem {
                sku_id: item.sku_id.clone(),
                quantity: item.quantity,
                from_reservation: item.reservation_ref.is_some(),
            });
        }
        uow.commit()?;

        info!(order = %order_ref, total = total_deducted, "stock deducted");
        Ok(DeductOutcome {
            order_ref: order_ref.to_string(),
            items: deducted,
            total_deducted,
        })
    }
}

/// Shared locked release sequence: lock the affected SKU rows in sorted
/// order, move each hold's quantity back from reserved to available, mark the
/// rows inactive, and append one `release` entry per hold.
///
/// `candidates` is a snapshot taken before any row lock was held, so a
/// concurrent release, deduction, or sweep may already have deactivated (or
/// partially consumed) some of those rows. The rows are therefore re-read
/// after the locks are acquired and only the ones still active are released,
/// at their current remaining quantity. Returns the rows actually released.
///
/// Used by [`ReservationManager::release`], the holder bulk release, and the
/// expiration sweeper. The caller commits.
pub(crate) fn release_active<U: StockUnitOfWork>(
    uow: &mut U,
    candidates: Vec<Reservation>,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> StockResult<Vec<Reservation>> {
    let mut records: BTreeMap<SkuId, StockRecord> = BTreeMap::new();
    {
        let mut skus: Vec<&SkuId> = candidates.iter().map(|r| &r.sku_id).collect();
        skus.sort_unstable();
        skus.dedup();
        for sku in skus {
            let record = uow
                .lock_stock(sku)?
                .ok_or_else(|| StockError::NotFound(sku.clone()))?;
            records.insert(sku.clone(), record);
        }
    }

    // Re-read under the locks. Any transaction that deactivates a hold does
    // so while holding its SKU's row lock, so rows still active here stay
    // ours to release.
    let ids: HashSet<ReservationId> = candidates.iter().map(|r| r.id).collect();
    let mut reservations: Vec<Reservation> = Vec::new();
    {
        let mut references: Vec<&str> =
            candidates.iter().map(|r| r.reference_id.as_str()).collect();
        references.sort_unstable();
        references.dedup();
        for reference in references {
            reservations.extend(
                uow.active_reservations_for_reference(reference)?
                    .into_iter()
                    .filter(|r| ids.contains(&r.id)),
            );
        }
    }
    if reservations.is_empty() {
        return Ok(reservations);
    }

    for reservation in &mut reservations {
        let record = records
            .get_mut(&reservation.sku_id)
            .ok_or_else(|| StockError::NotFound(reservation.sku_id.clone()))?;
        record.release(reservation.quantity)?;

        uow.append_entry(&LedgerEntry::release(
            record,
            reservation.quantity,
            reservation.kind.into(),
            &reservation.reference_id,
            reason.clone(),
            now,
        ))?;

        reservation.deactivate(now);
        uow.update_reservation(reservation)?;
    }

    for record in records.values_mut() {
        record.updated_at = now;
        uow.update_stock(record)?;
    }

    Ok(reservations)
}
