//! Expiration sweeper: releases reservations past their expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

use shopstack_core::{Clock, StockError, StockResult, SystemClock};

use crate::manager::{release_active, ReleaseOutcome};
use crate::reservation::Reservation;
use crate::store::{StockStore, StockUnitOfWork};

/// Sweeper tuning knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Maximum expired reservations picked up per sweep.
    pub batch_size: u32,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

impl SweeperConfig {
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Aggregate result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub reservations_released: u64,
    pub quantity_released: i64,
    /// Hold groups that could not be swept this round (lock contention);
    /// they stay expired and are retried on the next sweep.
    pub groups_skipped: u64,
}

/// Finds active reservations whose `expires_at` has passed and releases them
/// through the same locked sequence as a normal release.
///
/// Safe to run concurrently with live reserve/release traffic: each group is
/// swept in its own unit of work under the same per-SKU row locks, and the
/// group's rows are re-read inside that unit of work so holds released or
/// deducted in the meantime are left alone.
#[derive(Debug)]
pub struct ExpirationSweeper<S, C = SystemClock> {
    store: S,
    clock: C,
    config: SweeperConfig,
}

impl<S> ExpirationSweeper<S>
where
    S: StockStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemClock,
            config: SweeperConfig::default(),
        }
    }
}

impl<S, C> ExpirationSweeper<S, C>
where
    S: StockStore,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            config: SweeperConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SweeperConfig) -> Self {
        self.config = config;
        self
    }

    /// Release every reservation past its expiry, aggregating counts.
    #[instrument(skip(self), err)]
    pub fn cleanup_expired(&self) -> StockResult<CleanupOutcome> {
        let now = self.clock.now();
        let expired = self
            .store
            .expired_reservations(now, self.config.batch_size)?;
        if expired.is_empty() {
            return Ok(CleanupOutcome::default());
        }

        // Sweep group by group so one contended group cannot roll back or
        // stall the rest of the batch.
        let mut groups: BTreeMap<String, Vec<Reservation>> = BTreeMap::new();
        for reservation in expired {
            groups
                .entry(reservation.reference_id.clone())
                .or_default()
                .push(reservation);
        }

        let mut outcome = CleanupOutcome::default();
        for (reference_id, _) in groups {
            match self.sweep_group(&reference_id, now) {
                Ok(swept) => {
                    outcome.reservations_released += swept.reservations_released;
                    outcome.quantity_released += swept.quantity_released;
                }
                Err(StockError::ConcurrencyConflict(msg)) => {
                    warn!(reference = %reference_id, %msg, "skipping contended hold group");
                    outcome.groups_skipped += 1;
                }
                Err(other) => return Err(other),
            }
        }

        if outcome.reservations_released > 0 {
            info!(
                released = outcome.reservations_released,
                quantity = outcome.quantity_released,
                skipped = outcome.groups_skipped,
                "expired reservations swept"
            );
        }
        Ok(outcome)
    }

    fn sweep_group(&self, reference_id: &str, now: DateTime<Utc>) -> StockResult<ReleaseOutcome> {
        let mut uow = self.store.begin()?;

        // Only rows still active AND still expired are swept; release_active
        // re-checks the rows under the row locks, so a concurrent
        // release/deduct wins.
        let stale: Vec<Reservation> = uow
            .active_reservations_for_reference(reference_id)?
            .into_iter()
            .filter(|r| r.is_expired(now))
            .collect();
        if stale.is_empty() {
            return Ok(ReleaseOutcome::default());
        }

        let released = release_active(
            &mut uow,
            stale,
            Some("reservation expired".to_string()),
            now,
        )?;
        uow.commit()?;
        Ok(ReleaseOutcome::tally(&released))
    }
}
