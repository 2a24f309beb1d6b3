//! Time-bounded stock reservations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopstack_core::{ReservationId, SkuId, StockError};

/// What kind of hold a reservation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationKind {
    /// Shopping-cart hold (short-lived, sweepable).
    Cart,
    /// Order hold awaiting fulfillment.
    Order,
}

impl ReservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Order => "order",
        }
    }
}

impl core::str::FromStr for ReservationKind {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "order" => Ok(Self::Order),
            other => Err(StockError::validation(format!(
                "unknown reservation kind: {other}"
            ))),
        }
    }
}

/// One hold against one SKU.
///
/// Reservations are grouped by `reference_id` (the caller's cart/order key);
/// a multi-item reserve call produces one row per SKU sharing the reference.
/// `quantity` is the *remaining* hold: deductions may consume it partially.
///
/// State machine: `active` transitions to inactive exactly once — via release,
/// deduction, or the expiration sweeper — and never back. Rows are retained
/// permanently for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub sku_id: SkuId,
    pub kind: ReservationKind,
    /// Caller-supplied grouping key; addresses the whole hold group.
    pub reference_id: String,
    /// Owner of the hold (cart session / customer token). An index for bulk
    /// release, not a second addressing scheme.
    pub holder_id: String,
    pub quantity: i64,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn new(
        kind: ReservationKind,
        reference_id: impl Into<String>,
        holder_id: impl Into<String>,
        sku_id: SkuId,
        quantity: i64,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            sku_id,
            kind,
            reference_id: reference_id.into(),
            holder_id: holder_id.into(),
            quantity,
            expires_at,
            active: true,
            created_at: now,
            released_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Leave the active state. Idempotent transitions are the caller's
    /// responsibility; the engine only deactivates rows it read as active.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.released_at = Some(now);
    }

    /// Consume part of the remaining hold (deduction). Returns the quantity
    /// actually taken; deactivates the row when fully consumed.
    pub fn consume(&mut self, wanted: i64, now: DateTime<Utc>) -> i64 {
        let taken = wanted.min(self.quantity);
        self.quantity -= taken;
        if self.quantity == 0 {
            self.deactivate(now);
        }
        taken
    }
}
