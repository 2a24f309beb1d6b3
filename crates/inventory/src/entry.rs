//! Append-only audit ledger entries.
//!
//! Every committed stock mutation writes exactly one entry in the same unit
//! of work; entries are never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopstack_core::{EntryId, OperatorId, SkuId, StockError};

use crate::record::StockRecord;
use crate::reservation::ReservationKind;

/// What kind of mutation an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Reserve,
    Release,
    Deduct,
    Adjust,
    Restock,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reserve => "reserve",
            Self::Release => "release",
            Self::Deduct => "deduct",
            Self::Adjust => "adjust",
            Self::Restock => "restock",
        }
    }
}

impl core::str::FromStr for TransactionKind {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserve" => Ok(Self::Reserve),
            "release" => Ok(Self::Release),
            "deduct" => Ok(Self::Deduct),
            "adjust" => Ok(Self::Adjust),
            "restock" => Ok(Self::Restock),
            other => Err(StockError::validation(format!(
                "unknown transaction kind: {other}"
            ))),
        }
    }
}

/// What the entry's `reference_id` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Cart,
    Order,
    Manual,
    System,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Order => "order",
            Self::Manual => "manual",
            Self::System => "system",
        }
    }
}

impl core::str::FromStr for ReferenceKind {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "order" => Ok(Self::Order),
            "manual" => Ok(Self::Manual),
            "system" => Ok(Self::System),
            other => Err(StockError::validation(format!(
                "unknown reference kind: {other}"
            ))),
        }
    }
}

impl From<ReservationKind> for ReferenceKind {
    fn from(kind: ReservationKind) -> Self {
        match kind {
            ReservationKind::Cart => Self::Cart,
            ReservationKind::Order => Self::Order,
        }
    }
}

/// One immutable audit row.
///
/// `quantity_before`/`quantity_after` snapshot the **available** quantity
/// around the mutation. `quantity_change` is the signed delta of the quantity
/// the operation primarily affects: available for reserve/release and direct
/// sales, total for adjustments and reservation-backed deductions (where
/// available is untouched by design of the reserve flow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub sku_id: SkuId,
    pub kind: TransactionKind,
    pub quantity_change: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reference_kind: ReferenceKind,
    pub reference_id: Option<String>,
    pub operator_id: Option<OperatorId>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[allow(clippy::too_many_arguments)]
    fn build(
        kind: TransactionKind,
        sku_id: SkuId,
        quantity_change: i64,
        quantity_before: i64,
        quantity_after: i64,
        reference_kind: ReferenceKind,
        reference_id: Option<String>,
        operator_id: Option<OperatorId>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            sku_id,
            kind,
            quantity_change,
            quantity_before,
            quantity_after,
            reference_kind,
            reference_id,
            operator_id,
            reason,
            created_at: now,
        }
    }

    /// Initial stock intake at record creation.
    pub fn restock(
        record: &StockRecord,
        operator_id: Option<OperatorId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::build(
            TransactionKind::Restock,
            record.sku_id.clone(),
            record.total,
            0,
            record.available,
            ReferenceKind::Manual,
            None,
            operator_id,
            Some("initial stock".to_string()),
            now,
        )
    }

    /// Administrative adjustment; `total_delta` is the signed change of total.
    pub fn adjust(
        record: &StockRecord,
        total_delta: i64,
        available_before: i64,
        operator_id: Option<OperatorId>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::build(
            TransactionKind::Adjust,
            record.sku_id.clone(),
            total_delta,
            available_before,
            record.available,
            ReferenceKind::Manual,
            None,
            operator_id,
            reason,
            now,
        )
    }

    /// Hold placed: available dropped by `quantity`.
    pub fn reserve(
        record: &StockRecord,
        quantity: i64,
        reference_kind: ReferenceKind,
        reference_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self::build(
            TransactionKind::Reserve,
            record.sku_id.clone(),
            -quantity,
            record.available + quantity,
            record.available,
            reference_kind,
            Some(reference_id.to_string()),
            None,
            None,
            now,
        )
    }

    /// Hold released: available restored by `quantity`.
    pub fn release(
        record: &StockRecord,
        quantity: i64,
        reference_kind: ReferenceKind,
        reference_id: &str,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::build(
            TransactionKind::Release,
            record.sku_id.clone(),
            quantity,
            record.available - quantity,
            record.available,
            reference_kind,
            Some(reference_id.to_string()),
            None,
            reason,
            now,
        )
    }

    /// Permanent removal of `quantity` upon fulfillment.
    pub fn deduct(
        record: &StockRecord,
        quantity: i64,
        available_before: i64,
        order_ref: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self::build(
            TransactionKind::Deduct,
            record.sku_id.clone(),
            -quantity,
            available_before,
            record.available,
            ReferenceKind::Order,
            Some(order_ref.to_string()),
            None,
            None,
            now,
        )
    }
}
