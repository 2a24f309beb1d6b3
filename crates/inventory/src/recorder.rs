//! Audit ledger query surface.
//!
//! Entries are written by the mutating components inside their units of work
//! (see [`crate::entry::LedgerEntry`] constructors); this module is the
//! read side. The two-way contract: no stock mutation commits without exactly
//! one ledger entry in the same unit of work, and no entry exists without a
//! committed mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopstack_core::{OperatorId, Page, Pagination, SkuId, StockResult};

use crate::entry::{LedgerEntry, TransactionKind};
use crate::store::StockStore;

/// Filter criteria for ledger queries. All fields are conjunctive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub sku_id: Option<SkuId>,
    pub kind: Option<TransactionKind>,
    pub operator_id: Option<OperatorId>,
    /// Entries created at or after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Entries created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    /// True when an entry passes every set criterion.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(sku) = &self.sku_id {
            if &entry.sku_id != sku {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if entry.kind != kind {
                return false;
            }
        }
        if let Some(operator) = self.operator_id {
            if entry.operator_id != Some(operator) {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if entry.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if entry.created_at >= before {
                return false;
            }
        }
        true
    }
}

/// Read-only view over the append-only audit ledger.
#[derive(Debug)]
pub struct TransactionRecorder<S> {
    store: S,
}

impl<S> TransactionRecorder<S>
where
    S: StockStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Query entries, newest first.
    pub fn list_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> StockResult<Page<LedgerEntry>> {
        self.store.list_transactions(filter, pagination)
    }
}
