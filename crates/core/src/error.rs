//! Stock engine error model.

use thiserror::Error;

use crate::id::SkuId;

/// Result type used across the stock engine.
pub type StockResult<T> = Result<T, StockError>;

/// Error taxonomy for stock operations.
///
/// Business-rule failures (`InsufficientStock`, `InvalidAdjustmentTarget`,
/// `DuplicateSku`, ...) mean the request itself cannot succeed as given;
/// infrastructure failures (`ConcurrencyConflict`, `Storage`) mean the same
/// request may succeed on a bare retry. Use [`StockError::is_retryable`] to
/// tell them apart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// No stock record exists for the SKU.
    #[error("stock record not found: {0}")]
    NotFound(SkuId),

    /// `create_stock` was called for a SKU that already has a record.
    #[error("stock record already exists: {0}")]
    DuplicateSku(SkuId),

    /// A reserve/deduct/decrease exceeded the quantity it draws from.
    #[error("insufficient stock for {sku}: requested {requested}, have {available}")]
    InsufficientStock {
        sku: SkuId,
        requested: i64,
        available: i64,
    },

    /// A set-adjustment targeted a total below the currently reserved quantity.
    #[error("adjustment target {target} for {sku} is below reserved quantity {reserved}")]
    InvalidAdjustmentTarget {
        sku: SkuId,
        target: i64,
        reserved: i64,
    },

    /// A stored record violates the quantity invariant. Diagnostics surface
    /// violations as reports; this error is for paths that cannot proceed on
    /// top of corrupt state.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Lock wait timeout, deadlock, or serialization failure from the store.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Malformed input (empty item list, zero quantity, duplicate SKU in one
    /// call, oversized batch, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Storage-layer failure unrelated to locking (connection loss, bad row).
    #[error("storage error: {0}")]
    Storage(String),
}

impl StockError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for infrastructure errors where retrying the identical request is
    /// meaningful. Business-rule errors need adjusted input instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_) | Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_splits_business_from_infrastructure() {
        let sku = SkuId::new("SKU-1").unwrap();
        assert!(!StockError::DuplicateSku(sku.clone()).is_retryable());
        assert!(
            !StockError::InsufficientStock {
                sku,
                requested: 5,
                available: 3
            }
            .is_retryable()
        );
        assert!(StockError::conflict("lock wait timeout").is_retryable());
        assert!(StockError::storage("connection reset").is_retryable());
    }
}
