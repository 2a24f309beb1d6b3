//! Per-SKU stock record and quantity arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopstack_core::{SkuId, StockError, StockResult};

/// Kind of administrative adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    /// Add quantity to total and available (restock, recount upward).
    Increase,
    /// Remove quantity from total and available (shrinkage, damage).
    Decrease,
    /// Set total to an absolute value; available is derived as
    /// `target - reserved`.
    Set,
}

/// Low-stock severity level for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowStockLevel {
    Warning,
    Critical,
}

/// Quantity state for one SKU.
///
/// Invariant (must hold after every committed operation):
/// `total == available + reserved`, and all three are >= 0.
///
/// Records are created once per SKU and never deleted; retiring a SKU clears
/// the `active` flag instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub sku_id: SkuId,
    pub total: i64,
    pub available: i64,
    pub reserved: i64,
    pub warning_threshold: i64,
    pub critical_threshold: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Create a fresh record with all initial quantity available.
    pub fn new(
        sku_id: SkuId,
        initial_quantity: i64,
        warning_threshold: i64,
        critical_threshold: i64,
        now: DateTime<Utc>,
    ) -> StockResult<Self> {
        if initial_quantity < 0 {
            return Err(StockError::validation("initial quantity cannot be negative"));
        }
        if warning_threshold < 0 || critical_threshold < 0 {
            return Err(StockError::validation("thresholds cannot be negative"));
        }
        Ok(Self {
            sku_id,
            total: initial_quantity,
            available: initial_quantity,
            reserved: 0,
            warning_threshold,
            critical_threshold,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_low_stock(&self) -> bool {
        self.available <= self.warning_threshold
    }

    pub fn is_critical(&self) -> bool {
        self.available <= self.critical_threshold
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.available <= 0
    }

    pub fn matches_level(&self, level: LowStockLevel) -> bool {
        match level {
            LowStockLevel::Warning => self.is_low_stock(),
            LowStockLevel::Critical => self.is_critical(),
        }
    }

    /// True when the quantity equation and non-negativity both hold.
    pub fn invariant_holds(&self) -> bool {
        self.total == self.available + self.reserved
            && self.total >= 0
            && self.available >= 0
            && self.reserved >= 0
    }

    fn ensure_positive(quantity: i64) -> StockResult<()> {
        if quantity <= 0 {
            return Err(StockError::validation("quantity must be positive"));
        }
        Ok(())
    }

    /// Move quantity from available into reserved (hold placed).
    pub fn reserve(&mut self, quantity: i64) -> StockResult<()> {
        Self::ensure_positive(quantity)?;
        if self.available < quantity {
            return Err(StockError::InsufficientStock {
                sku: self.sku_id.clone(),
                requested: quantity,
                available: self.available,
            });
        }
        self.available -= quantity;
        self.reserved += quantity;
        Ok(())
    }

    /// Move quantity from reserved back into available (hold released).
    pub fn release(&mut self, quantity: i64) -> StockResult<()> {
        Self::ensure_positive(quantity)?;
        if self.reserved < quantity {
            return Err(StockError::InsufficientStock {
                sku: self.sku_id.clone(),
                requested: quantity,
                available: self.reserved,
            });
        }
        self.reserved -= quantity;
        self.available += quantity;
        Ok(())
    }

    /// Permanently remove reserved quantity (fulfillment of a hold).
    /// Available is untouched; it was already decremented at reserve time.
    pub fn deduct_reserved(&mut self, quantity: i64) -> StockResult<()> {
        Self::ensure_positive(quantity)?;
        if self.reserved < quantity {
            return Err(StockError::InsufficientStock {
                sku: self.sku_id.clone(),
                requested: quantity,
                available: self.reserved,
            });
        }
        self.reserved -= quantity;
        self.total -= quantity;
        Ok(())
    }

    /// Permanently remove available quantity (direct sale, no prior hold).
    pub fn deduct_available(&mut self, quantity: i64) -> StockResult<()> {
        Self::ensure_positive(quantity)?;
        if self.available < quantity {
            return Err(StockError::InsufficientStock {
                sku: self.sku_id.clone(),
                requested: quantity,
                available: self.available,
            });
        }
        self.available -= quantity;
        self.total -= quantity;
        Ok(())
    }

    /// Administrative increase of total and available.
    pub fn increase(&mut self, quantity: i64) -> StockResult<()> {
        Self::ensure_positive(quantity)?;
        let total = self
            .total
            .checked_add(quantity)
            .ok_or_else(|| StockError::validation("increase overflows total quantity"))?;
        self.total = total;
        // available <= total, so this sum fits once the total did.
        self.available += quantity;
        Ok(())
    }

    /// Administrative decrease of total and available.
    pub fn decrease(&mut self, quantity: i64) -> StockResult<()> {
        Self::ensure_positive(quantity)?;
        if self.available < quantity {
            return Err(StockError::InsufficientStock {
                sku: self.sku_id.clone(),
                requested: quantity,
                available: self.available,
            });
        }
        self.total -= quantity;
        self.available -= quantity;
        Ok(())
    }

    /// Set total to an absolute target; available becomes `target - reserved`.
    ///
    /// The target may not undercut quantity currently held by reservations.
    pub fn set_total(&mut self, target: i64) -> StockResult<()> {
        if target < 0 {
            return Err(StockError::validation("target quantity cannot be negative"));
        }
        if target < self.reserved {
            return Err(StockError::InvalidAdjustmentTarget {
                sku: self.sku_id.clone(),
                target,
                reserved: self.reserved,
            });
        }
        self.total = target;
        self.available = target - self.reserved;
        Ok(())
    }
}
