//! Inventory stock ledger and reservation engine.
//!
//! This crate contains the business rules for per-SKU stock accounting:
//! quantity counters with the `total == available + reserved` invariant,
//! time-bounded reservations, permanent deductions, administrative
//! adjustments, an append-only audit ledger, and invariant diagnostics.
//!
//! Storage is abstracted behind [`StockStore`]: every mutation runs inside an
//! explicit unit of work that locks the affected SKU rows before reading,
//! writes the mutation plus exactly one ledger entry, and commits atomically.
//! Backends live in `shopstack-infra`.

pub mod consistency;
pub mod entry;
pub mod ledger;
pub mod manager;
pub mod record;
pub mod recorder;
pub mod reservation;
pub mod sweeper;

pub mod store;

pub use consistency::{ConsistencyChecker, ConsistencyIssue, ConsistencyReport, IssueKind};
pub use entry::{LedgerEntry, ReferenceKind, TransactionKind};
pub use ledger::{AdjustStock, CreateStock, StockLedger, BATCH_GET_MAX};
pub use manager::{
    DeductItem, DeductOutcome, DeductedItem, HolderReleaseOutcome, ReleaseOutcome,
    ReservationManager, ReserveItem, ReserveOutcome, ReserveRequest, ReservedItem,
};
pub use record::{AdjustmentKind, LowStockLevel, StockRecord};
pub use recorder::{TransactionFilter, TransactionRecorder};
pub use reservation::{Reservation, ReservationKind};
pub use store::{StockStore, StockUnitOfWork};
pub use sweeper::{CleanupOutcome, ExpirationSweeper, SweeperConfig};
