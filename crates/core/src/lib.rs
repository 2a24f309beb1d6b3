//! `shopstack-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared across the inventory
//! engine (no infrastructure concerns).

pub mod clock;
pub mod error;
pub mod id;
pub mod page;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{StockError, StockResult};
pub use id::{EntryId, OperatorId, ReservationId, SkuId};
pub use page::{Page, Pagination};
