//! Storage backends for the stock engine.
//!
//! Two implementations of `shopstack_inventory::StockStore`:
//!
//! - [`in_memory::InMemoryStockStore`] — tests/dev; real blocking per-SKU row
//!   locks so concurrency tests exercise the same discipline as production.
//! - [`postgres::PostgresStockStore`] — production; `SELECT ... FOR UPDATE`
//!   row locks inside sqlx transactions.

pub mod in_memory;
pub mod postgres;

#[cfg(test)]
mod integration_tests;

pub use in_memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;
