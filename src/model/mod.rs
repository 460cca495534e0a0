//! Database models module
//!
//! Persisted entities and the generic `Table` handle the DAO layer hangs its
//! queries on.

mod subscription;
mod table;

pub use subscription::Subscription;
pub use table::Table;
