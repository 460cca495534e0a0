//! API Controller modules
//!
//! One module per route under `/push`, plus the version check.

pub mod public_key;
pub mod send;
pub mod subscribe;
pub mod version;
