//! HTTP handlers for the list admin API.

pub mod lists;
pub use lists::*;
