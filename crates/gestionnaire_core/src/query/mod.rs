//! Query building blocks shared by services.
//!
//! # Responsibility
//! - Resolve project references across every historical storage shape.
//! - Apply offset/limit pagination with total-count metadata.
//!
//! # Invariants
//! - Nothing here mutates storage.

pub mod pagination;
pub mod resolver;
