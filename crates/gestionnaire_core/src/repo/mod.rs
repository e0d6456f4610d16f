//! Storage gateway: document store contract and persistence implementation.
//!
//! # Responsibility
//! - Define the logical operations the core issues against storage.
//! - Isolate SQLite/JSON details from query building and services.
//!
//! # Invariants
//! - Gateway APIs return typed errors and never swallow database failures.
//! - Filters and pipelines are plain data; only this layer executes them.

pub mod document_store;
pub mod filter;
pub mod pipeline;
