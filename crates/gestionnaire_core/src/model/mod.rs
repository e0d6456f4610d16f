//! Domain model for the three stored collections.
//!
//! # Responsibility
//! - Define the raw document shape and the native identifier type.
//! - Provide typed views (`User`, `Project`, `Task`) decoded from documents.
//! - Own write-side validation and project-reference normalization.
//!
//! # Invariants
//! - Every stored document is identified by an `ObjectId` under `_id`.
//! - Nothing is hard-deleted; tasks change only through partial patches.

pub mod document;
pub mod object_id;
pub mod project;
pub mod project_ref;
pub mod task;
pub mod timestamp;
pub mod user;
pub mod validation;
