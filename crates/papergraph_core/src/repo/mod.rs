//! Repository layer over the SQLite schema.
//!
//! # Responsibility
//! - Keep SQL details for papers, notes, tags and association rows in one
//!   place.
//! - Operate on whatever connection or transaction the caller passes in, so
//!   services decide the transaction boundaries.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to store transport errors.
//! - Read paths reject malformed persisted ids instead of masking them.

pub mod association_repo;
pub mod entity_repo;
pub mod snapshot;
pub mod tag_repo;
