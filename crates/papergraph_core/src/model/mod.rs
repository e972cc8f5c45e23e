//! Domain model for papers, notes, tags and their associations.
//!
//! # Responsibility
//! - Define the records owned by the store and the request values accepted
//!   by services.
//! - Validate caller input once, before any store call.
//!
//! # Invariants
//! - Every paper, note and tag is identified by a stable UUIDv4.
//! - Association rows have no identity beyond their id pair.

pub mod association;
pub mod entity;
pub mod tag;
pub mod update;
