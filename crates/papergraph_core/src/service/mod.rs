//! Use-case services over the store.
//!
//! # Responsibility
//! - Own transaction boundaries; repositories never open transactions.
//! - Translate validated requests into repository calls and log outcomes.

pub mod association_service;
pub mod autosave;
pub mod entity_service;
pub mod graph_service;
pub mod related_service;
pub mod tag_service;
