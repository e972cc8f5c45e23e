//! Keyword search entry points.
//!
//! Plain substring matching over entity names and bodies; no ranking.

pub mod keyword;
