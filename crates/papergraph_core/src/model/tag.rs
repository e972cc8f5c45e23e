//! Tag records and tag-name rules.
//!
//! # Invariants
//! - Tag names are unique, compared exactly (case-sensitive).
//! - Stored names are trimmed at both ends and otherwise kept verbatim,
//!   1..=50 chars.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TagId = Uuid;

pub const TAG_NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Tag with usage counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStats {
    pub tag: Tag,
    pub paper_count: u64,
    pub note_count: u64,
}

/// Trims and validates a tag name.
///
/// Returns the stored form of `raw`.
pub fn normalize_tag_name(raw: &str) -> CoreResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("tag name cannot be empty".to_string()));
    }
    let chars = trimmed.chars().count();
    if chars > TAG_NAME_MAX_CHARS {
        return Err(CoreError::Validation(format!(
            "tag name must be at most {TAG_NAME_MAX_CHARS} characters, got {chars}"
        )));
    }
    Ok(trimmed.to_string())
}
