//! Substring keyword search over papers and notes.
//!
//! # Invariants
//! - A hit contains `keyword` in its name or body (ASCII case-insensitive,
//!   wildcards in `keyword` are matched literally).
//! - Results are ordered by `created_at DESC, id ASC`; blank keywords
//!   return nothing.

use crate::db::Store;
use crate::error::CoreResult;
use crate::model::entity::{Entity, EntityKind};
use crate::repo::entity_repo::SqliteEntityRepository;
use crate::repo::tag_repo::like_pattern;
use log::debug;
use rusqlite::types::Value;

/// Returns entities of `kind` whose name or body contains `keyword`.
pub fn search_entities(store: &Store, kind: EntityKind, keyword: &str) -> CoreResult<Vec<Entity>> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Vec::new());
    }

    let body_column = match kind {
        EntityKind::Paper => "annotations",
        EntityKind::Note => "content",
    };
    let tail = format!(
        " WHERE name LIKE ?1 ESCAPE '\\'
             OR {body_column} LIKE ?1 ESCAPE '\\'
         ORDER BY created_at DESC, id ASC"
    );
    let pattern = like_pattern(keyword);
    let hits = store.read(|tx| {
        SqliteEntityRepository::new(tx).query(kind, &tail, vec![Value::Text(pattern)])
    })?;
    debug!(
        "event=keyword_search module=search status=ok kind={} hits={}",
        kind.as_str(),
        hits.len()
    );
    Ok(hits)
}
