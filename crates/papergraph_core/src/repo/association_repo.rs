//! Association row persistence for `paper_tags`, `note_tags` and
//! `note_papers`.
//!
//! # Responsibility
//! - Map an (entity kind, association kind) pair to its link table.
//! - Insert, delete and list association rows.
//!
//! # Invariants
//! - Inserting an existing pair fails with `Conflict`; it is never ignored.
//! - Deletes only ever touch association rows, never entity or tag rows.

use crate::error::{is_foreign_key_violation, CoreError, CoreResult, RecordKind};
use crate::model::association::{AssociationKind, NotePaperRow, NoteTagRow, PaperTagRow};
use crate::model::entity::EntityKind;
use crate::repo::entity_repo::parse_uuid;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::BTreeSet;
use uuid::Uuid;

/// One side-oriented view of a link table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTable {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub target_column: &'static str,
    /// What the target column points at.
    pub target: RecordKind,
}

impl LinkTable {
    /// Link table holding `association` rows for an entity of `kind`.
    ///
    /// Peers of a paper are read through `note_papers` from the paper side.
    pub fn for_entity(kind: EntityKind, association: AssociationKind) -> Self {
        match (kind, association) {
            (EntityKind::Paper, AssociationKind::Tags) => Self {
                table: "paper_tags",
                owner_column: "paper_id",
                target_column: "tag_id",
                target: RecordKind::Tag,
            },
            (EntityKind::Note, AssociationKind::Tags) => Self {
                table: "note_tags",
                owner_column: "note_id",
                target_column: "tag_id",
                target: RecordKind::Tag,
            },
            (EntityKind::Note, AssociationKind::Peers) => Self {
                table: "note_papers",
                owner_column: "note_id",
                target_column: "paper_id",
                target: RecordKind::Paper,
            },
            (EntityKind::Paper, AssociationKind::Peers) => Self {
                table: "note_papers",
                owner_column: "paper_id",
                target_column: "note_id",
                target: RecordKind::Note,
            },
        }
    }
}

pub struct SqliteAssociationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssociationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts one `(owner, target)` row.
    pub fn insert(&self, link: LinkTable, owner: Uuid, target: Uuid) -> CoreResult<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} ({}, {}) VALUES (?1, ?2);",
                    link.table, link.owner_column, link.target_column
                ),
                params![owner.to_string(), target.to_string()],
            )
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    return CoreError::not_found(link.target, target);
                }
                match CoreError::from(err) {
                    CoreError::Conflict(_) => CoreError::Conflict(format!(
                        "{} row ({owner}, {target}) already exists",
                        link.table
                    )),
                    other => other,
                }
            })?;
        Ok(())
    }

    /// Deletes the rows pairing `owner` with any of `targets`.
    pub fn delete_targets(
        &self,
        link: LinkTable,
        owner: Uuid,
        targets: &BTreeSet<Uuid>,
    ) -> CoreResult<usize> {
        if targets.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; targets.len()].join(", ");
        let mut bind_values = vec![Value::Text(owner.to_string())];
        bind_values.extend(targets.iter().map(|id| Value::Text(id.to_string())));
        let removed = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ? AND {} IN ({placeholders});",
                link.table, link.owner_column, link.target_column
            ),
            params_from_iter(bind_values),
        )?;
        Ok(removed)
    }

    /// Deletes every row of `table` whose `column` equals `id`.
    pub fn delete_mentioning(&self, table: &str, column: &str, id: Uuid) -> CoreResult<usize> {
        let removed = self.conn.execute(
            &format!("DELETE FROM {table} WHERE {column} = ?1;"),
            [id.to_string()],
        )?;
        Ok(removed)
    }

    /// Target ids currently linked to `owner`.
    pub fn targets(&self, link: LinkTable, owner: Uuid) -> CoreResult<BTreeSet<Uuid>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ?1;",
            link.target_column, link.table, link.owner_column
        ))?;
        let mut rows = stmt.query([owner.to_string()])?;
        let mut targets = BTreeSet::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            targets.insert(parse_uuid(&value, link.target_column)?);
        }
        Ok(targets)
    }

    pub fn paper_tag_rows(&self) -> CoreResult<Vec<PaperTagRow>> {
        self.pairs("paper_tags", "paper_id", "tag_id", |paper_id, tag_id| {
            PaperTagRow { paper_id, tag_id }
        })
    }

    pub fn note_tag_rows(&self) -> CoreResult<Vec<NoteTagRow>> {
        self.pairs("note_tags", "note_id", "tag_id", |note_id, tag_id| {
            NoteTagRow { note_id, tag_id }
        })
    }

    pub fn note_paper_rows(&self) -> CoreResult<Vec<NotePaperRow>> {
        self.pairs("note_papers", "note_id", "paper_id", |note_id, paper_id| {
            NotePaperRow { note_id, paper_id }
        })
    }

    fn pairs<T>(
        &self,
        table: &str,
        left: &str,
        right: &str,
        build: impl Fn(Uuid, Uuid) -> T,
    ) -> CoreResult<Vec<T>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {left}, {right} FROM {table} ORDER BY {left} ASC, {right} ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut pairs = Vec::new();
        while let Some(row) = rows.next()? {
            let left_text: String = row.get(0)?;
            let right_text: String = row.get(1)?;
            pairs.push(build(
                parse_uuid(&left_text, left)?,
                parse_uuid(&right_text, right)?,
            ));
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::LinkTable;
    use crate::error::RecordKind;
    use crate::model::association::AssociationKind;
    use crate::model::entity::EntityKind;

    #[test]
    fn peer_links_share_one_table_from_both_sides() {
        let from_note = LinkTable::for_entity(EntityKind::Note, AssociationKind::Peers);
        let from_paper = LinkTable::for_entity(EntityKind::Paper, AssociationKind::Peers);
        assert_eq!(from_note.table, from_paper.table);
        assert_eq!(from_note.owner_column, from_paper.target_column);
        assert_eq!(from_note.target, RecordKind::Paper);
        assert_eq!(from_paper.target, RecordKind::Note);
    }
}
