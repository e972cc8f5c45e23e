//! Paper/note row persistence.
//!
//! # Responsibility
//! - Insert, read, update and delete `papers` and `notes` rows.
//! - Decode rows into [`Entity`] values, rejecting malformed ids.
//!
//! # Invariants
//! - Only the entity row itself is touched here; association cleanup is the
//!   caller's job and must run in the same transaction.
//! - Listing order is always deterministic (`... DESC, id ASC`).

use crate::db::NOW_MS_SQL;
use crate::error::{CoreError, CoreResult, RecordKind};
use crate::model::entity::{Entity, EntityId, EntityKind, NewNote, NewPaper, Note, Paper};
use crate::model::update::FieldChanges;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const PAPER_SELECT_SQL: &str = "SELECT
    id,
    name,
    source_url,
    annotations,
    created_at,
    updated_at
FROM papers";

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    name,
    content,
    created_at,
    updated_at
FROM notes";

/// Column used to order list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    CreatedDesc,
    UpdatedDesc,
}

impl ListOrder {
    fn sql(self) -> &'static str {
        match self {
            Self::CreatedDesc => " ORDER BY created_at DESC, id ASC",
            Self::UpdatedDesc => " ORDER BY updated_at DESC, id ASC",
        }
    }
}

pub(crate) fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Paper => "papers",
        EntityKind::Note => "notes",
    }
}

fn tag_link(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Paper => ("paper_tags", "paper_id"),
        EntityKind::Note => ("note_tags", "note_id"),
    }
}

pub(crate) fn record_kind(kind: EntityKind) -> RecordKind {
    match kind {
        EntityKind::Paper => RecordKind::Paper,
        EntityKind::Note => RecordKind::Note,
    }
}

/// SQLite-backed paper/note repository bound to one connection or
/// transaction.
pub struct SqliteEntityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn insert_paper(&self, paper: &NewPaper) -> CoreResult<Paper> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO papers (id, name, source_url, annotations) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                paper.name.trim(),
                paper.source_url.trim(),
                paper.annotations.as_deref(),
            ],
        )?;
        self.find_paper(id)?.ok_or_else(|| {
            CoreError::InvalidData(format!("created paper {id} not found in read-back"))
        })
    }

    pub fn insert_note(&self, note: &NewNote) -> CoreResult<Note> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO notes (id, name, content) VALUES (?1, ?2, ?3);",
            params![id.to_string(), note.name.trim(), note.content.as_deref()],
        )?;
        self.find_note(id)?.ok_or_else(|| {
            CoreError::InvalidData(format!("created note {id} not found in read-back"))
        })
    }

    pub fn find_paper(&self, id: EntityId) -> CoreResult<Option<Paper>> {
        self.conn
            .query_row(
                &format!("{PAPER_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_paper_row(row)),
            )
            .optional()?
            .transpose()
    }

    pub fn find_note(&self, id: EntityId) -> CoreResult<Option<Note>> {
        self.conn
            .query_row(
                &format!("{NOTE_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_note_row(row)),
            )
            .optional()?
            .transpose()
    }

    /// Finds a paper or note by id.
    pub fn find(&self, id: EntityId) -> CoreResult<Option<Entity>> {
        if let Some(paper) = self.find_paper(id)? {
            return Ok(Some(Entity::Paper(paper)));
        }
        Ok(self.find_note(id)?.map(Entity::Note))
    }

    /// Like [`Self::find`], failing with `NotFound` for unknown ids.
    pub fn get(&self, id: EntityId) -> CoreResult<Entity> {
        self.find(id)?
            .ok_or_else(|| CoreError::not_found(RecordKind::Entity, id))
    }

    /// Resolves which table holds `id`.
    pub fn kind_of(&self, id: EntityId) -> CoreResult<Option<EntityKind>> {
        for kind in [EntityKind::Paper, EntityKind::Note] {
            if self.exists(kind, id)? {
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }

    pub fn exists(&self, kind: EntityKind, id: EntityId) -> CoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
                table_for(kind)
            ),
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Applies field changes and bumps `updated_at`.
    ///
    /// `FieldChanges::content` maps to `annotations` for papers.
    pub(crate) fn update_fields(
        &self,
        kind: EntityKind,
        id: EntityId,
        changes: &FieldChanges,
    ) -> CoreResult<()> {
        let changed = match kind {
            EntityKind::Paper => self.conn.execute(
                &format!(
                    "UPDATE papers
                     SET
                        name = COALESCE(?2, name),
                        source_url = COALESCE(?3, source_url),
                        annotations = COALESCE(?4, annotations),
                        updated_at = {NOW_MS_SQL}
                     WHERE id = ?1;"
                ),
                params![
                    id.to_string(),
                    changes.name.as_deref().map(str::trim),
                    changes.source_url.as_deref().map(str::trim),
                    changes.content.as_deref(),
                ],
            )?,
            EntityKind::Note => self.conn.execute(
                &format!(
                    "UPDATE notes
                     SET
                        name = COALESCE(?2, name),
                        content = COALESCE(?3, content),
                        updated_at = {NOW_MS_SQL}
                     WHERE id = ?1;"
                ),
                params![
                    id.to_string(),
                    changes.name.as_deref().map(str::trim),
                    changes.content.as_deref(),
                ],
            )?,
        };

        if changed == 0 {
            return Err(CoreError::not_found(record_kind(kind), id));
        }
        Ok(())
    }

    /// Deletes the entity row only. Returns whether a row was removed.
    pub fn delete(&self, kind: EntityKind, id: EntityId) -> CoreResult<bool> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", table_for(kind)),
            [id.to_string()],
        )?;
        Ok(changed > 0)
    }

    pub fn list(&self, kind: EntityKind, order: ListOrder) -> CoreResult<Vec<Entity>> {
        self.query(kind, order.sql(), Vec::new())
    }

    /// Entities of `kind` carrying at least one of `tag_ids`, excluding
    /// `exclude`, most recently updated first.
    pub fn sharing_any_tag(
        &self,
        kind: EntityKind,
        tag_ids: &[Uuid],
        exclude: EntityId,
        limit: u32,
    ) -> CoreResult<Vec<Entity>> {
        if tag_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let (link_table, owner_column) = tag_link(kind);
        let placeholders = vec!["?"; tag_ids.len()].join(", ");
        let tail = format!(
            " WHERE id != ?
               AND EXISTS (
                    SELECT 1
                    FROM {link_table} link
                    WHERE link.{owner_column} = {table}.id
                      AND link.tag_id IN ({placeholders})
               )
             ORDER BY updated_at DESC, id ASC
             LIMIT ?",
            table = table_for(kind),
        );

        let mut bind_values = vec![Value::Text(exclude.to_string())];
        bind_values.extend(tag_ids.iter().map(|id| Value::Text(id.to_string())));
        bind_values.push(Value::Integer(i64::from(limit)));
        self.query(kind, &tail, bind_values)
    }

    /// Entities of `kind` tagged with `tag_id`, most recently updated first.
    pub fn tagged_with(&self, kind: EntityKind, tag_id: Uuid) -> CoreResult<Vec<Entity>> {
        let (link_table, owner_column) = tag_link(kind);
        let tail = format!(
            " WHERE EXISTS (
                    SELECT 1
                    FROM {link_table} link
                    WHERE link.{owner_column} = {table}.id
                      AND link.tag_id = ?
               )
             ORDER BY updated_at DESC, id ASC",
            table = table_for(kind),
        );
        self.query(kind, &tail, vec![Value::Text(tag_id.to_string())])
    }

    /// Runs `SELECT <entity columns> FROM <table>` followed by `tail`.
    pub(crate) fn query(
        &self,
        kind: EntityKind,
        tail: &str,
        bind_values: Vec<Value>,
    ) -> CoreResult<Vec<Entity>> {
        let select = match kind {
            EntityKind::Paper => PAPER_SELECT_SQL,
            EntityKind::Note => NOTE_SELECT_SQL,
        };
        let mut stmt = self.conn.prepare(&format!("{select}{tail};"))?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(match kind {
                EntityKind::Paper => Entity::Paper(parse_paper_row(row)?),
                EntityKind::Note => Entity::Note(parse_note_row(row)?),
            });
        }
        Ok(entities)
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> CoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| CoreError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn parse_paper_row(row: &Row<'_>) -> CoreResult<Paper> {
    let id_text: String = row.get("id")?;
    Ok(Paper {
        id: parse_uuid(&id_text, "papers.id")?,
        name: row.get("name")?,
        source_url: row.get("source_url")?,
        annotations: row.get("annotations")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_note_row(row: &Row<'_>) -> CoreResult<Note> {
    let id_text: String = row.get("id")?;
    Ok(Note {
        id: parse_uuid(&id_text, "notes.id")?,
        name: row.get("name")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
