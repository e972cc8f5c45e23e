//! Tag row persistence.
//!
//! # Invariants
//! - Names passed in are already normalized by `normalize_tag_name`.
//! - Duplicate names surface as `Conflict` through the `UNIQUE` constraint.
//!   Comparison is exact, so `ml` and `ML` are distinct tags.
//! - Listings sort by `name COLLATE NOCASE, id`.
//! - Deleting a tag row here never touches association rows; callers clear
//!   those first inside the same transaction.

use crate::db::NOW_MS_SQL;
use crate::error::{CoreError, CoreResult, RecordKind};
use crate::model::tag::{Tag, TagId, TagStats};
use crate::repo::association_repo::LinkTable;
use crate::repo::entity_repo::parse_uuid;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const TAG_SELECT_SQL: &str = "SELECT id, name, created_at, updated_at FROM tags";

pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, name: &str) -> CoreResult<Tag> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO tags (id, name) VALUES (?1, ?2);",
                params![id.to_string(), name],
            )
            .map_err(|err| name_conflict(err, name))?;
        self.get(id)
    }

    pub fn find(&self, id: TagId) -> CoreResult<Option<Tag>> {
        self.conn
            .query_row(
                &format!("{TAG_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_tag_row(row)),
            )
            .optional()?
            .transpose()
    }

    pub fn get(&self, id: TagId) -> CoreResult<Tag> {
        self.find(id)?
            .ok_or_else(|| CoreError::not_found(RecordKind::Tag, id))
    }

    pub fn exists(&self, id: TagId) -> CoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    pub fn rename(&self, id: TagId, name: &str) -> CoreResult<Tag> {
        let changed = self
            .conn
            .execute(
                &format!("UPDATE tags SET name = ?2, updated_at = {NOW_MS_SQL} WHERE id = ?1;"),
                params![id.to_string(), name],
            )
            .map_err(|err| name_conflict(err, name))?;
        if changed == 0 {
            return Err(CoreError::not_found(RecordKind::Tag, id));
        }
        self.get(id)
    }

    /// Deletes the tag row only. Returns whether a row was removed.
    pub fn delete(&self, id: TagId) -> CoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    /// All tags sorted by name, case-insensitively.
    pub fn list(&self) -> CoreResult<Vec<Tag>> {
        self.collect(
            &format!("{TAG_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"),
            params![],
        )
    }

    /// Tags linked to `owner` through `link`, in listing order.
    pub fn linked_to(&self, link: LinkTable, owner: Uuid) -> CoreResult<Vec<Tag>> {
        self.collect(
            &format!(
                "{TAG_SELECT_SQL}
                 WHERE id IN (SELECT {target} FROM {table} WHERE {owner_column} = ?1)
                 ORDER BY name COLLATE NOCASE ASC, id ASC;",
                target = link.target_column,
                table = link.table,
                owner_column = link.owner_column,
            ),
            params![owner.to_string()],
        )
    }

    /// Tags whose name contains `keyword` (ASCII case-insensitive).
    pub fn search(&self, keyword: &str) -> CoreResult<Vec<Tag>> {
        self.collect(
            &format!(
                "{TAG_SELECT_SQL}
                 WHERE name LIKE ?1 ESCAPE '\\'
                 ORDER BY name COLLATE NOCASE ASC, id ASC;"
            ),
            params![like_pattern(keyword)],
        )
    }

    pub fn stats(&self, id: TagId) -> CoreResult<TagStats> {
        let tag = self.get(id)?;
        let (paper_count, note_count): (i64, i64) = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM paper_tags WHERE tag_id = ?1),
                (SELECT COUNT(*) FROM note_tags WHERE tag_id = ?1);",
            [id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(TagStats {
            tag,
            paper_count: count_to_u64(paper_count)?,
            note_count: count_to_u64(note_count)?,
        })
    }

    fn collect(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> CoreResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }
}

/// Builds a `LIKE` pattern matching `keyword` as a literal substring.
pub(crate) fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn name_conflict(err: rusqlite::Error, name: &str) -> CoreError {
    match CoreError::from(err) {
        CoreError::Conflict(_) => CoreError::Conflict(format!("tag name `{name}` already exists")),
        other => other,
    }
}

fn count_to_u64(value: i64) -> CoreResult<u64> {
    u64::try_from(value).map_err(|_| CoreError::InvalidData(format!("negative row count {value}")))
}

fn parse_tag_row(row: &Row<'_>) -> CoreResult<Tag> {
    let id_text: String = row.get("id")?;
    Ok(Tag {
        id: parse_uuid(&id_text, "tags.id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ml"), "%ml%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
