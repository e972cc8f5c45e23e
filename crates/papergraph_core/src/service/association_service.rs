//! Association mutator.
//!
//! # Responsibility
//! - Apply add/remove diffs to an entity's tag or peer rows atomically.
//! - Turn a desired tag/peer set into a minimal diff and apply it.
//! - Cascade association cleanup when an entity or tag is deleted.
//!
//! # Invariants
//! - Every call runs in one `BEGIN IMMEDIATE` transaction: all row changes
//!   commit together or none do.
//! - `set_desired_*` reads the current set inside the same transaction it
//!   writes in, so concurrent callers cannot lose each other's updates
//!   between read and write.
//! - Entity and tag rows are never modified by association mutations.

use crate::db::Store;
use crate::error::{CoreError, CoreResult, RecordKind};
use crate::model::association::{AssociationChange, AssociationDiff, AssociationKind};
use crate::model::entity::{EntityId, EntityKind};
use crate::model::tag::TagId;
use crate::repo::association_repo::{LinkTable, SqliteAssociationRepository};
use crate::repo::entity_repo::{record_kind, SqliteEntityRepository};
use crate::repo::tag_repo::SqliteTagRepository;
use log::info;
use rusqlite::Connection;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Applies association diffs against one store.
pub struct AssociationMutator<'s> {
    store: &'s Store,
}

impl<'s> AssociationMutator<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Removes `remove` then inserts `add` for one association of
    /// `entity_id`.
    ///
    /// # Errors
    /// - `NotFound` when the entity or any referenced id does not exist.
    /// - `Conflict` when an added pair already exists.
    /// - `Validation` when an id is in both lists.
    pub fn apply_associations(
        &self,
        entity_id: EntityId,
        kind: AssociationKind,
        add: impl IntoIterator<Item = Uuid>,
        remove: impl IntoIterator<Item = Uuid>,
    ) -> CoreResult<AssociationChange> {
        let diff = AssociationDiff::new(add, remove)?;
        let change = self.store.write(|tx| {
            let entity_kind = resolve_entity_kind(tx, entity_id)?;
            apply_diff(tx, entity_kind, entity_id, kind, &diff)
        })?;
        log_change("apply_associations", entity_id, kind, change);
        Ok(change)
    }

    /// Makes the tag set of `entity_id` exactly `desired`.
    pub fn set_desired_tags(
        &self,
        entity_id: EntityId,
        desired: impl IntoIterator<Item = TagId>,
    ) -> CoreResult<AssociationChange> {
        self.set_desired_associations(entity_id, AssociationKind::Tags, desired)
    }

    /// Makes one association set of `entity_id` exactly `desired`.
    ///
    /// Pairs already present are left alone, so repeating a call with the
    /// same `desired` set writes no rows.
    pub fn set_desired_associations(
        &self,
        entity_id: EntityId,
        kind: AssociationKind,
        desired: impl IntoIterator<Item = Uuid>,
    ) -> CoreResult<AssociationChange> {
        let desired: BTreeSet<Uuid> = desired.into_iter().collect();
        let change = self.store.write(|tx| {
            let entity_kind = resolve_entity_kind(tx, entity_id)?;
            let link = LinkTable::for_entity(entity_kind, kind);
            let current = SqliteAssociationRepository::new(tx).targets(link, entity_id)?;
            let diff = AssociationDiff::between(&current, &desired);
            apply_diff(tx, entity_kind, entity_id, kind, &diff)
        })?;
        log_change("set_desired_associations", entity_id, kind, change);
        Ok(change)
    }

    /// Current target ids of one association of `entity_id`.
    pub fn current(&self, entity_id: EntityId, kind: AssociationKind) -> CoreResult<BTreeSet<Uuid>> {
        self.store.read(|tx| {
            let entity_kind = resolve_entity_kind(tx, entity_id)?;
            SqliteAssociationRepository::new(tx)
                .targets(LinkTable::for_entity(entity_kind, kind), entity_id)
        })
    }
}

fn log_change(op: &str, entity_id: EntityId, kind: AssociationKind, change: AssociationChange) {
    info!(
        "event=association_mutation module=association status=ok op={op} entity_id={entity_id} association={} added={} removed={}",
        kind.as_str(),
        change.added,
        change.removed
    );
}

pub(crate) fn resolve_entity_kind(conn: &Connection, entity_id: EntityId) -> CoreResult<EntityKind> {
    SqliteEntityRepository::new(conn)
        .kind_of(entity_id)?
        .ok_or_else(|| CoreError::not_found(RecordKind::Entity, entity_id))
}

/// Applies `diff` through `conn`, which must be inside a write transaction.
///
/// Removals run before insertions. Every referenced id is checked first so
/// a missing target reports a precise `NotFound`.
pub(crate) fn apply_diff(
    conn: &Connection,
    entity_kind: EntityKind,
    entity_id: EntityId,
    kind: AssociationKind,
    diff: &AssociationDiff,
) -> CoreResult<AssociationChange> {
    if diff.is_empty() {
        return Ok(AssociationChange::default());
    }

    let link = LinkTable::for_entity(entity_kind, kind);
    for &target in diff.add.iter().chain(diff.remove.iter()) {
        ensure_target_exists(conn, entity_kind, kind, target)?;
    }

    let repo = SqliteAssociationRepository::new(conn);
    let removed = repo.delete_targets(link, entity_id, &diff.remove)?;
    for &target in &diff.add {
        repo.insert(link, entity_id, target)?;
    }

    Ok(AssociationChange {
        added: diff.add.len(),
        removed,
    })
}

fn ensure_target_exists(
    conn: &Connection,
    entity_kind: EntityKind,
    kind: AssociationKind,
    target: Uuid,
) -> CoreResult<()> {
    let (exists, target_kind) = match kind {
        AssociationKind::Tags => (
            SqliteTagRepository::new(conn).exists(target)?,
            RecordKind::Tag,
        ),
        AssociationKind::Peers => {
            let peer = entity_kind.peer();
            (
                SqliteEntityRepository::new(conn).exists(peer, target)?,
                record_kind(peer),
            )
        }
    };
    if !exists {
        return Err(CoreError::not_found(target_kind, target));
    }
    Ok(())
}

/// Deletes every association row mentioning the entity, then the entity.
pub(crate) fn delete_entity_cascade(
    conn: &Connection,
    entity_kind: EntityKind,
    entity_id: EntityId,
) -> CoreResult<usize> {
    let repo = SqliteAssociationRepository::new(conn);
    let tags = LinkTable::for_entity(entity_kind, AssociationKind::Tags);
    let peers = LinkTable::for_entity(entity_kind, AssociationKind::Peers);
    let removed = repo.delete_mentioning(tags.table, tags.owner_column, entity_id)?
        + repo.delete_mentioning(peers.table, peers.owner_column, entity_id)?;

    if !SqliteEntityRepository::new(conn).delete(entity_kind, entity_id)? {
        return Err(CoreError::not_found(record_kind(entity_kind), entity_id));
    }
    Ok(removed)
}

/// Deletes every paper/note association of the tag, then the tag.
pub(crate) fn delete_tag_cascade(conn: &Connection, tag_id: TagId) -> CoreResult<usize> {
    let repo = SqliteAssociationRepository::new(conn);
    let removed = repo.delete_mentioning("paper_tags", "tag_id", tag_id)?
        + repo.delete_mentioning("note_tags", "tag_id", tag_id)?;

    if !SqliteTagRepository::new(conn).delete(tag_id)? {
        return Err(CoreError::not_found(RecordKind::Tag, tag_id));
    }
    Ok(removed)
}
