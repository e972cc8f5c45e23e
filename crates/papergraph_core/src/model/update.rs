//! Partial update request for papers and notes.
//!
//! # Responsibility
//! - Carry the optional members of an entity update as typed values.
//! - Validate the request before any store call is issued; only the
//!   kind-specific rule waits for the entity kind to be resolved.

use crate::error::{CoreError, CoreResult};
use crate::model::association::AssociationDiff;
use crate::model::entity::{require_text, EntityKind};
use crate::model::tag::TagId;
use uuid::Uuid;

/// Partial update of one entity: field changes plus association diffs.
///
/// Peers are notes for a paper and papers for a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityUpdate {
    pub rename_to: Option<String>,
    /// Replaces the body payload (annotations or content).
    pub set_content_to: Option<String>,
    /// Papers only.
    pub set_source_url_to: Option<String>,
    pub add_tag_ids: Vec<TagId>,
    pub remove_tag_ids: Vec<TagId>,
    pub add_peer_ids: Vec<Uuid>,
    pub remove_peer_ids: Vec<Uuid>,
}

impl EntityUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename_to = Some(name.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.set_content_to = Some(content.into());
        self
    }

    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.set_source_url_to = Some(url.into());
        self
    }

    pub fn add_tags(mut self, ids: impl IntoIterator<Item = TagId>) -> Self {
        self.add_tag_ids.extend(ids);
        self
    }

    pub fn remove_tags(mut self, ids: impl IntoIterator<Item = TagId>) -> Self {
        self.remove_tag_ids.extend(ids);
        self
    }

    pub fn add_peers(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.add_peer_ids.extend(ids);
        self
    }

    pub fn remove_peers(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.remove_peer_ids.extend(ids);
        self
    }

    /// Runs every check that does not depend on the entity kind.
    pub(crate) fn validate(self) -> CoreResult<ValidatedUpdate> {
        if let Some(name) = self.rename_to.as_deref() {
            require_text("name", name)?;
        }
        if let Some(url) = self.set_source_url_to.as_deref() {
            require_text("source url", url)?;
        }

        Ok(ValidatedUpdate {
            fields: FieldChanges {
                name: self.rename_to,
                content: self.set_content_to,
                source_url: self.set_source_url_to,
            },
            tags: AssociationDiff::new(self.add_tag_ids, self.remove_tag_ids)?,
            peers: AssociationDiff::new(self.add_peer_ids, self.remove_peer_ids)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FieldChanges {
    pub name: Option<String>,
    pub content: Option<String>,
    pub source_url: Option<String>,
}

impl FieldChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none() && self.source_url.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidatedUpdate {
    pub fields: FieldChanges,
    pub tags: AssociationDiff,
    pub peers: AssociationDiff,
}

impl ValidatedUpdate {
    /// Rejects field changes the entity kind does not carry.
    pub fn ensure_applies_to(&self, kind: EntityKind) -> CoreResult<()> {
        if kind == EntityKind::Note && self.fields.source_url.is_some() {
            return Err(CoreError::Validation(
                "notes do not carry a source url".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::EntityUpdate;
    use crate::error::ErrorKind;
    use crate::model::entity::EntityKind;
    use uuid::Uuid;

    #[test]
    fn source_url_is_rejected_for_notes_only() {
        let validated = EntityUpdate::new()
            .source_url("https://example.com")
            .validate()
            .unwrap();
        let err = validated.ensure_applies_to(EntityKind::Note).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(validated.ensure_applies_to(EntityKind::Paper).is_ok());
    }

    #[test]
    fn blank_rename_and_blank_url_are_rejected() {
        assert!(EntityUpdate::new().rename(" ").validate().is_err());
        assert!(EntityUpdate::new().source_url("\t").validate().is_err());
    }

    #[test]
    fn overlapping_tag_ids_are_rejected() {
        let tag = Uuid::new_v4();
        assert!(EntityUpdate::new()
            .add_tags([tag])
            .remove_tags([tag])
            .validate()
            .is_err());
    }

    #[test]
    fn valid_update_splits_fields_and_diffs() {
        let tag = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let validated = EntityUpdate::new()
            .rename("renamed")
            .add_tags([tag])
            .remove_peers([peer])
            .validate()
            .unwrap();
        assert_eq!(validated.fields.name.as_deref(), Some("renamed"));
        assert!(validated.tags.add.contains(&tag));
        assert!(validated.peers.remove.contains(&peer));
        assert!(validated.ensure_applies_to(EntityKind::Note).is_ok());
    }
}
