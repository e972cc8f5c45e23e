//! Snapshot to graph transform.
//!
//! Pure and deterministic: the same snapshot always yields the same nodes
//! in the same order and the same edges sorted by `(source, target, kind)`.

use super::{EdgeKind, EdgeView, Graph, GraphSnapshot, NodeKind, NodeView};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

#[derive(Default)]
struct NodeLinks {
    tag_ids: BTreeSet<Uuid>,
    reference_ids: BTreeSet<Uuid>,
    backlink_ids: BTreeSet<Uuid>,
}

struct PendingNode {
    id: Uuid,
    name: String,
    kind: NodeKind,
    updated_at: i64,
    links: NodeLinks,
}

/// Builds the node/edge view of `snapshot`.
///
/// Nodes come out as tags, then papers, then notes, each in snapshot order;
/// a repeated id keeps its first occurrence. Association rows whose
/// endpoints are missing from the snapshot (possible when the snapshot was
/// assembled from independent reads) produce no edge.
pub fn build_graph(snapshot: &GraphSnapshot) -> Graph {
    let mut nodes: Vec<PendingNode> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    let tags = snapshot
        .tags
        .iter()
        .map(|tag| (tag.id, tag.name.as_str(), NodeKind::Tag, tag.updated_at));
    let papers = snapshot.papers.iter().map(|paper| {
        (
            paper.id,
            paper.name.as_str(),
            NodeKind::Paper,
            paper.updated_at,
        )
    });
    let notes = snapshot
        .notes
        .iter()
        .map(|note| (note.id, note.name.as_str(), NodeKind::Note, note.updated_at));

    for (id, name, kind, updated_at) in tags.chain(papers).chain(notes) {
        if index.contains_key(&id) {
            continue;
        }
        index.insert(id, nodes.len());
        nodes.push(PendingNode {
            id,
            name: name.to_string(),
            kind,
            updated_at,
            links: NodeLinks::default(),
        });
    }

    let position = |id: Uuid, kind: NodeKind| -> Option<usize> {
        index
            .get(&id)
            .copied()
            .filter(|&pos| nodes[pos].kind == kind)
    };

    let mut edges: BTreeSet<EdgeView> = BTreeSet::new();
    let mut tag_links: Vec<(usize, Uuid)> = Vec::new();
    let mut reference_links: Vec<(usize, usize)> = Vec::new();

    let entity_tag_rows = snapshot
        .paper_tags
        .iter()
        .map(|row| (row.paper_id, NodeKind::Paper, row.tag_id))
        .chain(
            snapshot
                .note_tags
                .iter()
                .map(|row| (row.note_id, NodeKind::Note, row.tag_id)),
        );
    for (entity_id, entity_kind, tag_id) in entity_tag_rows {
        let (Some(entity_pos), Some(_)) = (
            position(entity_id, entity_kind),
            position(tag_id, NodeKind::Tag),
        ) else {
            continue;
        };
        edges.insert(EdgeView {
            source: entity_id,
            target: tag_id,
            kind: EdgeKind::Tag,
        });
        tag_links.push((entity_pos, tag_id));
    }

    for row in &snapshot.note_papers {
        let (Some(note_pos), Some(paper_pos)) = (
            position(row.note_id, NodeKind::Note),
            position(row.paper_id, NodeKind::Paper),
        ) else {
            continue;
        };
        edges.insert(EdgeView {
            source: row.note_id,
            target: row.paper_id,
            kind: EdgeKind::Reference,
        });
        reference_links.push((note_pos, paper_pos));
    }

    for (entity_pos, tag_id) in tag_links {
        nodes[entity_pos].links.tag_ids.insert(tag_id);
    }
    for (note_pos, paper_pos) in reference_links {
        let note_id = nodes[note_pos].id;
        let paper_id = nodes[paper_pos].id;
        nodes[note_pos].links.reference_ids.insert(paper_id);
        nodes[paper_pos].links.backlink_ids.insert(note_id);
    }

    Graph {
        nodes: nodes
            .into_iter()
            .map(|node| NodeView {
                id: node.id,
                name: node.name,
                kind: node.kind,
                updated_at: node.updated_at,
                tag_ids: node.links.tag_ids.into_iter().collect(),
                reference_ids: node.links.reference_ids.into_iter().collect(),
                backlink_ids: node.links.backlink_ids.into_iter().collect(),
            })
            .collect(),
        edges: edges.into_iter().collect(),
    }
}
