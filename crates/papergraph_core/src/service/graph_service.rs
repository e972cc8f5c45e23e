//! Whole-corpus graph use-case.

use crate::db::Store;
use crate::error::CoreResult;
use crate::graph::{build_graph, Graph, GraphSnapshot};
use crate::repo::snapshot::load_snapshot;
use log::info;
use std::time::Instant;

pub struct GraphService<'s> {
    store: &'s Store,
}

impl<'s> GraphService<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Reads one consistent snapshot.
    pub fn snapshot(&self) -> CoreResult<GraphSnapshot> {
        self.store.read(|tx| load_snapshot(tx))
    }

    /// Rebuilds the graph from a fresh snapshot. Nothing is cached.
    pub fn build_graph(&self) -> CoreResult<Graph> {
        let started_at = Instant::now();
        let snapshot = self.snapshot()?;
        let graph = build_graph(&snapshot);
        info!(
            "event=graph_build module=graph status=ok nodes={} edges={} duration_ms={}",
            graph.nodes.len(),
            graph.edges.len(),
            started_at.elapsed().as_millis()
        );
        Ok(graph)
    }
}
