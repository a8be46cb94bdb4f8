use crate::config::EngineConfig;
use crate::error::{GraphError, SnapshotError};
use crate::workflow::{Edge, Node, WorkflowGraph};
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The canonical, format-agnostic content of a workflow: its nodes and edges
/// in order, with all per-node state. Every import path produces one of these.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl WorkflowSnapshot {
    /// Encodes the snapshot in the compact bincode format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        encode_to_vec(self, standard()).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        decode_from_slice(bytes, standard())
            .map(|(snapshot, _)| snapshot) // bincode 2 returns (data, bytes_read)
            .map_err(|e| SnapshotError::Decode(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|e| SnapshotError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| SnapshotError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }
}

impl WorkflowGraph {
    /// Copies the current nodes and edges out, in insertion order.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    /// Rebuilds a graph from a snapshot. Stored inputs are taken as-is; nothing
    /// is propagated and the event log starts empty.
    pub fn from_snapshot(
        snapshot: WorkflowSnapshot,
        config: EngineConfig,
    ) -> Result<Self, GraphError> {
        let mut graph = WorkflowGraph::with_config(config);
        for node in snapshot.nodes {
            graph.insert_node(node)?;
        }
        for edge in snapshot.edges {
            graph.insert_edge(edge)?;
        }
        graph.drain_events();
        Ok(graph)
    }
}
