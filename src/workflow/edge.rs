use serde::{Deserialize, Serialize};

/// Visual edge style. The editor only ever draws `custom` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    Custom,
}

/// A directed connection from one node's handle to another node's handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    pub kind: EdgeKind,
}

impl Edge {
    /// The id the editor assigns to a fresh connection.
    pub fn default_id(
        source: &str,
        source_handle: &str,
        target: &str,
        target_handle: &str,
    ) -> String {
        format!("e{}-{}-{}-{}", source, source_handle, target, target_handle)
    }

    /// True when the node is either end of this edge.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}
