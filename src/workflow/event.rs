/// A change to the graph, recorded in order so a UI can re-render exactly
/// what changed instead of polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    NodeAdded {
        node_id: String,
    },
    NodeRemoved {
        node_id: String,
        /// Incident edges removed along with the node.
        edges_removed: Vec<String>,
    },
    NodeMoved {
        node_id: String,
    },
    ConfigChanged {
        node_id: String,
        revision: u64,
    },
    InputsChanged {
        node_id: String,
        revision: u64,
    },
    OutputsChanged {
        node_id: String,
        revision: u64,
    },
    EdgeAdded {
        edge_id: String,
    },
    EdgeRemoved {
        edge_id: String,
    },
}
