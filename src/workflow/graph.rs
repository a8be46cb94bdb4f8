use super::edge::{Edge, EdgeKind};
use super::event::GraphEvent;
use super::node::{Node, NodeKind, Position};
use crate::ast::Value;
use crate::compiler::Compiler;
use crate::config::EngineConfig;
use crate::error::GraphError;
use ahash::AHashMap;
use tracing::debug;

/// The workflow's nodes and edges, stored as an arena keyed by id.
///
/// Insertion order is kept for listing, and adjacency indexes make
/// "edges leaving node X" a lookup instead of a scan. All mutation goes
/// through `&mut self` commands that append to an event log.
///
/// The log is never trimmed by the graph itself. Hosts that keep a graph
/// alive across many edits must call [`WorkflowGraph::drain_events`]
/// regularly, or it grows with every command.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    nodes: AHashMap<String, Node>,
    node_order: Vec<String>,
    edges: AHashMap<String, Edge>,
    edge_order: Vec<String>,
    outgoing: AHashMap<String, Vec<String>>,
    incoming: AHashMap<String, Vec<String>>,
    next_node_seq: u64,
    events: Vec<GraphEvent>,
    pub(crate) config: EngineConfig,
    pub(crate) compiler: Compiler,
}

impl Default for WorkflowGraph {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            nodes: AHashMap::new(),
            node_order: Vec::new(),
            edges: AHashMap::new(),
            edge_order: Vec::new(),
            outgoing: AHashMap::new(),
            incoming: AHashMap::new(),
            next_node_seq: 0,
            events: Vec::new(),
            compiler: Compiler::new(&config.evaluation),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    // --- Nodes ---

    /// Adds a node of `kind` with a fresh `<kind>-<n>` id. Without a position
    /// the node goes into the next free slot of the layout grid.
    pub fn add_node(&mut self, kind: NodeKind, position: Option<Position>) -> String {
        let id = loop {
            self.next_node_seq += 1;
            let candidate = format!("{}-{}", kind, self.next_node_seq);
            if !self.nodes.contains_key(&candidate) {
                break candidate;
            }
        };
        let position = position.unwrap_or_else(|| self.config.layout.slot(self.nodes.len()));
        self.attach_node(Node::new(id.clone(), kind, position));
        id
    }

    /// Inserts a fully formed node, keeping its id.
    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.attach_node(node);
        Ok(())
    }

    fn attach_node(&mut self, node: Node) {
        let node_id = node.id.clone();
        debug!(node_id = %node_id, kind = %node.kind, "Node added");
        self.node_order.push(node_id.clone());
        self.nodes.insert(node_id.clone(), node);
        self.events.push(GraphEvent::NodeAdded { node_id });
    }

    /// Removes a node together with every edge that touches it. Each removed
    /// edge retracts its key from its target, exactly like `remove_edge`.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Node, GraphError> {
        if !self.nodes.contains_key(node_id) {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        }

        let mut incident: Vec<String> = self
            .outgoing
            .get(node_id)
            .into_iter()
            .chain(self.incoming.get(node_id))
            .flatten()
            .cloned()
            .collect();
        incident.sort();
        incident.dedup();

        for edge_id in &incident {
            self.remove_edge(edge_id)?;
        }

        self.outgoing.remove(node_id);
        self.incoming.remove(node_id);
        self.node_order.retain(|id| id != node_id);
        let node = self
            .nodes
            .remove(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

        debug!(node_id, edges_removed = incident.len(), "Node removed");
        self.events.push(GraphEvent::NodeRemoved {
            node_id: node_id.to_string(),
            edges_removed: incident,
        });
        Ok(node)
    }

    pub fn move_node(&mut self, node_id: &str, position: Position) -> Result<(), GraphError> {
        self.node_mut(node_id)?.position = position;
        self.events.push(GraphEvent::NodeMoved {
            node_id: node_id.to_string(),
        });
        Ok(())
    }

    /// Shallow-merges `patch` into the node's saved config (the panel's "Save").
    pub fn update_node_config<I>(&mut self, node_id: &str, patch: I) -> Result<u64, GraphError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let node = self.node_mut(node_id)?;
        node.data.config.extend(patch);
        node.data.revision += 1;
        let revision = node.data.revision;
        self.events.push(GraphEvent::ConfigChanged {
            node_id: node_id.to_string(),
            revision,
        });
        Ok(revision)
    }

    pub fn set_label(&mut self, node_id: &str, label: Option<String>) -> Result<(), GraphError> {
        let node = self.node_mut(node_id)?;
        node.data.label = label;
        node.data.revision += 1;
        let revision = node.data.revision;
        self.events.push(GraphEvent::ConfigChanged {
            node_id: node_id.to_string(),
            revision,
        });
        Ok(())
    }

    // --- Edges ---

    /// Connects two handles and immediately replays the source's accumulated
    /// outputs into the new target (one hop).
    pub fn connect(
        &mut self,
        source: &str,
        source_handle: &str,
        target: &str,
        target_handle: &str,
    ) -> Result<String, GraphError> {
        let edge = Edge {
            id: Edge::default_id(source, source_handle, target, target_handle),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: source_handle.to_string(),
            target_handle: target_handle.to_string(),
            kind: EdgeKind::Custom,
        };
        let edge_id = edge.id.clone();
        self.insert_edge(edge)?;
        self.replay_outputs(&edge_id)?;
        Ok(edge_id)
    }

    /// Inserts an edge without propagating anything.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if self.edges.contains_key(&edge.id) {
            return Err(GraphError::DuplicateEdge(edge.id));
        }
        let source_kind = self.node(&edge.source).map(|n| n.kind).ok_or_else(|| {
            GraphError::NodeNotFound(edge.source.clone())
        })?;
        if !self.nodes.contains_key(&edge.target) {
            return Err(GraphError::NodeNotFound(edge.target.clone()));
        }
        if !source_kind.accepts_source_handle(&edge.source_handle) {
            return Err(GraphError::InvalidHandle {
                node_id: edge.source.clone(),
                kind: source_kind.to_string(),
                handle: edge.source_handle.clone(),
            });
        }

        debug!(
            edge_id = %edge.id,
            source = %edge.source,
            target = %edge.target,
            "Edge added"
        );
        self.outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(edge.id.clone());
        self.incoming
            .entry(edge.target.clone())
            .or_default()
            .push(edge.id.clone());
        self.edge_order.push(edge.id.clone());
        self.events.push(GraphEvent::EdgeAdded {
            edge_id: edge.id.clone(),
        });
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    /// Removes an edge and retracts the key named by its `source_handle` from
    /// the target's inputs. There is no reference counting: the key goes even
    /// if another edge also supplied it.
    pub fn remove_edge(&mut self, edge_id: &str) -> Result<Edge, GraphError> {
        let edge = self
            .edges
            .remove(edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;

        if let Some(ids) = self.outgoing.get_mut(&edge.source) {
            ids.retain(|id| id != edge_id);
        }
        if let Some(ids) = self.incoming.get_mut(&edge.target) {
            ids.retain(|id| id != edge_id);
        }
        self.edge_order.retain(|id| id != edge_id);
        self.events.push(GraphEvent::EdgeRemoved {
            edge_id: edge_id.to_string(),
        });

        self.retract(&edge);
        Ok(edge)
    }

    // --- Lookups ---

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub(crate) fn node_mut(&mut self, node_id: &str) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))
    }

    pub fn edge(&self, edge_id: &str) -> Option<&Edge> {
        self.edges.get(edge_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edge_order.iter().filter_map(|id| self.edges.get(id))
    }

    /// Edges whose source is `node_id`.
    pub fn outgoing(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
    }

    /// Edges whose target is `node_id`.
    pub fn incoming(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.incoming
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // --- Events ---

    /// Events recorded since the last [`WorkflowGraph::drain_events`].
    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Returns the recorded events and clears the log.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn record(&mut self, event: GraphEvent) {
        self.events.push(event);
    }
}
