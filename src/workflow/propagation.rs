use super::edge::Edge;
use super::event::GraphEvent;
use super::graph::WorkflowGraph;
use crate::ast::Value;
use crate::error::GraphError;
use ahash::AHashMap;
use itertools::Itertools;
use tracing::debug;

/// A partial data object a node sends downstream.
pub type Payload = AHashMap<String, Value>;

/// One payload merged into one target's inputs along one edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub edge_id: String,
    pub source: String,
    pub target: String,
    /// Keys written into the target's inputs, sorted.
    pub keys: Vec<String>,
    /// The target's revision after the merge.
    pub revision: u64,
}

/// Builds a payload from a JSON object. Anything else is not a payload.
pub fn payload_from_json(value: serde_json::Value) -> Option<Payload> {
    match value {
        serde_json::Value::Object(map) => {
            Some(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
        }
        _ => None,
    }
}

impl WorkflowGraph {
    /// Records `payload` as the node's output and shallow-merges it into the
    /// inputs of every direct successor. Propagation is one hop only.
    pub fn send_data(
        &mut self,
        node_id: &str,
        payload: Payload,
    ) -> Result<Vec<Delivery>, GraphError> {
        self.send(node_id, None, payload)
    }

    /// Like `send_data`, restricted to edges leaving from `handle`.
    pub fn send_data_from_handle(
        &mut self,
        node_id: &str,
        handle: &str,
        payload: Payload,
    ) -> Result<Vec<Delivery>, GraphError> {
        self.send(node_id, Some(handle), payload)
    }

    fn send(
        &mut self,
        node_id: &str,
        handle: Option<&str>,
        payload: Payload,
    ) -> Result<Vec<Delivery>, GraphError> {
        if payload.is_empty() {
            // Still an error to send from a node that does not exist.
            self.node_mut(node_id)?;
            return Ok(Vec::new());
        }

        let node = self.node_mut(node_id)?;
        node.data
            .outputs
            .extend(payload.iter().map(|(k, v)| (k.clone(), v.clone())));
        node.data.revision += 1;
        let revision = node.data.revision;
        self.record(GraphEvent::OutputsChanged {
            node_id: node_id.to_string(),
            revision,
        });

        // Plan first, then apply, so the adjacency borrow ends before mutation.
        let planned: Vec<(String, String)> = self
            .outgoing(node_id)
            .filter(|edge| handle.is_none_or(|h| edge.source_handle == h))
            .map(|edge| (edge.id.clone(), edge.target.clone()))
            .collect();

        let mut deliveries = Vec::with_capacity(planned.len());
        for (edge_id, target) in planned {
            deliveries.push(self.deliver(&edge_id, node_id, &target, &payload)?);
        }
        Ok(deliveries)
    }

    /// Replays the source's accumulated outputs along a single edge.
    pub(crate) fn replay_outputs(&mut self, edge_id: &str) -> Result<Option<Delivery>, GraphError> {
        let edge = self
            .edge(edge_id)
            .cloned()
            .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;
        let outputs = match self.node(&edge.source) {
            Some(node) if !node.data.outputs.is_empty() => node.data.outputs.clone(),
            Some(_) => return Ok(None),
            None => return Err(GraphError::NodeNotFound(edge.source.clone())),
        };
        self.deliver(&edge.id, &edge.source, &edge.target, &outputs)
            .map(Some)
    }

    fn deliver(
        &mut self,
        edge_id: &str,
        source: &str,
        target: &str,
        payload: &Payload,
    ) -> Result<Delivery, GraphError> {
        let node = self.node_mut(target)?;
        node.data
            .inputs
            .extend(payload.iter().map(|(k, v)| (k.clone(), v.clone())));
        node.data.revision += 1;
        let revision = node.data.revision;

        let keys: Vec<String> = payload.keys().cloned().sorted().collect();
        debug!(edge_id, source, target, keys = ?keys, "Payload delivered");
        self.record(GraphEvent::InputsChanged {
            node_id: target.to_string(),
            revision,
        });

        Ok(Delivery {
            edge_id: edge_id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            keys,
            revision,
        })
    }

    /// Deletes `edge.source_handle` from the target's inputs, if both exist.
    pub(crate) fn retract(&mut self, edge: &Edge) {
        let Ok(node) = self.node_mut(&edge.target) else {
            return;
        };
        if node.data.inputs.remove(&edge.source_handle).is_none() {
            return;
        }
        node.data.revision += 1;
        let revision = node.data.revision;
        debug!(
            edge_id = %edge.id,
            target = %edge.target,
            key = %edge.source_handle,
            "Input retracted"
        );
        self.record(GraphEvent::InputsChanged {
            node_id: edge.target.clone(),
            revision,
        });
    }
}
