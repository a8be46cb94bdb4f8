use super::editor::{EditorDocument, EditorEdge, EditorNode, EditorPosition};
use super::snapshot::WorkflowSnapshot;
use crate::ast::Value;
use crate::config::EngineConfig;
use crate::error::ConversionError;
use crate::workflow::{
    DEFAULT_SOURCE_HANDLE, DEFAULT_TARGET_HANDLE, Edge, EdgeKind, Node, NodeData, NodeKind,
    Position, WorkflowGraph,
};
use ahash::{AHashMap, AHashSet};

/// `data` keys that map onto node fields instead of the free-form config.
const LABEL_KEY: &str = "label";
const INPUTS_KEY: &str = "inputs";
const OUTPUTS_KEY: &str = "outputs";
const REVISION_KEY: &str = "revision";
/// The editor's random re-render counter. Meaningless here, so it is dropped.
const LEGACY_VERSION_KEY: &str = "_version";

/// A trait for saved workflow formats that can be turned into a `WorkflowSnapshot`.
///
/// This is the extension point for loading workflows from formats other than
/// the bundled editor JSON. Implement it on your own document type and feed
/// the result to `WorkflowGraph::from_snapshot`.
///
/// # Example
///
/// ```rust,no_run
/// use nagare::prelude::*;
///
/// struct Outline {
///     steps: Vec<String>,
/// }
///
/// impl IntoWorkflow for Outline {
///     fn into_workflow(self) -> std::result::Result<WorkflowSnapshot, ConversionError> {
///         let nodes = self
///             .steps
///             .iter()
///             .enumerate()
///             .map(|(i, _)| Node::new(format!("prompt-{}", i), NodeKind::Prompt, Position::default()))
///             .collect();
///         Ok(WorkflowSnapshot { nodes, edges: vec![] })
///     }
/// }
/// ```
pub trait IntoWorkflow {
    /// Consumes the object and converts it into the canonical snapshot.
    fn into_workflow(self) -> Result<WorkflowSnapshot, ConversionError>;
}

impl IntoWorkflow for EditorDocument {
    fn into_workflow(self) -> Result<WorkflowSnapshot, ConversionError> {
        let mut ids = AHashSet::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for raw_node in self.nodes {
            if !ids.insert(raw_node.id.clone()) {
                return Err(ConversionError::ValidationError(format!(
                    "node id '{}' appears more than once",
                    raw_node.id
                )));
            }
            nodes.push(convert_node(raw_node)?);
        }

        let edges = self
            .edges
            .into_iter()
            .map(|raw_edge| {
                for endpoint in [&raw_edge.source, &raw_edge.target] {
                    if !ids.contains(endpoint) {
                        return Err(ConversionError::ValidationError(format!(
                            "edge references unknown node '{}'",
                            endpoint
                        )));
                    }
                }
                Ok(convert_edge(raw_edge))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WorkflowSnapshot { nodes, edges })
    }
}

fn convert_node(raw_node: EditorNode) -> Result<Node, ConversionError> {
    let kind: NodeKind =
        raw_node
            .node_type
            .parse()
            .map_err(|type_name| ConversionError::UnknownNodeType {
                node_id: raw_node.id.clone(),
                type_name,
            })?;

    let mut data = NodeData::default();
    for (key, value) in raw_node.data {
        match key.as_str() {
            LABEL_KEY => data.label = value.as_str().map(str::to_string),
            INPUTS_KEY => data.inputs = object_entries(&raw_node.id, &key, value)?,
            OUTPUTS_KEY => data.outputs = object_entries(&raw_node.id, &key, value)?,
            REVISION_KEY => data.revision = value.as_u64().unwrap_or(0),
            LEGACY_VERSION_KEY => {}
            _ => {
                data.config.insert(key, Value::from(value));
            }
        }
    }

    let position = raw_node
        .position
        .map(|p| Position::new(p.x, p.y))
        .unwrap_or_default();

    Ok(Node {
        id: raw_node.id,
        kind,
        position,
        data,
    })
}

fn object_entries(
    node_id: &str,
    key: &str,
    value: serde_json::Value,
) -> Result<AHashMap<String, Value>, ConversionError> {
    match value {
        serde_json::Value::Object(map) => {
            Ok(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
        }
        serde_json::Value::Null => Ok(AHashMap::new()),
        other => Err(ConversionError::ValidationError(format!(
            "node '{}' has a non-object '{}': {}",
            node_id, key, other
        ))),
    }
}

fn convert_edge(raw_edge: EditorEdge) -> Edge {
    let source_handle = raw_edge
        .source_handle
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE_HANDLE.to_string());
    let target_handle = raw_edge
        .target_handle
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| DEFAULT_TARGET_HANDLE.to_string());
    let id = raw_edge.id.unwrap_or_else(|| {
        Edge::default_id(
            &raw_edge.source,
            &source_handle,
            &raw_edge.target,
            &target_handle,
        )
    });
    Edge {
        id,
        source: raw_edge.source,
        target: raw_edge.target,
        source_handle,
        target_handle,
        kind: EdgeKind::Custom,
    }
}

impl From<&WorkflowSnapshot> for EditorDocument {
    fn from(snapshot: &WorkflowSnapshot) -> Self {
        let nodes = snapshot
            .nodes
            .iter()
            .map(|node| {
                let mut data: serde_json::Map<String, serde_json::Value> = node
                    .data
                    .config
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone().into()))
                    .collect();
                if let Some(label) = &node.data.label {
                    data.insert(LABEL_KEY.to_string(), label.clone().into());
                }
                data.insert(INPUTS_KEY.to_string(), to_json_object(&node.data.inputs));
                data.insert(OUTPUTS_KEY.to_string(), to_json_object(&node.data.outputs));
                data.insert(REVISION_KEY.to_string(), node.data.revision.into());
                EditorNode {
                    id: node.id.clone(),
                    node_type: node.kind.to_string(),
                    position: Some(EditorPosition {
                        x: node.position.x,
                        y: node.position.y,
                    }),
                    data,
                }
            })
            .collect();

        let edges = snapshot
            .edges
            .iter()
            .map(|edge| EditorEdge {
                id: Some(edge.id.clone()),
                source: edge.source.clone(),
                target: edge.target.clone(),
                source_handle: Some(edge.source_handle.clone()),
                target_handle: Some(edge.target_handle.clone()),
                edge_type: Some("custom".to_string()),
            })
            .collect();

        EditorDocument { nodes, edges }
    }
}

fn to_json_object(map: &AHashMap<String, Value>) -> serde_json::Value {
    serde_json::Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), v.clone().into()))
            .collect(),
    )
}

impl WorkflowGraph {
    /// Parses an editor JSON document and builds a graph from it.
    pub fn from_editor_json(json: &str, config: EngineConfig) -> Result<Self, ConversionError> {
        let snapshot = EditorDocument::from_json(json)?.into_workflow()?;
        Ok(WorkflowGraph::from_snapshot(snapshot, config)?)
    }

    /// Exports the graph in the editor's JSON shape.
    pub fn to_editor_document(&self) -> EditorDocument {
        EditorDocument::from(&self.snapshot())
    }
}
