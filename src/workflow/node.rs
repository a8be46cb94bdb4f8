use crate::ast::Value;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The string-keyed map a node accumulates from upstream propagation.
pub type Inputs = AHashMap<String, Value>;

pub const DEFAULT_SOURCE_HANDLE: &str = "output";
pub const DEFAULT_TARGET_HANDLE: &str = "input";
pub const TRUE_HANDLE: &str = "true";
pub const FALSE_HANDLE: &str = "false";
pub const DEFAULT_CASE_HANDLE: &str = "default";
pub const CASE_HANDLE_PREFIX: &str = "case-";

/// The fixed set of node types the editor offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Prompt,
    Tool,
    Output,
    Trigger,
    #[serde(rename = "ifelse")]
    IfElse,
    Switch,
    ConnectDb,
    Llm,
    Http,
    FileReader,
    WebResearch,
    Youtube,
    Evaluation,
    Memory,
    ImprovementLoop,
    Feedback,
}

impl NodeKind {
    pub const ALL: [NodeKind; 16] = [
        NodeKind::Prompt,
        NodeKind::Tool,
        NodeKind::Output,
        NodeKind::Trigger,
        NodeKind::IfElse,
        NodeKind::Switch,
        NodeKind::ConnectDb,
        NodeKind::Llm,
        NodeKind::Http,
        NodeKind::FileReader,
        NodeKind::WebResearch,
        NodeKind::Youtube,
        NodeKind::Evaluation,
        NodeKind::Memory,
        NodeKind::ImprovementLoop,
        NodeKind::Feedback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Prompt => "prompt",
            NodeKind::Tool => "tool",
            NodeKind::Output => "output",
            NodeKind::Trigger => "trigger",
            NodeKind::IfElse => "ifelse",
            NodeKind::Switch => "switch",
            NodeKind::ConnectDb => "connect_db",
            NodeKind::Llm => "llm",
            NodeKind::Http => "http",
            NodeKind::FileReader => "file_reader",
            NodeKind::WebResearch => "web_research",
            NodeKind::Youtube => "youtube",
            NodeKind::Evaluation => "evaluation",
            NodeKind::Memory => "memory",
            NodeKind::ImprovementLoop => "improvement_loop",
            NodeKind::Feedback => "feedback",
        }
    }

    /// Whether the node selects one outgoing path instead of feeding all of them.
    pub fn is_branching(&self) -> bool {
        matches!(self, NodeKind::IfElse | NodeKind::Switch)
    }

    /// Whether an edge may leave this kind of node from `handle`.
    pub fn accepts_source_handle(&self, handle: &str) -> bool {
        match self {
            NodeKind::IfElse => handle == TRUE_HANDLE || handle == FALSE_HANDLE,
            NodeKind::Switch => {
                handle == DEFAULT_CASE_HANDLE
                    || handle
                        .strip_prefix(CASE_HANDLE_PREFIX)
                        .is_some_and(|label| !label.is_empty())
            }
            _ => !handle.is_empty(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Per-node state. `revision` increases every time `config`, `inputs` or
/// `outputs` change, so observers can tell stale views apart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub label: Option<String>,
    pub config: AHashMap<String, Value>,
    pub inputs: Inputs,
    pub outputs: AHashMap<String, Value>,
    pub revision: u64,
}

impl NodeData {
    /// Looks up a config entry as a string.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        match self.config.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    pub data: NodeData,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, position: Position) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            data: NodeData::default(),
        }
    }
}
