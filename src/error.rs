use crate::ast::Value;
use thiserror::Error;

/// Errors raised by graph editing and propagation commands.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node '{0}' not found in the workflow")]
    NodeNotFound(String),

    #[error("Edge '{0}' not found in the workflow")]
    EdgeNotFound(String),

    #[error("A node with id '{0}' already exists")]
    DuplicateNode(String),

    #[error("An edge with id '{0}' already exists")]
    DuplicateEdge(String),

    #[error("Node '{node_id}' of kind '{kind}' has no source handle named '{handle}'")]
    InvalidHandle {
        node_id: String,
        kind: String,
        handle: String,
    },

    #[error("Node '{node_id}' of kind '{kind}' does not branch")]
    NotBranching { node_id: String, kind: String },

    #[error("Node '{node_id}' is a '{found}' node, but this operation needs a '{expected}' node")]
    WrongKind {
        node_id: String,
        expected: String,
        found: String,
    },

    #[error("Invalid condition on node '{node_id}': {source}")]
    InvalidCondition {
        node_id: String,
        #[source]
        source: ParseError,
    },

    #[error("Generating for node '{node_id}' failed: {source}")]
    Generation {
        node_id: String,
        #[source]
        source: GenerateError,
    },
}

/// Errors that can occur while turning condition text into an AST.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Condition is empty")]
    Empty,

    #[error("Condition is {length} characters long, the limit is {limit}")]
    TooLong { length: usize, limit: usize },

    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("Unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Invalid number '{text}' at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("Expected {expected} at position {position}, but found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("Unknown function or method '{name}' at position {position}")]
    UnknownFunction { name: String, position: usize },

    #[error("'{name}' takes {expected} argument(s), but received {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Expression nests deeper than the limit of {0}")]
    TooDeep(usize),
}

/// Errors that can occur during the AST evaluation phase.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Value,
    },

    #[error("Input '{0}' not found in the node's inputs")]
    InputNotFound(String),

    #[error("Division by zero in operation '{0}'")]
    DivisionByZero(String),
}

/// Errors that can occur when converting an editor document into a `WorkflowGraph`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Failed to parse workflow JSON: {0}")]
    JsonParseError(String),

    #[error("Node '{node_id}' has an unknown node type: '{type_name}'")]
    UnknownNodeType { node_id: String, type_name: String },

    #[error("Invalid workflow document: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors from saving or loading binary workflow snapshots.
#[derive(Error, Debug, Clone)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed for '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Snapshot encoding failed: {0}")]
    Encode(String),

    #[error("Snapshot decoding failed: {0}")]
    Decode(String),
}

/// Errors from loading an `EngineConfig`.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Errors reported by an `ExpressionGenerator`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("Generator is unavailable: {0}")]
    Unavailable(String),

    #[error("Generator returned no usable output")]
    EmptyResponse,
}
