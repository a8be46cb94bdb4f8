//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the nagare crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use nagare::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/workflow.json")?;
//! let graph = WorkflowGraph::from_editor_json(&json, EngineConfig::default())?;
//!
//! let report = Runner::new(&graph).run()?;
//! for step in &report.steps {
//!     println!("{} ({})", step.node_id, step.kind);
//! }
//! # Ok(())
//! # }
//! ```

// Graph, propagation and branching
pub use crate::workflow::{
    BranchDecision, BranchFiring, DEFAULT_CASE_HANDLE, DEFAULT_SOURCE_HANDLE,
    DEFAULT_TARGET_HANDLE, Delivery, Edge, FALSE_HANDLE, GraphEvent, Node, NodeKind, Payload,
    Position, RunReport, RunStep, Runner, TRUE_HANDLE, WorkflowGraph,
};

// Expressions
pub use crate::ast::{EvaluationTrace, Expression, Value};
pub use crate::compiler::{Compiler, Condition};
pub use crate::interpreter::{ConditionOutcome, Evaluation, evaluate, evaluate_condition};

// Documents and configuration
pub use crate::config::EngineConfig;
pub use crate::document::{EditorDocument, IntoWorkflow, WorkflowSnapshot};
pub use crate::generate::{CannedGenerator, ExpressionGenerator};

// Error types
pub use crate::error::{
    ConversionError, EvaluationError, GraphError, ParseError, SnapshotError,
};

// Trace formatting
pub use crate::trace::TraceFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
