//! # Nagare - Workflow Graph and Condition Engine
//!
//! **Nagare** models node-based AI agent workflows: nodes connected by edges
//! through named handles, data that flows one hop along those edges into each
//! target's inputs map, and branch nodes (If/Else, Switch) that pick an
//! outgoing path by evaluating a condition against what they have received.
//!
//! ## Core Workflow
//!
//! 1.  **Build or Load a Graph**: Create a `WorkflowGraph` and add nodes and
//!     edges, or load a saved editor document with `WorkflowGraph::from_editor_json`.
//!     Other formats plug in by implementing the `IntoWorkflow` trait.
//! 2.  **Send Data**: `send_data` records a node's output and merges it into the
//!     inputs of its direct successors. Deleting an edge retracts the key it fed.
//! 3.  **Branch**: If/Else and Switch nodes hold condition text in a small,
//!     sandboxed expression language. `evaluate_branch` reports the selected
//!     handle with a human-readable reason; `fire_branch` forwards along it.
//! 4.  **Dry Run**: `Runner` walks the graph from its entry points, following
//!     only the paths the branch nodes currently select.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nagare::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut graph = WorkflowGraph::new();
//!     let trigger = graph.add_node(NodeKind::Trigger, None);
//!     let check = graph.add_node(NodeKind::IfElse, None);
//!     let report = graph.add_node(NodeKind::Output, None);
//!
//!     graph.connect(&trigger, DEFAULT_SOURCE_HANDLE, &check, DEFAULT_TARGET_HANDLE)?;
//!     graph.connect(&check, TRUE_HANDLE, &report, DEFAULT_TARGET_HANDLE)?;
//!     graph.set_condition(&check, "input.value > 10")?;
//!
//!     let mut payload = Payload::new();
//!     payload.insert("value".to_string(), Value::from(11.0));
//!     graph.send_data(&trigger, payload)?;
//!
//!     let decision = graph.evaluate_branch(&check)?;
//!     println!("-> Selected: {:?}", decision.handle);
//!     println!("-> Reason: {}", decision.reason);
//!
//!     let run = Runner::new(&graph).run()?;
//!     println!("Visited {} nodes", run.steps.len());
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod generate;
pub mod interpreter;
pub mod prelude;
pub mod trace;
pub mod workflow;
