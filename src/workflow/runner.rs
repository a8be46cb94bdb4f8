use super::branch::BranchDecision;
use super::graph::WorkflowGraph;
use super::node::NodeKind;
use crate::error::GraphError;
use ahash::AHashSet;
use std::collections::VecDeque;
use tracing::{info, warn};

/// One node visited during a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStep {
    pub node_id: String,
    pub kind: NodeKind,
    /// Present for If/Else and Switch nodes.
    pub decision: Option<BranchDecision>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    pub steps: Vec<RunStep>,
    /// Nodes the walk never reached, in insertion order.
    pub unreached: Vec<String>,
    /// True when `max_steps` stopped the walk before the queue ran dry.
    pub truncated: bool,
}

impl RunReport {
    pub fn visited(&self, node_id: &str) -> bool {
        self.steps.iter().any(|s| s.node_id == node_id)
    }
}

/// Walks a workflow from its entry points, following only the path each
/// branch node selects for its current inputs. Nothing is mutated and no
/// node side effects run.
pub struct Runner<'a> {
    graph: &'a WorkflowGraph,
    max_steps: usize,
}

impl<'a> Runner<'a> {
    pub fn new(graph: &'a WorkflowGraph) -> Self {
        Self {
            graph,
            max_steps: graph.config().runner.max_steps,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Trigger nodes, or every node without incoming edges when there are none.
    pub fn entry_points(&self) -> Vec<String> {
        let triggers: Vec<String> = self
            .graph
            .nodes()
            .filter(|n| n.kind == NodeKind::Trigger)
            .map(|n| n.id.clone())
            .collect();
        if !triggers.is_empty() {
            return triggers;
        }
        self.graph
            .nodes()
            .filter(|n| self.graph.incoming(&n.id).next().is_none())
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn run(&self) -> Result<RunReport, GraphError> {
        let mut report = RunReport::default();
        let mut seen: AHashSet<String> = AHashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for entry in self.entry_points() {
            if seen.insert(entry.clone()) {
                queue.push_back(entry);
            }
        }

        while let Some(node_id) = queue.pop_front() {
            if report.steps.len() >= self.max_steps {
                warn!(max_steps = self.max_steps, "Run stopped at the step limit");
                report.truncated = true;
                break;
            }

            let node = self
                .graph
                .node(&node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
            let decision = if node.kind.is_branching() {
                Some(self.graph.evaluate_branch(&node_id)?)
            } else {
                None
            };

            let selected = decision.as_ref().map(|d| d.handle.as_deref());
            for edge in self.graph.outgoing(&node_id) {
                let follow = match selected {
                    None => true,
                    Some(handle) => handle == Some(edge.source_handle.as_str()),
                };
                if follow && seen.insert(edge.target.clone()) {
                    queue.push_back(edge.target.clone());
                }
            }

            report.steps.push(RunStep {
                node_id,
                kind: node.kind,
                decision,
            });
        }

        let unreached = self
            .graph
            .nodes()
            .filter(|n| !report.visited(&n.id))
            .map(|n| n.id.clone())
            .collect();
        report.unreached = unreached;

        info!(
            visited = report.steps.len(),
            unreached = report.unreached.len(),
            truncated = report.truncated,
            "Dry run finished"
        );
        Ok(report)
    }
}
