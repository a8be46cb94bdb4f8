use super::graph::WorkflowGraph;
use super::node::{
    CASE_HANDLE_PREFIX, DEFAULT_CASE_HANDLE, FALSE_HANDLE, Node, NodeKind, TRUE_HANDLE,
};
use super::propagation::Delivery;
use crate::ast::Value;
use crate::error::GraphError;
use crate::generate::{CasesRequest, ConditionRequest, ExpressionGenerator};
use crate::interpreter;
use itertools::Itertools;
use tracing::debug;

/// Config key holding an If/Else node's condition text.
pub const CONDITION_KEY: &str = "condition";
/// Config key holding a Switch node's routing expression.
pub const EXPRESSION_KEY: &str = "expression";
/// Config key holding a Switch node's case labels.
pub const CASES_KEY: &str = "cases";
/// Config key enabling a Switch node's `default` handle.
pub const DEFAULT_KEY: &str = "default";
/// Config key with the free-text description passed to generators.
pub const PROMPT_KEY: &str = "prompt";

/// Which outgoing handle a branch node selected, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchDecision {
    pub node_id: String,
    /// `None` when a Switch matched nothing and has no default handle.
    pub handle: Option<String>,
    pub reason: String,
    /// Set when the condition failed to parse or evaluate.
    pub error: Option<String>,
}

/// The decision plus the deliveries made along the selected handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFiring {
    pub decision: BranchDecision,
    pub deliveries: Vec<Delivery>,
}

impl WorkflowGraph {
    /// Evaluates a branch node against its current inputs without changing anything.
    pub fn evaluate_branch(&self, node_id: &str) -> Result<BranchDecision, GraphError> {
        let node = self
            .node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        let decision = match node.kind {
            NodeKind::IfElse => self.decide_if_else(node),
            NodeKind::Switch => self.decide_switch(node),
            kind => {
                return Err(GraphError::NotBranching {
                    node_id: node_id.to_string(),
                    kind: kind.to_string(),
                });
            }
        };
        debug!(
            node_id,
            handle = ?decision.handle,
            reason = %decision.reason,
            "Branch evaluated"
        );
        Ok(decision)
    }

    /// Evaluates a branch node, then forwards its inputs along the selected handle.
    pub fn fire_branch(&mut self, node_id: &str) -> Result<BranchFiring, GraphError> {
        let decision = self.evaluate_branch(node_id)?;
        let deliveries = match &decision.handle {
            Some(handle) => {
                let payload = self
                    .node(node_id)
                    .map(|n| n.data.inputs.clone())
                    .unwrap_or_default();
                self.send_data_from_handle(node_id, handle, payload)?
            }
            None => Vec::new(),
        };
        Ok(BranchFiring {
            decision,
            deliveries,
        })
    }

    fn decide_if_else(&self, node: &Node) -> BranchDecision {
        let condition = node
            .data
            .config_str(CONDITION_KEY)
            .filter(|c| !c.trim().is_empty());
        let Some(condition) = condition else {
            return BranchDecision {
                node_id: node.id.clone(),
                handle: Some(FALSE_HANDLE.to_string()),
                reason: "no condition set".to_string(),
                error: None,
            };
        };

        let outcome = interpreter::evaluate_source(&self.compiler, condition, &node.data.inputs);
        let handle = if outcome.matched {
            TRUE_HANDLE
        } else {
            FALSE_HANDLE
        };
        BranchDecision {
            node_id: node.id.clone(),
            handle: Some(handle.to_string()),
            reason: outcome.reason,
            error: outcome.error,
        }
    }

    fn decide_switch(&self, node: &Node) -> BranchDecision {
        let cases = switch_cases(node);
        let has_default = matches!(node.data.config.get(DEFAULT_KEY), Some(Value::Bool(true)));
        let fallback = |reason: String, error: Option<String>| BranchDecision {
            node_id: node.id.clone(),
            handle: has_default.then(|| DEFAULT_CASE_HANDLE.to_string()),
            reason,
            error,
        };

        let Some(source) = node
            .data
            .config_str(EXPRESSION_KEY)
            .filter(|e| !e.trim().is_empty())
        else {
            return fallback("no expression set".to_string(), None);
        };

        let condition = match self.compiler.compile(source) {
            Ok(condition) => condition,
            Err(e) => return fallback(format!("expression failed: {}", e), Some(e.to_string())),
        };
        let evaluation = match interpreter::evaluate(&condition.expression, &node.data.inputs) {
            Ok(evaluation) => evaluation,
            Err(e) => return fallback(format!("expression failed: {}", e), Some(e.to_string())),
        };

        let label = evaluation.value.to_label();
        if cases.iter().any(|case| *case == label) {
            BranchDecision {
                node_id: node.id.clone(),
                handle: Some(format!("{}{}", CASE_HANDLE_PREFIX, label)),
                reason: format!("{} matched case '{}'", evaluation.reason(), label),
                error: None,
            }
        } else {
            fallback(
                format!(
                    "{} matched none of [{}]",
                    evaluation.reason(),
                    cases.iter().join(", ")
                ),
                None,
            )
        }
    }

    /// Stores condition text after checking that it parses. If/Else nodes keep
    /// it as their condition, Switch nodes as their routing expression.
    pub fn set_condition(&mut self, node_id: &str, source: &str) -> Result<u64, GraphError> {
        let kind = self
            .node(node_id)
            .map(|n| n.kind)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        let key = match kind {
            NodeKind::IfElse => CONDITION_KEY,
            NodeKind::Switch => EXPRESSION_KEY,
            kind => {
                return Err(GraphError::NotBranching {
                    node_id: node_id.to_string(),
                    kind: kind.to_string(),
                });
            }
        };
        self.compiler
            .compile(source)
            .map_err(|source| GraphError::InvalidCondition {
                node_id: node_id.to_string(),
                source,
            })?;
        self.update_node_config(node_id, [(key.to_string(), Value::from(source))])
    }

    /// Replaces a Switch node's case labels and toggles its default handle.
    pub fn set_switch_cases(
        &mut self,
        node_id: &str,
        cases: Vec<String>,
        default: bool,
    ) -> Result<u64, GraphError> {
        self.expect_kind(node_id, NodeKind::Switch)?;
        let cases = Value::List(cases.into_iter().map(Value::String).collect());
        self.update_node_config(
            node_id,
            [
                (CASES_KEY.to_string(), cases),
                (DEFAULT_KEY.to_string(), Value::Bool(default)),
            ],
        )
    }

    /// Asks `generator` for condition text and stores it once it parses.
    pub fn generate_condition(
        &mut self,
        node_id: &str,
        generator: &dyn ExpressionGenerator,
    ) -> Result<String, GraphError> {
        let node = self
            .node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        let request = ConditionRequest {
            node_id: node_id.to_string(),
            prompt: node.data.config_str(PROMPT_KEY).map(str::to_string),
            input_keys: node.data.inputs.keys().cloned().sorted().collect(),
        };
        let source = generator
            .condition(&request)
            .map_err(|source| GraphError::Generation {
                node_id: node_id.to_string(),
                source,
            })?;
        self.set_condition(node_id, &source)?;
        Ok(source)
    }

    /// Asks `generator` for case labels and stores them on a Switch node.
    pub fn generate_cases(
        &mut self,
        node_id: &str,
        generator: &dyn ExpressionGenerator,
    ) -> Result<Vec<String>, GraphError> {
        let node = self.expect_kind(node_id, NodeKind::Switch)?;
        let request = CasesRequest {
            node_id: node_id.to_string(),
            prompt: node.data.config_str(PROMPT_KEY).map(str::to_string),
            input_keys: node.data.inputs.keys().cloned().sorted().collect(),
        };
        let has_default = matches!(node.data.config.get(DEFAULT_KEY), Some(Value::Bool(true)));
        let cases = generator
            .cases(&request)
            .map_err(|source| GraphError::Generation {
                node_id: node_id.to_string(),
                source,
            })?;
        self.set_switch_cases(node_id, cases.clone(), has_default)?;
        Ok(cases)
    }

    fn expect_kind(&self, node_id: &str, expected: NodeKind) -> Result<&Node, GraphError> {
        let node = self
            .node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        if node.kind != expected {
            return Err(GraphError::WrongKind {
                node_id: node_id.to_string(),
                expected: expected.to_string(),
                found: node.kind.to_string(),
            });
        }
        Ok(node)
    }
}

/// A Switch node's case labels. Non-string entries are matched by their display form.
pub fn switch_cases(node: &Node) -> Vec<String> {
    match node.data.config.get(CASES_KEY) {
        Some(Value::List(items)) => items.iter().map(Value::to_label).collect(),
        _ => Vec::new(),
    }
}
