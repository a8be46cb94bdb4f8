use crate::ast::{EvaluationTrace, Expression, Value};
use crate::compiler::{Compiler, Condition};
use crate::error::EvaluationError;
use crate::trace::TraceFormatter;
use ahash::AHashMap;
use tracing::debug;

mod engine;

use engine::AstEngine;

/// The value an expression produced, with the trace that explains it.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub value: Value,
    pub trace: EvaluationTrace,
}

impl Evaluation {
    pub fn is_truthy(&self) -> bool {
        self.value.is_truthy()
    }

    /// A human-readable explanation of the logic that led to the value.
    pub fn reason(&self) -> String {
        TraceFormatter::format_trace(&self.trace)
    }
}

/// Outcome of the lenient condition path used by branch nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionOutcome {
    pub matched: bool,
    pub reason: String,
    /// Set when the condition could not be parsed or evaluated.
    pub error: Option<String>,
}

impl ConditionOutcome {
    fn failed(error: String) -> Self {
        Self {
            matched: false,
            reason: format!("condition failed: {}", error),
            error: Some(error),
        }
    }
}

/// Evaluates an expression against a node's inputs map.
///
/// Returns `Err` for type mismatches, reads through a missing value, and
/// division by zero. Use [`evaluate_condition`] where failures should simply
/// count as `false`.
pub fn evaluate(
    expression: &Expression,
    inputs: &AHashMap<String, Value>,
) -> Result<Evaluation, EvaluationError> {
    let trace = AstEngine::new(expression, inputs).evaluate()?;
    Ok(Evaluation {
        value: trace.get_outcome(),
        trace,
    })
}

/// Tests a compiled condition for truthiness. Evaluation errors yield `false`.
pub fn evaluate_condition(
    condition: &Condition,
    inputs: &AHashMap<String, Value>,
) -> ConditionOutcome {
    match evaluate(&condition.expression, inputs) {
        Ok(evaluation) => ConditionOutcome {
            matched: evaluation.is_truthy(),
            reason: evaluation.reason(),
            error: None,
        },
        Err(e) => {
            debug!(condition = %condition.source, error = %e, "Condition evaluation failed");
            ConditionOutcome::failed(e.to_string())
        }
    }
}

/// Parses and tests condition text in one go. Parse errors yield `false` too.
pub fn evaluate_source(
    compiler: &Compiler,
    source: &str,
    inputs: &AHashMap<String, Value>,
) -> ConditionOutcome {
    match compiler.compile(source) {
        Ok(condition) => evaluate_condition(&condition, inputs),
        Err(e) => {
            debug!(condition = %source, error = %e, "Condition failed to parse");
            ConditionOutcome::failed(e.to_string())
        }
    }
}
