//! The seam for "generate a condition for me" requests.
//!
//! Branch nodes can ask an external model to write their condition or case
//! list. This crate does not call any model itself: hosts plug one in by
//! implementing [`ExpressionGenerator`]. [`CannedGenerator`] answers with fixed
//! text and is what the CLI and tests use.

use crate::error::GenerateError;

/// What a condition generator gets to work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRequest {
    pub node_id: String,
    /// Free-text description of the desired behaviour, if the user typed one.
    pub prompt: Option<String>,
    /// Keys currently present in the node's inputs, sorted.
    pub input_keys: Vec<String>,
}

/// What a switch case generator gets to work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasesRequest {
    pub node_id: String,
    pub prompt: Option<String>,
    pub input_keys: Vec<String>,
}

pub trait ExpressionGenerator {
    /// Returns condition text for an If/Else node.
    fn condition(&self, request: &ConditionRequest) -> Result<String, GenerateError>;

    /// Returns case labels for a Switch node.
    fn cases(&self, request: &CasesRequest) -> Result<Vec<String>, GenerateError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedGenerator {
    pub condition: String,
    pub cases: Vec<String>,
}

impl Default for CannedGenerator {
    fn default() -> Self {
        Self {
            condition: "input.value > 10".to_string(),
            cases: vec!["admin".to_string(), "user".to_string(), "guest".to_string()],
        }
    }
}

impl ExpressionGenerator for CannedGenerator {
    fn condition(&self, _request: &ConditionRequest) -> Result<String, GenerateError> {
        if self.condition.trim().is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(self.condition.clone())
    }

    fn cases(&self, _request: &CasesRequest) -> Result<Vec<String>, GenerateError> {
        if self.cases.is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(self.cases.clone())
    }
}
