//! Turns condition text into a checked `Expression` tree.
//!
//! The language is a small, side-effect free subset of JavaScript expression
//! syntax, so conditions written for the editor (`input.value > 10`,
//! `input.role === "admin" && input.tags.includes("beta")`) parse as-is.

use crate::ast::Expression;
use crate::config::EvaluationConfig;
use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

mod lexer;
mod parser;

use parser::Parser;

/// A parsed condition together with the text it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub source: String,
    pub expression: Expression,
}

impl Condition {
    /// Top-level inputs keys the condition reads.
    pub fn required_inputs(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        self.expression.required_inputs(&mut keys);
        keys
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

#[derive(Debug, Clone)]
pub struct Compiler {
    max_length: usize,
    max_depth: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(&EvaluationConfig::default())
    }
}

impl Compiler {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            max_length: config.max_expression_length,
            max_depth: config.max_depth,
        }
    }

    pub fn compile(&self, source: &str) -> Result<Condition, ParseError> {
        if source.len() > self.max_length {
            return Err(ParseError::TooLong {
                length: source.len(),
                limit: self.max_length,
            });
        }
        let tokens = lexer::tokenize(source)?;
        let expression = Parser::new(tokens, self.max_depth).parse()?;
        Ok(Condition {
            source: source.to_string(),
            expression,
        })
    }
}

/// Compiles with the default limits.
pub fn compile(source: &str) -> Result<Condition, ParseError> {
    Compiler::default().compile(source)
}
