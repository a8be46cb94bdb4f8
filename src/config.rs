//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) is valid:
//!
//! ```toml
//! [layout]
//! origin_x = 100.0
//! spacing_x = 280.0
//! columns = 4
//!
//! [evaluation]
//! max_expression_length = 2048
//!
//! [runner]
//! max_steps = 500
//! ```

use crate::error::ConfigError;
use crate::workflow::Position;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Grid used to place nodes that are added without an explicit position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub origin_x: f64,
    pub origin_y: f64,
    pub spacing_x: f64,
    pub spacing_y: f64,
    pub columns: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 100.0,
            origin_y: 100.0,
            spacing_x: 280.0,
            spacing_y: 180.0,
            columns: 4,
        }
    }
}

impl LayoutConfig {
    /// Position of the `index`-th node on the grid, filled row by row.
    pub fn slot(&self, index: usize) -> Position {
        let columns = self.columns.max(1);
        Position {
            x: self.origin_x + (index % columns) as f64 * self.spacing_x,
            y: self.origin_y + (index / columns) as f64 * self.spacing_y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub max_expression_length: usize,
    pub max_depth: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_expression_length: 2048,
            max_depth: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub max_steps: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { max_steps: 500 }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }
}
