//! Compiler configuration
//!
//! Every field has a default, so an empty (or absent) TOML file is valid:
//!
//! ```toml
//! shadowing = "function"     # or "block"
//! entry_point = "main"
//! trace_actions = false
//!
//! [codegen]
//! strategy = "actions"       # or "patterns", "none"
//! sort_by_name = true
//! entry_label = "_PRINCIPAL"
//! annotate_types = false
//! ```

use crate::errors::ConfigError;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::Path;

/// Which redeclarations the analyzer rejects besides duplicates in one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShadowingPolicy {
    /// A name may not be redeclared anywhere inside the same function
    #[default]
    Function,
    /// Only duplicates within one block are rejected
    Block,
}

/// How `.text` is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CodegenStrategy {
    /// Semantic actions lower every construct at global scope
    #[default]
    Actions,
    /// Recognize simple assignment statements in the token stream
    Patterns,
    /// Emit only the entry label and the final halt
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub strategy: CodegenStrategy,
    pub sort_by_name: bool,
    pub entry_label: String,
    pub annotate_types: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        CodegenConfig {
            strategy: CodegenStrategy::default(),
            sort_by_name: true,
            entry_label: "_PRINCIPAL".to_string(),
            annotate_types: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub shadowing: ShadowingPolicy,
    pub entry_point: String,
    pub trace_actions: bool,
    pub codegen: CodegenConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            shadowing: ShadowingPolicy::default(),
            entry_point: "main".to_string(),
            trace_actions: false,
            codegen: CodegenConfig::default(),
        }
    }
}

impl CompilerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
