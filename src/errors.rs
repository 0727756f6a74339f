//! Error types for the compiler
//!
//! A compilation fails with exactly one [`CompileError`], which wraps one of
//! the three error classes:
//! - [`LexicalError`]: no token can be formed at the current position
//! - [`SyntacticError`]: the parser table has no transition for the lookahead
//! - [`SemanticError`]: a declaration, scoping or typing rule was violated
//!
//! All three carry a human-readable message and the byte offset into the
//! source where the problem was detected. None of them is recoverable: the
//! first error aborts the compilation.
//!
//! [`TableError`] and [`ConfigError`] are load-time failures. They describe a
//! broken table artifact or configuration file, never a problem with the
//! program being compiled.

use thiserror::Error;

/// No valid token can be formed starting at `offset`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct LexicalError {
    pub message: String,
    pub offset: usize,
}

/// The parser table has no valid transition for the token at `offset`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SyntacticError {
    pub message: String,
    pub offset: usize,
}

/// A semantic rule was violated by the construct at `offset`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SemanticError {
    pub message: String,
    pub offset: usize,
}

impl LexicalError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl SyntacticError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl SemanticError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// The single failure value of a compilation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("lexical error at offset {offset}: {message}", offset = .0.offset, message = .0.message)]
    Lexical(#[from] LexicalError),

    #[error("syntactic error at offset {offset}: {message}", offset = .0.offset, message = .0.message)]
    Syntactic(#[from] SyntacticError),

    #[error("semantic error at offset {offset}: {message}", offset = .0.offset, message = .0.message)]
    Semantic(#[from] SemanticError),
}

impl CompileError {
    /// Byte offset into the source where the error was detected
    pub fn offset(&self) -> usize {
        match self {
            CompileError::Lexical(e) => e.offset,
            CompileError::Syntactic(e) => e.offset,
            CompileError::Semantic(e) => e.offset,
        }
    }

    /// The message without the error-class prefix
    pub fn message(&self) -> &str {
        match self {
            CompileError::Lexical(e) => &e.message,
            CompileError::Syntactic(e) => &e.message,
            CompileError::Semantic(e) => &e.message,
        }
    }

    /// Short name of the error class, for presentation
    pub fn class(&self) -> &'static str {
        match self {
            CompileError::Lexical(_) => "lexical",
            CompileError::Syntactic(_) => "syntactic",
            CompileError::Semantic(_) => "semantic",
        }
    }
}

/// The table artifact handed to the engine is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("grammar conflict in state {state} on '{symbol}': {existing} vs {incoming}")]
    Conflict {
        state: usize,
        symbol: String,
        existing: String,
        incoming: String,
    },

    #[error("unknown semantic action id {id} in state {state}")]
    UnknownAction { state: usize, id: i32 },

    #[error("entry in state {state}, column {column} targets {target}, outside 0..{limit}")]
    OutOfRange {
        state: usize,
        column: usize,
        target: i32,
        limit: usize,
    },

    #[error("malformed table: {0}")]
    Malformed(String),
}

/// The configuration file could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
