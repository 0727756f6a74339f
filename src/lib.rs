//! # Introduction
//!
//! bipc compiles a small C-like language to BIP assembly in a single pass.
//! No syntax tree is built: a table-driven LALR parser fires semantic actions
//! at grammar-marked points, and those actions check declarations, scopes and
//! types, and lower code as they go.
//!
//! ## Compilation pipeline
//!
//! ```text
//! Source → Lexer → Parser ⇄ SemanticAnalyzer → CodeGenerator → .data/.text
//! ```
//!
//! 1. [`lexer`]: DFA scanner table and longest-match tokenizer.
//! 2. [`parser`]: grammar, LALR(1) table construction and the driver loop.
//! 3. [`semantic`]: symbol table, scope stack, type rules and every action.
//! 4. [`codegen`]: BIP data layout and instruction emission.
//! 5. [`compiler`]: the one-call pipeline used by the CLI.
//!
//! ## Supported language
//!
//! Types: `int`, `long`, `float`, `double`, `char`, `bool`, `string`, `void`,
//! one-dimensional arrays with initializer lists.
//! Control flow: `if/else`, `while`, `do-while`, `for`, `break`, `continue`,
//! `return`.
//! Functions with typed parameters and calls.

pub mod codegen;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod lexer;
pub mod parser;
pub mod semantic;

pub use compiler::{Compilation, Compiler};
pub use config::CompilerConfig;
pub use errors::CompileError;
