//! One-call compilation pipeline
//!
//! ```text
//! source → Lexer → Parser ⇄ SemanticAnalyzer → CodeGenerator → program text
//! ```
//!
//! The lexer and parser tables are loaded once, when the [`Compiler`] is
//! created. Each [`Compiler::compile`] call runs with fresh analyzer state.

use crate::codegen::{patterns, CodeGenerator};
use crate::config::{CodegenStrategy, CompilerConfig};
use crate::errors::{CompileError, TableError};
use crate::lexer::{scanner_table, Lexer, ScannerTable};
use crate::parser::{parse_table, ParseTable, Parser};
use crate::semantic::diagnostics::DiagnosticSink;
use crate::semantic::{SemanticAnalyzer, SymbolKind, SymbolTable, Warning};

/// Result of a successful compilation
#[derive(Debug, Clone)]
pub struct Compilation {
    pub symbols: SymbolTable,
    /// `.data` followed by `.text`
    pub program: String,
    pub warnings: Vec<Warning>,
}

pub struct Compiler {
    config: CompilerConfig,
    scanner: &'static ScannerTable,
    parser: &'static ParseTable,
}

impl Compiler {
    /// Load the tables; fails only if a table artifact is unusable
    pub fn new(config: CompilerConfig) -> Result<Self, TableError> {
        Ok(Compiler {
            config,
            scanner: scanner_table()?,
            parser: parse_table()?,
        })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile(&self, source: &str) -> Result<Compilation, CompileError> {
        self.run(source, None)
    }

    /// Like [`Compiler::compile`], forwarding every warning and trace line
    /// to `sink` as it happens
    pub fn compile_with_sink(
        &self,
        source: &str,
        sink: impl FnMut(&str) + 'static,
    ) -> Result<Compilation, CompileError> {
        self.run(source, Some(Box::new(sink)))
    }

    fn run(
        &self,
        source: &str,
        sink: Option<DiagnosticSink>,
    ) -> Result<Compilation, CompileError> {
        let mut lexer = Lexer::new(self.scanner);
        lexer.set_input(source);

        let mut analyzer = SemanticAnalyzer::new(&self.config);
        if let Some(sink) = sink {
            analyzer.set_diagnostic_sink(sink);
        }
        Parser::new(self.parser).parse(&mut lexer, &mut analyzer)?;

        let (symbols, warnings, lowered) = analyzer.finish();
        let options = self.config.codegen.clone();
        let generator = match self.config.codegen.strategy {
            CodegenStrategy::Actions => {
                lowered.unwrap_or_else(|| CodeGenerator::new(options))
            }
            CodegenStrategy::Patterns => {
                lexer.set_input(source);
                let tokens = lexer.tokenize()?;
                let mut generator = CodeGenerator::new(options);
                patterns::lower_patterns(&tokens, &symbols, &mut generator);
                generator
            }
            CodegenStrategy::None => CodeGenerator::new(options),
        };

        Ok(Compilation {
            program: generator.build_program(&symbols),
            symbols,
            warnings,
        })
    }
}

/// 1-based line and column of a byte offset, for presentation
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let column = offset - before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1) + 1;
    (line, column)
}

/// Render the flat symbol table as aligned text, one symbol per row
pub fn format_symbol_table(symbols: &SymbolTable) -> String {
    let header = ["name", "type", "kind", "scope", "used", "init", "length"];
    let mut rows: Vec<[String; 7]> = vec![header.map(String::from)];
    for symbol in symbols.iter() {
        let length = match symbol.kind {
            SymbolKind::Array => symbol
                .array_length
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            _ => String::new(),
        };
        rows.push([
            symbol.name.clone(),
            symbol.ty.to_string(),
            symbol.kind.to_string(),
            symbol.scope.to_string(),
            symbol.used.to_string(),
            symbol.initialized.to_string(),
            length,
        ]);
    }

    let mut widths = [0usize; 7];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
