//! Token-pattern lowering
//!
//! Recognizes simple assignment statements directly in the token stream of
//! an already analyzed program:
//!
//! ```text
//! d = s;          d = 3;
//! d[i] = s[j];    (i, j integer constants)
//! d[x] = s;       (x a variable)
//! d = a OP b;     (OP one of + - * / & | ^)
//! ```
//!
//! Anything else is skipped, as are function bodies. Names resolve to global
//! variables and arrays only, innermost visible declaration first.

use super::{Access, CodeGenerator, Value};
use crate::lexer::{Token, TokenKind};
use crate::semantic::symbols::{Symbol, SymbolId, SymbolKind, SymbolScope, SymbolTable};
use crate::semantic::types::BinaryOp;

enum Target {
    Fixed(Access),
    Indexed { array: SymbolId, index: SymbolId },
}

enum Source {
    Access(Access),
    Literal(i64),
}

enum Rhs {
    Copy(Source),
    Binary(Value, BinaryOp, Value),
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    symbols: &'a SymbolTable,
    blocks: &'a [(usize, usize)],
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, kind: TokenKind) -> Option<&'a Token> {
        let token = self.peek().filter(|t| t.kind == kind)?;
        self.pos += 1;
        Some(token)
    }

    fn literal(&mut self) -> Option<i64> {
        let value = self.peek()?.int_value()?;
        self.pos += 1;
        Some(value)
    }

    fn global(&mut self) -> Option<(SymbolId, SymbolKind)> {
        let token = self.eat(TokenKind::Ident)?;
        let symbol = self.resolve(token)?;
        Some((symbol.id, symbol.kind))
    }

    /// The latest global declaration of the name whose block is still open
    /// at `token`
    fn resolve(&self, token: &Token) -> Option<&'a Symbol> {
        self.symbols
            .iter()
            .filter(|s| {
                s.name == token.lexeme
                    && s.scope == SymbolScope::Global
                    && matches!(s.kind, SymbolKind::Variable | SymbolKind::Array)
                    && s.offset <= token.offset
            })
            .filter(|s| match enclosing_block(self.blocks, s.offset) {
                Some((open, close)) => open < token.offset && token.offset < close,
                None => true,
            })
            .max_by_key(|s| s.offset)
    }

    /// `v[k]` with a constant `k`, or a plain scalar
    fn access(&mut self) -> Option<Access> {
        let (id, kind) = self.global()?;
        if self.eat(TokenKind::LBracket).is_none() {
            return (kind == SymbolKind::Variable).then_some(Access::Scalar(id));
        }
        let index = self.literal()?;
        self.eat(TokenKind::RBracket)?;
        (kind == SymbolKind::Array).then_some(Access::Element(id, index))
    }

    fn target(&mut self) -> Option<Target> {
        let start = self.pos;
        if let Some(access) = self.access() {
            return Some(Target::Fixed(access));
        }
        self.pos = start;
        let (array, kind) = self.global()?;
        self.eat(TokenKind::LBracket)?;
        let (index, index_kind) = self.global()?;
        self.eat(TokenKind::RBracket)?;
        (kind == SymbolKind::Array && index_kind == SymbolKind::Variable)
            .then_some(Target::Indexed { array, index })
    }

    fn source(&mut self) -> Option<Source> {
        match self.literal() {
            Some(value) => Some(Source::Literal(value)),
            None => self.access().map(Source::Access),
        }
    }

    fn operator(&mut self) -> Option<BinaryOp> {
        let op = match self.peek()?.kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn rhs(&mut self) -> Option<Rhs> {
        let first = self.source()?;
        let Some(op) = self.operator() else {
            return Some(Rhs::Copy(first));
        };
        let second = self.source()?;
        Some(Rhs::Binary(as_value(first)?, op, as_value(second)?))
    }

    /// One whole `target = rhs ;` statement
    fn statement(&mut self) -> Option<(Target, Rhs)> {
        let target = self.target()?;
        self.eat(TokenKind::Assign)?;
        let rhs = self.rhs()?;
        self.eat(TokenKind::Semicolon)?;
        Some((target, rhs))
    }
}

fn as_value(source: Source) -> Option<Value> {
    match source {
        Source::Literal(value) => Some(Value::Literal(value)),
        Source::Access(Access::Scalar(id)) => Some(Value::Symbol(id)),
        Source::Access(Access::Element(..)) => None,
    }
}

fn emit(gen: &mut CodeGenerator, target: Target, rhs: Rhs) -> bool {
    match (target, rhs) {
        (Target::Fixed(dest), Rhs::Copy(Source::Access(src))) => gen.emit_assign(dest, src),
        (Target::Fixed(dest), Rhs::Copy(Source::Literal(value))) => gen.emit_assign_imm(dest, value),
        (Target::Indexed { array, index }, Rhs::Copy(Source::Access(src))) => {
            gen.emit_assign_var_index(array, index, src)
        }
        (Target::Indexed { array, index }, Rhs::Copy(Source::Literal(value))) => {
            gen.emit_load_imm(value);
            gen.emit_load_id(index);
            gen.emit_store_id_indexed(array);
        }
        (Target::Fixed(Access::Scalar(dest)), Rhs::Binary(lhs, op, rhs)) => {
            gen.emit_assign_simple_expr(dest, lhs, op, rhs)
        }
        _ => return false,
    }
    true
}

/// Source offsets of every `{ ... }` pair; an unclosed brace runs to the end
fn brace_blocks(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut blocks = Vec::new();
    for token in tokens {
        match token.kind {
            TokenKind::LBrace => open.push(token.offset),
            TokenKind::RBrace => {
                if let Some(start) = open.pop() {
                    blocks.push((start, token.offset));
                }
            }
            _ => {}
        }
    }
    blocks.extend(open.into_iter().map(|start| (start, usize::MAX)));
    blocks
}

/// Innermost block containing `offset`, if any
fn enclosing_block(blocks: &[(usize, usize)], offset: usize) -> Option<(usize, usize)> {
    blocks
        .iter()
        .copied()
        .filter(|&(open, close)| open < offset && offset < close)
        .max_by_key(|&(open, _)| open)
}

/// Index just past the bracket that closes the one at `open`
fn skip_balanced(tokens: &[Token], open: usize, left: TokenKind, right: TokenKind) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.kind == left {
            depth += 1;
        } else if token.kind == right {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return i + 1;
            }
        }
    }
    tokens.len()
}

/// Lower every recognized statement into `gen`; returns how many matched
pub fn lower_patterns(tokens: &[Token], symbols: &SymbolTable, gen: &mut CodeGenerator) -> usize {
    let blocks = brace_blocks(tokens);
    let mut lowered = 0;
    let mut i = 0;
    while i < tokens.len() {
        let kind = tokens[i].kind;

        // `type name ( ... ) { ... }` is a function definition
        let is_function = kind.is_type_keyword()
            && tokens.get(i + 1).is_some_and(|t| t.kind == TokenKind::Ident)
            && tokens.get(i + 2).is_some_and(|t| t.kind == TokenKind::LParen);
        if is_function {
            let after_params = skip_balanced(tokens, i + 2, TokenKind::LParen, TokenKind::RParen);
            i = match tokens.get(after_params) {
                Some(t) if t.kind == TokenKind::LBrace => {
                    skip_balanced(tokens, after_params, TokenKind::LBrace, TokenKind::RBrace)
                }
                _ => after_params,
            };
            continue;
        }

        let statement_start = i == 0
            || matches!(
                tokens[i - 1].kind,
                TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace
            );
        if statement_start && kind == TokenKind::Ident {
            let mut cursor = Cursor {
                tokens,
                pos: i,
                symbols,
                blocks: &blocks,
            };
            if let Some((target, rhs)) = cursor.statement() {
                if emit(gen, target, rhs) {
                    lowered += 1;
                    i = cursor.pos;
                    continue;
                }
            }
        }
        i += 1;
    }
    lowered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenConfig;
    use crate::lexer::{scanner_table, Lexer};
    use crate::semantic::types::PrimType;

    fn setup(source: &str) -> (Vec<Token>, SymbolTable) {
        let mut lexer = Lexer::new(scanner_table().expect("scanner table"));
        lexer.set_input(source);
        let tokens = lexer.tokenize().expect("lexes");

        let mut table = SymbolTable::new();
        for name in ["a", "b", "c", "i"] {
            table.insert(name, PrimType::Int, SymbolKind::Variable, SymbolScope::Global, 0);
        }
        for name in ["u", "v"] {
            let id = table.insert(name, PrimType::Int, SymbolKind::Array, SymbolScope::Global, 0);
            table.get_mut(id).array_length = Some(4);
        }
        (tokens, table)
    }

    fn lower(source: &str) -> (usize, Vec<String>) {
        let (tokens, table) = setup(source);
        let mut gen = CodeGenerator::new(CodegenConfig::default());
        let count = lower_patterns(&tokens, &table, &mut gen);
        let labels = gen.data_layout(&table).labels;
        (count, gen.text().iter().map(|l| l.render(&labels)).collect())
    }

    #[test]
    fn test_copy_and_constant() {
        let (count, text) = lower("a = b; c = 3;");
        assert_eq!(count, 2);
        assert_eq!(
            text,
            ["    LDI b", "    LD 0", "    LDI a", "    STO 0", "    LDI 3", "    LDI c", "    STO 0"]
        );
    }

    #[test]
    fn test_element_copy() {
        let (_, text) = lower("v[1] = u[2];");
        assert_eq!(text, ["    LDI u", "    LD 2", "    LDI v", "    STO 1"]);
    }

    #[test]
    fn test_variable_index() {
        let (_, text) = lower("v[i] = a;");
        assert_eq!(
            text,
            ["    LDI a", "    LD 0", "    LDI i", "    LD 0", "    POP $indr", "    STOV v"]
        );
    }

    #[test]
    fn test_simple_expression() {
        let (count, text) = lower("a = b ^ 5;");
        assert_eq!(count, 1);
        assert_eq!(
            text,
            ["    LDI b", "    LD 0", "    LDI 5", "    XOR", "    LDI a", "    STO 0"]
        );
    }

    #[test]
    fn test_unrecognized_statements_are_skipped() {
        let (count, _) = lower("a = b + c * 2; a = x; int d = a; if (a) b = c;");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_function_bodies_are_skipped() {
        let (count, text) = lower("int f(int p) { a = b; } c = a;");
        assert_eq!(count, 1);
        assert_eq!(text, ["    LDI a", "    LD 0", "    LDI c", "    STO 0"]);
    }

    #[test]
    fn test_names_resolve_to_innermost_block() {
        let source = "int a; { int a; a = 2; } a = 3;";
        let mut lexer = Lexer::new(scanner_table().expect("scanner table"));
        lexer.set_input(source);
        let tokens = lexer.tokenize().expect("lexes");

        let mut table = SymbolTable::new();
        let outer = table.insert("a", PrimType::Int, SymbolKind::Variable, SymbolScope::Global, 4);
        let inner = table.insert("a", PrimType::Int, SymbolKind::Variable, SymbolScope::Global, 13);

        let mut gen = CodeGenerator::new(CodegenConfig::default());
        assert_eq!(lower_patterns(&tokens, &table, &mut gen), 2);
        let labels = gen.data_layout(&table).labels;
        assert_eq!(labels[&outer], "a");
        assert_eq!(labels[&inner], "a_1");
        let text: Vec<String> = gen.text().iter().map(|l| l.render(&labels)).collect();
        assert_eq!(
            text,
            ["    LDI 2", "    LDI a_1", "    STO 0", "    LDI 3", "    LDI a", "    STO 0"]
        );
    }
}
