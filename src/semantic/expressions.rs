//! Expression operands and operators
//!
//! Every operand pushes its type on the type stack; every operator pops its
//! operands and pushes the result type. Actions fire in post-order, so when
//! lowering is on the emitted code is already in stack-machine order.

use super::diagnostics::Warning;
use super::symbols::{SymbolId, SymbolKind};
use super::types::{BinaryOp, PrimType, UnaryOp};
use super::{CallFrame, IndexFrame, SemanticAnalyzer};
use crate::errors::SemanticError;
use crate::lexer::Token;

impl SemanticAnalyzer {
    /// Resolve `token`, mark the symbol used and warn if it is read before
    /// any initialization
    pub fn use_symbol(&mut self, token: &Token) -> Result<SymbolId, SemanticError> {
        let id = self.lookup_or_fail(token)?;
        let symbol = self.symbols.get_mut(id);
        symbol.used = true;
        if !symbol.initialized {
            let warning = Warning::UninitializedUse {
                name: symbol.name.clone(),
                offset: token.offset,
            };
            self.diagnostics.warn(warning);
        }
        Ok(id)
    }

    pub(super) fn binary(&mut self, op: BinaryOp, token: &Token) -> Result<(), SemanticError> {
        let rhs = self.pop_type(token.offset)?;
        let lhs = self.pop_type(token.offset)?;
        let ty = op
            .result_type(lhs, rhs)
            .map_err(|message| SemanticError::new(message, token.offset))?;
        self.push_type(ty);
        if let Some(gen) = self.lower() {
            gen.emit_binary(op);
        }
        Ok(())
    }

    pub(super) fn unary(&mut self, op: UnaryOp, token: &Token) -> Result<(), SemanticError> {
        let operand = self.pop_type(token.offset)?;
        let ty = op
            .result_type(operand)
            .map_err(|message| SemanticError::new(message, token.offset))?;
        self.push_type(ty);
        if let Some(gen) = self.lower() {
            gen.emit_unary(op);
        }
        Ok(())
    }

    // ========== literals ==========

    pub(super) fn literal_int(&mut self, token: &Token) -> Result<(), SemanticError> {
        let value = token.int_value().ok_or_else(|| {
            SemanticError::new(
                format!("integer literal {} is out of range", token.lexeme),
                token.offset,
            )
        })?;
        self.push_type(PrimType::Int);
        if let Some(gen) = self.lower() {
            gen.emit_load_imm(value);
        }
        Ok(())
    }

    pub(super) fn literal_float(&mut self, token: &Token) -> Result<(), SemanticError> {
        if token.lexeme.parse::<f64>().is_err() {
            return Err(SemanticError::new(
                format!("malformed decimal literal {}", token.lexeme),
                token.offset,
            ));
        }
        self.push_type(PrimType::Float);
        if let Some(gen) = self.lower() {
            gen.emit_load_imm(&token.lexeme);
        }
        Ok(())
    }

    pub(super) fn literal_char(&mut self, token: &Token) -> Result<(), SemanticError> {
        let code = token.char_value().ok_or_else(|| {
            SemanticError::new(
                format!("char literal {} must hold exactly one character", token.lexeme),
                token.offset,
            )
        })?;
        self.push_type(PrimType::Char);
        if let Some(gen) = self.lower() {
            gen.emit_load_imm(code);
        }
        Ok(())
    }

    /// Strings have no storage in the target, so they end lowering
    pub(super) fn literal_string(&mut self, token: &Token) {
        self.push_type(PrimType::String);
        self.suspend_lowering("string literal".to_string(), token.offset);
    }

    pub(super) fn literal_bool(&mut self, token: &Token) {
        self.push_type(PrimType::Bool);
        let value = u8::from(token.lexeme == "true");
        if let Some(gen) = self.lower() {
            gen.emit_load_imm(value);
        }
    }

    // ========== names ==========

    pub(super) fn push_identifier(&mut self, token: &Token) -> Result<(), SemanticError> {
        let id = self.lookup_or_fail(token)?;
        match self.symbols.get(id).kind {
            SymbolKind::Function => {
                return Err(SemanticError::new(
                    format!("function '{}' used as a value", token.lexeme),
                    token.offset,
                ))
            }
            SymbolKind::Array => {
                return Err(SemanticError::new(
                    format!("array '{}' used without an index", token.lexeme),
                    token.offset,
                ))
            }
            SymbolKind::Variable | SymbolKind::Parameter => {}
        }
        self.use_symbol(token)?;
        let ty = self.symbols.get(id).ty;
        self.push_type(ty);
        if let Some(gen) = self.lower() {
            gen.emit_load_id(id);
        }
        Ok(())
    }

    /// `v` in `v[...]` as an operand
    pub(super) fn index_base(&mut self, token: &Token) -> Result<(), SemanticError> {
        let id = self.lookup_or_fail(token)?;
        if self.symbols.get(id).kind != SymbolKind::Array {
            return Err(SemanticError::new(
                format!("'{}' is not an array", token.lexeme),
                token.offset,
            ));
        }
        self.use_symbol(token)?;
        let mark = self.lower().map_or(0, |gen| gen.mark());
        self.indexes.push(IndexFrame { array: id, mark });
        Ok(())
    }

    /// `]` closing an operand index. A constant index becomes an offset,
    /// any other index goes through the index register.
    pub(super) fn index(&mut self, token: &Token) -> Result<(), SemanticError> {
        let frame = self
            .indexes
            .pop()
            .ok_or_else(|| SemanticError::new("index without an array", token.offset))?;
        self.check_index_type(token)?;
        let element = self.symbols.get(frame.array).ty;
        self.push_type(element);

        if let Some(gen) = self.lower() {
            let index = gen.take_since(frame.mark);
            let constant = match index.as_slice() {
                [line] => line.as_int_immediate(),
                _ => None,
            };
            match constant {
                Some(offset) => gen.emit_load_id_offset(frame.array, offset),
                None => {
                    gen.append(index);
                    gen.emit_load_id_indexed(frame.array);
                }
            }
        }
        Ok(())
    }

    pub(super) fn check_index_type(&mut self, token: &Token) -> Result<(), SemanticError> {
        let ty = self.pop_type(token.offset)?;
        if !ty.is_integer_like() {
            return Err(SemanticError::new(
                format!("array index must be an integer, found {}", ty),
                token.offset,
            ));
        }
        Ok(())
    }

    // ========== calls ==========

    pub(super) fn call_begin(&mut self, token: &Token) -> Result<(), SemanticError> {
        let id = self.lookup_or_fail(token)?;
        if self.symbols.get(id).kind != SymbolKind::Function {
            return Err(SemanticError::new(
                format!("'{}' is not a function", token.lexeme),
                token.offset,
            ));
        }
        self.symbols.get_mut(id).used = true;
        self.calls.push(CallFrame {
            function: id,
            arguments: 0,
        });
        self.suspend_lowering(format!("call to '{}'", token.lexeme), token.offset);
        Ok(())
    }

    pub(super) fn argument(&mut self, token: &Token) -> Result<(), SemanticError> {
        let ty = self.pop_type(token.offset)?;
        let frame = self
            .calls
            .last_mut()
            .ok_or_else(|| SemanticError::new("argument outside of a call", token.offset))?;
        let function = self.symbols.get(frame.function);
        let position = frame.arguments;
        frame.arguments += 1;

        let parameter = function.parameters.get(position).ok_or_else(|| {
            SemanticError::new(
                format!("too many arguments to '{}'", function.name),
                token.offset,
            )
        })?;
        let expected = self.symbols.get(*parameter).ty;
        if !expected.accepts(ty) {
            return Err(SemanticError::new(
                format!(
                    "type mismatch: argument {} of '{}' expects {}, found {}",
                    position + 1,
                    function.name,
                    expected,
                    ty
                ),
                token.offset,
            ));
        }
        Ok(())
    }

    pub(super) fn call_end(&mut self, token: &Token) -> Result<(), SemanticError> {
        let frame = self
            .calls
            .pop()
            .ok_or_else(|| SemanticError::new("unbalanced call", token.offset))?;
        let function = self.symbols.get(frame.function);
        let expected = function.parameters.len();
        if frame.arguments != expected {
            return Err(SemanticError::new(
                format!(
                    "'{}' expects {} arguments, found {}",
                    function.name, expected, frame.arguments
                ),
                token.offset,
            ));
        }
        let ty = function.ty;
        self.push_type(ty);
        Ok(())
    }
}
