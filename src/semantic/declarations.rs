//! Declarations, arrays, functions, parameters and scopes
//!
//! Declaration mode runs `idle -> declaring -> idle`: a type keyword enters
//! it, each identifier is declared with the current type, and `;` or a
//! function signature leaves it. Initializer-list braces are tracked by depth
//! while declaring.

use super::diagnostics::Warning;
use super::symbols::{Scope, SymbolId, SymbolKind, SymbolScope};
use super::types::PrimType;
use super::{DeclarationState, InitListState, SemanticAnalyzer};
use crate::config::ShadowingPolicy;
use crate::errors::SemanticError;
use crate::lexer::{Token, TokenKind};

/// Largest array a declaration may reserve, in cells
pub const MAX_ARRAY_LENGTH: usize = 65_536;

impl SemanticAnalyzer {
    /// Enter declaration mode with `ty` as the current type
    pub fn begin_declaration(&mut self, ty: PrimType) {
        self.declaration = DeclarationState {
            active: true,
            current_type: Some(ty),
            last_declared_offset: None,
            last_declared: None,
        };
        self.init_list = InitListState::default();
    }

    pub fn end_declaration(&mut self) {
        self.declaration = DeclarationState::default();
        self.init_list = InitListState::default();
    }

    pub fn in_declaration(&self) -> bool {
        self.declaration.active
    }

    /// Between the `=` of an array declarator and its closing brace
    pub fn in_initializer_list(&self) -> bool {
        self.init_list.pending || self.init_list.active
    }

    pub(super) fn begin_declaration_token(&mut self, token: &Token) -> Result<(), SemanticError> {
        let ty = PrimType::from_keyword(token.kind).ok_or_else(|| {
            SemanticError::new(format!("expected a type, found {}", token), token.offset)
        })?;
        self.begin_declaration(ty);
        Ok(())
    }

    /// Declare the identifier in `token` in the innermost scope.
    /// A second call with the same offset is a no-op.
    pub fn declare(&mut self, token: &Token) -> Result<(), SemanticError> {
        if token.kind != TokenKind::Ident || token.lexeme.is_empty() {
            return Err(SemanticError::new(
                format!("expected an identifier in declaration, found {}", token),
                token.offset,
            ));
        }
        if self.declaration.last_declared_offset == Some(token.offset) {
            return Ok(());
        }

        let name = token.lexeme.as_str();
        let ty = self.declaration.current_type.ok_or_else(|| {
            SemanticError::new(
                format!("declaration of '{}' without a current type", name),
                token.offset,
            )
        })?;

        if self.declared_in_innermost(name) {
            return Err(SemanticError::new(
                format!("'{}' is already declared in this scope", name),
                token.offset,
            ));
        }
        if self.shadowing == ShadowingPolicy::Function && self.declared_in_current_function(name) {
            return Err(SemanticError::new(
                format!(
                    "'{}' is already declared in this function ('{}')",
                    name,
                    self.current_scope_tag()
                ),
                token.offset,
            ));
        }

        let scope = self.current_scope_tag();
        let id = self
            .symbols
            .insert(name, ty, SymbolKind::Variable, scope, token.offset);
        if let Some(innermost) = self.scopes.last_mut() {
            innermost.symbols.push(id);
        }
        self.declaration.last_declared = Some(id);
        self.declaration.last_declared_offset = Some(token.offset);
        Ok(())
    }

    fn declared_in_innermost(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|scope| {
            scope
                .symbols
                .iter()
                .any(|&id| self.symbols.get(id).name == name)
        })
    }

    /// Whether an active scope already holds `name` tagged with the current
    /// function. Never true at global level.
    fn declared_in_current_function(&self, name: &str) -> bool {
        let tag = self.current_scope_tag();
        if tag == SymbolScope::Global {
            return false;
        }
        self.scopes.iter().flat_map(|s| s.symbols.iter()).any(|&id| {
            let symbol = self.symbols.get(id);
            symbol.name == name && symbol.scope == tag
        })
    }

    /// Storage may not have type `void`
    fn require_storable(&self) -> Result<(), SemanticError> {
        if let Some(id) = self.declaration.last_declared {
            let symbol = self.symbols.get(id);
            if symbol.kind != SymbolKind::Function && symbol.ty == PrimType::Void {
                return Err(SemanticError::new(
                    format!("{} '{}' declared void", symbol.kind, symbol.name),
                    symbol.offset,
                ));
            }
        }
        Ok(())
    }

    fn last_declared(&self, token: &Token) -> Result<SymbolId, SemanticError> {
        self.declaration
            .last_declared
            .ok_or_else(|| SemanticError::new("no declaration in progress", token.offset))
    }

    pub(super) fn finish_declaration(&mut self, _token: &Token) -> Result<(), SemanticError> {
        self.require_storable()?;
        self.end_declaration();
        Ok(())
    }

    pub(super) fn next_declarator(&mut self, _token: &Token) -> Result<(), SemanticError> {
        self.require_storable()?;
        self.declaration.last_declared_offset = None;
        Ok(())
    }

    /// `=` after a declared identifier
    pub(super) fn declaration_initializer(&mut self, token: &Token) -> Result<(), SemanticError> {
        self.require_storable()?;
        let id = self.last_declared(token)?;
        self.symbols.get_mut(id).initialized = true;
        Ok(())
    }

    pub(super) fn declaration_initializer_end(&mut self, token: &Token) -> Result<(), SemanticError> {
        let id = self.last_declared(token)?;
        let value = self.pop_type(token.offset)?;
        let symbol = self.symbols.get(id);
        if !symbol.ty.accepts(value) {
            return Err(SemanticError::new(
                format!(
                    "type mismatch: cannot initialize '{}' of type {} with {}",
                    symbol.name, symbol.ty, value
                ),
                symbol.offset,
            ));
        }
        if let Some(gen) = self.lower() {
            gen.emit_store_id(id);
        }
        Ok(())
    }

    /// Flip the named symbol of the innermost scope to an array
    pub fn mark_as_array(&mut self, name: &str) {
        let found = self.scopes.last().and_then(|scope| {
            scope
                .symbols
                .iter()
                .copied()
                .find(|&id| self.symbols.get(id).name == name)
        });
        if let Some(id) = found {
            self.symbols.get_mut(id).kind = SymbolKind::Array;
        }
    }

    pub(super) fn mark_declared_array(&mut self, token: &Token) -> Result<(), SemanticError> {
        self.require_storable()?;
        let id = self.last_declared(token)?;
        let name = self.symbols.get(id).name.clone();
        self.mark_as_array(&name);
        Ok(())
    }

    pub(super) fn array_length(&mut self, token: &Token) -> Result<(), SemanticError> {
        let id = self.last_declared(token)?;
        let value = token.int_value().filter(|&n| n > 0).ok_or_else(|| {
            SemanticError::new(
                format!("array length must be a positive integer, found {}", token.lexeme),
                token.offset,
            )
        })?;
        let length = usize::try_from(value)
            .ok()
            .filter(|&n| n <= MAX_ARRAY_LENGTH)
            .ok_or_else(|| {
                SemanticError::new(
                    format!("array length exceeds {}", MAX_ARRAY_LENGTH),
                    token.offset,
                )
            })?;
        self.symbols.get_mut(id).array_length = Some(length);
        Ok(())
    }

    /// Mark the innermost visible symbol named `name` as initialized
    pub fn mark_initialized(&mut self, name: &str) {
        if let Some(id) = self.lookup(name) {
            self.symbols.get_mut(id).initialized = true;
        }
    }

    // ========== initializer lists ==========

    pub(super) fn init_list_open(&mut self) {
        if self.init_list.depth == 0 {
            self.init_list.active = true;
            self.init_list.count = 0;
        }
        self.init_list.depth += 1;
    }

    pub(super) fn init_element(&mut self, token: &Token) -> Result<(), SemanticError> {
        let id = self.last_declared(token)?;
        let value = self.pop_type(token.offset)?;
        let symbol = self.symbols.get(id);
        if !symbol.ty.accepts(value) {
            return Err(SemanticError::new(
                format!(
                    "type mismatch: initializer of type {} for array '{}' of {}",
                    value, symbol.name, symbol.ty
                ),
                token.offset,
            ));
        }

        self.init_list.count += 1;
        let index = self.init_list.count - 1;
        if let Some(length) = symbol.array_length {
            if self.init_list.count > length {
                return Err(SemanticError::new(
                    format!(
                        "too many initializers for '{}' (length {})",
                        symbol.name, length
                    ),
                    token.offset,
                ));
            }
        }
        if let Some(gen) = self.lower() {
            gen.emit_store_id_offset(id, index as i64);
        }
        Ok(())
    }

    pub(super) fn init_list_close(&mut self, token: &Token) -> Result<(), SemanticError> {
        self.init_list.depth = self.init_list.depth.saturating_sub(1);
        if self.init_list.depth > 0 {
            return Ok(());
        }
        self.init_list.active = false;
        self.init_list.pending = false;
        let id = self.last_declared(token)?;
        let count = self.init_list.count;
        let symbol = self.symbols.get_mut(id);
        symbol.initialized = true;
        if symbol.array_length.is_none() {
            symbol.array_length = Some(count);
        }
        Ok(())
    }

    // ========== functions and parameters ==========

    /// Reclassify the named symbol of the innermost scope as a function
    pub fn promote_to_function(&mut self, name: &str) {
        let found = self.scopes.last().and_then(|scope| {
            scope
                .symbols
                .iter()
                .copied()
                .find(|&id| self.symbols.get(id).name == name)
        });
        if let Some(id) = found {
            self.promote_to_function_id(id);
        }
    }

    fn promote_to_function_id(&mut self, id: SymbolId) {
        let is_entry = self.symbols.get(id).name == self.entry_point;
        let symbol = self.symbols.get_mut(id);
        symbol.kind = SymbolKind::Function;
        symbol.scope = SymbolScope::Global;
        symbol.initialized = true;
        if is_entry {
            symbol.used = true;
        }
    }

    /// `(` after a declared name: the declaration is a function signature
    pub(super) fn begin_params(&mut self, token: &Token) -> Result<(), SemanticError> {
        let id = self.last_declared(token)?;
        self.promote_to_function_id(id);
        self.function_in_construction = Some(id);
        self.params.clear();
        self.last_param_offset = None;
        self.end_declaration();
        Ok(())
    }

    /// Register a parameter of the function under construction. Repeating
    /// the same offset, or a name already in the list, is ignored.
    pub fn register_parameter(&mut self, token: &Token) -> Result<(), SemanticError> {
        if token.kind != TokenKind::Ident || token.lexeme.is_empty() {
            return Err(SemanticError::new(
                format!("malformed parameter: expected an identifier, found {}", token),
                token.offset,
            ));
        }
        if self.last_param_offset == Some(token.offset) {
            return Ok(());
        }
        self.last_param_offset = Some(token.offset);

        let name = token.lexeme.as_str();
        let ty = self.declaration.current_type.ok_or_else(|| {
            SemanticError::new(format!("parameter '{}' without a type", name), token.offset)
        })?;
        if ty == PrimType::Void {
            return Err(SemanticError::new(
                format!("parameter '{}' declared void", name),
                token.offset,
            ));
        }
        let function = self.function_in_construction.ok_or_else(|| {
            SemanticError::new(
                format!("parameter '{}' outside of a function signature", name),
                token.offset,
            )
        })?;
        if self
            .params
            .iter()
            .any(|&id| self.symbols.get(id).name == name)
        {
            return Ok(());
        }

        let scope = SymbolScope::Function(self.symbols.get(function).name.clone());
        let id = self
            .symbols
            .insert(name, ty, SymbolKind::Parameter, scope, token.offset);
        self.symbols.get_mut(id).initialized = true;
        self.symbols.get_mut(function).parameters.push(id);
        self.params.push(id);
        Ok(())
    }

    pub(super) fn end_params(&mut self) {
        self.next_block_is_body = true;
        self.end_declaration();
    }

    // ========== scopes ==========

    /// Push a block scope. The block right after a parameter list is the
    /// function body: it receives the buffered parameters.
    pub fn open_scope(&mut self) {
        let function_body = std::mem::take(&mut self.next_block_is_body);
        let mut scope = Scope {
            symbols: Vec::new(),
            function_body,
        };
        if function_body {
            if let Some(function) = self.function_in_construction.take() {
                self.functions.push(function);
            }
            for id in std::mem::take(&mut self.params) {
                let name = &self.symbols.get(id).name;
                if !scope.symbols.iter().any(|&p| &self.symbols.get(p).name == name) {
                    scope.symbols.push(id);
                }
            }
        }
        self.scopes.push(scope);
    }

    /// Pop a block scope, warning once for each of its unused symbols.
    /// The global scope is never popped.
    pub fn close_scope(&mut self) {
        if self.scopes.len() <= 1 {
            return;
        }
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        for &id in &scope.symbols {
            self.warn_unused(id);
        }
        if scope.function_body {
            self.functions.pop();
        }
    }

    fn warn_unused(&mut self, id: SymbolId) {
        let symbol = self.symbols.get(id);
        if symbol.used || !self.warned_unused.insert(id) {
            return;
        }
        let warning = Warning::UnusedSymbol {
            name: symbol.name.clone(),
            kind: symbol.kind,
            offset: symbol.offset,
        };
        self.diagnostics.warn(warning);
    }

    /// One warning per never-used symbol in the whole table, skipping
    /// symbols already reported when their scope closed
    pub fn report_unused(&mut self) {
        let ids: Vec<SymbolId> = self.symbols.iter().map(|s| s.id).collect();
        for id in ids {
            self.warn_unused(id);
        }
    }
}
