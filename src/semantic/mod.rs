//! Semantic analysis driven by parser actions
//!
//! [`SemanticAnalyzer`] owns all per-compilation state:
//! - the symbol arena ([`SymbolTable`]) and the scope stack of [`SymbolId`]s
//! - the declaration and initializer-list state machines
//! - the expression type stack and the pending assignment
//! - call, index, loop and branch frames
//! - the optional [`CodeGenerator`] that the actions lower into
//!
//! Handlers are split across:
//! - [`declarations`]: declarations, arrays, functions, parameters, scopes
//! - [`expressions`]: operands, operators, indexing, calls
//! - [`statements`]: assignments, control flow, `return`, `break`, `continue`

pub mod action;
pub mod declarations;
pub mod diagnostics;
pub mod expressions;
pub mod statements;
pub mod symbols;
pub mod types;

pub use action::SemanticAction;
pub use diagnostics::Warning;
pub use symbols::{Symbol, SymbolId, SymbolKind, SymbolScope, SymbolTable};
pub use types::PrimType;

use crate::codegen::{CodeGenerator, Line};
use crate::config::{CodegenStrategy, CompilerConfig, ShadowingPolicy};
use crate::errors::SemanticError;
use crate::lexer::Token;
use crate::parser::ActionHandler;
use diagnostics::Diagnostics;
use rustc_hash::FxHashSet;
use symbols::Scope;

#[derive(Debug, Clone, Default)]
struct DeclarationState {
    active: bool,
    current_type: Option<PrimType>,
    /// Re-entrancy guard: a second `declare` at this offset is ignored
    last_declared_offset: Option<usize>,
    last_declared: Option<SymbolId>,
}

#[derive(Debug, Clone, Default)]
struct InitListState {
    active: bool,
    depth: usize,
    pending: bool,
    count: usize,
}

#[derive(Debug, Clone)]
struct PendingAssignment {
    target: SymbolId,
    offset: usize,
    indexed: bool,
    index_mark: usize,
    index_code: Vec<Line>,
}

#[derive(Debug, Clone)]
struct CallFrame {
    function: SymbolId,
    arguments: usize,
}

#[derive(Debug, Clone)]
struct IndexFrame {
    array: SymbolId,
    mark: usize,
}

#[derive(Debug, Clone, Default)]
struct LoopFrame {
    start_label: Option<String>,
    continue_label: Option<String>,
    end_label: Option<String>,
    step_mark: usize,
    step: Vec<Line>,
}

#[derive(Debug, Clone, Default)]
struct BranchFrame {
    else_label: Option<String>,
    end_label: Option<String>,
}

#[derive(Debug)]
struct Lowering {
    gen: CodeGenerator,
    suspended: bool,
}

/// Attribute evaluator for one compilation
#[derive(Debug)]
pub struct SemanticAnalyzer {
    shadowing: ShadowingPolicy,
    entry_point: String,
    trace_actions: bool,

    symbols: SymbolTable,
    scopes: Vec<Scope>,
    functions: Vec<SymbolId>,

    declaration: DeclarationState,
    init_list: InitListState,
    types: Vec<PrimType>,
    pending: Option<PendingAssignment>,

    function_in_construction: Option<SymbolId>,
    params: Vec<SymbolId>,
    last_param_offset: Option<usize>,
    next_block_is_body: bool,

    calls: Vec<CallFrame>,
    indexes: Vec<IndexFrame>,
    loops: Vec<LoopFrame>,
    branches: Vec<BranchFrame>,

    warned_unused: FxHashSet<SymbolId>,
    diagnostics: Diagnostics,
    lowering: Option<Lowering>,
}

impl SemanticAnalyzer {
    pub fn new(config: &CompilerConfig) -> Self {
        let lowering = (config.codegen.strategy == CodegenStrategy::Actions).then(|| Lowering {
            gen: CodeGenerator::new(config.codegen.clone()),
            suspended: false,
        });
        SemanticAnalyzer {
            shadowing: config.shadowing,
            entry_point: config.entry_point.clone(),
            trace_actions: config.trace_actions,
            symbols: SymbolTable::new(),
            scopes: vec![Scope::default()],
            functions: Vec::new(),
            declaration: DeclarationState::default(),
            init_list: InitListState::default(),
            types: Vec::new(),
            pending: None,
            function_in_construction: None,
            params: Vec::new(),
            last_param_offset: None,
            next_block_is_body: false,
            calls: Vec::new(),
            indexes: Vec::new(),
            loops: Vec::new(),
            branches: Vec::new(),
            warned_unused: FxHashSet::default(),
            diagnostics: Diagnostics::default(),
            lowering,
        }
    }

    /// Receive every warning and trace line as text, in order
    pub fn set_diagnostic_sink(&mut self, sink: impl FnMut(&str) + 'static) {
        self.diagnostics.set_sink(Box::new(sink));
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn warnings(&self) -> &[Warning] {
        self.diagnostics.warnings()
    }

    /// Type stack contents, bottom first
    pub fn type_stack(&self) -> &[PrimType] {
        &self.types
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// The lowered code, if lowering was enabled
    pub fn code_generator(&self) -> Option<&CodeGenerator> {
        self.lowering.as_ref().map(|l| &l.gen)
    }

    /// Hand back the symbol table, warnings and generator
    pub fn finish(mut self) -> (SymbolTable, Vec<Warning>, Option<CodeGenerator>) {
        let warnings = self.diagnostics.take_warnings();
        (self.symbols, warnings, self.lowering.map(|l| l.gen))
    }

    /// Scope tag for symbols declared now
    fn current_scope_tag(&self) -> SymbolScope {
        match self.functions.last() {
            Some(&function) => SymbolScope::Function(self.symbols.get(function).name.clone()),
            None => SymbolScope::Global,
        }
    }

    /// Innermost-to-outermost lookup
    fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.scopes.iter().rev().find_map(|scope| {
            scope
                .symbols
                .iter()
                .rev()
                .copied()
                .find(|&id| self.symbols.get(id).name == name)
        })
    }

    fn lookup_or_fail(&self, token: &Token) -> Result<SymbolId, SemanticError> {
        self.lookup(&token.lexeme).ok_or_else(|| {
            SemanticError::new(
                format!("'{}' is not declared in this scope", token.lexeme),
                token.offset,
            )
        })
    }

    /// Generator to lower into, when lowering is on, not suspended, and no
    /// function body is open
    fn lower(&mut self) -> Option<&mut CodeGenerator> {
        let at_global = self.functions.is_empty();
        self.lowering
            .as_mut()
            .filter(|l| at_global && !l.suspended)
            .map(|l| &mut l.gen)
    }

    /// Stop lowering for the rest of the program and drop the partial text
    fn suspend_lowering(&mut self, reason: String, offset: usize) {
        if self.lower().is_none() {
            return;
        }
        if let Some(lowering) = self.lowering.as_mut() {
            lowering.suspended = true;
            lowering.gen.clear_text();
        }
        self.diagnostics
            .warn(Warning::LoweringSuspended { reason, offset });
    }

    fn push_type(&mut self, ty: PrimType) {
        self.types.push(ty);
    }

    fn pop_type(&mut self, offset: usize) -> Result<PrimType, SemanticError> {
        self.types
            .pop()
            .ok_or_else(|| SemanticError::new("expression stack underflow", offset))
    }
}

impl ActionHandler for SemanticAnalyzer {
    fn execute_action(
        &mut self,
        action: SemanticAction,
        token: &Token,
    ) -> Result<(), SemanticError> {
        if self.trace_actions {
            let line = format!(
                "action {} at offset {} ({})",
                action, token.offset, token.lexeme
            );
            self.diagnostics.emit(&line);
        }

        use SemanticAction as A;
        match action {
            // The global scope is opened by the constructor
            A::BeginProgram => Ok(()),
            A::EndProgram => {
                self.report_unused();
                Ok(())
            }

            A::BeginDecl => self.begin_declaration_token(token),
            A::EndDecl => self.finish_declaration(token),
            A::NextDeclarator => self.next_declarator(token),
            A::Declare => self.declare(token),
            A::DeclInit => self.declaration_initializer(token),
            A::DeclInitEnd => self.declaration_initializer_end(token),
            A::MarkArray => self.mark_declared_array(token),
            A::ArrayLength => self.array_length(token),
            A::InitPending => {
                self.init_list.pending = true;
                Ok(())
            }
            A::InitOpen => {
                self.init_list_open();
                Ok(())
            }
            A::InitClose => self.init_list_close(token),
            A::InitElement => self.init_element(token),

            A::BeginParams => self.begin_params(token),
            A::EndParams => {
                self.end_params();
                Ok(())
            }
            A::Param => self.register_parameter(token),
            A::OpenScope => {
                self.open_scope();
                Ok(())
            }
            A::CloseScope => {
                self.close_scope();
                Ok(())
            }

            A::IfCondition => self.if_condition(token),
            A::ElseBranch => {
                self.else_branch();
                Ok(())
            }
            A::EndIf => {
                self.end_if();
                Ok(())
            }
            A::WhileStart => {
                self.while_start();
                Ok(())
            }
            A::WhileCondition => self.loop_condition(token),
            A::EndWhile => {
                self.end_while();
                Ok(())
            }
            A::ForTestStart => {
                self.for_test_start();
                Ok(())
            }
            A::ForCondition => self.loop_condition(token),
            A::ForNoCondition => Ok(()),
            A::ForStepStart => {
                self.for_step_start();
                Ok(())
            }
            A::ForBodyStart => {
                self.for_body_start();
                Ok(())
            }
            A::EndFor => {
                self.end_for();
                Ok(())
            }
            A::DoStart => {
                self.do_start();
                Ok(())
            }
            A::DoTest => {
                self.do_test();
                Ok(())
            }
            A::DoEnd => self.do_end(token),
            A::ReturnValue => self.return_value(token),
            A::ReturnVoid => self.return_void(token),
            A::BreakLoop => self.break_loop(token),
            A::ContinueLoop => self.continue_loop(token),
            A::DiscardValue => self.pop_type(token.offset).map(|_| ()),

            A::AssignTarget => self.assign_target(token, false),
            A::AssignIndexedTarget => self.assign_target(token, true),
            A::AssignIndex => self.assign_index(token),
            A::AssignEnd => self.check_pending_assignment(token.offset),

            A::LogicalOr => self.binary(types::BinaryOp::LogicalOr, token),
            A::LogicalAnd => self.binary(types::BinaryOp::LogicalAnd, token),
            A::BitOr => self.binary(types::BinaryOp::BitOr, token),
            A::BitXor => self.binary(types::BinaryOp::BitXor, token),
            A::BitAnd => self.binary(types::BinaryOp::BitAnd, token),
            A::Eq => self.binary(types::BinaryOp::Eq, token),
            A::Ne => self.binary(types::BinaryOp::Ne, token),
            A::Lt => self.binary(types::BinaryOp::Lt, token),
            A::Le => self.binary(types::BinaryOp::Le, token),
            A::Gt => self.binary(types::BinaryOp::Gt, token),
            A::Ge => self.binary(types::BinaryOp::Ge, token),
            A::Shl => self.binary(types::BinaryOp::Shl, token),
            A::Shr => self.binary(types::BinaryOp::Shr, token),
            A::Add => self.binary(types::BinaryOp::Add, token),
            A::Sub => self.binary(types::BinaryOp::Sub, token),
            A::Mul => self.binary(types::BinaryOp::Mul, token),
            A::Div => self.binary(types::BinaryOp::Div, token),
            A::Mod => self.binary(types::BinaryOp::Mod, token),

            A::Neg => self.unary(types::UnaryOp::Neg, token),
            A::Pos => self.unary(types::UnaryOp::Pos, token),
            A::Not => self.unary(types::UnaryOp::Not, token),
            A::BitNot => self.unary(types::UnaryOp::BitNot, token),

            A::LitInt => self.literal_int(token),
            A::LitFloat => self.literal_float(token),
            A::LitChar => self.literal_char(token),
            A::LitString => {
                self.literal_string(token);
                Ok(())
            }
            A::LitBool => {
                self.literal_bool(token);
                Ok(())
            }
            A::PushIdentifier => self.push_identifier(token),
            A::IndexBase => self.index_base(token),
            A::Index => self.index(token),
            A::CallBegin => self.call_begin(token),
            A::Argument => self.argument(token),
            A::CallEnd => self.call_end(token),
        }
    }
}
