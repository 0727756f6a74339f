//! Named semantic actions
//!
//! The parser table refers to actions by number. Every number is mapped to a
//! [`SemanticAction`] once, when the table is loaded, so an unknown id is a
//! load-time [`crate::errors::TableError`] and dispatch is an exhaustive match.

use std::fmt;

macro_rules! semantic_actions {
    ($($variant:ident => $name:literal,)*) => {
        /// Every hook the grammar can place between symbols
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SemanticAction {
            $($variant,)*
        }

        impl SemanticAction {
            pub const ALL: &'static [SemanticAction] = &[$(SemanticAction::$variant,)*];

            /// Marker name used in the grammar, without the leading `#`
            pub fn name(self) -> &'static str {
                match self {
                    $(SemanticAction::$variant => $name,)*
                }
            }
        }
    };
}

semantic_actions! {
    BeginProgram => "begin_program",
    EndProgram => "end_program",

    // Declarations
    BeginDecl => "begin_decl",
    EndDecl => "end_decl",
    NextDeclarator => "next_declarator",
    Declare => "declare",
    DeclInit => "decl_init",
    DeclInitEnd => "decl_init_end",
    MarkArray => "mark_array",
    ArrayLength => "array_length",
    InitPending => "init_pending",
    InitOpen => "init_open",
    InitClose => "init_close",
    InitElement => "init_element",

    // Functions and blocks
    BeginParams => "begin_params",
    EndParams => "end_params",
    Param => "param",
    OpenScope => "open_scope",
    CloseScope => "close_scope",

    // Control flow
    IfCondition => "if_condition",
    ElseBranch => "else_branch",
    EndIf => "end_if",
    WhileStart => "while_start",
    WhileCondition => "while_condition",
    EndWhile => "end_while",
    ForTestStart => "for_test_start",
    ForCondition => "for_condition",
    ForNoCondition => "for_no_condition",
    ForStepStart => "for_step_start",
    ForBodyStart => "for_body_start",
    EndFor => "end_for",
    DoStart => "do_start",
    DoTest => "do_test",
    DoEnd => "do_end",
    ReturnValue => "return_value",
    ReturnVoid => "return_void",
    BreakLoop => "break_loop",
    ContinueLoop => "continue_loop",
    DiscardValue => "discard_value",

    // Assignment
    AssignTarget => "assign_target",
    AssignIndexedTarget => "assign_indexed_target",
    AssignIndex => "assign_index",
    AssignEnd => "assign_end",

    // Binary operators
    LogicalOr => "logical_or",
    LogicalAnd => "logical_and",
    BitOr => "bit_or",
    BitXor => "bit_xor",
    BitAnd => "bit_and",
    Eq => "eq",
    Ne => "ne",
    Lt => "lt",
    Le => "le",
    Gt => "gt",
    Ge => "ge",
    Shl => "shl",
    Shr => "shr",
    Add => "add",
    Sub => "sub",
    Mul => "mul",
    Div => "div",
    Mod => "mod",

    // Unary operators
    Neg => "neg",
    Pos => "pos",
    Not => "not",
    BitNot => "bit_not",

    // Operands
    LitInt => "lit_int",
    LitFloat => "lit_float",
    LitChar => "lit_char",
    LitString => "lit_string",
    LitBool => "lit_bool",
    PushIdentifier => "push_identifier",
    IndexBase => "index_base",
    Index => "index",
    CallBegin => "call_begin",
    Argument => "argument",
    CallEnd => "call_end",
}

impl SemanticAction {
    /// Numeric id stored in the parser table
    pub fn id(self) -> usize {
        self as usize
    }

    pub fn from_id(id: i32) -> Option<SemanticAction> {
        usize::try_from(id)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn from_name(name: &str) -> Option<SemanticAction> {
        Self::ALL.iter().copied().find(|action| action.name() == name)
    }
}

impl fmt::Display for SemanticAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.name())
    }
}
