//! The `bipc` grammar
//!
//! Written one production per line as `Lhs -> symbols`. A symbol is one of:
//! - `#name`: a semantic action marker
//! - a keyword or operator spelling, or `ID INT FLOAT HEX BIN CHAR STR`: a terminal
//! - anything else: a non-terminal, which must appear on some left-hand side
//!
//! Symbol numbering follows the parser table layout: `0` is epsilon, terminals
//! use their [`TokenKind`] ids, non-terminals start at `first_non_terminal`
//! and action markers at `first_semantic_action`.

use crate::errors::TableError;
use crate::lexer::token::{TokenKind, TERMINAL_COUNT};
use crate::semantic::action::SemanticAction;

const GRAMMAR: &str = r#"
Program -> #begin_program Items #end_program
Items -> Items Item
Items ->
Item -> Declaration
Item -> FunctionDef
Item -> Stmt

Type -> int #begin_decl
Type -> float #begin_decl
Type -> double #begin_decl
Type -> long #begin_decl
Type -> char #begin_decl
Type -> bool #begin_decl
Type -> string #begin_decl
Type -> void #begin_decl

Declaration -> Type DeclList ; #end_decl
DeclList -> Declarator
DeclList -> DeclList , #next_declarator Declarator
Declarator -> ID #declare DeclTail
DeclTail ->
DeclTail -> = #decl_init Expr #decl_init_end
DeclTail -> [ #mark_array ArrayLen ] ArrayInit
ArrayLen -> INT #array_length
ArrayLen ->
ArrayInit ->
ArrayInit -> = #init_pending InitList
InitList -> { #init_open InitItems } #init_close
InitItems -> InitItem
InitItems -> InitItems , InitItem
InitItem -> Expr #init_element
InitItem -> InitList

FunctionDef -> Type ID #declare ( #begin_params Params ) #end_params Block
Params ->
Params -> ParamList
ParamList -> Param
ParamList -> ParamList , Param
Param -> Type ID #param

Block -> { #open_scope BlockItems } #close_scope
BlockItems -> BlockItems BlockItem
BlockItems ->
BlockItem -> Declaration
BlockItem -> Stmt

Stmt -> Matched
Stmt -> Unmatched
Matched -> IfHead Matched else #else_branch Matched #end_if
Matched -> WhileHead Matched #end_while
Matched -> ForHead Matched #end_for
Matched -> Simple
Unmatched -> IfHead Stmt #end_if
Unmatched -> IfHead Matched else #else_branch Unmatched #end_if
Unmatched -> WhileHead Unmatched #end_while
Unmatched -> ForHead Unmatched #end_for
IfHead -> if ( Expr ) #if_condition
WhileHead -> while #while_start ( Expr ) #while_condition
ForHead -> for ( ForInit ; #for_test_start ForTest ; #for_step_start ForStep ) #for_body_start
ForInit -> Assign
ForInit ->
ForTest -> Expr #for_condition
ForTest -> #for_no_condition
ForStep -> Assign
ForStep ->

Simple -> Block
Simple -> Assign ;
Simple -> Call #discard_value ;
Simple -> do #do_start Stmt while #do_test ( Expr ) #do_end ;
Simple -> return Expr #return_value ;
Simple -> return #return_void ;
Simple -> break #break_loop ;
Simple -> continue #continue_loop ;
Simple -> ;

Assign -> LValue = Expr #assign_end
LValue -> ID #assign_target
LValue -> ID #assign_indexed_target [ Expr ] #assign_index

Expr -> Expr || And #logical_or
Expr -> And
And -> And && BitOr #logical_and
And -> BitOr
BitOr -> BitOr | BitXor #bit_or
BitOr -> BitXor
BitXor -> BitXor ^ BitAnd #bit_xor
BitXor -> BitAnd
BitAnd -> BitAnd & Equality #bit_and
BitAnd -> Equality
Equality -> Equality == Relational #eq
Equality -> Equality != Relational #ne
Equality -> Relational
Relational -> Relational < Shift #lt
Relational -> Relational <= Shift #le
Relational -> Relational > Shift #gt
Relational -> Relational >= Shift #ge
Relational -> Shift
Shift -> Shift << Additive #shl
Shift -> Shift >> Additive #shr
Shift -> Additive
Additive -> Additive + Term #add
Additive -> Additive - Term #sub
Additive -> Term
Term -> Term * Unary #mul
Term -> Term / Unary #div
Term -> Term % Unary #mod
Term -> Unary
Unary -> - Unary #neg
Unary -> + Unary #pos
Unary -> ! Unary #not
Unary -> ~ Unary #bit_not
Unary -> Primary

Primary -> ( Expr )
Primary -> INT #lit_int
Primary -> HEX #lit_int
Primary -> BIN #lit_int
Primary -> FLOAT #lit_float
Primary -> CHAR #lit_char
Primary -> STR #lit_string
Primary -> true #lit_bool
Primary -> false #lit_bool
Primary -> ID #push_identifier
Primary -> ID #index_base [ Expr ] #index
Primary -> Call
Call -> ID #call_begin ( Args ) #call_end
Args ->
Args -> ArgList
ArgList -> Expr #argument
ArgList -> ArgList , Expr #argument
"#;

/// A grammar symbol, before numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarSymbol {
    Terminal(TokenKind),
    NonTerminal(usize),
    Action(SemanticAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: usize,
    pub rhs: Vec<GrammarSymbol>,
}

/// A context-free grammar with inline action markers
#[derive(Debug, Clone)]
pub struct Grammar {
    pub non_terminals: Vec<String>,
    pub productions: Vec<Production>,
}

impl Grammar {
    /// Parse the built-in `bipc` grammar
    pub fn bipc() -> Result<Grammar, TableError> {
        Grammar::parse(GRAMMAR)
    }

    /// Parse a grammar written in the `Lhs -> symbols` notation.
    /// The first production's left-hand side is the start symbol.
    pub fn parse(text: &str) -> Result<Grammar, TableError> {
        let rules: Vec<(&str, Vec<&str>)> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let (lhs, rhs) = line.split_once("->").ok_or_else(|| {
                    TableError::Malformed(format!("production without '->': {}", line))
                })?;
                Ok((lhs.trim(), rhs.split_whitespace().collect()))
            })
            .collect::<Result<_, TableError>>()?;

        if rules.is_empty() {
            return Err(TableError::Malformed("grammar has no productions".into()));
        }

        let mut non_terminals: Vec<String> = Vec::new();
        for (lhs, _) in &rules {
            if !non_terminals.iter().any(|n| n == lhs) {
                non_terminals.push(lhs.to_string());
            }
        }

        let mut productions = Vec::with_capacity(rules.len());
        for (lhs, rhs) in &rules {
            let lhs = non_terminals
                .iter()
                .position(|n| n == lhs)
                .ok_or_else(|| TableError::Malformed(format!("unknown non-terminal {}", lhs)))?;
            let rhs = rhs
                .iter()
                .map(|text| resolve(text, &non_terminals))
                .collect::<Result<_, _>>()?;
            productions.push(Production { lhs, rhs });
        }

        Ok(Grammar {
            non_terminals,
            productions,
        })
    }

    pub fn first_non_terminal(&self) -> usize {
        TERMINAL_COUNT
    }

    pub fn first_semantic_action(&self) -> usize {
        TERMINAL_COUNT + self.non_terminals.len()
    }

    /// Total number of numbered symbols, epsilon included
    pub fn symbol_count(&self) -> usize {
        self.first_semantic_action() + SemanticAction::ALL.len()
    }

    /// Table column of a symbol
    pub fn number(&self, symbol: GrammarSymbol) -> usize {
        match symbol {
            GrammarSymbol::Terminal(kind) => kind.id(),
            GrammarSymbol::NonTerminal(index) => self.first_non_terminal() + index,
            GrammarSymbol::Action(action) => self.first_semantic_action() + action.id(),
        }
    }

    /// Human-readable name of a numbered symbol
    pub fn symbol_name(&self, number: usize) -> String {
        if number == 0 {
            "epsilon".to_string()
        } else if number < self.first_non_terminal() {
            TokenKind::from_id(number as i32)
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| format!("terminal #{}", number))
        } else if number < self.first_semantic_action() {
            self.non_terminals[number - self.first_non_terminal()].clone()
        } else {
            SemanticAction::from_id((number - self.first_semantic_action()) as i32)
                .map(|action| action.to_string())
                .unwrap_or_else(|| format!("action #{}", number))
        }
    }
}

fn resolve(text: &str, non_terminals: &[String]) -> Result<GrammarSymbol, TableError> {
    if let Some(name) = text.strip_prefix('#') {
        return SemanticAction::from_name(name)
            .map(GrammarSymbol::Action)
            .ok_or_else(|| TableError::Malformed(format!("unknown action marker {}", text)));
    }

    let literal = match text {
        "ID" => Some(TokenKind::Ident),
        "INT" => Some(TokenKind::IntLiteral),
        "FLOAT" => Some(TokenKind::FloatLiteral),
        "HEX" => Some(TokenKind::HexLiteral),
        "BIN" => Some(TokenKind::BinLiteral),
        "CHAR" => Some(TokenKind::CharLiteral),
        "STR" => Some(TokenKind::StringLiteral),
        _ => None,
    };
    if let Some(kind) = literal {
        return Ok(GrammarSymbol::Terminal(kind));
    }

    if let Some((_, kind)) = TokenKind::KEYWORDS
        .iter()
        .chain(TokenKind::OPERATORS.iter())
        .find(|(spelling, _)| *spelling == text)
    {
        return Ok(GrammarSymbol::Terminal(*kind));
    }

    non_terminals
        .iter()
        .position(|n| n == text)
        .map(GrammarSymbol::NonTerminal)
        .ok_or_else(|| TableError::Malformed(format!("undefined symbol {}", text)))
}
