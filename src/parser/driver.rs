//! Parser driver: the table lookup loop

use super::tables::{Entry, ParseTable};
use crate::errors::{CompileError, SemanticError, SyntacticError};
use crate::lexer::{Lexer, Token};
use crate::semantic::action::SemanticAction;

/// Receiver of the semantic actions fired during a parse
pub trait ActionHandler {
    fn execute_action(&mut self, action: SemanticAction, token: &Token)
        -> Result<(), SemanticError>;
}

/// Table-driven LALR parser.
///
/// The stack holds states only. ACTION cells run their hook with the most
/// recently shifted token (the lookahead before the first shift) and then
/// push the GOTO of the action's column, like reducing an empty production.
pub struct Parser<'t> {
    table: &'t ParseTable,
}

impl<'t> Parser<'t> {
    pub fn new(table: &'t ParseTable) -> Self {
        Parser { table }
    }

    pub fn parse(
        &self,
        lexer: &mut Lexer<'_>,
        handler: &mut dyn ActionHandler,
    ) -> Result<(), CompileError> {
        let mut stack: Vec<usize> = vec![0];
        let mut lookahead = self.fetch(lexer)?;
        let mut previous: Option<Token> = None;

        loop {
            let state = *stack.last().ok_or_else(|| self.malformed(&lookahead))?;
            match self.table.entry(state, lookahead.kind.id()) {
                Entry::Shift(target) => {
                    stack.push(target);
                    let next = self.fetch(lexer)?;
                    previous = Some(std::mem::replace(&mut lookahead, next));
                }
                Entry::Reduce(production) => {
                    let (lhs, len) = self
                        .table
                        .production(production)
                        .ok_or_else(|| self.malformed(&lookahead))?;
                    if len >= stack.len() {
                        return Err(self.malformed(&lookahead));
                    }
                    stack.truncate(stack.len() - len);
                    let top = *stack.last().ok_or_else(|| self.malformed(&lookahead))?;
                    stack.push(self.goto(top, lhs, &lookahead)?);
                }
                Entry::Action(action) => {
                    handler.execute_action(action, previous.as_ref().unwrap_or(&lookahead))?;
                    let column = self.table.action_column(action);
                    stack.push(self.goto(state, column, &lookahead)?);
                }
                Entry::Accept => return Ok(()),
                Entry::Goto(_) | Entry::Error => {
                    return Err(SyntacticError::new(
                        format!("unexpected {}; {}", lookahead, self.table.message(state)),
                        lookahead.offset,
                    )
                    .into())
                }
            }
        }
    }

    fn fetch(&self, lexer: &mut Lexer<'_>) -> Result<Token, CompileError> {
        Ok(lexer
            .next_token()?
            .unwrap_or_else(|| Token::end_of_input(lexer.input_len())))
    }

    fn goto(&self, state: usize, symbol: usize, at: &Token) -> Result<usize, CompileError> {
        match self.table.entry(state, symbol) {
            Entry::Goto(target) => Ok(target),
            _ => Err(self.malformed(at)),
        }
    }

    fn malformed(&self, at: &Token) -> CompileError {
        SyntacticError::new("malformed parser table", at.offset).into()
    }
}
