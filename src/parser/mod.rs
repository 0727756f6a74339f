//! Table-driven parser
//!
//! - [`grammar`]: the `bipc` grammar and its symbol numbering
//! - [`lalr`]: LALR(1) construction of the parser table
//! - [`tables`]: the validated table artifact
//! - [`driver`]: the shift/reduce/action loop
//!
//! No syntax tree is built. The driver fires [`SemanticAction`]s into an
//! [`ActionHandler`] at the points the grammar marks.
//!
//! [`SemanticAction`]: crate::semantic::action::SemanticAction

pub mod driver;
pub mod grammar;
pub mod lalr;
pub mod tables;

pub use driver::{ActionHandler, Parser};
pub use grammar::Grammar;
pub use tables::{Entry, ParseTable};

use crate::errors::TableError;
use std::sync::OnceLock;

/// The cached parser table for the `bipc` grammar
pub fn parse_table() -> Result<&'static ParseTable, TableError> {
    static TABLE: OnceLock<Result<ParseTable, TableError>> = OnceLock::new();
    TABLE
        .get_or_init(|| Grammar::bipc().and_then(|grammar| lalr::build(&grammar)))
        .as_ref()
        .map_err(Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CompileError, SemanticError};
    use crate::lexer::{scanner_table, Lexer, Token};
    use crate::semantic::action::SemanticAction;

    #[derive(Default)]
    struct Recorder {
        fired: Vec<(SemanticAction, String)>,
    }

    impl ActionHandler for Recorder {
        fn execute_action(
            &mut self,
            action: SemanticAction,
            token: &Token,
        ) -> Result<(), SemanticError> {
            self.fired.push((action, token.lexeme.clone()));
            Ok(())
        }
    }

    fn run(source: &str) -> (Result<(), CompileError>, Recorder) {
        let mut lexer = Lexer::new(scanner_table().expect("scanner table"));
        lexer.set_input(source);
        let mut recorder = Recorder::default();
        let result = Parser::new(parse_table().expect("parser table")).parse(&mut lexer, &mut recorder);
        (result, recorder)
    }

    #[test]
    fn test_declaration_actions_in_order() {
        let (result, recorder) = run("int a, b;");
        assert!(result.is_ok());
        let expected = [
            (SemanticAction::BeginProgram, "int"),
            (SemanticAction::BeginDecl, "int"),
            (SemanticAction::Declare, "a"),
            (SemanticAction::NextDeclarator, ","),
            (SemanticAction::Declare, "b"),
            (SemanticAction::EndDecl, ";"),
            (SemanticAction::EndProgram, ";"),
        ];
        let fired: Vec<_> = recorder
            .fired
            .iter()
            .map(|(action, lexeme)| (*action, lexeme.as_str()))
            .collect();
        assert_eq!(fired, expected);
    }

    #[test]
    fn test_expression_actions_are_post_order() {
        let (result, recorder) = run("a = b + c * 2;");
        assert!(result.is_ok());
        let actions: Vec<_> = recorder.fired.iter().map(|(a, _)| *a).collect();
        assert_eq!(
            actions,
            vec![
                SemanticAction::BeginProgram,
                SemanticAction::AssignTarget,
                SemanticAction::PushIdentifier,
                SemanticAction::PushIdentifier,
                SemanticAction::LitInt,
                SemanticAction::Mul,
                SemanticAction::Add,
                SemanticAction::AssignEnd,
                SemanticAction::EndProgram,
            ]
        );
    }

    #[test]
    fn test_unexpected_identifier() {
        let (result, _) = run("int a; a b;");
        match result {
            Err(CompileError::Syntactic(e)) => {
                assert_eq!(e.offset, 9);
                assert!(e.message.contains("identifier 'b'"));
            }
            other => panic!("expected syntactic error, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_else_binds_to_inner_if() {
        let (result, recorder) = run("if (a) if (b) x = 1; else x = 2;");
        assert!(result.is_ok());
        let actions: Vec<_> = recorder
            .fired
            .iter()
            .map(|(a, _)| *a)
            .filter(|a| {
                matches!(
                    a,
                    SemanticAction::IfCondition | SemanticAction::ElseBranch | SemanticAction::EndIf
                )
            })
            .collect();
        assert_eq!(
            actions,
            vec![
                SemanticAction::IfCondition,
                SemanticAction::IfCondition,
                SemanticAction::ElseBranch,
                SemanticAction::EndIf,
                SemanticAction::EndIf,
            ]
        );
    }

    #[test]
    fn test_lexical_error_surfaces_through_parse() {
        let (result, _) = run("int a = 0x;");
        assert!(matches!(result, Err(CompileError::Lexical(e)) if e.offset == 8));
    }
}
