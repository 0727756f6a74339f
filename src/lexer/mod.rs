//! Table-driven lexer
//!
//! Walks the [`ScannerTable`] DFA by longest match:
//! - every accepting state visited records a candidate match end
//! - when no transition exists, the cursor rolls back to the last candidate
//! - ignorable matches (whitespace, comments) are skipped
//! - getting stuck in a trap state, or never accepting, is a [`LexicalError`]

pub mod scanner;
pub mod token;

pub use scanner::{scanner_table, ScannerTable};
pub use token::{Token, TokenKind};

use crate::errors::LexicalError;
use scanner::{IGNORE, NON_ACCEPTING, TRAP};

/// Lexer over one source text
pub struct Lexer<'t> {
    table: &'t ScannerTable,
    input: Vec<u8>,
    position: usize,
}

impl<'t> Lexer<'t> {
    pub fn new(table: &'t ScannerTable) -> Self {
        Lexer {
            table,
            input: Vec::new(),
            position: 0,
        }
    }

    /// Store a new source text and reset the cursor to its start
    pub fn set_input(&mut self, input: &str) {
        self.input = input.as_bytes().to_vec();
        self.position = 0;
    }

    /// Byte offset of the cursor
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    /// Next token, or `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>, LexicalError> {
        loop {
            if self.position >= self.input.len() {
                return Ok(None);
            }

            let start = self.position;
            let mut state = 0;
            let mut best: Option<(usize, usize)> = None;
            let mut cursor = start;

            while cursor < self.input.len() {
                match self.table.next_state(state, self.input[cursor]) {
                    Some(next) => {
                        state = next;
                        cursor += 1;
                        if self.table.token_state(state) >= IGNORE {
                            best = Some((cursor, state));
                        }
                    }
                    None => break,
                }
            }

            let stuck_in_trap = self.table.token_state(state) == TRAP;
            let (end, accepted) = match best {
                Some(found) if !stuck_in_trap => found,
                _ => return Err(self.error_at(start, state)),
            };

            self.position = end;
            let kind = self.table.token_state(accepted);
            if kind == IGNORE {
                continue;
            }

            let lexeme = String::from_utf8_lossy(&self.input[start..end]).into_owned();
            return match TokenKind::from_id(kind) {
                Some(kind) => Ok(Some(Token::new(kind, lexeme, start))),
                None => Err(LexicalError::new(
                    format!("scanner state {} yields unknown token kind {}", accepted, kind),
                    start,
                )),
            };
        }
    }

    /// Lex the remaining input into a vector
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexicalError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn error_at(&self, start: usize, state: usize) -> LexicalError {
        let message = self.table.message(state);
        if state == 0 || (message.is_empty() && self.table.token_state(state) == NON_ACCEPTING) {
            let shown = String::from_utf8_lossy(&self.input[start..=start]).into_owned();
            return LexicalError::new(format!("invalid character '{}'", shown.escape_default()), start);
        }
        LexicalError::new(message, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Result<Vec<Token>, LexicalError> {
        let table = scanner_table().expect("scanner table builds");
        let mut lexer = Lexer::new(table);
        lexer.set_input(source);
        lexer.tokenize()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lexes")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = lex("int a, b;").expect("lexes");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], Token::new(TokenKind::KwInt, "int", 0));
        assert_eq!(tokens[1], Token::new(TokenKind::Ident, "a", 4));
        assert_eq!(tokens[2].kind, TokenKind::Comma);
        assert_eq!(tokens[3], Token::new(TokenKind::Ident, "b", 7));
        assert_eq!(tokens[4].offset, 8);
    }

    #[test]
    fn test_maximal_munch() {
        assert_eq!(
            kinds("a<<=b>=c&&d||e!=f"),
            vec![
                TokenKind::Ident,
                TokenKind::Shl,
                TokenKind::Assign,
                TokenKind::Ident,
                TokenKind::Ge,
                TokenKind::Ident,
                TokenKind::AndAnd,
                TokenKind::Ident,
                TokenKind::OrOr,
                TokenKind::Ident,
                TokenKind::NotEq,
                TokenKind::Ident,
            ]
        );
        assert_eq!(kinds("integer"), vec![TokenKind::Ident]);
        assert_eq!(kinds("int eger"), vec![TokenKind::KwInt, TokenKind::Ident]);
    }

    #[test]
    fn test_literals() {
        let tokens = lex("42 0x2A 0b101 1.5 'a' '\\n' \"hi \\\"x\\\"\"").expect("lexes");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLiteral,
                TokenKind::HexLiteral,
                TokenKind::BinLiteral,
                TokenKind::FloatLiteral,
                TokenKind::CharLiteral,
                TokenKind::CharLiteral,
                TokenKind::StringLiteral,
            ]
        );
        assert_eq!(tokens[1].lexeme, "0x2A");
        assert_eq!(tokens[6].lexeme, "\"hi \\\"x\\\"\"");
    }

    #[test]
    fn test_comments_are_ignored() {
        assert_eq!(
            kinds("a // line\n/* block\n * more */ b / c"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Slash, TokenKind::Ident]
        );
    }

    #[test]
    fn test_invalid_character() {
        let err = lex("int @").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("invalid character"));
    }

    #[test]
    fn test_trap_states_do_not_roll_back() {
        let err = lex("a = 0x;").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("hexadecimal"));

        let err = lex("x = 1.;").unwrap_err();
        assert_eq!(err.offset, 4);

        let err = lex("a /* never closed").unwrap_err();
        assert_eq!(err.offset, 2);
        assert!(err.message.contains("block comment"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = lex("s = \"abc\n\";").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("string"));
    }

    #[test]
    fn test_set_input_resets() {
        let table = scanner_table().expect("scanner table builds");
        let mut lexer = Lexer::new(table);
        lexer.set_input("a b");
        assert!(lexer.next_token().expect("lexes").is_some());
        lexer.set_input("c");
        let token = lexer.next_token().expect("lexes").expect("token");
        assert_eq!(token, Token::new(TokenKind::Ident, "c", 0));
        assert_eq!(lexer.next_token().expect("lexes"), None);
    }
}
