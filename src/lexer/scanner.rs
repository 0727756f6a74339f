//! Scanner table: the DFA the lexer walks
//!
//! The table is a dense `states x 256` transition matrix plus two per-state
//! vectors:
//! - `token_state[s]`: `-1` non-accepting, `0` ignorable, `-2` trap, `>0` token kind
//! - `messages[s]`: diagnostic reported when the lexer gets stuck in `s`
//!
//! [`ScannerTable::build`] derives the table for the `bipc` language. The
//! built table is cached process-wide by [`scanner_table`].

use super::token::{TokenKind, TERMINAL_COUNT};
use crate::errors::TableError;
use std::sync::OnceLock;

pub const NO_TRANSITION: i32 = -1;
pub const NON_ACCEPTING: i32 = -1;
pub const IGNORE: i32 = 0;
pub const TRAP: i32 = -2;

const START: usize = 0;

/// Read-only DFA description consumed by [`super::Lexer`]
#[derive(Debug, Clone)]
pub struct ScannerTable {
    transitions: Vec<i32>,
    token_state: Vec<i32>,
    messages: Vec<String>,
}

impl ScannerTable {
    /// Wrap raw table data, checking its shape and every transition target
    pub fn new(
        transitions: Vec<i32>,
        token_state: Vec<i32>,
        messages: Vec<String>,
    ) -> Result<Self, TableError> {
        let states = token_state.len();
        if states == 0 {
            return Err(TableError::Malformed("scanner table has no states".into()));
        }
        if transitions.len() != states * 256 {
            return Err(TableError::Malformed(format!(
                "scanner table has {} transitions, expected {}",
                transitions.len(),
                states * 256
            )));
        }
        if messages.len() != states {
            return Err(TableError::Malformed(format!(
                "scanner table has {} messages for {} states",
                messages.len(),
                states
            )));
        }
        for (index, &target) in transitions.iter().enumerate() {
            if target < NO_TRANSITION || target >= states as i32 {
                return Err(TableError::OutOfRange {
                    state: index / 256,
                    column: index % 256,
                    target,
                    limit: states,
                });
            }
        }
        for (state, &kind) in token_state.iter().enumerate() {
            if kind < TRAP || kind >= TERMINAL_COUNT as i32 || kind == 1 {
                return Err(TableError::Malformed(format!(
                    "state {} carries invalid token kind {}",
                    state, kind
                )));
            }
        }
        Ok(ScannerTable {
            transitions,
            token_state,
            messages,
        })
    }

    pub fn state_count(&self) -> usize {
        self.token_state.len()
    }

    /// Next state, or `None` when the table has no transition
    pub fn next_state(&self, state: usize, byte: u8) -> Option<usize> {
        let target = self.transitions[state * 256 + byte as usize];
        if target < 0 {
            None
        } else {
            Some(target as usize)
        }
    }

    pub fn token_state(&self, state: usize) -> i32 {
        self.token_state[state]
    }

    pub fn message(&self, state: usize) -> &str {
        &self.messages[state]
    }

    /// Derive the scanner table for the `bipc` token set
    pub fn build() -> Result<Self, TableError> {
        let mut dfa = DfaBuilder::new();
        dfa.add_whitespace();
        dfa.add_words();
        dfa.add_operators();
        dfa.add_comments();
        dfa.add_numbers();
        dfa.add_quoted(b'\'', TokenKind::CharLiteral, "char");
        dfa.add_quoted(b'"', TokenKind::StringLiteral, "string");
        dfa.finish()
    }
}

/// The cached scanner table for the `bipc` language
pub fn scanner_table() -> Result<&'static ScannerTable, TableError> {
    static TABLE: OnceLock<Result<ScannerTable, TableError>> = OnceLock::new();
    TABLE
        .get_or_init(ScannerTable::build)
        .as_ref()
        .map_err(Clone::clone)
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_word_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

struct DfaBuilder {
    rows: Vec<[i32; 256]>,
    token_state: Vec<i32>,
    messages: Vec<String>,
}

impl DfaBuilder {
    fn new() -> Self {
        let mut dfa = DfaBuilder {
            rows: Vec::new(),
            token_state: Vec::new(),
            messages: Vec::new(),
        };
        dfa.add_state(NON_ACCEPTING, "invalid character");
        dfa
    }

    fn add_state(&mut self, kind: i32, message: &str) -> usize {
        self.rows.push([NO_TRANSITION; 256]);
        self.token_state.push(kind);
        self.messages.push(message.to_string());
        self.rows.len() - 1
    }

    fn set(&mut self, from: usize, byte: u8, to: usize) {
        self.rows[from][byte as usize] = to as i32;
    }

    fn set_where(&mut self, from: usize, to: usize, pred: impl Fn(u8) -> bool) {
        for byte in 0..=255u8 {
            if pred(byte) {
                self.set(from, byte, to);
            }
        }
    }

    fn target(&self, from: usize, byte: u8) -> Option<usize> {
        let target = self.rows[from][byte as usize];
        (target >= 0).then_some(target as usize)
    }

    fn add_whitespace(&mut self) {
        let ws = self.add_state(IGNORE, "");
        let pred = |b: u8| matches!(b, b' ' | b'\t' | b'\r' | b'\n');
        self.set_where(START, ws, pred);
        self.set_where(ws, ws, pred);
    }

    /// Identifiers, with a keyword trie laid over the identifier automaton
    fn add_words(&mut self) {
        let ident = self.add_state(TokenKind::Ident.id() as i32, "");
        self.set_where(START, ident, is_word_start);
        self.set_where(ident, ident, is_word_byte);

        for (word, kind) in TokenKind::KEYWORDS {
            let mut state = START;
            for &byte in word.as_bytes() {
                state = match self.target(state, byte) {
                    Some(next) if next != ident => next,
                    _ => {
                        let node = self.add_state(TokenKind::Ident.id() as i32, "");
                        self.set_where(node, ident, is_word_byte);
                        self.set(state, byte, node);
                        node
                    }
                };
            }
            self.token_state[state] = kind.id() as i32;
        }
    }

    fn add_operators(&mut self) {
        for (text, kind) in TokenKind::OPERATORS {
            let mut state = START;
            for &byte in text.as_bytes() {
                state = match self.target(state, byte) {
                    Some(next) => next,
                    None => {
                        let node = self.add_state(NON_ACCEPTING, "incomplete operator");
                        self.set(state, byte, node);
                        node
                    }
                };
            }
            self.token_state[state] = kind.id() as i32;
        }
    }

    /// `//` and `/* */`, hung off the `/` operator state
    fn add_comments(&mut self) {
        let Some(slash) = self.target(START, b'/') else {
            return;
        };

        let line = self.add_state(IGNORE, "");
        self.set(slash, b'/', line);
        self.set_where(line, line, |b| b != b'\n');

        let body = self.add_state(TRAP, "unterminated block comment");
        let star = self.add_state(TRAP, "unterminated block comment");
        let done = self.add_state(IGNORE, "");
        self.set(slash, b'*', body);
        self.set_where(body, body, |b| b != b'*');
        self.set(body, b'*', star);
        self.set_where(star, body, |b| b != b'*' && b != b'/');
        self.set(star, b'*', star);
        self.set(star, b'/', done);
    }

    fn add_numbers(&mut self) {
        let int = TokenKind::IntLiteral.id() as i32;
        let zero = self.add_state(int, "");
        let decimal = self.add_state(int, "");
        let dot = self.add_state(TRAP, "expected digits after '.'");
        let fraction = self.add_state(TokenKind::FloatLiteral.id() as i32, "");
        let hex_prefix = self.add_state(TRAP, "expected hexadecimal digits after '0x'");
        let hex = self.add_state(TokenKind::HexLiteral.id() as i32, "");
        let bin_prefix = self.add_state(TRAP, "expected binary digits after '0b'");
        let bin = self.add_state(TokenKind::BinLiteral.id() as i32, "");

        self.set(START, b'0', zero);
        self.set_where(START, decimal, |b| (b'1'..=b'9').contains(&b));
        self.set_where(zero, decimal, |b| b.is_ascii_digit());
        self.set_where(decimal, decimal, |b| b.is_ascii_digit());

        self.set(zero, b'.', dot);
        self.set(decimal, b'.', dot);
        self.set_where(dot, fraction, |b| b.is_ascii_digit());
        self.set_where(fraction, fraction, |b| b.is_ascii_digit());

        self.set(zero, b'x', hex_prefix);
        self.set(zero, b'X', hex_prefix);
        self.set_where(hex_prefix, hex, |b| b.is_ascii_hexdigit());
        self.set_where(hex, hex, |b| b.is_ascii_hexdigit());

        self.set(zero, b'b', bin_prefix);
        self.set(zero, b'B', bin_prefix);
        self.set_where(bin_prefix, bin, |b| b == b'0' || b == b'1');
        self.set_where(bin, bin, |b| b == b'0' || b == b'1');
    }

    /// Char and string literals: a body, a backslash escape state and a close
    fn add_quoted(&mut self, quote: u8, kind: TokenKind, what: &str) {
        let message = format!("unterminated {} literal", what);
        let body = self.add_state(NON_ACCEPTING, &message);
        let escape = self.add_state(NON_ACCEPTING, &message);
        let done = self.add_state(kind.id() as i32, "");

        self.set(START, quote, body);
        self.set_where(body, body, |b| b != quote && b != b'\\' && b != b'\n');
        self.set(body, b'\\', escape);
        self.set(body, quote, done);
        self.set_where(escape, body, |b| b != b'\n');
    }

    fn finish(self) -> Result<ScannerTable, TableError> {
        let transitions = self.rows.iter().flat_map(|row| row.iter().copied()).collect();
        ScannerTable::new(transitions, self.token_state, self.messages)
    }
}
