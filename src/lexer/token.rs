//! Token model shared by the scanner table, the lexer and the parser driver.
//!
//! Token kinds double as terminal symbol ids of the parser table: id 0 is
//! reserved for epsilon and id 1 for the end-of-input marker `$`.

use std::fmt;

/// Every terminal kind the lexer can produce.
///
/// The discriminants are the numeric ids stored in the scanner's
/// `token_state` vector and used as parser table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TokenKind {
    Dollar = 1,

    // Type keywords
    KwInt = 2,
    KwFloat = 3,
    KwDouble = 4,
    KwLong = 5,
    KwChar = 6,
    KwBool = 7,
    KwString = 8,
    KwVoid = 9,

    // Statement keywords
    KwIf = 10,
    KwElse = 11,
    KwWhile = 12,
    KwDo = 13,
    KwFor = 14,
    KwReturn = 15,
    KwBreak = 16,
    KwContinue = 17,
    KwTrue = 18,
    KwFalse = 19,

    // Punctuation
    Semicolon = 20,
    Comma = 21,
    LBracket = 22,
    RBracket = 23,
    LParen = 24,
    RParen = 25,
    LBrace = 26,
    RBrace = 27,

    // Arithmetic
    Plus = 28,
    Minus = 29,
    Star = 30,
    Slash = 31,
    Percent = 32,

    // Relational and assignment
    EqEq = 33,
    NotEq = 34,
    Lt = 35,
    Le = 36,
    Gt = 37,
    Ge = 38,
    Assign = 39,

    // Logical
    AndAnd = 40,
    OrOr = 41,
    Bang = 42,

    // Bitwise
    Amp = 43,
    Pipe = 44,
    Caret = 45,
    Tilde = 46,
    Shl = 47,
    Shr = 48,

    // Literals and identifiers
    IntLiteral = 49,
    FloatLiteral = 50,
    HexLiteral = 51,
    BinLiteral = 52,
    CharLiteral = 53,
    StringLiteral = 54,
    Ident = 55,
}

/// Number of terminal ids, including epsilon (0)
pub const TERMINAL_COUNT: usize = 56;

impl TokenKind {
    pub const ALL: [TokenKind; TERMINAL_COUNT - 1] = [
        TokenKind::Dollar,
        TokenKind::KwInt,
        TokenKind::KwFloat,
        TokenKind::KwDouble,
        TokenKind::KwLong,
        TokenKind::KwChar,
        TokenKind::KwBool,
        TokenKind::KwString,
        TokenKind::KwVoid,
        TokenKind::KwIf,
        TokenKind::KwElse,
        TokenKind::KwWhile,
        TokenKind::KwDo,
        TokenKind::KwFor,
        TokenKind::KwReturn,
        TokenKind::KwBreak,
        TokenKind::KwContinue,
        TokenKind::KwTrue,
        TokenKind::KwFalse,
        TokenKind::Semicolon,
        TokenKind::Comma,
        TokenKind::LBracket,
        TokenKind::RBracket,
        TokenKind::LParen,
        TokenKind::RParen,
        TokenKind::LBrace,
        TokenKind::RBrace,
        TokenKind::Plus,
        TokenKind::Minus,
        TokenKind::Star,
        TokenKind::Slash,
        TokenKind::Percent,
        TokenKind::EqEq,
        TokenKind::NotEq,
        TokenKind::Lt,
        TokenKind::Le,
        TokenKind::Gt,
        TokenKind::Ge,
        TokenKind::Assign,
        TokenKind::AndAnd,
        TokenKind::OrOr,
        TokenKind::Bang,
        TokenKind::Amp,
        TokenKind::Pipe,
        TokenKind::Caret,
        TokenKind::Tilde,
        TokenKind::Shl,
        TokenKind::Shr,
        TokenKind::IntLiteral,
        TokenKind::FloatLiteral,
        TokenKind::HexLiteral,
        TokenKind::BinLiteral,
        TokenKind::CharLiteral,
        TokenKind::StringLiteral,
        TokenKind::Ident,
    ];

    /// Numeric terminal id
    pub fn id(self) -> usize {
        self as usize
    }

    /// Inverse of [`TokenKind::id`]; `None` for epsilon and unknown ids
    pub fn from_id(id: i32) -> Option<TokenKind> {
        if id < 1 {
            return None;
        }
        Self::ALL.get(id as usize - 1).copied()
    }

    /// Keywords recognized by the scanner, with their kinds
    pub const KEYWORDS: [(&'static str, TokenKind); 18] = [
        ("int", TokenKind::KwInt),
        ("float", TokenKind::KwFloat),
        ("double", TokenKind::KwDouble),
        ("long", TokenKind::KwLong),
        ("char", TokenKind::KwChar),
        ("bool", TokenKind::KwBool),
        ("string", TokenKind::KwString),
        ("void", TokenKind::KwVoid),
        ("if", TokenKind::KwIf),
        ("else", TokenKind::KwElse),
        ("while", TokenKind::KwWhile),
        ("do", TokenKind::KwDo),
        ("for", TokenKind::KwFor),
        ("return", TokenKind::KwReturn),
        ("break", TokenKind::KwBreak),
        ("continue", TokenKind::KwContinue),
        ("true", TokenKind::KwTrue),
        ("false", TokenKind::KwFalse),
    ];

    /// Fixed-spelling operators and punctuation
    pub const OPERATORS: [(&'static str, TokenKind); 29] = [
        (";", TokenKind::Semicolon),
        (",", TokenKind::Comma),
        ("[", TokenKind::LBracket),
        ("]", TokenKind::RBracket),
        ("(", TokenKind::LParen),
        (")", TokenKind::RParen),
        ("{", TokenKind::LBrace),
        ("}", TokenKind::RBrace),
        ("+", TokenKind::Plus),
        ("-", TokenKind::Minus),
        ("*", TokenKind::Star),
        ("/", TokenKind::Slash),
        ("%", TokenKind::Percent),
        ("==", TokenKind::EqEq),
        ("!=", TokenKind::NotEq),
        ("<", TokenKind::Lt),
        ("<=", TokenKind::Le),
        (">", TokenKind::Gt),
        (">=", TokenKind::Ge),
        ("=", TokenKind::Assign),
        ("&&", TokenKind::AndAnd),
        ("||", TokenKind::OrOr),
        ("!", TokenKind::Bang),
        ("&", TokenKind::Amp),
        ("|", TokenKind::Pipe),
        ("^", TokenKind::Caret),
        ("~", TokenKind::Tilde),
        ("<<", TokenKind::Shl),
        (">>", TokenKind::Shr),
    ];

    /// True for the primitive type keywords that start a declaration
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::KwInt
                | TokenKind::KwFloat
                | TokenKind::KwDouble
                | TokenKind::KwLong
                | TokenKind::KwChar
                | TokenKind::KwBool
                | TokenKind::KwString
                | TokenKind::KwVoid
        )
    }

    fn spelling(self) -> Option<&'static str> {
        Self::KEYWORDS
            .iter()
            .chain(Self::OPERATORS.iter())
            .find(|(_, kind)| *kind == self)
            .map(|(text, _)| *text)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.spelling() {
            return write!(f, "'{}'", text);
        }
        match self {
            TokenKind::Dollar => write!(f, "end of input"),
            TokenKind::IntLiteral => write!(f, "integer literal"),
            TokenKind::FloatLiteral => write!(f, "decimal literal"),
            TokenKind::HexLiteral => write!(f, "hexadecimal literal"),
            TokenKind::BinLiteral => write!(f, "binary literal"),
            TokenKind::CharLiteral => write!(f, "char literal"),
            TokenKind::StringLiteral => write!(f, "string literal"),
            TokenKind::Ident => write!(f, "identifier"),
            _ => write!(f, "token #{}", self.id()),
        }
    }
}

/// A token produced by the lexer.
///
/// Immutable once produced; `offset` is the byte offset of the first
/// character of the lexeme in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, offset: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            offset,
        }
    }

    /// End-of-input marker handed to the parser when the lexer is exhausted
    pub fn end_of_input(offset: usize) -> Self {
        Token::new(TokenKind::Dollar, "$", offset)
    }

    /// Value of a decimal, hexadecimal or binary literal; `None` on overflow
    pub fn int_value(&self) -> Option<i64> {
        let text = self.lexeme.as_str();
        match self.kind {
            TokenKind::IntLiteral => text.parse().ok(),
            TokenKind::HexLiteral => i64::from_str_radix(text.get(2..)?, 16).ok(),
            TokenKind::BinLiteral => i64::from_str_radix(text.get(2..)?, 2).ok(),
            _ => None,
        }
    }

    /// Code of a char literal, with `\n \t \r \0 \\ \' \"` escapes decoded
    pub fn char_value(&self) -> Option<u32> {
        if self.kind != TokenKind::CharLiteral {
            return None;
        }
        let inner = self.lexeme.strip_prefix('\'')?.strip_suffix('\'')?;
        let mut chars = inner.chars();
        let value = match chars.next()? {
            '\\' => match chars.next()? {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                other => other,
            },
            c => c,
        };
        chars.next().is_none().then_some(value as u32)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Ident => write!(f, "identifier '{}'", self.lexeme),
            TokenKind::Dollar => write!(f, "end of input"),
            kind if kind.spelling().is_some() => write!(f, "{}", kind),
            kind => write!(f, "{} {}", kind, self.lexeme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip_through_all() {
        for (index, kind) in TokenKind::ALL.iter().enumerate() {
            assert_eq!(kind.id(), index + 1);
            assert_eq!(TokenKind::from_id(kind.id() as i32), Some(*kind));
        }
        assert_eq!(TokenKind::from_id(0), None);
        assert_eq!(TokenKind::from_id(TERMINAL_COUNT as i32), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TokenKind::KwWhile.to_string(), "'while'");
        assert_eq!(TokenKind::Shl.to_string(), "'<<'");
        assert_eq!(Token::new(TokenKind::Ident, "abc", 3).to_string(), "identifier 'abc'");
        assert_eq!(Token::new(TokenKind::IntLiteral, "42", 0).to_string(), "integer literal 42");
    }

    #[test]
    fn test_literal_values() {
        assert_eq!(Token::new(TokenKind::IntLiteral, "42", 0).int_value(), Some(42));
        assert_eq!(Token::new(TokenKind::HexLiteral, "0x2A", 0).int_value(), Some(42));
        assert_eq!(Token::new(TokenKind::BinLiteral, "0b101", 0).int_value(), Some(5));
        assert_eq!(
            Token::new(TokenKind::IntLiteral, "99999999999999999999", 0).int_value(),
            None
        );
        assert_eq!(Token::new(TokenKind::CharLiteral, "'a'", 0).char_value(), Some(97));
        assert_eq!(Token::new(TokenKind::CharLiteral, "'\\n'", 0).char_value(), Some(10));
        assert_eq!(Token::new(TokenKind::CharLiteral, "'ab'", 0).char_value(), None);
    }
}
