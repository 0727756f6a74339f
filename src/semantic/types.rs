//! Primitive type system
//!
//! Numeric types are totally ordered by rank:
//! `bool < char < int < long < float < double`.
//! Binary arithmetic yields the operand type of higher rank; assignment may
//! widen but never narrow.

use crate::lexer::TokenKind;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimType {
    Bool,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,
    Void,
}

impl PrimType {
    pub fn from_keyword(kind: TokenKind) -> Option<PrimType> {
        match kind {
            TokenKind::KwBool => Some(PrimType::Bool),
            TokenKind::KwChar => Some(PrimType::Char),
            TokenKind::KwInt => Some(PrimType::Int),
            TokenKind::KwLong => Some(PrimType::Long),
            TokenKind::KwFloat => Some(PrimType::Float),
            TokenKind::KwDouble => Some(PrimType::Double),
            TokenKind::KwString => Some(PrimType::String),
            TokenKind::KwVoid => Some(PrimType::Void),
            _ => None,
        }
    }

    /// Position in the promotion order; `None` for non-numeric types
    pub fn rank(self) -> Option<u8> {
        match self {
            PrimType::Bool => Some(0),
            PrimType::Char => Some(1),
            PrimType::Int => Some(2),
            PrimType::Long => Some(3),
            PrimType::Float => Some(4),
            PrimType::Double => Some(5),
            PrimType::String | PrimType::Void => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.rank().is_some()
    }

    pub fn is_integer_like(self) -> bool {
        matches!(
            self,
            PrimType::Bool | PrimType::Char | PrimType::Int | PrimType::Long
        )
    }

    /// Whether a value of type `src` may be stored into `self`
    pub fn accepts(self, src: PrimType) -> bool {
        if self == PrimType::Void || src == PrimType::Void {
            return false;
        }
        if self == src {
            return true;
        }
        match (src.rank(), self.rank()) {
            (Some(from), Some(to)) => from <= to,
            _ => false,
        }
    }

    fn promote(a: PrimType, b: PrimType) -> PrimType {
        if a.rank() >= b.rank() {
            a
        } else {
            b
        }
    }
}

impl fmt::Display for PrimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimType::Bool => "bool",
            PrimType::Char => "char",
            PrimType::Int => "int",
            PrimType::Long => "long",
            PrimType::Float => "float",
            PrimType::Double => "double",
            PrimType::String => "string",
            PrimType::Void => "void",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::LogicalOr => "||",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }

    /// Result type of `lhs OP rhs`, or a description of why it is rejected
    pub fn result_type(self, lhs: PrimType, rhs: PrimType) -> Result<PrimType, String> {
        let reject = || {
            Err(format!(
                "operator '{}' cannot be applied to {} and {}",
                self.symbol(),
                lhs,
                rhs
            ))
        };
        if lhs == PrimType::Void || rhs == PrimType::Void {
            return reject();
        }

        match self {
            BinaryOp::Eq | BinaryOp::Ne => Ok(PrimType::Bool),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if lhs == PrimType::String || rhs == PrimType::String {
                    reject()
                } else {
                    Ok(PrimType::Bool)
                }
            }
            BinaryOp::LogicalOr | BinaryOp::LogicalAnd => {
                if lhs == PrimType::Bool && rhs == PrimType::Bool {
                    Ok(PrimType::Bool)
                } else {
                    reject()
                }
            }
            BinaryOp::Add if lhs == PrimType::String && rhs == PrimType::String => {
                Ok(PrimType::String)
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                if lhs.is_numeric() && rhs.is_numeric() {
                    Ok(PrimType::promote(lhs, rhs))
                } else {
                    reject()
                }
            }
            BinaryOp::Mod
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::BitAnd
            | BinaryOp::Shl
            | BinaryOp::Shr => {
                if !lhs.is_integer_like() || !rhs.is_integer_like() {
                    reject()
                } else if lhs == PrimType::Long || rhs == PrimType::Long {
                    Ok(PrimType::Long)
                } else {
                    Ok(PrimType::Int)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }

    pub fn result_type(self, operand: PrimType) -> Result<PrimType, String> {
        let ok = match self {
            UnaryOp::Not => operand == PrimType::Bool,
            UnaryOp::Neg | UnaryOp::Pos => operand.is_numeric(),
            UnaryOp::BitNot => operand.is_integer_like(),
        };
        if ok {
            Ok(operand)
        } else {
            Err(format!(
                "unary operator '{}' cannot be applied to {}",
                self.symbol(),
                operand
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_promotion() {
        use PrimType::*;
        assert_eq!(BinaryOp::Add.result_type(Int, Int), Ok(Int));
        assert_eq!(BinaryOp::Add.result_type(Int, Double), Ok(Double));
        assert_eq!(BinaryOp::Mul.result_type(Char, Long), Ok(Long));
        assert_eq!(BinaryOp::Sub.result_type(Float, Bool), Ok(Float));
        assert_eq!(BinaryOp::Mod.result_type(Char, Int), Ok(Int));
        assert_eq!(BinaryOp::Mod.result_type(Long, Bool), Ok(Long));
        assert!(BinaryOp::Mod.result_type(Int, Float).is_err());
    }

    #[test]
    fn test_strings() {
        use PrimType::*;
        assert_eq!(BinaryOp::Add.result_type(String, String), Ok(String));
        assert!(BinaryOp::Add.result_type(String, Int).is_err());
        assert!(BinaryOp::Sub.result_type(String, String).is_err());
        assert!(BinaryOp::Lt.result_type(String, String).is_err());
        assert_eq!(BinaryOp::Eq.result_type(String, String), Ok(Bool));
    }

    #[test]
    fn test_logical_requires_bool() {
        use PrimType::*;
        assert_eq!(BinaryOp::LogicalAnd.result_type(Bool, Bool), Ok(Bool));
        assert!(BinaryOp::LogicalOr.result_type(Bool, Int).is_err());
        assert_eq!(UnaryOp::Not.result_type(Bool), Ok(Bool));
        assert!(UnaryOp::Not.result_type(Int).is_err());
        assert_eq!(UnaryOp::Neg.result_type(Double), Ok(Double));
        assert!(UnaryOp::Neg.result_type(String).is_err());
        assert_eq!(UnaryOp::BitNot.result_type(Char), Ok(Char));
    }

    #[test]
    fn test_assignability() {
        use PrimType::*;
        assert!(Int.accepts(Int));
        assert!(Double.accepts(Int));
        assert!(Long.accepts(Char));
        assert!(!Int.accepts(Double));
        assert!(!Int.accepts(String));
        assert!(String.accepts(String));
        assert!(!Void.accepts(Void));
    }
}
