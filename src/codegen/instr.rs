//! BIP instruction model

use crate::semantic::symbols::SymbolId;
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Ld,
    Ldi,
    Sto,
    Ldv,
    Stov,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,
    Jmp,
    Jz,
    Jn,
    Push,
    Pop,
    Hlt,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Mnemonic::Ld => "LD",
            Mnemonic::Ldi => "LDI",
            Mnemonic::Sto => "STO",
            Mnemonic::Ldv => "LDV",
            Mnemonic::Stov => "STOV",
            Mnemonic::Add => "ADD",
            Mnemonic::Sub => "SUB",
            Mnemonic::Mul => "MUL",
            Mnemonic::Div => "DIV",
            Mnemonic::Mod => "MOD",
            Mnemonic::And => "AND",
            Mnemonic::Or => "OR",
            Mnemonic::Xor => "XOR",
            Mnemonic::Not => "NOT",
            Mnemonic::Shl => "SHL",
            Mnemonic::Shr => "SHR",
            Mnemonic::Jmp => "JMP",
            Mnemonic::Jz => "JZ",
            Mnemonic::Jn => "JN",
            Mnemonic::Push => "PUSH",
            Mnemonic::Pop => "POP",
            Mnemonic::Hlt => "HLT",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A generated code label
    Label(String),
    /// The storage label of a global, resolved when the text is rendered
    Symbol(SymbolId),
    /// Immediate value, already in its printed form
    Imm(String),
    IndexRegister,
}

impl Operand {
    pub fn imm(value: impl fmt::Display) -> Operand {
        Operand::Imm(value.to_string())
    }
}

/// One line of the `.text` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Label(String),
    Instr(Mnemonic, Option<Operand>),
    Raw(String),
}

impl Line {
    /// Integer immediate pushed by a lone `LDI`, if that is what this line is
    pub fn as_int_immediate(&self) -> Option<i64> {
        match self {
            Line::Instr(Mnemonic::Ldi, Some(Operand::Imm(text))) => text.parse().ok(),
            _ => None,
        }
    }

    /// Render with symbol labels from `labels`; unknown symbols print as `?<id>`
    pub fn render(&self, labels: &FxHashMap<SymbolId, String>) -> String {
        match self {
            Line::Label(label) => format!("{}:", label),
            Line::Raw(text) if text.ends_with(':') => text.clone(),
            Line::Raw(text) => format!("    {}", text),
            Line::Instr(mnemonic, None) => format!("    {}", mnemonic),
            Line::Instr(mnemonic, Some(operand)) => {
                let operand = match operand {
                    Operand::Label(label) => label.clone(),
                    Operand::Symbol(id) => labels
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| format!("?{}", id.0)),
                    Operand::Imm(value) => value.clone(),
                    Operand::IndexRegister => "$indr".to_string(),
                };
                format!("    {} {}", mnemonic, operand)
            }
        }
    }
}
