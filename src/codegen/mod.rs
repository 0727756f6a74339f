//! BIP code generation
//!
//! [`CodeGenerator`] has two halves:
//! - `.data`: built from the final [`SymbolTable`]; one line per global
//!   variable or array, with a collision-free label
//! - `.text`: a buffer of [`Line`]s filled through the `emit_*` primitives,
//!   either by the semantic actions or by [`patterns`]
//!
//! The generated program is stack-based: `LDI` pushes, `LD`/`STO` take the
//! address from the stack and add their immediate offset, binary operators
//! pop two values and push one.

pub mod instr;
pub mod patterns;

pub use instr::{Line, Mnemonic, Operand};

use crate::config::CodegenConfig;
use crate::semantic::symbols::{SymbolId, SymbolKind, SymbolScope, SymbolTable};
use crate::semantic::types::{BinaryOp, UnaryOp};
use rustc_hash::{FxHashMap, FxHashSet};

/// A scalar or a constant-index array element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Scalar(SymbolId),
    Element(SymbolId, i64),
}

/// Operand of a three-address assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Symbol(SymbolId),
    Literal(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntry {
    pub symbol: SymbolId,
    pub label: String,
    pub cells: usize,
}

/// Storage assignment for the globals of one program
#[derive(Debug, Clone, Default)]
pub struct DataLayout {
    pub entries: Vec<DataEntry>,
    pub labels: FxHashMap<SymbolId, String>,
}

#[derive(Debug, Clone)]
pub struct CodeGenerator {
    options: CodegenConfig,
    text: Vec<Line>,
    label_counter: usize,
}

fn sanitize_label(name: &str) -> String {
    let label: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if label.is_empty() {
        "sym".to_string()
    } else {
        label
    }
}

impl CodeGenerator {
    pub fn new(options: CodegenConfig) -> Self {
        CodeGenerator {
            options,
            text: Vec::new(),
            label_counter: 0,
        }
    }

    pub fn options(&self) -> &CodegenConfig {
        &self.options
    }

    // ========== .data ==========

    /// Choose a label and a cell count for every global variable and array
    pub fn data_layout(&self, symbols: &SymbolTable) -> DataLayout {
        let mut candidates: Vec<_> = symbols
            .iter()
            .filter(|s| s.scope == SymbolScope::Global)
            .filter(|s| matches!(s.kind, SymbolKind::Variable | SymbolKind::Array))
            .collect();
        if self.options.sort_by_name {
            candidates.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let mut taken = self.reserved_labels();
        let mut layout = DataLayout::default();
        for symbol in candidates {
            let base = sanitize_label(&symbol.name);
            let mut label = base.clone();
            let mut suffix = 1;
            while taken.contains(&label) {
                label = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            taken.insert(label.clone());
            layout.labels.insert(symbol.id, label.clone());
            layout.entries.push(DataEntry {
                symbol: symbol.id,
                label,
                cells: symbol.cells(),
            });
        }
        layout
    }

    pub fn build_data_section(&self, symbols: &SymbolTable) -> String {
        self.render_data(symbols, &self.data_layout(symbols))
    }

    fn render_data(&self, symbols: &SymbolTable, layout: &DataLayout) -> String {
        let mut out = String::from(".data\n");
        for entry in &layout.entries {
            out.push_str(&entry.label);
            out.push_str(" :");
            for _ in 0..entry.cells {
                out.push_str(" 0");
            }
            if self.options.annotate_types {
                out.push_str(&format!("   ; {}", symbols.get(entry.symbol).ty));
                if entry.cells > 1 {
                    out.push_str(&format!(" [{}]", entry.cells));
                }
            }
            out.push('\n');
        }
        out.push('\n');
        out
    }

    /// Labels the text section already uses, which data labels must avoid
    fn reserved_labels(&self) -> FxHashSet<String> {
        let mut reserved = FxHashSet::default();
        reserved.insert(self.options.entry_label.clone());
        for line in &self.text {
            match line {
                Line::Label(label) | Line::Instr(_, Some(Operand::Label(label))) => {
                    reserved.insert(label.clone());
                }
                _ => {}
            }
        }
        reserved
    }

    // ========== .text primitives ==========

    pub fn clear_text(&mut self) {
        self.text.clear();
    }

    pub fn text(&self) -> &[Line] {
        &self.text
    }

    pub fn emit(&mut self, mnemonic: Mnemonic, operand: Option<Operand>) {
        self.text.push(Line::Instr(mnemonic, operand));
    }

    /// Raw instruction line, emitted as written
    pub fn emit_instr(&mut self, instr: &str) {
        self.text.push(Line::Raw(instr.to_string()));
    }

    pub fn emit_label(&mut self, label: &str) {
        self.text.push(Line::Label(sanitize_label(label)));
    }

    pub fn new_label(&mut self, prefix: &str) -> String {
        self.label_counter += 1;
        format!("{}{}", sanitize_label(prefix), self.label_counter)
    }

    /// Position in the text buffer, for a later [`CodeGenerator::take_since`]
    pub fn mark(&self) -> usize {
        self.text.len()
    }

    /// Remove and return everything emitted since `mark`
    pub fn take_since(&mut self, mark: usize) -> Vec<Line> {
        let mark = mark.min(self.text.len());
        self.text.split_off(mark)
    }

    pub fn append(&mut self, lines: Vec<Line>) {
        self.text.extend(lines);
    }

    pub fn emit_load_imm(&mut self, value: impl std::fmt::Display) {
        self.emit(Mnemonic::Ldi, Some(Operand::imm(value)));
    }

    pub fn emit_load_id(&mut self, symbol: SymbolId) {
        self.emit_load_id_offset(symbol, 0);
    }

    pub fn emit_store_id(&mut self, symbol: SymbolId) {
        self.emit_store_id_offset(symbol, 0);
    }

    pub fn emit_load_id_offset(&mut self, symbol: SymbolId, offset: i64) {
        self.emit(Mnemonic::Ldi, Some(Operand::Symbol(symbol)));
        self.emit(Mnemonic::Ld, Some(Operand::imm(offset)));
    }

    pub fn emit_store_id_offset(&mut self, symbol: SymbolId, offset: i64) {
        self.emit(Mnemonic::Ldi, Some(Operand::Symbol(symbol)));
        self.emit(Mnemonic::Sto, Some(Operand::imm(offset)));
    }

    /// Load `symbol[index]` with the index on top of the stack
    pub fn emit_load_id_indexed(&mut self, symbol: SymbolId) {
        self.emit(Mnemonic::Pop, Some(Operand::IndexRegister));
        self.emit(Mnemonic::Ldv, Some(Operand::Symbol(symbol)));
    }

    /// Store into `symbol[index]` with the index on top of the value
    pub fn emit_store_id_indexed(&mut self, symbol: SymbolId) {
        self.emit(Mnemonic::Pop, Some(Operand::IndexRegister));
        self.emit(Mnemonic::Stov, Some(Operand::Symbol(symbol)));
    }

    pub fn emit_add(&mut self) {
        self.emit(Mnemonic::Add, None);
    }

    pub fn emit_sub(&mut self) {
        self.emit(Mnemonic::Sub, None);
    }

    pub fn emit_mul(&mut self) {
        self.emit(Mnemonic::Mul, None);
    }

    pub fn emit_div(&mut self) {
        self.emit(Mnemonic::Div, None);
    }

    pub fn emit_mod(&mut self) {
        self.emit(Mnemonic::Mod, None);
    }

    pub fn emit_and(&mut self) {
        self.emit(Mnemonic::And, None);
    }

    pub fn emit_or(&mut self) {
        self.emit(Mnemonic::Or, None);
    }

    pub fn emit_xor(&mut self) {
        self.emit(Mnemonic::Xor, None);
    }

    pub fn emit_not(&mut self) {
        self.emit(Mnemonic::Not, None);
    }

    pub fn emit_shl(&mut self) {
        self.emit(Mnemonic::Shl, None);
    }

    pub fn emit_shr(&mut self) {
        self.emit(Mnemonic::Shr, None);
    }

    pub fn emit_jmp(&mut self, label: &str) {
        self.emit(Mnemonic::Jmp, Some(Operand::Label(label.to_string())));
    }

    pub fn emit_jz(&mut self, label: &str) {
        self.emit(Mnemonic::Jz, Some(Operand::Label(label.to_string())));
    }

    pub fn emit_jn(&mut self, label: &str) {
        self.emit(Mnemonic::Jn, Some(Operand::Label(label.to_string())));
    }

    /// Lower a binary operator whose operands are already on the stack.
    /// Comparisons leave 0 or 1.
    pub fn emit_binary(&mut self, op: BinaryOp) {
        match op {
            BinaryOp::Add => self.emit_add(),
            BinaryOp::Sub => self.emit_sub(),
            BinaryOp::Mul => self.emit_mul(),
            BinaryOp::Div => self.emit_div(),
            BinaryOp::Mod => self.emit_mod(),
            BinaryOp::BitAnd | BinaryOp::LogicalAnd => self.emit_and(),
            BinaryOp::BitOr | BinaryOp::LogicalOr => self.emit_or(),
            BinaryOp::BitXor => self.emit_xor(),
            BinaryOp::Shl => self.emit_shl(),
            BinaryOp::Shr => self.emit_shr(),
            BinaryOp::Eq => self.emit_compare(false, Mnemonic::Jz, true),
            BinaryOp::Ne => self.emit_compare(false, Mnemonic::Jz, false),
            BinaryOp::Lt => self.emit_compare(false, Mnemonic::Jn, true),
            BinaryOp::Ge => self.emit_compare(false, Mnemonic::Jn, false),
            BinaryOp::Gt => self.emit_compare(true, Mnemonic::Jn, true),
            BinaryOp::Le => self.emit_compare(true, Mnemonic::Jn, false),
        }
    }

    /// `a - b` (or `b - a` when `swap`), then branch on it: the result is
    /// `when_taken` if the branch fires and its negation otherwise
    fn emit_compare(&mut self, swap: bool, branch: Mnemonic, when_taken: bool) {
        self.emit_sub();
        if swap {
            self.emit_load_imm(-1);
            self.emit_mul();
        }
        let taken = self.new_label("L");
        let end = self.new_label("L");
        self.emit(branch, Some(Operand::Label(taken.clone())));
        self.emit_load_imm(u8::from(!when_taken));
        self.emit_jmp(&end);
        self.emit_label(&taken);
        self.emit_load_imm(u8::from(when_taken));
        self.emit_label(&end);
    }

    pub fn emit_unary(&mut self, op: UnaryOp) {
        match op {
            UnaryOp::Pos => {}
            UnaryOp::Neg => {
                self.emit_load_imm(-1);
                self.emit_mul();
            }
            UnaryOp::Not => {
                self.emit_load_imm(1);
                self.emit_xor();
            }
            UnaryOp::BitNot => self.emit_not(),
        }
    }

    // ========== assignments ==========

    fn emit_load_access(&mut self, access: Access) {
        match access {
            Access::Scalar(symbol) => self.emit_load_id(symbol),
            Access::Element(symbol, index) => self.emit_load_id_offset(symbol, index),
        }
    }

    fn emit_store_access(&mut self, access: Access) {
        match access {
            Access::Scalar(symbol) => self.emit_store_id(symbol),
            Access::Element(symbol, index) => self.emit_store_id_offset(symbol, index),
        }
    }

    fn emit_load_value(&mut self, value: Value) {
        match value {
            Value::Symbol(symbol) => self.emit_load_id(symbol),
            Value::Literal(literal) => self.emit_load_imm(literal),
        }
    }

    /// `dest = src` for scalars and constant-index elements
    pub fn emit_assign(&mut self, dest: Access, src: Access) {
        self.emit_load_access(src);
        self.emit_store_access(dest);
    }

    /// `dest = value` for an integer constant
    pub fn emit_assign_imm(&mut self, dest: Access, value: i64) {
        self.emit_load_imm(value);
        self.emit_store_access(dest);
    }

    /// `dest[index] = src` with `index` a variable
    pub fn emit_assign_var_index(&mut self, dest: SymbolId, index: SymbolId, src: Access) {
        self.emit_load_access(src);
        self.emit_load_id(index);
        self.emit_store_id_indexed(dest);
    }

    /// `dest = lhs OP rhs`
    pub fn emit_assign_simple_expr(&mut self, dest: SymbolId, lhs: Value, op: BinaryOp, rhs: Value) {
        self.emit_load_value(lhs);
        self.emit_load_value(rhs);
        self.emit_binary(op);
        self.emit_store_id(dest);
    }

    // ========== program ==========

    pub fn build_text_section(&self, labels: &FxHashMap<SymbolId, String>) -> String {
        let mut out = format!(".text\n{}:\n", self.options.entry_label);
        for line in &self.text {
            out.push_str(&line.render(labels));
            out.push('\n');
        }
        out.push_str("    HLT 0\n");
        out
    }

    /// `.data` followed by `.text`, sharing one label assignment
    pub fn build_program(&self, symbols: &SymbolTable) -> String {
        let layout = self.data_layout(symbols);
        let mut program = self.render_data(symbols, &layout);
        program.push_str(&self.build_text_section(&layout.labels));
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::types::PrimType;

    fn globals(names: &[&str]) -> (SymbolTable, Vec<SymbolId>) {
        let mut table = SymbolTable::new();
        let ids = names
            .iter()
            .map(|name| {
                table.insert(name, PrimType::Int, SymbolKind::Variable, SymbolScope::Global, 0)
            })
            .collect();
        (table, ids)
    }

    #[test]
    fn test_data_section_sorted_and_collision_free() {
        let (mut table, _) = globals(&["b", "a", "a"]);
        let v = table.insert("v", PrimType::Int, SymbolKind::Array, SymbolScope::Global, 0);
        table.get_mut(v).array_length = Some(3);
        table.insert("f", PrimType::Int, SymbolKind::Function, SymbolScope::Global, 0);
        table.insert(
            "p",
            PrimType::Int,
            SymbolKind::Parameter,
            SymbolScope::Function("f".into()),
            0,
        );

        let gen = CodeGenerator::new(CodegenConfig::default());
        assert_eq!(
            gen.build_data_section(&table),
            ".data\na : 0\na_1 : 0\nb : 0\nv : 0 0 0\n\n"
        );
    }

    #[test]
    fn test_data_section_annotations_and_creation_order() {
        let (mut table, _) = globals(&["z", "a"]);
        let v = table.insert("v", PrimType::Char, SymbolKind::Array, SymbolScope::Global, 0);
        table.get_mut(v).array_length = Some(2);
        let gen = CodeGenerator::new(CodegenConfig {
            sort_by_name: false,
            annotate_types: true,
            ..CodegenConfig::default()
        });
        assert_eq!(
            gen.build_data_section(&table),
            ".data\nz : 0   ; int\na : 0   ; int\nv : 0 0   ; char [2]\n\n"
        );
    }

    #[test]
    fn test_data_labels_avoid_code_labels() {
        let (table, ids) = globals(&["L1"]);
        let mut gen = CodeGenerator::new(CodegenConfig::default());
        let label = gen.new_label("L");
        gen.emit_label(&label);
        gen.emit_load_id(ids[0]);
        let program = gen.build_program(&table);
        assert!(program.contains("L1_1 : 0\n"));
        assert!(program.contains("    LDI L1_1\n"));
    }

    #[test]
    fn test_simple_expression_assignment() {
        let (table, ids) = globals(&["a", "b", "c"]);
        let mut gen = CodeGenerator::new(CodegenConfig::default());
        gen.emit_assign_simple_expr(ids[0], Value::Symbol(ids[1]), BinaryOp::Add, Value::Literal(2));
        assert_eq!(
            gen.build_program(&table),
            ".data\na : 0\nb : 0\nc : 0\n\n.text\n_PRINCIPAL:\n    LDI b\n    LD 0\n    LDI 2\n    ADD\n    LDI a\n    STO 0\n    HLT 0\n"
        );
    }

    #[test]
    fn test_assign_with_variable_index() {
        let (mut table, ids) = globals(&["i", "s"]);
        let v = table.insert("v", PrimType::Int, SymbolKind::Array, SymbolScope::Global, 0);
        let mut gen = CodeGenerator::new(CodegenConfig::default());
        gen.emit_assign_var_index(v, ids[0], Access::Scalar(ids[1]));
        let labels = gen.data_layout(&table).labels;
        let text: Vec<_> = gen.text().iter().map(|l| l.render(&labels)).collect();
        assert_eq!(
            text,
            [
                "    LDI s",
                "    LD 0",
                "    LDI i",
                "    LD 0",
                "    POP $indr",
                "    STOV v"
            ]
        );
    }

    #[test]
    fn test_comparison_lowering() {
        let mut gen = CodeGenerator::new(CodegenConfig::default());
        gen.emit_binary(BinaryOp::Gt);
        let labels = FxHashMap::default();
        let text: Vec<_> = gen.text().iter().map(|l| l.render(&labels)).collect();
        assert_eq!(
            text,
            [
                "    SUB",
                "    LDI -1",
                "    MUL",
                "    JN L1",
                "    LDI 0",
                "    JMP L2",
                "L1:",
                "    LDI 1",
                "L2:"
            ]
        );
    }

    #[test]
    fn test_take_since_moves_code() {
        let mut gen = CodeGenerator::new(CodegenConfig::default());
        gen.emit_add();
        let mark = gen.mark();
        gen.emit_sub();
        gen.emit_mul();
        let taken = gen.take_since(mark);
        assert_eq!(taken.len(), 2);
        assert_eq!(gen.text().len(), 1);
        gen.append(taken);
        assert_eq!(gen.text().len(), 3);
    }
}
