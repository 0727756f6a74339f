//! Assignments and control flow
//!
//! Loop and branch frames hold the labels the lowered code jumps to. The
//! frames are pushed even when nothing is lowered, since `break` and
//! `continue` are checked against them.

use super::symbols::SymbolKind;
use super::types::PrimType;
use super::{BranchFrame, LoopFrame, PendingAssignment, SemanticAnalyzer};
use crate::errors::SemanticError;
use crate::lexer::Token;

impl SemanticAnalyzer {
    // ========== assignment ==========

    /// Left-hand side of an assignment. The target is not marked used.
    pub(super) fn assign_target(&mut self, token: &Token, indexed: bool) -> Result<(), SemanticError> {
        let id = self.lookup_or_fail(token)?;
        let kind = self.symbols.get(id).kind;
        let message = match (kind, indexed) {
            (SymbolKind::Array, true)
            | (SymbolKind::Variable, false)
            | (SymbolKind::Parameter, false) => None,
            (_, true) => Some(format!("'{}' is not an array", token.lexeme)),
            (SymbolKind::Array, false) => Some(format!(
                "array '{}' cannot be assigned without an index",
                token.lexeme
            )),
            (_, false) => Some(format!("{} '{}' cannot be assigned", kind, token.lexeme)),
        };
        if let Some(message) = message {
            return Err(SemanticError::new(message, token.offset));
        }

        let index_mark = self.lower().map_or(0, |gen| gen.mark());
        self.pending = Some(PendingAssignment {
            target: id,
            offset: token.offset,
            indexed,
            index_mark,
            index_code: Vec::new(),
        });
        Ok(())
    }

    /// `]` of an indexed target: set the index code aside until the value
    /// has been computed
    pub(super) fn assign_index(&mut self, token: &Token) -> Result<(), SemanticError> {
        self.check_index_type(token)?;
        let mark = match &self.pending {
            Some(pending) => pending.index_mark,
            None => return Err(SemanticError::new("index without an assignment", token.offset)),
        };
        let code = self.lower().map(|gen| gen.take_since(mark)).unwrap_or_default();
        if let Some(pending) = self.pending.as_mut() {
            pending.index_code = code;
        }
        Ok(())
    }

    /// Close the pending assignment: check the value against the target
    /// type, mark the target initialized and store the value
    pub fn check_pending_assignment(&mut self, offset: usize) -> Result<(), SemanticError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| SemanticError::new("assignment without a target", offset))?;
        let value = self.pop_type(offset)?;
        let target = self.symbols.get_mut(pending.target);
        if !target.ty.accepts(value) {
            return Err(SemanticError::new(
                format!(
                    "type mismatch: cannot assign {} to '{}' of type {}",
                    value, target.name, target.ty
                ),
                pending.offset,
            ));
        }
        target.initialized = true;

        if let Some(gen) = self.lower() {
            if !pending.indexed {
                gen.emit_store_id(pending.target);
                return Ok(());
            }
            let constant = match pending.index_code.as_slice() {
                [line] => line.as_int_immediate(),
                _ => None,
            };
            match constant {
                Some(index) => gen.emit_store_id_offset(pending.target, index),
                None => {
                    gen.append(pending.index_code);
                    gen.emit_store_id_indexed(pending.target);
                }
            }
        }
        Ok(())
    }

    fn check_condition(&mut self, token: &Token) -> Result<(), SemanticError> {
        let ty = self.pop_type(token.offset)?;
        if ty != PrimType::Bool && !ty.is_integer_like() {
            return Err(SemanticError::new(
                format!("condition must be bool or an integer, found {}", ty),
                token.offset,
            ));
        }
        Ok(())
    }

    // ========== if / else ==========

    pub(super) fn if_condition(&mut self, token: &Token) -> Result<(), SemanticError> {
        self.check_condition(token)?;
        let else_label = self.lower().map(|gen| {
            let label = gen.new_label("L");
            gen.emit_jz(&label);
            label
        });
        self.branches.push(BranchFrame {
            else_label,
            end_label: None,
        });
        Ok(())
    }

    pub(super) fn else_branch(&mut self) {
        let Some(mut frame) = self.branches.pop() else {
            return;
        };
        if let Some(gen) = self.lower() {
            let end = gen.new_label("L");
            gen.emit_jmp(&end);
            if let Some(else_label) = frame.else_label.take() {
                gen.emit_label(&else_label);
            }
            frame.end_label = Some(end);
        }
        self.branches.push(frame);
    }

    pub(super) fn end_if(&mut self) {
        let Some(frame) = self.branches.pop() else {
            return;
        };
        if let Some(gen) = self.lower() {
            for label in [frame.else_label, frame.end_label].into_iter().flatten() {
                gen.emit_label(&label);
            }
        }
    }

    // ========== loops ==========

    /// Push a loop frame with fresh labels and place the start label. Without
    /// a separate continue label, `continue` jumps back to the start.
    fn open_loop(&mut self, separate_continue: bool) {
        let frame = match self.lower() {
            Some(gen) => {
                let start = gen.new_label("L");
                let continue_label = if separate_continue {
                    gen.new_label("L")
                } else {
                    start.clone()
                };
                let end = gen.new_label("L");
                gen.emit_label(&start);
                LoopFrame {
                    start_label: Some(start),
                    continue_label: Some(continue_label),
                    end_label: Some(end),
                    ..LoopFrame::default()
                }
            }
            None => LoopFrame::default(),
        };
        self.loops.push(frame);
    }

    pub(super) fn while_start(&mut self) {
        self.open_loop(false);
    }

    /// Condition of a `while` or `for`: leave the loop when it is zero
    pub(super) fn loop_condition(&mut self, token: &Token) -> Result<(), SemanticError> {
        self.check_condition(token)?;
        let end = self.loops.last().and_then(|f| f.end_label.clone());
        if let (Some(end), Some(gen)) = (end, self.lower()) {
            gen.emit_jz(&end);
        }
        Ok(())
    }

    pub(super) fn end_while(&mut self) {
        let Some(frame) = self.loops.pop() else {
            return;
        };
        if let Some(gen) = self.lower() {
            if let Some(start) = &frame.start_label {
                gen.emit_jmp(start);
            }
            if let Some(end) = &frame.end_label {
                gen.emit_label(end);
            }
        }
    }

    /// First `;` of a `for` header: the test starts here
    pub(super) fn for_test_start(&mut self) {
        self.open_loop(true);
    }

    pub(super) fn for_step_start(&mut self) {
        let mark = self.lower().map_or(0, |gen| gen.mark());
        if let Some(frame) = self.loops.last_mut() {
            frame.step_mark = mark;
        }
    }

    /// `)` of a `for` header: move the step code after the body
    pub(super) fn for_body_start(&mut self) {
        let mark = self.loops.last().map_or(0, |f| f.step_mark);
        let step = self.lower().map(|gen| gen.take_since(mark)).unwrap_or_default();
        if let Some(frame) = self.loops.last_mut() {
            frame.step = step;
        }
    }

    pub(super) fn end_for(&mut self) {
        let Some(frame) = self.loops.pop() else {
            return;
        };
        if let Some(gen) = self.lower() {
            if let Some(label) = &frame.continue_label {
                gen.emit_label(label);
            }
            gen.append(frame.step);
            if let Some(start) = &frame.start_label {
                gen.emit_jmp(start);
            }
            if let Some(end) = &frame.end_label {
                gen.emit_label(end);
            }
        }
    }

    pub(super) fn do_start(&mut self) {
        self.open_loop(true);
    }

    /// `while` of a do-while: `continue` lands on the test
    pub(super) fn do_test(&mut self) {
        let label = self.loops.last().and_then(|f| f.continue_label.clone());
        if let (Some(label), Some(gen)) = (label, self.lower()) {
            gen.emit_label(&label);
        }
    }

    pub(super) fn do_end(&mut self, token: &Token) -> Result<(), SemanticError> {
        self.check_condition(token)?;
        let Some(frame) = self.loops.pop() else {
            return Ok(());
        };
        if let Some(gen) = self.lower() {
            if let (Some(start), Some(end)) = (&frame.start_label, &frame.end_label) {
                gen.emit_jz(end);
                gen.emit_jmp(start);
                gen.emit_label(end);
            }
        }
        Ok(())
    }

    pub(super) fn break_loop(&mut self, token: &Token) -> Result<(), SemanticError> {
        let frame = self
            .loops
            .last()
            .ok_or_else(|| SemanticError::new("break outside of a loop", token.offset))?;
        let target = frame.end_label.clone();
        if let (Some(target), Some(gen)) = (target, self.lower()) {
            gen.emit_jmp(&target);
        }
        Ok(())
    }

    pub(super) fn continue_loop(&mut self, token: &Token) -> Result<(), SemanticError> {
        let frame = self
            .loops
            .last()
            .ok_or_else(|| SemanticError::new("continue outside of a loop", token.offset))?;
        let target = frame.continue_label.clone();
        if let (Some(target), Some(gen)) = (target, self.lower()) {
            gen.emit_jmp(&target);
        }
        Ok(())
    }

    // ========== return ==========

    pub(super) fn return_value(&mut self, token: &Token) -> Result<(), SemanticError> {
        let function = *self
            .functions
            .last()
            .ok_or_else(|| SemanticError::new("return outside of a function", token.offset))?;
        let value = self.pop_type(token.offset)?;
        let function = self.symbols.get(function);
        if function.ty == PrimType::Void {
            return Err(SemanticError::new(
                format!("void function '{}' cannot return a value", function.name),
                token.offset,
            ));
        }
        if !function.ty.accepts(value) {
            return Err(SemanticError::new(
                format!(
                    "type mismatch: '{}' returns {}, found {}",
                    function.name, function.ty, value
                ),
                token.offset,
            ));
        }
        Ok(())
    }

    pub(super) fn return_void(&mut self, token: &Token) -> Result<(), SemanticError> {
        let function = *self
            .functions
            .last()
            .ok_or_else(|| SemanticError::new("return outside of a function", token.offset))?;
        let function = self.symbols.get(function);
        if function.ty != PrimType::Void {
            return Err(SemanticError::new(
                format!("'{}' must return a value of type {}", function.name, function.ty),
                token.offset,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CodegenStrategy, CompilerConfig, ShadowingPolicy};
    use crate::errors::CompileError;
    use crate::lexer::{scanner_table, Lexer};
    use crate::parser::{parse_table, Parser};
    use crate::semantic::{SemanticAnalyzer, SymbolKind, Warning};

    fn analyze_with(source: &str, config: &CompilerConfig) -> Result<SemanticAnalyzer, CompileError> {
        let mut lexer = Lexer::new(scanner_table().expect("scanner table"));
        lexer.set_input(source);
        let parser = Parser::new(parse_table().expect("parse table"));
        let mut sema = SemanticAnalyzer::new(config);
        parser.parse(&mut lexer, &mut sema)?;
        Ok(sema)
    }

    fn analyze(source: &str) -> Result<SemanticAnalyzer, CompileError> {
        analyze_with(source, &CompilerConfig::default())
    }

    fn rendered(sema: &SemanticAnalyzer) -> Vec<String> {
        let gen = sema.code_generator().expect("lowering enabled");
        let labels = gen.data_layout(sema.symbols()).labels;
        gen.text().iter().map(|l| l.render(&labels)).collect()
    }

    #[test]
    fn test_assignment_marks_initialized_not_used() {
        let sema = analyze("int a, b; a = 1;").expect("compiles");
        let a = sema.symbols().iter().find(|s| s.name == "a").expect("a");
        assert!(a.initialized);
        assert!(!a.used);
    }

    #[test]
    fn test_self_referential_assignment_warns_and_uses() {
        let sema = analyze("float x; x = x + 1;").expect("compiles");
        let x = sema.symbols().iter().find(|s| s.name == "x").expect("x");
        assert!(x.used && x.initialized);
        assert!(sema
            .warnings()
            .iter()
            .any(|w| matches!(w, Warning::UninitializedUse { name, offset } if name == "x" && *offset == 13)));
    }

    #[test]
    fn test_narrowing_assignment_rejected_at_target() {
        let err = analyze("int i; double d; d = 1.5; i = d;").err().expect("rejected");
        assert_eq!(err.class(), "semantic");
        assert_eq!(err.offset(), 26);
        assert!(err.message().contains("cannot assign double to 'i'"));
    }

    #[test]
    fn test_assignment_target_kinds() {
        let err = analyze("int v[2]; v = 1;").err().expect("rejected");
        assert!(err.message().contains("without an index"));
        let err = analyze("int a; a[0] = 1;").err().expect("rejected");
        assert!(err.message().contains("'a' is not an array"));
    }

    #[test]
    fn test_indexed_assignment_marks_array_initialized() {
        let sema = analyze("int v[3]; v[0] = 5;").expect("compiles");
        let v = sema.symbols().iter().find(|s| s.name == "v").expect("v");
        assert_eq!(v.kind, SymbolKind::Array);
        assert_eq!(v.array_length, Some(3));
        assert!(v.initialized);
        assert_eq!(rendered(&sema), ["    LDI 5", "    LDI v", "    STO 0"]);
    }

    #[test]
    fn test_runtime_index_store() {
        let sema = analyze("int v[3]; int i = 2; v[i] = 7;").expect("compiles");
        let text = rendered(&sema);
        let tail: Vec<&str> = text.iter().rev().take(5).rev().map(String::as_str).collect();
        assert_eq!(tail, ["    LDI 7", "    LDI i", "    LD 0", "    POP $indr", "    STOV v"]);
    }

    #[test]
    fn test_conditions_must_be_bool_or_integer() {
        let err = analyze("string s; if (s) { }").err().expect("rejected");
        assert!(err.message().contains("condition must be bool"));
        assert!(analyze("int i = 3; while (i) { i = i - 1; }").is_ok());
        let err = analyze("float f = 1.0; do { } while (f);").err().expect("rejected");
        assert!(err.message().contains("condition"));
    }

    #[test]
    fn test_if_else_lowering() {
        let sema = analyze("int a = 1; int b; if (a) b = 1; else b = 2;").expect("compiles");
        let text = rendered(&sema);
        let tail: Vec<&str> = text.iter().skip(3).map(String::as_str).collect();
        assert_eq!(
            tail,
            [
                "    LDI a",
                "    LD 0",
                "    JZ L1",
                "    LDI 1",
                "    LDI b",
                "    STO 0",
                "    JMP L2",
                "L1:",
                "    LDI 2",
                "    LDI b",
                "    STO 0",
                "L2:"
            ]
        );
    }

    #[test]
    fn test_while_labels_are_consecutive() {
        let sema = analyze("int i = 2; while (i) { i = i - 1; continue; }").expect("compiles");
        let text = rendered(&sema);
        let tail: Vec<&str> = text.iter().skip(3).map(String::as_str).collect();
        assert_eq!(
            tail,
            [
                "L1:",
                "    LDI i",
                "    LD 0",
                "    JZ L2",
                "    LDI i",
                "    LD 0",
                "    LDI 1",
                "    SUB",
                "    LDI i",
                "    STO 0",
                "    JMP L1",
                "    JMP L1",
                "L2:"
            ]
        );
    }

    #[test]
    fn test_for_step_runs_after_body() {
        let sema = analyze("int i; int s = 0; for (i = 0; i < 3; i = i + 1) { s = s + i; }")
            .expect("compiles");
        let text = rendered(&sema);
        let body = text.iter().position(|l| l == "    ADD").expect("body");
        let step = text.iter().rposition(|l| l == "    LDI 1").expect("step");
        let back = text.iter().rposition(|l| l == "    JMP L1").expect("back edge");
        assert!(body < step && step < back);
        assert_eq!(text.last().map(String::as_str), Some("L3:"));
    }

    #[test]
    fn test_break_and_continue_need_a_loop() {
        let err = analyze("int a; break;").err().expect("rejected");
        assert!(err.message().contains("break outside of a loop"));
        let err = analyze("int a; continue;").err().expect("rejected");
        assert!(err.message().contains("continue outside of a loop"));
        assert!(analyze("int a = 1; while (a) { if (a) break; continue; }").is_ok());
        assert!(analyze("int a = 1; do { break; } while (a);").is_ok());
    }

    #[test]
    fn test_returns() {
        let err = analyze("int a; return a;").err().expect("rejected");
        assert!(err.message().contains("return outside of a function"));

        let err = analyze("void f() { return 1; }").err().expect("rejected");
        assert!(err.message().contains("cannot return a value"));

        let err = analyze("int f() { return; }").err().expect("rejected");
        assert!(err.message().contains("must return a value"));

        let err = analyze("int f() { return \"s\"; }").err().expect("rejected");
        assert!(err.message().contains("type mismatch"));

        assert!(analyze("double f(int a) { return a; } void g() { return; }").is_ok());
    }

    #[test]
    fn test_same_function_shadowing_policy() {
        let source = "void f() { int x = 1; { int x = 2; x = x + 1; } x = x + 1; }";
        let err = analyze(source).err().expect("rejected");
        assert!(err.message().contains("already declared in this function"));

        let block = CompilerConfig {
            shadowing: ShadowingPolicy::Block,
            ..CompilerConfig::default()
        };
        assert!(analyze_with(source, &block).is_ok());

        assert!(analyze("int x; void f() { int x = 1; x = x + 1; }").is_ok());
        assert!(analyze("void f() { int x = 1; x = x + 1; } void g() { int x = 1; x = x + 1; }").is_ok());
    }

    #[test]
    fn test_function_bodies_are_not_lowered() {
        let sema = analyze("int g; void f() { int x = 1; g = x; }").expect("compiles");
        assert!(rendered(&sema).is_empty());

        let none = CompilerConfig {
            codegen: crate::config::CodegenConfig {
                strategy: CodegenStrategy::None,
                ..Default::default()
            },
            ..CompilerConfig::default()
        };
        let sema = analyze_with("int a; a = 1;", &none).expect("compiles");
        assert!(sema.code_generator().is_none());
    }
}
