//! Property-based tests for the analyzer
//!
//! Random identifiers and type pairs are pushed through the whole pipeline
//! to check the scoping, warning and typing rules.

use bipc::lexer::{Token, TokenKind};
use bipc::semantic::types::BinaryOp;
use bipc::semantic::{PrimType, SemanticAnalyzer, Warning};
use bipc::{Compiler, CompilerConfig};
use proptest::prelude::*;

const NUMERIC: [PrimType; 6] = [
    PrimType::Bool,
    PrimType::Char,
    PrimType::Int,
    PrimType::Long,
    PrimType::Float,
    PrimType::Double,
];

fn identifier() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,8}".prop_filter("keywords are reserved", |name| {
        TokenKind::KEYWORDS.iter().all(|(keyword, _)| keyword != name)
    })
}

fn numeric_type() -> impl Strategy<Value = PrimType> {
    prop::sample::select(NUMERIC.to_vec())
}

fn storable_type() -> impl Strategy<Value = PrimType> {
    prop_oneof![numeric_type(), Just(PrimType::String)]
}

fn compiler() -> Compiler {
    Compiler::new(CompilerConfig::default()).expect("tables load")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A declared name is always visible right after its declaration
    #[test]
    fn declared_names_resolve(name in identifier(), ty in numeric_type()) {
        let source = format!("{ty} {name}; {name} = {name};");
        let result = compiler().compile(&source);
        prop_assert!(result.is_ok(), "{:?}", result.err());
    }

    /// Redeclaring in the same block fails whatever the two types are
    #[test]
    fn duplicates_in_one_block_fail(
        name in identifier(),
        first in storable_type(),
        second in storable_type(),
    ) {
        let source = format!("void f() {{ {first} {name}; {second} {name}; }}");
        let err = compiler().compile(&source).err().expect("duplicate accepted");
        prop_assert!(err.message().contains("already declared in this scope"));
    }

    /// Inner blocks of one function may not reuse a name; sibling functions may
    #[test]
    fn same_function_shadowing(name in identifier().prop_filter("function names", |n| n != "f" && n != "g")) {
        let nested = format!("void f() {{ int {name}; {{ int {name}; }} }}");
        let err = compiler().compile(&nested).err().expect("shadowing accepted");
        prop_assert!(err.message().contains("already declared in this function"));

        let siblings = format!("void f() {{ int {name}; }} void g() {{ int {name}; }}");
        prop_assert!(compiler().compile(&siblings).is_ok());
    }

    /// Every unused symbol is reported exactly once
    #[test]
    fn unused_reported_once(names in prop::collection::btree_set(identifier(), 1..6)) {
        let names: Vec<String> = names.into_iter().filter(|n| n != "main").collect();
        let mut body = String::new();
        for name in &names {
            body.push_str(&format!("{{ int {name}; "));
        }
        body.push_str(&"} ".repeat(names.len()));
        let source = format!("int main() {{ {body} return 0; }}");

        let result = compiler().compile(&source).expect("compiles");
        for name in &names {
            let count = result
                .warnings
                .iter()
                .filter(|w| matches!(w, Warning::UnusedSymbol { name: n, .. } if n == name))
                .count();
            prop_assert_eq!(count, 1, "{}", name);
        }
    }

    /// Arithmetic yields the operand type of higher rank
    #[test]
    fn arithmetic_promotes_to_higher_rank(lhs in numeric_type(), rhs in numeric_type()) {
        let expected = if lhs.rank() >= rhs.rank() { lhs } else { rhs };
        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
            prop_assert_eq!(op.result_type(lhs, rhs), Ok(expected));
        }

        let source = format!("{lhs} a; {rhs} b; {expected} r; r = a + b;");
        prop_assert!(compiler().compile(&source).is_ok());
    }

    /// Assignment may widen but never narrow
    #[test]
    fn assignability_follows_rank(dest in storable_type(), src in storable_type()) {
        let source = format!("{src} s; {dest} d; d = s;");
        let result = compiler().compile(&source);
        let allowed = dest == src || matches!((src.rank(), dest.rank()), (Some(a), Some(b)) if a <= b);
        prop_assert_eq!(result.is_ok(), allowed);
        prop_assert_eq!(dest.accepts(src), allowed);
    }

    /// Re-entering `declare` at the same offset is absorbed
    #[test]
    fn declare_is_idempotent(name in identifier(), offset in 0usize..1000) {
        let mut sema = SemanticAnalyzer::new(&CompilerConfig::default());
        sema.begin_declaration(PrimType::Int);
        let token = Token::new(TokenKind::Ident, name, offset);
        prop_assert!(sema.declare(&token).is_ok());
        prop_assert!(sema.declare(&token).is_ok());
        prop_assert_eq!(sema.symbols().len(), 1);
    }
}

#[test]
fn test_fixed_promotions() {
    assert_eq!(BinaryOp::Add.result_type(PrimType::Int, PrimType::Int), Ok(PrimType::Int));
    assert_eq!(
        BinaryOp::Add.result_type(PrimType::Int, PrimType::Double),
        Ok(PrimType::Double)
    );
    assert_eq!(BinaryOp::Mod.result_type(PrimType::Char, PrimType::Int), Ok(PrimType::Int));
}

#[test]
fn test_double_into_int_rejected() {
    let err = compiler()
        .compile("double d; int i; d = 1.5; i = d;")
        .err()
        .expect("narrowing accepted");
    assert!(err.message().contains("type mismatch"));
}
