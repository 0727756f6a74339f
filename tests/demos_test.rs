use bipc::semantic::{SymbolKind, Warning};
use bipc::{Compiler, CompilerConfig};
use std::fs;
use std::path::Path;

fn compile_demo(name: &str) -> bipc::Compilation {
    let path = Path::new("demos").join(name);
    let source = fs::read_to_string(&path).expect("Failed to read demo file");
    let compiler = Compiler::new(CompilerConfig::default()).expect("tables load");
    compiler
        .compile(&source)
        .unwrap_or_else(|e| panic!("{} failed: {}", name, e))
}

#[test]
fn test_globals_demo() {
    let result = compile_demo("globals.bip");

    assert!(result.program.starts_with(
        ".data\ncount : 0\ndone : 0\ni : 0\nlimit : 0\nsquares : 0 0 0 0 0 0 0 0 0 0\n\n.text\n"
    ));
    assert!(result.program.contains("    STOV squares\n"));
    assert!(!result
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::LoweringSuspended { .. })));

    let jumps = result.program.lines().filter(|l| l.trim_start().starts_with('J')).count();
    assert!(jumps >= 6, "expected loop and branch jumps, found {}", jumps);
}

#[test]
fn test_functions_demo() {
    let result = compile_demo("functions.bip");

    let fib = result.symbols.iter().find(|s| s.name == "fib").expect("fib");
    assert_eq!(fib.kind, SymbolKind::Function);
    assert_eq!(fib.parameters.len(), 1);
    assert!(fib.used);

    let letters = result
        .symbols
        .iter()
        .find(|s| s.name == "letters")
        .expect("letters");
    assert_eq!(letters.array_length, Some(3));

    // no globals and nothing lowered outside functions
    assert_eq!(result.program, ".data\n\n.text\n_PRINCIPAL:\n    HLT 0\n");

    let unused: Vec<&str> = result
        .warnings
        .iter()
        .filter_map(|w| match w {
            Warning::UnusedSymbol { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(unused, ["scaled", "letters"]);
}
