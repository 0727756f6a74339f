// Configuration files driving a compilation

use std::fs;

use bipc::config::{CodegenStrategy, ShadowingPolicy};
use bipc::errors::ConfigError;
use bipc::{Compiler, CompilerConfig};
use tempfile::TempDir;

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("bipc.toml");
    fs::write(
        &path,
        r#"
shadowing = "block"
entry_point = "start"

[codegen]
strategy = "actions"
sort_by_name = false
entry_label = "_START"
annotate_types = true
"#,
    )
    .expect("write config");

    let config = CompilerConfig::load(&path).expect("loads");
    assert_eq!(config.shadowing, ShadowingPolicy::Block);
    assert_eq!(config.entry_point, "start");
    assert_eq!(config.codegen.strategy, CodegenStrategy::Actions);

    let compiler = Compiler::new(config).expect("tables load");
    let result = compiler
        .compile("int z; char v[2]; int start() { return 0; } z = 1;")
        .expect("compiles");
    assert!(result
        .program
        .starts_with(".data\nz : 0   ; int\nv : 0 0   ; char [2]\n\n.text\n_START:\n"));

    let start = result.symbols.iter().find(|s| s.name == "start").expect("start");
    assert!(start.used);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().expect("temp dir");
    let result = CompilerConfig::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_malformed_file_is_toml_error() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("bad.toml");
    fs::write(&path, "shadowing = 3\n").expect("write config");
    assert!(matches!(CompilerConfig::load(&path), Err(ConfigError::Toml(_))));
}

#[test]
fn test_trace_lines_reach_the_sink() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let config = CompilerConfig {
        trace_actions: true,
        ..CompilerConfig::default()
    };
    let compiler = Compiler::new(config).expect("tables load");
    let lines = Rc::new(RefCell::new(Vec::new()));
    let captured = Rc::clone(&lines);
    compiler
        .compile_with_sink("int a;", move |line| captured.borrow_mut().push(line.to_string()))
        .expect("compiles");

    let lines = lines.borrow();
    assert_eq!(lines.first().map(String::as_str), Some("action #begin_program at offset 0 (int)"));
    assert!(lines.iter().any(|l| l == "action #declare at offset 4 (a)"));
    assert!(lines
        .iter()
        .any(|l| l == "warning at offset 4: variable 'a' declared but never used"));
}
