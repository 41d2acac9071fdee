//! Snapshot tests for emitted Scheme and JavaScript
//!
//! If the output changes intentionally, update the .expected files by running:
//!
//!     UPDATE_SNAPSHOTS=1 cargo test emit_snapshots
//!
//! The snapshot files are in tests/snapshots/

use std::fs;

use fancyfly::codegen::{compile_source, CompileOptions, Target};
use fancyfly::test_support::compile;

/// Assert that actual output matches snapshot file, or create/update if UPDATE_SNAPSHOTS=1
fn assert_snapshot(actual: &str, snapshot_name: &str) {
    let snapshot_path = format!("tests/snapshots/{}.expected", snapshot_name);

    if std::env::var("UPDATE_SNAPSHOTS").is_ok() {
        fs::write(&snapshot_path, actual).expect("Failed to write snapshot");
        println!("Updated snapshot: {}", snapshot_path);
        return;
    }

    let expected = fs::read_to_string(&snapshot_path).unwrap_or_else(|_| {
        panic!(
            "Snapshot not found: {}\n\
             Run with UPDATE_SNAPSHOTS=1 to create it.\n\
             Actual output:\n{}",
            snapshot_path, actual
        )
    });

    assert_eq!(
        actual, expected,
        "\nSnapshot mismatch for {}\n\
         Run with UPDATE_SNAPSHOTS=1 to update.\n\
         Actual:\n{}\n\
         Expected:\n{}",
        snapshot_name, actual, expected
    );
}

const SCENARIO_A: &str = "if n == 0:\n    return 1\nelse:\n    return n\n";

// ============================================================================
// Scheme
// ============================================================================

#[test]
fn snapshot_scheme_assign_constant() {
    let output = compile("x = 1\n", Target::Scheme).unwrap();
    assert_snapshot(&output, "scheme_assign_constant");
}

#[test]
fn snapshot_scheme_identity_function() {
    let output = compile("def id(a):\n    return a\n", Target::Scheme).unwrap();
    assert_snapshot(&output, "scheme_identity_function");
}

#[test]
fn scheme_conditional_shape() {
    let output = compile(SCENARIO_A, Target::Scheme).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[..3], ["(define t1 '())", "(define t2 '())", "(define t3 '())"]);
    let program = lines[3];
    assert!(program.starts_with("((lambda (k"));
    assert!(program.ends_with(" display)"));
    assert!(program.contains("(equal? "));
    assert!(program.contains("(if (not (member v"));
    assert!(program.contains("(lambda (k"));
    assert!(!program.contains("Begin"));
}

#[test]
fn scheme_function_locals_are_let_bound() {
    let output = compile("def f(a):\n    b = a\n    return b\n", Target::Scheme).unwrap();
    assert!(output.contains("(lambda (k4 a) (let ((b '())) "), "{}", output);
}

#[test]
fn scheme_runtime_operator_call() {
    let output = compile("x = 2 * 3\n", Target::Scheme).unwrap();
    assert!(output.contains("(Mult k"), "{}", output);
}

#[test]
fn scheme_conditional_follows_source_truthiness() {
    // `if n:` with n = 0 must take the else branch
    let src = "n = 0\nif n:\n    r = 1\nelse:\n    r = 2\n";
    let output = compile(src, Target::Scheme).unwrap();
    assert!(output.contains("(if (not (member v"), "{}", output);
    assert!(output.contains("'(#f 0 () \"\")"), "{}", output);
}

// ============================================================================
// JavaScript
// ============================================================================

#[test]
fn snapshot_js_assign_constant() {
    let output = compile("x = 1\n", Target::JavaScript).unwrap();
    assert_snapshot(&output, "js_assign_constant");
}

#[test]
fn snapshot_js_identity_function() {
    let output = compile("def id(a):\n    return a\n", Target::JavaScript).unwrap();
    assert_snapshot(&output, "js_identity_function");
}

#[test]
fn js_conditional_is_ternary_with_strict_equality() {
    let output = compile(SCENARIO_A, Target::JavaScript).unwrap();
    assert!(output.starts_with("var t1, t2, t3;\n"));
    assert!(output.contains(" === "));
    assert!(output.contains(" ? "));
    assert!(output.ends_with("(console.log);\n"));
}

#[test]
fn js_string_literals_are_escaped() {
    let output = compile("x = \"a\\\"b\"\n", Target::JavaScript).unwrap();
    assert!(output.contains(r#"(k3)("a\"b")"#), "{}", output);
}

#[test]
fn js_reserved_word_is_rejected() {
    let err = compile("new = 1\n", Target::JavaScript).unwrap_err();
    assert!(err.contains("reserved word `new`"), "{}", err);
    // Not reserved in Scheme
    assert!(compile("new = 1\n", Target::Scheme).is_ok());
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn custom_continuation() {
    let options = CompileOptions::new(Target::Scheme).with_continuation("write");
    let output = compile_source("x = 1\n", &options).unwrap();
    assert!(output.ends_with(" write)\n"));
}

#[test]
fn output_is_deterministic() {
    let src = "\
def fib(n):
    if n < 2:
        return n
    else:
        return fib(n - 1) + fib(n - 2)
print(fib(20))
";
    for target in [Target::Scheme, Target::JavaScript] {
        assert_eq!(compile(src, target).unwrap(), compile(src, target).unwrap());
    }
}
