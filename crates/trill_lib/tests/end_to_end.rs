//! Full-pipeline tests: lex, parse, register and constraint-solve a
//! complete source file and inspect the resulting diagnostics, rather than
//! poking at any single stage in isolation.

use trill_lib::diagnostics::{Diagnostic, DiagnosticKind};
use trill_lib::source::SourceFileManager;

fn check(src: &str) -> Vec<Diagnostic> {
    let mut files = SourceFileManager::new();
    let file = files.add("test.trl", src.to_string());
    let (_, diagnostics) = trill_lib::check_file(&files, file);
    diagnostics
}

fn errors(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
    diagnostics.iter().filter(|d| d.kind == DiagnosticKind::Error).collect()
}

#[test]
fn empty_main_compiles_cleanly() {
    let diagnostics = check("func main() {}");
    assert!(errors(&diagnostics).is_empty(), "unexpected diagnostics: {diagnostics:?}");
}

#[test]
fn main_with_argc_and_double_pointer_argv_compiles() {
    let diagnostics = check(
        r#"
        func main(argc: Int, argv: **Int8) -> Int {
            return 0
        }
        "#,
    );
    assert!(errors(&diagnostics).is_empty(), "unexpected diagnostics: {diagnostics:?}");
}

#[test]
fn a_type_that_directly_contains_itself_is_rejected() {
    let diagnostics = check("type T { let a: T }");
    let errs = errors(&diagnostics);
    assert!(!errs.is_empty(), "expected a self-containment error");
    assert!(
        errs.iter().any(|d| d.message.contains("contains itself")),
        "expected a self-containment diagnostic, got: {diagnostics:?}"
    );
}

#[test]
fn a_pointer_to_self_breaks_the_layout_cycle() {
    let diagnostics = check("type Node { let next: *Node }");
    assert!(errors(&diagnostics).is_empty(), "unexpected diagnostics: {diagnostics:?}");
}

#[test]
fn an_indirect_type_may_contain_itself_directly() {
    let diagnostics = check("indirect type List { let next: List }");
    assert!(errors(&diagnostics).is_empty(), "unexpected diagnostics: {diagnostics:?}");
}

#[test]
fn mutually_circular_type_aliases_are_rejected() {
    let diagnostics = check("type A = B\ntype B = A");
    let errs = errors(&diagnostics);
    assert!(!errs.is_empty(), "expected a circular-alias error");
    assert!(
        errs.iter().any(|d| d.message.contains("refers to itself through a chain of aliases")),
        "expected a circular-alias diagnostic, got: {diagnostics:?}"
    );
}

#[test]
fn an_integer_literal_that_overflows_its_declared_width_is_rejected() {
    let diagnostics = check("func main() {\n    let x: Int8 = 300\n}");
    let errs = errors(&diagnostics);
    assert!(!errs.is_empty(), "expected an overflow error");
    assert!(
        errs.iter().any(|d| d.message.contains("300") && d.message.contains("Int8")),
        "expected an overflow diagnostic mentioning '300' and 'Int8', got: {diagnostics:?}"
    );
}

#[test]
fn a_type_missing_a_required_protocol_method_does_not_conform() {
    let diagnostics = check(
        r#"
        protocol P {
            func f() -> Int
        }
        type Q: P {}
        "#,
    );
    let errs = errors(&diagnostics);
    assert!(!errs.is_empty(), "expected a conformance error");
    assert!(
        errs.iter().any(|d| d.message.contains("'Q'") && d.message.contains("'P'")),
        "expected a conformance diagnostic naming 'Q' and 'P', got: {diagnostics:?}"
    );
}

#[test]
fn a_type_implementing_every_protocol_method_conforms() {
    let diagnostics = check(
        r#"
        protocol P {
            func f() -> Int
        }
        type Q: P {
            func f() -> Int {
                return 1
            }
        }
        "#,
    );
    assert!(errors(&diagnostics).is_empty(), "unexpected diagnostics: {diagnostics:?}");
}

#[test]
fn calling_a_function_with_too_many_arguments_is_an_arity_mismatch() {
    let diagnostics = check(
        r#"
        func f(_ x: Int) -> Int {
            return x
        }
        func main() {
            let y = f(1, 2)
        }
        "#,
    );
    let errs = errors(&diagnostics);
    assert!(!errs.is_empty(), "expected an arity-mismatch error");
    assert!(
        errs.iter().any(|d| d.message.contains("expected 1 arguments") && d.message.contains("found 2")),
        "expected an arity-mismatch diagnostic, got: {diagnostics:?}"
    );
}

#[test]
fn a_user_defined_operator_overload_is_preferred_over_the_builtin() {
    // Declaring `+` on `Int8` gives the solver a zero-punishment candidate
    // that outranks the builtin (which would otherwise promote through
    // `IntegerLiteral`), so the call must resolve to the user overload.
    let diagnostics = check(
        r#"
        func +(_ a: Int8, _ b: Int8) -> Int8 {
            return a
        }
        func main() {
            let a: Int8 = 1
            let b: Int8 = 2
            let c = a + b
        }
        "#,
    );
    assert!(errors(&diagnostics).is_empty(), "unexpected diagnostics: {diagnostics:?}");
}
