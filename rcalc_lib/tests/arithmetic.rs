//! End-to-end checks: source text in, printed result out.

use proptest::prelude::*;

use rcalc_lib::compiler::{compile, CompileError, SyntaxErrorKind};
use rcalc_lib::config::DebugConfig;
use rcalc_lib::vm::VM;

fn printed(source: &str) -> String {
    let mut vm = VM::with_output(Vec::new()).with_config(DebugConfig::default());
    vm.interpret(source).expect("source should run");
    String::from_utf8(vm.into_output()).expect("output should be UTF-8")
}

fn evaluate(source: &str) -> f64 {
    let mut vm = VM::with_output(Vec::new()).with_config(DebugConfig::default());
    vm.interpret(source).expect("source should run").as_f64()
}

fn same(actual: f64, expected: f64) -> bool {
    actual == expected || (actual.is_nan() && expected.is_nan())
}

#[test]
fn prints_results() {
    assert_eq!(printed("1 + 2"), "3\n");
    assert_eq!(printed("2 * (3 + 4)"), "14\n");
    assert_eq!(printed("10 / 2 - 3"), "2\n");
    assert_eq!(printed("1 / 0"), "Infinity\n");
    assert_eq!(printed("0 - 1 / 0"), "-Infinity\n");
    assert_eq!(printed("0 / 0"), "NaN\n");
    assert_eq!(printed("3.5 * 2"), "7\n");
    assert_eq!(printed("1 / 4"), "0.25\n");
}

#[test]
fn expressions_may_span_lines() {
    assert_eq!(printed("(1 +\n 2)\n * 3\n"), "9\n");
}

fn nested(depth: usize) -> String {
    format!("{}1{}", "(1 + ".repeat(depth), ")".repeat(depth))
}

#[test]
fn nesting_up_to_the_constant_limit_fits_the_stack() {
    // 255 levels push 256 values, one per constant.
    assert_eq!(evaluate(&nested(255)), 256.0);
}

#[test]
fn deeper_nesting_is_a_compile_error() {
    match compile(&nested(300)) {
        Err(CompileError::Syntax { kind, .. }) => {
            assert_eq!(kind, SyntaxErrorKind::TooMuchNesting)
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn bare_parentheses_are_bounded_too() {
    let source = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
    let mut vm = VM::with_output(Vec::new()).with_config(DebugConfig::default());
    assert!(vm.interpret(&source).is_err());
    assert!(vm.output().is_empty());
}

#[test]
fn constant_limit_without_nesting() {
    let source = vec!["1"; 257].join(" + ");
    match compile(&source) {
        Err(CompileError::Syntax { kind, .. }) => {
            assert_eq!(kind, SyntaxErrorKind::TooManyConstants)
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn unclosed_paren_produces_no_program() {
    match compile("(1 + 2") {
        Err(CompileError::Syntax { kind, .. }) => {
            assert_eq!(kind, SyntaxErrorKind::ExpectRightParen)
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn compile_error_messages() {
    assert_eq!(
        compile("* 3").unwrap_err().to_string(),
        "[line 1] Error at '*': Expect expression."
    );
    assert_eq!(
        compile("1 +\n(2").unwrap_err().to_string(),
        "[line 2] Error at end: Expect ')' after expression."
    );
    assert_eq!(
        compile("1 # 2").unwrap_err().to_string(),
        "[line 1] Error: Unexpected character '#'."
    );
}

#[test]
fn constants_survive_table_growth() {
    let literals: Vec<String> = (1..=100).map(|n| format!("{n}.5")).collect();
    let chunk = compile(&literals.join(" + ")).unwrap();

    let constants: Vec<f64> = chunk.constants().iter().map(|v| v.as_f64()).collect();
    let expected: Vec<f64> = (1..=100).map(|n| n as f64 + 0.5).collect();
    assert_eq!(constants, expected);
}

#[derive(Debug, Clone)]
enum Expr {
    Number(u32),
    Binary(Box<Expr>, char, Box<Expr>),
}

impl Expr {
    /// Fully parenthesized source text.
    fn source(&self) -> String {
        match self {
            Expr::Number(n) => n.to_string(),
            Expr::Binary(left, op, right) => {
                format!("({} {op} {})", left.source(), right.source())
            }
        }
    }

    fn value(&self) -> f64 {
        match self {
            Expr::Number(n) => f64::from(*n),
            Expr::Binary(left, op, right) => apply(left.value(), *op, right.value()),
        }
    }
}

fn apply(left: f64, op: char, right: f64) -> f64 {
    match op {
        '+' => left + right,
        '-' => left - right,
        '*' => left * right,
        '/' => left / right,
        _ => unreachable!(),
    }
}

fn arb_op() -> impl Strategy<Value = char> {
    prop::sample::select(vec!['+', '-', '*', '/'])
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = (0u32..1000).prop_map(Expr::Number);
    leaf.prop_recursive(5, 64, 2, |inner| {
        (inner.clone(), arb_op(), inner)
            .prop_map(|(left, op, right)| Expr::Binary(Box::new(left), op, Box::new(right)))
    })
}

/// Evaluates `n0 op1 n1 op2 n2 ...` with `*` and `/` binding tighter than
/// `+` and `-`, every level folding left to right.
fn flat_value(first: u32, rest: &[(char, u32)]) -> f64 {
    let mut terms = vec![f64::from(first)];
    let mut term_ops = Vec::new();

    for &(op, n) in rest {
        let n = f64::from(n);
        match op {
            '*' | '/' => {
                if let Some(term) = terms.last_mut() {
                    *term = apply(*term, op, n);
                }
            }
            _ => {
                term_ops.push(op);
                terms.push(n);
            }
        }
    }

    let mut result = terms[0];
    for (op, term) in term_ops.into_iter().zip(terms.into_iter().skip(1)) {
        result = apply(result, op, term);
    }
    result
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Parenthesized trees evaluate exactly as the tree does.
    #[test]
    fn grouped_expressions_match_the_tree(expr in arb_expr()) {
        let source = expr.source();
        let actual = evaluate(&source);
        prop_assert!(same(actual, expr.value()), "{} gave {}", source, actual);
    }

    /// Flat expressions follow precedence and left associativity.
    #[test]
    fn flat_expressions_follow_precedence(
        first in 0u32..1000,
        rest in prop::collection::vec((arb_op(), 0u32..1000), 0..20),
    ) {
        let mut source = first.to_string();
        for (op, n) in &rest {
            source.push_str(&format!(" {op} {n}"));
        }

        let actual = evaluate(&source);
        let expected = flat_value(first, &rest);
        prop_assert!(same(actual, expected), "{} gave {}, expected {}", source, actual, expected);
    }

    /// Compiling the same text twice gives identical chunks.
    #[test]
    fn compilation_is_deterministic(expr in arb_expr()) {
        let source = expr.source();
        let first = compile(&source).unwrap();
        let second = compile(&source).unwrap();
        prop_assert_eq!(first.code(), second.code());
        prop_assert_eq!(first.constants(), second.constants());
    }
}
