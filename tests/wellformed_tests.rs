// tests/wellformed_tests.rs
//
// The static analysis that rejects grammars before parsing: unprotected
// left recursion and repetition over nullable parsers.

mod common;

use std::sync::{Arc, OnceLock};

use bramble::grammar::{choice, digit, lazy, lit, seq, Grammar, Rule};
use bramble::wellformed;
use bramble::{run_str, GrammarFault};

/// A self-referential rule: the cell is filled after construction, the lazy
/// indirection closes the cycle.
fn knot(build: impl FnOnce(Rule) -> Rule) -> Rule {
    let cell: Arc<OnceLock<Rule>> = Arc::new(OnceLock::new());
    let reference = {
        let cell = cell.clone();
        lazy(move || cell.get().cloned().expect("knot is tied"))
    };
    let rule = build(reference);
    let _ = cell.set(rule.clone());
    rule
}

#[test]
fn direct_left_recursion_is_diagnosed_and_blocks_the_parse() {
    // A = A 'x' | 'y'
    let a = knot(|a| choice([seq([a, lit("x")]), lit("y")]).named("A"));

    let faults = wellformed::check(&a.parser());
    assert_eq!(faults.len(), 1);
    match &faults[0] {
        GrammarFault::LeftRecursion { rule, cycle } => {
            assert_eq!(rule, "A");
            assert!(cycle.contains("A"), "cycle names the rule: {cycle}");
        }
        other => panic!("expected a left-recursion fault, got {other}"),
    }

    // the driver refuses to parse: no input is consumed, nothing is reported
    // beyond the faults
    let result = run_str(&a.parser(), "yx");
    assert!(!result.success);
    assert!(!result.is_well_formed());
    assert_eq!(result.match_size, 0);
    assert_eq!(result.error_pos, None);
}

#[test]
fn recursion_behind_a_nullable_prefix_is_still_left_recursion() {
    // B = '-'? B — the optional prefix can match empty, so B is consulted
    // at its own start position
    let b = knot(|b| seq([lit("-").opt(), b]).named("B"));

    let faults = wellformed::check(&b.parser());
    assert!(faults
        .iter()
        .any(|f| matches!(f, GrammarFault::LeftRecursion { rule, .. } if rule == "B")));
}

#[test]
fn guarded_recursion_is_fine() {
    // L = '(' L ')' | 'x' consumes before recursing
    let l = knot(|l| choice([seq([lit("("), l, lit(")")]), lit("x")]).named("L"));
    assert!(wellformed::check(&l.parser()).is_empty());

    let fix = bramble::Fixture::new(&l);
    fix.success("((x))");
    fix.failure("((x)");
}

#[test]
fn repetition_over_nullable_operand_is_diagnosed() {
    let unbounded = lit("a").opt().at_least(0).named("blink");
    let faults = wellformed::check(&unbounded.parser());
    assert!(faults
        .iter()
        .any(|f| matches!(f, GrammarFault::NullableRepetition { rule } if rule == "blink")));

    // bounded repetitions make no more progress than unbounded ones
    let bounded = lit("a").opt().repeat(0, 4).named("wink");
    let faults = wellformed::check(&bounded.parser());
    assert!(faults
        .iter()
        .any(|f| matches!(f, GrammarFault::NullableRepetition { rule } if rule == "wink")));
}

#[test]
fn zero_width_iterations_stop_even_with_the_check_disabled() {
    // the runtime backstop: a nullable operand ends the loop instead of
    // spinning forever
    let rule = lit("a").opt().at_least(0);
    let options = bramble::ParseOptions::builder()
        .well_formedness_check(false)
        .build();
    let result = bramble::run(&rule.parser(), &bramble::Input::from("zzz"), options);
    assert!(result.success);
    assert_eq!(result.match_size, 0);
}

#[test]
fn nullable_item_with_nullable_separator_is_diagnosed() {
    let rule = lit("a").opt().sep(0, &lit(",").opt()).named("listing");
    let faults = wellformed::check(&rule.parser());
    assert!(faults
        .iter()
        .any(|f| matches!(f, GrammarFault::NullableSeparator { rule } if rule == "listing")));
}

#[test]
fn nullable_item_with_consuming_separator_is_fine() {
    let rule = lit("a").opt().sep(0, &lit(","));
    assert!(wellformed::check(&rule.parser()).is_empty());
}

#[test]
fn expression_combinators_are_exempt_on_their_own_recursion() {
    let g = Grammar::with_usual_whitespace();
    let number = g.word(&digit().at_least(1)).named("number");
    let sum = g
        .left_expr()
        .operand(&number)
        .infix(&g.word_str("+"), |scope| {
            Ok(bramble::Value::List(scope.take_frame()))
        })
        .build()
        .named("sum");
    assert!(wellformed::check(&sum.parser()).is_empty());
}

#[test]
fn the_json_grammar_is_well_formed() {
    let json = common::json();
    assert!(wellformed::check(&json.root.parser()).is_empty());
}
