// tests/combinator_tests.rs
//
// Primitive and structural combinators, stack actions, and the
// transactional guarantees they all share.

use bramble::grammar::{
    any, char_pred, chr, choice, digit, lit, range, seq, set, token_lit, token_pred, Grammar,
};
use bramble::{run, run_str, Fixture, Input, ParseOptions, Token, Value};

#[test]
fn literal_and_char_classes() {
    Fixture::new(&lit("abc")).success("abc");
    Fixture::new(&lit("abc")).failure("abd");
    Fixture::new(&chr('q')).success("q");
    Fixture::new(&set("xyz")).success("y");
    Fixture::new(&set("xyz")).failure("a");
    Fixture::new(&range('0', '9')).success("7");
    Fixture::new(&range('0', '9')).failure("a");
    Fixture::new(&char_pred(|c| c.is_alphabetic())).success("é");
}

#[test]
fn any_fails_only_at_end_of_input() {
    let fix = Fixture::new(&any());
    fix.success("x");
    fix.success("é");
    fix.failure("");
}

#[test]
fn empty_literal_matches_without_consuming() {
    let result = Fixture::new(&lit("")).success("");
    assert_eq!(result.match_size, 0);
}

#[test]
fn sequence_is_all_or_nothing() {
    let rule = seq([lit("a"), lit("b"), lit("c")]);
    let fix = Fixture::new(&rule);
    fix.success("abc");
    let result = fix.failure("abX");
    // the furthest failure is the third element
    assert_eq!(result.error_pos, Some(2));
}

#[test]
fn choice_is_ordered_not_longest_match() {
    // both alternatives match; the first wins even though the second is
    // longer
    let rule = choice([lit("ab").as_val("short"), lit("abc").as_val("long")]);
    let result = Fixture::new(&rule).prefix_expect("abc", 2);
    assert_eq!(result.top(), Some(&Value::from("short")));
}

#[test]
fn optional_never_fails() {
    let rule = seq([lit("a").opt(), lit("b")]);
    let fix = Fixture::new(&rule);
    fix.success("ab");
    fix.success("b");
    fix.failure("c");
}

#[test]
fn lookahead_consumes_nothing() {
    let ahead = seq([lit("a").ahead(), lit("ab")]);
    Fixture::new(&ahead).success("ab");

    let not = seq([lit("b").not(), any()]);
    let fix = Fixture::new(&not);
    fix.success("a");
    fix.failure("b");
}

#[test]
fn lookahead_leaves_no_stack_or_log_effects() {
    let noisy = lit("a").collect(|scope| {
        scope.log().set("touched", Value::Bool(true));
        scope.push(Value::from("noise"));
        Ok(())
    });
    let rule = seq([noisy.ahead(), lit("a").as_val("clean")]);
    let result = Fixture::new(&rule).success("a");
    assert_eq!(result.value_stack, vec![Value::from("clean")]);
    assert!(!result.store.contains("touched"));
}

#[test]
fn repetition_bounds() {
    let two_to_three = digit().repeat(2, 3);
    let fix = Fixture::new(&two_to_three);
    fix.failure("1");
    fix.success("12");
    fix.success("123");
    // greedy up to the bound, then stops
    fix.prefix_expect("12345", 3);

    Fixture::new(&digit().at_least(1)).failure("");
    Fixture::new(&digit().at_least(0)).success("");
}

#[test]
fn separated_repetition_without_trailing() {
    let list = digit().sep(1, &lit(","));
    let fix = Fixture::new(&list);
    fix.success("1");
    fix.success("1,2,3");
    // the trailing separator is not consumed
    fix.prefix_expect("1,2,", 3);
    fix.failure("");
    fix.failure(",1");
}

#[test]
fn separated_repetition_with_trailing() {
    let list = digit().sep_trailing(1, &lit(","));
    let fix = Fixture::new(&list);
    fix.success("1,2");
    fix.success("1,2,");
    // only one trailing separator
    fix.prefix_expect("1,2,,", 4);
}

#[test]
fn separated_repetition_minimum_is_enforced() {
    let list = digit().sep(2, &lit(","));
    let fix = Fixture::new(&list);
    fix.failure("1");
    fix.success("1,2");
}

#[test]
fn backtracking_is_lossless() {
    // the first branch pushes a value and logs a store write before
    // failing; the second branch must see pristine state
    let effectful = lit("a").collect(|scope| {
        scope.log().set("seen", Value::Bool(true));
        scope.push(Value::from("partial"));
        Ok(())
    });
    let rule = choice([
        seq([effectful, lit("XYZ")]),
        seq([lit("a"), lit("b")]).as_val("fallback"),
    ]);
    let result = Fixture::new(&rule).success("ab");
    assert_eq!(result.value_stack, vec![Value::from("fallback")]);
    assert!(!result.store.contains("seen"));
}

#[test]
fn committed_effects_survive() {
    let record = |key: &'static str| {
        lit("x").collect(move |scope| {
            scope.log().set(key, Value::Bool(true));
            Ok(())
        })
    };
    let rule = seq([record("first"), record("second")]);
    let result = Fixture::new(&rule).success("xx");
    assert!(result.store.contains("first"));
    assert!(result.store.contains("second"));
}

// ----------------------------------------------------------------------
// Stack actions
// ----------------------------------------------------------------------

#[test]
fn as_val_as_list_as_bool() {
    let fix = Fixture::new(&lit("k").as_val("constant"));
    assert_eq!(fix.success("k").top(), Some(&Value::from("constant")));

    let items = digit().push(|s| Ok(Value::from(s.matched().unwrap_or_default())));
    let listed = items.at_least(0).as_list();
    let result = Fixture::new(&listed).success("123");
    assert_eq!(
        result.top(),
        Some(&Value::List(vec![
            Value::from("1"),
            Value::from("2"),
            Value::from("3"),
        ]))
    );

    let flag = lit("x").opt().as_bool();
    let fix = Fixture::new(&flag);
    assert_eq!(fix.success("x").top(), Some(&Value::Bool(true)));
    assert_eq!(fix.success("").top(), Some(&Value::Bool(false)));
}

#[test]
fn push_sees_the_matched_region() {
    let word = char_pred(|c| c.is_alphabetic())
        .at_least(1)
        .push(|s| Ok(Value::from(s.matched().unwrap_or_default())));
    let result = Fixture::new(&word).success("héllo");
    assert_eq!(result.top(), Some(&Value::from("héllo")));
}

#[test]
fn lookback_extends_the_frame_downward() {
    let tagged = seq([lit("a").as_val("A"), lit("!")])
        .push_lookback(1, |s| Ok(Value::List(s.take_frame())));
    let rule = seq([lit("x").as_val("X"), tagged]);
    let result = Fixture::new(&rule).success("xa!");
    assert_eq!(
        result.value_stack,
        vec![Value::List(vec![Value::from("X"), Value::from("A")])]
    );
}

#[test]
fn action_error_is_fatal_not_a_match_failure() {
    let exploding = lit("x").push(|_| Err("boom".to_string()));
    // an ordered choice cannot recover from a fatal
    let rule = choice([exploding, lit("x").as_val("ok")]);
    let result = run_str(&rule.parser(), "x");
    assert!(!result.success);
    let thrown = result.thrown.expect("fatal is reported");
    assert_eq!(thrown.message, "boom");
    assert!(result.value_stack.is_empty());
}

// ----------------------------------------------------------------------
// Token input
// ----------------------------------------------------------------------

fn lex(words: &[&str]) -> Input {
    let mut tokens = Vec::new();
    let mut offset = 0;
    for word in words {
        tokens.push(Token::new(*word, offset, offset + word.len()));
        offset += word.len() + 1;
    }
    Input::from(tokens)
}

#[test]
fn token_literals_and_predicates() {
    let rule = seq([
        token_lit("if"),
        token_pred(|t| t.value.as_str().map_or(false, |s| s.chars().all(char::is_alphanumeric))),
    ]);
    let fix = Fixture::new(&rule);
    fix.success(lex(&["if", "x1"]));
    fix.failure(lex(&["while", "x1"]));
    fix.failure(lex(&["if"]));
}

#[test]
fn any_consumes_one_token() {
    let result = Fixture::new(&any()).success(lex(&["whatever"]));
    assert_eq!(result.match_size, 1);
}

#[test]
fn char_parser_against_token_input_is_fatal() {
    let result = run(&lit("if").parser(), &lex(&["if"]), ParseOptions::new());
    assert!(!result.success);
    assert!(result.thrown.is_some());
}

// ----------------------------------------------------------------------
// Token choice
// ----------------------------------------------------------------------

#[test]
fn token_choice_is_equivalent_to_ordered_choice() {
    let g = Grammar::new();
    let targets = || {
        [
            g.token_str("true").as_val("kw_true"),
            g.token_str("type").as_val("kw_type"),
            g.token_str("false").as_val("kw_false"),
        ]
    };
    let dispatched = g.token_choice(targets());
    let plain = choice(targets());
    for input in ["true", "type", "false"] {
        let a = run_str(&dispatched.parser(), input);
        let b = run_str(&plain.parser(), input);
        assert!(a.success && b.success, "both match {input}");
        assert_eq!(a.value_stack, b.value_stack, "same value for {input}");
    }
    assert!(!run_str(&dispatched.parser(), "tru").success);
}

#[test]
fn token_choice_falls_back_to_unkeyed_targets() {
    let g = Grammar::new();
    let ident = char_pred(|c| c.is_alphabetic()).at_least(1).as_val("ident");
    let rule = g.token_choice([g.token_str("zebra").as_val("kw"), ident]);
    // same first character as the keyword, different word
    let result = run_str(&rule.parser(), "zulu");
    assert!(result.success);
    assert_eq!(result.top(), Some(&Value::from("ident")));
    // the keyword still wins where it matches
    let result = run_str(&rule.parser(), "zebra");
    assert_eq!(result.top(), Some(&Value::from("kw")));
}
