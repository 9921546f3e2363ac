//! Assertion helpers for testing grammars: `success`, `prefix` and
//! `failure` variants over a target rule.
//!
//! Every assertion runs the parse twice on fresh states and fails on any
//! divergence between the runs — the cheapest way to catch improper state
//! handling in user actions. Disable with `run_twice` if a grammar is known
//! to be effectful on purpose.

use crate::combinator::ParserRef;
use crate::engine::{self, ParseResult};
use crate::grammar::Rule;
use crate::input::Input;
use crate::options::ParseOptions;
use crate::value::Value;

pub struct Fixture {
    rule: ParserRef,
    /// Options used for both runs; built from the flags below when None.
    pub options: Option<ParseOptions>,
    /// Run each parse twice to detect non-determinism. On by default.
    pub run_twice: bool,
    /// Record parser call stacks so failures render where they happened. On
    /// by default; turn off to speed tests up.
    pub record_call_stack: bool,
    /// Check grammar well-formedness on each run. On by default.
    pub well_formedness_check: bool,
}

impl Fixture {
    pub fn new(rule: &Rule) -> Self {
        Self {
            rule: rule.parser(),
            options: None,
            run_twice: true,
            record_call_stack: true,
            well_formedness_check: true,
        }
    }

    fn options(&self) -> ParseOptions {
        match &self.options {
            Some(options) => options.clone(),
            None => ParseOptions::builder()
                .record_call_stack(self.record_call_stack)
                .well_formedness_check(self.well_formedness_check)
                .build(),
        }
    }

    /// Runs the parse (twice when `run_twice`), panicking on divergence.
    pub fn run(&self, input: &Input) -> ParseResult {
        let first = engine::run(&self.rule, input, self.options());
        if self.run_twice {
            let second = engine::run(&self.rule, input, self.options());
            if let Err(divergence) = first.agrees_with(&second) {
                panic!(
                    "parse is non-deterministic (state mishandling in an action?): {divergence}"
                );
            }
        }
        first
    }

    fn describe(result: &ParseResult) -> String {
        let mut out = String::new();
        if let Some(fault) = result.faults.first() {
            out.push_str(&format!("grammar fault: {fault}\n"));
        }
        if let Some(thrown) = &result.thrown {
            out.push_str(&format!("thrown: {thrown}\n"));
        }
        if let Some(pos) = result.error_pos {
            out.push_str(&format!("furthest error at {pos}\n"));
        }
        for frame in &result.error_call_stack {
            out.push_str(&format!("  in {} at {}\n", frame.name, frame.pos));
        }
        out
    }

    /// Asserts the rule matches the whole input.
    pub fn success(&self, input: impl Into<Input>) -> ParseResult {
        let input = input.into();
        let result = self.run(&input);
        assert!(
            result.success && result.full_match,
            "expected a full match (consumed {}/{}):\n{}",
            result.match_size,
            input.len(),
            Self::describe(&result)
        );
        result
    }

    /// Asserts a full match whose stack top equals `expected`.
    pub fn success_expect(&self, input: impl Into<Input>, expected: impl Into<Value>) -> ParseResult {
        let result = self.success(input);
        let expected = expected.into();
        assert_eq!(
            result.top(),
            Some(&expected),
            "matched, but produced a different value"
        );
        result
    }

    /// Asserts the rule matches a prefix of the input (possibly all of it).
    pub fn prefix(&self, input: impl Into<Input>) -> ParseResult {
        let input = input.into();
        let result = self.run(&input);
        assert!(
            result.success,
            "expected a prefix match:\n{}",
            Self::describe(&result)
        );
        result
    }

    /// Asserts a prefix match consuming exactly `size` units.
    pub fn prefix_expect(&self, input: impl Into<Input>, size: usize) -> ParseResult {
        let result = self.prefix(input);
        assert_eq!(
            result.match_size, size,
            "prefix match consumed a different length"
        );
        result
    }

    /// Asserts the rule does not match.
    pub fn failure(&self, input: impl Into<Input>) -> ParseResult {
        let input = input.into();
        let result = self.run(&input);
        assert!(
            !result.success,
            "expected a failure, but the parse succeeded consuming {} units",
            result.match_size
        );
        result
    }

    /// Asserts a failure whose furthest error is at `pos`.
    pub fn failure_at(&self, input: impl Into<Input>, pos: usize) -> ParseResult {
        let result = self.failure(input);
        assert_eq!(
            result.error_pos,
            Some(pos),
            "failure reported at a different position:\n{}",
            Self::describe(&result)
        );
        result
    }
}
