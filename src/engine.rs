//! The top-level driver: builds a parse state, optionally runs the
//! well-formedness analysis, invokes the root parser, and assembles the
//! result. The driver never mutates the parser graph, so a graph can be
//! shared across parses.

use crate::combinator::ParserRef;
use crate::errors::{Fatal, GrammarFault};
use crate::input::Input;
use crate::log::{SideEffectLog, Store};
use crate::options::ParseOptions;
use crate::state::{CallFrame, Parse};
use crate::value::Value;
use crate::wellformed;

/// Everything a finished parse reports.
///
/// `success` and `full_match` are distinct on purpose: a parser may
/// legitimately match a prefix of the input (`success && !full_match`), and
/// several fixture assertions rely on the distinction.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// Whether the root parser matched.
    pub success: bool,
    /// Whether the root parser matched *and* consumed the whole input.
    pub full_match: bool,
    /// Units consumed: bytes for text input, tokens for token input.
    pub match_size: usize,
    /// The final value stack; on a successful full match this holds the AST,
    /// usually as a single value.
    pub value_stack: Vec<Value>,
    /// Furthest position at which any parser failed.
    pub error_pos: Option<usize>,
    /// Parser invocation stack at the furthest error, when recording was on.
    pub error_call_stack: Vec<CallFrame>,
    /// The fatal condition a user action raised, if any.
    pub thrown: Option<Fatal>,
    /// Well-formedness faults; non-empty only when the check refused the
    /// grammar, in which case nothing was parsed.
    pub faults: Vec<GrammarFault>,
    /// The user store as the parse left it.
    pub store: Store,
}

impl ParseResult {
    /// The top of the final value stack.
    pub fn top(&self) -> Option<&Value> {
        self.value_stack.last()
    }

    /// Whether the grammar passed (or skipped) the well-formedness check.
    pub fn is_well_formed(&self) -> bool {
        self.faults.is_empty()
    }

    /// Compares the fields that must be identical across repeated parses of
    /// the same input: success, consumed length, furthest error, thrown
    /// kind, and the produced values. A divergence indicates a state-handling
    /// bug in a user action.
    pub fn agrees_with(&self, other: &ParseResult) -> Result<(), String> {
        if self.success != other.success {
            return Err(format!(
                "success diverged between runs: {} vs {}",
                self.success, other.success
            ));
        }
        if self.match_size != other.match_size {
            return Err(format!(
                "consumed length diverged between runs: {} vs {}",
                self.match_size, other.match_size
            ));
        }
        if self.error_pos != other.error_pos {
            return Err(format!(
                "furthest error position diverged between runs: {:?} vs {:?}",
                self.error_pos, other.error_pos
            ));
        }
        if self.thrown != other.thrown {
            return Err(format!(
                "thrown condition diverged between runs: {:?} vs {:?}",
                self.thrown, other.thrown
            ));
        }
        if self.value_stack != other.value_stack {
            return Err("value stack diverged between runs".to_string());
        }
        Ok(())
    }

    fn refused(faults: Vec<GrammarFault>) -> Self {
        Self {
            success: false,
            full_match: false,
            match_size: 0,
            value_stack: Vec::new(),
            error_pos: None,
            error_call_stack: Vec::new(),
            thrown: None,
            faults,
            store: Store::new(),
        }
    }
}

/// Runs `root` against `input` under `options`.
pub fn run(root: &ParserRef, input: &Input, options: ParseOptions) -> ParseResult {
    run_with_store(root, input, options, Store::new())
}

/// Like [`run`], but seeds the user store (e.g. with predefined symbols).
pub fn run_with_store(
    root: &ParserRef,
    input: &Input,
    options: ParseOptions,
    store: Store,
) -> ParseResult {
    if options.well_formedness_check {
        let faults = wellformed::check(root);
        if !faults.is_empty() {
            return ParseResult::refused(faults);
        }
    }

    let mut parse = Parse::with_log(input, options, SideEffectLog::with_store(store));
    let success = root.parse(&mut parse);

    if parse.options.trace {
        if let Some(sink) = &parse.options.metrics {
            if let Ok(mut aggregate) = sink.lock() {
                aggregate.merge(&parse.metrics);
            }
        }
    }

    ParseResult {
        success,
        full_match: success && parse.pos == input.len(),
        match_size: parse.pos,
        value_stack: parse.take_stack(),
        error_pos: parse.error_pos(),
        error_call_stack: parse.take_error_call_stack(),
        thrown: parse.take_thrown(),
        faults: Vec::new(),
        store: parse.log.into_store(),
    }
}

/// Convenience entry point for text input with default options.
pub fn run_str(root: &ParserRef, input: &str) -> ParseResult {
    run(root, &Input::from(input), ParseOptions::new())
}
