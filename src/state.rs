//! The parse state: the authoritative, single-owner context for one parse run.
//!
//! Combinators read and write this object under the transactional contract of
//! [`Parser::parse`](crate::combinator::Parser::parse): success commits
//! position advances, stack pushes and log appends; failure restores all
//! three to their values at entry.

use serde::{Deserialize, Serialize};

use crate::errors::Fatal;
use crate::input::Input;
use crate::log::SideEffectLog;
use crate::metrics::ParseMetrics;
use crate::options::ParseOptions;
use crate::value::Value;

/// One entry of the parser invocation stack: the parser's display name and
/// the input position it was invoked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    pub name: String,
    pub pos: usize,
}

/// The state of a single parse. Created per run and discarded once the result
/// is built; never shared between parses.
pub struct Parse<'i> {
    input: &'i Input,
    /// Current input position. Monotonic along a committed path; regresses on
    /// backtrack.
    pub pos: usize,
    stack: Vec<Value>,
    /// The side-effect log and the user store it guards.
    pub log: SideEffectLog,
    pub options: ParseOptions,
    error_pos: Option<usize>,
    error_call_stack: Vec<CallFrame>,
    call_stack: Vec<CallFrame>,
    thrown: Option<Fatal>,
    whitespace_spans: Vec<(usize, usize)>,
    pub(crate) metrics: ParseMetrics,
}

impl<'i> Parse<'i> {
    pub fn new(input: &'i Input, options: ParseOptions) -> Self {
        Self::with_log(input, options, SideEffectLog::new())
    }

    /// Starts a parse over a pre-seeded side-effect log (e.g. a store holding
    /// predefined symbols).
    pub fn with_log(input: &'i Input, options: ParseOptions, log: SideEffectLog) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            log,
            options,
            error_pos: None,
            error_call_stack: Vec::new(),
            call_stack: Vec::new(),
            thrown: None,
            whitespace_spans: Vec::new(),
            metrics: ParseMetrics::new(),
        }
    }

    pub fn input(&self) -> &Input {
        self.input
    }

    /// The text between two positions, for text input.
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        self.input.slice(start, end)
    }

    // ------------------------------------------------------------------
    // Value stack
    // ------------------------------------------------------------------

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    pub fn peek(&self) -> Option<&Value> {
        self.stack.last()
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Removes and returns every value whose index is ≥ `n`, preserving
    /// order. This is how actions collect the frame their child pushed.
    pub fn pop_from(&mut self, n: usize) -> Vec<Value> {
        let n = n.min(self.stack.len());
        self.stack.split_off(n)
    }

    pub(crate) fn truncate_stack(&mut self, len: usize) {
        self.stack.truncate(len);
    }

    pub(crate) fn take_stack(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.stack)
    }

    // ------------------------------------------------------------------
    // Furthest-error tracking
    // ------------------------------------------------------------------

    /// The furthest position at which any parser has failed so far.
    pub fn error_pos(&self) -> Option<usize> {
        self.error_pos
    }

    pub fn error_call_stack(&self) -> &[CallFrame] {
        &self.error_call_stack
    }

    /// Registers a failure at the current position. The furthest error only
    /// ever advances; the call-stack snapshot is replaced on a strict
    /// advance.
    pub(crate) fn register_failure(&mut self) {
        match self.error_pos {
            Some(err) if self.pos <= err => {}
            _ => {
                self.error_pos = Some(self.pos);
                if self.options.record_call_stack {
                    self.error_call_stack = self.call_stack.clone();
                }
            }
        }
    }

    pub(crate) fn take_error_call_stack(&mut self) -> Vec<CallFrame> {
        std::mem::take(&mut self.error_call_stack)
    }

    // ------------------------------------------------------------------
    // Live call stack (only maintained when `record_call_stack` is on)
    // ------------------------------------------------------------------

    pub fn call_stack(&self) -> &[CallFrame] {
        &self.call_stack
    }

    pub(crate) fn enter_frame(&mut self, name: String, pos: usize) {
        self.call_stack.push(CallFrame { name, pos });
    }

    pub(crate) fn leave_frame(&mut self) {
        self.call_stack.pop();
    }

    // ------------------------------------------------------------------
    // Fatal aborts
    // ------------------------------------------------------------------

    /// Raises a fatal condition at the current position. The first one wins;
    /// every combinator short-circuits from here on.
    pub fn fatal(&mut self, message: impl Into<String>) {
        if self.thrown.is_none() {
            self.thrown = Some(Fatal::new(message, self.pos));
        }
    }

    pub fn thrown(&self) -> Option<&Fatal> {
        self.thrown.as_ref()
    }

    pub(crate) fn take_thrown(&mut self) -> Option<Fatal> {
        self.thrown.take()
    }

    // ------------------------------------------------------------------
    // Whitespace tracking
    // ------------------------------------------------------------------

    pub(crate) fn record_whitespace(&mut self, start: usize, end: usize) {
        if self.options.track_whitespace && end > start {
            self.whitespace_spans.push((start, end));
        }
    }

    /// Spans of whitespace consumed by `word`/`token` wrappers, in the order
    /// they were consumed. Only recorded when `track_whitespace` is on.
    pub fn whitespace_spans(&self) -> &[(usize, usize)] {
        &self.whitespace_spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(input: &Input) -> Parse<'_> {
        Parse::new(input, ParseOptions::new())
    }

    #[test]
    fn pop_from_preserves_order_and_clamps() {
        let input = Input::from("x");
        let mut parse = state(&input);
        parse.push(Value::Number(1.0));
        parse.push(Value::Number(2.0));
        parse.push(Value::Number(3.0));

        let frame = parse.pop_from(1);
        assert_eq!(frame, vec![Value::Number(2.0), Value::Number(3.0)]);
        assert_eq!(parse.stack_len(), 1);

        // past-the-end frame base yields an empty frame
        assert_eq!(parse.pop_from(9), Vec::<Value>::new());
    }

    #[test]
    fn error_pos_is_non_decreasing() {
        let input = Input::from("abc");
        let mut parse = state(&input);
        parse.pos = 2;
        parse.register_failure();
        assert_eq!(parse.error_pos(), Some(2));

        parse.pos = 1;
        parse.register_failure();
        assert_eq!(parse.error_pos(), Some(2));

        parse.pos = 3;
        parse.register_failure();
        assert_eq!(parse.error_pos(), Some(3));
    }

    #[test]
    fn first_fatal_wins() {
        let input = Input::from("");
        let mut parse = state(&input);
        parse.fatal("first");
        parse.pos = 1;
        parse.fatal("second");
        assert_eq!(parse.thrown().map(|t| t.message.as_str()), Some("first"));
        assert_eq!(parse.thrown().map(|t| t.pos), Some(0));
    }
}
