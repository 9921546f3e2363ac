//! Stack actions: user functions run after a child parser succeeds,
//! consuming the frame of values the child pushed and producing new ones.
//!
//! Action bodies must not invoke further parsing; their only observable
//! effects are stack pushes and side-effect log appends. An action that
//! returns an error aborts the whole parse (fatal), it does not become an
//! ordinary match failure.

use std::fmt;
use std::sync::Arc;

use crate::log::{SideEffectLog, Store};
use crate::state::Parse;
use crate::value::Value;

use super::ParserRef;

/// Everything an action body gets to see: the child's frame, the matched
/// region, and the parse state for pushes and log appends.
pub struct ActionScope<'p, 'i> {
    pub(crate) parse: &'p mut Parse<'i>,
    pub(crate) frame: Vec<Value>,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) stack0: usize,
}

impl<'p, 'i> ActionScope<'p, 'i> {
    /// The values the child pushed (plus any lookback entries), bottom
    /// first.
    pub fn frame(&self) -> &[Value] {
        &self.frame
    }

    /// Takes ownership of the frame, leaving it empty.
    pub fn take_frame(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.frame)
    }

    /// Input position where the child started.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Input position where the child ended.
    pub fn end(&self) -> usize {
        self.end
    }

    /// The stack size the frame was cut at.
    pub fn frame_base(&self) -> usize {
        self.stack0
    }

    /// The matched input region, for text input.
    pub fn matched(&self) -> Option<&str> {
        self.parse.slice(self.start, self.end)
    }

    /// Pushes a value onto the value stack.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.parse.push(value.into());
    }

    /// The side-effect log, for reversible user-state mutations.
    pub fn log(&mut self) -> &mut SideEffectLog {
        &mut self.parse.log
    }

    /// Read access to the user store.
    pub fn store(&self) -> &Store {
        self.parse.log.store()
    }

    /// The full parse state. Do not invoke parsers from an action body.
    pub fn state(&mut self) -> &mut Parse<'i> {
        self.parse
    }
}

/// An action producing one value to push.
pub type PushFn = Arc<dyn Fn(&mut ActionScope) -> Result<Value, String> + Send + Sync>;

/// A free-form action: pushes zero or more values and/or appends log
/// entries.
pub type CollectFn = Arc<dyn Fn(&mut ActionScope) -> Result<(), String> + Send + Sync>;

/// The operation applied to the child's frame.
#[derive(Clone)]
pub enum ActionOp {
    /// Push the function's result.
    Push(PushFn),
    /// Run the function for its stack/log effects.
    Collect(CollectFn),
    /// Discard the frame and push a constant.
    AsVal(Value),
    /// Push the frame collected into a list.
    AsList,
    /// Push whether the child matched non-empty input.
    AsBool,
}

impl ActionOp {
    pub(super) fn tag(&self) -> &'static str {
        match self {
            ActionOp::Push(_) => "push",
            ActionOp::Collect(_) => "collect",
            ActionOp::AsVal(_) => "as_val",
            ActionOp::AsList => "as_list",
            ActionOp::AsBool => "as_bool",
        }
    }
}

impl fmt::Debug for ActionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Runs the child, then applies the action to the frame it pushed. The frame
/// is the contiguous stack tail above the entry stack size, extended
/// downward by `lookback` pre-existing entries.
pub(super) fn run(parse: &mut Parse, child: &ParserRef, op: &ActionOp, lookback: usize) -> bool {
    let pos0 = parse.pos;
    let stack0 = parse.stack_len();

    if !child.parse(parse) {
        return false;
    }
    if parse.thrown().is_some() {
        return false;
    }

    let base = stack0.saturating_sub(lookback);
    let frame = parse.pop_from(base);
    let end = parse.pos;

    match op {
        ActionOp::AsVal(value) => {
            parse.push(value.clone());
        }
        ActionOp::AsList => {
            parse.push(Value::List(frame));
        }
        ActionOp::AsBool => {
            parse.push(Value::Bool(end > pos0));
        }
        ActionOp::Push(f) => {
            let mut scope = ActionScope {
                parse,
                frame,
                start: pos0,
                end,
                stack0: base,
            };
            match f(&mut scope) {
                Ok(value) => scope.parse.push(value),
                Err(message) => {
                    scope.parse.fatal(message);
                    return false;
                }
            }
        }
        ActionOp::Collect(f) => {
            let mut scope = ActionScope {
                parse,
                frame,
                start: pos0,
                end,
                stack0: base,
            };
            if let Err(message) = f(&mut scope) {
                scope.parse.fatal(message);
                return false;
            }
        }
    }
    true
}
