//! Left- and right-associative expression combinators.
//!
//! These replace general left-recursion handling: a left-recursive binary
//! expression is written as an operand plus a loop (left) or a recursion
//! (right) over operator alternatives, with a step action folding the
//! accumulated frame into a single value after each operator. The frame for
//! every step is cut at the stack size observed before the leftmost operand,
//! so the previously folded value arrives as the frame head.
//!
//! Every operator trial is checkpointed as a unit: an operator that matches
//! but whose right-hand side fails is rolled back completely before the next
//! alternative is tried.

use crate::state::Parse;

use super::action::{ActionScope, PushFn};
use super::ParserRef;

/// Whether a step parses a right-hand operand after its operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// `op` then a right-hand operand (the shared `right` parser for the
    /// left combinator, a recursive full expression for the right one).
    Infix,
    /// `op` alone (postfix operators).
    Suffix,
}

/// One operator alternative, tried in registration order.
#[derive(Clone)]
pub struct ExprStep {
    pub(crate) kind: StepKind,
    pub(crate) op: ParserRef,
    pub(crate) action: Option<PushFn>,
}

/// The full description of an expression level.
#[derive(Clone)]
pub struct ExpressionSpec {
    /// Leftmost operand.
    pub(crate) left: ParserRef,
    /// Right-hand operand for infix steps; defaults to `left`.
    pub(crate) right: ParserRef,
    pub(crate) steps: Vec<ExprStep>,
    /// Fail unless at least one operator was consumed.
    pub(crate) operator_required: bool,
}

impl ExpressionSpec {
    pub(crate) fn children(&self) -> Vec<ParserRef> {
        let mut out = vec![self.left.clone(), self.right.clone()];
        out.extend(self.steps.iter().map(|step| step.op.clone()));
        out
    }
}

/// Applies a step action to the frame accumulated since `size0`, pushing its
/// single result (the new left operand). Returns false on a fatal.
fn apply_step(
    parse: &mut Parse,
    action: &Option<PushFn>,
    pos0: usize,
    size0: usize,
) -> bool {
    let Some(action) = action else {
        return true;
    };
    let frame = parse.pop_from(size0);
    let end = parse.pos;
    let mut scope = ActionScope {
        parse,
        frame,
        start: pos0,
        end,
        stack0: size0,
    };
    match action(&mut scope) {
        Ok(value) => {
            scope.parse.push(value);
            true
        }
        Err(message) => {
            scope.parse.fatal(message);
            false
        }
    }
}

/// Left-associative: operand, then operator steps folded as they appear.
pub(super) fn left(parse: &mut Parse, spec: &ExpressionSpec) -> bool {
    let pos0 = parse.pos;
    let size0 = parse.stack_len();

    if !spec.left.parse(parse) {
        return false;
    }

    let mut operators = 0;
    'fold: loop {
        if parse.thrown().is_some() {
            return false;
        }
        for step in &spec.steps {
            let pos1 = parse.pos;
            let stack1 = parse.stack_len();
            let log1 = parse.log.len();
            let matched = match step.kind {
                StepKind::Infix => step.op.parse(parse) && spec.right.parse(parse),
                StepKind::Suffix => step.op.parse(parse),
            };
            if parse.thrown().is_some() {
                return false;
            }
            if matched {
                if !apply_step(parse, &step.action, pos0, size0) {
                    return false;
                }
                operators += 1;
                // a zero-width operator step cannot make progress
                if parse.pos == pos1 {
                    break 'fold;
                }
                continue 'fold;
            }
            parse.pos = pos1;
            parse.truncate_stack(stack1);
            parse.log.truncate(log1);
        }
        break;
    }

    !(spec.operator_required && operators == 0)
}

/// Right-associative: after an operator, the whole expression recurses to
/// parse the right-hand side, so the rightmost operator binds tightest.
/// `operator_required` only constrains the outermost level; inner levels
/// accept a bare operand, which terminates the recursion.
pub(super) fn right(parse: &mut Parse, spec: &ExpressionSpec) -> bool {
    descend(parse, spec, spec.operator_required)
}

fn descend(parse: &mut Parse, spec: &ExpressionSpec, operator_required: bool) -> bool {
    let pos0 = parse.pos;
    let size0 = parse.stack_len();

    if !spec.left.parse(parse) {
        return false;
    }
    if parse.thrown().is_some() {
        return false;
    }

    for step in &spec.steps {
        let pos1 = parse.pos;
        let stack1 = parse.stack_len();
        let log1 = parse.log.len();
        let matched = match step.kind {
            StepKind::Infix => {
                step.op.parse(parse) && parse.pos > pos0 && descend(parse, spec, false)
            }
            StepKind::Suffix => step.op.parse(parse),
        };
        if parse.thrown().is_some() {
            return false;
        }
        if matched {
            return apply_step(parse, &step.action, pos0, size0);
        }
        parse.pos = pos1;
        parse.truncate_stack(stack1);
        parse.log.truncate(log1);
    }

    !operator_required
}
