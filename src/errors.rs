//! Engine-level failure kinds: grammar well-formedness faults and user-raised
//! fatal aborts. Ordinary match failures are not errors; they surface as the
//! furthest error position on the parse result.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A defect found by the static well-formedness analysis. When any fault is
/// produced the driver refuses to start the parse.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum GrammarFault {
    #[error("unprotected left recursion through rule '{rule}': {cycle}")]
    #[diagnostic(
        code(bramble::wellformed::left_recursion),
        help(
            "a rule that invokes itself before consuming input loops forever; \
             use a left/right expression combinator or make an earlier element consume input"
        )
    )]
    LeftRecursion { rule: String, cycle: String },

    #[error("repetition over nullable parser '{rule}'")]
    #[diagnostic(
        code(bramble::wellformed::nullable_repetition),
        help(
            "the operand can succeed without consuming input, so the repetition never makes \
             progress; require at least one consumed element"
        )
    )]
    NullableRepetition { rule: String },

    #[error("separated repetition of '{rule}' where both item and separator are nullable")]
    #[diagnostic(
        code(bramble::wellformed::nullable_separator),
        help("either the item or the separator must consume input on every iteration")
    )]
    NullableSeparator { rule: String },
}

impl GrammarFault {
    /// The rule name the fault points at.
    pub fn rule(&self) -> &str {
        match self {
            GrammarFault::LeftRecursion { rule, .. } => rule,
            GrammarFault::NullableRepetition { rule } => rule,
            GrammarFault::NullableSeparator { rule } => rule,
        }
    }
}

/// An unrecoverable condition raised by a user action. Stored on the parse
/// state; every combinator short-circuits once it is set, and the driver
/// reports it on the result.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("parse aborted at position {pos}: {message}")]
pub struct Fatal {
    pub message: String,
    pub pos: usize,
}

impl Fatal {
    pub fn new(message: impl Into<String>, pos: usize) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}
