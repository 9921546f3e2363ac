//! The fluent grammar-construction surface.
//!
//! [`Rule`] is a cheap handle over a parser node with chainable wrapper
//! methods; free functions build the leaves. A [`Grammar`] carries the
//! configured whitespace parser for `word`/`token` wrapping and hands out
//! the expression builders. Everything here only assembles immutable graphs;
//! the engine itself needs nothing from this module.

use std::sync::{Arc, OnceLock};

use crate::combinator::{
    ActionOp, ActionScope, ExprStep, ExpressionSpec, Kind, LazyLink, Parser, ParserRef, StepKind,
};
use crate::input::Token;
use crate::value::Value;

/// A handle over a parser node. Cloning shares the node.
#[derive(Clone, Debug)]
pub struct Rule(ParserRef);

impl Rule {
    pub(crate) fn wrap(kind: Kind) -> Self {
        Rule(Parser::new(kind))
    }

    /// The underlying parser node.
    pub fn parser(&self) -> ParserRef {
        self.0.clone()
    }

    /// Labels this node as a grammar rule; the label shows up in call
    /// stacks, diagnostics and metrics. The first label sticks.
    pub fn named(self, name: &str) -> Self {
        self.0.set_label(name);
        self
    }

    // ------------------------------------------------------------------
    // Wrappers
    // ------------------------------------------------------------------

    /// Matches this rule or nothing.
    pub fn opt(&self) -> Rule {
        Rule::wrap(Kind::Opt(self.0.clone()))
    }

    /// Negative lookahead: succeeds iff this rule fails, consuming nothing.
    pub fn not(&self) -> Rule {
        Rule::wrap(Kind::Not(self.0.clone()))
    }

    /// Positive lookahead: succeeds iff this rule succeeds, consuming
    /// nothing.
    pub fn ahead(&self) -> Rule {
        Rule::wrap(Kind::Ahead(self.0.clone()))
    }

    /// Greedy repetition with at least `min` matches, unbounded above.
    pub fn at_least(&self, min: usize) -> Rule {
        Rule::wrap(Kind::Repeat {
            child: self.0.clone(),
            min,
            max: None,
        })
    }

    /// Greedy repetition with an inclusive bound.
    pub fn repeat(&self, min: usize, max: usize) -> Rule {
        Rule::wrap(Kind::Repeat {
            child: self.0.clone(),
            min,
            max: Some(max),
        })
    }

    /// `self (sep self)*` with at least `min` matches; a trailing separator
    /// is not consumed.
    pub fn sep(&self, min: usize, sep: &Rule) -> Rule {
        Rule::wrap(Kind::Sep {
            child: self.0.clone(),
            sep: sep.0.clone(),
            min,
            trailing: false,
        })
    }

    /// Like [`sep`](Rule::sep), but one trailing separator may be consumed.
    pub fn sep_trailing(&self, min: usize, sep: &Rule) -> Rule {
        Rule::wrap(Kind::Sep {
            child: self.0.clone(),
            sep: sep.0.clone(),
            min,
            trailing: true,
        })
    }

    // ------------------------------------------------------------------
    // Stack actions
    // ------------------------------------------------------------------

    fn action(&self, op: ActionOp, lookback: usize) -> Rule {
        Rule::wrap(Kind::Action {
            child: self.0.clone(),
            op,
            lookback,
        })
    }

    /// After this rule succeeds, pops its frame and pushes the function's
    /// result. An `Err` aborts the parse.
    pub fn push<F>(&self, f: F) -> Rule
    where
        F: Fn(&mut ActionScope) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.action(ActionOp::Push(Arc::new(f)), 0)
    }

    /// Like [`push`](Rule::push), with the frame extended downward by
    /// `lookback` values already on the stack.
    pub fn push_lookback<F>(&self, lookback: usize, f: F) -> Rule
    where
        F: Fn(&mut ActionScope) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.action(ActionOp::Push(Arc::new(f)), lookback)
    }

    /// After this rule succeeds, pops its frame and runs the function for
    /// its stack/log effects.
    pub fn collect<F>(&self, f: F) -> Rule
    where
        F: Fn(&mut ActionScope) -> Result<(), String> + Send + Sync + 'static,
    {
        self.action(ActionOp::Collect(Arc::new(f)), 0)
    }

    /// Like [`collect`](Rule::collect), with downward-extended frame.
    pub fn collect_lookback<F>(&self, lookback: usize, f: F) -> Rule
    where
        F: Fn(&mut ActionScope) -> Result<(), String> + Send + Sync + 'static,
    {
        self.action(ActionOp::Collect(Arc::new(f)), lookback)
    }

    /// Discards the frame and pushes a constant.
    pub fn as_val(&self, value: impl Into<Value>) -> Rule {
        self.action(ActionOp::AsVal(value.into()), 0)
    }

    /// Collects the frame into a pushed list.
    pub fn as_list(&self) -> Rule {
        self.action(ActionOp::AsList, 0)
    }

    /// Pushes whether the rule matched non-empty input.
    pub fn as_bool(&self) -> Rule {
        self.action(ActionOp::AsBool, 0)
    }
}

// ----------------------------------------------------------------------
// Leaf constructors
// ----------------------------------------------------------------------

/// A fixed character sequence. The empty literal matches without consuming.
pub fn lit(text: &str) -> Rule {
    Rule::wrap(Kind::Literal(text.to_string()))
}

/// A single fixed character.
pub fn chr(c: char) -> Rule {
    Rule::wrap(Kind::Literal(c.to_string()))
}

/// Exactly one element (character or token); fails only at end of input.
pub fn any() -> Rule {
    Rule::wrap(Kind::Any)
}

/// One character out of the given set.
pub fn set(chars: &str) -> Rule {
    Rule::wrap(Kind::CharSet(chars.chars().collect()))
}

/// One character in the inclusive range.
pub fn range(lo: char, hi: char) -> Rule {
    Rule::wrap(Kind::CharRange(lo, hi))
}

/// One decimal digit.
pub fn digit() -> Rule {
    range('0', '9')
}

/// One hexadecimal digit.
pub fn hex_digit() -> Rule {
    Rule::wrap(Kind::Choice(vec![
        range('0', '9').0,
        range('a', 'f').0,
        range('A', 'F').0,
    ]))
}

/// One character satisfying the predicate.
pub fn char_pred(f: impl Fn(char) -> bool + Send + Sync + 'static) -> Rule {
    Rule::wrap(Kind::CharPred(Arc::new(f)))
}

/// One token satisfying the predicate (token input only).
pub fn token_pred(f: impl Fn(&Token) -> bool + Send + Sync + 'static) -> Rule {
    Rule::wrap(Kind::TokenPred(Arc::new(f)))
}

/// One token whose value equals the given one (token input only).
pub fn token_lit(value: impl Into<Value>) -> Rule {
    Rule::wrap(Kind::TokenLit(value.into()))
}

/// All rules in order.
pub fn seq(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::wrap(Kind::Seq(rules.into_iter().map(|r| r.0).collect()))
}

/// The first matching rule, tried in order.
pub fn choice(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::wrap(Kind::Choice(rules.into_iter().map(|r| r.0).collect()))
}

/// Memoizing indirection: the supplier runs on first use, enabling rules
/// that refer to themselves or to rules defined later.
pub fn lazy(f: impl Fn() -> Rule + Send + Sync + 'static) -> Rule {
    Rule::wrap(Kind::Lazy(LazyLink::new(move || f().0)))
}

// ----------------------------------------------------------------------
// Grammar context
// ----------------------------------------------------------------------

/// Grammar-wide configuration: the whitespace parser consumed by
/// `word`/`token` wrappers, and the expression builders.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    ws: Option<ParserRef>,
}

impl Grammar {
    /// A grammar with no whitespace handling.
    pub fn new() -> Self {
        Self::default()
    }

    /// A grammar whose words swallow runs of blanks, tabs and newlines.
    pub fn with_usual_whitespace() -> Self {
        let ws = set(" \t\n\r").at_least(0).named("ws");
        Self { ws: Some(ws.0) }
    }

    pub fn set_whitespace(&mut self, rule: &Rule) {
        self.ws = Some(rule.0.clone());
    }

    pub fn whitespace(&self) -> Option<Rule> {
        self.ws.clone().map(Rule)
    }

    /// The rule followed by whitespace.
    pub fn word(&self, rule: &Rule) -> Rule {
        Rule::wrap(Kind::Word {
            child: rule.0.clone(),
            ws: self.ws.clone(),
        })
    }

    /// A literal followed by whitespace.
    pub fn word_str(&self, text: &str) -> Rule {
        self.word(&lit(text))
    }

    /// The rule followed by whitespace, marked as a whole-token boundary.
    pub fn token(&self, rule: &Rule) -> Rule {
        Rule::wrap(Kind::TokenSpec {
            child: rule.0.clone(),
            ws: self.ws.clone(),
        })
    }

    /// A literal token followed by whitespace.
    pub fn token_str(&self, text: &str) -> Rule {
        self.token(&lit(text))
    }

    /// First-character dispatch over whole-token alternatives; semantically
    /// an ordered choice over `targets`.
    pub fn token_choice(&self, targets: impl IntoIterator<Item = Rule>) -> Rule {
        Rule::wrap(Kind::TokenChoice {
            targets: targets.into_iter().map(|r| r.0).collect(),
            table: OnceLock::new(),
        })
    }

    /// Builder for a left-associative expression level.
    pub fn left_expr(&self) -> ExpressionBuilder {
        ExpressionBuilder::new(Assoc::Left)
    }

    /// Builder for a right-associative expression level.
    pub fn right_expr(&self) -> ExpressionBuilder {
        ExpressionBuilder::new(Assoc::Right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

/// Assembles a [`left_expr`](Grammar::left_expr) /
/// [`right_expr`](Grammar::right_expr) combinator. Operator alternatives are
/// tried in the order they are registered.
pub struct ExpressionBuilder {
    assoc: Assoc,
    left: Option<ParserRef>,
    right: Option<ParserRef>,
    steps: Vec<ExprStep>,
    operator_required: bool,
}

impl ExpressionBuilder {
    fn new(assoc: Assoc) -> Self {
        Self {
            assoc,
            left: None,
            right: None,
            steps: Vec::new(),
            operator_required: false,
        }
    }

    /// The operand on both sides of the operators (shorthand for equal
    /// `left` and `right`).
    pub fn operand(mut self, rule: &Rule) -> Self {
        self.left = Some(rule.0.clone());
        self
    }

    /// The leftmost operand.
    pub fn left(mut self, rule: &Rule) -> Self {
        self.left = Some(rule.0.clone());
        self
    }

    /// The right-hand operand for infix steps; defaults to the left one.
    pub fn right(mut self, rule: &Rule) -> Self {
        self.right = Some(rule.0.clone());
        self
    }

    /// An infix operator with the step action folding the accumulated frame
    /// into the new left operand.
    pub fn infix<F>(mut self, op: &Rule, f: F) -> Self
    where
        F: Fn(&mut ActionScope) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.steps.push(ExprStep {
            kind: StepKind::Infix,
            op: op.0.clone(),
            action: Some(Arc::new(f)),
        });
        self
    }

    /// A postfix operator with its step action.
    pub fn suffix<F>(mut self, op: &Rule, f: F) -> Self
    where
        F: Fn(&mut ActionScope) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.steps.push(ExprStep {
            kind: StepKind::Suffix,
            op: op.0.clone(),
            action: Some(Arc::new(f)),
        });
        self
    }

    /// Requires at least one operator; a bare operand no longer matches.
    pub fn operator_required(mut self) -> Self {
        self.operator_required = true;
        self
    }

    pub fn build(self) -> Rule {
        let left = self
            .left
            .expect("expression combinator requires an operand");
        let right = self.right.unwrap_or_else(|| left.clone());
        let spec = ExpressionSpec {
            left,
            right,
            steps: self.steps,
            operator_required: self.operator_required,
        };
        match self.assoc {
            Assoc::Left => Rule::wrap(Kind::LeftExpr(spec)),
            Assoc::Right => Rule::wrap(Kind::RightExpr(spec)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_share_their_node() {
        let number = digit().at_least(1).named("number");
        let copy = number.clone();
        assert!(Arc::ptr_eq(&number.parser(), &copy.parser()));
        assert_eq!(number.parser().rule_name(), Some("number"));
    }

    #[test]
    fn first_label_sticks() {
        let rule = lit("x").named("first").named("second");
        assert_eq!(rule.parser().rule_name(), Some("first"));
    }

    #[test]
    fn display_reflects_structure_and_labels() {
        let rule = seq([lit("a"), lit("b").opt()]);
        assert_eq!(rule.parser().to_string(), r#"seq(literal("a"), opt(literal("b")))"#);
        let named = rule.named("ab");
        assert_eq!(named.parser().to_string(), "ab");
    }
}
