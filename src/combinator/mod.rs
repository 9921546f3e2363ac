//! The combinator graph and its invocation contract.
//!
//! A parser is an immutable node: an optional rule label plus a tagged
//! [`Kind`] naming one combinator variant. Nodes are shared as
//! [`ParserRef`]s; cycles go through the `lazy` indirection. All matching
//! goes through [`Parser::parse`], the wrapper that enforces the
//! transactional contract; the per-variant logic lives in `doparse` and the
//! submodules.

pub mod action;
pub mod expression;
mod primitives;
pub(crate) mod structural;

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use crate::input::Token;
use crate::state::Parse;
use crate::value::Value;

pub use action::{ActionOp, ActionScope, CollectFn, PushFn};
pub use expression::{ExprStep, ExpressionSpec, StepKind};

/// Shared handle to a parser node.
pub type ParserRef = Arc<Parser>;

/// Predicate over a single input character.
pub type CharPredFn = Arc<dyn Fn(char) -> bool + Send + Sync>;

/// Predicate over a single input token.
pub type TokenPredFn = Arc<dyn Fn(&Token) -> bool + Send + Sync>;

/// The memoizing indirection that enables cyclic grammars: resolves its
/// target once, on first use, and forwards to it from then on.
pub struct LazyLink {
    supplier: Mutex<Option<Box<dyn Fn() -> ParserRef + Send + Sync>>>,
    target: OnceLock<ParserRef>,
}

impl LazyLink {
    pub(crate) fn new(supplier: impl Fn() -> ParserRef + Send + Sync + 'static) -> Self {
        Self {
            supplier: Mutex::new(Some(Box::new(supplier))),
            target: OnceLock::new(),
        }
    }

    /// The resolved target, invoking the supplier on first access. None if
    /// the link never received a supplier (a construction bug). The lock is
    /// held across initialization so concurrent parses sharing the graph
    /// resolve to the same node.
    pub fn resolve(&self) -> Option<ParserRef> {
        if let Some(target) = self.target.get() {
            return Some(target.clone());
        }
        let guard = self.supplier.lock().ok()?;
        if let Some(target) = self.target.get() {
            return Some(target.clone());
        }
        let target = guard.as_ref().map(|supplier| supplier())?;
        let _ = self.target.set(target.clone());
        Some(target)
    }
}

/// One combinator variant. The tagged representation keeps dispatch flat and
/// makes graph traversal (children, well-formedness) a single match.
pub(crate) enum Kind {
    /// Fixed character sequence; the empty literal matches without consuming.
    Literal(String),
    /// Exactly one element, character or token.
    Any,
    CharPred(CharPredFn),
    CharRange(char, char),
    CharSet(Vec<char>),
    TokenPred(TokenPredFn),
    /// One token whose value equals the given one.
    TokenLit(Value),
    /// Succeeds iff the child fails; never moves the position.
    Not(ParserRef),
    /// Positive lookahead: succeeds iff the child succeeds, consuming nothing.
    Ahead(ParserRef),
    Seq(Vec<ParserRef>),
    /// Ordered choice: first success wins.
    Choice(Vec<ParserRef>),
    Opt(ParserRef),
    /// Greedy repetition; `max: None` is unbounded.
    Repeat {
        child: ParserRef,
        min: usize,
        max: Option<usize>,
    },
    /// `child (sep child)*`, optionally allowing one trailing separator.
    Sep {
        child: ParserRef,
        sep: ParserRef,
        min: usize,
        trailing: bool,
    },
    /// Child followed by the configured whitespace parser.
    Word {
        child: ParserRef,
        ws: Option<ParserRef>,
    },
    /// Like `Word`, but additionally marks a whole-token boundary; these are
    /// the units `TokenChoice` dispatches over.
    TokenSpec {
        child: ParserRef,
        ws: Option<ParserRef>,
    },
    /// First-character dispatch over whole-token alternatives; semantically
    /// an ordered choice.
    TokenChoice {
        targets: Vec<ParserRef>,
        table: OnceLock<structural::DispatchTable>,
    },
    /// Child wrapped with a stack action applied after the child succeeds.
    Action {
        child: ParserRef,
        op: ActionOp,
        lookback: usize,
    },
    LeftExpr(ExpressionSpec),
    RightExpr(ExpressionSpec),
    Lazy(LazyLink),
}

/// An immutable parser node. See the module docs.
pub struct Parser {
    label: OnceLock<String>,
    kind: Kind,
}

impl Parser {
    pub(crate) fn new(kind: Kind) -> ParserRef {
        Arc::new(Self {
            label: OnceLock::new(),
            kind,
        })
    }

    pub(crate) fn kind(&self) -> &Kind {
        &self.kind
    }

    /// The grammar-rule label, if the builder assigned one.
    pub fn rule_name(&self) -> Option<&str> {
        self.label.get().map(String::as_str)
    }

    /// Assigns the rule label. The first assignment wins; returns whether
    /// this call set it.
    pub fn set_label(&self, name: impl Into<String>) -> bool {
        self.label.set(name.into()).is_ok()
    }

    /// Stable identity of this node, used to key metrics and graph traversal.
    pub(crate) fn key(&self) -> usize {
        self as *const Parser as usize
    }

    /// Runs this parser against the state, enforcing the combinator
    /// contract:
    ///
    /// - on success, the position advance and any stack pushes or log
    ///   appends stay in place;
    /// - on failure, position, stack size and log length are restored to
    ///   their values at entry, and the furthest error position is updated
    ///   first;
    /// - once a fatal has been raised, returns false without doing anything.
    pub fn parse(&self, parse: &mut Parse) -> bool {
        if parse.thrown().is_some() {
            return false;
        }

        let pos0 = parse.pos;
        let stack0 = parse.stack_len();
        let log0 = parse.log.len();

        let recording = parse.options.record_call_stack;
        if recording {
            parse.enter_frame(self.to_string(), pos0);
        }
        let started = if parse.options.trace {
            Some(Instant::now())
        } else {
            None
        };

        let matched = self.doparse(parse);

        if let Some(t0) = started {
            let name = self.to_string();
            parse.metrics.record(self.key(), &name, matched, t0.elapsed());
        }

        if parse.thrown().is_some() {
            if recording {
                parse.leave_frame();
            }
            return false;
        }

        if !matched {
            parse.register_failure();
            parse.pos = pos0;
            parse.truncate_stack(stack0);
            parse.log.truncate(log0);
        }

        if recording {
            parse.leave_frame();
        }
        matched
    }

    fn doparse(&self, parse: &mut Parse) -> bool {
        match &self.kind {
            Kind::Literal(text) => primitives::literal(parse, text),
            Kind::Any => primitives::any(parse),
            Kind::CharPred(pred) => primitives::char_pred(parse, pred),
            Kind::CharRange(lo, hi) => primitives::char_range(parse, *lo, *hi),
            Kind::CharSet(chars) => primitives::char_set(parse, chars),
            Kind::TokenPred(pred) => primitives::token_pred(parse, pred),
            Kind::TokenLit(value) => primitives::token_lit(parse, value),
            Kind::Not(child) => primitives::not(parse, child),
            Kind::Ahead(child) => primitives::ahead(parse, child),
            Kind::Seq(children) => primitives::seq(parse, children),
            Kind::Choice(children) => primitives::choice(parse, children),
            Kind::Opt(child) => primitives::opt(parse, child),
            Kind::Repeat { child, min, max } => primitives::repeat(parse, child, *min, *max),
            Kind::Sep {
                child,
                sep,
                min,
                trailing,
            } => structural::separated(parse, child, sep, *min, *trailing),
            Kind::Word { child, ws } | Kind::TokenSpec { child, ws } => {
                structural::word(parse, child, ws.as_ref())
            }
            Kind::TokenChoice { targets, table } => {
                structural::token_choice(parse, targets, table)
            }
            Kind::Action {
                child,
                op,
                lookback,
            } => action::run(parse, child, op, *lookback),
            Kind::LeftExpr(spec) => expression::left(parse, spec),
            Kind::RightExpr(spec) => expression::right(parse, spec),
            Kind::Lazy(link) => primitives::lazy(parse, link),
        }
    }

    /// The direct children of this node. Lazy nodes report their resolved
    /// target (resolving it if needed); an undefined lazy reports none.
    pub fn children(&self) -> Vec<ParserRef> {
        match &self.kind {
            Kind::Literal(_)
            | Kind::Any
            | Kind::CharPred(_)
            | Kind::CharRange(_, _)
            | Kind::CharSet(_)
            | Kind::TokenPred(_)
            | Kind::TokenLit(_) => Vec::new(),
            Kind::Not(child) | Kind::Ahead(child) | Kind::Opt(child) => vec![child.clone()],
            Kind::Seq(children) | Kind::Choice(children) => children.clone(),
            Kind::Repeat { child, .. } => vec![child.clone()],
            Kind::Sep { child, sep, .. } => vec![child.clone(), sep.clone()],
            Kind::Word { child, ws } | Kind::TokenSpec { child, ws } => {
                let mut out = vec![child.clone()];
                out.extend(ws.iter().cloned());
                out
            }
            Kind::TokenChoice { targets, .. } => targets.clone(),
            Kind::Action { child, .. } => vec![child.clone()],
            Kind::LeftExpr(spec) | Kind::RightExpr(spec) => spec.children(),
            Kind::Lazy(link) => link.resolve().into_iter().collect(),
        }
    }

    /// Depth-first traversal over the graph reachable from `root`, visiting
    /// each node once (by identity, so cycles terminate).
    pub fn walk(root: &ParserRef, visit: &mut impl FnMut(&ParserRef)) {
        fn go(
            node: &ParserRef,
            seen: &mut std::collections::HashSet<usize>,
            visit: &mut impl FnMut(&ParserRef),
        ) {
            if !seen.insert(node.key()) {
                return;
            }
            visit(node);
            for child in node.children() {
                go(&child, seen, visit);
            }
        }
        go(root, &mut std::collections::HashSet::new(), visit)
    }
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.rule_name() {
            return write!(f, "{name}");
        }
        match &self.kind {
            Kind::Literal(text) => write!(f, "literal({text:?})"),
            Kind::Any => write!(f, "any"),
            Kind::CharPred(_) => write!(f, "char_pred"),
            Kind::CharRange(lo, hi) => write!(f, "range({lo:?}, {hi:?})"),
            Kind::CharSet(chars) => {
                write!(f, "set({:?})", chars.iter().collect::<String>())
            }
            Kind::TokenPred(_) => write!(f, "token_pred"),
            Kind::TokenLit(value) => write!(f, "token({value})"),
            Kind::Not(child) => write!(f, "not({child})"),
            Kind::Ahead(child) => write!(f, "ahead({child})"),
            Kind::Seq(children) => {
                write!(f, "seq(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Kind::Choice(children) => {
                write!(f, "choice(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Kind::Opt(child) => write!(f, "opt({child})"),
            Kind::Repeat { child, min, max } => match max {
                Some(max) => write!(f, "repeat({child}, {min}, {max})"),
                None => write!(f, "repeat({child}, {min})"),
            },
            Kind::Sep {
                child,
                sep,
                min,
                trailing,
            } => {
                write!(f, "sep({child}, {sep}, {min}")?;
                if *trailing {
                    write!(f, ", trailing")?;
                }
                write!(f, ")")
            }
            Kind::Word { child, .. } => write!(f, "word({child})"),
            Kind::TokenSpec { child, .. } => write!(f, "token({child})"),
            Kind::TokenChoice { targets, .. } => {
                write!(f, "token_choice({} targets)", targets.len())
            }
            Kind::Action { child, op, .. } => write!(f, "{}({child})", op.tag()),
            Kind::LeftExpr(spec) => {
                write!(f, "left_expr({}, {} steps)", spec.left, spec.steps.len())
            }
            Kind::RightExpr(spec) => {
                write!(f, "right_expr({}, {} steps)", spec.left, spec.steps.len())
            }
            Kind::Lazy(_) => write!(f, "lazy"),
        }
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parser({self})")
    }
}
