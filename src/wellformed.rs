//! Static well-formedness analysis over a combinator graph.
//!
//! Run once per parse (unless disabled), before any input is consumed. Two
//! defects are diagnosed, both conservatively over-approximated:
//!
//! - **unprotected left recursion**: a cycle through the edges leading to
//!   the first parser each combinator consults — such a grammar recurses
//!   without consuming input. Expression combinators handle their own
//!   recursion explicitly, so their recursive edge is exempt; their leftmost
//!   operand edge is still analyzed.
//! - **repetition over a nullable operand**: a repetition whose operand can
//!   succeed on empty input never makes progress by matching.

use std::collections::{HashMap, HashSet};

use crate::combinator::{Kind, Parser, ParserRef};
use crate::errors::GrammarFault;

/// Analyzes the graph reachable from `root` and returns every fault found.
/// An empty result means the grammar is well-formed.
pub fn check(root: &ParserRef) -> Vec<GrammarFault> {
    let mut nodes = Vec::new();
    Parser::walk(root, &mut |node| nodes.push(node.clone()));

    let nullable = nullable_set(&nodes);
    let mut faults = repetition_faults(&nodes, &nullable);
    faults.extend(left_recursion_faults(root, &nullable));
    faults
}

/// A parser's display identity for diagnostics: its rule label when the
/// builder assigned one, its structure otherwise.
fn name_of(node: &ParserRef) -> String {
    node.to_string()
}

// ----------------------------------------------------------------------
// Nullability
// ----------------------------------------------------------------------

/// Fixed-point computation of the "might succeed on empty input" set, keyed
/// by node identity. Over-approximates: unresolved indirections count as
/// nullable.
fn nullable_set(nodes: &[ParserRef]) -> HashSet<usize> {
    let mut nullable = HashSet::new();
    loop {
        let mut changed = false;
        for node in nodes {
            if nullable.contains(&node.key()) {
                continue;
            }
            if is_nullable(node, &nullable) {
                nullable.insert(node.key());
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

fn is_nullable(node: &ParserRef, nullable: &HashSet<usize>) -> bool {
    let null = |p: &ParserRef| nullable.contains(&p.key());
    match node.kind() {
        Kind::Literal(text) => text.is_empty(),
        Kind::Any
        | Kind::CharPred(_)
        | Kind::CharRange(_, _)
        | Kind::CharSet(_)
        | Kind::TokenPred(_)
        | Kind::TokenLit(_) => false,
        Kind::Not(_) | Kind::Ahead(_) | Kind::Opt(_) => true,
        Kind::Seq(children) => children.iter().all(null),
        Kind::Choice(children)
        | Kind::TokenChoice {
            targets: children, ..
        } => children.iter().any(null),
        Kind::Repeat { min: 0, .. } | Kind::Sep { min: 0, .. } => true,
        Kind::Repeat { child, .. } => null(child),
        Kind::Sep { child, .. } => null(child),
        Kind::Word { child, .. } | Kind::TokenSpec { child, .. } | Kind::Action { child, .. } => {
            null(child)
        }
        Kind::LeftExpr(spec) | Kind::RightExpr(spec) => null(&spec.left),
        Kind::Lazy(link) => match link.resolve() {
            Some(target) => null(&target),
            None => true,
        },
    }
}

// ----------------------------------------------------------------------
// Nullable repetition
// ----------------------------------------------------------------------

fn repetition_faults(nodes: &[ParserRef], nullable: &HashSet<usize>) -> Vec<GrammarFault> {
    let null = |p: &ParserRef| nullable.contains(&p.key());
    let mut faults = Vec::new();
    for node in nodes {
        match node.kind() {
            Kind::Repeat { child, .. } if null(child) => {
                faults.push(GrammarFault::NullableRepetition {
                    rule: name_of(node),
                });
            }
            Kind::Sep { child, sep, .. } if null(child) && null(sep) => {
                faults.push(GrammarFault::NullableSeparator {
                    rule: name_of(node),
                });
            }
            _ => {}
        }
    }
    faults
}

// ----------------------------------------------------------------------
// Left recursion
// ----------------------------------------------------------------------

/// The children a combinator may consult at its own start position: the
/// edges along which left recursion propagates.
fn first_edges(node: &ParserRef, nullable: &HashSet<usize>) -> Vec<ParserRef> {
    let null = |p: &ParserRef| nullable.contains(&p.key());
    match node.kind() {
        Kind::Literal(_)
        | Kind::Any
        | Kind::CharPred(_)
        | Kind::CharRange(_, _)
        | Kind::CharSet(_)
        | Kind::TokenPred(_)
        | Kind::TokenLit(_) => Vec::new(),
        Kind::Not(child) | Kind::Ahead(child) | Kind::Opt(child) => vec![child.clone()],
        Kind::Seq(children) => {
            // the first child, plus later ones while every earlier child is
            // nullable
            let mut out = Vec::new();
            for child in children {
                out.push(child.clone());
                if !null(child) {
                    break;
                }
            }
            out
        }
        Kind::Choice(children)
        | Kind::TokenChoice {
            targets: children, ..
        } => children.clone(),
        Kind::Repeat { child, .. } => vec![child.clone()],
        Kind::Sep { child, sep, .. } => {
            let mut out = vec![child.clone()];
            if null(child) {
                out.push(sep.clone());
            }
            out
        }
        Kind::Word { child, ws } | Kind::TokenSpec { child, ws } => {
            let mut out = vec![child.clone()];
            if null(child) {
                out.extend(ws.iter().cloned());
            }
            out
        }
        Kind::Action { child, .. } => vec![child.clone()],
        // the recursive edge is handled explicitly by the combinator itself
        Kind::LeftExpr(spec) | Kind::RightExpr(spec) => vec![spec.left.clone()],
        Kind::Lazy(link) => link.resolve().into_iter().collect(),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

fn left_recursion_faults(root: &ParserRef, nullable: &HashSet<usize>) -> Vec<GrammarFault> {
    let mut marks: HashMap<usize, Mark> = HashMap::new();
    let mut path: Vec<ParserRef> = Vec::new();
    let mut reported: HashSet<usize> = HashSet::new();
    let mut faults = Vec::new();

    fn dfs(
        node: &ParserRef,
        nullable: &HashSet<usize>,
        marks: &mut HashMap<usize, Mark>,
        path: &mut Vec<ParserRef>,
        reported: &mut HashSet<usize>,
        faults: &mut Vec<GrammarFault>,
    ) {
        match marks.get(&node.key()) {
            Some(Mark::Done) => return,
            Some(Mark::Visiting) => {
                report_cycle(node, path, reported, faults);
                return;
            }
            None => {}
        }
        marks.insert(node.key(), Mark::Visiting);
        path.push(node.clone());
        for child in first_edges(node, nullable) {
            dfs(&child, nullable, marks, path, reported, faults);
        }
        path.pop();
        marks.insert(node.key(), Mark::Done);
    }

    dfs(
        root,
        nullable,
        &mut marks,
        &mut path,
        &mut reported,
        &mut faults,
    );
    faults
}

/// A back-edge to a node currently on the DFS path closes a left-recursive
/// cycle. Named after the first labeled rule in the cycle, or its head's
/// structure when no rule is labeled.
fn report_cycle(
    node: &ParserRef,
    path: &[ParserRef],
    reported: &mut HashSet<usize>,
    faults: &mut Vec<GrammarFault>,
) {
    let start = path
        .iter()
        .position(|p| p.key() == node.key())
        .unwrap_or(0);
    let cycle = &path[start..];

    // one report per distinct cycle
    let cycle_id = cycle.iter().map(|p| p.key()).min().unwrap_or(node.key());
    if !reported.insert(cycle_id) {
        return;
    }

    let rule = cycle
        .iter()
        .find_map(|p| p.rule_name().map(str::to_string))
        .unwrap_or_else(|| name_of(node));
    let mut names: Vec<String> = cycle.iter().map(name_of).collect();
    names.push(name_of(node));
    faults.push(GrammarFault::LeftRecursion {
        rule,
        cycle: names.join(" -> "),
    });
}
