//! Structural combinators: separated repetition, word/token wrapping, and
//! the first-character dispatch behind `token_choice`.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::state::Parse;

use super::{Kind, ParserRef};

/// `child (sep child)*`, greedy, succeeding iff at least `min` children
/// matched. With `trailing` a single terminal separator may be consumed;
/// otherwise a separator not followed by a child is rolled back and the
/// match ends after the last child.
pub(super) fn separated(
    parse: &mut Parse,
    child: &ParserRef,
    sep: &ParserRef,
    min: usize,
    trailing: bool,
) -> bool {
    let mut count = 0;
    if child.parse(parse) {
        count = 1;
        loop {
            let pos1 = parse.pos;
            let stack1 = parse.stack_len();
            let log1 = parse.log.len();
            if !sep.parse(parse) {
                break;
            }
            if child.parse(parse) {
                count += 1;
                // a zero-width iteration cannot make progress
                if parse.pos == pos1 {
                    break;
                }
            } else {
                if parse.thrown().is_some() {
                    return false;
                }
                if !trailing {
                    parse.pos = pos1;
                    parse.truncate_stack(stack1);
                    parse.log.truncate(log1);
                }
                break;
            }
        }
    }
    if parse.thrown().is_some() {
        return false;
    }
    count >= min
}

/// Child followed by the configured whitespace parser; the whitespace span
/// is recorded when tracking is on.
pub(super) fn word(parse: &mut Parse, child: &ParserRef, ws: Option<&ParserRef>) -> bool {
    if !child.parse(parse) {
        return false;
    }
    if let Some(ws) = ws {
        let ws_start = parse.pos;
        if !ws.parse(parse) {
            return false;
        }
        if parse.thrown().is_some() {
            return false;
        }
        parse.record_whitespace(ws_start, parse.pos);
    }
    true
}

/// Dispatches on the first input character to the alternatives that can
/// start with it, in registration order — semantically an ordered choice
/// over the targets. Targets whose first set cannot be computed statically
/// are tried unconditionally, still in order.
pub(super) fn token_choice(
    parse: &mut Parse,
    targets: &[ParserRef],
    table: &OnceLock<DispatchTable>,
) -> bool {
    if parse.input().is_text() {
        let table = table.get_or_init(|| DispatchTable::build(targets));
        let next = parse.input().char_at(parse.pos);
        for i in table.candidates(next) {
            if targets[i].parse(parse) {
                return true;
            }
            if parse.thrown().is_some() {
                return false;
            }
        }
        false
    } else {
        // token input has no character to key on; plain ordered trial
        for target in targets {
            if target.parse(parse) {
                return true;
            }
            if parse.thrown().is_some() {
                return false;
            }
        }
        false
    }
}

/// Target indices grouped by the characters their matches can start with.
/// Built once per node, on first use.
pub(crate) struct DispatchTable {
    by_char: HashMap<char, Vec<usize>>,
    unkeyed: Vec<usize>,
}

impl DispatchTable {
    pub(crate) fn build(targets: &[ParserRef]) -> Self {
        let mut by_char: HashMap<char, Vec<usize>> = HashMap::new();
        let mut unkeyed = Vec::new();
        for (i, target) in targets.iter().enumerate() {
            match first_chars(target, &mut HashSet::new()) {
                Some(chars) => {
                    for c in chars {
                        by_char.entry(c).or_default().push(i);
                    }
                }
                None => unkeyed.push(i),
            }
        }
        Self { by_char, unkeyed }
    }

    /// Candidate target indices for the given first character, in
    /// registration order. With no character left, only unkeyed targets can
    /// match.
    fn candidates(&self, next: Option<char>) -> Vec<usize> {
        let keyed = next
            .and_then(|c| self.by_char.get(&c))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        // merge two ascending index lists
        let mut out = Vec::with_capacity(keyed.len() + self.unkeyed.len());
        let (mut a, mut b) = (0, 0);
        while a < keyed.len() && b < self.unkeyed.len() {
            if keyed[a] < self.unkeyed[b] {
                out.push(keyed[a]);
                a += 1;
            } else {
                out.push(self.unkeyed[b]);
                b += 1;
            }
        }
        out.extend_from_slice(&keyed[a..]);
        out.extend_from_slice(&self.unkeyed[b..]);
        out
    }
}

/// The set of characters a match of this parser can start with, or None when
/// it cannot be determined statically (nullable or predicate-based parsers,
/// cycles). Conservative: None never excludes a target from being tried.
fn first_chars(parser: &ParserRef, visiting: &mut HashSet<usize>) -> Option<Vec<char>> {
    if !visiting.insert(parser.key()) {
        return None;
    }
    let result = match parser.kind() {
        Kind::Literal(text) => text.chars().next().map(|c| vec![c]),
        Kind::CharRange(lo, hi) => {
            let span = (*hi as u32).saturating_sub(*lo as u32);
            if span <= 256 {
                Some(((*lo as u32)..=(*hi as u32)).filter_map(char::from_u32).collect())
            } else {
                None
            }
        }
        Kind::CharSet(chars) => Some(chars.clone()),
        Kind::Any
        | Kind::CharPred(_)
        | Kind::TokenPred(_)
        | Kind::TokenLit(_)
        | Kind::Not(_)
        | Kind::Ahead(_)
        | Kind::Opt(_) => None,
        Kind::Seq(children) => children
            .first()
            .and_then(|first| first_chars(first, visiting)),
        Kind::Choice(children) | Kind::TokenChoice {
            targets: children, ..
        } => {
            let mut out = Some(Vec::new());
            for child in children {
                out = match (out, first_chars(child, visiting)) {
                    (Some(mut all), Some(chars)) => {
                        all.extend(chars);
                        Some(all)
                    }
                    _ => None,
                };
                if out.is_none() {
                    break;
                }
            }
            out
        }
        Kind::Repeat { child, min, .. } | Kind::Sep { child, min, .. } => {
            if *min == 0 {
                None
            } else {
                first_chars(child, visiting)
            }
        }
        Kind::Word { child, .. } | Kind::TokenSpec { child, .. } | Kind::Action { child, .. } => {
            first_chars(child, visiting)
        }
        Kind::LeftExpr(spec) | Kind::RightExpr(spec) => first_chars(&spec.left, visiting),
        Kind::Lazy(link) => link
            .resolve()
            .and_then(|target| first_chars(&target, visiting)),
    };
    visiting.remove(&parser.key());
    result
}
