//! Match logic for the primitive combinators. Each function is a `doparse`
//! body: the wrapper in [`super::Parser::parse`] owns the rollback, so on
//! failure these may leave partial consumption behind — except the lookahead
//! pair, which must restore eagerly because it succeeds without consuming.

use crate::state::Parse;
use crate::value::Value;

use super::{CharPredFn, LazyLink, ParserRef, TokenPredFn};

/// A character parser was run against token input, or the other way around.
/// That is a grammar-construction bug, so it aborts the parse instead of
/// failing quietly inside an ordered choice.
fn input_mode_fatal(parse: &mut Parse, wanted: &str) -> bool {
    parse.fatal(format!("{wanted} parser run against the wrong input kind"));
    false
}

pub(super) fn literal(parse: &mut Parse, text: &str) -> bool {
    if !parse.input().is_text() {
        return input_mode_fatal(parse, "character");
    }
    if parse.input().starts_with(parse.pos, text) {
        parse.pos += text.len();
        true
    } else {
        false
    }
}

pub(super) fn any(parse: &mut Parse) -> bool {
    if parse.input().is_text() {
        match parse.input().char_at(parse.pos) {
            Some(c) => {
                parse.pos += c.len_utf8();
                true
            }
            None => false,
        }
    } else {
        match parse.input().token_at(parse.pos) {
            Some(_) => {
                parse.pos += 1;
                true
            }
            None => false,
        }
    }
}

fn match_char(parse: &mut Parse, pred: impl FnOnce(char) -> bool) -> bool {
    match parse.input().char_at(parse.pos) {
        Some(c) if pred(c) => {
            parse.pos += c.len_utf8();
            true
        }
        _ => false,
    }
}

pub(super) fn char_pred(parse: &mut Parse, pred: &CharPredFn) -> bool {
    if !parse.input().is_text() {
        return input_mode_fatal(parse, "character");
    }
    match_char(parse, |c| pred(c))
}

pub(super) fn char_range(parse: &mut Parse, lo: char, hi: char) -> bool {
    if !parse.input().is_text() {
        return input_mode_fatal(parse, "character");
    }
    match_char(parse, |c| lo <= c && c <= hi)
}

pub(super) fn char_set(parse: &mut Parse, chars: &[char]) -> bool {
    if !parse.input().is_text() {
        return input_mode_fatal(parse, "character");
    }
    match_char(parse, |c| chars.contains(&c))
}

pub(super) fn token_pred(parse: &mut Parse, pred: &TokenPredFn) -> bool {
    if parse.input().is_text() {
        return input_mode_fatal(parse, "token");
    }
    match parse.input().token_at(parse.pos) {
        Some(token) if pred(token) => {
            parse.pos += 1;
            true
        }
        _ => false,
    }
}

pub(super) fn token_lit(parse: &mut Parse, value: &Value) -> bool {
    if parse.input().is_text() {
        return input_mode_fatal(parse, "token");
    }
    match parse.input().token_at(parse.pos) {
        Some(token) if token.value == *value => {
            parse.pos += 1;
            true
        }
        _ => false,
    }
}

/// Negative lookahead: succeeds iff the child fails, never touching
/// position, stack or log on either outcome.
pub(super) fn not(parse: &mut Parse, child: &ParserRef) -> bool {
    let pos0 = parse.pos;
    let stack0 = parse.stack_len();
    let log0 = parse.log.len();
    let matched = child.parse(parse);
    if parse.thrown().is_some() {
        return false;
    }
    if matched {
        parse.pos = pos0;
        parse.truncate_stack(stack0);
        parse.log.truncate(log0);
    }
    !matched
}

/// Positive lookahead: succeeds iff the child succeeds, but restores
/// position, stack and log even then.
pub(super) fn ahead(parse: &mut Parse, child: &ParserRef) -> bool {
    let pos0 = parse.pos;
    let stack0 = parse.stack_len();
    let log0 = parse.log.len();
    let matched = child.parse(parse);
    if parse.thrown().is_some() {
        return false;
    }
    if matched {
        parse.pos = pos0;
        parse.truncate_stack(stack0);
        parse.log.truncate(log0);
    }
    matched
}

pub(super) fn seq(parse: &mut Parse, children: &[ParserRef]) -> bool {
    children.iter().all(|child| child.parse(parse))
}

/// Ordered choice: children are tried in order and the first success wins,
/// regardless of how much later children would have matched.
pub(super) fn choice(parse: &mut Parse, children: &[ParserRef]) -> bool {
    for child in children {
        if child.parse(parse) {
            return true;
        }
        if parse.thrown().is_some() {
            return false;
        }
    }
    false
}

pub(super) fn opt(parse: &mut Parse, child: &ParserRef) -> bool {
    let _ = child.parse(parse);
    parse.thrown().is_none()
}

/// Greedy repetition. Each successful iteration commits; the failing
/// iteration is rolled back by its own wrapper. A successful iteration that
/// consumes nothing ends the loop, so a nullable operand cannot hang the
/// parse even with the well-formedness check disabled.
pub(super) fn repeat(parse: &mut Parse, child: &ParserRef, min: usize, max: Option<usize>) -> bool {
    let mut count = 0;
    while max.map_or(true, |m| count < m) {
        let before = parse.pos;
        if !child.parse(parse) {
            break;
        }
        count += 1;
        if parse.pos == before {
            break;
        }
    }
    if parse.thrown().is_some() {
        return false;
    }
    count >= min
}

pub(super) fn lazy(parse: &mut Parse, link: &LazyLink) -> bool {
    match link.resolve() {
        Some(target) => target.parse(parse),
        None => {
            parse.fatal("recursive parser used before being defined");
            false
        }
    }
}
