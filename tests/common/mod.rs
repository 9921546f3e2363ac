//! Shared fixtures for the integration tests: the JSON grammar from the
//! crate documentation, plus conversions against serde_json for round-trip
//! checks.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use bramble::grammar::{any, choice, digit, hex_digit, lazy, lit, range, seq, set, Grammar, Rule};
use bramble::im::HashMap;
use bramble::Value;

/// The assembled JSON grammar.
///
///     Value  ::= String | Number | Object | Array | "true" | "false" | "null"
///     Object ::= '{' (Pair (',' Pair)*)? '}'
///     Array  ::= '[' (Value (',' Value)*)? ']'
///
/// Whitespace is allowed after brackets, commas, colons and values.
pub struct Json {
    pub root: Rule,
    pub value: Rule,
}

pub fn json() -> Json {
    let g = Grammar::with_usual_whitespace();

    let integer = choice([lit("0"), digit().at_least(1)]).named("integer");
    let fractional = seq([lit("."), digit().at_least(1)]).named("fractional");
    let exponent = seq([set("eE"), set("+-").opt(), integer.clone()]).named("exponent");
    let number = g
        .word(
            &seq([lit("-").opt(), integer, fractional.opt(), exponent.opt()]).push(|scope| {
                let text = scope.matched().unwrap_or_default();
                text.parse::<f64>()
                    .map(Value::Number)
                    .map_err(|e| e.to_string())
            }),
        )
        .named("number");

    let string_char = choice([
        seq([set("\"\\").not(), range('\u{0000}', '\u{001f}').not(), any()]),
        seq([lit("\\"), set("\"\\/bfnrt")]),
        seq([lit("\\u"), hex_digit(), hex_digit(), hex_digit(), hex_digit()]),
    ])
    .named("string_char");
    let string_content = string_char.at_least(0).push(|scope| {
        Ok(Value::String(unescape(scope.matched().unwrap_or_default())))
    });
    let string = g
        .word(&seq([lit("\""), string_content, lit("\"")]))
        .named("string");

    // value refers to object and array, which refer back to value
    let value_cell: Arc<OnceLock<Rule>> = Arc::new(OnceLock::new());
    let value_ref = {
        let cell = value_cell.clone();
        lazy(move || {
            cell.get()
                .cloned()
                .expect("value rule is defined before any parse")
        })
    };

    let pair = seq([string.clone(), g.word_str(":"), value_ref.clone()])
        .as_list()
        .named("pair");

    let object = seq([
        g.word_str("{"),
        pair.sep(0, &g.word_str(",")),
        g.word_str("}"),
    ])
    .push(|scope| {
        let mut map = HashMap::new();
        for pair in scope.take_frame() {
            let Some(kv) = pair.into_list() else {
                return Err("object pair frame is not a list".to_string());
            };
            let mut kv = kv.into_iter();
            let (Some(Value::String(key)), Some(val)) = (kv.next(), kv.next()) else {
                return Err("object pair must be a string key and a value".to_string());
            };
            map.insert(key, val);
        }
        Ok(Value::Map(map))
    })
    .named("object");

    let array = seq([
        g.word_str("["),
        value_ref.sep(0, &g.word_str(",")),
        g.word_str("]"),
    ])
    .as_list()
    .named("array");

    let value = choice([
        string,
        number,
        object,
        array,
        g.word_str("true").as_val(true),
        g.word_str("false").as_val(false),
        g.word_str("null").as_val(Value::Nil),
    ])
    .named("value");
    let _ = value_cell.set(value.clone());

    let ws = g.whitespace().expect("usual whitespace is configured");
    let root = seq([ws, value.clone()]).named("json");
    Json { root, value }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let code: String = chars.by_ref().take(4).collect();
                let c = u32::from_str_radix(&code, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or('\u{fffd}');
                out.push(c);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// serde_json's view of an input, folded into engine values (all numbers as
/// f64, like the grammar produces).
pub fn from_json(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect(),
        ),
    }
}
