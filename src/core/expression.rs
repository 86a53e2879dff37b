//! Exclusion expression evaluation.
//!
//! The filter only needs the textual result of one expression against one
//! JSON document, so the evaluator is a trait and can be swapped for a full
//! jq engine. [`PathExpressionEvaluator`] covers the subset selectors use in
//! practice:
//!
//! - `.` - the whole document
//! - `.field`, `."dotted.or/slashed"` - object field access
//! - `[n]` - array index (0-based): `.spec.containers[0].image`
//! - `"text"`, `42`, `true`, `false`, `null` - literals
//! - `lhs == rhs`, `lhs != rhs` - one comparison
//!
//! Strings are rendered raw, everything else as compact JSON. A path that
//! runs off the document yields `null`.

use std::iter::Peekable;
use std::str::Chars;

use serde_json::Value;

use crate::FilterError;
use crate::Result;

pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(
        &self,
        expression: &str,
        document: &Value,
    ) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PathExpressionEvaluator;

impl ExpressionEvaluator for PathExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        document: &Value,
    ) -> Result<String> {
        let failed = |reason: String| FilterError::Expression {
            expression: expression.to_string(),
            reason,
        };

        let parsed = parse_expression(expression).map_err(failed)?;
        let result = parsed.evaluate(document).map_err(failed)?;
        Ok(render(&result))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Path(Vec<Segment>),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparison {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
struct Expression {
    lhs: Operand,
    rhs: Option<(Comparison, Operand)>,
}

impl Expression {
    fn evaluate(
        &self,
        document: &Value,
    ) -> std::result::Result<Value, String> {
        let lhs = self.lhs.resolve(document)?;
        match &self.rhs {
            None => Ok(lhs),
            Some((op, rhs)) => {
                let rhs = rhs.resolve(document)?;
                let equal = values_equal(&lhs, &rhs);
                Ok(Value::Bool(match op {
                    Comparison::Eq => equal,
                    Comparison::Ne => !equal,
                }))
            }
        }
    }
}

impl Operand {
    fn resolve(
        &self,
        document: &Value,
    ) -> std::result::Result<Value, String> {
        match self {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Path(segments) => {
                let mut current = document;
                for segment in segments {
                    current = match (segment, current) {
                        (_, Value::Null) => return Ok(Value::Null),
                        (Segment::Field(name), Value::Object(map)) => match map.get(name) {
                            Some(v) => v,
                            None => return Ok(Value::Null),
                        },
                        (Segment::Index(i), Value::Array(items)) => match items.get(*i) {
                            Some(v) => v,
                            None => return Ok(Value::Null),
                        },
                        (Segment::Field(name), other) => {
                            return Err(format!("cannot index {} with \"{name}\"", type_name(other)))
                        }
                        (Segment::Index(i), other) => {
                            return Err(format!("cannot index {} with {i}", type_name(other)))
                        }
                    };
                }
                Ok(current.clone())
            }
        }
    }
}

fn values_equal(
    lhs: &Value,
    rhs: &Value,
) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_expression(input: &str) -> std::result::Result<Expression, String> {
    let mut chars = input.chars().peekable();

    let lhs = parse_operand(&mut chars)?;
    skip_whitespace(&mut chars);

    let rhs = match chars.next() {
        None => None,
        Some(first @ ('=' | '!')) => {
            if chars.next() != Some('=') {
                return Err(format!("expected `{first}=`"));
            }
            let op = if first == '=' {
                Comparison::Eq
            } else {
                Comparison::Ne
            };
            let rhs = parse_operand(&mut chars)?;
            skip_whitespace(&mut chars);
            if let Some(c) = chars.next() {
                return Err(format!("unexpected `{c}` after comparison"));
            }
            Some((op, rhs))
        }
        Some(c) => return Err(format!("unexpected `{c}`")),
    };

    Ok(Expression { lhs, rhs })
}

fn skip_whitespace(chars: &mut Peekable<Chars>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn parse_operand(chars: &mut Peekable<Chars>) -> std::result::Result<Operand, String> {
    skip_whitespace(chars);
    match chars.peek().copied() {
        Some('.') => parse_path(chars).map(Operand::Path),
        Some('"') => parse_string(chars).map(|s| Operand::Literal(Value::String(s))),
        Some(c) if c == '-' || c.is_ascii_digit() => parse_number(chars).map(Operand::Literal),
        Some(c) if c.is_ascii_alphabetic() => match consume_identifier(chars).as_str() {
            "true" => Ok(Operand::Literal(Value::Bool(true))),
            "false" => Ok(Operand::Literal(Value::Bool(false))),
            "null" => Ok(Operand::Literal(Value::Null)),
            other => Err(format!("unknown identifier `{other}`")),
        },
        Some(c) => Err(format!("unexpected `{c}`")),
        None => Err("empty operand".to_string()),
    }
}

fn parse_path(chars: &mut Peekable<Chars>) -> std::result::Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    // leading '.'
    chars.next();

    // `.` alone, or `.[0]`
    match chars.peek().copied() {
        Some('[') => {}
        Some('"') => segments.push(Segment::Field(parse_string(chars)?)),
        Some(c) if is_identifier_start(c) => segments.push(Segment::Field(consume_identifier(chars))),
        _ => return Ok(segments),
    }

    loop {
        match chars.peek().copied() {
            Some('.') => {
                chars.next();
                match chars.peek().copied() {
                    Some('"') => segments.push(Segment::Field(parse_string(chars)?)),
                    Some(c) if is_identifier_start(c) => {
                        segments.push(Segment::Field(consume_identifier(chars)))
                    }
                    Some('[') => {}
                    _ => return Err("expected a field name after `.`".to_string()),
                }
            }
            Some('[') => {
                chars.next();
                let digits: String = std::iter::from_fn(|| chars.next_if(char::is_ascii_digit)).collect();
                if chars.next() != Some(']') || digits.is_empty() {
                    return Err("expected `[<index>]`".to_string());
                }
                let index = digits.parse().map_err(|e| format!("bad index: {e}"))?;
                segments.push(Segment::Index(index));
            }
            _ => return Ok(segments),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn consume_identifier(chars: &mut Peekable<Chars>) -> String {
    std::iter::from_fn(|| chars.next_if(|c| c.is_ascii_alphanumeric() || *c == '_')).collect()
}

fn parse_string(chars: &mut Peekable<Chars>) -> std::result::Result<String, String> {
    // Re-quote the raw literal and let serde_json handle escapes.
    let mut raw = String::from('"');
    chars.next();
    loop {
        match chars.next() {
            Some('\\') => {
                raw.push('\\');
                match chars.next() {
                    Some(c) => raw.push(c),
                    None => return Err("unterminated string".to_string()),
                }
            }
            Some('"') => {
                raw.push('"');
                break;
            }
            Some(c) => raw.push(c),
            None => return Err("unterminated string".to_string()),
        }
    }
    serde_json::from_str(&raw).map_err(|e| format!("bad string literal: {e}"))
}

fn parse_number(chars: &mut Peekable<Chars>) -> std::result::Result<Value, String> {
    let raw: String = std::iter::from_fn(|| {
        chars.next_if(|c| c.is_ascii_digit() || matches!(*c, '-' | '+' | '.' | 'e' | 'E'))
    })
    .collect();
    serde_json::from_str::<serde_json::Number>(&raw)
        .map(Value::Number)
        .map_err(|_| format!("bad number `{raw}`"))
}
