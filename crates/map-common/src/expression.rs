//! Feature attribute expressions.
//!
//! Only attribute references are supported: `[name]` evaluates to the
//! feature's attribute, and text mixed with references such as
//! `icons/[kind].svg` evaluates to a string with each reference substituted.

use std::fmt;

use crate::error::{MarkerError, MarkerResult};
use crate::geometry::Feature;
use crate::style::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplatePart {
    Text(String),
    Attribute(String),
}

/// An expression evaluated against a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Attribute(String),
    Template(Vec<TemplatePart>),
}

impl Expression {
    /// Whether `s` contains an attribute reference and should be parsed as
    /// an expression rather than taken literally.
    pub fn looks_like_expression(s: &str) -> bool {
        s.contains('[') || s.contains(']')
    }

    pub fn parse(s: &str) -> MarkerResult<Self> {
        let mut parts = Vec::new();
        let mut rest = s;

        while !rest.is_empty() {
            match rest.find(|c: char| c == '[' || c == ']') {
                None => {
                    parts.push(TemplatePart::Text(rest.to_string()));
                    break;
                }
                Some(idx) if rest.as_bytes()[idx] == b']' => {
                    return Err(MarkerError::expression(s, "unexpected ']'"));
                }
                Some(open) => {
                    if open > 0 {
                        parts.push(TemplatePart::Text(rest[..open].to_string()));
                    }
                    let after = &rest[open + 1..];
                    let close = after
                        .find(']')
                        .ok_or_else(|| MarkerError::expression(s, "unterminated '['"))?;
                    let name = after[..close].trim();
                    if name.is_empty() || name.contains('[') {
                        return Err(MarkerError::expression(s, "invalid attribute name"));
                    }
                    parts.push(TemplatePart::Attribute(name.to_string()));
                    rest = &after[close + 1..];
                }
            }
        }

        match parts.as_slice() {
            [TemplatePart::Attribute(name)] => Ok(Expression::Attribute(name.clone())),
            [] => Err(MarkerError::expression(s, "empty expression")),
            _ if parts.iter().any(|p| matches!(p, TemplatePart::Attribute(_))) => {
                Ok(Expression::Template(parts))
            }
            _ => Err(MarkerError::expression(s, "no attribute reference")),
        }
    }

    /// Evaluate against `feature`. Missing attributes evaluate to `Null`.
    pub fn evaluate(&self, feature: &Feature) -> Value {
        match self {
            Expression::Attribute(name) => feature.get(name).cloned().unwrap_or(Value::Null),
            Expression::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Attribute(name) => {
                            if let Some(value) = feature.get(name) {
                                out.push_str(&value.to_string());
                            }
                        }
                    }
                }
                Value::String(out)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Attribute(name) => write!(f, "[{}]", name),
            Expression::Template(parts) => {
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => write!(f, "{}", text)?,
                        TemplatePart::Attribute(name) => write!(f, "[{}]", name)?,
                    }
                }
                Ok(())
            }
        }
    }
}
