//! Counter key templates.
//!
//! A template is literal text with `{name}` placeholders, e.g.
//! `experiment_items:{workspace_id}:{experiment_id}`. Templates are parsed once
//! at startup; the gateway then binds each placeholder to a context field or a
//! route parameter and never looks at the raw string again.

use std::borrow::Cow;
use std::fmt::Write;

use crate::error::{GateError, Result};

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Parsed key template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl KeyTemplate {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(GateError::Config("key template must not be empty".into()));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.char_indices();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        if !(c.is_ascii_alphanumeric() || c == '_') {
                            return Err(GateError::Config(format!(
                                "invalid character '{c}' in placeholder at offset {pos} of key template: {raw}"
                            )));
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(GateError::Config(format!(
                            "unclosed placeholder at offset {pos} of key template: {raw}"
                        )));
                    }
                    if name.is_empty() {
                        return Err(GateError::Config(format!(
                            "empty placeholder at offset {pos} of key template: {raw}"
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    return Err(GateError::Config(format!(
                        "unbalanced '}}' at offset {pos} of key template: {raw}"
                    )));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { raw: raw.to_string(), segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of appearance (duplicates included).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}

/// Percent-encode a value substituted into a placeholder.
///
/// ASCII alphanumerics, `-`, `_` and `.` pass through; every other byte
/// (separators and `%` included) becomes `%XX`, so two different values can
/// never render to the same key.
pub fn escape_value(value: &str) -> Cow<'_, str> {
    if value.bytes().all(is_unreserved) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for b in value.bytes() {
        if is_unreserved(b) {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    Cow::Owned(out)
}
