//! A small interpreter for dot/bracket path expressions over decoded JSON
//! documents: `friends[1].name`, `friends[*].name`, `errors[0].message`.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// Where resolution starts. Paths whose first segment is `data`, `errors`
/// or `extensions` (or that start with `$`) address the document root,
/// anything else is relative to `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Anchor {
    Root,
    Data,
}

#[derive(Debug, Clone)]
pub(crate) struct JsonPath {
    anchor: Anchor,
    segments: Vec<Segment>,
}

/// The outcome of walking a path: nothing, one node, or a wildcard
/// fan-out over many nodes.
#[derive(Debug, Clone)]
pub(crate) enum Resolved<'a> {
    Missing,
    One(&'a Value),
    Many(Vec<&'a Value>),
}

pub(crate) fn parse(expression: &str) -> Result<JsonPath, String> {
    if expression.is_empty() {
        return Err("the path is empty".to_string());
    }

    let (explicit_root, rest) = match expression.strip_prefix('$') {
        Some(rest) => (true, rest.strip_prefix('.').unwrap_or(rest)),
        None => (false, expression),
    };

    let segments = parse_segments(rest)?;

    let anchor = if explicit_root
        || matches!(
            segments.first(),
            Some(Segment::Key(key)) if key == "data" || key == "errors" || key == "extensions"
        ) {
        Anchor::Root
    } else {
        Anchor::Data
    };

    Ok(JsonPath { anchor, segments })
}

fn parse_segments(rest: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut i = 0;

    while i < rest.len() {
        match rest.as_bytes()[i] {
            b'.' => return Err(format!("empty segment at offset {i}")),
            b'[' => {
                let close = rest[i..]
                    .find(']')
                    .map(|offset| offset + i)
                    .ok_or_else(|| format!("unclosed `[` at offset {i}"))?;
                let inside = &rest[i + 1..close];
                if inside == "*" {
                    segments.push(Segment::Wildcard);
                } else {
                    let index = inside
                        .parse::<usize>()
                        .map_err(|_| format!("`{inside}` is not an array index"))?;
                    segments.push(Segment::Index(index));
                }
                i = consume_dot(rest, close + 1)?;
            }
            _ => {
                let end = rest[i..]
                    .find(['.', '['])
                    .map(|offset| offset + i)
                    .unwrap_or(rest.len());
                let key = &rest[i..end];
                if key == "*" {
                    segments.push(Segment::Wildcard);
                } else {
                    segments.push(Segment::Key(key.to_string()));
                }
                i = consume_dot(rest, end)?;
            }
        }
    }

    Ok(segments)
}

fn consume_dot(rest: &str, mut i: usize) -> Result<usize, String> {
    if i < rest.len() && rest.as_bytes()[i] == b'.' {
        i += 1;
        if i == rest.len() {
            return Err("trailing `.`".to_string());
        }
    }
    Ok(i)
}

pub(crate) fn resolve<'a>(document: &'a Value, path: &JsonPath) -> Resolved<'a> {
    let root = match path.anchor {
        Anchor::Root => document,
        Anchor::Data => match document.get("data") {
            Some(data) => data,
            None => return Resolved::Missing,
        },
    };

    let mut current = vec![root];
    let mut fanned_out = false;

    for segment in &path.segments {
        let mut next = Vec::new();
        match segment {
            Segment::Key(key) => {
                for value in current {
                    if let Some(child) = value.get(key) {
                        next.push(child);
                    }
                }
            }
            Segment::Index(index) => {
                for value in current {
                    if let Some(child) = value.get(index) {
                        next.push(child);
                    }
                }
            }
            Segment::Wildcard => {
                fanned_out = true;
                for value in current {
                    match value {
                        Value::Array(items) => next.extend(items.iter()),
                        Value::Object(map) => next.extend(map.values()),
                        _ => {}
                    }
                }
            }
        }
        if next.is_empty() && !fanned_out {
            return Resolved::Missing;
        }
        current = next;
    }

    if fanned_out {
        Resolved::Many(current)
    } else {
        match current.first() {
            Some(value) => Resolved::One(value),
            None => Resolved::Missing,
        }
    }
}
