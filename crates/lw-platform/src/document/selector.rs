//! A small CSS selector subset: comma-separated lists of compound selectors
//! made of an optional tag name and attribute conditions, e.g.
//! `button[data-tour="play"], [data-tour="pause"]`.
//!
//! Combinators, classes, ids and pseudo-classes are not supported; parsing
//! such a selector fails.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList(Vec<CompoundSelector>);

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompoundSelector {
    tag: Option<String>,
    attributes: Vec<AttributeMatcher>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeMatcher {
    name: String,
    value: Option<String>,
}

impl SelectorList {
    pub(crate) fn parse(input: &str) -> Option<Self> {
        let compounds = split_top_level(input)
            .into_iter()
            .map(CompoundSelector::parse)
            .collect::<Option<Vec<_>>>()?;
        if compounds.is_empty() {
            return None;
        }
        Some(Self(compounds))
    }

    pub(crate) fn matches(&self, tag: &str, attributes: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .any(|compound| compound.matches(tag, attributes))
    }
}

impl CompoundSelector {
    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let tag_end = input.find('[').unwrap_or(input.len());
        let tag = match &input[..tag_end] {
            "" | "*" => None,
            name if is_identifier(name) => Some(name.to_ascii_lowercase()),
            _ => return None,
        };

        let mut attributes = Vec::new();
        let mut rest = &input[tag_end..];
        while !rest.is_empty() {
            let body = rest.strip_prefix('[')?;
            let close = closing_bracket(body)?;
            attributes.push(AttributeMatcher::parse(&body[..close])?);
            rest = &body[close + 1..];
        }

        Some(Self { tag, attributes })
    }

    fn matches(&self, tag: &str, attributes: &BTreeMap<String, String>) -> bool {
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.attributes.iter().all(|matcher| {
            match (attributes.get(&matcher.name), &matcher.value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            }
        })
    }
}

impl AttributeMatcher {
    fn parse(body: &str) -> Option<Self> {
        let body = body.trim();
        let (name, value) = match body.split_once('=') {
            None => (body, None),
            Some((name, raw)) => (name.trim(), Some(unquote(raw.trim())?)),
        };
        if !is_identifier(name) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value,
        })
    }
}

fn unquote(raw: &str) -> Option<String> {
    for quote in ['"', '\''] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(inner.to_string());
        }
    }
    if raw.is_empty() || raw.contains(['"', '\'']) {
        return None;
    }
    Some(raw.to_string())
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Byte offset of the `]` closing the attribute body, skipping quoted text.
fn closing_bracket(body: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split on commas that are outside brackets and quotes.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}
