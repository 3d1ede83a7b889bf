use std::str::FromStr;

use thiserror::Error;

use super::dom::{Document, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unterminated attribute selector in {0:?}")]
    UnterminatedAttribute(String),
    #[error("unsupported attribute operator {op:?} in {selector:?}")]
    UnsupportedOperator { op: String, selector: String },
    #[error("unexpected {ch:?} at offset {offset} in {selector:?}")]
    Unexpected {
        ch: char,
        offset: usize,
        selector: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Contains,
    Includes,
}

#[derive(Debug, Clone)]
struct AttrMatch {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrMatch {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
            AttrOp::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
            AttrOp::Contains => !self.value.is_empty() && actual.contains(&self.value),
            AttrOp::Includes => actual.split_whitespace().any(|w| w == self.value),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if self.id.as_deref().is_some_and(|id| doc.attr(node, "id") != Some(id)) {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attrs.iter().all(|a| a.matches(doc.attr(node, &a.name)))
    }
}

/// Compiled CSS selector subset: type, `.class`, `#id`, attribute
/// (`=`, `^=`, `$=`, `*=`, `~=`), descendant and child combinators, and
/// comma-separated groups.
#[derive(Debug, Clone)]
pub struct Selector {
    groups: Vec<Vec<(Combinator, Compound)>>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Selector, SelectorError> {
        let groups = split_groups(source)
            .into_iter()
            .map(|g| parse_group(g, source))
            .collect::<Result<Vec<_>, _>>()?;
        if groups.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Selector { groups })
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.groups.iter().any(|chain| matches_chain(doc, node, chain))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

fn matches_chain(doc: &Document, node: NodeId, chain: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, last), rest)) = chain.split_last() else {
        return false;
    };
    if !last.matches(doc, node) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match combinator {
        Combinator::Child => doc
            .parent(node)
            .is_some_and(|p| matches_chain(doc, p, rest)),
        Combinator::Descendant => doc.ancestors(node).any(|a| matches_chain(doc, a, rest)),
    }
}

/// Split on top-level commas, ignoring those inside brackets or quotes.
fn split_groups(source: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(&source[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&source[start..]);
    groups
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_group(group: &str, source: &str) -> Result<Vec<(Combinator, Compound)>, SelectorError> {
    let chars: Vec<char> = group.chars().collect();
    let mut chain = Vec::new();
    let mut pending = Combinator::Descendant;
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        if chars[i] == '>' {
            if chain.is_empty() {
                return Err(unexpected('>', i, source));
            }
            pending = Combinator::Child;
            i += 1;
            continue;
        }
        let (compound, next) = parse_compound(&chars, i, source)?;
        chain.push((pending, compound));
        pending = Combinator::Descendant;
        i = next;
    }

    if chain.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(chain)
}

fn unexpected(ch: char, offset: usize, source: &str) -> SelectorError {
    SelectorError::Unexpected {
        ch,
        offset,
        selector: source.to_string(),
    }
}

fn read_ident(chars: &[char], mut i: usize) -> (String, usize) {
    let start = i;
    while i < chars.len() && is_ident_char(chars[i]) {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

fn parse_compound(
    chars: &[char],
    mut i: usize,
    source: &str,
) -> Result<(Compound, usize), SelectorError> {
    let mut compound = Compound::default();
    let start = i;

    while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '>' {
        match chars[i] {
            '*' if i == start => i += 1,
            '.' | '#' => {
                let (ident, next) = read_ident(chars, i + 1);
                if ident.is_empty() {
                    return Err(unexpected(chars[i], i, source));
                }
                if chars[i] == '.' {
                    compound.classes.push(ident);
                } else {
                    compound.id = Some(ident);
                }
                i = next;
            }
            '[' => {
                let (attr, next) = parse_attr(chars, i + 1, source)?;
                compound.attrs.push(attr);
                i = next;
            }
            c if is_ident_char(c) && i == start => {
                let (ident, next) = read_ident(chars, i);
                compound.tag = Some(ident.to_ascii_lowercase());
                i = next;
            }
            c => return Err(unexpected(c, i, source)),
        }
    }

    Ok((compound, i))
}

fn skip_ws(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn parse_attr(chars: &[char], i: usize, source: &str) -> Result<(AttrMatch, usize), SelectorError> {
    let unterminated = || SelectorError::UnterminatedAttribute(source.to_string());

    let i = skip_ws(chars, i);
    let (name, i) = read_ident(chars, i);
    if name.is_empty() {
        return Err(match chars.get(i) {
            Some(&c) => unexpected(c, i, source),
            None => unterminated(),
        });
    }
    let mut i = skip_ws(chars, i);

    let op = match chars.get(i) {
        None => return Err(unterminated()),
        Some(']') => {
            return Ok((
                AttrMatch {
                    name: name.to_ascii_lowercase(),
                    op: AttrOp::Exists,
                    value: String::new(),
                },
                i + 1,
            ))
        }
        Some('=') => {
            i += 1;
            AttrOp::Equals
        }
        Some(&c) => {
            if chars.get(i + 1) != Some(&'=') {
                return Err(unexpected(c, i, source));
            }
            i += 2;
            match c {
                '^' => AttrOp::Prefix,
                '$' => AttrOp::Suffix,
                '*' => AttrOp::Contains,
                '~' => AttrOp::Includes,
                other => {
                    return Err(SelectorError::UnsupportedOperator {
                        op: format!("{}=", other),
                        selector: source.to_string(),
                    })
                }
            }
        }
    };

    i = skip_ws(chars, i);
    let value = match chars.get(i) {
        Some(&q) if q == '\'' || q == '"' => {
            let close = chars[i + 1..]
                .iter()
                .position(|&c| c == q)
                .map(|p| i + 1 + p)
                .ok_or_else(unterminated)?;
            let v: String = chars[i + 1..close].iter().collect();
            i = close + 1;
            v
        }
        Some(_) => {
            let start = i;
            while i < chars.len() && chars[i] != ']' && !chars[i].is_whitespace() {
                i += 1;
            }
            chars[start..i].iter().collect()
        }
        None => return Err(unterminated()),
    };

    i = skip_ws(chars, i);
    if chars.get(i) != Some(&']') {
        return Err(unterminated());
    }

    Ok((
        AttrMatch {
            name: name.to_ascii_lowercase(),
            op,
            value,
        },
        i + 1,
    ))
}
