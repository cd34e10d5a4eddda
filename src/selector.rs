use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorAttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<SelectorAttrCondition>,
}

impl SelectorStep {
    pub(crate) fn id_only(&self) -> Option<&str> {
        if !self.universal && self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty()
        {
            self.id.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectorCombinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) step: SelectorStep,
    // Relation to previous (left) selector part.
    combinator: Option<SelectorCombinator>,
}

pub(crate) fn matches_chain(dom: &Dom, node_id: NodeId, steps: &[SelectorPart]) -> bool {
    let Some(last) = steps.last() else {
        return false;
    };
    if !matches_step(dom, node_id, &last.step) {
        return false;
    }

    let mut current = node_id;
    for idx in (1..steps.len()).rev() {
        let prev_step = &steps[idx - 1].step;
        let combinator = steps[idx]
            .combinator
            .unwrap_or(SelectorCombinator::Descendant);

        let matched = match combinator {
            SelectorCombinator::Child => dom
                .parent(current)
                .filter(|parent| matches_step(dom, *parent, prev_step)),
            SelectorCombinator::Descendant => {
                let mut cursor = dom.parent(current);
                let mut found = None;
                while let Some(parent) = cursor {
                    if matches_step(dom, parent, prev_step) {
                        found = Some(parent);
                        break;
                    }
                    cursor = dom.parent(parent);
                }
                found
            }
        };

        let Some(matched) = matched else {
            return false;
        };
        current = matched;
    }

    true
}

fn matches_step(dom: &Dom, node_id: NodeId, step: &SelectorStep) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    if let Some(tag) = &step.tag {
        if !element.tag_name.eq_ignore_ascii_case(tag) {
            return false;
        }
    }

    if let Some(id) = &step.id {
        if element.attr("id") != Some(id.as_str()) {
            return false;
        }
    }

    if !step.classes.iter().all(|class| element.has_class(class)) {
        return false;
    }

    step.attrs.iter().all(|cond| match cond {
        SelectorAttrCondition::Exists { key } => element.attr(key).is_some(),
        SelectorAttrCondition::Eq { key, value } => element.attr(key) == Some(value.as_str()),
    })
}

/// Parses a comma-separated selector list in one pass.
pub(crate) fn parse_selector_groups(selector: &str) -> Result<Vec<Vec<SelectorPart>>> {
    let mut cursor = SelectorCursor::new(selector);
    let mut groups = Vec::new();
    loop {
        groups.push(cursor.chain()?);
        match cursor.peek() {
            None => return Ok(groups),
            Some(b',') => cursor.pos += 1,
            Some(_) => return Err(cursor.unsupported()),
        }
    }
}

struct SelectorCursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> SelectorCursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn unsupported(&self) -> Error {
        Error::UnsupportedSelector(self.src.to_string())
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize, end: usize) -> Result<String> {
        self.src
            .get(start..end)
            .map(str::to_string)
            .ok_or_else(|| self.unsupported())
    }

    fn ident(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_selector_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unsupported());
        }
        self.slice(start, self.pos)
    }

    /// One complex selector, stopping at `,` or the end of input.
    fn chain(&mut self) -> Result<Vec<SelectorPart>> {
        let mut parts: Vec<SelectorPart> = Vec::new();
        let mut pending: Option<SelectorCombinator> = None;
        loop {
            self.skip_ws();
            match self.peek() {
                None | Some(b',') => break,
                Some(b'>') => {
                    if parts.is_empty() || pending.is_some() {
                        return Err(self.unsupported());
                    }
                    pending = Some(SelectorCombinator::Child);
                    self.pos += 1;
                }
                Some(_) => {
                    let step = self.compound()?;
                    let combinator = if parts.is_empty() {
                        None
                    } else {
                        Some(pending.take().unwrap_or(SelectorCombinator::Descendant))
                    };
                    parts.push(SelectorPart { step, combinator });
                }
            }
        }
        if parts.is_empty() || pending.is_some() {
            return Err(self.unsupported());
        }
        Ok(parts)
    }

    /// A compound selector such as `select.col-map[data-target]`.
    fn compound(&mut self) -> Result<SelectorStep> {
        let mut step = SelectorStep::default();
        while let Some(b) = self.peek() {
            match b {
                b',' | b'>' => break,
                b if b.is_ascii_whitespace() => break,
                b'*' => {
                    if step.universal || step.tag.is_some() {
                        return Err(self.unsupported());
                    }
                    step.universal = true;
                    self.pos += 1;
                }
                b'#' => {
                    self.pos += 1;
                    let id = self.ident()?;
                    if step.id.replace(id).is_some() {
                        return Err(self.unsupported());
                    }
                }
                b'.' => {
                    self.pos += 1;
                    let class_name = self.ident()?;
                    step.classes.push(class_name);
                }
                b'[' => {
                    let condition = self.attr_condition()?;
                    step.attrs.push(condition);
                }
                b if is_selector_ident_char(b) => {
                    // A type selector must lead the compound.
                    if step != SelectorStep::default() {
                        return Err(self.unsupported());
                    }
                    step.tag = Some(self.ident()?);
                }
                _ => return Err(self.unsupported()),
            }
        }
        Ok(step)
    }

    fn attr_condition(&mut self) -> Result<SelectorAttrCondition> {
        self.pos += 1;
        self.skip_ws();
        let key = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let condition = match self.peek() {
            Some(b']') => SelectorAttrCondition::Exists { key },
            Some(b'=') => {
                self.pos += 1;
                self.skip_ws();
                let value = self.attr_value()?;
                self.skip_ws();
                SelectorAttrCondition::Eq { key, value }
            }
            _ => return Err(self.unsupported()),
        };
        if self.peek() != Some(b']') {
            return Err(self.unsupported());
        }
        self.pos += 1;
        Ok(condition)
    }

    fn attr_value(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let start = self.pos + 1;
                let len = self.src.as_bytes()[start..]
                    .iter()
                    .position(|b| *b == quote)
                    .ok_or_else(|| self.unsupported())?;
                self.pos = start + len + 1;
                self.slice(start, start + len)
            }
            _ => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|b| b != b']' && !b.is_ascii_whitespace())
                {
                    self.pos += 1;
                }
                self.slice(start, self.pos)
            }
        }
    }
}

fn is_selector_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}
