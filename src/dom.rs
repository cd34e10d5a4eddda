use std::collections::HashMap;

use crate::selector::{SelectorPart, parse_selector_groups};
use crate::{Error, Result};

/// Handle to a node in a page's document arena.
///
/// Ids stay valid after the node is detached, so a handle held by a
/// scheduled task can always be looked up safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    // Source order is kept so dumps are stable.
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) value: String,
}

impl Element {
    pub(crate) fn new(tag_name: String, attrs: Vec<(String, String)>) -> Self {
        let value = attrs
            .iter()
            .find(|(name, _)| name == "value")
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        Self {
            tag_name,
            attrs,
            value,
        }
    }

    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
    }

    fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(key, _)| key != name);
        before != self.attrs.len()
    }

    pub(crate) fn has_class(&self, class_name: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class_name))
            .unwrap_or(false)
    }

    fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let element = Element::new(tag_name, attrs);
        let id_attr = element.attr("id").map(str::to_string);
        let id = self.create_node(Some(parent), NodeType::Element(element));
        if let Some(id_attr) = id_attr.filter(|value| !value.is_empty()) {
            // First element wins, matching getElementById.
            self.id_index.entry(id_attr).or_insert(id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn is_valid_node(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node_id];
        while let Some(node) = stack.pop() {
            if let NodeType::Text(text) = &self.nodes[node.0].node_type {
                out.push_str(text);
            }
            stack.extend(self.nodes[node.0].children.iter().rev());
        }
        out
    }

    pub(crate) fn set_text_content(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        if self.element(node_id).is_none() {
            return Err(Error::Dom(
                "textContent target is not an element".into(),
            ));
        }
        let old_children = std::mem::take(&mut self.nodes[node_id.0].children);
        let had_children = !old_children.is_empty();
        for child in old_children {
            self.nodes[child.0].parent = None;
        }
        if !value.is_empty() {
            self.create_text(node_id, value.to_string());
        }
        if had_children {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|e| e.attr(&name.to_ascii_lowercase()).map(str::to_string))
    }

    pub(crate) fn has_attr(&self, node_id: NodeId, name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|e| e.attr(&name.to_ascii_lowercase()).is_some())
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let connected = self.is_connected(node_id);
        let element = self.element_mut(node_id).ok_or_else(|| {
            Error::Dom("setAttribute target is not an element".into())
        })?;
        element.set_attr(&lowered, value);
        if lowered == "value" && !element.is_tag("select") {
            element.value = value.to_string();
        }
        if lowered == "id" && connected {
            self.rebuild_id_index();
        }
        Ok(())
    }

    /// Reads a `data-*` attribute by its dataset key (`original` reads
    /// `data-original`).
    pub(crate) fn dataset_get(&self, node_id: NodeId, key: &str) -> Option<String> {
        self.attr(node_id, &dataset_key_to_attr_name(key))
    }

    /// `disabled` only means something on form controls; elsewhere the
    /// attribute is inert.
    pub(crate) fn disabled(&self, node_id: NodeId) -> bool {
        self.element(node_id).is_some_and(|element| {
            is_disableable_tag(&element.tag_name) && element.attr("disabled").is_some()
        })
    }

    pub(crate) fn value(&self, node_id: NodeId) -> Result<String> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("value target is not an element".into()))?;
        Ok(element.value.clone())
    }

    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let is_select = self
            .element(node_id)
            .ok_or_else(|| Error::Dom("value target is not an element".into()))?
            .is_tag("select");
        if is_select {
            return self.set_select_value(node_id, value);
        }
        if let Some(element) = self.element_mut(node_id) {
            element.value = value.to_string();
        }
        Ok(())
    }

    pub(crate) fn initialize_form_control_values(&mut self) -> Result<()> {
        let selects = self
            .all_element_nodes()
            .into_iter()
            .filter(|node| self.element(*node).is_some_and(|e| e.is_tag("select")))
            .collect::<Vec<_>>();
        for select in selects {
            let value = self.select_value_from_options(select)?;
            if let Some(element) = self.element_mut(select) {
                element.value = value;
            }
        }
        Ok(())
    }

    fn set_select_value(&mut self, select_node: NodeId, requested: &str) -> Result<()> {
        let mut options = Vec::new();
        self.collect_select_options(select_node, &mut options);

        let mut matched = None;
        for option in &options {
            if self.option_effective_value(*option)? == requested {
                matched = Some(*option);
                break;
            }
        }

        for option in options {
            if let Some(element) = self.element_mut(option) {
                if Some(option) == matched {
                    element.set_attr("selected", "");
                } else {
                    element.remove_attr("selected");
                }
            }
        }

        // No matching option leaves the select with nothing selected.
        let value = if matched.is_some() {
            requested.to_string()
        } else {
            String::new()
        };
        if let Some(element) = self.element_mut(select_node) {
            element.value = value;
        }
        Ok(())
    }

    fn select_value_from_options(&self, select_node: NodeId) -> Result<String> {
        let mut options = Vec::new();
        self.collect_select_options(select_node, &mut options);

        let selected = options
            .iter()
            .copied()
            .find(|option| self.has_attr(*option, "selected"))
            .or_else(|| options.first().copied());

        match selected {
            Some(option) => self.option_effective_value(option),
            None => Ok(String::new()),
        }
    }

    fn collect_select_options(&self, select_node: NodeId, out: &mut Vec<NodeId>) {
        let mut stack = self.nodes[select_node.0]
            .children
            .iter()
            .rev()
            .copied()
            .collect::<Vec<_>>();
        while let Some(node) = stack.pop() {
            if self.element(node).is_some_and(|e| e.is_tag("option")) {
                out.push(node);
                continue;
            }
            stack.extend(self.nodes[node.0].children.iter().rev());
        }
    }

    fn option_effective_value(&self, option_node: NodeId) -> Result<String> {
        let element = self
            .element(option_node)
            .ok_or_else(|| Error::Dom("option target is not an element".into()))?;
        if let Some(value) = element.attr("value") {
            return Ok(value.to_string());
        }
        Ok(self.text_content(option_node).trim().to_string())
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(Error::Dom(
                "removeChild target is not a direct child".into(),
            ));
        }
        self.nodes[parent.0].children.retain(|id| *id != child);
        self.nodes[child.0].parent = None;
        self.rebuild_id_index();
        Ok(())
    }

    /// Detaches `node` from its parent. Returns `false` when the node was
    /// already detached (or is the document itself).
    pub(crate) fn remove_node(&mut self, node: NodeId) -> Result<bool> {
        if node == self.root || !self.is_valid_node(node) {
            return Ok(false);
        }
        let Some(parent) = self.parent(node) else {
            return Ok(false);
        };
        self.remove_child(parent, node)?;
        Ok(true)
    }

    pub(crate) fn is_connected(&self, node_id: NodeId) -> bool {
        if !self.is_valid_node(node_id) {
            return false;
        }
        let mut cursor = Some(node_id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    fn rebuild_id_index(&mut self) {
        let mut next = HashMap::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if let NodeType::Element(element) = &self.nodes[node.0].node_type {
                if let Some(id) = element.attr("id") {
                    if !id.is_empty() {
                        next.entry(id.to_string()).or_insert(node);
                    }
                }
            }
            for child in self.nodes[node.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        self.id_index = next;
    }

    pub(crate) fn all_element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if matches!(self.nodes[node.0].node_type, NodeType::Element(_)) {
                out.push(node);
            }
            for child in self.nodes[node.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let all = self.query_selector_all(selector)?;
        Ok(all.into_iter().next())
    }

    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;

        if groups.len() == 1 && groups[0].len() == 1 {
            if let Some(id) = groups[0][0].step.id_only() {
                return Ok(self.by_id(id).into_iter().collect());
            }
        }

        Ok(self
            .all_element_nodes()
            .into_iter()
            .filter(|candidate| {
                groups
                    .iter()
                    .any(|steps| self.matches_selector_chain(*candidate, steps))
            })
            .collect())
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![DumpStep::Open(node_id)];
        while let Some(step) = stack.pop() {
            let node = match step {
                DumpStep::Open(node) => node,
                DumpStep::Close(node) => {
                    if let Some(element) = self.element(node) {
                        out.push_str("</");
                        out.push_str(&element.tag_name);
                        out.push('>');
                    }
                    continue;
                }
            };
            match &self.nodes[node.0].node_type {
                NodeType::Document => {}
                NodeType::Text(text) => out.push_str(text),
                NodeType::Element(element) => {
                    out.push('<');
                    out.push_str(&element.tag_name);
                    for (k, v) in &element.attrs {
                        out.push(' ');
                        out.push_str(k);
                        out.push_str("=\"");
                        out.push_str(v);
                        out.push('"');
                    }
                    out.push('>');
                    stack.push(DumpStep::Close(node));
                }
            }
            stack.extend(
                self.nodes[node.0]
                    .children
                    .iter()
                    .rev()
                    .map(|child| DumpStep::Open(*child)),
            );
        }
        out
    }

    fn matches_selector_chain(&self, node_id: NodeId, steps: &[SelectorPart]) -> bool {
        crate::selector::matches_chain(self, node_id, steps)
    }
}

// Pending work for the iterative serializer.
enum DumpStep {
    Open(NodeId),
    Close(NodeId),
}

fn is_disableable_tag(tag: &str) -> bool {
    [
        "button", "input", "select", "textarea", "optgroup", "option", "fieldset",
    ]
    .iter()
    .any(|candidate| tag.eq_ignore_ascii_case(candidate))
}

fn dataset_key_to_attr_name(key: &str) -> String {
    let mut out = String::from("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    #[test]
    fn removed_subtree_drops_out_of_id_index() -> Result<()> {
        let mut dom = parse_html("<div id='wrap'><p id='inner'>x</p></div>")?;
        let wrap = dom.by_id("wrap").ok_or_else(|| Error::SelectorNotFound("#wrap".into()))?;
        assert!(dom.remove_node(wrap)?);
        assert_eq!(dom.by_id("inner"), None);
        assert!(!dom.remove_node(wrap)?);
        Ok(())
    }

    #[test]
    fn select_value_prefers_selected_option_then_first() -> Result<()> {
        let dom = parse_html(
            "<select id='a'><option value='x'>X</option><option value='y' selected>Y</option></select>\
             <select id='b'><option>First </option><option>Second</option></select>\
             <select id='c'></select>",
        )?;
        let a = dom.by_id("a").ok_or_else(|| Error::SelectorNotFound("#a".into()))?;
        let b = dom.by_id("b").ok_or_else(|| Error::SelectorNotFound("#b".into()))?;
        let c = dom.by_id("c").ok_or_else(|| Error::SelectorNotFound("#c".into()))?;
        assert_eq!(dom.value(a)?, "y");
        assert_eq!(dom.value(b)?, "First");
        assert_eq!(dom.value(c)?, "");
        Ok(())
    }

    #[test]
    fn setting_unknown_select_value_clears_selection() -> Result<()> {
        let mut dom = parse_html("<select id='s'><option value='x'>X</option></select>")?;
        let s = dom.by_id("s").ok_or_else(|| Error::SelectorNotFound("#s".into()))?;
        dom.set_value(s, "missing")?;
        assert_eq!(dom.value(s)?, "");
        dom.set_value(s, "x")?;
        assert_eq!(dom.value(s)?, "x");
        Ok(())
    }

    #[test]
    fn dataset_keys_map_to_kebab_case_attributes() -> Result<()> {
        let dom = parse_html("<span id='s' data-original='Name' data-col-index='3'></span>")?;
        let s = dom.by_id("s").ok_or_else(|| Error::SelectorNotFound("#s".into()))?;
        assert_eq!(dom.dataset_get(s, "original").as_deref(), Some("Name"));
        assert_eq!(dom.dataset_get(s, "colIndex").as_deref(), Some("3"));
        assert_eq!(dom.dataset_get(s, "missing"), None);
        Ok(())
    }

    #[test]
    fn disabled_applies_to_form_controls_only() -> Result<()> {
        let dom = parse_html(
            "<button id='b' disabled></button><select id='s' disabled></select>\
             <main id='m' disabled></main><a id='a' disabled></a><input id='i'>",
        )?;
        let node = |id: &str| dom.by_id(id).ok_or_else(|| Error::SelectorNotFound(id.into()));
        assert!(dom.disabled(node("b")?));
        assert!(dom.disabled(node("s")?));
        assert!(!dom.disabled(node("m")?));
        assert!(!dom.disabled(node("a")?));
        assert!(!dom.disabled(node("i")?));
        Ok(())
    }

    #[test]
    fn deep_nesting_reads_and_dumps_without_recursion() -> Result<()> {
        let depth = 20_000;
        let html = format!(
            "{}<b id='leaf'>deep</b>{}",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );
        let dom = parse_html(&html)?;
        let outer = dom
            .query_selector("div")?
            .ok_or_else(|| Error::SelectorNotFound("div".into()))?;
        assert_eq!(dom.text_content(outer), "deep");
        let dump = dom.dump_node(outer);
        assert!(dump.starts_with("<div><div>"));
        assert!(dump.contains("<b id=\"leaf\">deep</b>"));
        assert!(dump.ends_with("</div></div>"));
        assert_eq!(dump.matches("<div>").count(), depth);
        Ok(())
    }

    #[test]
    fn set_text_content_replaces_children() -> Result<()> {
        let mut dom = parse_html("<p id='p'>a<b id='bold'>b</b></p>")?;
        let p = dom.by_id("p").ok_or_else(|| Error::SelectorNotFound("#p".into()))?;
        dom.set_text_content(p, "plain")?;
        assert_eq!(dom.text_content(p), "plain");
        assert_eq!(dom.by_id("bold"), None);
        Ok(())
    }
}
