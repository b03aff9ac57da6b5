//! In-memory [`HostTree`] used by tests and headless hosts.

use indexmap::IndexMap;

use crate::host::{Event, EventHandler, HostTree, NodeId};
use crate::NodeError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryNodeKind {
    Element(String),
    Text(String),
}

#[derive(Clone, Debug)]
pub struct MemoryNode {
    pub kind: MemoryNodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: IndexMap<String, String>,
    pub styles: IndexMap<String, String>,
    pub listeners: Vec<(String, EventHandler)>,
}

impl MemoryNode {
    fn new(kind: MemoryNodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            styles: IndexMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            MemoryNodeKind::Element(tag) => Some(tag),
            MemoryNodeKind::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            MemoryNodeKind::Text(text) => Some(text),
            MemoryNodeKind::Element(_) => None,
        }
    }

    fn css_text(&self) -> String {
        self.styles
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Creates a detached element to render into.
    pub fn create_container(&mut self) -> NodeId {
        self.create_element("root")
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .and_then(|node| node.attributes.get(name))
            .map(String::as_str)
    }

    pub fn style(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .and_then(|node| node.styles.get(name))
            .map(String::as_str)
    }

    pub fn listener_count(&self, id: NodeId, event: &str) -> usize {
        self.node(id).map_or(0, |node| {
            node.listeners.iter().filter(|(name, _)| name == event).count()
        })
    }

    /// First descendant of `root`, in document order, whose attribute `name`
    /// equals `value`.
    pub fn find_by_attribute(&self, root: NodeId, name: &str, value: &str) -> Option<NodeId> {
        for &child in self.children(root) {
            let Some(node) = self.node(child) else {
                continue;
            };
            if node.attributes.get(name).map(String::as_str) == Some(value) {
                return Some(child);
            }
            if let Some(found) = self.find_by_attribute(child, name, value) {
                return Some(found);
            }
        }
        None
    }

    /// Calls every `event` listener registered on `node`. Returns how many ran.
    pub fn dispatch_event(&self, node: NodeId, event: &str) -> usize {
        let handlers: Vec<EventHandler> = match self.node(node) {
            Some(entry) => entry
                .listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, handler)| handler.clone())
                .collect(),
            None => return 0,
        };
        let payload = Event {
            name: event.to_owned(),
            target: node,
        };
        for handler in &handlers {
            handler.call(&payload);
        }
        handlers.len()
    }

    /// Serialises the children of `id` as markup. Used for assertions.
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut output = String::new();
        for &child in self.children(id) {
            self.write_markup(&mut output, child);
        }
        output
    }

    pub fn markup(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.write_markup(&mut output, id);
        output
    }

    fn write_markup(&self, output: &mut String, id: NodeId) {
        let Some(node) = self.node(id) else {
            output.push_str("<!--missing-->");
            return;
        };
        match &node.kind {
            MemoryNodeKind::Text(text) => output.push_str(&escape(text)),
            MemoryNodeKind::Element(tag) => {
                output.push('<');
                output.push_str(tag);
                for (name, value) in &node.attributes {
                    output.push(' ');
                    output.push_str(name);
                    if !value.is_empty() {
                        output.push_str(&format!("=\"{}\"", escape(value)));
                    }
                }
                if !node.styles.is_empty() {
                    output.push_str(&format!(" style=\"{}\"", escape(&node.css_text())));
                }
                output.push('>');
                for &child in &node.children {
                    self.write_markup(output, child);
                }
                output.push_str(&format!("</{tag}>"));
            }
        }
    }

    pub fn dump_tree(&self, root: Option<NodeId>) -> String {
        let mut output = String::new();
        if let Some(root_id) = root {
            self.dump_node(&mut output, root_id, 0);
        } else {
            output.push_str("(no root)\n");
        }
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.node(id) {
            Some(node) => {
                match &node.kind {
                    MemoryNodeKind::Element(tag) => {
                        output.push_str(&format!("{indent}[{id}] <{tag}>\n"))
                    }
                    MemoryNodeKind::Text(text) => {
                        output.push_str(&format!("{indent}[{id}] {text:?}\n"))
                    }
                }
                for &child in &node.children {
                    self.dump_node(output, child, depth + 1);
                }
            }
            None => output.push_str(&format!("{indent}[{id}] (missing)\n")),
        }
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, NodeError> {
        self.nodes
            .get_mut(id)
            .ok_or(NodeError::Missing { id })?
            .as_mut()
            .ok_or(NodeError::Missing { id })
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, NodeError> {
        let node = self.get_mut(id)?;
        match node.kind {
            MemoryNodeKind::Element(_) => Ok(node),
            MemoryNodeKind::Text(_) => Err(NodeError::NotAnElement { id }),
        }
    }

    fn create(&mut self, kind: MemoryNodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(MemoryNode::new(kind)));
        id
    }

    fn detach(&mut self, child: NodeId) -> Result<(), NodeError> {
        let previous = self.get_mut(child)?.parent.take();
        if let Some(parent) = previous {
            if let Ok(node) = self.get_mut(parent) {
                node.children.retain(|&id| id != child);
            }
        }
        Ok(())
    }

    fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> Result<(), NodeError> {
        if parent == child {
            return Err(NodeError::NotAChild { parent, child });
        }
        self.element_mut(parent)?;
        self.detach(child)?;
        let node = self.element_mut(parent)?;
        match index {
            Some(index) if index < node.children.len() => node.children.insert(index, child),
            _ => node.children.push(child),
        }
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }
}

impl HostTree for MemoryHost {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.create(MemoryNodeKind::Element(tag.to_owned()))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.create(MemoryNodeKind::Text(text.to_owned()))
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), NodeError> {
        if let MemoryNodeKind::Text(current) = &mut self.get_mut(node)?.kind {
            *current = text.to_owned();
            return Ok(());
        }
        // On an element this replaces the content, like textContent.
        let children = std::mem::take(&mut self.get_mut(node)?.children);
        for child in children {
            if let Ok(child) = self.get_mut(child) {
                child.parent = None;
            }
        }
        let text_node = self.create_text(text);
        self.attach(node, text_node, None)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.attach(parent, child, None)
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), NodeError> {
        self.attach(parent, child, Some(index))
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        if !self.contains_child(parent, child) {
            return Err(NodeError::NotAChild { parent, child });
        }
        self.detach(child)
    }

    fn contains_child(&self, parent: NodeId, child: NodeId) -> bool {
        self.node(child).and_then(|node| node.parent) == Some(parent)
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.children(parent).len()
    }

    fn add_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), NodeError> {
        let entry = self.element_mut(node)?;
        if !entry
            .listeners
            .iter()
            .any(|(name, existing)| name == event && existing.ptr_eq(&handler))
        {
            entry.listeners.push((event.to_owned(), handler));
        }
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError> {
        let entry = self.element_mut(node)?;
        entry
            .listeners
            .retain(|(name, existing)| !(name == event && existing.ptr_eq(handler)));
        Ok(())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), NodeError> {
        self.element_mut(node)?
            .attributes
            .insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), NodeError> {
        self.element_mut(node)?.attributes.shift_remove(name);
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), NodeError> {
        self.element_mut(node)?
            .styles
            .insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_style(&mut self, node: NodeId, name: &str) -> Result<(), NodeError> {
        self.element_mut(node)?.styles.shift_remove(name);
        Ok(())
    }

    fn set_css_text(&mut self, node: NodeId, css: &str) -> Result<(), NodeError> {
        let entry = self.element_mut(node)?;
        entry.styles.clear();
        for declaration in css.split(';') {
            if let Some((name, value)) = declaration.split_once(':') {
                let name = name.trim();
                if !name.is_empty() {
                    entry
                        .styles
                        .insert(name.to_owned(), value.trim().to_owned());
                }
            }
        }
        Ok(())
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
