//! # Visual hosts
//!
//! A host owns the actual mount points (DOM elements, layers, terminal
//! regions...) that components render into. Views only ever see opaque
//! [`NodeId`] handles and drive the host through the [`VisualHost`] trait:
//!
//! - nodes are created detached, then inserted under a parent with
//!   `insert_before` (append when `before` is `None`),
//! - `remove_child` detaches a node, `release` frees it,
//! - `set_hidden` / `set_reveal` are what enter and exit transitions animate,
//! - `set_property` carries control state such as an input's `value`.
//!
//! [`MemoryHost`] keeps the whole tree in memory. It backs the tests and the
//! demos, and can print a compact dump of any subtree.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle to a host node.
    pub struct NodeId;
}

pub trait VisualHost {
    fn create_node(&self, tag: &str) -> NodeId;
    fn insert_before(&self, parent: NodeId, child: NodeId, before: Option<NodeId>);
    fn remove_child(&self, parent: NodeId, child: NodeId);
    /// Frees a node. It must already be detached from its parent.
    fn release(&self, node: NodeId);
    fn set_hidden(&self, node: NodeId, hidden: bool);
    fn is_hidden(&self, node: NodeId) -> bool;
    /// How much of the node is revealed, 0.0 (collapsed) to 1.0 (fully shown).
    fn set_reveal(&self, node: NodeId, amount: f32);
    fn reveal(&self, node: NodeId) -> f32;
    fn set_text(&self, node: NodeId, text: &str);
    /// Sets a named property, or clears it with `None`.
    fn set_property(&self, node: NodeId, name: &str, value: Option<&str>);
    fn property(&self, node: NodeId, name: &str) -> Option<String>;
}

#[derive(Clone, Debug)]
struct NodeData {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    hidden: bool,
    reveal: f32,
    text: String,
    props: BTreeMap<String, String>,
}

/// In-memory retained node tree.
pub struct MemoryHost {
    nodes: RefCell<SlotMap<NodeId, NodeData>>,
    root: NodeId,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(NodeData {
            tag: "root".into(),
            parent: None,
            children: Vec::new(),
            hidden: false,
            reveal: 1.0,
            text: String::new(),
            props: BTreeMap::new(),
        });
        Self {
            nodes: RefCell::new(nodes),
            root,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes that have not been released, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.borrow().contains_key(node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node).and_then(|n| n.parent)
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow().get(node).map(|n| n.tag.clone())
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow().get(node).map(|n| n.text.clone())
    }

    /// Compact rendering of a subtree: `tag`, `!` when hidden, `(text)`, `[children]`.
    ///
    /// `ul[li(A) li!(B)]` is a list with a visible `A` item and a hidden `B` item.
    pub fn dump(&self, node: NodeId) -> String {
        let mut out = String::new();
        Self::dump_into(&self.nodes.borrow(), node, &mut out);
        out
    }

    fn dump_into(nodes: &SlotMap<NodeId, NodeData>, node: NodeId, out: &mut String) {
        let Some(n) = nodes.get(node) else {
            out.push_str("<released>");
            return;
        };
        out.push_str(&n.tag);
        if n.hidden {
            out.push('!');
        }
        if !n.text.is_empty() {
            let _ = write!(out, "({})", n.text);
        }
        if !n.children.is_empty() {
            out.push('[');
            for (i, child) in n.children.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                Self::dump_into(nodes, *child, out);
            }
            out.push(']');
        }
    }

    fn with_node(&self, node: NodeId, op: &str, f: impl FnOnce(&mut NodeData)) {
        match self.nodes.borrow_mut().get_mut(node) {
            Some(n) => f(n),
            None => log::warn!("{op}: unknown or released node {node:?}"),
        }
    }
}

impl VisualHost for MemoryHost {
    fn create_node(&self, tag: &str) -> NodeId {
        self.nodes.borrow_mut().insert(NodeData {
            tag: tag.to_string(),
            parent: None,
            children: Vec::new(),
            hidden: false,
            reveal: 1.0,
            text: String::new(),
            props: BTreeMap::new(),
        })
    }

    fn insert_before(&self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        let mut nodes = self.nodes.borrow_mut();
        if !nodes.contains_key(parent) || !nodes.contains_key(child) {
            log::warn!("insert_before: unknown node (parent {parent:?}, child {child:?})");
            return;
        }

        // Re-inserting moves the node.
        if let Some(old_parent) = nodes[child].parent.take()
            && let Some(p) = nodes.get_mut(old_parent)
        {
            p.children.retain(|c| *c != child);
        }

        let siblings = &mut nodes[parent].children;
        let at = before
            .and_then(|b| siblings.iter().position(|c| *c == b))
            .unwrap_or(siblings.len());
        siblings.insert(at, child);
        nodes[child].parent = Some(parent);
    }

    fn remove_child(&self, parent: NodeId, child: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(p) = nodes.get_mut(parent) else {
            log::warn!("remove_child: unknown parent {parent:?}");
            return;
        };
        let before = p.children.len();
        p.children.retain(|c| *c != child);
        if p.children.len() == before {
            log::warn!("remove_child: {child:?} is not a child of {parent:?}");
            return;
        }
        if let Some(c) = nodes.get_mut(child) {
            c.parent = None;
        }
    }

    fn release(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(data) = nodes.remove(node) else {
            log::warn!("release: node {node:?} already released");
            return;
        };
        if let Some(parent) = data.parent
            && let Some(p) = nodes.get_mut(parent)
        {
            log::warn!("release: node {node:?} was still attached; detaching");
            p.children.retain(|c| *c != node);
        }
        // Descendants go with it.
        let mut stack = data.children;
        while let Some(n) = stack.pop() {
            if let Some(d) = nodes.remove(n) {
                stack.extend(d.children);
            }
        }
    }

    fn set_hidden(&self, node: NodeId, hidden: bool) {
        self.with_node(node, "set_hidden", |n| n.hidden = hidden);
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        self.nodes.borrow().get(node).is_some_and(|n| n.hidden)
    }

    fn set_reveal(&self, node: NodeId, amount: f32) {
        self.with_node(node, "set_reveal", |n| n.reveal = amount.clamp(0.0, 1.0));
    }

    fn reveal(&self, node: NodeId) -> f32 {
        self.nodes.borrow().get(node).map_or(0.0, |n| n.reveal)
    }

    fn set_text(&self, node: NodeId, text: &str) {
        self.with_node(node, "set_text", |n| n.text = text.to_string());
    }

    fn set_property(&self, node: NodeId, name: &str, value: Option<&str>) {
        self.with_node(node, "set_property", |n| match value {
            Some(v) => {
                n.props.insert(name.to_string(), v.to_string());
            }
            None => {
                n.props.remove(name);
            }
        });
    }

    fn property(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(node)
            .and_then(|n| n.props.get(name).cloned())
    }
}
