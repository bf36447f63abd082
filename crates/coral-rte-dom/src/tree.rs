//! # Document Tree
//!
//! [`Dom`] is an arena of element and text nodes. Nodes are addressed by
//! [`NodeId`] and never move in memory; structural edits only rewire parent and
//! child links, so ids held by bookmarks and search indices stay meaningful
//! after an edit (they may however point at detached nodes).
//!
//! Read access goes through the [`TextTree`] trait. Selection, bookmark and
//! search code is written against that trait so it can run against any tree
//! that exposes the same navigation primitives.
//!
//! ## Revisions
//!
//! Every mutating method bumps [`Dom::revision`]. Derived structures record the
//! revision they were built from and refuse to answer once it has moved on.

use crate::node::{Element, NodeId, NodeKind};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomError {
    #[error("node {0} is not a text node")]
    NotText(NodeId),
    #[error("node {0} is not an element")]
    NotElement(NodeId),
    #[error("offset {offset} is out of range for node {node} (length {len})")]
    OffsetOutOfRange {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    #[error("node {0} has no parent")]
    Detached(NodeId),
    #[error("the root node cannot be moved or removed")]
    RootImmovable,
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

/// Read-only navigation over a document tree.
pub trait TextTree {
    fn root(&self) -> NodeId;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> &[NodeId];
    fn kind(&self, node: NodeId) -> &NodeKind;
    /// Monotonic counter bumped by every mutation.
    fn revision(&self) -> u64;

    fn element(&self, node: NodeId) -> Option<&Element> {
        self.kind(node).as_element()
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag.as_str())
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        self.kind(node).as_text()
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|element| element.attr(name))
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.kind(node), NodeKind::Text(_))
    }

    fn is_tag(&self, node: NodeId, tag: &str) -> bool {
        self.tag(node) == Some(tag)
    }

    /// Characters for text nodes, number of children for elements.
    ///
    /// This is the valid offset range of a point anchored in `node`.
    fn char_len(&self, node: NodeId) -> usize {
        match self.kind(node) {
            NodeKind::Text(text) => text.chars().count(),
            NodeKind::Element(_) => self.children(node).len(),
        }
    }

    fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&child| child == node)
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).last().copied()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.index_in_parent(node)?;
        self.children(parent).get(index + 1).copied()
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.index_in_parent(node)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Ancestors from the direct parent up to the root.
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(node);
        while let Some(parent) = current {
            result.push(parent);
            current = self.parent(parent);
        }
        result
    }

    /// True if `ancestor` is `node` or one of its ancestors.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    /// Whether the node is still reachable from the root.
    fn is_attached(&self, node: NodeId) -> bool {
        node == self.root() || self.ancestors(node).last() == Some(&self.root())
    }

    /// Nearest ancestor-or-self with the given tag, stopping at the root.
    fn closest(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .take_while(|&n| n != self.root())
            .find(|&n| self.is_tag(n, tag))
    }

    /// Tag names from the root down to `node` (text nodes contribute `#text`).
    fn tag_path(&self, node: NodeId) -> Vec<String> {
        let mut path: Vec<String> = std::iter::once(node)
            .chain(self.ancestors(node))
            .map(|n| self.tag(n).unwrap_or("#text").to_string())
            .collect();
        path.reverse();
        path
    }

    /// Pre-order successor of `node`, confined to the subtree of `within`.
    fn next_in_order(&self, node: NodeId, within: NodeId) -> Option<NodeId> {
        if let Some(first) = self.first_child(node) {
            return Some(first);
        }
        let mut current = node;
        while current != within {
            if let Some(sibling) = self.next_sibling(current) {
                return Some(sibling);
            }
            current = self.parent(current)?;
        }
        None
    }

    /// All descendants of `node` in document order, excluding `node` itself.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.next_in_order(node, node);
        while let Some(n) = current {
            result.push(n);
            current = self.next_in_order(n, node);
        }
        result
    }

    /// Text nodes below `node`, in document order.
    fn text_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&n| self.is_text(n))
            .collect()
    }

    /// Concatenated text content of the subtree.
    fn text_content(&self, node: NodeId) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }
        self.text_nodes(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena backed document tree.
#[derive(Clone, Debug)]
pub struct Dom {
    nodes: Vec<NodeData>,
    root: NodeId,
    revision: u64,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new("body")
    }
}

impl TextTree for Dom {
    fn root(&self) -> NodeId {
        self.root
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.0].kind
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

impl Dom {
    /// Create an empty tree whose root element has the given tag.
    pub fn new(root_tag: &str) -> Self {
        let root = NodeData {
            kind: NodeKind::Element(Element::new(root_tag)),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            revision: 0,
        }
    }

    /// Force the revision forward, e.g. after swapping in a restored snapshot.
    pub fn bump_revision_past(&mut self, other: u64) {
        self.revision = self.revision.max(other) + 1;
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push(NodeKind::Element(Element::with_attrs(tag, attrs)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if child == self.root {
            return Err(DomError::RootImmovable);
        }
        if self.is_text(parent) {
            return Err(DomError::NotElement(parent));
        }
        if self.contains(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }
        Ok(())
    }

    fn unlink(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    /// Insert `child` under `parent` at `index` (clamped), detaching it first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.unlink(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        self.touch();
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let len = self.nodes[parent.0].children.len();
        self.insert_child(parent, len, child)
    }

    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        self.check_insertable(parent, child)?;
        self.unlink(child);
        let index = self
            .index_in_parent(reference)
            .ok_or(DomError::Detached(reference))?;
        self.insert_child(parent, index, child)
    }

    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        self.check_insertable(parent, child)?;
        self.unlink(child);
        let index = self
            .index_in_parent(reference)
            .ok_or(DomError::Detached(reference))?;
        self.insert_child(parent, index + 1, child)
    }

    /// Detach `node` (and its subtree) from the document.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        if node == self.root {
            return Err(DomError::RootImmovable);
        }
        if self.parent(node).is_none() {
            return Err(DomError::Detached(node));
        }
        self.unlink(node);
        self.touch();
        Ok(())
    }

    /// Replace `element` by its children. Returns the moved children.
    pub fn unwrap(&mut self, element: NodeId) -> Result<Vec<NodeId>, DomError> {
        if self.is_text(element) {
            return Err(DomError::NotElement(element));
        }
        let parent = self.parent(element).ok_or(DomError::Detached(element))?;
        let index = self
            .index_in_parent(element)
            .ok_or(DomError::Detached(element))?;
        let children = std::mem::take(&mut self.nodes[element.0].children);
        for (offset, &child) in children.iter().enumerate() {
            self.nodes[child.0].parent = Some(parent);
            self.nodes[parent.0].children.insert(index + 1 + offset, child);
        }
        self.unlink(element);
        self.touch();
        Ok(children)
    }

    /// Insert a new element in place of `node` and move `node` into it.
    pub fn wrap(&mut self, node: NodeId, tag: &str, attrs: Vec<(String, String)>) -> Result<NodeId, DomError> {
        let parent = self.parent(node).ok_or(DomError::Detached(node))?;
        let index = self.index_in_parent(node).ok_or(DomError::Detached(node))?;
        let wrapper = self.create_element_with_attrs(tag, attrs);
        self.unlink(node);
        self.nodes[parent.0].children.insert(index, wrapper);
        self.nodes[wrapper.0].parent = Some(parent);
        self.nodes[wrapper.0].children.push(node);
        self.nodes[node.0].parent = Some(wrapper);
        self.touch();
        Ok(wrapper)
    }

    fn text_mut(&mut self, node: NodeId) -> Result<&mut String, DomError> {
        match &mut self.nodes[node.0].kind {
            NodeKind::Text(text) => Ok(text),
            NodeKind::Element(_) => Err(DomError::NotText(node)),
        }
    }

    pub fn set_text(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        *self.text_mut(node)? = value.to_string();
        self.touch();
        Ok(())
    }

    /// Replace the chars in `start..end` of a text node with `replacement`.
    pub fn splice_text(
        &mut self,
        node: NodeId,
        start: usize,
        end: usize,
        replacement: &str,
    ) -> Result<(), DomError> {
        let text = self.text_mut(node)?;
        let len = text.chars().count();
        if start > end || end > len {
            return Err(DomError::OffsetOutOfRange {
                node,
                offset: end.max(start),
                len,
            });
        }
        let start_byte = byte_index(text, start);
        let end_byte = byte_index(text, end);
        text.replace_range(start_byte..end_byte, replacement);
        self.touch();
        Ok(())
    }

    /// Split a text node at a char offset.
    ///
    /// The original node keeps the left part; the returned node holds the right
    /// part and is inserted directly after it.
    pub fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let parent = self.parent(node).ok_or(DomError::Detached(node))?;
        let text = self.text_mut(node)?;
        let len = text.chars().count();
        if offset > len {
            return Err(DomError::OffsetOutOfRange { node, offset, len });
        }
        let at = byte_index(text, offset);
        let right_text = text.split_off(at);
        let right = self.create_text(&right_text);
        let index = self.index_in_parent(node).ok_or(DomError::Detached(node))?;
        self.insert_child(parent, index + 1, right)?;
        Ok(right)
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element, DomError> {
        match &mut self.nodes[node.0].kind {
            NodeKind::Element(element) => Ok(element),
            NodeKind::Text(_) => Err(DomError::NotElement(node)),
        }
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element_mut(node)?;
        match element.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attrs.push((name.to_string(), value.to_string())),
        }
        self.touch();
        Ok(())
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.element_mut(node)?.attrs.retain(|(key, _)| key != name);
        self.touch();
        Ok(())
    }

    /// Merge adjacent text siblings below `node` and drop empty text nodes.
    ///
    /// Surviving nodes are the left-most of each run.
    pub fn normalize(&mut self, node: NodeId) {
        let mut changed = false;
        for element in std::iter::once(node).chain(self.descendants(node)) {
            if self.is_text(element) {
                continue;
            }
            let children = self.children(element).to_vec();
            let mut previous_text: Option<NodeId> = None;
            for child in children {
                let Some(text) = self.text(child).map(str::to_string) else {
                    previous_text = None;
                    continue;
                };
                match previous_text {
                    Some(keep) => {
                        if let NodeKind::Text(existing) = &mut self.nodes[keep.0].kind {
                            existing.push_str(&text);
                        }
                        self.unlink(child);
                        changed = true;
                    }
                    None if text.is_empty() => {
                        self.unlink(child);
                        changed = true;
                    }
                    None => previous_text = Some(child),
                }
            }
        }
        if changed {
            self.touch();
        }
    }
}

/// Byte index of the `char_offset`-th char, or the string length past the end.
pub fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}
