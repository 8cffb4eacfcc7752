//! Arena-backed XML tree.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Parent and
//! child links are explicit index lists, so tree surgery (insert-before,
//! clone, detach, replace) never leaves a dangling parent pointer: a detached
//! node simply stops being reachable from the root.

use std::fmt;

/// Index of a node inside an [`XmlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A qualified XML name, split into prefix and local part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace prefix, if any (e.g., "w" in `w:sdt`).
    pub prefix: Option<String>,

    /// The local name (e.g., "sdt" in `w:sdt`).
    pub local: String,
}

impl QName {
    /// Split a qualified name on its first `:`.
    pub fn new(qualified: &str) -> Self {
        match qualified.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => Self {
                prefix: None,
                local: qualified.to_string(),
            },
        }
    }

    /// Compare against a qualified name such as `"w:tag"`.
    pub fn matches(&self, qualified: &str) -> bool {
        match qualified.split_once(':') {
            Some((prefix, local)) => self.prefix.as_deref() == Some(prefix) && self.local == local,
            None => self.prefix.is_none() && self.local == qualified,
        }
    }

    /// Whether this attribute name is a namespace declaration (`xmlns` or `xmlns:p`).
    pub fn is_namespace_declaration(&self) -> bool {
        match &self.prefix {
            Some(prefix) => prefix == "xmlns",
            None => self.local == "xmlns",
        }
    }

    /// The prefix a namespace declaration binds; `None` for the default namespace.
    ///
    /// Only meaningful when [`is_namespace_declaration`](Self::is_namespace_declaration) holds.
    pub fn declared_prefix(&self) -> Option<&str> {
        match &self.prefix {
            Some(_) => Some(self.local.as_str()),
            None => None,
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

/// Element name plus attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
}

impl Element {
    /// Create an element with no attributes.
    pub fn new(qualified: &str) -> Self {
        Self {
            name: QName::new(qualified),
            attributes: Vec::new(),
        }
    }

    /// Get an attribute value by qualified name.
    pub fn attribute(&self, qualified: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(qualified))
            .map(|a| a.value.as_str())
    }

    /// Add or overwrite an attribute.
    pub fn set_attribute(&mut self, qualified: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name.matches(qualified)) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: QName::new(qualified),
                value,
            }),
        }
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attribute(&mut self, qualified: &str) -> Option<String> {
        let index = self
            .attributes
            .iter()
            .position(|a| a.name.matches(qualified))?;
        Some(self.attributes.remove(index).value)
    }
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The `<?xml ...?>` declaration of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: Some("yes".to_string()),
        }
    }
}

/// An XML document held as an arena of nodes.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<Node>,
    root: NodeId,
    declaration: Option<XmlDeclaration>,
}

impl XmlTree {
    /// Create a tree holding a single empty root element.
    pub fn new(root_name: &str) -> Self {
        Self::with_root(Element::new(root_name))
    }

    /// Create a tree from an already-built root element.
    pub fn with_root(root: Element) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(root),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            declaration: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    pub fn set_declaration(&mut self, declaration: Option<XmlDeclaration>) {
        self.declaration = declaration;
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.element(id).map(|e| &e.name)
    }

    /// Whether `id` is an element with the given qualified name.
    pub fn is(&self, id: NodeId, qualified: &str) -> bool {
        self.name(id).is_some_and(|n| n.matches(qualified))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    /// Text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    /// Overwrite the text of a text node; a no-op on elements.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(existing) = &mut self.nodes[id.0].kind {
            *existing = text.into();
        }
    }

    pub fn attribute(&self, id: NodeId, qualified: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(qualified))
    }

    /// Set an attribute; a no-op on text nodes.
    pub fn set_attribute(&mut self, id: NodeId, qualified: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.set_attribute(qualified, value);
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, qualified: &str) -> Option<String> {
        self.element_mut(id)
            .and_then(|e| e.remove_attribute(qualified))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children of `id`, skipping text.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
    }

    /// First element child with the given qualified name.
    pub fn first_child(&self, id: NodeId, qualified: &str) -> Option<NodeId> {
        self.child_elements(id).find(|c| self.is(*c, qualified))
    }

    pub fn children_named(&self, id: NodeId, qualified: &str) -> Vec<NodeId> {
        self.child_elements(id)
            .filter(|c| self.is(*c, qualified))
            .collect()
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Descendants of `id` (document order) satisfying `predicate`.
    pub fn descendants_matching<F>(&self, id: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&XmlTree, NodeId) -> bool,
    {
        self.descendants(id)
            .into_iter()
            .filter(|d| predicate(self, *d))
            .collect()
    }

    /// Descendant elements with the given qualified name.
    pub fn descendants_named(&self, id: NodeId, qualified: &str) -> Vec<NodeId> {
        self.descendants_matching(id, |tree, d| tree.is(d, qualified))
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// 1-based position of `id` among its parent's element children.
    pub fn element_position(&self, id: NodeId) -> usize {
        match self.parent(id) {
            Some(parent) => self
                .child_elements(parent)
                .position(|c| c == id)
                .map_or(1, |p| p + 1),
            None => 1,
        }
    }

    /// Allocate a detached element.
    pub fn create_element(&mut self, qualified: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element::new(qualified)))
    }

    /// Allocate a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Allocate an element with attributes.
    pub fn create_element_with(&mut self, qualified: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut element = Element::new(qualified);
        for (name, value) in attributes {
            element.set_attribute(name, *value);
        }
        self.alloc(NodeKind::Element(element))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Unlink `id` from its parent. The node and its subtree stay valid and
    /// can be re-inserted elsewhere.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` as the first child of `parent`, moving it if attached.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
    }

    /// Insert `node` immediately before `anchor`. No-op when `anchor` is detached.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        self.detach(node);
        let index = self.index_in_parent(parent, anchor);
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, node);
    }

    /// Insert `node` immediately after `anchor`. No-op when `anchor` is detached.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        let Some(parent) = self.parent(anchor) else {
            return;
        };
        self.detach(node);
        let index = self.index_in_parent(parent, anchor);
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index + 1, node);
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == self.root {
            self.detach(new);
            self.root = new;
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Detach every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    fn index_in_parent(&self, parent: NodeId, child: NodeId) -> usize {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == child)
            .unwrap_or(self.nodes[parent.0].children.len())
    }

    /// Copy the subtree at `id` into fresh, detached arena entries.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        self.deep_clone_tracking(id, id).0
    }

    /// Like [`deep_clone`](Self::deep_clone), also reporting which copy
    /// corresponds to `track` (a node inside the cloned subtree).
    pub fn deep_clone_tracking(&mut self, id: NodeId, track: NodeId) -> (NodeId, Option<NodeId>) {
        let mut tracked = None;
        let copy = self.clone_rec(id, track, &mut tracked);
        (copy, tracked)
    }

    fn clone_rec(&mut self, id: NodeId, track: NodeId, tracked: &mut Option<NodeId>) -> NodeId {
        let kind = self.nodes[id.0].kind.clone();
        let copy = self.alloc(kind);
        if id == track {
            *tracked = Some(copy);
        }
        let children = self.nodes[id.0].children.clone();
        for child in children {
            let child_copy = self.clone_rec(child, track, tracked);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Copy a subtree of another tree into this one, returning the detached copy.
    pub fn import(&mut self, other: &XmlTree, id: NodeId) -> NodeId {
        let copy = self.alloc(other.kind(id).clone());
        for child in other.children(id) {
            let child_copy = self.import(other, *child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.text(d))
            .collect()
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        self.clear_children(id);
        let node = self.create_text(text);
        self.append_child(id, node);
    }

    /// Namespace declarations in scope at `id`, nearest declaration winning.
    ///
    /// The default namespace is reported with a `None` prefix.
    pub fn namespace_scope(&self, id: NodeId) -> Vec<(Option<String>, String)> {
        let mut scope: Vec<(Option<String>, String)> = Vec::new();
        for node in std::iter::once(id).chain(self.ancestors(id)) {
            let Some(element) = self.element(node) else {
                continue;
            };
            for attr in &element.attributes {
                if !attr.name.is_namespace_declaration() {
                    continue;
                }
                let prefix = attr.name.declared_prefix().map(str::to_string);
                if !scope.iter().any(|(p, _)| *p == prefix) {
                    scope.push((prefix, attr.value.clone()));
                }
            }
        }
        scope
    }

    /// Namespace URI of an element, resolved through in-scope declarations.
    pub fn namespace_uri(&self, id: NodeId) -> Option<String> {
        let prefix = self.name(id)?.prefix.clone();
        self.namespace_scope(id)
            .into_iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, uri)| uri)
    }
}

/// Iterator over the ancestors of a node, nearest first.
pub struct Ancestors<'a> {
    tree: &'a XmlTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
