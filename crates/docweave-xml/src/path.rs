//! Location paths: a small, predictable subset of XPath.
//!
//! Supported steps:
//! - `.` and `..`
//! - `name` and `name[n]` (1-based position among matching siblings)
//! - `*` and `*[n]`
//! - `text()` (the string value of the current node)
//! - a trailing `@attr`
//!
//! A leading `/` makes the path absolute; its first step must then match the
//! document root. Name tests compare local names, so `ns0:Data` matches a
//! `Data` element under any prefix.

use crate::tree::{NodeId, XmlTree};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Current,
    Parent,
    Text,
    Element {
        /// `None` for `*`.
        local: Option<String>,
        position: Option<usize>,
    },
    Attribute(String),
}

/// A compiled location path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPath {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

impl LocationPath {
    /// Compile a path expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for empty steps (`//`), malformed
    /// predicates, or an attribute step that is not last.
    pub fn compile(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        let invalid = |message: &str| Error::InvalidPath {
            path: expr.to_string(),
            message: message.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid("empty path"));
        }

        let (absolute, body) = match trimmed.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut steps = Vec::new();
        let segments: Vec<&str> = body.split('/').collect();
        for (index, segment) in segments.iter().enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(invalid("empty step"));
            }
            let step = match segment {
                "." => Step::Current,
                ".." => Step::Parent,
                "text()" => Step::Text,
                _ if segment.starts_with('@') => {
                    if index + 1 != segments.len() {
                        return Err(invalid("attribute step must be last"));
                    }
                    Step::Attribute(local_part(&segment[1..]).to_string())
                }
                _ => parse_element_step(segment).ok_or_else(|| invalid("malformed step"))?,
            };
            steps.push(step);
        }

        Ok(Self {
            source: expr.to_string(),
            absolute,
            steps,
        })
    }

    /// The expression this path was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Nodes selected from `context`, in document order.
    ///
    /// A trailing attribute step keeps the elements that carry the attribute.
    pub fn select(&self, tree: &XmlTree, context: NodeId) -> Vec<NodeId> {
        let mut steps = self.steps.as_slice();
        let mut current: Vec<NodeId> = if self.absolute {
            let root = tree.root();
            match steps.first() {
                Some(Step::Element { local, position }) => {
                    let name_ok = local
                        .as_deref()
                        .is_none_or(|l| tree.name(root).is_some_and(|n| n.local == l));
                    if !name_ok || position.is_some_and(|p| p != 1) {
                        return Vec::new();
                    }
                    steps = &steps[1..];
                    vec![root]
                }
                _ => return Vec::new(),
            }
        } else {
            vec![context]
        };

        for step in steps {
            current = apply_step(tree, &current, step);
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// First selected node.
    pub fn select_first(&self, tree: &XmlTree, context: NodeId) -> Option<NodeId> {
        self.select(tree, context).into_iter().next()
    }

    /// String value of the first selection: the attribute value for a trailing
    /// attribute step, otherwise the node's concatenated text.
    pub fn string_value(&self, tree: &XmlTree, context: NodeId) -> Option<String> {
        let first = self.select_first(tree, context)?;
        match self.steps.last() {
            Some(Step::Attribute(name)) => attribute_by_local(tree, first, name).map(str::to_string),
            _ => Some(tree.text_content(first)),
        }
    }
}

fn parse_element_step(segment: &str) -> Option<Step> {
    let (name, position) = match segment.split_once('[') {
        Some((name, rest)) => {
            let digits = rest.strip_suffix(']')?;
            let position: usize = digits.trim().parse().ok()?;
            if position == 0 {
                return None;
            }
            (name, Some(position))
        }
        None => (segment, None),
    };
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == ']' || c == '@') {
        return None;
    }
    let local = match name {
        "*" => None,
        _ => Some(local_part(name).to_string()),
    };
    Some(Step::Element { local, position })
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn attribute_by_local<'t>(tree: &'t XmlTree, id: NodeId, local: &str) -> Option<&'t str> {
    tree.element(id)?
        .attributes
        .iter()
        .find(|a| !a.name.is_namespace_declaration() && a.name.local == local)
        .map(|a| a.value.as_str())
}

fn apply_step(tree: &XmlTree, current: &[NodeId], step: &Step) -> Vec<NodeId> {
    let mut next = Vec::new();
    for node in current {
        match step {
            Step::Current | Step::Text => push_unique(&mut next, *node),
            Step::Parent => {
                if let Some(parent) = tree.parent(*node) {
                    push_unique(&mut next, parent);
                }
            }
            Step::Element { local, position } => {
                let mut matching = tree.child_elements(*node).filter(|c| {
                    local
                        .as_deref()
                        .is_none_or(|l| tree.name(*c).is_some_and(|n| n.local == l))
                });
                match position {
                    Some(p) => {
                        if let Some(hit) = matching.nth(p - 1) {
                            push_unique(&mut next, hit);
                        }
                    }
                    None => {
                        for hit in matching {
                            push_unique(&mut next, hit);
                        }
                    }
                }
            }
            Step::Attribute(name) => {
                if attribute_by_local(tree, *node, name).is_some() {
                    push_unique(&mut next, *node);
                }
            }
        }
    }
    next
}

fn push_unique(nodes: &mut Vec<NodeId>, id: NodeId) {
    if !nodes.contains(&id) {
        nodes.push(id);
    }
}
