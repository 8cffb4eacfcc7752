/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder metadata: which tag names the engine owns, what kind each
//! one is, and how its key, value and items are looked up in the data.

use crate::data::DataContext;
use crate::error::{Error, Result};
use docweave_xml::{LocationPath, NodeId, XmlTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// How the walker treats a recognized content control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaceholderKind {
    /// Left exactly as it is.
    Ignore,
    /// Filled with a single value.
    NonRecursive,
    /// Cloned once per item of a collection.
    Recursive,
    /// Groups other placeholders; archived for refresh.
    Container,
}

impl PlaceholderKind {
    /// Numeric codes used by introspected registries.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Recursive),
            2 => Some(Self::NonRecursive),
            3 => Some(Self::Ignore),
            4 => Some(Self::Container),
            _ => None,
        }
    }
}

/// Where a placeholder's data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// No lookups: values are empty and Recursive regions have no items.
    None,

    /// Location paths evaluated from the current data node.
    ///
    /// For a Recursive placeholder `value` selects the collection node and
    /// its element children are the items.
    Path {
        tag: Option<PathTemplate>,
        value: Option<PathTemplate>,
    },

    /// `field` elements whose `contentControlTagREFS` names the placeholder;
    /// key and value are read from the named attributes.
    FieldRefs {
        tag_attribute: String,
        value_attribute: String,
    },
}

/// A location path that may hold a `{0}` slot for the 1-based position of
/// the current data node among its element siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    fixed: Option<LocationPath>,
}

impl PathTemplate {
    /// Compile `expr`. A positional template is checked with `1` in the slot.
    pub fn compile(expr: &str) -> docweave_xml::Result<Self> {
        if expr.contains("{0}") {
            LocationPath::compile(&expr.replace("{0}", "1"))?;
            return Ok(Self {
                source: expr.to_string(),
                fixed: None,
            });
        }
        Ok(Self {
            source: expr.to_string(),
            fixed: Some(LocationPath::compile(expr)?),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The expression with the slot filled for `at`.
    pub fn instantiate(&self, data: &XmlTree, at: NodeId) -> String {
        match self.fixed {
            Some(_) => self.source.clone(),
            None => self
                .source
                .replace("{0}", &data.element_position(at).to_string()),
        }
    }

    fn path_for(&self, data: &XmlTree, at: NodeId) -> Option<LocationPath> {
        match &self.fixed {
            Some(path) => Some(path.clone()),
            None => LocationPath::compile(&self.instantiate(data, at)).ok(),
        }
    }

    pub fn string_value(&self, data: &XmlTree, at: NodeId) -> Option<String> {
        self.path_for(data, at)?.string_value(data, at)
    }

    pub fn select_first(&self, data: &XmlTree, at: NodeId) -> Option<NodeId> {
        self.path_for(data, at)?.select_first(data, at)
    }
}

/// How one placeholder name maps to data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpec {
    pub name: String,
    pub kind: PlaceholderKind,
    pub lookup: Lookup,
}

const FIELD: &str = "field";
const FIELD_REFS: &str = "contentControlTagREFS";
const CONTENT_CONTROL: &str = "contentControl";

impl PlaceholderSpec {
    pub fn new(name: impl Into<String>, kind: PlaceholderKind) -> Self {
        Self {
            name: name.into(),
            kind,
            lookup: Lookup::None,
        }
    }

    /// Attach tag and value location paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLookup`] if either path does not compile.
    pub fn with_paths(mut self, tag: Option<&str>, value: Option<&str>) -> Result<Self> {
        let compile = |expr: &str| {
            PathTemplate::compile(expr).map_err(|source| Error::InvalidLookup {
                name: self.name.clone(),
                source,
            })
        };
        let tag = tag.map(compile).transpose()?;
        let value = value.map(compile).transpose()?;
        self.lookup = Lookup::Path { tag, value };
        Ok(self)
    }

    /// Identifying key for the data item at `at`, used as the tag instance.
    pub fn resolve_key(&self, data: &XmlTree, at: NodeId) -> Option<String> {
        match &self.lookup {
            Lookup::None => None,
            Lookup::Path { tag, .. } => tag.as_ref()?.string_value(data, at),
            Lookup::FieldRefs { tag_attribute, .. } => {
                let field = self.referencing_field(data, at)?;
                data.attribute(field, tag_attribute).map(str::to_string)
            }
        }
        .filter(|key| !key.is_empty())
    }

    /// Scalar value for the data item at `at`.
    pub fn resolve_value(&self, data: &XmlTree, at: NodeId) -> Option<String> {
        match &self.lookup {
            Lookup::None => None,
            Lookup::Path { value, .. } => value.as_ref()?.string_value(data, at),
            Lookup::FieldRefs {
                value_attribute, ..
            } => {
                let field = self.referencing_field(data, at)?;
                data.attribute(field, value_attribute).map(str::to_string)
            }
        }
    }

    /// The value path for the data item at `at`, slot filled; what a
    /// data-bound control points at.
    pub fn binding_path(&self, data: &XmlTree, at: NodeId) -> Option<String> {
        match &self.lookup {
            Lookup::Path {
                value: Some(value), ..
            } => Some(value.instantiate(data, at)),
            _ => None,
        }
    }

    /// Collection items for a Recursive placeholder, in document order.
    ///
    /// `None` when the lookup selects no collection at all, as opposed to a
    /// collection with zero items.
    pub fn select_items(&self, data: &XmlTree, at: NodeId) -> Option<Vec<NodeId>> {
        match &self.lookup {
            Lookup::None => None,
            Lookup::Path { value, .. } => {
                let collection = value.as_ref()?.select_first(data, at)?;
                Some(data.child_elements(collection).collect())
            }
            Lookup::FieldRefs { .. } => {
                let anchor = self.referencing_field(data, at)?;
                Some(
                    data.descendants(anchor)
                        .into_iter()
                        .filter(|d| is_local(data, *d, FIELD))
                        .filter(|d| {
                            data.ancestors(*d)
                                .find(|a| is_local(data, *a, FIELD))
                                .is_some_and(|nearest| references(data, nearest, &self.name))
                        })
                        .collect(),
                )
            }
        }
    }

    /// First `field` at or below `at` that references this placeholder.
    fn referencing_field(&self, data: &XmlTree, at: NodeId) -> Option<NodeId> {
        std::iter::once(at)
            .chain(data.descendants(at))
            .find(|n| is_local(data, *n, FIELD) && references(data, *n, &self.name))
    }
}

fn is_local(tree: &XmlTree, id: NodeId, local: &str) -> bool {
    tree.name(id).is_some_and(|n| n.local == local)
}

fn references(tree: &XmlTree, field: NodeId, name: &str) -> bool {
    tree.attribute(field, FIELD_REFS)
        .is_some_and(|refs| refs.split(' ').any(|r| r == name))
}

/// Placeholder name to spec.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    specs: BTreeMap<String, PlaceholderSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spec, returning the one it replaced.
    pub fn insert(&mut self, spec: PlaceholderSpec) -> Option<PlaceholderSpec> {
        self.specs.insert(spec.name.clone(), spec)
    }

    pub fn get(&self, name: &str) -> Option<&PlaceholderSpec> {
        self.specs.get(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaceholderSpec> {
        self.specs.values()
    }

    /// Build a registry from the `contentControl` declarations inside the
    /// data itself.
    ///
    /// Each declaration carries `tag`, a numeric `type`, and the names of the
    /// attributes holding the key (`refTagValue`) and value
    /// (`refControlValue`) on referencing `field` elements. The first
    /// declaration of a tag wins.
    pub fn from_data_context(data: &DataContext) -> Self {
        let tree = data.tree();
        let mut registry = Self::new();
        let declarations = std::iter::once(tree.root())
            .chain(tree.descendants(tree.root()))
            .filter(|n| is_local(tree, *n, CONTENT_CONTROL));
        for declaration in declarations {
            let Some(tag) = tree.attribute(declaration, "tag").filter(|t| !t.is_empty()) else {
                warn!("contentControl declaration without a tag skipped");
                continue;
            };
            if registry.get(tag).is_some() {
                continue;
            }
            let code = tree.attribute(declaration, "type").unwrap_or_default();
            let Some(kind) = code.trim().parse().ok().and_then(PlaceholderKind::from_code) else {
                warn!(tag, code, "contentControl declaration with unknown type skipped");
                continue;
            };
            let lookup = Lookup::FieldRefs {
                tag_attribute: tree
                    .attribute(declaration, "refTagValue")
                    .unwrap_or_default()
                    .to_string(),
                value_attribute: tree
                    .attribute(declaration, "refControlValue")
                    .unwrap_or_default()
                    .to_string(),
            };
            registry.insert(PlaceholderSpec {
                name: tag.to_string(),
                kind,
                lookup,
            });
        }
        registry
    }
}
