/*
 * store.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The auxiliary store embedded in a generated document.
//!
//! The store is a custom XML part whose root element lives in the engine's
//! namespace. It holds three things:
//!
//! - `Document`: the request metadata (`DocumentType`, `Version`)
//! - `DocumentContainerPlaceHolders`: one child per container placeholder,
//!   holding the container's markup as it was before its first expansion
//! - `DataBoundControlsDataStore/Data`: a snapshot of the data context that
//!   data-bound controls point into
//!
//! Archives are write-once. [`AuxStore::record_archive`] refuses to replace an
//! existing entry, so every refresh expands from the same pristine shape.

use crate::error::{Error, Result};
use crate::package::{CT_CUSTOM_XML_PROPS, CT_XML, Package, REL_CUSTOM_XML, REL_CUSTOM_XML_PROPS};
use crate::request::DocumentMetadata;
use docweave_xml::{NodeId, XmlDeclaration, XmlTree};
use tracing::{debug, trace};
use uuid::Uuid;

/// Store namespace used when the configuration does not name one.
pub const DEFAULT_STORE_NAMESPACE: &str = "http://schemas.docweave.dev/document-generation";

/// Absolute path of the snapshot's parent inside the store, for binding paths.
pub const DATA_ROOT_PATH: &str =
    "/ns0:DocumentRootNode[1]/ns0:DataBoundControlsDataStore[1]/ns0:Data[1]";

const CUSTOM_XML_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/customXml";

const PREFIX: &str = "ns0";
const ROOT: &str = "DocumentRootNode";
const DOCUMENT: &str = "Document";
const PLACEHOLDERS: &str = "DocumentContainerPlaceHolders";
const DATA_STORE: &str = "DataBoundControlsDataStore";
const DATA: &str = "Data";

/// Persisted per-document state.
#[derive(Debug, Clone)]
pub struct AuxStore {
    namespace: String,
    item_id: String,
    /// Part the store was loaded from; `None` until first saved.
    part: Option<String>,
    metadata: Option<DocumentMetadata>,
    archive: Vec<(String, String)>,
    snapshot: Option<String>,
}

impl AuxStore {
    /// An empty store with a fresh item id.
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            item_id: new_item_id(),
            part: None,
            metadata: None,
            archive: Vec::new(),
            snapshot: None,
        }
    }

    /// Find the store among the custom XML parts of `main_part`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStore`] when a part in the store namespace
    /// cannot be parsed or read back.
    pub fn load(package: &Package, main_part: &str, namespace: &str) -> Result<Option<Self>> {
        for part in package.related_parts(main_part, REL_CUSTOM_XML)? {
            let Some(bytes) = package.part(&part) else {
                continue;
            };
            let Ok(tree) = docweave_xml::parse_bytes(bytes) else {
                // Unparseable parts in other namespaces are not ours to judge
                if contains_namespace(bytes, namespace) {
                    return Err(Error::CorruptStore(format!("{} is not well-formed XML", part)));
                }
                continue;
            };
            if tree.namespace_uri(tree.root()).as_deref() != Some(namespace) {
                continue;
            }
            let mut store = Self::from_tree(&tree, namespace)?;
            store.part = Some(part.clone());
            if let Some(id) = read_item_id(package, &part)? {
                store.item_id = id;
            }
            debug!(part = %part, archived = store.archive.len(), "loaded document store");
            return Ok(Some(store));
        }
        Ok(None)
    }

    pub fn load_or_create(package: &Package, main_part: &str, namespace: &str) -> Result<Self> {
        Ok(Self::load(package, main_part, namespace)?.unwrap_or_else(|| Self::new(namespace)))
    }

    fn from_tree(tree: &XmlTree, namespace: &str) -> Result<Self> {
        let root = tree.root();
        if !has_local(tree, root, ROOT) {
            return Err(Error::CorruptStore(format!(
                "unexpected root element <{}>",
                tree.name(root).map(|n| n.to_string()).unwrap_or_default()
            )));
        }

        let mut store = Self {
            namespace: namespace.to_string(),
            item_id: new_item_id(),
            part: None,
            metadata: None,
            archive: Vec::new(),
            snapshot: None,
        };

        if let Some(document) = child_local(tree, root, DOCUMENT) {
            store.metadata = Some(DocumentMetadata {
                document_type: tree.attribute(document, "DocumentType").unwrap_or_default().to_string(),
                version: tree.attribute(document, "Version").unwrap_or_default().to_string(),
            });
        }

        if let Some(placeholders) = child_local(tree, root, PLACEHOLDERS) {
            for entry in tree.child_elements(placeholders) {
                let name = tree.name(entry).map(|n| n.local.clone()).unwrap_or_default();
                let Some(markup_root) = tree.child_elements(entry).next() else {
                    return Err(Error::CorruptStore(format!("archive entry '{}' is empty", name)));
                };
                let markup = docweave_xml::fragment_xml(tree, markup_root)
                    .map_err(|e| Error::CorruptStore(e.to_string()))?;
                store.archive.push((name, markup));
            }
        }

        if let Some(data_store) = child_local(tree, root, DATA_STORE) {
            let snapshot_root = child_local(tree, data_store, DATA)
                .and_then(|data| tree.child_elements(data).next());
            if let Some(snapshot_root) = snapshot_root {
                let markup = docweave_xml::fragment_xml(tree, snapshot_root)
                    .map_err(|e| Error::CorruptStore(e.to_string()))?;
                store.snapshot = Some(markup);
            }
        }

        Ok(store)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Braced GUID identifying the store, referenced by `w:storeItemID`.
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn metadata(&self) -> Option<&DocumentMetadata> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: DocumentMetadata) {
        self.metadata = Some(metadata);
    }

    /// Pristine markup archived for a container placeholder.
    pub fn archived(&self, name: &str) -> Option<&str> {
        self.archive
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, markup)| markup.as_str())
    }

    pub fn archive_len(&self) -> usize {
        self.archive.len()
    }

    /// Archive `markup` under `name` unless an entry already exists.
    ///
    /// Returns whether the entry was written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArchiveKey`] if `name` cannot be an element name.
    pub fn record_archive(&mut self, name: &str, markup: String) -> Result<bool> {
        if !is_xml_name(name) {
            return Err(Error::InvalidArchiveKey(name.to_string()));
        }
        if self.archived(name).is_some() {
            return Ok(false);
        }
        trace!(name, "archived pristine container markup");
        self.archive.push((name.to_string(), markup));
        Ok(true)
    }

    pub fn snapshot(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    /// Replace the data snapshot.
    pub fn set_snapshot(&mut self, markup: Option<String>) {
        self.snapshot = markup;
    }

    /// The store as it would be persisted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStore`] if an archived fragment or the
    /// snapshot no longer parses.
    pub fn to_tree(&self) -> Result<XmlTree> {
        let mut tree = XmlTree::new(&qualified(ROOT));
        tree.set_declaration(Some(XmlDeclaration::default()));
        let root = tree.root();
        tree.set_attribute(root, &format!("xmlns:{}", PREFIX), self.namespace.as_str());

        if let Some(metadata) = &self.metadata {
            let document = tree.create_element_with(
                &qualified(DOCUMENT),
                &[
                    ("DocumentType", metadata.document_type.as_str()),
                    ("Version", metadata.version.as_str()),
                ],
            );
            tree.append_child(root, document);
        }

        if !self.archive.is_empty() {
            let placeholders = tree.create_element(&qualified(PLACEHOLDERS));
            tree.append_child(root, placeholders);
            for (name, markup) in &self.archive {
                let entry = tree.create_element(&qualified(name));
                tree.append_child(placeholders, entry);
                let fragment = tree
                    .import_fragment(markup, entry)
                    .map_err(|e| Error::CorruptStore(format!("archive entry '{}': {}", name, e)))?;
                tree.append_child(entry, fragment);
            }
        }

        if let Some(snapshot) = &self.snapshot {
            let data_store = tree.create_element(&qualified(DATA_STORE));
            let data = tree.create_element(&qualified(DATA));
            tree.append_child(root, data_store);
            tree.append_child(data_store, data);
            let fragment = tree
                .import_fragment(snapshot, data)
                .map_err(|e| Error::CorruptStore(format!("data snapshot: {}", e)))?;
            tree.append_child(data, fragment);
        }

        Ok(tree)
    }

    /// Write the store into `package`, creating the custom XML part, its
    /// properties part, relationships and content types on first save.
    pub fn save(&mut self, package: &mut Package, main_part: &str) -> Result<()> {
        let tree = self.to_tree()?;
        let part = match &self.part {
            Some(part) => part.clone(),
            None => self.create_parts(package, main_part)?,
        };
        package.write_xml(&part, &tree)?;
        self.part = Some(part);
        Ok(())
    }

    fn create_parts(&self, package: &mut Package, main_part: &str) -> Result<String> {
        let mut n = 1;
        while package.has_part(&format!("customXml/item{}.xml", n))
            || package.has_part(&format!("customXml/itemProps{}.xml", n))
        {
            n += 1;
        }
        let item = format!("customXml/item{}.xml", n);
        let props = format!("customXml/itemProps{}.xml", n);

        let mut props_tree = XmlTree::new("ds:datastoreItem");
        props_tree.set_declaration(Some(XmlDeclaration::default()));
        let props_root = props_tree.root();
        props_tree.set_attribute(props_root, "ds:itemID", self.item_id.as_str());
        props_tree.set_attribute(props_root, "xmlns:ds", CUSTOM_XML_NS);
        let refs = props_tree.create_element("ds:schemaRefs");
        let schema = props_tree.create_element_with("ds:schemaRef", &[("ds:uri", self.namespace.as_str())]);
        props_tree.append_child(props_root, refs);
        props_tree.append_child(refs, schema);

        // The item part must exist before relationships point at it
        package.set_part(&item, Vec::new());
        package.write_xml(&props, &props_tree)?;
        package.add_relationship(&item, REL_CUSTOM_XML_PROPS, &props)?;
        package.add_relationship(main_part, REL_CUSTOM_XML, &item)?;
        package.set_content_type_override(&props, CT_CUSTOM_XML_PROPS)?;
        package.ensure_default_content_type("xml", CT_XML)?;
        debug!(part = %item, item_id = %self.item_id, "created document store part");
        Ok(item)
    }
}

fn new_item_id() -> String {
    format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase())
}

fn qualified(local: &str) -> String {
    format!("{}:{}", PREFIX, local)
}

fn has_local(tree: &XmlTree, id: NodeId, local: &str) -> bool {
    tree.name(id).is_some_and(|n| n.local == local)
}

fn child_local(tree: &XmlTree, id: NodeId, local: &str) -> Option<NodeId> {
    tree.child_elements(id).find(|c| has_local(tree, *c, local))
}

fn contains_namespace(bytes: &[u8], namespace: &str) -> bool {
    let needle = namespace.as_bytes();
    !needle.is_empty() && bytes.windows(needle.len()).any(|w| w == needle)
}

fn read_item_id(package: &Package, item_part: &str) -> Result<Option<String>> {
    for props in package.related_parts(item_part, REL_CUSTOM_XML_PROPS)? {
        if !package.has_part(&props) {
            continue;
        }
        let tree = package.read_xml(&props)?;
        if let Some(id) = tree.attribute(tree.root(), "ds:itemID") {
            return Ok(Some(id.to_string()));
        }
    }
    Ok(None)
}

/// Whether `name` can be used unprefixed as an XML element name.
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.to_ascii_lowercase().starts_with("xml")
}
