/*
 * compose.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Composition of generated documents into one report.
//!
//! Every input is unprotected and flattened first: data-bound controls take
//! the value their binding points at in the document's own store, then each
//! content control is replaced by its content. Secondary documents are
//! embedded whole as `w:altChunk` parts after the primary's body, with
//! section breaks that keep each document's page geometry:
//!
//! ```text
//! [primary] [break: primary] [chunk 1] [break: chunk 1] ... [chunk M]
//! ```
//!
//! The body's own trailing `w:sectPr` takes the geometry of the last chunk.

use crate::error::{Error, Result};
use crate::package::{CT_DOCUMENT_MAIN, Package, REL_AF_CHUNK};
use crate::protection::{self, Protection};
use crate::request::EngineConfig;
use crate::store::AuxStore;
use crate::wordml::{self, R_NS};
use docweave_xml::{LocationPath, NodeId, XmlTree};
use tracing::{debug, info, trace};

/// Merges generated documents.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    config: EngineConfig,
}

/// A prepared input: unprotected, flattened, with its closing geometry.
struct Prepared {
    package: Package,
    main: String,
    document: XmlTree,
    geometry: Option<XmlTree>,
}

impl Composer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Compose `primary` followed by `secondaries`, in order, optionally
    /// protecting the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the primary or any secondary
    /// document is empty, and [`Error::MissingPart`] when a package has no
    /// main document or body.
    pub fn compose(
        &self,
        primary: &[u8],
        secondaries: &[Vec<u8>],
        protection: Option<&Protection>,
    ) -> Result<Vec<u8>> {
        if primary.is_empty() {
            return Err(Error::InvalidArgument("primary document is empty".to_string()));
        }
        if let Some(index) = secondaries.iter().position(|s| s.is_empty()) {
            return Err(Error::InvalidArgument(format!(
                "secondary document {} is empty",
                index + 1
            )));
        }

        let Prepared {
            mut package,
            main,
            mut document,
            geometry: primary_geometry,
        } = self.prepare(primary)?;
        let body = wordml::body(&document).ok_or_else(|| Error::MissingPart("document body".to_string()))?;

        let last = secondaries.len().saturating_sub(1);
        let mut last_geometry = None;
        for (index, secondary) in secondaries.iter().enumerate() {
            let Prepared {
                package: mut chunk_package,
                main: chunk_main,
                document: chunk_document,
                geometry,
            } = self.prepare(secondary)?;
            chunk_package.write_xml(&chunk_main, &chunk_document)?;
            let chunk_bytes = chunk_package.to_bytes()?;

            if index == 0 {
                if let Some(primary_geometry) = &primary_geometry {
                    let section = wordml::section_break(&mut document, primary_geometry, primary_geometry.root());
                    append_to_body(&mut document, body, section);
                }
            }

            let part = package.next_free_name("word/afchunk", ".docx");
            package.set_part(&part, chunk_bytes);
            package.set_content_type_override(&part, CT_DOCUMENT_MAIN)?;
            let id = package.add_relationship(&main, REL_AF_CHUNK, &part)?;
            wordml::declare_namespace(&mut document, "r", R_NS);
            let chunk = document.create_element_with("w:altChunk", &[("r:id", id.as_str())]);
            append_to_body(&mut document, body, chunk);
            debug!(part = %part, id = %id, "embedded document chunk");

            if index != last {
                if let Some(geometry) = &geometry {
                    let section = wordml::section_break(&mut document, geometry, geometry.root());
                    append_to_body(&mut document, body, section);
                }
            }
            last_geometry = geometry;
        }

        if let Some(geometry) = &last_geometry {
            let trailing = match wordml::trailing_section_properties(&document, body) {
                Some(trailing) => trailing,
                None => {
                    let section = document.create_element("w:sectPr");
                    document.append_child(body, section);
                    section
                }
            };
            wordml::apply_page_geometry(&mut document, trailing, geometry, geometry.root());
        }

        if let Some(protection) = protection {
            protection::protect(&mut package, &main, protection)?;
        }

        package.write_xml(&main, &document)?;
        let bytes = package.to_bytes()?;
        info!(
            chunks = secondaries.len(),
            protected = protection.is_some(),
            bytes = bytes.len(),
            "composed document"
        );
        Ok(bytes)
    }

    fn prepare(&self, bytes: &[u8]) -> Result<Prepared> {
        let mut package = Package::open(bytes)?;
        let main = package.main_document_part()?;
        if protection::unprotect(&mut package, &main)? {
            debug!(part = %main, "removed document protection before composing");
        }

        let mut document = package.read_xml(&main)?;
        let body = wordml::body(&document).ok_or_else(|| Error::MissingPart("document body".to_string()))?;
        remove_permission_markers(&mut document, body);
        let geometry = wordml::last_section_properties(&document, body).map(|s| capture(&document, s));

        let store = AuxStore::load(&package, &main, &self.config.store_namespace)?
            .map(|store| store.to_tree())
            .transpose()?;
        let flattened = flatten(&mut document, body, store.as_ref());
        debug!(part = %main, regions = flattened, "flattened content controls");

        Ok(Prepared {
            package,
            main,
            document,
            geometry,
        })
    }
}

/// Replace every content control under `node` with its content.
///
/// Controls carrying a `w:dataBinding` whose path resolves in `store` take
/// that value first. Promoted content is flattened in turn, so nested
/// controls disappear too. Returns the number of controls removed.
pub fn flatten(tree: &mut XmlTree, node: NodeId, store: Option<&XmlTree>) -> usize {
    if !wordml::is_sdt(tree, node) {
        let children: Vec<NodeId> = tree.child_elements(node).collect();
        return children.into_iter().map(|child| flatten(tree, child, store)).sum();
    }

    if let (Some(binding), Some(store)) = (wordml::data_binding(tree, node), store) {
        let value = LocationPath::compile(&binding.xpath)
            .ok()
            .and_then(|path| path.string_value(store, store.root()));
        if let Some(value) = value {
            trace!(xpath = %binding.xpath, "resolved bound value");
            wordml::set_content(tree, node, &value);
        }
    }

    let promoted: Vec<NodeId> = wordml::content(tree, node)
        .map(|content| tree.children(content).to_vec())
        .unwrap_or_default();
    for child in &promoted {
        tree.insert_before(node, *child);
    }
    tree.detach(node);

    1 + promoted
        .into_iter()
        .map(|child| flatten(tree, child, store))
        .sum::<usize>()
}

fn remove_permission_markers(tree: &mut XmlTree, body: NodeId) {
    let markers = tree.descendants_matching(body, |t, n| t.is(n, "w:permStart") || t.is(n, "w:permEnd"));
    for marker in markers {
        tree.detach(marker);
    }
}

/// Copy a `w:sectPr` into its own tree so later surgery cannot touch it.
fn capture(tree: &XmlTree, section: NodeId) -> XmlTree {
    let mut captured = XmlTree::new("w:sectPr");
    let copy = captured.import(tree, section);
    let root = captured.root();
    captured.replace(root, copy);
    captured
}

/// Append to the body, keeping a trailing `w:sectPr` last.
fn append_to_body(tree: &mut XmlTree, body: NodeId, node: NodeId) {
    match wordml::trailing_section_properties(tree, body) {
        Some(trailing) => tree.insert_before(trailing, node),
        None => tree.append_child(body, node),
    }
}
