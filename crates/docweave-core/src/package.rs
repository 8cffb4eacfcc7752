/*
 * package.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Open Packaging Conventions access for WordprocessingML files.
//!
//! A [`Package`] holds every zip entry in memory, in archive order. Parts are
//! addressed by their zip entry name (`word/document.xml`, no leading slash).
//! Relationship and content-type bookkeeping is done on parsed
//! [`XmlTree`]s so that added parts stay reachable when the package is
//! written back.

use crate::error::{Error, Result};
use docweave_xml::{XmlDeclaration, XmlTree};
use std::io::{Cursor, Read, Write};
use tracing::trace;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";

pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_HEADER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
pub const REL_FOOTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
pub const REL_SETTINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
pub const REL_CUSTOM_XML: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/customXml";
pub const REL_CUSTOM_XML_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/customXmlProps";
pub const REL_AF_CHUNK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/aFChunk";

pub const CT_DOCUMENT_MAIN: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
pub const CT_TEMPLATE_MAIN: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml";
pub const CT_SETTINGS: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml";
pub const CT_CUSTOM_XML_PROPS: &str =
    "application/vnd.openxmlformats-officedocument.customXmlProperties+xml";
pub const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const CT_XML: &str = "application/xml";

/// One `Relationship` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Target resolved to a part name.
    pub target: String,
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// An OPC package held in memory.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    /// Read every entry of a zip archive.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.push(Part {
                name: file.name().to_string(),
                data,
            });
        }
        trace!(parts = parts.len(), "opened package");
        Ok(Self { parts })
    }

    /// Write the package back to zip bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options: zip::write::FileOptions<'_, ()> =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for part in &self.parts {
            zip.start_file(part.name.as_str(), options)?;
            zip.write_all(&part.data)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Insert or overwrite a part.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// Parse a part as XML.
    pub fn read_xml(&self, name: &str) -> Result<XmlTree> {
        let data = self
            .part(name)
            .ok_or_else(|| Error::MissingPart(name.to_string()))?;
        docweave_xml::parse_bytes(data).map_err(|e| Error::xml(name, e))
    }

    /// Serialize a tree into a part.
    pub fn write_xml(&mut self, name: &str, tree: &XmlTree) -> Result<()> {
        let bytes = docweave_xml::to_bytes(tree).map_err(|e| Error::xml(name, e))?;
        self.set_part(name, bytes);
        Ok(())
    }

    /// A part name not yet in use, built from `prefix`, a counter and `suffix`.
    pub fn next_free_name(&self, prefix: &str, suffix: &str) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("{}{}{}", prefix, n, suffix);
            if !self.has_part(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// The main document part, found through the package relationships.
    pub fn main_document_part(&self) -> Result<String> {
        let rels = self.relationships_of_package()?;
        rels.into_iter()
            .find(|r| r.rel_type == REL_OFFICE_DOCUMENT)
            .map(|r| r.target)
            .ok_or_else(|| Error::MissingPart("main document part".to_string()))
    }

    fn relationships_of_package(&self) -> Result<Vec<Relationship>> {
        if !self.has_part(PACKAGE_RELS_PART) {
            return Err(Error::MissingPart(PACKAGE_RELS_PART.to_string()));
        }
        let tree = self.read_xml(PACKAGE_RELS_PART)?;
        Ok(read_relationships(&tree, ""))
    }

    /// Relationships declared by `source`; empty when it has no `.rels` part.
    pub fn relationships(&self, source: &str) -> Result<Vec<Relationship>> {
        let rels_name = rels_part_for(source);
        if !self.has_part(&rels_name) {
            return Ok(Vec::new());
        }
        let tree = self.read_xml(&rels_name)?;
        Ok(read_relationships(&tree, part_directory(source)))
    }

    /// Targets of every relationship of `rel_type` from `source`.
    pub fn related_parts(&self, source: &str, rel_type: &str) -> Result<Vec<String>> {
        Ok(self
            .relationships(source)?
            .into_iter()
            .filter(|r| r.rel_type == rel_type)
            .map(|r| r.target)
            .collect())
    }

    /// Add a relationship from `source` to `target` and return its id.
    pub fn add_relationship(&mut self, source: &str, rel_type: &str, target: &str) -> Result<String> {
        let rels_name = rels_part_for(source);
        let mut tree = if self.has_part(&rels_name) {
            self.read_xml(&rels_name)?
        } else {
            new_xml_tree("Relationships", RELATIONSHIPS_NS)
        };
        let root = tree.root();

        let existing: Vec<String> = tree
            .children_named(root, "Relationship")
            .into_iter()
            .filter_map(|r| tree.attribute(r, "Id").map(str::to_string))
            .collect();
        let mut n = existing.len() + 1;
        let id = loop {
            let candidate = format!("rId{}", n);
            if !existing.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };

        let relative = relative_target(part_directory(source), target);
        let rel = tree.create_element_with(
            "Relationship",
            &[("Id", id.as_str()), ("Type", rel_type), ("Target", relative.as_str())],
        );
        tree.append_child(root, rel);
        self.write_xml(&rels_name, &tree)?;
        self.ensure_default_content_type("rels", CT_RELATIONSHIPS)?;
        trace!(source, target, id = %id, "added relationship");
        Ok(id)
    }

    /// Content type override registered for a part.
    pub fn content_type_override(&self, part: &str) -> Result<Option<String>> {
        let tree = self.read_xml(CONTENT_TYPES_PART)?;
        let wanted = format!("/{}", part);
        Ok(tree
            .children_named(tree.root(), "Override")
            .into_iter()
            .find(|o| tree.attribute(*o, "PartName") == Some(wanted.as_str()))
            .and_then(|o| tree.attribute(o, "ContentType").map(str::to_string)))
    }

    /// Register or replace the content type override of a part.
    pub fn set_content_type_override(&mut self, part: &str, content_type: &str) -> Result<()> {
        let mut tree = self.read_xml(CONTENT_TYPES_PART)?;
        let root = tree.root();
        let wanted = format!("/{}", part);
        let existing = tree
            .children_named(root, "Override")
            .into_iter()
            .find(|o| tree.attribute(*o, "PartName") == Some(wanted.as_str()));
        match existing {
            Some(node) => tree.set_attribute(node, "ContentType", content_type),
            None => {
                let node = tree.create_element_with(
                    "Override",
                    &[("PartName", wanted.as_str()), ("ContentType", content_type)],
                );
                tree.append_child(root, node);
            }
        }
        self.write_xml(CONTENT_TYPES_PART, &tree)
    }

    /// Register a default content type for an extension if none exists.
    pub fn ensure_default_content_type(&mut self, extension: &str, content_type: &str) -> Result<()> {
        let mut tree = self.read_xml(CONTENT_TYPES_PART)?;
        let root = tree.root();
        let present = tree.children_named(root, "Default").into_iter().any(|d| {
            tree.attribute(d, "Extension")
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        });
        if present {
            return Ok(());
        }
        let node = tree.create_element_with(
            "Default",
            &[("Extension", extension), ("ContentType", content_type)],
        );
        tree.prepend_child(root, node);
        self.write_xml(CONTENT_TYPES_PART, &tree)
    }

    /// Switch a template package (`.dotx`) to a document package (`.docx`).
    ///
    /// Returns whether anything changed.
    pub fn convert_template_to_document(&mut self) -> Result<bool> {
        let main = self.main_document_part()?;
        if self.content_type_override(&main)?.as_deref() != Some(CT_TEMPLATE_MAIN) {
            return Ok(false);
        }
        self.set_content_type_override(&main, CT_DOCUMENT_MAIN)?;
        trace!(part = %main, "converted template to document");
        Ok(true)
    }
}

/// A fresh tree with a standalone declaration and a default namespace.
pub(crate) fn new_xml_tree(root: &str, namespace: &str) -> XmlTree {
    let mut tree = XmlTree::new(root);
    let root_id = tree.root();
    tree.set_attribute(root_id, "xmlns", namespace);
    tree.set_declaration(Some(XmlDeclaration::default()));
    tree
}

fn read_relationships(tree: &XmlTree, base_dir: &str) -> Vec<Relationship> {
    tree.children_named(tree.root(), "Relationship")
        .into_iter()
        .filter(|r| tree.attribute(*r, "TargetMode") != Some("External"))
        .filter_map(|r| {
            Some(Relationship {
                id: tree.attribute(r, "Id")?.to_string(),
                rel_type: tree.attribute(r, "Type")?.to_string(),
                target: resolve_target(base_dir, tree.attribute(r, "Target")?),
            })
        })
        .collect()
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

fn part_directory(part: &str) -> &str {
    part.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Resolve a relationship target against the source part's directory.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let joined;
    let path = match target.strip_prefix('/') {
        Some(absolute) => absolute,
        None if base_dir.is_empty() => target,
        None => {
            joined = format!("{}/{}", base_dir, target);
            joined.as_str()
        }
    };
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Express `target` relative to `base_dir`, the way Word writes targets.
fn relative_target(base_dir: &str, target: &str) -> String {
    if base_dir.is_empty() {
        return target.to_string();
    }
    match target.strip_prefix(&format!("{}/", base_dir)) {
        Some(inside) => inside.to_string(),
        None => {
            let depth = base_dir.split('/').count();
            format!("{}{}", "../".repeat(depth), target)
        }
    }
}
