/*
 * wordml.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! WordprocessingML helpers for content controls (`w:sdt`) and sections.
//!
//! Elements are matched by their qualified `w:` name, the prefix Word itself
//! writes for the main namespace.

use docweave_xml::{NodeId, XmlTree};
use tracing::trace;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Where a content control sits, which decides what its content may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLevel {
    /// Inside a paragraph; content is runs.
    Run,
    /// Between paragraphs and tables; content is paragraphs.
    Block,
    /// Inside a table; content is rows.
    Row,
    /// Inside a row; content is cells.
    Cell,
}

/// A `w:dataBinding` on a content control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBinding {
    pub xpath: String,
    pub store_item_id: Option<String>,
}

pub fn is_sdt(tree: &XmlTree, id: NodeId) -> bool {
    tree.is(id, "w:sdt")
}

pub fn properties(tree: &XmlTree, sdt: NodeId) -> Option<NodeId> {
    tree.first_child(sdt, "w:sdtPr")
}

pub fn content(tree: &XmlTree, sdt: NodeId) -> Option<NodeId> {
    tree.first_child(sdt, "w:sdtContent")
}

fn property(tree: &XmlTree, sdt: NodeId, qualified: &str) -> Option<NodeId> {
    properties(tree, sdt).and_then(|pr| tree.first_child(pr, qualified))
}

/// The `w:sdtPr`, created when absent.
fn properties_or_create(tree: &mut XmlTree, sdt: NodeId) -> NodeId {
    if let Some(pr) = properties(tree, sdt) {
        return pr;
    }
    let pr = tree.create_element("w:sdtPr");
    tree.prepend_child(sdt, pr);
    pr
}

/// Raw tag value.
pub fn tag(tree: &XmlTree, sdt: NodeId) -> Option<&str> {
    property(tree, sdt, "w:tag").and_then(|t| tree.attribute(t, "w:val"))
}

pub fn set_tag(tree: &mut XmlTree, sdt: NodeId, value: &str) {
    let node = match property(tree, sdt, "w:tag") {
        Some(node) => node,
        None => {
            let pr = properties_or_create(tree, sdt);
            let node = tree.create_element("w:tag");
            tree.append_child(pr, node);
            node
        }
    };
    tree.set_attribute(node, "w:val", value);
}

/// The `w:id` element carrying the control's structural identifier.
pub fn id_element(tree: &XmlTree, sdt: NodeId) -> Option<NodeId> {
    property(tree, sdt, "w:id")
}

pub fn data_binding(tree: &XmlTree, sdt: NodeId) -> Option<DataBinding> {
    let node = property(tree, sdt, "w:dataBinding")?;
    Some(DataBinding {
        xpath: tree.attribute(node, "w:xpath")?.to_string(),
        store_item_id: tree.attribute(node, "w:storeItemID").map(str::to_string),
    })
}

/// Replace any binding with one pointing at `xpath` in the store `store_item_id`.
pub fn set_data_binding(tree: &mut XmlTree, sdt: NodeId, xpath: &str, store_item_id: &str) {
    let pr = properties_or_create(tree, sdt);
    for old in tree.children_named(pr, "w:dataBinding") {
        tree.detach(old);
    }
    let node = tree.create_element_with(
        "w:dataBinding",
        &[("w:xpath", xpath), ("w:storeItemID", store_item_id)],
    );
    tree.append_child(pr, node);
}

pub fn is_multiline(tree: &XmlTree, sdt: NodeId) -> bool {
    property(tree, sdt, "w:text")
        .and_then(|t| tree.attribute(t, "w:multiLine"))
        .is_some_and(|v| matches!(v, "1" | "true" | "on"))
}

pub fn is_drop_down(tree: &XmlTree, sdt: NodeId) -> bool {
    properties(tree, sdt).is_some_and(|pr| {
        !tree.descendants_named(pr, "w:dropDownList").is_empty()
    })
}

/// Classify a content control by its nearest non-`sdt` container.
pub fn region_level(tree: &XmlTree, sdt: NodeId) -> RegionLevel {
    for ancestor in tree.ancestors(sdt) {
        let Some(name) = tree.name(ancestor) else {
            continue;
        };
        if name.prefix.as_deref() != Some("w") {
            continue;
        }
        match name.local.as_str() {
            "sdt" | "sdtContent" => continue,
            "p" | "hyperlink" | "smartTag" | "fldSimple" | "ins" | "del" => return RegionLevel::Run,
            "tbl" => return RegionLevel::Row,
            "tr" => return RegionLevel::Cell,
            _ => return RegionLevel::Block,
        }
    }
    RegionLevel::Block
}

/// Replace a content control's content with `text`.
///
/// Formatting is carried over from the first `w:rPr` (and, for block
/// controls, the first `w:pPr`) found in the old content. Permission range
/// markers around the old content are kept around the new content.
pub fn set_content(tree: &mut XmlTree, sdt: NodeId, text: &str) {
    let content = match content(tree, sdt) {
        Some(node) => node,
        None => {
            let node = tree.create_element("w:sdtContent");
            tree.append_child(sdt, node);
            node
        }
    };

    let first = |tree: &XmlTree, name: &str| tree.descendants_named(content, name).first().copied();
    let run_props = first(&*tree, "w:rPr").map(|n| tree.deep_clone(n));
    let para_props = first(&*tree, "w:pPr").map(|n| tree.deep_clone(n));
    let perm_start = first(&*tree, "w:permStart");
    let perm_end = first(&*tree, "w:permEnd");
    for marker in [perm_start, perm_end].into_iter().flatten() {
        tree.detach(marker);
    }

    let mut new_children = Vec::new();
    if is_drop_down(tree, sdt) {
        new_children.push(make_run(tree, run_props, text, false));
    } else {
        if let Some(pr) = properties(tree, sdt) {
            for placeholder in tree.children_named(pr, "w:showingPlcHdr") {
                tree.detach(placeholder);
            }
        }

        let runs: Vec<NodeId> = if is_multiline(tree, sdt) {
            text.split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .enumerate()
                .map(|(i, line)| make_run(tree, run_props, line, i > 0))
                .collect()
        } else {
            vec![make_run(tree, run_props, text, false)]
        };

        match region_level(tree, sdt) {
            RegionLevel::Run => new_children.extend(runs),
            RegionLevel::Block => new_children.push(make_paragraph(tree, para_props, &runs)),
            RegionLevel::Cell => new_children.push(make_cell(tree, &runs)),
            RegionLevel::Row => {
                let row = tree.create_element("w:tr");
                let cell = make_cell(tree, &runs);
                tree.append_child(row, cell);
                new_children.push(row);
            }
        }
    }

    tree.clear_children(content);
    if let Some(start) = perm_start {
        tree.append_child(content, start);
    }
    for child in new_children {
        tree.append_child(content, child);
    }
    if let Some(end) = perm_end {
        tree.append_child(content, end);
    }
    trace!(len = text.len(), "set content control text");
}

fn make_run(tree: &mut XmlTree, props: Option<NodeId>, text: &str, leading_break: bool) -> NodeId {
    let run = tree.create_element("w:r");
    if let Some(props) = props {
        let copy = tree.deep_clone(props);
        tree.append_child(run, copy);
    }
    if leading_break {
        let br = tree.create_element("w:br");
        tree.append_child(run, br);
    }
    let t = tree.create_element("w:t");
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        tree.set_attribute(t, "xml:space", "preserve");
    }
    if !text.is_empty() {
        let value = tree.create_text(text);
        tree.append_child(t, value);
    }
    tree.append_child(run, t);
    run
}

fn make_paragraph(tree: &mut XmlTree, props: Option<NodeId>, runs: &[NodeId]) -> NodeId {
    let paragraph = tree.create_element("w:p");
    if let Some(props) = props {
        tree.append_child(paragraph, props);
    }
    for run in runs {
        tree.append_child(paragraph, *run);
    }
    paragraph
}

fn make_cell(tree: &mut XmlTree, runs: &[NodeId]) -> NodeId {
    let cell = tree.create_element("w:tc");
    let paragraph = make_paragraph(tree, None, runs);
    tree.append_child(cell, paragraph);
    cell
}

/// Visible text of a content control. Line breaks in multi-line run
/// controls come back as `\n`.
pub fn region_text(tree: &XmlTree, sdt: NodeId) -> String {
    let Some(content) = content(tree, sdt) else {
        return String::new();
    };
    if region_level(tree, sdt) != RegionLevel::Run || !is_multiline(tree, sdt) {
        return tree.text_content(content);
    }
    let mut out = String::new();
    for node in tree.descendants(content) {
        if tree.is(node, "w:t") {
            out.push_str(&tree.text_content(node));
        } else if tree.is(node, "w:br") {
            out.push('\n');
        }
    }
    out
}

pub fn body(tree: &XmlTree) -> Option<NodeId> {
    tree.first_child(tree.root(), "w:body")
}

/// The last `w:sectPr` in the body: the geometry in force at the end.
pub fn last_section_properties(tree: &XmlTree, body: NodeId) -> Option<NodeId> {
    tree.descendants_named(body, "w:sectPr").last().copied()
}

/// The body-level `w:sectPr`, which must stay the body's last child.
pub fn trailing_section_properties(tree: &XmlTree, body: NodeId) -> Option<NodeId> {
    tree.child_elements(body)
        .last()
        .filter(|last| tree.is(*last, "w:sectPr"))
}

/// A `w:p/w:pPr/w:sectPr` section break carrying the page size and margins
/// of `source`, which may live in another tree.
pub fn section_break(tree: &mut XmlTree, source_tree: &XmlTree, source: NodeId) -> NodeId {
    let paragraph = tree.create_element("w:p");
    let props = tree.create_element("w:pPr");
    let section = tree.create_element("w:sectPr");
    tree.append_child(paragraph, props);
    tree.append_child(props, section);
    for name in ["w:pgSz", "w:pgMar"] {
        if let Some(node) = source_tree.descendants_named(source, name).first() {
            let copy = tree.import(source_tree, *node);
            tree.append_child(section, copy);
        }
    }
    paragraph
}

/// Overwrite the page size and margins of `target` with those of `source`.
pub fn apply_page_geometry(tree: &mut XmlTree, target: NodeId, source_tree: &XmlTree, source: NodeId) {
    for name in ["w:pgSz", "w:pgMar"] {
        let Some(replacement) = source_tree.descendants_named(source, name).first().copied() else {
            continue;
        };
        let copy = tree.import(source_tree, replacement);
        match tree.first_child(target, name) {
            Some(existing) => tree.replace(existing, copy),
            None => tree.append_child(target, copy),
        }
    }
}

/// Declare `prefix` on the root element unless it is already declared there.
pub fn declare_namespace(tree: &mut XmlTree, prefix: &str, uri: &str) {
    let root = tree.root();
    let attr = format!("xmlns:{}", prefix);
    if tree.attribute(root, &attr).is_none() {
        tree.set_attribute(root, &attr, uri);
    }
}
