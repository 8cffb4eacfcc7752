//! Serialization of [`XmlTree`]s back to markup.

use crate::tree::{NodeId, NodeKind, XmlTree};
use crate::{Error, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Serialize a whole tree, including its XML declaration if it has one.
pub fn to_string(tree: &XmlTree) -> Result<String> {
    let bytes = to_bytes(tree)?;
    String::from_utf8(bytes).map_err(|e| Error::Encoding(e.to_string()))
}

/// Serialize a whole tree to UTF-8 bytes.
pub fn to_bytes(tree: &XmlTree) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    if let Some(decl) = tree.declaration() {
        writer
            .write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))
            .map_err(|e| Error::Write(e.to_string()))?;
    }
    write_node(&mut writer, tree, tree.root(), &[])?;
    Ok(writer.into_inner())
}

/// Serialize the subtree at `id` exactly as it stands.
pub fn outer_xml(tree: &XmlTree, id: NodeId) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, tree, id, &[])?;
    String::from_utf8(writer.into_inner()).map_err(|e| Error::Encoding(e.to_string()))
}

/// Serialize the subtree at `id` as a standalone fragment.
///
/// Namespace declarations inherited from ancestors are copied onto the
/// fragment root for every prefix the subtree actually uses, so the result
/// parses on its own.
pub fn fragment_xml(tree: &XmlTree, id: NodeId) -> Result<String> {
    let Some(root) = tree.element(id) else {
        return outer_xml(tree, id);
    };

    let scope = tree.namespace_scope(id);
    let used = used_prefixes(tree, id);
    let mut extra: Vec<(String, String)> = Vec::new();
    for (prefix, uri) in scope {
        if !used.contains(&prefix) {
            continue;
        }
        let attr_name = match &prefix {
            Some(p) => format!("xmlns:{}", p),
            None => "xmlns".to_string(),
        };
        if root.attribute(&attr_name).is_none() {
            extra.push((attr_name, uri));
        }
    }

    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, tree, id, &extra)?;
    String::from_utf8(writer.into_inner()).map_err(|e| Error::Encoding(e.to_string()))
}

/// Prefixes referenced by element and attribute names in the subtree.
fn used_prefixes(tree: &XmlTree, id: NodeId) -> Vec<Option<String>> {
    let mut used: Vec<Option<String>> = Vec::new();
    let mut note = |prefix: Option<String>| {
        if !used.contains(&prefix) {
            used.push(prefix);
        }
    };
    for node in std::iter::once(id).chain(tree.descendants(id)) {
        let Some(element) = tree.element(node) else {
            continue;
        };
        note(element.name.prefix.clone());
        for attr in &element.attributes {
            if attr.name.is_namespace_declaration() {
                continue;
            }
            if let Some(prefix) = &attr.name.prefix {
                if prefix != "xml" {
                    note(Some(prefix.clone()));
                }
            }
        }
    }
    used
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    tree: &XmlTree,
    id: NodeId,
    extra_attributes: &[(String, String)],
) -> Result<()> {
    match tree.kind(id) {
        NodeKind::Text(text) => writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| Error::Write(e.to_string())),
        NodeKind::Element(element) => {
            let name = element.name.to_string();
            let mut start = BytesStart::new(name.as_str());
            for (key, value) in extra_attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            for attr in &element.attributes {
                let key = attr.name.to_string();
                start.push_attribute((key.as_str(), attr.value.as_str()));
            }

            let children = tree.children(id);
            if children.is_empty() {
                return writer
                    .write_event(Event::Empty(start))
                    .map_err(|e| Error::Write(e.to_string()));
            }

            writer
                .write_event(Event::Start(start))
                .map_err(|e| Error::Write(e.to_string()))?;
            for child in children {
                write_node(writer, tree, *child, &[])?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name.as_str())))
                .map_err(|e| Error::Write(e.to_string()))
        }
    }
}
