//! XML parser that builds [`XmlTree`]s.

use crate::tree::{Attribute, Element, NodeId, NodeKind, QName, XmlDeclaration, XmlTree};
use crate::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesStart, Event};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Parse XML from a string.
///
/// Whitespace-only text between elements is dropped unless the enclosing
/// element carries `xml:space="preserve"`.
///
/// # Example
///
/// ```rust
/// use docweave_xml::parse;
///
/// let tree = parse("<root><child/></root>").unwrap();
/// assert!(tree.is(tree.root(), "root"));
/// assert_eq!(tree.child_elements(tree.root()).count(), 1);
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn parse(content: &str) -> Result<XmlTree> {
    XmlParser::new(content).parse()
}

/// Parse XML from raw part bytes, tolerating a UTF-8 byte order mark.
pub fn parse_bytes(bytes: &[u8]) -> Result<XmlTree> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let content = std::str::from_utf8(bytes).map_err(|e| Error::Encoding(e.to_string()))?;
    parse(content)
}

impl XmlTree {
    /// Parse `markup` and return a detached copy of its root inside this tree.
    ///
    /// Namespace declarations on the fragment root that repeat a declaration
    /// already in scope at `scope` are dropped, so fragments produced by
    /// [`fragment_xml`](crate::fragment_xml) round-trip without piling up
    /// redundant `xmlns` attributes.
    pub fn import_fragment(&mut self, markup: &str, scope: NodeId) -> Result<NodeId> {
        let fragment = parse(markup)?;
        let copy = self.import(&fragment, fragment.root());
        let in_scope = self.namespace_scope(scope);
        if let Some(element) = self.element_mut(copy) {
            element.attributes.retain(|attr| {
                if !attr.name.is_namespace_declaration() {
                    return true;
                }
                let prefix = attr.name.declared_prefix().map(str::to_string);
                !in_scope
                    .iter()
                    .any(|(p, uri)| *p == prefix && *uri == attr.value)
            });
        }
        Ok(copy)
    }
}

/// Internal parser state.
struct XmlParser<'a> {
    reader: Reader<&'a [u8]>,

    /// Tree under construction; created when the root start tag is seen.
    tree: Option<XmlTree>,

    /// Stack of open elements.
    stack: Vec<NodeId>,

    /// Parallel to `stack`: whether whitespace is significant inside.
    preserve: Vec<bool>,

    declaration: Option<XmlDeclaration>,

    root_closed: bool,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            reader,
            tree: None,
            stack: Vec::new(),
            preserve: Vec::new(),
            declaration: None,
            root_closed: false,
        }
    }

    fn parse(mut self) -> Result<XmlTree> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = self.open_element(&e)?;
                    let preserve = self
                        .tree
                        .as_ref()
                        .and_then(|t| t.attribute(id, "xml:space"))
                        .map_or_else(
                            || self.preserve.last().copied().unwrap_or(false),
                            |v| v == "preserve",
                        );
                    self.stack.push(id);
                    self.preserve.push(preserve);
                }
                Ok(Event::End(e)) => {
                    let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let id = self.stack.pop().ok_or_else(|| Error::XmlSyntax {
                        message: format!("Unexpected closing tag </{}>", end_name),
                        position: Some(self.reader.buffer_position()),
                    })?;
                    self.preserve.pop();
                    let open_name = self.tree_ref()?.name(id).map(|n| n.to_string());
                    if open_name.as_deref() != Some(end_name.as_str()) {
                        return Err(Error::MismatchedEndTag {
                            expected: open_name.unwrap_or_default(),
                            found: end_name,
                        });
                    }
                    if self.stack.is_empty() {
                        self.root_closed = true;
                    }
                }
                Ok(Event::Empty(e)) => {
                    self.open_element(&e)?;
                    if self.stack.is_empty() {
                        self.root_closed = true;
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| Error::XmlSyntax {
                        message: format!("Invalid text content: {}", err),
                        position: Some(self.reader.buffer_position()),
                    })?;
                    self.push_text(text.into_owned());
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).to_string();
                    self.push_text(text);
                }
                Ok(Event::Decl(e)) => {
                    self.declaration = Some(read_declaration(&e)?);
                }
                Ok(Event::Comment(_) | Event::PI(_)) => {
                    // Comments and processing instructions are not preserved
                }
                Ok(Event::DocType(_)) => {
                    // Skip DOCTYPE declarations
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        if let Some(open) = self.stack.last() {
            let expected = self
                .tree_ref()?
                .name(*open)
                .map(|n| n.to_string())
                .unwrap_or_default();
            return Err(Error::UnexpectedEof { expected });
        }

        let mut tree = self.tree.ok_or(Error::EmptyDocument)?;
        tree.set_declaration(self.declaration);
        Ok(tree)
    }

    fn tree_ref(&self) -> Result<&XmlTree> {
        self.tree.as_ref().ok_or(Error::EmptyDocument)
    }

    fn open_element(&mut self, e: &BytesStart<'_>) -> Result<NodeId> {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let mut element = Element::new(&name);
        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value().map_err(|err| Error::XmlSyntax {
                message: format!("Invalid attribute value: {}", err),
                position: Some(self.reader.buffer_position()),
            })?;
            element.attributes.push(Attribute {
                name: QName::new(&key),
                value: value.into_owned(),
            });
        }

        match (&mut self.tree, self.stack.last()) {
            (None, _) => {
                let tree = XmlTree::with_root(element);
                let root = tree.root();
                self.tree = Some(tree);
                Ok(root)
            }
            (Some(tree), Some(parent)) => {
                let parent = *parent;
                let id = tree.create_element(&name);
                if let Some(slot) = tree.element_mut(id) {
                    *slot = element;
                }
                tree.append_child(parent, id);
                Ok(id)
            }
            (Some(_), None) => {
                if self.root_closed {
                    Err(Error::MultipleRoots)
                } else {
                    Err(Error::XmlSyntax {
                        message: format!("Element <{}> outside of the root element", name),
                        position: Some(self.reader.buffer_position()),
                    })
                }
            }
        }
    }

    fn push_text(&mut self, text: String) {
        let Some(parent) = self.stack.last().copied() else {
            // Text outside the root element carries no content
            return;
        };
        let preserve = self.preserve.last().copied().unwrap_or(false);
        if text.trim().is_empty() && !preserve {
            return;
        }
        if let Some(tree) = self.tree.as_mut() {
            // Adjacent text and CDATA events collapse into one node
            if let Some(last) = tree.children(parent).last().copied() {
                if let NodeKind::Text(existing) = tree.kind(last) {
                    let merged = format!("{}{}", existing, text);
                    tree.set_text(last, merged);
                    return;
                }
            }
            let id = tree.create_text(text);
            tree.append_child(parent, id);
        }
    }
}

fn read_declaration(e: &BytesDecl<'_>) -> Result<XmlDeclaration> {
    let version = String::from_utf8_lossy(&e.version()?).to_string();
    let encoding = match e.encoding() {
        Some(value) => Some(String::from_utf8_lossy(&value?).to_string()),
        None => None,
    };
    let standalone = match e.standalone() {
        Some(value) => Some(String::from_utf8_lossy(&value?).to_string()),
        None => None,
    };
    Ok(XmlDeclaration {
        version,
        encoding,
        standalone,
    })
}
