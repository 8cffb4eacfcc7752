//! Mutable XML trees for WordprocessingML surgery.
//!
//! This crate wraps [`quick-xml`] to provide an arena-backed [`XmlTree`]
//! where nodes are addressed by [`NodeId`]. Unlike a read-only document
//! model, the tree supports the edits a document generator needs: cloning a
//! subtree next to itself, moving nodes, replacing a node with a fragment
//! parsed from a string, and copying subtrees between documents.
//!
//! # Overview
//!
//! - [`parse`] / [`parse_bytes`]: build a tree from markup
//! - [`to_string`] / [`to_bytes`]: serialize a tree, declaration included
//! - [`fragment_xml`]: serialize a subtree so it parses on its own
//! - [`LocationPath`]: evaluate simple location paths (`./Name[1]`, `../@id`)
//!
//! # Example
//!
//! ```rust
//! use docweave_xml::{parse, to_string, LocationPath};
//!
//! let mut tree = parse(r#"<order><line>a</line></order>"#).unwrap();
//! let root = tree.root();
//! let line = tree.first_child(root, "line").unwrap();
//! let copy = tree.deep_clone(line);
//! tree.insert_after(line, copy);
//! tree.set_text_content(copy, "b");
//!
//! let second = LocationPath::compile("line[2]").unwrap();
//! assert_eq!(second.string_value(&tree, root).as_deref(), Some("b"));
//! assert_eq!(to_string(&tree).unwrap(), "<order><line>a</line><line>b</line></order>");
//! ```

pub mod error;
pub mod parser;
pub mod path;
pub mod tree;
pub mod writer;

pub use error::{Error, Result};
pub use parser::{parse, parse_bytes};
pub use path::LocationPath;
pub use tree::{Ancestors, Attribute, Element, NodeId, NodeKind, QName, XmlDeclaration, XmlTree};
pub use writer::{fragment_xml, outer_xml, to_bytes, to_string};
