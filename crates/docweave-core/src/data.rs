/*
 * data.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The caller-supplied data a template is filled from.

use crate::error::{Error, Result};
use docweave_xml::{NodeId, XmlTree};

/// An XML data context. The engine only reads it.
#[derive(Debug, Clone)]
pub struct DataContext {
    tree: XmlTree,
}

impl DataContext {
    /// Parse a data context from markup.
    pub fn parse(xml: &str) -> Result<Self> {
        let tree = docweave_xml::parse(xml).map_err(|e| Error::xml("data context", e))?;
        Ok(Self { tree })
    }

    pub fn from_tree(tree: XmlTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    /// The root data node; walks start here.
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// The root element serialized with its namespace declarations, as stored
    /// in the document's data snapshot.
    pub fn to_fragment(&self) -> Result<String> {
        docweave_xml::fragment_xml(&self.tree, self.tree.root())
            .map_err(|e| Error::xml("data context", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_omits_declaration() {
        let data = DataContext::parse(r#"<?xml version="1.0"?><Order><Name>Test Order</Name></Order>"#)
            .unwrap();
        assert_eq!(data.to_fragment().unwrap(), "<Order><Name>Test Order</Name></Order>");
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = DataContext::parse("<Order>").unwrap_err();
        assert!(err.to_string().contains("data context"));
    }
}
