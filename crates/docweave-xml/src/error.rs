//! Error types for XML parsing, serialization and path evaluation.

use thiserror::Error;

/// Result type alias for docweave-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, writing or querying an [`XmlTree`](crate::XmlTree).
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// XML syntax error from quick-xml.
    #[error("XML syntax error: {message}{}", at_byte(.position))]
    XmlSyntax {
        message: String,
        /// Byte offset where the error occurred.
        position: Option<u64>,
    },

    /// Input ended while elements were still open.
    #[error("Unexpected end of input, expected closing tag </{expected}>")]
    UnexpectedEof { expected: String },

    /// Mismatched end tag.
    #[error("Mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedEndTag { expected: String, found: String },

    /// Empty document (no root element).
    #[error("Empty XML document: no root element found")]
    EmptyDocument,

    /// Multiple root elements.
    #[error("Invalid XML: multiple root elements")]
    MultipleRoots,

    /// Input bytes are not valid UTF-8.
    #[error("XML input is not valid UTF-8: {0}")]
    Encoding(String),

    /// Failure while writing XML.
    #[error("Failed to write XML: {0}")]
    Write(String),

    /// A location path could not be compiled.
    #[error("Invalid location path '{path}': {message}")]
    InvalidPath { path: String, message: String },
}

fn at_byte(position: &Option<u64>) -> String {
    position.map(|p| format!(" at byte {}", p)).unwrap_or_default()
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlSyntax {
            message: err.to_string(),
            position: None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlSyntax {
            message: format!("Attribute error: {}", err),
            position: None,
        }
    }
}
