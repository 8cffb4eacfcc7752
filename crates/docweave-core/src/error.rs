/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for generation and composition.

use thiserror::Error;

/// Errors that can occur while generating or composing documents.
#[derive(Debug, Error)]
pub enum Error {
    /// A required input is missing or empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A part could not be parsed or serialized.
    #[error("XML error in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: docweave_xml::Error,
    },

    /// The package archive could not be read or written.
    #[error("Package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The package lacks a part the operation needs.
    #[error("Package has no {0}")]
    MissingPart(String),

    /// A lookup expression on a placeholder does not compile.
    #[error("Invalid lookup for placeholder '{name}': {source}")]
    InvalidLookup {
        name: String,
        #[source]
        source: docweave_xml::Error,
    },

    /// The auxiliary store exists but cannot be trusted.
    #[error("Corrupt document store: {0}")]
    CorruptStore(String),

    /// A placeholder name cannot be used as an archive element name.
    #[error("Placeholder name '{0}' cannot be archived: not a valid XML name")]
    InvalidArchiveKey(String),
}

impl Error {
    /// Attach the part name to an XML error.
    pub fn xml(part: impl Into<String>, source: docweave_xml::Error) -> Self {
        Error::Xml {
            part: part.into(),
            source,
        }
    }
}

/// Result type for docweave-core operations.
pub type Result<T> = std::result::Result<T, Error>;
