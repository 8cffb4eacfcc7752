/*
 * request.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Inputs to a generation call.

use crate::data::DataContext;
use crate::generator::HandlerTable;
use crate::registry::Registry;
use crate::store::DEFAULT_STORE_NAMESPACE;
use serde::{Deserialize, Serialize};

/// Caller metadata recorded in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DocumentMetadata {
    #[serde(rename = "type")]
    pub document_type: String,
    pub version: String,
}

/// Engine-wide settings shared by generation and composition.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Namespace of the document store's root element.
    pub store_namespace: String,
    pub handlers: HandlerTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_namespace: DEFAULT_STORE_NAMESPACE.to_string(),
            handlers: HandlerTable::default(),
        }
    }
}

/// One templating invocation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub metadata: Option<DocumentMetadata>,

    /// A `.docx`/`.dotx` package, or a document generated earlier when
    /// refreshing.
    pub template: Vec<u8>,

    pub data: DataContext,

    /// `None` asks the generator to introspect the data context.
    pub registry: Option<Registry>,

    /// Attach data bindings into the stored snapshot instead of writing
    /// plain text only.
    pub use_data_binding: bool,
}

impl GenerationRequest {
    pub fn new(template: Vec<u8>, data: DataContext) -> Self {
        Self {
            metadata: None,
            template,
            data,
            registry: None,
            use_data_binding: false,
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_data_binding(mut self, enabled: bool) -> Self {
        self.use_data_binding = enabled;
        self
    }
}
