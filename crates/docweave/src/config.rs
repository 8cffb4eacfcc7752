/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Job file parsing
 */

//! TOML job files.
//!
//! ```toml
//! [document]
//! type = "Order"
//! version = "1.0"
//!
//! [generation]
//! data-binding = false
//! registry = "static"
//!
//! [[placeholder]]
//! name = "OrderItems"
//! kind = "recursive"
//! tag = "./Id[1]"
//! value = "./items[1]"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use docweave_core::{DocumentMetadata, EngineConfig, PlaceholderKind, PlaceholderSpec, Registry};
use serde::Deserialize;

/// A parsed job file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct JobConfig {
    #[serde(default)]
    pub document: Option<DocumentMetadata>,

    #[serde(default)]
    pub generation: GenerationSection,

    #[serde(default, rename = "placeholder")]
    pub placeholders: Vec<PlaceholderEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GenerationSection {
    #[serde(default)]
    pub data_binding: bool,

    #[serde(default)]
    pub registry: RegistrySource,

    /// Document store namespace; the engine default when absent.
    pub namespace: Option<String>,
}

/// Where placeholder metadata comes from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrySource {
    /// `[[placeholder]]` entries in the job file.
    #[default]
    Static,
    /// `contentControl` declarations in the data file.
    Introspect,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceholderEntry {
    pub name: String,
    pub kind: PlaceholderKind,
    pub tag: Option<String>,
    pub value: Option<String>,
}

impl JobConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid job file {}", path.display()))
    }

    /// The settings used without a job file: registry from the data,
    /// no data binding.
    pub fn introspecting() -> Self {
        Self {
            generation: GenerationSection {
                registry: RegistrySource::Introspect,
                ..GenerationSection::default()
            },
            ..Self::default()
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The registry to pass to the generator; `None` asks it to introspect
    /// the data.
    pub fn registry(&self) -> Result<Option<Registry>> {
        if self.generation.registry == RegistrySource::Introspect {
            return Ok(None);
        }
        if self.placeholders.is_empty() {
            anyhow::bail!("registry = \"static\" needs at least one [[placeholder]] entry");
        }
        let mut registry = Registry::new();
        for entry in &self.placeholders {
            let spec = PlaceholderSpec::new(entry.name.as_str(), entry.kind);
            let spec = if entry.tag.is_some() || entry.value.is_some() {
                spec.with_paths(entry.tag.as_deref(), entry.value.as_deref())?
            } else {
                spec
            };
            if registry.insert(spec).is_some() {
                anyhow::bail!("placeholder '{}' is declared more than once", entry.name);
            }
        }
        Ok(Some(registry))
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(namespace) = &self.generation.namespace {
            config.store_namespace = namespace.clone();
        }
        config
    }
}
