/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Content-control templating for WordprocessingML packages.
//!
//! A template is a `.docx`/`.dotx` package whose content controls carry tags
//! of the form `name:instance`. [`Generator`] walks the template, hands each
//! control whose name is in the [`Registry`] to the handler for its
//! [`PlaceholderKind`], and fills it from a [`DataContext`]. Container
//! controls are archived inside the document itself so that generating
//! against the output again (a refresh) starts from the pristine shape.
//!
//! [`Composer`] merges generated documents into one, flattening their
//! controls into plain content.
//!
//! # Example
//!
//! ```rust,no_run
//! use docweave_core::{
//!     DataContext, GenerationRequest, Generator, PlaceholderKind, PlaceholderSpec, Registry,
//! };
//!
//! # fn main() -> docweave_core::Result<()> {
//! let mut registry = Registry::new();
//! registry.insert(
//!     PlaceholderSpec::new("Name", PlaceholderKind::NonRecursive)
//!         .with_paths(None, Some("./Name[1]"))?,
//! );
//! let template = std::fs::read("order.dotx")?;
//! let data = DataContext::parse("<Order><Name>Test Order</Name></Order>")?;
//! let request = GenerationRequest::new(template, data).with_registry(registry);
//! let document = Generator::default().generate(&request)?;
//! # let _ = document;
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod data;
pub mod error;
pub mod generator;
pub mod ids;
pub mod package;
pub mod protection;
pub mod registry;
pub mod request;
pub mod store;
pub mod tag;
pub mod wordml;

pub use compose::{Composer, flatten};
pub use data::DataContext;
pub use error::{Error, Result};
pub use generator::{Generator, Handler, HandlerTable, Region, Walk};
pub use ids::ensure_unique_ids;
pub use package::Package;
pub use protection::{EditRestriction, Protection};
pub use registry::{Lookup, PathTemplate, PlaceholderKind, PlaceholderSpec, Registry};
pub use request::{DocumentMetadata, EngineConfig, GenerationRequest};
pub use store::{AuxStore, DATA_ROOT_PATH, DEFAULT_STORE_NAMESPACE};
