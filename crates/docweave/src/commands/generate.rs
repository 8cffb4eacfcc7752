/*
 * generate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Generate command implementation
 */

//! `docweave generate`: fill a template from an XML data file.
//!
//! Refreshing is the same command pointed at a document produced earlier:
//! container placeholders are restored from the archive stored inside it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use docweave_core::{DataContext, GenerationRequest, Generator};

use crate::config::JobConfig;

/// Arguments for the generate command
#[derive(Debug)]
pub struct GenerateArgs {
    pub template: PathBuf,
    pub data: PathBuf,
    pub job: Option<PathBuf>,
    pub output: PathBuf,
}

/// Execute the generate command
pub fn execute(args: GenerateArgs) -> Result<()> {
    let job = match &args.job {
        Some(path) => JobConfig::load(path)?,
        None => {
            debug!("No job file given; introspecting the data file");
            JobConfig::introspecting()
        }
    };

    let template = std::fs::read(&args.template)
        .with_context(|| format!("Failed to read template {}", args.template.display()))?;
    let data = std::fs::read_to_string(&args.data)
        .with_context(|| format!("Failed to read data file {}", args.data.display()))?;
    let data = DataContext::parse(&data)
        .with_context(|| format!("Invalid data file {}", args.data.display()))?;

    let mut request = GenerationRequest::new(template, data)
        .with_data_binding(job.generation.data_binding);
    if let Some(registry) = job.registry()? {
        request = request.with_registry(registry);
    }
    if let Some(metadata) = &job.document {
        request = request.with_metadata(metadata.clone());
    }

    let generator = Generator::new(job.engine_config());
    let document = generator
        .generate(&request)
        .with_context(|| format!("Failed to generate from {}", args.template.display()))?;

    std::fs::write(&args.output, &document)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("Wrote {}", args.output.display());
    Ok(())
}
