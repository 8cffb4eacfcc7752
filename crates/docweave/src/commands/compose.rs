/*
 * compose.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compose command implementation
 */

//! `docweave compose`: merge generated documents into one report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::info;

use docweave_core::{Composer, EditRestriction, EngineConfig, Protection};

/// Arguments for the compose command
#[derive(Debug)]
pub struct ComposeArgs {
    pub primary: PathBuf,
    pub secondaries: Vec<PathBuf>,
    pub output: PathBuf,
    pub protect: bool,
    pub edit: EditRestriction,
    pub password: Option<SecretString>,
    pub namespace: Option<String>,
}

/// Execute the compose command
pub fn execute(args: ComposeArgs) -> Result<()> {
    let protection = if args.protect {
        let password = args.password.ok_or_else(|| {
            anyhow::anyhow!("--protect needs a password (--password or DOCWEAVE_PROTECT_PASSWORD)")
        })?;
        Some(Protection::new(args.edit, password))
    } else {
        None
    };

    let read = |path: &PathBuf| {
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
    };
    let primary = read(&args.primary)?;
    let secondaries = args
        .secondaries
        .iter()
        .map(read)
        .collect::<Result<Vec<_>>>()?;

    let mut config = EngineConfig::default();
    if let Some(namespace) = args.namespace {
        config.store_namespace = namespace;
    }
    let document = Composer::new(config)
        .compose(&primary, &secondaries, protection.as_ref())
        .context("Failed to compose documents")?;

    std::fs::write(&args.output, &document)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(
        "Wrote {} ({} appended document(s){})",
        args.output.display(),
        secondaries.len(),
        if protection.is_some() { ", protected" } else { "" }
    );
    Ok(())
}
