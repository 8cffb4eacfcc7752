//! docweave CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use docweave_core::EditRestriction;
use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "docweave")]
#[command(version)]
#[command(about = "Fill, refresh and compose Word documents", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a template, or refresh a previously generated document
    Generate {
        /// Template (.dotx/.docx) or previously generated document
        #[arg(short, long)]
        template: PathBuf,

        /// XML data file
        #[arg(short, long)]
        data: PathBuf,

        /// TOML job file with placeholders and generation settings
        #[arg(short, long)]
        job: Option<PathBuf>,

        /// Write the document to FILE
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Merge generated documents into one
    Compose {
        /// Document whose body comes first
        primary: PathBuf,

        /// Documents appended after the primary, in order
        secondaries: Vec<PathBuf>,

        /// Write the document to FILE
        #[arg(short, long)]
        output: PathBuf,

        /// Restrict editing of the result
        #[arg(long)]
        protect: bool,

        /// Editing still allowed when protected
        #[arg(long, value_enum, default_value_t = EditArg::ReadOnly)]
        edit: EditArg,

        /// Password that lifts the protection
        #[arg(long, env = "DOCWEAVE_PROTECT_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Namespace of the document store to resolve bindings against
        #[arg(long)]
        namespace: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EditArg {
    ReadOnly,
    Forms,
    Comments,
    TrackedChanges,
}

impl From<EditArg> for EditRestriction {
    fn from(arg: EditArg) -> Self {
        match arg {
            EditArg::ReadOnly => EditRestriction::ReadOnly,
            EditArg::Forms => EditRestriction::Forms,
            EditArg::Comments => EditRestriction::Comments,
            EditArg::TrackedChanges => EditRestriction::TrackedChanges,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "docweave=debug" } else { "docweave=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            template,
            data,
            job,
            output,
        } => commands::generate::execute(commands::generate::GenerateArgs {
            template,
            data,
            job,
            output,
        }),
        Commands::Compose {
            primary,
            secondaries,
            output,
            protect,
            edit,
            password,
            namespace,
        } => commands::compose::execute(commands::compose::ComposeArgs {
            primary,
            secondaries,
            output,
            protect,
            edit: edit.into(),
            password: password.map(SecretString::new),
            namespace,
        }),
    }
}
