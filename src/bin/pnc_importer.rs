//! PNC importer CLI
//!
//! Generates downstream build configuration for a project PNC has built before.
//!
//! # Usage
//!
//! ```bash
//! # Patch a config checkout for the newest quarkus-core builds
//! pnc_importer import -p ~/src/quarkus-components quarkus-core
//!
//! # Against a specific PNC instance
//! PNC_URL=https://pnc.example.com/pnc-rest/v2 pnc_importer import -p . smallrye-config
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use pnc_client::HttpClient;
use pnc_importer::{ConsolePrompt, GitCli, ImportError, Importer, ImporterConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pnc_importer")]
#[command(version)]
#[command(about = "Bootstrap downstream build configuration from existing PNC builds")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// PNC REST base URL (overrides PNC_URL)
    #[arg(long, global = true)]
    pnc_url: Option<String>,

    /// Artifact search page size (overrides PNC_PAGE_SIZE)
    #[arg(long, global = true)]
    page_size: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for an artifact and add its sources to a config checkout
    Import {
        /// Path to the config checkout holding upstream_sources.yml and build-config.yaml
        #[arg(short = 'p', long = "path")]
        path: PathBuf,

        /// Artifact identifier to search for
        artifact: String,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // stderr keeps log lines out of the interactive prompts on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import { path, artifact } => {
            cmd_import(cli.pnc_url, cli.page_size, path, &artifact).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn cmd_import(
    pnc_url: Option<String>,
    page_size: Option<u32>,
    path: PathBuf,
    artifact: &str,
) -> Result<(), ImportError> {
    let mut config = ImporterConfig::from_env()?;
    if let Some(url) = pnc_url {
        config = config.with_pnc_url(url);
    }
    if let Some(size) = page_size {
        config = config.with_page_size(size);
    }
    config.validate()?;

    if !path.is_dir() {
        return Err(ImportError::Config(format!(
            "{} is not a directory",
            path.display()
        )));
    }

    let client = HttpClient::with_timeout(&config.pnc_url, config.http_timeout)?;
    let git = GitCli::new();
    let mut prompt = ConsolePrompt::stdio();

    let outcome = Importer::new(&client, &git, &config)
        .run(&mut prompt, artifact, &path)
        .await?;

    println!(
        "{} {} -> {} @ {} ({})",
        "Imported".green(),
        outcome.artifact,
        outcome.reference.tag,
        outcome.reference.branch,
        outcome.reference.commit
    );
    println!("  version pin: {}", outcome.versioned_name.bold());
    Ok(())
}
