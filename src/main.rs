//! # Ius Civile CLI (`ius`)
//!
//! Build the local index of reference documents, ask questions, generate
//! quizzes, and serve the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! ius --config ./config/ius.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ius ingest <paths...>` | Extract, chunk, embed and index documents |
//! | `ius ask "<query>"` | Answer one question with citations |
//! | `ius quiz "<topic>"` | Generate multiple-choice questions (JSON) |
//! | `ius status` | Show what is indexed and which backends are configured |
//! | `ius serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Index the civil code and a folder of notes
//! ius ingest ./docs/codice_civile.pdf ./docs/note/
//!
//! # Ask as a notary, forcing web augmentation
//! ius ask "forma della donazione" --profile notaio --web
//!
//! # Five hard questions on contracts
//! ius quiz contratti --difficulty difficile --num 5
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ius_civile::config::{self, Capabilities};
use ius_civile::service::{ChatRequest, QuizRequest, RagService};
use ius_civile::{ingest, server, status};
use ius_civile_core::prompt::Profile;

/// Ius Civile: a retrieval-augmented assistant for Italian civil law.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Backend credentials are read from the environment
/// (`OPENAI_API_KEY`, `GOOGLE_API_KEY`, `GOOGLE_CX`); without them every
/// command runs in offline mode.
#[derive(Parser)]
#[command(
    name = "ius",
    about = "Ius Civile — retrieval-augmented answers and quizzes on Italian civil law",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/ius.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from documents.
    ///
    /// Accepts PDF, `.txt` and `.md` files, or directories (walked
    /// recursively). Replaces any previous index.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a single question.
    Ask {
        query: String,

        /// Audience: praticanteAvvocato, avvocato, praticanteNotaio, notaio.
        /// Anything else gets a didactic answer.
        #[arg(long, default_value = "praticanteAvvocato")]
        profile: String,

        /// Always search the web. Without it, only case-law queries do.
        #[arg(long)]
        web: bool,

        /// Omit links from web citations.
        #[arg(long)]
        no_links: bool,

        /// Number of local passages to retrieve.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Generate quiz items and print them as JSON.
    Quiz {
        topic: String,

        /// facile, medio or difficile.
        #[arg(long, default_value = "medio")]
        difficulty: String,

        #[arg(long, default_value_t = 5)]
        num: usize,
    },

    /// Show index and backend status.
    Status,

    /// Start the HTTP server.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    let caps = Capabilities::from_env();

    match cli.command {
        Commands::Ingest { paths, dry_run } => {
            ingest::run_ingest(&cfg, &caps, &paths, dry_run).await?;
        }
        Commands::Ask {
            query,
            profile,
            web,
            no_links,
            top_k,
        } => {
            let service = RagService::from_config(cfg, &caps)?;
            let resp = service
                .chat(ChatRequest {
                    profile: Profile::parse(&profile),
                    show_links: !no_links,
                    force_web_for_cases: web,
                    top_k,
                    ..ChatRequest::new(query)
                })
                .await?;

            println!("{}", resp.answer);
            if !resp.citations.is_empty() {
                println!();
                println!("Citations:");
                for citation in &resp.citations {
                    println!("  - {}", citation);
                }
            }
        }
        Commands::Quiz {
            topic,
            difficulty,
            num,
        } => {
            let service = RagService::from_config(cfg, &caps)?;
            let resp = service
                .quiz(QuizRequest {
                    topic,
                    difficulty,
                    num,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&resp.items)?);
        }
        Commands::Status => {
            status::run_status(&cfg, &caps)?;
        }
        Commands::Serve => {
            server::run_server(&cfg, &caps).await?;
        }
    }

    Ok(())
}
