//! # pdf-chat CLI (`pdfchat`)
//!
//! The `pdfchat` binary ingests PDF documents and chats about them, either
//! interactively or one question at a time.
//!
//! ## Usage
//!
//! ```bash
//! pdfchat --config ./config/pdfchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfchat init` | Create the SQLite database and schema |
//! | `pdfchat ingest <paths...>` | Ingest PDF files or directories |
//! | `pdfchat chat` | Interactive chat session |
//! | `pdfchat ask "<question>"` | Ask a single question |
//! | `pdfchat retrieve "<query>"` | Show the chunks a query retrieves |
//! | `pdfchat transcribe <audio>` | Print the transcript of an audio file |
//! | `pdfchat sessions` | List saved chat sessions |
//! | `pdfchat stats` | Show store statistics |
//!
//! ## Examples
//!
//! ```bash
//! # Ingest a folder of manuals
//! pdfchat ingest ./manuals --config ./config/pdfchat.toml
//!
//! # Ask about them
//! pdfchat ask "What is the warranty period?" --pdf
//!
//! # Continue a saved session
//! pdfchat chat --session 2024-05-01_14-03-22
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use pdf_chat::progress::ProgressMode;
use pdf_chat::{chat, config, ingest, logging, migrate, retrieve, stats, transcribe};

/// pdf-chat CLI: chat with a local language model about your PDF documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pdfchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pdfchat",
    about = "pdf-chat: chat with a local language model about your PDF documents",
    version,
    long_about = "pdf-chat ingests PDF documents into a local vector store, skipping documents \
    it has already seen, and answers questions about them with a local language model. \
    Without documents it works as a plain chat assistant."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/pdfchat.toml`.
    #[arg(long, global = true, default_value = "./config/pdfchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the record table. This command
    /// is idempotent: running it multiple times is safe.
    Init,

    /// Ingest PDF documents.
    ///
    /// Each document is fingerprinted; documents already ingested are
    /// skipped. Directories are searched recursively for `*.pdf` files.
    Ingest {
        /// PDF files or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Progress output on stderr. Defaults to `human` when stderr is a
        /// terminal, otherwise `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressArg>,
    },

    /// Start an interactive chat session.
    ///
    /// Reads messages and `/` commands from stdin. Type `/help` for the
    /// list of commands.
    Chat {
        /// Continue a saved session instead of starting a new one.
        #[arg(long)]
        session: Option<String>,

        /// Start in PDF chat mode.
        #[arg(long)]
        pdf: bool,
    },

    /// Ask a single question and print the reply.
    ///
    /// The exchange is saved like any chat session.
    Ask {
        question: String,

        /// Append to a saved session instead of starting a new one.
        #[arg(long)]
        session: Option<String>,

        /// Answer from ingested documents.
        #[arg(long)]
        pdf: bool,
    },

    /// Show the stored chunks most relevant to a query.
    Retrieve {
        query: String,

        /// Number of chunks to show (default: `retrieval.debug_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Transcribe an audio file and print the text.
    Transcribe {
        /// Audio file (wav, mp3, m4a, ...).
        audio: PathBuf,
    },

    /// List saved chat sessions.
    Sessions,

    /// Show store statistics.
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgressArg {
    Human,
    Json,
    Off,
}

impl From<ProgressArg> for ProgressMode {
    fn from(arg: ProgressArg) -> Self {
        match arg {
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
            ProgressArg::Off => ProgressMode::Off,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { paths, progress } => {
            let mode = progress
                .map(ProgressMode::from)
                .unwrap_or_else(ProgressMode::default_for_tty);
            ingest::run_ingest(&cfg, &paths, mode).await?;
        }
        Commands::Chat { session, pdf } => {
            chat::run_chat(&cfg, session.as_deref(), pdf).await?;
        }
        Commands::Ask {
            question,
            session,
            pdf,
        } => {
            chat::run_ask(&cfg, &question, session.as_deref(), pdf).await?;
        }
        Commands::Retrieve { query, k } => {
            retrieve::run_retrieve(&cfg, &query, k).await?;
        }
        Commands::Transcribe { audio } => {
            transcribe::run_transcribe(&cfg, &audio).await?;
        }
        Commands::Sessions => {
            chat::run_sessions(&cfg)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
