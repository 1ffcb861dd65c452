//! CLI commands implementation: one subcommand per pipeline stage, plus
//! config/audit inspection and server control, grounded on the teacher's
//! `Cli`/`Commands`/`run()` idiom.

mod bootstrap;
mod commands;
mod progress;

use clap::{Parser, Subcommand};
use serde_json::Value;

use bootstrap::Context;

#[derive(Parser)]
#[command(name = "idp")]
#[command(about = "Event-driven document processing and retrieval pipeline")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup, before
/// `Cli::parse()` has a tracing subscriber to report through).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a raw upload's doc type (C4)
    Classify {
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },
    /// Split a multi-page PDF into per-page objects (C5)
    Split {
        #[arg(short, long, default_value = "0")]
        limit: usize,
        #[arg(short, long, default_value = "4")]
        workers: usize,
    },
    /// Classify PDF pages as text-bearing or scanned (C6)
    PageClassify {
        #[arg(short, long, default_value = "0")]
        limit: usize,
        #[arg(short, long, default_value = "4")]
        workers: usize,
        /// Force every page through OCR regardless of embedded text
        #[arg(long)]
        force_ocr: bool,
    },
    /// Extract embedded text from text-bearing PDFs and office documents (C8/C10)
    ExtractText {
        #[arg(short, long, default_value = "0")]
        limit: usize,
        #[arg(short, long, default_value = "4")]
        workers: usize,
    },
    /// Run OCR over scanned pages (C9)
    Ocr {
        #[arg(short, long, default_value = "0")]
        limit: usize,
        #[arg(short, long, default_value = "4")]
        workers: usize,
        #[arg(long, default_value = "300")]
        dpi: u32,
        /// easyocr, paddleocr, ocrmypdf, trocr, docling
        #[arg(long, default_value = "easyocr")]
        backend: String,
    },
    /// Combine per-page text/hOCR back into a single document (C11)
    Combine {
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Require hOCR output (scanned documents); otherwise plain text is accepted
        #[arg(long)]
        requires_hocr: bool,
    },
    /// Detect PII entities in a document (C12)
    DetectPii {
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },
    /// Redact detected PII from a document (C13)
    Redact {
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },
    /// Split text into chunks (C14)
    Chunk {
        text: String,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long, default_value = "1000")]
        size: usize,
        #[arg(long, default_value = "200")]
        overlap: usize,
    },
    /// Embed one or more texts (C15)
    Embed {
        texts: Vec<String>,
        #[arg(long)]
        doc_type: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Vector store operations (C16)
    Vector {
        #[command(subcommand)]
        command: VectorCommands,
    },
    /// Rerank a set of search matches (C18)
    Rerank {
        query: String,
        /// JSON array of `SearchResult` objects
        matches: String,
        #[arg(long, default_value = "10")]
        top_k: usize,
    },
    /// Drop vector collections past their ephemeral expiry
    ReapCollections,
    /// Prompt template storage and rendering (C22)
    Prompt {
        #[command(subcommand)]
        command: PromptCommands,
    },
    /// Classify and route a prompt to a model (C20)
    Route {
        /// JSON payload with a `prompt` field
        payload: String,
    },
    /// Invoke the routed model backend directly (C21)
    Invoke {
        /// JSON payload
        payload: String,
    },
    /// Inspect resolved configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Inspect per-document audit status (C3)
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
    /// Start the HTTP server
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

#[derive(Subcommand)]
enum VectorCommands {
    CreateCollection {
        collection: String,
        dim: usize,
        #[arg(long)]
        storage_mode: Option<String>,
    },
    DropCollection {
        collection: String,
        #[arg(long)]
        storage_mode: Option<String>,
    },
    /// JSON array of `VectorItem` objects
    Insert {
        collection: String,
        items: String,
        #[arg(long)]
        upsert: bool,
        #[arg(long)]
        storage_mode: Option<String>,
    },
    /// JSON array of f32 values
    Search {
        collection: String,
        embedding: String,
        #[arg(long, default_value = "10")]
        top_k: usize,
        #[arg(long)]
        storage_mode: Option<String>,
    },
    HybridSearch {
        collection: String,
        embedding: String,
        keywords: Vec<String>,
        #[arg(long, default_value = "10")]
        top_k: usize,
        #[arg(long)]
        storage_mode: Option<String>,
    },
}

#[derive(Subcommand)]
enum PromptCommands {
    /// Register a template
    Register { prompt_id: String, version: u32, template: String },
    /// Render a stored template and route the result (C20)
    Render {
        prompt_id: String,
        #[arg(long)]
        version: Option<u32>,
        /// JSON object of `{name: value}` substitutions
        #[arg(long, default_value = "{}")]
        variables: String,
        /// JSON object merged into the routed payload alongside `prompt`
        #[arg(long, default_value = "{}")]
        extra: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print resolved prefixes and ambient knobs
    Show,
}

#[derive(Subcommand)]
enum AuditCommands {
    /// Print a document's audit record
    Status { document_id: String },
}

/// Runs the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let context = Context::bootstrap().await?;

    match cli.command {
        Commands::Classify { limit } => commands::pipeline::classify(&context, limit).await,
        Commands::Split { limit, workers } => commands::pipeline::split(&context, limit, workers).await,
        Commands::PageClassify { limit, workers, force_ocr } => {
            commands::pipeline::page_classify(&context, limit, workers, force_ocr).await
        }
        Commands::ExtractText { limit, workers } => commands::pipeline::extract_text(&context, limit, workers).await,
        Commands::Ocr { limit, workers, dpi, backend } => commands::pipeline::ocr(&context, limit, workers, dpi, backend).await,
        Commands::Combine { limit, requires_hocr } => commands::pipeline::combine(&context, limit, requires_hocr).await,

        Commands::DetectPii { limit } => commands::pii::detect_pii(&context, limit).await,
        Commands::Redact { limit } => commands::pii::redact(&context, limit).await,

        Commands::Chunk { text, strategy, size, overlap } => commands::retrieval::chunk(&context, &text, strategy, size, overlap).await,
        Commands::Embed { texts, doc_type, model } => commands::retrieval::embed(&context, texts, doc_type, model).await,
        Commands::Vector { command } => match command {
            VectorCommands::CreateCollection { collection, dim, storage_mode } => {
                commands::retrieval::vector_create_collection(&context, &collection, dim, storage_mode).await
            }
            VectorCommands::DropCollection { collection, storage_mode } => {
                commands::retrieval::vector_drop_collection(&context, &collection, storage_mode).await
            }
            VectorCommands::Insert { collection, items, upsert, storage_mode } => {
                let items = serde_json::from_str(&items)?;
                commands::retrieval::vector_insert(&context, &collection, items, upsert, storage_mode).await
            }
            VectorCommands::Search { collection, embedding, top_k, storage_mode } => {
                let embedding: Vec<f32> = serde_json::from_str(&embedding)?;
                commands::retrieval::vector_search(&context, &collection, embedding, top_k, storage_mode).await
            }
            VectorCommands::HybridSearch { collection, embedding, keywords, top_k, storage_mode } => {
                let embedding: Vec<f32> = serde_json::from_str(&embedding)?;
                commands::retrieval::vector_hybrid_search(&context, &collection, embedding, keywords, top_k, storage_mode).await
            }
        },
        Commands::Rerank { query, matches, top_k } => {
            let matches: Value = serde_json::from_str(&matches)?;
            commands::retrieval::rerank(&context, &query, matches, top_k).await
        }
        Commands::ReapCollections => commands::retrieval::reap_collections(&context).await,
        Commands::Prompt { command } => match command {
            PromptCommands::Register { prompt_id, version, template } => {
                commands::prompt::register(&context, prompt_id, version, template).await
            }
            PromptCommands::Render { prompt_id, version, variables, extra } => {
                let variables = serde_json::from_str(&variables)?;
                let extra = serde_json::from_str(&extra)?;
                commands::prompt::render(&context, &prompt_id, version, variables, extra).await
            }
        },

        Commands::Route { payload } => {
            let payload: Value = serde_json::from_str(&payload)?;
            commands::llm::route(&context, payload).await
        }
        Commands::Invoke { payload } => {
            let payload: Value = serde_json::from_str(&payload)?;
            commands::llm::invoke(&context, payload).await
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                commands::ambient::config_show(&context);
                Ok(())
            }
        },
        Commands::Audit { command } => match command {
            AuditCommands::Status { document_id } => commands::ambient::audit_status(&context, &document_id).await,
        },
        Commands::Serve { host, port } => commands::ambient::serve(&context, &host, port).await,
    }
}
