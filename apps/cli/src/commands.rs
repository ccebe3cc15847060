//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use pagewise_core::pipeline::{ProgressReporter, process_document};
use pagewise_core::{
    DocumentSummarizer, InferenceBackend, QaEngine, SummaryOptions, build_outline, section_for,
    sections_for,
};
use pagewise_shared::{AppConfig, DocumentRecord, PagewiseError, init_config, load_config};
use pagewise_text::ExtractedDocument;
use serde::Serialize;
use tracing::info;

use crate::backend::start_backend;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pagewise: structure extracted document text and ask questions about it.
#[derive(Parser)]
#[command(
    name = "pagewise",
    version,
    about = "Build outlines, section summaries and attributed answers from extracted document text.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Never start the inference backend; use the deterministic fallbacks.
    #[arg(long, global = true)]
    pub no_backend: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the detected heading outline as JSON.
    Outline {
        /// Extracted text file (pages separated by form feeds).
        file: PathBuf,
    },

    /// Print section spans, or the text of one section.
    Sections {
        /// Extracted text file (pages separated by form feeds).
        file: PathBuf,

        /// Print only the text of the section owned by this heading.
        #[arg(long)]
        heading: Option<String>,
    },

    /// Summarize the document as a whole or section by section.
    Summarize {
        /// Extracted text file (pages separated by form feeds).
        file: PathBuf,

        /// Summarize each outline section separately.
        #[arg(long)]
        by_section: bool,
    },

    /// Answer a question about the document.
    Ask {
        /// Extracted text file (pages separated by form feeds).
        file: PathBuf,

        /// The question to answer.
        question: String,

        /// Context budget in characters (overrides the config value).
        #[arg(long)]
        budget: Option<usize>,
    },

    /// Process a document into a full record (outline, summary, metadata).
    Process {
        /// Extracted text file (pages separated by form feeds).
        file: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pagewise=info",
        1 => "pagewise=debug",
        _ => "pagewise=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let no_backend = cli.no_backend;
    match cli.command {
        Command::Outline { file } => cmd_outline(&file).await,
        Command::Sections { file, heading } => cmd_sections(&file, heading.as_deref()).await,
        Command::Summarize { file, by_section } => cmd_summarize(&file, by_section, no_backend).await,
        Command::Ask {
            file,
            question,
            budget,
        } => cmd_ask(&file, question, budget, no_backend).await,
        Command::Process { file } => cmd_process(&file, no_backend).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn read_input(path: &Path) -> Result<String> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PagewiseError::io(path, e))?;
    info!(path = %path.display(), bytes = raw.len(), "read input");
    Ok(raw)
}

async fn load_document(path: &Path) -> Result<ExtractedDocument> {
    let raw = read_input(path).await?;
    Ok(ExtractedDocument::from_raw(&raw))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_outline(file: &Path) -> Result<()> {
    let doc = load_document(file).await?;
    let outline = build_outline(&doc.full_text, &doc.pages);
    print_json(&outline)
}

/// One entry of `pagewise sections` output.
#[derive(Serialize)]
struct SectionSpan<'a> {
    heading: &'a str,
    level: u8,
    position: usize,
    /// Byte offsets into the full text; absent when the heading was not found.
    start: Option<usize>,
    end: Option<usize>,
}

async fn cmd_sections(file: &Path, heading: Option<&str>) -> Result<()> {
    let doc = load_document(file).await?;
    let outline = build_outline(&doc.full_text, &doc.pages);

    if let Some(text) = heading {
        let heading = outline
            .find_by_text(text)
            .ok_or_else(|| eyre!("no heading '{text}' in the outline; run `pagewise outline` to list them"))?;
        println!("{}", section_for(heading, &outline, &doc.full_text));
        return Ok(());
    }

    let spans: Vec<SectionSpan<'_>> = sections_for(&outline, &doc.full_text)
        .iter()
        .map(|section| SectionSpan {
            heading: &section.heading.text,
            level: section.heading.level,
            position: section.heading.position,
            start: section.span.as_ref().map(|s| s.start),
            end: section.span.as_ref().map(|s| s.end),
        })
        .collect();
    print_json(&spans)
}

async fn cmd_summarize(file: &Path, by_section: bool, no_backend: bool) -> Result<()> {
    let config = load_config()?;
    let doc = load_document(file).await?;
    let backend = start_backend(&config.backend, no_backend).await;
    let summarizer = DocumentSummarizer::new(backend, SummaryOptions::from(&config.defaults));

    if !by_section {
        let summary =
            tokio::task::spawn_blocking(move || summarizer.summarize(&doc.full_text)).await?;
        println!("{summary}");
        return Ok(());
    }

    let reporter = CliProgress::new();
    let summaries = tokio::task::spawn_blocking(move || {
        let outline = build_outline(&doc.full_text, &doc.pages);
        let summaries = summarizer.summarize_by_sections(&doc.full_text, &outline, &reporter);
        reporter.finish();
        summaries
    })
    .await?;

    print_json(&summaries)
}

async fn cmd_ask(
    file: &Path,
    question: String,
    budget: Option<usize>,
    no_backend: bool,
) -> Result<()> {
    let config = load_config()?;
    let budget = resolve_budget(budget, &config)?;

    let doc = load_document(file).await?;
    let backend = start_backend(&config.backend, no_backend).await;
    let engine = QaEngine::new(backend, budget);

    info!(budget, "answering question");
    let answer = tokio::task::spawn_blocking(move || {
        let outline = build_outline(&doc.full_text, &doc.pages);
        engine.answer_question(&question, &doc.full_text, &outline)
    })
    .await?;

    print_json(&answer)
}

/// The `--budget` flag, or the configured context budget.
fn resolve_budget(flag: Option<usize>, config: &AppConfig) -> pagewise_shared::Result<usize> {
    match flag {
        Some(0) => Err(PagewiseError::validation("--budget must be greater than zero")),
        Some(budget) => Ok(budget),
        None => Ok(config.defaults.context_budget),
    }
}

async fn cmd_process(file: &Path, no_backend: bool) -> Result<()> {
    let config = load_config()?;
    let raw = read_input(file).await?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let backend: Option<Arc<dyn InferenceBackend>> = start_backend(&config.backend, no_backend).await;
    let summarizer = DocumentSummarizer::new(backend, SummaryOptions::from(&config.defaults));

    let reporter = CliProgress::new();
    let record = tokio::task::spawn_blocking(move || {
        process_document(&filename, &raw, &summarizer, &reporter)
    })
    .await?;

    print_json(&record)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn section_summarized(&self, heading: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Summarizing [{current}/{total}] {heading}"));
    }

    fn done(&self, _record: &DocumentRecord) {
        self.finish();
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
