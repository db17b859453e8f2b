//! CLI binary for edgequake-pdf-analyst.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig`, prints results and hosts the web UI.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdf_analyst::report::write_report;
use edgequake_pdf_analyst::server::{self, ServerConfig};
use edgequake_pdf_analyst::{
    analyze, analyze_to_file, extract_text, inspect, AnalysisConfig, AnalysisProgressCallback,
    AnalysisReport, ProgressCallback, TableOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner whose prefix follows the stage,
/// plus a log line when each stage finishes.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, source: &str) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(source.to_string());
    }

    fn on_extraction_complete(&self, text_pages: usize, total_pages: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Extracted {}  {}",
            green("✓"),
            bold(&format!("{chars} chars")),
            dim(&format!("{text_pages}/{total_pages} pages with text")),
        ));
    }

    fn on_analysis_start(&self, prompt_chars: usize) {
        self.bar.set_prefix("Analyzing");
        self.bar
            .set_message(format!("sending {prompt_chars} chars for analysis…"));
    }

    fn on_analysis_retry(&self, attempt: u32, max_retries: u32, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} retry {}/{}  {}",
            yellow("↻"),
            attempt,
            max_retries,
            dim(&msg)
        ));
    }

    fn on_analysis_complete(&self, analysis_chars: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Analysis received  {}",
            green("✔"),
            dim(&format!("{analysis_chars} chars"))
        );
    }

    fn on_table_warning(&self, warning: &str) {
        eprintln!("{} {}", yellow("⚠"), warning);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a PDF, print the analysis to stdout
  pdf-analyst analyze report.pdf

  # Save the analysis and the extracted table
  pdf-analyst analyze report.pdf -o analysis.txt --table-out table.csv

  # Use a specific model
  pdf-analyst analyze --model gpt-4o-mini --provider openai report.pdf

  # Analyse a PDF from a URL, full JSON report
  pdf-analyst analyze https://arxiv.org/pdf/1706.03762 --json > report.json

  # Start the upload page on http://127.0.0.1:8501
  pdf-analyst serve

  # Raw text only (no API key needed)
  pdf-analyst extract report.pdf -o report.txt

  # PDF metadata only (no API key needed)
  pdf-analyst inspect report.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDF_ANALYST_*           Every flag, e.g. PDF_ANALYST_MAX_CHARS=8000

  A `.env` file in the working directory is loaded on start-up.
"#;

/// Analyse PDF documents with an LLM: summary, topics, sentiment, actions, tables.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-analyst",
    version,
    about = "Analyse PDF documents with an LLM: summary, topics, sentiment, action points and tables",
    long_about = "Extract the text of a PDF and ask an LLM for a concise summary, key topics, \
sentiment and tone, action points and any tabular data as CSV. Works from the command line or \
as a single-page web UI. Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any \
OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF_ANALYST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF_ANALYST_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse one PDF and print the result.
    Analyze(AnalyzeArgs),
    /// Serve the single-page upload UI.
    Serve(ServeArgs),
    /// Print PDF metadata only (no API key needed).
    Inspect(InspectArgs),
    /// Print the extracted text only (no API key needed).
    Extract(ExtractArgs),
}

/// Flags shared by every command that talks to the model.
#[derive(Args, Debug, Clone)]
struct LlmArgs {
    /// LLM model ID (e.g. gpt-4o, gpt-4o-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_LLM_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Characters of extracted text sent to the model.
    #[arg(long, env = "PDF_ANALYST_MAX_CHARS", default_value_t = edgequake_pdf_analyst::config::DEFAULT_MAX_PROMPT_CHARS)]
    max_chars: usize,

    /// Characters of extracted text kept in the preview.
    #[arg(long, env = "PDF_ANALYST_PREVIEW_CHARS", default_value_t = edgequake_pdf_analyst::config::DEFAULT_PREVIEW_CHARS)]
    preview_chars: usize,

    /// LLM temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "PDF_ANALYST_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max LLM output tokens. Provider default when unset.
    #[arg(long, env = "PDF_ANALYST_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Retries on LLM failure (0 = fail on the first error).
    #[arg(long, env = "PDF_ANALYST_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// LLM call timeout in seconds. Client default when unset.
    #[arg(long, env = "PDF_ANALYST_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "PDF_ANALYST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_ANALYST_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF_ANALYST_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Path to a text file replacing the analysis instructions.
    #[arg(long, env = "PDF_ANALYST_INSTRUCTIONS")]
    instructions: Option<PathBuf>,

    /// Send the prompt even when no page has a text layer.
    #[arg(long, env = "PDF_ANALYST_ALLOW_EMPTY")]
    allow_empty: bool,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the analysis to this file instead of stdout.
    #[arg(short, long, env = "PDF_ANALYST_OUTPUT")]
    output: Option<PathBuf>,

    /// Write the extracted table (if any) as CSV to this file.
    #[arg(long, env = "PDF_ANALYST_TABLE_OUT")]
    table_out: Option<PathBuf>,

    /// Output the full report as JSON instead of the analysis text.
    #[arg(long, env = "PDF_ANALYST_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF_ANALYST_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind.
    #[arg(long, env = "PDF_ANALYST_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind.
    #[arg(long, env = "PDF_ANALYST_PORT", default_value_t = 8501)]
    port: u16,

    /// Largest accepted upload in MiB.
    #[arg(long, env = "PDF_ANALYST_MAX_UPLOAD_MB", default_value_t = 64)]
    max_upload_mb: usize,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_ANALYST_PASSWORD")]
    password: Option<String>,

    /// URL download timeout in seconds.
    #[arg(long, env = "PDF_ANALYST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output metadata as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the text to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_ANALYST_PASSWORD")]
    password: Option<String>,

    /// URL download timeout in seconds.
    #[arg(long, env = "PDF_ANALYST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active;
    // the spinner provides all the feedback that matters to the user.
    let show_progress = match &cli.command {
        Command::Analyze(a) => !cli.quiet && !a.no_progress && !a.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Analyze(args) => run_analyze(args, cli.quiet, show_progress).await,
        Command::Serve(args) => run_serve(args).await,
        Command::Inspect(args) => run_inspect(args).await,
        Command::Extract(args) => run_extract(args, cli.quiet).await,
    }
}

async fn run_analyze(args: AnalyzeArgs, quiet: bool, show_progress: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    let config = build_config(&args.llm, progress_cb).await?;

    let report = match args.output {
        Some(ref output_path) => analyze_to_file(&args.input, output_path, &config)
            .await
            .context("Analysis failed")?,
        None => analyze(&args.input, &config)
            .await
            .context("Analysis failed")?,
    };

    if let Some(ref table_path) = args.table_out {
        write_table(&report, table_path, quiet).await?;
    }

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if args.output.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(report.analysis.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !report.analysis.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !quiet && !args.json {
        print_summary(&report, args.output.as_ref());
    }

    Ok(())
}

/// Save the parsed table, or explain why there is none.
async fn write_table(report: &AnalysisReport, path: &Path, quiet: bool) -> Result<()> {
    match &report.table {
        TableOutcome::Parsed { table } => {
            let csv = table.to_csv().context("Failed to serialise table")?;
            write_report(path, &csv)
                .await
                .with_context(|| format!("Failed to write table to {:?}", path))?;
            if !quiet {
                eprintln!(
                    "{} table {}×{}  →  {}",
                    green("✔"),
                    table.headers.len(),
                    table.rows.len(),
                    bold(&path.display().to_string())
                );
            }
        }
        TableOutcome::Invalid { warning, error } => {
            if !quiet {
                eprintln!("{} {} ({})  — no table written", yellow("⚠"), warning, error);
            }
        }
        TableOutcome::Absent => {
            if !quiet {
                eprintln!("{} no CSV section in the analysis — no table written", dim("·"));
            }
        }
    }
    Ok(())
}

fn print_summary(report: &AnalysisReport, output: Option<&PathBuf>) {
    let stats = &report.stats;
    if let Some(path) = output {
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            green("✔"),
            stats.text_pages,
            stats.total_pages,
            stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
    }
    let truncated = if stats.prompt_truncated {
        format!("  (first {} of {} chars sent)", stats.prompt_chars, stats.extracted_chars)
    } else {
        String::new()
    };
    eprintln!(
        "   {} tokens in  /  {} tokens out  —  {}ms total{}",
        dim(&stats.input_tokens.to_string()),
        dim(&stats.output_tokens.to_string()),
        stats.total_duration_ms,
        dim(&truncated),
    );
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args.llm, None).await?;
    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
    };
    info!(
        "Starting web UI on http://{}:{} (max upload {} MiB)",
        server_config.host, server_config.port, args.max_upload_mb
    );

    server::serve(config, server_config, shutdown_signal())
        .await
        .context("Web UI failed")?;
    Ok(())
}

async fn run_inspect(args: InspectArgs) -> Result<()> {
    let mut builder = AnalysisConfig::builder().download_timeout_secs(args.download_timeout);
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    let meta = inspect(&args.input, &config)
        .await
        .context("Failed to inspect PDF")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
        );
    } else {
        println!("File:         {}", args.input);
        if let Some(ref t) = meta.title {
            println!("Title:        {}", t);
        }
        if let Some(ref a) = meta.author {
            println!("Author:       {}", a);
        }
        if let Some(ref s) = meta.subject {
            println!("Subject:      {}", s);
        }
        println!("Pages:        {}", meta.page_count);
        println!("PDF Version:  {}", meta.pdf_version);
        println!("Encrypted:    {}", meta.is_encrypted);
        if let Some(ref p) = meta.producer {
            println!("Producer:     {}", p);
        }
        if let Some(ref c) = meta.creator {
            println!("Creator:      {}", c);
        }
    }
    Ok(())
}

async fn run_extract(args: ExtractArgs, quiet: bool) -> Result<()> {
    let mut builder = AnalysisConfig::builder().download_timeout_secs(args.download_timeout);
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    let doc = extract_text(&args.input, &config)
        .await
        .context("Extraction failed")?;

    match args.output {
        Some(ref path) => {
            write_report(path, &doc.text)
                .await
                .with_context(|| format!("Failed to write {:?}", path))?;
            if !quiet {
                eprintln!(
                    "{} {} chars from {}/{} pages  →  {}",
                    green("✔"),
                    doc.text.chars().count(),
                    doc.text_pages(),
                    doc.pages.len(),
                    bold(&path.display().to_string())
                );
            }
        }
        None => println!("{}", doc.text),
    }
    if !quiet && doc.text.is_empty() {
        eprintln!(
            "{} no text layer found; scanned documents need OCR first",
            cyan("ℹ")
        );
    }
    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(llm: &LlmArgs, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .max_prompt_chars(llm.max_chars)
        .preview_chars(llm.preview_chars)
        .max_retries(llm.max_retries)
        .download_timeout_secs(llm.download_timeout)
        .allow_empty_text(llm.allow_empty);

    if let Some(ref model) = llm.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = llm.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(t) = llm.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = llm.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(secs) = llm.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref pwd) = llm.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref path) = llm.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref path) = llm.instructions {
        let instructions = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instructions from {:?}", path))?;
        builder = builder.instructions(instructions);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
