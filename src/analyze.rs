//! Eager analysis entry points.
//!
//! Every entry point runs the same straight line: resolve the input, extract
//! the text, build the prompt, call the model, look for a table, assemble the
//! [`AnalysisReport`]. Only the table step recovers from failure; any other
//! error aborts the request and is returned to the caller.

use crate::config::AnalysisConfig;
use crate::error::AnalystError;
use crate::output::{AnalysisReport, AnalysisStats, DocumentMetadata, ExtractedDocument};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::llm::{self, AnalysisClient, ProviderClient};
use crate::pipeline::{extract, table};
use crate::prompts::{self, DEFAULT_SYSTEM_PROMPT};
use crate::report;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Analyse a PDF file or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`: Local file path or HTTP/HTTPS URL to a PDF
/// * `config`: Analysis configuration
///
/// # Returns
/// `Ok(AnalysisReport)` whenever the model answered, even if the `CSV:`
/// section could not be parsed (check `report.table`).
///
/// # Errors
/// Returns `Err(AnalystError)` for everything else:
/// - File not found / not a PDF / corrupt / wrong password
/// - No extractable text
/// - Provider not configured, API error or timeout
pub async fn analyze(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalystError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting analysis: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    run_pipeline(&resolved, config, total_start).await
}

/// Analyse an uploaded PDF held in memory.
///
/// `file_name` is the name the user picked; it must end in `.pdf`. The bytes
/// are spilled to a managed temp directory that is removed on return.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_analyst::{analyze_bytes, AnalysisConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("invoice.pdf")?;
/// let report = analyze_bytes(&bytes, "invoice.pdf", &AnalysisConfig::default()).await?;
/// println!("{}", report.analysis);
/// # Ok(())
/// # }
/// ```
pub async fn analyze_bytes(
    bytes: &[u8],
    file_name: &str,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalystError> {
    let total_start = Instant::now();
    info!("Starting analysis of upload '{}' ({} bytes)", file_name, bytes.len());

    let resolved = ResolvedInput::from_bytes(bytes, file_name)?;
    run_pipeline(&resolved, config, total_start).await
}

/// Analyse a PDF and write the downloadable report (the analysis text) to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalystError> {
    let report = analyze(input_str, config).await?;
    report::write_report(output_path.as_ref(), &report.analysis).await?;
    Ok(report)
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalystError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalystError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input_str, config))
}

/// Extract the text of a PDF without calling the model.
///
/// Does not require an LLM provider or API key.
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<ExtractedDocument, AnalystError> {
    let resolved =
        input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    extract::extract_document(resolved.path(), config.password.as_deref()).await
}

/// Read PDF metadata without extracting content.
///
/// Does not require an LLM provider or API key. Only `password` and
/// `download_timeout_secs` are read from `config`.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<DocumentMetadata, AnalystError> {
    let resolved =
        input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    extract::extract_metadata(resolved.path(), config.password.as_deref()).await
}

/// Resolve the analysis client, from most-specific to least-specific.
///
/// 1. **Injected client** (`config.client`): used as-is. Tests and callers
///    with their own middleware go through here.
/// 2. **Named provider** (`config.provider_name`) + model (default `gpt-4o`).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`):
///    both set means the execution environment chose for us.
/// 4. **`OPENAI_API_KEY`**: OpenAI wins when its key is present, even if
///    other provider keys are set too.
/// 5. **Full auto-detection** via the provider factory.
pub fn resolve_client(config: &AnalysisConfig) -> Result<Arc<dyn AnalysisClient>, AnalystError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    if let Some(ref name) = config.provider_name {
        let client = ProviderClient::from_name(name, config.model_or_default())?;
        return Ok(Arc::new(client));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            // An explicit model on the config still wins over the environment.
            let model = config.model.as_deref().unwrap_or(&model);
            return Ok(Arc::new(ProviderClient::from_name(&prov, model)?));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let client = ProviderClient::from_name("openai", config.model_or_default())?;
            return Ok(Arc::new(client));
        }
    }

    Ok(Arc::new(ProviderClient::from_env()?))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_pipeline(
    resolved: &ResolvedInput,
    config: &AnalysisConfig,
    total_start: Instant,
) -> Result<AnalysisReport, AnalystError> {
    let source = resolved.display_name();
    let pdf_path = resolved.path();

    // ── Step 1: Get/create client ────────────────────────────────────────
    let client = resolve_client(config)?;

    // ── Step 2: Extract text ─────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(&source);
    }
    let extract_start = Instant::now();
    let document = extract::extract_document(pdf_path, config.password.as_deref()).await?;
    let extraction_duration_ms = extract_start.elapsed().as_millis() as u64;

    let total_pages = document.pages.len();
    let text_pages = document.text_pages();
    let extracted_chars = document.text.chars().count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(text_pages, total_pages, extracted_chars);
    }

    if document.text.trim().is_empty() && !config.allow_empty_text {
        return Err(AnalystError::NoExtractableText {
            path: PathBuf::from(&source),
            pages: total_pages,
        });
    }

    // ── Step 3: Build prompt ─────────────────────────────────────────────
    let (excerpt, prompt_truncated) =
        prompts::truncate_chars(&document.text, config.max_prompt_chars);
    let prompt_chars = excerpt.chars().count();
    if prompt_truncated {
        debug!(
            "Prompt excerpt cut to {} of {} chars",
            prompt_chars, extracted_chars
        );
    }
    let user_prompt = prompts::build_analysis_prompt(
        &document.text,
        config.max_prompt_chars,
        config.instructions.as_deref(),
    );
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    // ── Step 4: Call the model ───────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start(user_prompt.chars().count());
    }
    let run = llm::request_analysis(client.as_ref(), system_prompt, &user_prompt, config).await?;
    let analysis = run.completion.content;
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(analysis.chars().count());
    }

    // ── Step 5: Optional table ───────────────────────────────────────────
    let table = table::extract_table(&analysis);
    if let (Some(warning), Some(cb)) = (table.warning(), &config.progress_callback) {
        cb.on_table_warning(warning);
    }

    // ── Step 6: Assemble report ──────────────────────────────────────────
    let stats = AnalysisStats {
        total_pages,
        text_pages,
        extracted_chars,
        prompt_chars,
        prompt_truncated,
        input_tokens: run.completion.prompt_tokens,
        output_tokens: run.completion.completion_tokens,
        retries: run.retries,
        extraction_duration_ms,
        llm_duration_ms: run.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Analysis complete: {} pages, {} chars in, {} chars out, {}ms total",
        total_pages,
        prompt_chars,
        analysis.chars().count(),
        stats.total_duration_ms
    );

    Ok(AnalysisReport {
        source,
        preview: report::preview(&document.text, config.preview_chars),
        extracted_text: document.text,
        analysis,
        table,
        metadata: document.metadata,
        stats,
    })
}
