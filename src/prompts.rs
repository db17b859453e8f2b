//! Prompts for LLM-based PDF analysis.
//!
//! Callers can override both pieces via
//! [`crate::config::AnalysisConfig::system_prompt`] and
//! [`crate::config::AnalysisConfig::instructions`]; the constants here are
//! used only when no override is provided.

/// Default system-role message.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional PDF analysis assistant.";

/// Default instruction block placed before the document text.
///
/// The structured-data bullet names the `CSV:` marker explicitly: the table
/// extractor looks for that literal string in the answer.
pub const ANALYSIS_INSTRUCTIONS: &str = r#"You are a professional document analyst. Analyze the following PDF text thoroughly:
- Provide a concise summary (max 10 lines).
- Extract any structured data or tables in CSV format if present. Put the CSV rows at the very end of your answer, after a line that reads exactly "CSV:", with the header row first.
- Identify key topics.
- Identify the sentiment and tone.
- Provide action points if applicable."#;

/// Label introducing the document text inside the user message.
pub const DOCUMENT_LABEL: &str = "PDF Text:";

/// Return the first `max_chars` characters of `text` and whether anything was cut.
///
/// Counts Unicode scalar values, so the slice always ends on a character
/// boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Build the user-role message: instructions, label, then the first
/// `max_chars` characters of the extracted text.
pub fn build_analysis_prompt(text: &str, max_chars: usize, instructions: Option<&str>) -> String {
    let instructions = instructions.unwrap_or(ANALYSIS_INSTRUCTIONS);
    let (excerpt, _) = truncate_chars(text, max_chars);
    format!("\n{instructions}\n\n{DOCUMENT_LABEL}\n{excerpt}")
}
