//! End-to-end pipeline tests against a scripted model.
//!
//! PDFs are generated with lopdf and analysed through the public entry
//! points, so nothing here needs network access or an API key.

mod common;

use common::{build_pdf, encrypted_fixture, write_pdf, ScriptedClient};
use edgequake_pdf_analyst::{
    analyze, analyze_bytes, analyze_to_file, extract_text, inspect, AnalysisConfig,
    AnalysisProgressCallback, AnalystError, TableOutcome, TABLE_WARNING,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn config_with(client: Arc<ScriptedClient>) -> AnalysisConfig {
    AnalysisConfig::builder()
        .client(client)
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

// ── Extraction and prompt ────────────────────────────────────────────────

#[tokio::test]
async fn pages_reach_the_prompt_in_order() {
    let pdf = build_pdf(&[&["Revenue grew"], &[], &["Costs fell", "Margin widened"]]);
    let client = ScriptedClient::answering("Summary: a good quarter.");
    let config = config_with(client.clone());

    let report = analyze_bytes(&pdf, "q3.pdf", &config).await.unwrap();

    assert_eq!(report.source, "q3.pdf");
    assert_eq!(report.stats.total_pages, 3);
    assert_eq!(report.stats.text_pages, 2);
    assert!(
        report.extracted_text.contains("Revenue grew\nCosts fell"),
        "got: {:?}",
        report.extracted_text
    );

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, "You are a professional PDF analysis assistant.");
    assert!(calls[0].user.contains("PDF Text:\n"));
    assert!(calls[0].user.contains(&report.extracted_text));
    assert!(calls[0].user.contains("CSV:"));
}

#[tokio::test]
async fn prompt_carries_only_the_leading_excerpt() {
    let line = format!("{}ZZZZ", "a".repeat(12_000));
    let pdf = build_pdf(&[&[line.as_str()]]);
    let client = ScriptedClient::answering("Summary.");
    let config = config_with(client.clone());

    let report = analyze_bytes(&pdf, "long.pdf", &config).await.unwrap();

    let user = &client.calls()[0].user;
    assert!(user.ends_with(&"a".repeat(12_000)));
    assert!(!user.contains("ZZZZ"));
    assert!(report.stats.prompt_truncated);
    assert_eq!(report.stats.prompt_chars, 12_000);
    // The full text is still kept on the report.
    assert!(report.extracted_text.ends_with("ZZZZ"));
}

#[tokio::test]
async fn preview_is_cut_with_an_ellipsis() {
    let long = "x".repeat(6_000);
    let pdf = build_pdf(&[&[long.as_str()]]);
    let report = analyze_bytes(&pdf, "long.pdf", &config_with(ScriptedClient::answering("ok")))
        .await
        .unwrap();
    assert_eq!(report.preview, format!("{}...", "x".repeat(5_000)));

    let pdf = build_pdf(&[&["short text"]]);
    let report = analyze_bytes(&pdf, "short.pdf", &config_with(ScriptedClient::answering("ok")))
        .await
        .unwrap();
    assert_eq!(report.preview, "short text");
}

// ── Table outcomes ───────────────────────────────────────────────────────

#[tokio::test]
async fn answer_without_marker_has_no_table() {
    let pdf = build_pdf(&[&["Minutes of the meeting"]]);
    let answer = "Summary: routine meeting.\nKey topics: budget.";
    let report = analyze_bytes(&pdf, "m.pdf", &config_with(ScriptedClient::answering(answer)))
        .await
        .unwrap();

    assert_eq!(report.table, TableOutcome::Absent);
    assert_eq!(report.analysis, answer);
    assert_eq!(report.download_bytes(), answer.as_bytes());
    assert_eq!(report.download_file_name(), "analysis.txt");
}

#[tokio::test]
async fn csv_section_becomes_a_table() {
    let pdf = build_pdf(&[&["Q1 10, Q2 12"]]);
    let answer = "Summary: growth.\nCSV:\nquarter,revenue\nQ1,10\nQ2,12";
    let report = analyze_bytes(&pdf, "r.pdf", &config_with(ScriptedClient::answering(answer)))
        .await
        .unwrap();

    let table = report.table.table().expect("table parsed");
    assert_eq!(table.headers, vec!["quarter", "revenue"]);
    assert_eq!(table.rows, vec![vec!["Q1", "10"], vec!["Q2", "12"]]);
    assert_eq!(report.download_bytes(), answer.as_bytes());
}

#[tokio::test]
async fn unparseable_csv_warns_but_keeps_the_analysis() {
    let pdf = build_pdf(&[&["Audit findings"]]);
    let answer = "Summary.\nCSV: none\nKey topics: finance, risk, audit";
    let report = analyze_bytes(&pdf, "a.pdf", &config_with(ScriptedClient::answering(answer)))
        .await
        .unwrap();

    assert!(report.table.table().is_none());
    assert_eq!(report.table.warning(), Some(TABLE_WARNING));
    assert_eq!(report.analysis, answer);
    assert_eq!(report.download_bytes(), answer.as_bytes());
}

// ── Failures ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn textless_pdf_stops_before_the_model() {
    let pdf = build_pdf(&[&[], &[]]);
    let client = ScriptedClient::answering("unused");
    let err = analyze_bytes(&pdf, "scan.pdf", &config_with(client.clone()))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AnalystError::NoExtractableText { pages: 2, .. }),
        "got: {err}"
    );
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn textless_pdf_is_sent_when_allowed() {
    let pdf = build_pdf(&[&[]]);
    let client = ScriptedClient::answering("Nothing to analyse.");
    let config = AnalysisConfig::builder()
        .client(client.clone())
        .allow_empty_text(true)
        .build()
        .unwrap();

    let report = analyze_bytes(&pdf, "scan.pdf", &config).await.unwrap();
    assert_eq!(report.extracted_text, "");
    assert_eq!(report.preview, "");
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn non_pdf_uploads_are_rejected() {
    let config = config_with(ScriptedClient::answering("unused"));

    let err = analyze_bytes(b"%PDF-1.4 fake", "notes.txt", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalystError::UnsupportedUpload { .. }), "got: {err}");

    let err = analyze_bytes(b"PK\x03\x04zip", "renamed.pdf", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalystError::NotAPdf { .. }), "got: {err}");

    let err = analyze_bytes(b"", "empty.pdf", &config).await.unwrap_err();
    assert!(matches!(err, AnalystError::EmptyUpload), "got: {err}");
}

#[tokio::test]
async fn model_failure_is_reported() {
    let pdf = build_pdf(&[&["Some text"]]);
    let err = analyze_bytes(&pdf, "x.pdf", &config_with(ScriptedClient::failing("rate limited")))
        .await
        .unwrap_err();
    match err {
        AnalystError::LlmApiError { message } => assert!(message.contains("rate limited")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let pdf = build_pdf(&[&["Some text"]]);
    let client = ScriptedClient::script(vec![Err("503"), Ok("Recovered answer")]);
    let config = AnalysisConfig::builder()
        .client(client.clone())
        .max_retries(1)
        .retry_backoff_ms(1)
        .build()
        .unwrap();

    let report = analyze_bytes(&pdf, "x.pdf", &config).await.unwrap();
    assert_eq!(report.analysis, "Recovered answer");
    assert_eq!(report.stats.retries, 1);
    assert_eq!(client.calls().len(), 2);
}

// ── Path entry points ────────────────────────────────────────────────────

#[tokio::test]
async fn analyze_to_file_writes_the_download() {
    let pdf = write_pdf(&build_pdf(&[&["Board report"]]));
    let out_dir = tempfile::tempdir().unwrap();
    let out = out_dir.path().join("nested").join("analysis.txt");
    let answer = "Summary: ünïcode stays intact.";

    let report = analyze_to_file(
        pdf.path().to_str().unwrap(),
        &out,
        &config_with(ScriptedClient::answering(answer)),
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(&out).unwrap(), report.download_bytes());
    assert!(!out.with_extension("txt.tmp").exists());
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let config = config_with(ScriptedClient::answering("unused"));
    let err = analyze("/definitely/not/here.pdf", &config).await.unwrap_err();
    assert!(matches!(err, AnalystError::FileNotFound { .. }), "got: {err}");
}

#[tokio::test]
async fn extract_and_inspect_need_no_client() {
    let pdf = write_pdf(&build_pdf(&[&["Alpha"], &["Beta"]]));
    let path = pdf.path().to_str().unwrap();

    let doc = extract_text(path, &AnalysisConfig::default()).await.unwrap();
    assert_eq!(doc.pages.len(), 2);
    assert!(doc.text.contains("Alpha\nBeta"), "got: {:?}", doc.text);

    let meta = inspect(path, &AnalysisConfig::default()).await.unwrap();
    assert_eq!(meta.page_count, 2);
    assert!(!meta.is_encrypted);
}

#[tokio::test]
async fn inspect_reads_the_password_from_config() {
    let path = encrypted_fixture();
    let path = path.to_str().unwrap();

    let err = inspect(path, &AnalysisConfig::default()).await.unwrap_err();
    assert!(matches!(err, AnalystError::PasswordRequired { .. }), "got: {err}");

    let config = AnalysisConfig::builder().password("secret").build().unwrap();
    let meta = inspect(path, &config).await.unwrap();
    assert!(meta.is_encrypted);
    assert_eq!(meta.page_count, 1);
}

#[tokio::test]
async fn encrypted_pdf_is_analysed_with_its_password() {
    let bytes = std::fs::read(encrypted_fixture()).unwrap();
    let client = ScriptedClient::answering("Summary: confidential.");
    let config = AnalysisConfig::builder()
        .client(client.clone())
        .password("secret")
        .build()
        .unwrap();

    let report = analyze_bytes(&bytes, "locked.pdf", &config).await.unwrap();
    assert!(report.extracted_text.contains("Confidential figures"));
    assert!(client.calls()[0].user.contains("Confidential figures"));
}

// ── Progress callbacks ───────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    warnings: AtomicUsize,
}

impl AnalysisProgressCallback for Recorder {
    fn on_extraction_start(&self, _source: &str) {
        self.events.lock().unwrap().push("extract".into());
    }
    fn on_extraction_complete(&self, text_pages: usize, total_pages: usize, _chars: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("extracted {text_pages}/{total_pages}"));
    }
    fn on_analysis_start(&self, _prompt_chars: usize) {
        self.events.lock().unwrap().push("analyse".into());
    }
    fn on_analysis_complete(&self, _chars: usize) {
        self.events.lock().unwrap().push("done".into());
    }
    fn on_table_warning(&self, _warning: &str) {
        self.warnings.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn callbacks_fire_in_pipeline_order() {
    let recorder = Arc::new(Recorder::default());
    let config = AnalysisConfig::builder()
        .client(ScriptedClient::answering("Summary.\nCSV: none\nKey topics: a, b, c"))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let pdf = build_pdf(&[&["One"], &[]]);

    analyze_bytes(&pdf, "cb.pdf", &config).await.unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["extract", "extracted 1/2", "analyse", "done"]
    );
    assert_eq!(recorder.warnings.load(Ordering::SeqCst), 1);
}
