//! Shared fixtures: lopdf-built PDFs and a scripted analysis client.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_pdf_analyst::{AnalysisClient, AnalystError, Completion, RequestOptions};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Build a PDF where each entry holds one page's text lines.
/// An empty slice gives a page with no text layer, like a scan.
pub fn build_pdf(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Td",
                vec![72.into(), (720 - 14 * i as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// RC4-encrypted one-page PDF; the user password is `secret`.
pub fn encrypted_fixture() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/encrypted.pdf")
}

/// Write `bytes` to a `.pdf` temp file.
pub fn write_pdf(bytes: &[u8]) -> tempfile::NamedTempFile {
    let tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    std::fs::write(tmp.path(), bytes).unwrap();
    tmp
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct Call {
    pub system: String,
    pub user: String,
}

/// Replies with canned answers in order and records every request.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub fn answering(answer: &str) -> Arc<Self> {
        Self::script(vec![Ok(answer)])
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::script(vec![Err(message)])
    }

    pub fn script(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisClient for ScriptedClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        _options: &RequestOptions,
    ) -> Result<Completion, AnalystError> {
        self.calls.lock().unwrap().push(Call {
            system: system.to_string(),
            user: user.to_string(),
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(Completion {
                content,
                prompt_tokens: 1200,
                completion_tokens: 300,
            }),
            Some(Err(message)) => Err(AnalystError::LlmApiError { message }),
            None => Err(AnalystError::LlmApiError {
                message: "no scripted reply left".into(),
            }),
        }
    }
}
