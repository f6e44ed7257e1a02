use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, multipart};
use serde::de::DeserializeOwned;

use super::types::{
    ChatRequest, ChatResponse, ConversationHistory, ExplainRequest, ExplainResponse, PdfInfo,
    SummarizeRequest, SummarizeResponse, SummaryResponse, TranslateRequest, TranslateResponse,
    UploadResponse,
};
use crate::settings;

const HTTP_USER_AGENT: &str = concat!("readpane/", env!("CARGO_PKG_VERSION"));
// Model calls on the backend are slow
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Blocking client for the document/chat backend
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(HTTP_USER_AGENT)
            .build()
            .context("failed to create api http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Client for the backend configured in settings
    pub fn from_settings() -> Result<Self> {
        Self::new(&settings::get_api_base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        request
            .send()
            .with_context(|| format!("failed to request {what}"))?
            .error_for_status()
            .with_context(|| format!("{what} request failed"))?
            .json::<T>()
            .with_context(|| format!("failed to parse {what} response"))
    }

    pub fn list_pdfs(&self) -> Result<Vec<PdfInfo>> {
        self.fetch(self.client.get(self.url("pdfs/")), "document list")
    }

    pub fn get_pdf(&self, pdf_id: i64) -> Result<PdfInfo> {
        self.fetch(
            self.client.get(self.url(&format!("pdfs/{pdf_id}"))),
            "document info",
        )
    }

    /// Raw bytes of the stored PDF
    pub fn download_pdf(&self, pdf_id: i64) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(self.url(&format!("pdfs/{pdf_id}/file")))
            .send()
            .context("failed to request document file")?
            .error_for_status()
            .context("document file request failed")?
            .bytes()
            .context("failed to read document file")?;

        debug!("Downloaded document {pdf_id} ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }

    pub fn upload_pdf(&self, path: &Path) -> Result<UploadResponse> {
        let form = multipart::Form::new()
            .file("file", path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let uploaded: UploadResponse = self.fetch(
            self.client.post(self.url("pdfs/upload")).multipart(form),
            "upload",
        )?;
        info!(
            "Uploaded {} as document {} ({} pages)",
            path.display(),
            uploaded.id,
            uploaded.page_count
        );
        Ok(uploaded)
    }

    pub fn delete_pdf(&self, pdf_id: i64) -> Result<()> {
        self.client
            .delete(self.url(&format!("pdfs/{pdf_id}")))
            .send()
            .context("failed to request document deletion")?
            .error_for_status()
            .context("document deletion failed")?;
        info!("Deleted document {pdf_id}");
        Ok(())
    }

    /// Stored whole-document summary, `None` until one has been generated
    pub fn get_summary(&self, pdf_id: i64) -> Result<Option<SummaryResponse>> {
        let response = self
            .client
            .get(self.url(&format!("pdfs/{pdf_id}/summary")))
            .send()
            .context("failed to request summary")?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No summary stored for document {pdf_id}");
            return Ok(None);
        }

        let summary = response
            .error_for_status()
            .context("summary request failed")?
            .json()
            .context("failed to parse summary response")?;
        Ok(Some(summary))
    }

    /// Generate the whole-document summary. A summary that already exists
    /// is returned as is.
    pub fn generate_summary(&self, pdf_id: i64) -> Result<SummaryResponse> {
        self.fetch(
            self.client.post(self.url(&format!("pdfs/{pdf_id}/summary"))),
            "summary",
        )
    }

    pub fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.fetch(
            self.client.post(self.url("chat/send")).json(request),
            "chat",
        )
    }

    pub fn explain(&self, request: &ExplainRequest) -> Result<String> {
        let response: ExplainResponse = self.fetch(
            self.client.post(self.url("chat/explain")).json(request),
            "explanation",
        )?;
        Ok(response.explanation)
    }

    pub fn translate(&self, request: &TranslateRequest) -> Result<String> {
        let response: TranslateResponse = self.fetch(
            self.client.post(self.url("chat/translate")).json(request),
            "translation",
        )?;
        Ok(response.translation)
    }

    pub fn summarize(&self, request: &SummarizeRequest) -> Result<String> {
        let response: SummarizeResponse = self.fetch(
            self.client.post(self.url("chat/summarize")).json(request),
            "selection summary",
        )?;
        Ok(response.summary)
    }

    /// Conversation histories of a document, most recently updated first
    pub fn conversations(&self, pdf_id: i64) -> Result<Vec<ConversationHistory>> {
        self.fetch(
            self.client
                .get(self.url(&format!("chat/{pdf_id}/conversations"))),
            "conversation history",
        )
    }
}
