//! Wire types of the document/chat backend

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A stored document as listed by the library
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PdfInfo {
    pub id: i64,
    pub filename: String,
    pub original_filename: String,
    pub page_count: usize,
    /// Size in bytes
    pub file_size: u64,
    pub is_scanned: bool,
    pub upload_date: NaiveDateTime,
    pub last_accessed: NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub id: i64,
    pub filename: String,
    pub page_count: usize,
    pub file_size: u64,
    pub is_scanned: bool,
    pub upload_date: NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SummaryResponse {
    pub pdf_id: i64,
    pub summary: String,
    pub generated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub pdf_id: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub message_id: i64,
    pub response: String,
    pub conversation_id: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ExplainRequest {
    pub pdf_id: i64,
    pub selected_text: String,
    pub page_number: usize,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TranslateRequest {
    pub pdf_id: i64,
    pub selected_text: String,
    pub target_language: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SummarizeRequest {
    pub pdf_id: i64,
    pub selected_text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExplainResponse {
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranslateResponse {
    pub translation: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummarizeResponse {
    pub summary: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub page_number: Option<usize>,
    #[serde(default)]
    pub action_type: Option<String>,
}

/// One conversation with its messages in chronological order
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ConversationHistory {
    pub conversation_id: i64,
    pub pdf_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
