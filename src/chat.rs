//! Chat session over a loaded document: selection, quick actions and
//! free-form questions

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info, warn};

use crate::api::{
    ApiClient, ChatRequest, ConversationHistory, ExplainRequest, Role, SummarizeRequest,
    TranslateRequest,
};
use crate::notification::NotificationManager;
use crate::settings;

/// Characters of the selection shown in previews
pub const PREVIEW_CHARS: usize = 100;

/// Quick actions offered for selected text
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SelectionAction {
    Explain,
    Translate,
    Summarize,
    #[value(name = "define")]
    DefineTerms,
    #[value(name = "examples")]
    GiveExamples,
    #[value(name = "questions")]
    AskQuestions,
}

impl SelectionAction {
    /// Line echoed into the transcript as the user's turn
    pub fn echo(&self, selection: &str) -> String {
        match self {
            SelectionAction::Explain => format!("Please explain: \"{selection}\""),
            SelectionAction::Translate => format!("Please translate: \"{selection}\""),
            SelectionAction::Summarize => format!("Please summarize: \"{selection}\""),
            SelectionAction::DefineTerms => format!("Please define: \"{selection}\""),
            SelectionAction::GiveExamples => {
                format!("Please give examples for: \"{selection}\"")
            }
            SelectionAction::AskQuestions => {
                format!("Generate review questions from: \"{selection}\"")
            }
        }
    }

    /// Prompt sent through the general chat endpoint. `None` for actions
    /// that have a dedicated endpoint.
    pub fn prompt(&self, selection: &str) -> Option<String> {
        match self {
            SelectionAction::Explain | SelectionAction::Translate | SelectionAction::Summarize => {
                None
            }
            SelectionAction::DefineTerms => Some(format!(
                "Define the following term or concept in detail, including:\n\
                 1. A precise definition\n\
                 2. What it means in the context of this document\n\
                 3. Related concepts or terms\n\n\
                 Term: \"{selection}\""
            )),
            SelectionAction::GiveExamples => Some(format!(
                "Illustrate the following passage with concrete examples to help me understand it:\n\n\
                 \"{selection}\"\n\n\
                 Please provide:\n\
                 1. Two or three concrete examples\n\
                 2. A short explanation of each example\n\
                 3. How each example relates to the passage"
            )),
            SelectionAction::AskQuestions => Some(format!(
                "Based on the following passage, write 3-5 review questions that check my understanding:\n\n\
                 \"{selection}\"\n\n\
                 Include:\n\
                 1. Basic comprehension questions\n\
                 2. Application questions\n\
                 3. Analysis questions\n\n\
                 Give a short reference answer after each question."
            )),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SelectionAction::Explain => "explain",
            SelectionAction::Translate => "translate",
            SelectionAction::Summarize => "summarize",
            SelectionAction::DefineTerms => "define",
            SelectionAction::GiveExamples => "examples",
            SelectionAction::AskQuestions => "questions",
        }
    }
}

/// Shorten a selection for display
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Put `text` on the system clipboard
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| anyhow!("Failed to access clipboard: {e}"))?;
    clipboard
        .set_text(text)
        .map_err(|e| anyhow!("Failed to copy text to clipboard: {e}"))?;
    debug!("Copied {} characters to clipboard", text.chars().count());
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

/// Conversation state for one document
#[derive(Debug)]
pub struct ChatSession {
    pdf_id: i64,
    current_page: usize,
    selection: Option<String>,
    conversation_id: Option<i64>,
    transcript: Vec<TranscriptEntry>,
}

impl ChatSession {
    pub fn new(pdf_id: i64) -> Self {
        Self {
            pdf_id,
            current_page: 1,
            selection: None,
            conversation_id: None,
            transcript: Vec::new(),
        }
    }

    /// Page sent along with selection-based requests
    pub fn set_current_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    /// Take `text` as the active selection. Whitespace-only text clears it.
    /// Returns whether a selection is active afterwards.
    pub fn select(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        self.selection = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self.selection.is_some()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn selection_preview(&self) -> Option<String> {
        self.selection.as_deref().map(preview)
    }

    /// Copy the selection to the clipboard and post the outcome as a toast.
    /// Returns false when nothing is selected.
    pub fn copy_selection(&self, notifications: &mut NotificationManager) -> bool {
        self.copy_selection_with(notifications, copy_to_clipboard)
    }

    fn copy_selection_with(
        &self,
        notifications: &mut NotificationManager,
        write: impl FnOnce(&str) -> Result<()>,
    ) -> bool {
        let Some(selection) = self.selection.as_deref() else {
            return false;
        };
        match write(selection) {
            Ok(()) => notifications.info("Copied to clipboard"),
            Err(e) => {
                warn!("{e:#}");
                notifications.warn("Copy failed");
            }
        }
        true
    }

    /// Quote the selection into a chat input draft
    pub fn compose_into_input(&self, input: &str) -> Option<String> {
        let selection = self.selection.as_deref()?;
        let current = input.trim();

        Some(if current.is_empty() {
            format!("About this passage: \"{selection}\"\n\nMy question is: ")
        } else {
            format!("{current}\n\n\"{selection}\"")
        })
    }

    pub fn conversation_id(&self) -> Option<i64> {
        self.conversation_id
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    fn push(&mut self, role: Role, content: impl Into<String>) {
        self.transcript.push(TranscriptEntry {
            role,
            content: content.into(),
        });
    }

    /// Request for a free-form message. Selection context is attached only
    /// while a selection is active.
    pub fn chat_request(&self, message: &str) -> ChatRequest {
        ChatRequest {
            pdf_id: self.pdf_id,
            message: message.to_string(),
            selected_text: self.selection.clone(),
            page_number: self.selection.as_ref().map(|_| self.current_page),
        }
    }

    /// Send a free-form message. A successful reply consumes the selection;
    /// after a failure it stays active for a retry.
    pub fn send(&mut self, client: &ApiClient, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            bail!("message is empty");
        }

        let request = self.chat_request(message);
        self.push(Role::User, message);

        let response = client.send_chat(&request)?;
        self.clear_selection();
        debug!(
            "Chat reply {} in conversation {}",
            response.message_id, response.conversation_id
        );
        self.conversation_id = Some(response.conversation_id);
        self.push(Role::Assistant, response.response.clone());
        Ok(response.response)
    }

    /// Run a quick action on the active selection
    pub fn run_action(&mut self, client: &ApiClient, action: SelectionAction) -> Result<String> {
        let selection = self
            .selection
            .clone()
            .context("no text selected")?;
        self.push(Role::User, action.echo(&selection));
        info!("Running {} on {}", action.label(), preview(&selection));

        let reply = match action {
            SelectionAction::Explain => client.explain(&ExplainRequest {
                pdf_id: self.pdf_id,
                selected_text: selection,
                page_number: self.current_page,
            })?,
            SelectionAction::Translate => client.translate(&TranslateRequest {
                pdf_id: self.pdf_id,
                selected_text: selection,
                target_language: settings::get_translate_language(),
            })?,
            SelectionAction::Summarize => client.summarize(&SummarizeRequest {
                pdf_id: self.pdf_id,
                selected_text: selection,
            })?,
            SelectionAction::DefineTerms
            | SelectionAction::GiveExamples
            | SelectionAction::AskQuestions => {
                let prompt = action.prompt(&selection).unwrap_or_default();
                let response = client.send_chat(&ChatRequest {
                    pdf_id: self.pdf_id,
                    message: prompt,
                    selected_text: Some(selection),
                    page_number: Some(self.current_page),
                })?;
                self.conversation_id = Some(response.conversation_id);
                response.response
            }
        };

        self.push(Role::Assistant, reply.clone());
        Ok(reply)
    }

    /// Fetch history and show the latest conversation
    pub fn load_history(&mut self, client: &ApiClient) -> Result<usize> {
        let histories = client.conversations(self.pdf_id)?;
        Ok(self.apply_history(histories))
    }

    /// Replace the transcript with the newest conversation's messages.
    /// Returns the number of messages shown.
    pub fn apply_history(&mut self, histories: Vec<ConversationHistory>) -> usize {
        self.transcript.clear();
        let Some(latest) = histories.into_iter().next() else {
            return 0;
        };

        self.conversation_id = Some(latest.conversation_id);
        for message in latest.messages {
            self.push(message.role, message.content);
        }
        self.transcript.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatMessage;
    use crate::notification::NotificationLevel;
    use chrono::NaiveDateTime;

    fn timestamp() -> NaiveDateTime {
        "2024-05-01T09:30:00".parse().unwrap()
    }

    #[test]
    fn select_trims_and_rejects_blank() {
        let mut session = ChatSession::new(1);

        assert!(session.select("  attention heads \n"));
        assert_eq!(session.selection(), Some("attention heads"));

        assert!(!session.select("   "));
        assert_eq!(session.selection(), None);
    }

    #[test]
    fn preview_truncates_long_selection() {
        let long = "x".repeat(150);
        let shown = preview(&long);
        assert_eq!(shown.len(), PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));

        assert_eq!(preview("short"), "short");
        assert_eq!(preview(&"y".repeat(100)), "y".repeat(100));
    }

    #[test]
    fn compose_seeds_or_appends() {
        let mut session = ChatSession::new(1);
        assert_eq!(session.compose_into_input("anything"), None);

        session.select("gradient descent");
        assert_eq!(
            session.compose_into_input("  ").unwrap(),
            "About this passage: \"gradient descent\"\n\nMy question is: "
        );
        assert_eq!(
            session.compose_into_input("Compare these:").unwrap(),
            "Compare these:\n\n\"gradient descent\""
        );
    }

    #[test]
    fn chat_request_carries_selection_context_only_when_selected() {
        let mut session = ChatSession::new(4);
        session.set_current_page(7);

        let plain = session.chat_request("Summarize section 2");
        assert_eq!(plain.selected_text, None);
        assert_eq!(plain.page_number, None);

        session.select("softmax");
        let contextual = session.chat_request("Why?");
        assert_eq!(contextual.selected_text.as_deref(), Some("softmax"));
        assert_eq!(contextual.page_number, Some(7));
    }

    #[test]
    fn templated_actions_embed_selection() {
        for action in [
            SelectionAction::DefineTerms,
            SelectionAction::GiveExamples,
            SelectionAction::AskQuestions,
        ] {
            let prompt = action.prompt("entropy").unwrap();
            assert!(prompt.contains("\"entropy\""), "{action:?}");
        }
        assert_eq!(SelectionAction::Explain.prompt("entropy"), None);
        assert_eq!(
            SelectionAction::Translate.echo("entropy"),
            "Please translate: \"entropy\""
        );
    }

    #[test]
    fn action_without_selection_fails_before_any_request() {
        let client = ApiClient::new("http://127.0.0.1:9/api").unwrap();
        let mut session = ChatSession::new(1);

        let err = session
            .run_action(&client, SelectionAction::Explain)
            .unwrap_err();
        assert_eq!(err.to_string(), "no text selected");
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn failed_send_keeps_selection_for_retry() {
        let client = ApiClient::new("http://127.0.0.1:9/api").unwrap();
        let mut session = ChatSession::new(1);
        session.set_current_page(3);
        session.select("residual connections");

        assert!(session.send(&client, "Why are these needed?").is_err());

        assert_eq!(session.selection(), Some("residual connections"));
        let retry = session.chat_request("Why are these needed?");
        assert_eq!(retry.selected_text.as_deref(), Some("residual connections"));
        assert_eq!(retry.page_number, Some(3));
    }

    #[test]
    fn copy_posts_toast_for_each_outcome() {
        let mut notifications = NotificationManager::new();
        let mut session = ChatSession::new(1);

        assert!(!session.copy_selection_with(&mut notifications, |_| Ok(())));
        assert!(notifications.current().is_none());

        session.select("  layer norm ");
        let mut copied = String::new();
        assert!(session.copy_selection_with(&mut notifications, |text| {
            copied = text.to_string();
            Ok(())
        }));
        assert_eq!(copied, "layer norm");
        let toast = notifications.current().unwrap();
        assert_eq!(toast.message, "Copied to clipboard");
        assert_eq!(toast.level, NotificationLevel::Info);

        assert!(session.copy_selection_with(&mut notifications, |_| bail!("no display")));
        let toast = notifications.current().unwrap();
        assert_eq!(toast.message, "Copy failed");
        assert_eq!(toast.level, NotificationLevel::Warning);
        assert!(!toast.is_blocking());
    }

    #[test]
    fn history_shows_latest_conversation() {
        let mut session = ChatSession::new(2);
        let message = |role, content: &str| ChatMessage {
            role,
            content: content.to_string(),
            selected_text: None,
            page_number: None,
            action_type: None,
        };
        let histories = vec![
            ConversationHistory {
                conversation_id: 9,
                pdf_id: 2,
                title: None,
                messages: vec![
                    message(Role::User, "What is this about?"),
                    message(Role::Assistant, "Transformers."),
                ],
                created_at: timestamp(),
                updated_at: timestamp(),
            },
            ConversationHistory {
                conversation_id: 3,
                pdf_id: 2,
                title: None,
                messages: vec![message(Role::User, "old")],
                created_at: timestamp(),
                updated_at: timestamp(),
            },
        ];

        assert_eq!(session.apply_history(histories), 2);
        assert_eq!(session.conversation_id(), Some(9));
        assert_eq!(session.transcript()[1].content, "Transformers.");

        assert_eq!(session.apply_history(Vec::new()), 0);
        assert!(session.transcript().is_empty());
    }
}
