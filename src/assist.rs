//! Best-effort text generation.
//!
//! Callers always get a usable string back: the original draft when
//! improving text, or [`SUMMARY_FAILURE`] when summarizing. Errors stop here
//! and are only logged.

use crate::config::AssistConfig;
use crate::model::LogEntry;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const SUMMARY_FAILURE: &str = "Unable to generate a summary right now. Please try again later.";
pub const NOTHING_TO_SUMMARIZE: &str = "No log entries to summarize.";

const IMPROVE_INSTRUCTIONS: &str = "You help an intern write clear, professional \
internship records. Rewrite the text you are given so it is specific and well \
structured. Keep every fact, do not invent new ones, and reply with the rewritten \
text only.";

const SUMMARY_INSTRUCTIONS: &str = "You summarize an intern's daily activity logs. \
Write a single paragraph covering the main work done, skills practised and \
notable outcomes. Reply with the paragraph only.";

#[derive(thiserror::Error, Debug)]
pub enum AssistError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("empty completion")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Anything that can turn a conversation into a reply.
pub trait CompletionBackend {
    fn complete(&self, messages: &[Message]) -> Result<String, AssistError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `chat/completions` client.
pub struct ChatCompletionsClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl ChatCompletionsClient {
    pub fn from_config(config: &AssistConfig) -> Result<Self, AssistError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AssistError::MissingCredential)?;
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(ChatCompletionsClient {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl CompletionBackend for ChatCompletionsClient {
    fn complete(&self, messages: &[Message]) -> Result<String, AssistError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, messages = messages.len(), "sending completion request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AssistError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ChatResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AssistError::EmptyResponse)
    }
}

/// Front door for the text features. Disabled when no backend is configured.
pub struct TextAssistant {
    backend: Option<Box<dyn CompletionBackend>>,
}

impl TextAssistant {
    pub fn from_config(config: &AssistConfig) -> Self {
        match ChatCompletionsClient::from_config(config) {
            Ok(client) => Self::with_backend(client),
            Err(err) => {
                debug!(%err, "text assistant disabled");
                Self::disabled()
            }
        }
    }

    pub fn with_backend(backend: impl CompletionBackend + 'static) -> Self {
        TextAssistant {
            backend: Some(Box::new(backend)),
        }
    }

    pub fn disabled() -> Self {
        TextAssistant { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Improved version of `draft`, or `draft` itself if anything goes wrong.
    pub fn improve_text(&self, draft: &str, context: &str) -> String {
        if draft.trim().is_empty() {
            return draft.to_string();
        }
        let messages = [
            Message::system(IMPROVE_INSTRUCTIONS),
            Message::user(format!("Context: {context}\n\nText:\n{draft}")),
        ];
        match self.ask(&messages) {
            Ok(text) => text,
            Err(err) => {
                warn!(%err, "text improvement failed, keeping original");
                draft.to_string()
            }
        }
    }

    pub fn summarize_logs(&self, logs: &[&LogEntry]) -> String {
        if logs.is_empty() {
            return NOTHING_TO_SUMMARIZE.to_string();
        }
        let entries = logs
            .iter()
            .map(|l| format_log(l))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = [
            Message::system(SUMMARY_INSTRUCTIONS),
            Message::user(format!("Daily logs:\n{entries}")),
        ];
        match self.ask(&messages) {
            Ok(text) => text,
            Err(err) => {
                warn!(%err, entries = logs.len(), "log summary failed");
                SUMMARY_FAILURE.to_string()
            }
        }
    }

    fn ask(&self, messages: &[Message]) -> Result<String, AssistError> {
        let backend = self.backend.as_ref().ok_or(AssistError::MissingCredential)?;
        let reply = backend.complete(messages)?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(AssistError::EmptyResponse);
        }
        Ok(reply.to_string())
    }
}

fn format_log(log: &LogEntry) -> String {
    let mut line = format!(
        "- {} [{}, {}h] {}: {}",
        log.date,
        log.category.as_str(),
        log.hours,
        log.title,
        log.description
    );
    if let Some(learnings) = log.learnings.as_deref().filter(|l| !l.is_empty()) {
        line.push_str(&format!(" (learned: {learnings})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogCategory;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Canned {
        reply: Option<&'static str>,
        seen: Rc<RefCell<Vec<Vec<Message>>>>,
    }

    impl CompletionBackend for Canned {
        fn complete(&self, messages: &[Message]) -> Result<String, AssistError> {
            self.seen.borrow_mut().push(messages.to_vec());
            self.reply
                .map(str::to_string)
                .ok_or(AssistError::Status {
                    status: 500,
                    body: "boom".into(),
                })
        }
    }

    fn assistant(reply: Option<&'static str>) -> (TextAssistant, Rc<RefCell<Vec<Vec<Message>>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let backend = Canned {
            reply,
            seen: Rc::clone(&seen),
        };
        (TextAssistant::with_backend(backend), seen)
    }

    fn entry(title: &str) -> LogEntry {
        LogEntry::new(
            "abc123".into(),
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            title.into(),
            "paired on the importer".into(),
            LogCategory::Development,
            6.0,
            vec![],
            Some("serde attributes".into()),
        )
    }

    #[test]
    fn improve_returns_trimmed_reply() {
        let (assistant, seen) = assistant(Some("  Polished text.\n"));
        let out = assistant.improve_text("did stuff", "daily log description");
        assert_eq!(out, "Polished text.");
        let calls = seen.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].role, Role::System);
        assert!(calls[0][1].content.contains("daily log description"));
        assert!(calls[0][1].content.contains("did stuff"));
    }

    #[test]
    fn improve_falls_back_to_draft() {
        let (failing, _) = assistant(None);
        assert_eq!(failing.improve_text("draft", "ctx"), "draft");

        let (blank, _) = assistant(Some("   "));
        assert_eq!(blank.improve_text("draft", "ctx"), "draft");

        assert_eq!(TextAssistant::disabled().improve_text("draft", "ctx"), "draft");
    }

    #[test]
    fn blank_draft_skips_the_call() {
        let (assistant, seen) = assistant(Some("invented"));
        assert_eq!(assistant.improve_text("  ", "ctx"), "  ");
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn summarize_sends_every_entry() {
        let (assistant, seen) = assistant(Some("A productive week."));
        let a = entry("Importer");
        let b = entry("Code review");
        assert_eq!(assistant.summarize_logs(&[&a, &b]), "A productive week.");
        let calls = seen.borrow();
        let prompt = &calls[0][1].content;
        assert!(prompt.contains("Importer"));
        assert!(prompt.contains("Code review"));
        assert!(prompt.contains("learned: serde attributes"));
    }

    #[test]
    fn summarize_failures_use_fixed_message() {
        let (failing, _) = assistant(None);
        let a = entry("Importer");
        assert_eq!(failing.summarize_logs(&[&a]), SUMMARY_FAILURE);
        assert_eq!(TextAssistant::disabled().summarize_logs(&[&a]), SUMMARY_FAILURE);

        let (idle, seen) = assistant(Some("unused"));
        assert_eq!(idle.summarize_logs(&[]), NOTHING_TO_SUMMARIZE);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn missing_key_disables_assistant() {
        let config = AssistConfig::default();
        assert!(!TextAssistant::from_config(&config).is_enabled());
        assert!(matches!(
            ChatCompletionsClient::from_config(&config),
            Err(AssistError::MissingCredential)
        ));
    }
}
