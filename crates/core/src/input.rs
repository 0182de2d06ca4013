//! Async input collection
//!
//! Finalize routines suspend on an [`InputCollector`] to ask the user for a
//! real-world distance, a dimension value or a line of text. [`ModalInput`]
//! is the collector backing a modal dialog: the engine side awaits the
//! answer, the host side reads the open [`Prompt`] and resolves it with
//! [`ModalInput::submit`] or [`ModalInput::cancel`]. Only one prompt can be
//! open at a time.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// Errors raised by input collection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// Another prompt is still waiting for an answer
    #[error("another prompt is already open")]
    Busy,
}

pub type InputResult<T> = Result<T, InputError>;

/// Source of user-supplied values
///
/// `Ok(None)` means the user cancelled or entered an unusable value.
#[async_trait(?Send)]
pub trait InputCollector {
    /// Ask for a strictly positive number, pre-filled with `default`
    async fn collect_number(
        &self,
        title: &str,
        label: &str,
        default: &str,
    ) -> InputResult<Option<f32>>;

    /// Ask for a non-empty line of text
    async fn collect_text(&self, title: &str, label: &str) -> InputResult<Option<String>>;
}

/// Parse a numeric answer
///
/// Accepts a comma as decimal separator. Non-numeric, non-finite and
/// non-positive input yields `None`.
pub fn parse_number(raw: &str) -> Option<f32> {
    raw.trim()
        .replace(',', ".")
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

/// Parse a text answer; blank input yields `None`
pub fn parse_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// What kind of answer a prompt expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Number,
    Text,
}

/// An open prompt, as shown by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub label: String,
    pub default: String,
    pub kind: PromptKind,
}

struct Pending {
    prompt: Prompt,
    responder: oneshot::Sender<Option<String>>,
}

/// Modal dialog collector with a single resolution slot
#[derive(Clone, Default)]
pub struct ModalInput {
    slot: Arc<Mutex<Option<Pending>>>,
}

impl std::fmt::Debug for ModalInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalInput").field("open", &self.prompt()).finish()
    }
}

impl ModalInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// The prompt currently waiting for an answer
    pub fn prompt(&self) -> Option<Prompt> {
        self.slot
            .lock()
            .as_ref()
            .filter(|pending| !pending.responder.is_closed())
            .map(|pending| pending.prompt.clone())
    }

    pub fn is_open(&self) -> bool {
        self.prompt().is_some()
    }

    /// Resolve the open prompt with raw user input (confirm button or Enter)
    ///
    /// Returns false when no prompt is open.
    pub fn submit(&self, raw: &str) -> bool {
        self.resolve(Some(raw.to_string()))
    }

    /// Resolve the open prompt with no value (Escape, overlay click, cancel)
    pub fn cancel(&self) -> bool {
        self.resolve(None)
    }

    fn resolve(&self, answer: Option<String>) -> bool {
        let Some(pending) = self.slot.lock().take() else {
            return false;
        };
        debug!(title = %pending.prompt.title, answered = answer.is_some(), "prompt resolved");
        pending.responder.send(answer).is_ok()
    }

    async fn ask(&self, prompt: Prompt) -> InputResult<Option<String>> {
        let receiver = {
            let mut slot = self.slot.lock();
            // a prompt whose caller went away no longer holds the slot
            if slot.as_ref().is_some_and(|p| !p.responder.is_closed()) {
                return Err(InputError::Busy);
            }
            let (responder, receiver) = oneshot::channel();
            debug!(title = %prompt.title, "prompt opened");
            *slot = Some(Pending { prompt, responder });
            receiver
        };
        // a dropped responder counts as a cancellation
        Ok(receiver.await.unwrap_or(None))
    }
}

#[async_trait(?Send)]
impl InputCollector for ModalInput {
    async fn collect_number(
        &self,
        title: &str,
        label: &str,
        default: &str,
    ) -> InputResult<Option<f32>> {
        let answer = self
            .ask(Prompt {
                title: title.to_string(),
                label: label.to_string(),
                default: default.to_string(),
                kind: PromptKind::Number,
            })
            .await?;
        Ok(answer.as_deref().and_then(parse_number))
    }

    async fn collect_text(&self, title: &str, label: &str) -> InputResult<Option<String>> {
        let answer = self
            .ask(Prompt {
                title: title.to_string(),
                label: label.to_string(),
                default: String::new(),
                kind: PromptKind::Text,
            })
            .await?;
        Ok(answer.as_deref().and_then(parse_text))
    }
}
