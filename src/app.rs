//! Widget state: input buffer, rendered bubbles, conversation history, and
//! the submit/completion state machine around the single in-flight request.

use std::path::PathBuf;

use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::api::{ApiError, ChatClient};
use crate::transcript;

/// Shown when the server cannot be reached or answers with something other
/// than the chat envelope.
pub const CONNECT_ERROR: &str =
    "Could not reach the server. Check that it is running and try again.";
/// Shown when the backend reports a failure without an error message.
pub const BACKEND_ERROR_FALLBACK: &str =
    "The assistant could not process that message. Please try again.";

/// Wire-level attribution of a conversation turn. The tags are fixed by the
/// backend: it maps `Usuario` to the user role and everything else to the
/// model role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "Usuario")]
    User,
    #[serde(rename = "Bot")]
    Bot,
}

/// One message of the conversation as the backend sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    User,
    Bot,
    Error,
}

/// One rendered chat message. Display-only: error bubbles never enter the
/// history that is sent back to the server.
#[derive(Debug, Clone)]
pub struct Bubble {
    pub kind: BubbleKind,
    pub text: String,
}

impl Bubble {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            kind: BubbleKind::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            kind: BubbleKind::Bot,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: BubbleKind::Error,
            text: text.into(),
        }
    }
}

pub struct App {
    pub should_quit: bool,

    // Input state
    pub input: String,
    pub cursor: usize, // char index into `input`

    // Conversation state
    pub bubbles: Vec<Bubble>,
    pub history: Vec<Turn>,

    // The single in-flight request, plus the trimmed text it carries so the
    // history entries can be committed once the reply arrives.
    pending: Option<JoinHandle<Result<String, ApiError>>>,
    in_flight: Option<String>,

    // Chat area scroll state (dimensions updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub status: Option<String>,

    pub client: ChatClient,
    pub transcript_path: PathBuf,
}

impl App {
    pub fn new(client: ChatClient, transcript_path: PathBuf) -> Self {
        Self {
            should_quit: false,
            input: String::new(),
            cursor: 0,
            bubbles: Vec::new(),
            history: Vec::new(),
            pending: None,
            in_flight: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            status: None,
            client,
            transcript_path,
        }
    }

    pub fn is_sending(&self) -> bool {
        self.pending.is_some()
    }

    /// Submit the current input. Whitespace-only input is a silent no-op, and
    /// submitting is guarded while a request is in flight. The user bubble is
    /// rendered and the input cleared immediately, before the network round
    /// trip; only the history append waits for backend confirmation.
    pub fn submit(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }

        self.input.clear();
        self.cursor = 0;
        self.bubbles.push(Bubble::user(text.clone()));

        let client = self.client.clone();
        let history = self.history.clone();
        let message = text.clone();
        self.pending = Some(tokio::spawn(async move {
            client.send_message(&message, &history).await
        }));
        self.in_flight = Some(text);
        self.scroll_to_bottom();
    }

    /// Harvest the in-flight request if it has finished. On success the bot
    /// bubble is rendered and exactly two turns are appended to the history;
    /// on any failure an error bubble is rendered and the history stays
    /// untouched. Either way the widget is idle again afterwards.
    pub async fn poll_response(&mut self) {
        let finished = matches!(&self.pending, Some(task) if task.is_finished());
        if !finished {
            return;
        }
        let Some(task) = self.pending.take() else {
            return;
        };
        let sent = self.in_flight.take();

        match task.await {
            Ok(Ok(reply)) => {
                info!("reply received ({} chars)", reply.len());
                if let Some(text) = sent {
                    self.history.push(Turn {
                        sender: Sender::User,
                        text,
                    });
                    self.history.push(Turn {
                        sender: Sender::Bot,
                        text: reply.clone(),
                    });
                }
                self.bubbles.push(Bubble::bot(reply));
            }
            Ok(Err(ApiError::Backend { message })) => {
                let message = message.unwrap_or_else(|| BACKEND_ERROR_FALLBACK.to_string());
                error!("backend failure: {message}");
                self.bubbles.push(Bubble::error(message));
            }
            Ok(Err(err)) => {
                error!("request failed: {err}");
                self.bubbles.push(Bubble::error(CONNECT_ERROR));
            }
            Err(err) => {
                error!("request task aborted: {err}");
                self.bubbles.push(Bubble::error(CONNECT_ERROR));
            }
        }
        self.scroll_to_bottom();
    }

    /// Tick animation frame while waiting on the backend.
    pub fn tick_animation(&mut self) {
        if self.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1).min(self.total_lines());
    }

    pub fn scroll_page_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(self.chat_height.max(1));
    }

    pub fn scroll_page_down(&mut self) {
        self.chat_scroll = self
            .chat_scroll
            .saturating_add(self.chat_height.max(1))
            .min(self.total_lines());
    }

    /// Pin the viewport to the newest message.
    pub fn scroll_to_bottom(&mut self) {
        let total = self.total_lines();
        let visible = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.chat_scroll = total.saturating_sub(visible);
    }

    /// Estimate the rendered line count of the chat area, accounting for
    /// wrapping. Character counts are used rather than byte lengths so
    /// multi-byte text wraps the same way it renders.
    fn total_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total: u16 = 0;
        for bubble in &self.bubbles {
            total += 1; // avatar/label line
            for line in bubble.text.lines() {
                let chars = line.chars().count();
                if chars == 0 {
                    total += 1;
                } else {
                    total += (chars / wrap_width + 1) as u16;
                }
            }
            total += 1; // gap after bubble
        }

        if self.is_sending() {
            total += 2; // label plus "Thinking..." line
        }
        total
    }

    /// Write the conversation so far to an HTML file and surface the outcome
    /// in the status line.
    pub fn export_transcript(&mut self) {
        match transcript::export(&self.transcript_path, &self.bubbles) {
            Ok(()) => {
                info!("transcript written to {}", self.transcript_path.display());
                self.status = Some(format!(
                    "Transcript saved to {}",
                    self.transcript_path.display()
                ));
            }
            Err(err) => {
                error!("transcript export failed: {err:#}");
                self.status = Some(format!("Transcript export failed: {err}"));
            }
        }
    }
}
