//! Session state machine
//!
//! One `Session` holds the conversation and composer state of the chat that is
//! currently open. Backend work is described by `SessionRequest`s that the
//! caller runs; their results come back as `Completion`s carrying the ticket
//! of the session that issued them. A completion whose ticket no longer
//! matches is dropped, so a late reply can't land in another chat.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::composer::{Composer, ComposerAction, EditOp};
use crate::error::{ClientError, ComposerError};
use crate::model::{Chat, FileHandle, IngestReceipt, LocalToken, Message, SendReply, Sender};

pub const SEND_ERROR_TEXT: &str = "Sorry, there was an error processing your message.";

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Identifies one mounted session: the chat plus a process-wide epoch, so
/// reopening the same chat still yields a fresh ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub chat_id: i64,
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// History fetch in flight; composer disabled.
    Loading,
    Idle,
    SendingText,
    UploadingFile(FileHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    LoadHistory,
    SendMessage { text: String },
    UploadFile { file: FileHandle },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub ticket: Ticket,
    pub request: Request,
}

#[derive(Debug)]
pub enum Outcome {
    History(Result<Chat, ClientError>),
    Sent(Result<SendReply, ClientError>),
    Ingested(Result<IngestReceipt, ClientError>),
}

#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Stale,
}

pub fn uploading_text(name: &str) -> String {
    format!("Uploading file: \"{}\"", name)
}

pub fn uploaded_text(name: &str) -> String {
    format!("File \"{}\" uploaded and processed successfully", name)
}

pub fn upload_error_text(name: &str) -> String {
    format!("Error uploading file \"{}\". Please try again.", name)
}

#[derive(Debug)]
pub struct Session {
    ticket: Ticket,
    messages: Vec<Message>,
    phase: Phase,
    composer: Composer,
    next_token: u64,
}

impl Session {
    /// Mount a session for `chat_id`. It starts in `Loading`; dispatch
    /// `load_request()` to fetch the history.
    pub fn open(chat_id: i64) -> Self {
        let epoch = NEXT_EPOCH.fetch_add(1, Ordering::Relaxed);
        Self {
            ticket: Ticket { chat_id, epoch },
            messages: Vec::new(),
            phase: Phase::Loading,
            composer: Composer::new(),
            next_token: 0,
        }
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn chat_id(&self) -> i64 {
        self.ticket.chat_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// A send or upload is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::SendingText | Phase::UploadingFile(_))
    }

    pub fn load_request(&self) -> Option<SessionRequest> {
        self.is_loading().then(|| self.request(Request::LoadHistory))
    }

    pub fn edit(&mut self, op: EditOp) -> Result<(), ComposerError> {
        if !self.is_idle() {
            return Err(ComposerError::Disabled);
        }
        self.composer.apply(ComposerAction::Edit(op))
    }

    /// Allowed in any phase; the file only goes out with the next submit.
    pub fn select_file(&mut self, file: FileHandle) {
        tracing::debug!(chat_id = self.chat_id(), file = %file.name, "file selected");
        // SelectFile never fails
        let _ = self.composer.apply(ComposerAction::SelectFile(file));
    }

    /// Drop the selected file and any text. Only while idle.
    pub fn cancel(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }
        let _ = self.composer.apply(ComposerAction::Cancel);
        true
    }

    /// Start a send or upload from the composer contents.
    ///
    /// Returns `None` (and changes nothing) when not idle or when there is
    /// neither text nor a file to submit.
    pub fn submit(&mut self) -> Option<SessionRequest> {
        if !self.is_idle() {
            return None;
        }

        if let Some(file) = self.composer.selected_file().cloned() {
            self.push_local(Sender::User, uploading_text(&file.name));
            self.composer.take_input();
            tracing::info!(chat_id = self.chat_id(), file = %file.name, "uploading file");
            self.phase = Phase::UploadingFile(file.clone());
            return Some(self.request(Request::UploadFile { file }));
        }

        if self.composer.input().trim().is_empty() {
            return None;
        }

        let text = self.composer.take_input();
        self.push_local(Sender::User, text.clone());
        tracing::info!(chat_id = self.chat_id(), len = text.len(), "sending message");
        self.phase = Phase::SendingText;
        Some(self.request(Request::SendMessage { text }))
    }

    /// Fold a backend result into the session, unless it is stale.
    pub fn apply(&mut self, completion: Completion) -> Applied {
        if completion.ticket != self.ticket {
            tracing::debug!(
                active = ?self.ticket,
                stale = ?completion.ticket,
                "discarding response for a session that is no longer open"
            );
            return Applied::Stale;
        }

        match completion.outcome {
            Outcome::History(result) if self.is_loading() => {
                match result {
                    Ok(chat) => self.messages = chat.messages,
                    Err(e) => {
                        tracing::warn!(chat_id = self.chat_id(), error = %e, "could not load chat history");
                        self.messages.clear();
                    }
                }
                self.phase = Phase::Idle;
            }
            Outcome::Sent(result) if self.phase == Phase::SendingText => {
                match result {
                    Ok(reply) => {
                        self.messages.push(Message::committed(
                            reply.message_id,
                            Sender::Assistant,
                            reply.response,
                        ));
                        let _ = self.composer.apply(ComposerAction::Submitted);
                    }
                    Err(e) => {
                        tracing::warn!(chat_id = self.chat_id(), error = %e, "send failed");
                        self.push_local(Sender::Assistant, SEND_ERROR_TEXT);
                        let _ = self.composer.apply(ComposerAction::Errored);
                    }
                }
                self.phase = Phase::Idle;
            }
            Outcome::Ingested(result) if matches!(self.phase, Phase::UploadingFile(_)) => {
                let name = match std::mem::replace(&mut self.phase, Phase::Idle) {
                    Phase::UploadingFile(file) => file.name,
                    _ => String::new(),
                };
                match result {
                    Ok(receipt) => {
                        tracing::info!(chat_id = self.chat_id(), file = %name, success = receipt.success, "file ingested");
                        self.push_local(Sender::Assistant, uploaded_text(&name));
                        let _ = self.composer.apply(ComposerAction::Submitted);
                    }
                    Err(e) => {
                        tracing::warn!(chat_id = self.chat_id(), file = %name, error = %e, "upload failed");
                        self.push_local(Sender::Assistant, upload_error_text(&name));
                        let _ = self.composer.apply(ComposerAction::Errored);
                    }
                }
            }
            outcome => {
                tracing::debug!(phase = ?self.phase, ?outcome, "discarding response that does not match the current phase");
                return Applied::Stale;
            }
        }
        Applied::Applied
    }

    fn request(&self, request: Request) -> SessionRequest {
        SessionRequest {
            ticket: self.ticket,
            request,
        }
    }

    fn push_local(&mut self, sender: Sender, content: impl Into<String>) {
        let token = LocalToken(self.next_token);
        self.next_token += 1;
        self.messages.push(Message::pending(token, sender, content));
    }
}
