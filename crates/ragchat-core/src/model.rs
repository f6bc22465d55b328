//! UI-agnostic chat types
//!
//! Wire types for the backend's JSON payloads and the domain types the
//! session and chat list hold. Nothing here depends on a UI framework.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FileError;

/// Extensions the backend knows how to ingest.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "pdf", "docx"];

const PREVIEW_CHARS: usize = 30;

/// Placeholder for messages that exist only on this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalToken(pub u64);

/// Identity of a message in the conversation.
///
/// Backend ids and local placeholders live in separate spaces so an optimistic
/// echo can never be mistaken for (or collide with) a persisted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    Pending(LocalToken),
    Committed(i64),
}

impl MessageId {
    pub fn is_pending(&self) -> bool {
        matches!(self, MessageId::Pending(_))
    }

    pub fn committed(&self) -> Option<i64> {
        match self {
            MessageId::Committed(id) => Some(*id),
            MessageId::Pending(_) => None,
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
}

impl Message {
    pub fn pending(token: LocalToken, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::Pending(token),
            content: content.into(),
            sender,
        }
    }

    pub fn committed(id: i64, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::Committed(id),
            content: content.into(),
            sender,
        }
    }
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(alias = "message_id")]
    id: i64,
    content: String,
    sender: Sender,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Message::committed(wire.id, wire.sender, wire.content)
    }
}

#[derive(Deserialize)]
struct WireChat {
    #[serde(alias = "chat_id")]
    id: i64,
    #[serde(default)]
    messages: Vec<WireMessage>,
}

/// Full message history of one chat, as returned by `GET /chat/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "WireChat")]
pub struct Chat {
    pub id: i64,
    pub messages: Vec<Message>,
}

impl From<WireChat> for Chat {
    fn from(wire: WireChat) -> Self {
        Self {
            id: wire.id,
            messages: wire.messages.into_iter().map(Message::from).collect(),
        }
    }
}

/// Message as listed by `GET /chats` (no ids there).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreviewMessage {
    pub content: String,
    pub sender: Sender,
}

/// One entry of the sidebar chat list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatSummary {
    pub id: i64,
    #[serde(default)]
    pub messages: Vec<PreviewMessage>,
}

impl ChatSummary {
    /// Sidebar label: the opening message, shortened, or "New Chat".
    pub fn preview(&self) -> String {
        match self.messages.first() {
            Some(first) if !first.content.is_empty() => {
                if first.content.chars().count() > PREVIEW_CHARS {
                    let head: String = first.content.chars().take(PREVIEW_CHARS).collect();
                    format!("{}...", head)
                } else {
                    first.content.clone()
                }
            }
            _ => "New Chat".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatCreated {
    pub chat_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendReply {
    #[serde(default)]
    pub chat_id: Option<i64>,
    pub message_id: i64,
    pub response: String,
}

#[derive(Serialize)]
pub(crate) struct SendRequest<'a> {
    pub chat_id: i64,
    pub input: &'a str,
}

/// Ingestion result. Only `success` is known, the rest is kept as-is.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngestReceipt {
    #[serde(default)]
    pub success: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A local file picked for ingestion. Contents are read at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub name: String,
}

impl FileHandle {
    /// Validate `path` and build a handle for it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FileError::Missing(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(FileError::NotAFile(path.to_path_buf()));
        }

        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                SUPPORTED_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false);
        if !supported {
            return Err(FileError::Unsupported(path.to_path_buf()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            name,
        })
    }
}
