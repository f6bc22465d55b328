pub mod chat_list;
pub mod client;
pub mod composer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod session;

// Re-export main types for convenience
pub use chat_list::{ChatList, ListCompletion, ListTicket};
pub use client::{ChatBackend, HttpBackend};
pub use composer::{Composer, ComposerAction, EditOp};
pub use config::{ApiConfig, Config, Environment, Overrides};
pub use dispatch::{BackendEvent, EventSender};
pub use error::{ClientError, ComposerError, FileError};
pub use model::{Chat, ChatSummary, FileHandle, Message, MessageId, Sender};
pub use session::{Applied, Completion, Phase, Session, SessionRequest, Ticket};
