//! Run backend calls off the UI loop.
//!
//! Each call becomes a tokio task that reports back through an unbounded
//! channel. Tasks are never cancelled; the receiving side decides whether a
//! result is still wanted (see `Session::apply` and `ChatList::apply`).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chat_list::{ListCompletion, ListTicket};
use crate::client::ChatBackend;
use crate::error::ClientError;
use crate::model::ChatCreated;
use crate::session::{Completion, Outcome, Request, SessionRequest};

#[derive(Debug)]
pub enum BackendEvent {
    Session(Completion),
    ChatList(ListCompletion),
    ChatCreated(Result<ChatCreated, ClientError>),
}

pub type EventSender = mpsc::UnboundedSender<BackendEvent>;

fn deliver(tx: &EventSender, event: BackendEvent) {
    if tx.send(event).is_err() {
        tracing::debug!("event loop gone, dropping backend result");
    }
}

pub fn spawn_session_request(
    backend: Arc<dyn ChatBackend>,
    request: SessionRequest,
    tx: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let chat_id = request.ticket.chat_id;
        let outcome = match request.request {
            Request::LoadHistory => Outcome::History(backend.get_chat(chat_id).await),
            Request::SendMessage { text } => {
                Outcome::Sent(backend.send_message(chat_id, &text).await)
            }
            Request::UploadFile { file } => {
                Outcome::Ingested(backend.upload_file(&file, chat_id).await)
            }
        };
        deliver(
            &tx,
            BackendEvent::Session(Completion {
                ticket: request.ticket,
                outcome,
            }),
        );
    })
}

pub fn spawn_list_refresh(
    backend: Arc<dyn ChatBackend>,
    ticket: ListTicket,
    tx: EventSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = backend.list_chats().await;
        deliver(&tx, BackendEvent::ChatList(ListCompletion { ticket, result }));
    })
}

pub fn spawn_create_chat(backend: Arc<dyn ChatBackend>, tx: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = backend.create_chat().await;
        deliver(&tx, BackendEvent::ChatCreated(result));
    })
}
