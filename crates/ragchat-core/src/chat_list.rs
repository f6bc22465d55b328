//! Chat list coordinator
//!
//! Keeps the sidebar's copy of `GET /chats`. Every change of the active chat
//! triggers a full refetch; results replace the list wholesale. A failed fetch
//! keeps whatever was shown before.

use crate::error::ClientError;
use crate::model::ChatSummary;

/// Sequence number of a list fetch. Only the newest one may land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListTicket(pub u64);

#[derive(Debug)]
pub struct ListCompletion {
    pub ticket: ListTicket,
    pub result: Result<Vec<ChatSummary>, ClientError>,
}

#[derive(Debug, Default)]
pub struct ChatList {
    chats: Vec<ChatSummary>,
    loading: bool,
    active: Option<i64>,
    highlighted: Option<usize>,
    seq: u64,
}

impl ChatList {
    pub fn new() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    /// True until the first fetch has resolved, successfully or not.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn active(&self) -> Option<i64> {
        self.active
    }

    /// Record the new active chat and issue a ticket for the refetch.
    pub fn refresh(&mut self, active_chat_id: i64) -> ListTicket {
        self.active = Some(active_chat_id);
        self.seq += 1;
        self.follow_active();
        ListTicket(self.seq)
    }

    /// Returns false when the completion was superseded by a newer refresh.
    pub fn apply(&mut self, completion: ListCompletion) -> bool {
        if completion.ticket.0 < self.seq {
            tracing::debug!(
                ticket = completion.ticket.0,
                newest = self.seq,
                "discarding superseded chat list"
            );
            return false;
        }

        self.loading = false;
        match completion.result {
            Ok(chats) => {
                tracing::debug!(count = chats.len(), "chat list refreshed");
                self.chats = chats;
                self.follow_active();
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not refresh chat list, keeping previous one");
            }
        }
        true
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn highlighted_chat(&self) -> Option<&ChatSummary> {
        self.highlighted.and_then(|i| self.chats.get(i))
    }

    pub fn select_next(&mut self) {
        let len = self.chats.len();
        if len > 0 {
            let i = self.highlighted.map(|i| (i + 1).min(len - 1)).unwrap_or(0);
            self.highlighted = Some(i);
        }
    }

    pub fn select_prev(&mut self) {
        if !self.chats.is_empty() {
            let i = self.highlighted.map(|i| i.saturating_sub(1)).unwrap_or(0);
            self.highlighted = Some(i);
        }
    }

    pub fn select_index(&mut self, index: usize) -> Option<&ChatSummary> {
        if index < self.chats.len() {
            self.highlighted = Some(index);
        }
        self.highlighted_chat()
    }

    fn follow_active(&mut self) {
        let position = self
            .active
            .and_then(|id| self.chats.iter().position(|c| c.id == id));
        if position.is_some() {
            self.highlighted = position;
        } else if self.chats.is_empty() {
            self.highlighted = None;
        } else {
            self.highlighted = Some(self.highlighted.unwrap_or(0).min(self.chats.len() - 1));
        }
    }
}
