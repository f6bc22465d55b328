use std::path::PathBuf;
use std::sync::Arc;

use ragchat_core::dispatch::{spawn_create_chat, spawn_list_refresh, spawn_session_request};
use ragchat_core::{
    Applied, BackendEvent, ChatBackend, ChatList, ComposerError, EditOp, EventSender, FileHandle,
    Session,
};
use ratatui::layout::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Composer,
}

/// Popup for typing the path of a file to upload.
#[derive(Debug, Clone, Default)]
pub struct FilePrompt {
    pub input: String,
    pub error: Option<String>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: Focus,

    // Backend access
    pub backend: Arc<dyn ChatBackend>,
    pub events: EventSender,
    pub base_url: String,

    // Active chat and sidebar
    pub session: Option<Session>,
    pub chat_list: ChatList,
    pub creating_chat: bool,
    pub create_failed: bool,

    // Popups and transient hints
    pub file_prompt: Option<FilePrompt>,
    pub notice: Option<String>,

    // Conversation view
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the conversation pane
    pub chat_width: u16,  // Inner width, for wrap calculations
    pub sidebar_offset: usize,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(backend: Arc<dyn ChatBackend>, base_url: impl Into<String>, events: EventSender) -> Self {
        Self {
            should_quit: false,
            focus: Focus::Composer,

            backend,
            events,
            base_url: base_url.into(),

            session: None,
            chat_list: ChatList::new(),
            creating_chat: false,
            create_failed: false,

            file_prompt: None,
            notice: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            sidebar_offset: 0,

            animation_frame: 0,

            sidebar_area: None,
            chat_area: None,
        }
    }

    pub fn active_chat_id(&self) -> Option<i64> {
        self.session.as_ref().map(|s| s.chat_id())
    }

    /// Ask the backend for a fresh chat; it becomes active when created.
    pub fn create_new_chat(&mut self) {
        if self.creating_chat {
            return;
        }
        self.creating_chat = true;
        self.create_failed = false;
        spawn_create_chat(self.backend.clone(), self.events.clone());
    }

    /// Mount a new session for `chat_id` and refresh the sidebar.
    pub fn activate_chat(&mut self, chat_id: i64) {
        tracing::info!(chat_id, "opening chat");
        let session = Session::open(chat_id);
        if let Some(request) = session.load_request() {
            spawn_session_request(self.backend.clone(), request, self.events.clone());
        }
        self.session = Some(session);

        let ticket = self.chat_list.refresh(chat_id);
        spawn_list_refresh(self.backend.clone(), ticket, self.events.clone());

        self.chat_scroll = 0;
        self.notice = None;
        self.file_prompt = None;
        self.focus = Focus::Composer;
    }

    /// Open the chat highlighted in the sidebar, unless it is already open.
    pub fn open_highlighted(&mut self) {
        let Some(chat_id) = self.chat_list.highlighted_chat().map(|c| c.id) else {
            return;
        };
        if self.active_chat_id() != Some(chat_id) {
            self.activate_chat(chat_id);
        } else {
            self.focus = Focus::Composer;
        }
    }

    pub fn submit(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Some(request) = session.submit() {
            spawn_session_request(self.backend.clone(), request, self.events.clone());
            self.notice = None;
            self.scroll_chat_to_bottom();
        }
    }

    pub fn edit(&mut self, op: EditOp) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.edit(op) {
            Ok(()) => self.notice = None,
            Err(ComposerError::FileSelected) => {
                self.notice = Some("File selected: Enter to upload, Esc to cancel".to_string());
            }
            Err(ComposerError::Disabled) => {}
        }
    }

    pub fn cancel_file(&mut self) -> bool {
        let cancelled = self
            .session
            .as_mut()
            .map(|s| s.composer().selected_file().is_some() && s.cancel())
            .unwrap_or(false);
        if cancelled {
            self.notice = None;
        }
        cancelled
    }

    pub fn open_file_prompt(&mut self) {
        if self.session.is_some() {
            self.file_prompt = Some(FilePrompt::default());
        }
    }

    /// Validate the prompt's path and select it. The prompt stays open with an
    /// error message if the path is unusable.
    pub fn confirm_file_prompt(&mut self) {
        let Some(prompt) = self.file_prompt.as_mut() else {
            return;
        };
        let path = expand_home(prompt.input.trim());
        match FileHandle::from_path(&path) {
            Ok(file) => {
                self.file_prompt = None;
                if let Some(session) = self.session.as_mut() {
                    session.select_file(file);
                }
                self.focus = Focus::Composer;
            }
            Err(e) => prompt.error = Some(e.to_string()),
        }
    }

    pub fn handle_backend(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::ChatCreated(result) => {
                self.creating_chat = false;
                match result {
                    Ok(created) => self.activate_chat(created.chat_id),
                    Err(e) => {
                        tracing::warn!(error = %e, "could not create chat");
                        self.create_failed = true;
                    }
                }
            }
            BackendEvent::Session(completion) => {
                let applied = match self.session.as_mut() {
                    Some(session) => session.apply(completion),
                    None => Applied::Stale,
                };
                if applied == Applied::Applied {
                    self.scroll_chat_to_bottom();
                }
            }
            BackendEvent::ChatList(completion) => {
                self.chat_list.apply(completion);
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        let busy = self.session.as_ref().map(|s| s.is_busy()).unwrap_or(false);
        if busy || self.creating_chat {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.total_chat_lines().saturating_sub(self.visible_chat_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    /// Scroll the conversation so the newest message (or the typing
    /// indicator) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.total_chat_lines();
        let visible_height = self.visible_chat_height();
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Line count of the rendered conversation, mirroring `ui::render_chat`.
    pub fn total_chat_lines(&self) -> u16 {
        let Some(session) = &self.session else {
            return 0;
        };

        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in session.messages() {
            // Role line, content, blank line after the message
            total_lines = total_lines.saturating_add(2);
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let wrapped = line.chars().count().div_ceil(wrap_width).max(1);
                total_lines = total_lines.saturating_add(wrapped);
            }
        }

        if session.is_busy() {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }

    pub fn sidebar_index_at(&self, row: u16) -> Option<usize> {
        let area = self.sidebar_area?;
        // Skip the top border
        let inner_top = area.y + 1;
        if row < inner_top || row >= area.y + area.height.saturating_sub(1) {
            return None;
        }
        let index = self.sidebar_offset + (row - inner_top) as usize;
        (index < self.chat_list.chats().len()).then_some(index)
    }
}

fn expand_home(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragchat_core::client::Result;
    use ragchat_core::model::{ChatCreated, IngestReceipt, SendReply};
    use ragchat_core::{Chat, ChatSummary};
    use tokio::sync::mpsc;

    struct StubBackend;

    #[async_trait]
    impl ChatBackend for StubBackend {
        async fn create_chat(&self) -> Result<ChatCreated> {
            Ok(ChatCreated { chat_id: 3 })
        }

        async fn get_chat(&self, chat_id: i64) -> Result<Chat> {
            Ok(Chat {
                id: chat_id,
                messages: Vec::new(),
            })
        }

        async fn list_chats(&self) -> Result<Vec<ChatSummary>> {
            Ok(vec![ChatSummary {
                id: 3,
                messages: Vec::new(),
            }])
        }

        async fn send_message(&self, _chat_id: i64, text: &str) -> Result<SendReply> {
            Ok(SendReply {
                chat_id: None,
                message_id: 1,
                response: text.to_uppercase(),
            })
        }

        async fn upload_file(&self, _file: &FileHandle, _chat_id: i64) -> Result<IngestReceipt> {
            Ok(IngestReceipt {
                success: true,
                extra: Default::default(),
            })
        }
    }

    async fn drain(app: &mut App, rx: &mut mpsc::UnboundedReceiver<BackendEvent>, count: usize) {
        for _ in 0..count {
            let event = rx.recv().await.expect("backend event");
            app.handle_backend(event);
        }
    }

    #[tokio::test]
    async fn test_startup_creates_and_opens_chat() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(StubBackend), "http://test", tx);

        app.create_new_chat();
        assert!(app.creating_chat);
        // created, then history + chat list
        drain(&mut app, &mut rx, 3).await;

        assert_eq!(app.active_chat_id(), Some(3));
        assert!(app.session.as_ref().unwrap().is_idle());
        assert_eq!(app.chat_list.chats().len(), 1);
        assert_eq!(app.chat_list.highlighted_chat().map(|c| c.id), Some(3));
    }

    #[tokio::test]
    async fn test_typed_message_round_trip() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(StubBackend), "http://test", tx);
        app.activate_chat(3);
        drain(&mut app, &mut rx, 2).await;

        for c in "hey".chars() {
            app.edit(EditOp::Insert(c));
        }
        app.submit();
        assert!(app.session.as_ref().unwrap().is_busy());
        drain(&mut app, &mut rx, 1).await;

        let contents: Vec<&str> = app
            .session
            .as_ref()
            .unwrap()
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["hey", "HEY"]);
    }

    #[test]
    fn test_file_prompt_reports_bad_path() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(StubBackend), "http://test", tx);
        app.session = Some(Session::open(1));

        app.open_file_prompt();
        app.file_prompt.as_mut().unwrap().input = "/no/such/file.pdf".to_string();
        app.confirm_file_prompt();
        let prompt = app.file_prompt.as_ref().expect("prompt stays open");
        assert!(prompt.error.as_deref().unwrap().contains("no such file"));
    }

    #[test]
    fn test_file_prompt_selects_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "x").unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(StubBackend), "http://test", tx);
        app.session = Some(Session::open(1));

        app.open_file_prompt();
        app.file_prompt.as_mut().unwrap().input = path.display().to_string();
        app.confirm_file_prompt();
        assert!(app.file_prompt.is_none());
        assert_eq!(
            app.session.as_ref().unwrap().composer().input(),
            "Selected file: doc.txt"
        );
    }

    #[test]
    fn test_long_history_line_count_saturates() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(StubBackend), "http://test", tx);
        let mut session = Session::open(1);
        let ticket = session.ticket();
        let body = vec!["line"; 25].join("\n");
        let messages = (0..3000)
            .map(|id| ragchat_core::Message::committed(id, ragchat_core::Sender::Assistant, body.clone()))
            .collect();
        session.apply(ragchat_core::Completion {
            ticket,
            outcome: ragchat_core::session::Outcome::History(Ok(Chat { id: 1, messages })),
        });
        app.session = Some(session);

        // 3000 * (25 + 2) lines is past u16::MAX
        assert_eq!(app.total_chat_lines(), u16::MAX);
        app.chat_height = 20;
        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 20);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/x.txt"), PathBuf::from("/abs/x.txt"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x.txt"), home.join("x.txt"));
        }
    }
}
