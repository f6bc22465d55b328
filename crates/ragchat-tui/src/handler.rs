use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ragchat_core::EditOp;

use crate::app::{App, Focus};
use crate::tui::AppEvent;

const PAGE: u16 = 10;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Backend(event) => app.handle_backend(event),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.file_prompt.is_some() {
        handle_file_prompt(app, key);
        return;
    }

    // No chat yet: only retry/quit make sense
    if app.session.is_none() {
        match key.code {
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Char('n') if !app.creating_chat => app.create_new_chat(),
            _ => {}
        }
        return;
    }

    match (key.code, app.focus) {
        (KeyCode::PageUp, _) => app.scroll_up(PAGE),
        (KeyCode::PageDown, _) => app.scroll_down(PAGE),
        (_, Focus::Sidebar) => handle_sidebar(app, key),
        (_, Focus::Composer) => handle_composer(app, key),
    }
}

fn handle_sidebar(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.chat_list.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.chat_list.select_prev(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.open_highlighted(),
        KeyCode::Char('n') => app.create_new_chat(),
        KeyCode::Tab | KeyCode::Esc => app.focus = Focus::Composer,
        _ => {}
    }
}

fn handle_composer(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('o') => app.open_file_prompt(),
            KeyCode::Char('n') => app.create_new_chat(),
            KeyCode::Char('u') => app.edit(EditOp::Clear),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Tab => app.focus = Focus::Sidebar,
        KeyCode::Esc => {
            if !app.cancel_file() {
                app.focus = Focus::Sidebar;
            }
        }
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.edit(EditOp::Backspace),
        KeyCode::Delete => app.edit(EditOp::Delete),
        KeyCode::Left => app.edit(EditOp::Left),
        KeyCode::Right => app.edit(EditOp::Right),
        KeyCode::Home => app.edit(EditOp::Home),
        KeyCode::End => app.edit(EditOp::End),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Char(c) => app.edit(EditOp::Insert(c)),
        _ => {}
    }
}

fn handle_file_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.file_prompt = None,
        KeyCode::Enter => app.confirm_file_prompt(),
        KeyCode::Backspace => {
            if let Some(prompt) = app.file_prompt.as_mut() {
                prompt.input.pop();
                prompt.error = None;
            }
        }
        KeyCode::Char(c) => {
            if let Some(prompt) = app.file_prompt.as_mut() {
                prompt.input.push(c);
                prompt.error = None;
            }
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_area = |area: Option<ratatui::layout::Rect>| {
        area.map(|a| {
            mouse.column >= a.x
                && mouse.column < a.x + a.width
                && mouse.row >= a.y
                && mouse.row < a.y + a.height
        })
        .unwrap_or(false)
    };

    match mouse.kind {
        MouseEventKind::ScrollUp if in_area(app.chat_area) => app.scroll_up(3),
        MouseEventKind::ScrollDown if in_area(app.chat_area) => app.scroll_down(3),
        MouseEventKind::Down(MouseButton::Left) if app.file_prompt.is_none() => {
            if in_area(app.sidebar_area) {
                if let Some(index) = app.sidebar_index_at(mouse.row) {
                    app.chat_list.select_index(index);
                    app.open_highlighted();
                }
            } else if in_area(app.chat_area) {
                app.focus = Focus::Composer;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragchat_core::client::Result as ClientResult;
    use ragchat_core::model::{ChatCreated, IngestReceipt, SendReply};
    use ragchat_core::{BackendEvent, Chat, ChatBackend, ChatSummary, FileHandle, Session};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Backend that must never be reached.
    struct Unreachable;

    #[async_trait]
    impl ChatBackend for Unreachable {
        async fn create_chat(&self) -> ClientResult<ChatCreated> {
            unreachable!()
        }
        async fn get_chat(&self, _chat_id: i64) -> ClientResult<Chat> {
            unreachable!()
        }
        async fn list_chats(&self) -> ClientResult<Vec<ChatSummary>> {
            unreachable!()
        }
        async fn send_message(&self, _chat_id: i64, _text: &str) -> ClientResult<SendReply> {
            unreachable!()
        }
        async fn upload_file(&self, _file: &FileHandle, _chat_id: i64) -> ClientResult<IngestReceipt> {
            unreachable!()
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app_with_idle_session() -> (App, mpsc::UnboundedReceiver<BackendEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(Unreachable), "http://test", tx);
        let mut session = Session::open(1);
        let ticket = session.ticket();
        session.apply(ragchat_core::Completion {
            ticket,
            outcome: ragchat_core::session::Outcome::History(Ok(Chat {
                id: 1,
                messages: Vec::new(),
            })),
        });
        app.session = Some(session);
        (app, rx)
    }

    #[test]
    fn test_ctrl_c_quits() {
        let (mut app, _rx) = app_with_idle_session();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        )
        .unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_typing_goes_to_composer() {
        let (mut app, _rx) = app_with_idle_session();
        for c in "hi".chars() {
            handle_event(&mut app, key(KeyCode::Char(c))).unwrap();
        }
        handle_event(&mut app, key(KeyCode::Backspace)).unwrap();
        assert_eq!(app.session.as_ref().unwrap().composer().input(), "h");
    }

    #[test]
    fn test_empty_enter_issues_no_request() {
        let (mut app, mut rx) = app_with_idle_session();
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.session.as_ref().unwrap().is_idle());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_typing_with_file_selected_shows_notice() {
        let (mut app, _rx) = app_with_idle_session();
        app.session.as_mut().unwrap().select_file(FileHandle {
            path: "/tmp/a.txt".into(),
            name: "a.txt".to_string(),
        });
        handle_event(&mut app, key(KeyCode::Char('x'))).unwrap();
        assert_eq!(
            app.session.as_ref().unwrap().composer().input(),
            "Selected file: a.txt"
        );
        assert!(app.notice.is_some());

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert!(app.session.as_ref().unwrap().composer().selected_file().is_none());
        assert_eq!(app.focus, Focus::Composer);
    }

    #[test]
    fn test_tab_toggles_focus() {
        let (mut app, _rx) = app_with_idle_session();
        handle_event(&mut app, key(KeyCode::Tab)).unwrap();
        assert_eq!(app.focus, Focus::Sidebar);
        handle_event(&mut app, key(KeyCode::Char('q'))).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_file_prompt_captures_keys() {
        let (mut app, _rx) = app_with_idle_session();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL)),
        )
        .unwrap();
        assert!(app.file_prompt.is_some());

        handle_event(&mut app, key(KeyCode::Char('q'))).unwrap();
        assert!(!app.should_quit);
        assert_eq!(app.file_prompt.as_ref().unwrap().input, "q");

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert!(app.file_prompt.is_none());
    }
}
