use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use ragchat_core::{Sender, Session};
use crate::app::{App, FilePrompt, Focus};

const SIDEBAR_WIDTH: u16 = 34;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn role_label(sender: Sender) -> Span<'static> {
    match sender {
        Sender::User => Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Sender::Assistant => Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [sidebar_area, chat_area] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH.min(body_area.width / 2)),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_sidebar(app, frame, sidebar_area);
    render_chat(app, frame, chat_area);

    render_footer(app, frame, footer_area);

    if let Some(prompt) = &app.file_prompt {
        render_file_prompt(prompt, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let chat_indicator = match app.active_chat_id() {
        Some(id) => format!(" [chat {}]", id),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" ragchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(chat_indicator, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(app.base_url.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    if let Some(notice) = &app.notice {
        let line = Line::from(Span::styled(
            format!(" {} ", notice),
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let mut hints = if app.file_prompt.is_some() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" close ", label_style),
        ]
    } else if app.session.is_none() {
        if app.create_failed {
            vec![
                Span::styled(" n ", key_style),
                Span::styled(" retry ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]
        } else {
            vec![
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]
        }
    } else {
        match app.focus {
            Focus::Sidebar => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" nav ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" open ", label_style),
                Span::styled(" n ", key_style),
                Span::styled(" new chat ", label_style),
                Span::styled(" Tab ", key_style),
                Span::styled(" composer ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ],
            Focus::Composer => {
                let has_file = app
                    .session
                    .as_ref()
                    .map(|s| s.composer().selected_file().is_some())
                    .unwrap_or(false);
                let mut hints = vec![
                    Span::styled(" Enter ", key_style),
                    Span::styled(if has_file { " upload " } else { " send " }, label_style),
                ];
                if has_file {
                    hints.extend(vec![
                        Span::styled(" Esc ", key_style),
                        Span::styled(" cancel file ", label_style),
                    ]);
                } else {
                    hints.extend(vec![
                        Span::styled(" ^O ", key_style),
                        Span::styled(" attach ", label_style),
                    ]);
                }
                hints.extend(vec![
                    Span::styled(" ^N ", key_style),
                    Span::styled(" new chat ", label_style),
                    Span::styled(" Tab ", key_style),
                    Span::styled(" chats ", label_style),
                ]);
                hints
            }
        }
    };
    hints.extend(vec![
        Span::styled(" ^C ", key_style),
        Span::styled(" exit ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sidebar_area = Some(area);

    let focused = app.focus == Focus::Sidebar && app.session.is_some();
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chats ");

    if app.chat_list.is_loading() {
        let loading = Paragraph::new(Span::styled(
            "Loading...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
        .block(block);
        frame.render_widget(loading, area);
        return;
    }

    let active = app.active_chat_id();
    let items: Vec<ListItem> = app
        .chat_list
        .chats()
        .iter()
        .map(|chat| {
            let style = if Some(chat.id) == active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", chat.preview())).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(if focused {
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(Color::DarkGray)
        })
        .highlight_symbol("> ");

    let mut state = ListState::default()
        .with_selected(app.chat_list.selected_index())
        .with_offset(app.sidebar_offset);
    frame.render_stateful_widget(list, area, &mut state);
    app.sidebar_offset = state.offset();
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let Some(session) = app.session.as_ref() else {
        let message = if app.create_failed {
            Span::styled(
                "Could not start a chat. Is the backend running? Press n to retry.",
                Style::default().fg(Color::Red),
            )
        } else {
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            Span::styled(
                format!("Starting chat{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let [_, middle, _] = Layout::vertical([
            Constraint::Percentage(45),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(inner);
        frame.render_widget(Paragraph::new(message).centered(), middle);
        return;
    };

    let [messages_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = messages_area.height.saturating_sub(2);
    app.chat_width = messages_area.width.saturating_sub(2);

    let focused = app.focus == Focus::Composer;
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Chat {} ", session.chat_id()));

    let chat = Paragraph::new(conversation_text(session, app.animation_frame))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, messages_area);

    render_composer(session, focused, frame, input_area);
}

fn conversation_text(session: &Session, animation_frame: u8) -> Text<'static> {
    if session.is_loading() {
        return Text::from(Span::styled(
            "Loading messages...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }

    if session.messages().is_empty() && !session.is_busy() {
        return Text::from(Span::styled(
            "Send a message or attach a document to get started...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines: Vec<Line> = Vec::new();
    for msg in session.messages() {
        lines.push(Line::from(role_label(msg.sender)));
        match msg.sender {
            Sender::User => {
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Sender::Assistant => {
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if session.is_busy() {
        lines.push(Line::from(role_label(Sender::Assistant)));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_composer(session: &Session, focused: bool, frame: &mut Frame, area: Rect) {
    let composer = session.composer();
    let has_file = composer.selected_file().is_some();
    let enabled = session.is_idle();

    let border_color = if !enabled {
        Color::DarkGray
    } else if has_file {
        Color::Magenta
    } else if focused {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if has_file {
        " File selected, Enter to upload "
    } else if !enabled {
        " Waiting... "
    } else {
        " Message "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner = block.inner(area);
    let width = inner.width as usize;

    let (text, style) = if composer.input().is_empty() {
        (
            "Message the assistant...".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        let style = if has_file {
            Style::default().fg(Color::Magenta)
        } else if composer.can_submit() {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        (composer.input().to_string(), style)
    };

    // Keep the cursor in view by sliding the visible window
    let cursor = composer.cursor();
    let skip = if width > 0 && cursor >= width {
        cursor + 1 - width
    } else {
        0
    };
    let visible: String = text.chars().skip(skip).collect();

    frame.render_widget(Paragraph::new(Span::styled(visible, style)).block(block), area);

    if focused && enabled && !has_file && width > 0 {
        let x = (cursor - skip).min(width - 1) as u16;
        frame.set_cursor_position((inner.x + x, inner.y));
    }
}

fn render_file_prompt(prompt: &FilePrompt, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered), never larger than the screen
    let popup_width = 70.min(area.width.saturating_sub(4)).max(area.width.min(10));
    let popup_height = 7.min(area.height);

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height).intersection(area);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Attach File ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    // Rows that do not fit inside the popup are skipped
    let row = |offset: u16| (offset < inner.height).then(|| Rect::new(inner.x, inner.y + offset, inner.width, 1));

    if let Some(instructions_area) = row(0) {
        let instructions = Paragraph::new("Path to a .txt, .pdf or .docx file. Enter to select, Esc to cancel.")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(instructions, instructions_area);
    }

    // Input field, tail-aligned so long paths show their end. Falls back to
    // the first row when the popup is too short for the full layout.
    let Some(input_area) = row(2).or_else(|| row(0)) else {
        return;
    };
    let width = input_area.width as usize;
    let char_count = prompt.input.chars().count();
    let skip = (char_count + 1).saturating_sub(width);
    let visible: String = prompt.input.chars().skip(skip).collect();
    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    if width > 0 {
        let cursor_x = (char_count - skip).min(width - 1) as u16;
        frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
    }

    if let (Some(error), Some(status_area)) = (&prompt.error, row(4)) {
        let status = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(status, status_area);
    }
}
