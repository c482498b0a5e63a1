use crate::model::Model;
use crate::windows::WindowKind;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use toxide_net::{Connection, UserStatus};

fn status_marker(status: UserStatus, connection: Connection) -> (&'static str, Color) {
    if !connection.is_online() {
        return ("o", Color::DarkGray);
    }
    match status {
        UserStatus::Online => ("●", Color::Green),
        UserStatus::Away => ("●", Color::Yellow),
        UserStatus::Busy => ("●", Color::Red),
    }
}

pub fn render(f: &mut Frame, area: Rect, model: &Model) {
    let (marker, color) = status_marker(model.me.status, model.me.connection);
    let mut spans = vec![
        Span::styled(format!(" {} ", marker), Style::default().fg(color)),
        Span::styled(
            model.me.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];
    if !model.me.note.is_empty() {
        spans.push(Span::raw(format!(" | {}", model.me.note)));
    }

    if let Some(w) = model.windows.active() {
        match w.kind {
            WindowKind::Chat(friend) => {
                if let Some(f) = model.friends.get(friend) {
                    let (m, c) = status_marker(f.status, f.connection);
                    spans.push(Span::raw("  —  "));
                    spans.push(Span::styled(format!("{} ", m), Style::default().fg(c)));
                    spans.push(Span::raw(f.display_name().to_owned()));
                    if f.is_typing {
                        spans.push(Span::styled(
                            " (typing)",
                            Style::default().fg(Color::Cyan),
                        ));
                    }
                    if !f.status_message.is_empty() {
                        spans.push(Span::raw(format!(" | {}", f.status_message)));
                    }
                }
            }
            WindowKind::Conference(number) => {
                if let Some(conf) = model.conferences.get(number) {
                    spans.push(Span::raw(format!(
                        "  —  {} peers{}",
                        conf.peers.len(),
                        if conf.audio.enabled { " [audio]" } else { "" },
                    )));
                }
            }
            WindowKind::Group(number) => {
                if let Some(g) = model.groups.get(number) {
                    spans.push(Span::raw(format!("  —  {} | {}", g.name, g.topic)));
                }
            }
            _ => {}
        }
    }

    let style = Style::default().bg(Color::Blue).fg(Color::White);
    f.render_widget(Paragraph::new(Line::from(spans)).style(style), area);
}
