//! Frame composition: tab bar, the active window's content, status
//! bar and input line. Scrollback rows arrive pre-wrapped from the
//! engine, so drawing is a straight copy.

use crate::model::Model;
use crate::scrollback::LineKind;
use crate::utils;
use crate::widgets;
use crate::windows::{FriendListMode, WindowKind};
use chrono::{DateTime, Local, TimeZone};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

fn line_style(kind: LineKind, bold: bool) -> Style {
    let mut style = match kind {
        LineKind::System | LineKind::Prompt => Style::default().fg(Color::Yellow),
        LineKind::InMessage => Style::default(),
        LineKind::OutMessage | LineKind::OutMessageRead => Style::default().fg(Color::Gray),
        LineKind::InAction | LineKind::OutAction | LineKind::OutActionRead => {
            Style::default().fg(Color::Magenta)
        }
        LineKind::Connection => Style::default().fg(Color::Green),
        LineKind::Disconnection => Style::default().fg(Color::Red),
        LineKind::NameChange => Style::default().fg(Color::Cyan),
        LineKind::InPrivate | LineKind::OutPrivate => Style::default().fg(Color::LightMagenta),
    };
    if bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    style
}

pub fn draw(f: &mut Frame, model: &mut Model) {
    let size = f.area();
    model.windows.set_term_size(size.width, size.height);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(size);

    widgets::tab_bar::render(f, chunks[0], model);

    let content = chunks[1];
    let kind = model.windows.active().map(|w| w.kind);
    match kind {
        Some(WindowKind::FriendList) => draw_friend_list(f, content, model),
        Some(WindowKind::Conference(_)) | Some(WindowKind::Group(_))
            if model.windows.active().is_some_and(|w| w.show_peerlist) =>
        {
            let split = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(10), Constraint::Length(22)])
                .split(content);
            draw_scrollback(f, split[0], model);
            widgets::sidebar::render(f, split[1], model);
        }
        _ => draw_scrollback(f, content, model),
    }

    if let Some(page) = model.windows.active().and_then(|w| w.help) {
        widgets::help::render(f, content, page);
    }

    widgets::status_bar::render(f, chunks[2], model);
    draw_input(f, chunks[3], model);

    model.windows.refresh = false;
}

fn draw_scrollback(f: &mut Frame, area: Rect, model: &mut Model) {
    let width = area.width.max(2) as usize;
    let height = area.height.max(1) as usize;
    let Some(w) = model.windows.active_mut() else {
        return;
    };
    let rows = w.scrollback.visible_rows(width, height);
    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(kind, bold, text)| Line::from(Span::styled(text, line_style(kind, bold))))
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

fn format_last_online(ts: i64) -> String {
    if ts == 0 {
        return "never".to_owned();
    }
    match Local.timestamp_opt(ts, 0) {
        chrono::LocalResult::Single(dt) => {
            let dt: DateTime<Local> = dt;
            dt.format("%Y-%m-%d %H:%M").to_string()
        }
        _ => "unknown".to_owned(),
    }
}

fn draw_friend_list(f: &mut Frame, area: Rect, model: &Model) {
    let Some(state) = model.windows.active().and_then(|w| w.friendlist) else {
        return;
    };

    let mut lines: Vec<Line> = Vec::new();
    let header = match state.mode {
        FriendListMode::Online => format!(" Contacts ({}) — [blocked →]", model.friends.num_active()),
        FriendListMode::Blocked => format!(" Blocked ({}) — [← contacts]", model.blocklist.num_blocked()),
    };
    lines.push(Line::from(Span::styled(
        header,
        Style::default().add_modifier(Modifier::BOLD),
    )));

    match state.mode {
        FriendListMode::Online => {
            for pos in 0..model.friends.num_active() {
                let Some(friend) = model.friends.by_index_pos(pos) else {
                    continue;
                };
                let marker = if friend.connection.is_online() { "●" } else { "○" };
                let detail = if friend.connection.is_online() {
                    friend.status_message.clone()
                } else {
                    format!("last seen {}", format_last_online(friend.last_online))
                };
                let text = format!(
                    " {} {}  {}",
                    marker,
                    utils::truncate_name(friend.display_name(), 24),
                    detail
                );
                let mut style = if friend.connection.is_online() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                if pos == state.selected {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                lines.push(Line::from(Span::styled(text, style)));
            }
        }
        FriendListMode::Blocked => {
            for pos in 0..model.blocklist.num_blocked() {
                let Some(entry) = model.blocklist.by_index_pos(pos) else {
                    continue;
                };
                let text = format!(
                    " x {}  last seen {}",
                    utils::truncate_name(&entry.name, 24),
                    format_last_online(entry.last_online)
                );
                let mut style = Style::default().fg(Color::DarkGray);
                if pos == state.selected {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                lines.push(Line::from(Span::styled(text, style)));
            }
        }
    }

    lines.push(Line::from(""));
    if state.pending_delete.is_some() {
        lines.push(Line::from(Span::styled(
            " Really delete? y/n",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            " Enter: open  d: delete  b: block/unblock  ←→: lists",
            Style::default().fg(Color::DarkGray),
        )));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn draw_input(f: &mut Frame, area: Rect, model: &mut Model) {
    let Some(w) = model.windows.active_mut() else {
        return;
    };
    let width = area.width.saturating_sub(2).max(1) as usize;

    let text = w.input.text();
    let chars: Vec<char> = text.chars().collect();
    // Prefix display widths, indexed by char position.
    let mut prefix = Vec::with_capacity(chars.len() + 1);
    prefix.push(0usize);
    for c in &chars {
        let cw = unicode_width::UnicodeWidthChar::width(*c).unwrap_or(0);
        prefix.push(prefix.last().unwrap() + cw);
    }
    let cursor = w.input.cursor.min(chars.len());

    // Horizontal scroll keeps the cursor visible.
    if cursor < w.input.vis_start {
        w.input.vis_start = cursor;
    }
    while prefix[cursor] - prefix[w.input.vis_start.min(cursor)] >= width {
        w.input.vis_start += 1;
    }
    let vis_start = w.input.vis_start.min(cursor);

    let mut visible = String::new();
    for (i, c) in chars.iter().enumerate().skip(vis_start) {
        if prefix[i + 1] - prefix[vis_start] > width {
            break;
        }
        visible.push(*c);
    }

    let paragraph = Paragraph::new(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Cyan)),
        Span::raw(visible),
    ]));
    f.render_widget(paragraph, area);

    let cursor_x = area.x + 2 + (prefix[cursor] - prefix[vis_start]) as u16;
    f.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), area.y));
}
