use crate::model::Model;
use crate::windows::WindowKind;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem};
use ratatui::Frame;
use toxide_net::GroupRole;

fn role_marker(role: GroupRole) -> &'static str {
    match role {
        GroupRole::Founder => "&",
        GroupRole::Moderator => "+",
        GroupRole::User => "",
        GroupRole::Observer => "-",
    }
}

/// Peer list panel for conference and group windows.
pub fn render(f: &mut Frame, area: Rect, model: &Model) {
    let Some(w) = model.windows.active() else {
        return;
    };

    let items: Vec<ListItem> = match w.kind {
        WindowKind::Conference(number) => {
            let Some(conf) = model.conferences.get(number) else {
                return;
            };
            conf.peers
                .iter()
                .map(|p| {
                    let mut spans = vec![Span::raw(p.name.clone())];
                    if p.sending_audio {
                        spans.push(Span::styled(" )", Style::default().fg(Color::Green)));
                    }
                    if p.muted {
                        spans.push(Span::styled(" [m]", Style::default().fg(Color::Red)));
                    }
                    ListItem::new(Line::from(spans))
                })
                .collect()
        }
        WindowKind::Group(number) => {
            let Some(group) = model.groups.get(number) else {
                return;
            };
            group
                .name_list
                .iter()
                .map(|name| {
                    let peer = group.peer_by_name(name);
                    let marker = peer.map(|p| role_marker(p.role)).unwrap_or("");
                    let style = match peer.map(|p| p.is_ignored) {
                        Some(true) => Style::default().fg(Color::DarkGray),
                        _ => Style::default(),
                    };
                    ListItem::new(Line::from(Span::styled(
                        format!("{}{}", marker, name),
                        style,
                    )))
                })
                .collect()
        }
        _ => return,
    };

    let count = items.len();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::LEFT)
            .title(format!("{}", count)),
    );
    f.render_widget(list, area);
}
