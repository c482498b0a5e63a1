use crate::model::Model;
use crate::utils;
use crate::windows::AlertLevel;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub fn render(f: &mut Frame, area: Rect, model: &Model) {
    let active = model.windows.active_pos();
    let mut spans = Vec::new();
    for (i, w) in model.windows.iter().enumerate() {
        let mut label = format!(" {} ", utils::truncate_name(&w.name, 16));
        if w.pending_messages > 0 {
            label = format!(" {} ({}) ", utils::truncate_name(&w.name, 16), w.pending_messages);
        }
        let mut style = Style::default().fg(super::tab_color(w.tab_color));
        style = match w.alert {
            AlertLevel::High => style.fg(Color::Red).add_modifier(Modifier::BOLD),
            AlertLevel::Medium => style.fg(Color::Yellow),
            AlertLevel::Low => style.fg(Color::Green),
            AlertLevel::None => style,
        };
        if i == active {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(label, style));
        spans.push(Span::raw("|"));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
