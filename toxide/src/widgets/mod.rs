pub mod help;
pub mod sidebar;
pub mod status_bar;
pub mod tab_bar;

use crate::config::TabColor;
use ratatui::style::Color;

pub fn tab_color(color: TabColor) -> Color {
    match color {
        TabColor::Default => Color::Reset,
        TabColor::White => Color::White,
        TabColor::Red => Color::Red,
        TabColor::Green => Color::Green,
        TabColor::Yellow => Color::Yellow,
        TabColor::Blue => Color::Blue,
        TabColor::Magenta => Color::Magenta,
        TabColor::Cyan => Color::Cyan,
    }
}
