use crate::windows::HelpPage;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

fn page_lines(page: HelpPage) -> Vec<&'static str> {
    match page {
        HelpPage::Menu => vec![
            "Help menu:",
            "",
            "  g - global commands",
            "  c - chat commands",
            "  o - conference commands",
            "  r - group commands",
            "  k - key bindings",
            "",
            "  x or Esc to close, m for this menu",
        ],
        HelpPage::Global => vec![
            "Global commands:",
            "",
            "  /add <id> [msg]     send a friend request",
            "  /accept <n>         accept a friend request",
            "  /decline <n>        decline a friend request",
            "  /requests           list pending friend requests",
            "  /avatar <path>      set an avatar (PNG, 64 KiB max)",
            "  /conference         start a conference",
            "  /group <name>       start a group chat",
            "  /join <id> [pass]   join a group by chat id",
            "  /connect <h> <p> <k> bootstrap from a node",
            "  /status <s> [note]  set online/away/busy",
            "  /note <msg>         set a status message",
            "  /nick <name>        set your name",
            "  /myid               print your Tox ID",
            "  /nospam [hex]       revoke your Tox ID",
            "  /log [on|off]       toggle chat logging",
            "  /clear /close /quit",
        ],
        HelpPage::Chat => vec![
            "Chat commands:",
            "",
            "  /sendfile <path>    send a file",
            "  /savefile <n>       accept a file transfer",
            "  /cancel <in|out> <n> cancel a transfer",
            "  /autoaccept [on|off] auto-accept transfers",
            "  /cinvite <n>        invite to a conference",
            "  /cjoin              join the invited conference",
            "  /invite <n>         invite to a group",
            "  /gaccept [pass]     accept a group invite",
        ],
        HelpPage::Conference => vec![
            "Conference commands:",
            "",
            "  /title [text]       show or set the title",
            "  /audio <on|off>     toggle audio",
            "  /mute <peer>        mute a peer",
            "  /ptt <on|off>       push-to-talk",
            "  /sense <n>          voice activation threshold",
        ],
        HelpPage::Group => vec![
            "Group commands:",
            "",
            "  /chatid             print the chat id",
            "  /topic [text]       show or set the topic",
            "  /whisper <p> <msg>  private message",
            "  /whois <peer>       peer details",
            "  /ignore /unignore   drop a peer's messages",
            "  /kick /mod /unmod   moderation",
            "  /silence /unsilence observer role",
            "  /passwd [pass]      group password",
            "  /peerlimit <n>      peer limit",
            "  /privacy <state>    public or private",
            "  /locktopic <on|off> topic lock",
            "  /voice <who>        who may talk",
            "  /rejoin /disconnect",
        ],
        HelpPage::Keys => vec![
            "Key bindings (configurable in [keys]):",
            "",
            "  Ctrl+N / Ctrl+P     next / previous tab",
            "  Page Up / Page Down half page scroll",
            "  Ctrl+Up / Ctrl+Down line scroll",
            "  Ctrl+H              jump to bottom",
            "  Ctrl+B              toggle the peer list",
            "  Ctrl+T              toggle paste mode",
            "  Ctrl+R              reload the config",
            "  Tab                 completion",
            "  Ctrl+U/K/Y/W        line editing",
        ],
    }
}

/// Child window drawn over the active window.
pub fn render(f: &mut Frame, area: Rect, page: HelpPage) {
    let lines: Vec<Line> = page_lines(page).into_iter().map(Line::from).collect();
    let height = (lines.len() as u16 + 2).min(area.height);
    let width = 58.min(area.width);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("help")
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(lines).block(block), popup);
}
