//! The window registry: every conversation, the prompt and the friend
//! list live here as ordered tabs with stable 16-bit ids. Events are
//! fanned out by matching a window's kind and numeric payload; alert
//! levels and pending counters are cleared when a window becomes
//! active.

use crate::config::TabColor;
use crate::input::InputBuffer;
use crate::scrollback::Scrollback;
use toxide_net::{ConferenceNumber, FriendNumber, GroupNumber};

pub const MAX_WINDOWS: usize = 20;
/// Anything shorter than this cannot fit the chrome rows.
pub const MIN_ROWS: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WinId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Prompt,
    FriendList,
    Chat(FriendNumber),
    Conference(ConferenceNumber),
    Group(GroupNumber),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum AlertLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FriendListMode {
    #[default]
    Online,
    Blocked,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FriendListState {
    pub mode: FriendListMode,
    pub selected: usize,
    /// Position awaiting delete confirmation.
    pub pending_delete: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HelpPage {
    #[default]
    Menu,
    Global,
    Chat,
    Conference,
    Group,
    Keys,
}

#[derive(Debug)]
pub struct Window {
    pub id: WinId,
    pub kind: WindowKind,
    pub name: String,
    pub tab_color: TabColor,
    pub alert: AlertLevel,
    pub pending_messages: usize,
    pub show_peerlist: bool,
    pub is_call: bool,
    /// A self-typing notification is currently outstanding.
    pub typing_sent: bool,
    pub scrollback: Scrollback,
    pub input: InputBuffer,
    pub help: Option<HelpPage>,
    pub friendlist: Option<FriendListState>,
}

impl Window {
    pub fn new(kind: WindowKind, name: String, history_size: usize) -> Self {
        Self {
            id: WinId(0),
            kind,
            name,
            tab_color: TabColor::Default,
            alert: AlertLevel::None,
            pending_messages: 0,
            show_peerlist: matches!(
                kind,
                WindowKind::Conference(_) | WindowKind::Group(_)
            ),
            is_call: false,
            typing_sent: false,
            scrollback: Scrollback::new(history_size),
            input: InputBuffer::new(),
            help: None,
            friendlist: match kind {
                WindowKind::FriendList => Some(FriendListState::default()),
                _ => None,
            },
        }
    }

    pub fn is_conversation(&self) -> bool {
        matches!(
            self.kind,
            WindowKind::Chat(_) | WindowKind::Conference(_) | WindowKind::Group(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    Limit,
    TerminalTooSmall,
}

impl std::fmt::Display for WindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowError::Limit => write!(f, "too many windows are open"),
            WindowError::TerminalTooSmall => write!(f, "terminal is too small"),
        }
    }
}

#[derive(Debug)]
pub struct WindowRegistry {
    windows: Vec<Window>,
    active: usize,
    pub refresh: bool,
    pub term_cols: u16,
    pub term_rows: u16,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self {
            windows: Vec::new(),
            active: 0,
            refresh: true,
            term_cols: 80,
            term_rows: 24,
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Window> {
        self.windows.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Window> {
        self.windows.iter_mut()
    }

    pub fn set_term_size(&mut self, cols: u16, rows: u16) {
        self.term_cols = cols;
        self.term_rows = rows;
        self.refresh = true;
    }

    fn lowest_unused_id(&self) -> WinId {
        let mut candidate = 0u16;
        while self.windows.iter().any(|w| w.id.0 == candidate) {
            candidate += 1;
        }
        WinId(candidate)
    }

    /// Appends a window to the tab order under the lowest unused id.
    pub fn add_window(&mut self, mut window: Window) -> Result<WinId, WindowError> {
        if self.windows.len() >= MAX_WINDOWS {
            return Err(WindowError::Limit);
        }
        if self.term_rows < MIN_ROWS || self.term_cols == 0 {
            return Err(WindowError::TerminalTooSmall);
        }
        let id = self.lowest_unused_id();
        window.id = id;
        self.windows.push(window);
        self.refresh = true;
        Ok(id)
    }

    /// Removes a window and compacts the tab order. If the cursor
    /// lands on the friend list afterwards it jumps back to the
    /// prompt.
    pub fn del_window(&mut self, id: WinId) -> Option<Window> {
        let pos = self.windows.iter().position(|w| w.id == id)?;
        let removed = self.windows.remove(pos);
        if self.active >= self.windows.len() {
            self.active = self.windows.len().saturating_sub(1);
        } else if self.active > pos {
            self.active -= 1;
        }
        if matches!(
            self.windows.get(self.active).map(|w| w.kind),
            Some(WindowKind::FriendList)
        ) && let Some(prompt) = self.windows.iter().position(|w| w.kind == WindowKind::Prompt)
        {
            self.active = prompt;
        }
        self.refresh = true;
        Some(removed)
    }

    pub fn get(&self, id: WinId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn get_mut(&mut self, id: WinId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    pub fn active(&self) -> Option<&Window> {
        self.windows.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut Window> {
        self.windows.get_mut(self.active)
    }

    pub fn active_pos(&self) -> usize {
        self.active
    }

    /// O(n) lookup; an absent id is a no-op.
    pub fn set_active(&mut self, id: WinId) {
        match self.windows.iter().position(|w| w.id == id) {
            Some(pos) => self.set_active_pos(pos),
            None => {}
        }
    }

    pub fn set_active_kind(&mut self, kind: WindowKind) {
        if let Some(pos) = self.windows.iter().position(|w| w.kind == kind) {
            self.set_active_pos(pos);
        }
    }

    fn set_active_pos(&mut self, pos: usize) {
        if pos < self.windows.len() {
            self.active = pos;
            let w = &mut self.windows[pos];
            w.alert = AlertLevel::None;
            w.pending_messages = 0;
            self.refresh = true;
        }
    }

    pub fn next_active(&mut self) {
        if !self.windows.is_empty() {
            self.set_active_pos((self.active + 1) % self.windows.len());
        }
    }

    pub fn prev_active(&mut self) {
        if !self.windows.is_empty() {
            let prev = (self.active + self.windows.len() - 1) % self.windows.len();
            self.set_active_pos(prev);
        }
    }

    pub fn find_kind(&self, kind: WindowKind) -> Option<&Window> {
        self.windows.iter().find(|w| w.kind == kind)
    }

    pub fn find_kind_mut(&mut self, kind: WindowKind) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.kind == kind)
    }

    pub fn chat_mut(&mut self, friend: FriendNumber) -> Option<&mut Window> {
        self.find_kind_mut(WindowKind::Chat(friend))
    }

    pub fn conference_mut(&mut self, number: ConferenceNumber) -> Option<&mut Window> {
        self.find_kind_mut(WindowKind::Conference(number))
    }

    pub fn group_mut(&mut self, number: GroupNumber) -> Option<&mut Window> {
        self.find_kind_mut(WindowKind::Group(number))
    }

    pub fn prompt_mut(&mut self) -> Option<&mut Window> {
        self.find_kind_mut(WindowKind::Prompt)
    }

    /// Raises a window's alert (higher severity only) and bumps its
    /// pending counter. The active window is exempt.
    pub fn alert(&mut self, id: WinId, level: AlertLevel) {
        let active_id = self.active().map(|w| w.id);
        if active_id == Some(id) {
            return;
        }
        if let Some(w) = self.get_mut(id) {
            if level > w.alert {
                w.alert = level;
            }
            w.pending_messages += 1;
            self.refresh = true;
        }
    }

    /// One queued scrollback line per window per render pass.
    pub fn flush_scrollback_step(&mut self) -> bool {
        let mut moved = false;
        for w in &mut self.windows {
            if w.scrollback.flush_one() {
                moved = true;
            }
        }
        if moved {
            self.refresh = true;
        }
        moved
    }
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrollback::DEFAULT_HISTORY_SIZE;

    fn win(kind: WindowKind, name: &str) -> Window {
        Window::new(kind, name.to_owned(), DEFAULT_HISTORY_SIZE)
    }

    fn registry() -> WindowRegistry {
        let mut reg = WindowRegistry::new();
        reg.add_window(win(WindowKind::Prompt, "home")).unwrap();
        reg.add_window(win(WindowKind::FriendList, "contacts")).unwrap();
        reg
    }

    #[test]
    fn ids_are_lowest_unused_and_reused_after_delete() {
        let mut reg = registry();
        let a = reg.add_window(win(WindowKind::Chat(FriendNumber(0)), "a")).unwrap();
        let b = reg.add_window(win(WindowKind::Chat(FriendNumber(1)), "b")).unwrap();
        assert_eq!((a.0, b.0), (2, 3));
        reg.del_window(a);
        let c = reg.add_window(win(WindowKind::Chat(FriendNumber(2)), "c")).unwrap();
        assert_eq!(c.0, 2);
        // Uniqueness across the live set.
        let ids: Vec<u16> = reg.iter().map(|w| w.id.0).collect();
        let mut dedup = ids.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(ids.len(), dedup.len());
    }

    #[test]
    fn window_limit_and_small_terminal_are_rejected() {
        let mut reg = registry();
        for i in 0..MAX_WINDOWS {
            let _ = reg.add_window(win(WindowKind::Chat(FriendNumber(i as u32)), "x"));
        }
        assert_eq!(
            reg.add_window(win(WindowKind::Prompt, "over")),
            Err(WindowError::Limit)
        );

        let mut small = WindowRegistry::new();
        small.set_term_size(80, 3);
        assert_eq!(
            small.add_window(win(WindowKind::Prompt, "p")),
            Err(WindowError::TerminalTooSmall)
        );
    }

    #[test]
    fn activation_clears_alert_and_pending() {
        let mut reg = registry();
        let id = reg.add_window(win(WindowKind::Chat(FriendNumber(0)), "a")).unwrap();
        reg.alert(id, AlertLevel::Medium);
        reg.alert(id, AlertLevel::Low); // lower severity does not downgrade
        assert_eq!(reg.get(id).unwrap().alert, AlertLevel::Medium);
        assert_eq!(reg.get(id).unwrap().pending_messages, 2);

        reg.set_active(id);
        let w = reg.get(id).unwrap();
        assert_eq!(w.alert, AlertLevel::None);
        assert_eq!(w.pending_messages, 0);

        // Alerts for the active window are ignored.
        reg.alert(id, AlertLevel::High);
        assert_eq!(reg.get(id).unwrap().pending_messages, 0);
    }

    #[test]
    fn deleting_under_cursor_jumps_off_friend_list_to_prompt() {
        let mut reg = registry();
        let chat = reg.add_window(win(WindowKind::Chat(FriendNumber(0)), "a")).unwrap();
        reg.set_active(chat);
        reg.del_window(chat);
        // Cursor would have landed on the friend list; it must be on
        // the prompt instead.
        assert_eq!(reg.active().unwrap().kind, WindowKind::Prompt);
    }

    #[test]
    fn cycling_wraps() {
        let mut reg = registry();
        reg.add_window(win(WindowKind::Chat(FriendNumber(0)), "a")).unwrap();
        assert_eq!(reg.active_pos(), 0);
        reg.next_active();
        reg.next_active();
        reg.next_active();
        assert_eq!(reg.active_pos(), 0);
        reg.prev_active();
        assert_eq!(reg.active_pos(), 2);
    }

    #[test]
    fn absent_id_activation_is_a_noop() {
        let mut reg = registry();
        reg.set_active(WinId(999));
        assert_eq!(reg.active_pos(), 0);
    }
}
