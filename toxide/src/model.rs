//! The application model: every registry, the self identity, the
//! configuration pair and the path set. Mutated only by `update` on
//! the main loop, which keeps event handling atomic with respect to
//! rendering.

use crate::avatar::Avatar;
use crate::chatlog::{self, LogHint};
use crate::config::Config;
use crate::conference::{AudioControl, ConferenceRegistry, NullAudio};
use crate::friends::{BlockList, FriendRegistry, FriendRequests};
use crate::group::GroupRegistry;
use crate::msg::{AppCmd, Cmd, IOAction};
use crate::notify::{self, NotifyFlags};
use crate::scrollback::{LineId, LineKind};
use crate::time::TimeProvider;
use crate::windows::{WinId, Window, WindowKind, WindowRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use toxide_net::{Address, Connection, FriendNumber, PublicKey, UserStatus};

#[derive(Debug, Clone)]
pub struct SelfInfo {
    pub address: Address,
    pub pk: PublicKey,
    pub name: String,
    pub status: UserStatus,
    pub note: String,
    pub connection: Connection,
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub data_file: PathBuf,
    pub config_file: PathBuf,
    pub blocklist_file: PathBuf,
    pub download_dir: PathBuf,
    pub chatlogs_dir: PathBuf,
}

pub struct Model {
    pub windows: WindowRegistry,
    pub friends: FriendRegistry,
    pub blocklist: BlockList,
    pub requests: FriendRequests,
    pub conferences: ConferenceRegistry,
    pub groups: GroupRegistry,
    pub avatar: Option<Avatar>,
    /// Device-indexed audio backend; a no-op unless one is linked.
    pub audio_ctl: Box<dyn AudioControl>,
    pub me: SelfInfo,
    pub config: Config,
    pub paths: Paths,
    pub time: Arc<dyn TimeProvider>,
    pub tick_count: u64,
    pub last_autosave: Instant,
    /// Multiplexer focus state; always focused without the helper.
    pub has_focus: bool,
    /// Unblocked contacts awaiting their FriendAdded event, so the
    /// recreated friend keeps its name and last-online.
    pub pending_unblock: Vec<crate::friends::BlockedFriend>,
    pub quit: bool,
}

impl Model {
    pub fn new(me: SelfInfo, config: Config, paths: Paths, time: Arc<dyn TimeProvider>) -> Self {
        let history = config.ui.history_size;
        let mut windows = WindowRegistry::new();
        let _ = windows.add_window(Window::new(WindowKind::Prompt, "home".to_owned(), history));
        let _ = windows.add_window(Window::new(
            WindowKind::FriendList,
            "contacts".to_owned(),
            history,
        ));
        let last_autosave = time.now();
        Self {
            windows,
            friends: FriendRegistry::new(),
            blocklist: BlockList::new(),
            requests: FriendRequests::new(),
            conferences: ConferenceRegistry::new(),
            groups: GroupRegistry::new(),
            avatar: None,
            audio_ctl: Box::new(NullAudio),
            me,
            config,
            paths,
            time,
            tick_count: 0,
            last_autosave,
            has_focus: true,
            pending_unblock: Vec::new(),
            quit: false,
        }
    }

    pub fn timestamp(&self) -> String {
        if !self.config.ui.timestamps {
            return String::new();
        }
        let fmt = if self.config.ui.time_24h {
            self.config.timestamp_format().to_owned()
        } else {
            self.config
                .timestamp_format()
                .replace("%H", "%I")
                .replace("%R", "%I:%M %p")
        };
        self.time.now_local().format(&fmt).to_string()
    }

    pub fn log_timestamp(&self) -> String {
        self.time
            .now_local()
            .format(&self.config.ui.log_timestamp_format)
            .to_string()
    }

    pub fn self_pk_hex(&self) -> String {
        hex::encode(self.me.pk.0)
    }

    /// Appends a system line to a window by id; a full queue drops the
    /// line silently.
    pub fn line_to(&mut self, id: WinId, kind: LineKind, text: String) -> Option<LineId> {
        let ts = self.timestamp();
        let w = self.windows.get_mut(id)?;
        let line = w.scrollback.add(kind, &ts, "", "", text);
        self.windows.refresh = true;
        line
    }

    pub fn named_line_to(
        &mut self,
        id: WinId,
        kind: LineKind,
        name: &str,
        text: String,
    ) -> Option<LineId> {
        let ts = self.timestamp();
        let w = self.windows.get_mut(id)?;
        let line = w.scrollback.add(kind, &ts, name, "", text);
        self.windows.refresh = true;
        line
    }

    pub fn sys_active(&mut self, text: String) {
        if let Some(id) = self.windows.active().map(|w| w.id) {
            let _ = self.line_to(id, LineKind::System, text);
        }
    }

    pub fn sys_prompt(&mut self, text: String) {
        if let Some(id) = self.windows.prompt_mut().map(|w| w.id) {
            let _ = self.line_to(id, LineKind::System, text);
        }
    }

    /// Opens (or returns) the chat window for a friend. Opening
    /// restores the configured logging default.
    pub fn ensure_chat_window(&mut self, friend: FriendNumber) -> Option<WinId> {
        if let Some(w) = self.windows.chat_mut(friend) {
            return Some(w.id);
        }
        let (name, tab_color) = {
            let f = self.friends.get(friend)?;
            (f.display_name().to_owned(), f.tab_color)
        };
        let mut window = Window::new(
            WindowKind::Chat(friend),
            name,
            self.config.ui.history_size,
        );
        window.tab_color = tab_color;
        let id = self.windows.add_window(window).ok()?;
        // Reopening a window always restores the configured default,
        // even when `/log` toggled it at runtime.
        let autolog = self.config.ui.autolog;
        let over = self
            .friends
            .get(friend)
            .and_then(|f| self.config.friend_overrides(&f.pk))
            .and_then(|o| o.autolog);
        if let Some(f) = self.friends.get_mut(friend) {
            f.logging_on = over.unwrap_or(autolog);
        }
        Some(id)
    }

    /// Resolves the chat-log path for a friend window.
    pub fn friend_log_path(&self, friend: FriendNumber) -> Option<PathBuf> {
        let f = self.friends.get(friend)?;
        Some(chatlog::log_path(
            &self.paths.chatlogs_dir,
            f.display_name(),
            &self.self_pk_hex(),
            &hex::encode(f.pk.0),
        ))
    }

    /// Emits a chat-log append command if logging is on for the
    /// friend.
    pub fn friend_log_cmd(
        &self,
        friend: FriendNumber,
        hint: LogHint,
        name: &str,
        message: &str,
    ) -> Option<Cmd> {
        let f = self.friends.get(friend)?;
        if !f.logging_on {
            return None;
        }
        let path = self.friend_log_path(friend)?;
        let entry = chatlog::format_entry(&self.log_timestamp(), hint, name, message);
        Some(Cmd::IO(IOAction::LogLine(path, entry)))
    }

    pub fn conference_log_path(&self, id_hex: &str, title: &str) -> PathBuf {
        chatlog::log_path(&self.paths.chatlogs_dir, title, &self.self_pk_hex(), id_hex)
    }

    /// Applies an alert flag set to a window; returns the bell command
    /// when the dispatcher asks for one.
    pub fn notify(&mut self, id: WinId, flags: NotifyFlags) -> Option<Cmd> {
        let outcome = notify::resolve(
            self.config.ui.alerts,
            self.me.status,
            self.has_focus,
            flags,
        );
        self.windows.alert(id, outcome.level);
        if outcome.beep {
            Some(Cmd::App(AppCmd::Bell))
        } else {
            None
        }
    }

    /// Cancels every live transfer for a friend (block, delete or
    /// window close) and releases the file handles.
    pub fn cancel_friend_transfers(&mut self, friend: FriendNumber) -> Vec<Cmd> {
        let Some(f) = self.friends.get_mut(friend) else {
            return Vec::new();
        };
        let drained = f.transfers.drain_all();
        let mut cmds = Vec::new();
        for ft in drained {
            cmds.push(Cmd::Tox(crate::msg::ToxAction::FileControl(
                friend,
                ft.file_number,
                toxide_net::FileControl::Cancel,
            )));
            cmds.push(Cmd::IO(IOAction::CloseFile(friend, ft.file_id)));
        }
        cmds
    }

    /// Window close path: transfers cancelled, queued messages freed,
    /// then the window is torn down.
    pub fn close_window(&mut self, id: WinId) -> Vec<Cmd> {
        let kind = match self.windows.get(id) {
            Some(w) => w.kind,
            None => return Vec::new(),
        };
        let mut cmds = Vec::new();
        match kind {
            WindowKind::Chat(friend) => {
                cmds.extend(self.cancel_friend_transfers(friend));
                if let Some(f) = self.friends.get_mut(friend) {
                    f.queue.clear();
                }
            }
            WindowKind::Conference(number) => {
                self.conferences.remove(number);
                cmds.push(Cmd::Tox(crate::msg::ToxAction::ConferenceDelete(number)));
            }
            WindowKind::Group(number) => {
                self.groups.remove(number);
                let part = self.config.ui.group_part_message.clone();
                cmds.push(Cmd::Tox(crate::msg::ToxAction::GroupLeave(number, part)));
            }
            _ => {}
        }
        self.windows.del_window(id);
        cmds
    }

    /// Re-applies configuration after a hot reload: per-contact
    /// defaults, then overrides, then display names and history
    /// bounds.
    pub fn apply_config(&mut self) {
        let config = self.config.clone();
        self.friends.apply_config_all(&config);
        let history = self.config.ui.history_size;
        for w in self.windows.iter_mut() {
            w.scrollback.history_size = history.max(1);
        }
        let renames: Vec<(FriendNumber, String, crate::config::TabColor)> = self
            .friends
            .iter()
            .map(|f| (f.number, f.display_name().to_owned(), f.tab_color))
            .collect();
        for (num, name, color) in renames {
            if let Some(w) = self.windows.chat_mut(num) {
                w.name = name;
                w.tab_color = color;
            }
        }
        self.windows.refresh = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[test]
    fn model_opens_prompt_and_friend_list() {
        let ctx = TestContext::new();
        let model = ctx.create_model();
        assert_eq!(model.windows.len(), 2);
        assert_eq!(model.windows.active().unwrap().kind, WindowKind::Prompt);
    }

    #[test]
    fn ensure_chat_window_is_idempotent() {
        let ctx = TestContext::new();
        let mut model = ctx.create_model();
        let num = ctx.add_friend(&mut model, 0, "alice");
        let a = model.ensure_chat_window(num).unwrap();
        let b = model.ensure_chat_window(num).unwrap();
        assert_eq!(a, b);
        assert_eq!(model.windows.len(), 3);
    }

    #[test]
    fn reopening_chat_restores_configured_logging() {
        let ctx = TestContext::new();
        let mut model = ctx.create_model();
        model.config.ui.autolog = true;
        let num = ctx.add_friend(&mut model, 0, "alice");
        let id = model.ensure_chat_window(num).unwrap();
        model.friends.get_mut(num).unwrap().logging_on = false;
        model.windows.del_window(id);
        model.ensure_chat_window(num).unwrap();
        assert!(model.friends.get(num).unwrap().logging_on);
    }
}
