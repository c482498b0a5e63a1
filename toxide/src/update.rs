//! The dispatcher. Every inbound message lands here; handlers walk
//! the registries and the window list and return the commands for the
//! workers. Nothing in this module blocks.

use crate::chatlog::LogHint;
use crate::commands;
use crate::completion::{self, Outcome};
use crate::config::parse_binding;
use crate::model::Model;
use crate::msg::{AppCmd, Cmd, IOAction, IOEvent, Msg, SystemEvent, ToxAction, ToxEvent};
use crate::notify::NotifyFlags;
use crate::scrollback::{LineId, LineKind};
use crate::transfers::{
    self, FileTransfer, TransferDirection, TransferState, PendingAddError,
};
use crate::utils;
use crate::windows::{FriendListMode, HelpPage, WindowKind};
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::time::Duration;
use toxide_net::{
    Connection, FileControl, FileId, FileKind, FileNumber, FriendNumber, GroupModEvent,
    MessageKind, SendError,
};

pub fn update(model: &mut Model, msg: Msg) -> Vec<Cmd> {
    match msg {
        Msg::Input(CrosstermEvent::Key(key)) => handle_key(model, key),
        Msg::Input(CrosstermEvent::Paste(text)) => {
            let converted: String = text
                .chars()
                .map(|c| if c == '\n' { crate::input::PASTE_PILCROW } else { c })
                .collect();
            if let Some(w) = model.windows.active_mut() {
                w.input.insert_str(&converted);
                model.windows.refresh = true;
            }
            Vec::new()
        }
        Msg::Input(CrosstermEvent::Resize(cols, rows)) => {
            model.windows.set_term_size(cols, rows);
            Vec::new()
        }
        Msg::Input(_) => Vec::new(),
        Msg::Tox(event) => handle_tox_event(model, event),
        Msg::IO(event) => handle_io_event(model, event),
        Msg::System(SystemEvent::Tick) => handle_tick(model),
    }
}

// --- chat area geometry used by scroll keys -------------------------------

fn history_area(model: &Model) -> (usize, usize) {
    let width = model.windows.term_cols.max(2) as usize;
    // tab bar, status bar and input line take three rows.
    let height = model.windows.term_rows.saturating_sub(3).max(1) as usize;
    (width, height)
}

// --- key handling ---------------------------------------------------------

fn handle_key(model: &mut Model, key: KeyEvent) -> Vec<Cmd> {
    model.windows.refresh = true;

    if let Some(cmds) = handle_help_key(model, key) {
        return cmds;
    }
    if let Some(cmds) = handle_bound_key(model, key) {
        return cmds;
    }
    if model
        .windows
        .active()
        .is_some_and(|w| w.kind == WindowKind::FriendList)
    {
        return handle_friendlist_key(model, key);
    }
    handle_chat_key(model, key)
}

fn handle_help_key(model: &mut Model, key: KeyEvent) -> Option<Vec<Cmd>> {
    let w = model.windows.active_mut()?;
    w.help?;
    match key.code {
        KeyCode::Esc | KeyCode::Char('x') => w.help = None,
        KeyCode::Char('m') => w.help = Some(HelpPage::Menu),
        KeyCode::Char('g') => w.help = Some(HelpPage::Global),
        KeyCode::Char('c') => w.help = Some(HelpPage::Chat),
        KeyCode::Char('o') => w.help = Some(HelpPage::Conference),
        KeyCode::Char('r') => w.help = Some(HelpPage::Group),
        KeyCode::Char('k') => w.help = Some(HelpPage::Keys),
        _ => {}
    }
    Some(Vec::new())
}

/// The configurable bindings: tab cycling, scrolling, peer list,
/// paste mode and config reload.
fn handle_bound_key(model: &mut Model, key: KeyEvent) -> Option<Vec<Cmd>> {
    let keys = model.config.keys.clone();
    let pressed = (key.code, key.modifiers);
    let matches = |s: &str| parse_binding(s).is_some_and(|b| (b.code, b.mods) == pressed);

    if matches(&keys.next_tab) {
        model.windows.next_active();
        return Some(Vec::new());
    }
    if matches(&keys.prev_tab) {
        model.windows.prev_active();
        return Some(Vec::new());
    }
    if matches(&keys.reload_config) {
        commands::global::reload_config(model);
        return Some(Vec::new());
    }
    if matches(&keys.toggle_pastemode) {
        model.config.ui.paste_mode = !model.config.ui.paste_mode;
        let state = if model.config.ui.paste_mode { "on" } else { "off" };
        model.sys_active(format!("Paste mode is {}.", state));
        return Some(Vec::new());
    }
    if matches(&keys.toggle_peerlist) {
        if let Some(w) = model.windows.active_mut()
            && matches!(w.kind, WindowKind::Conference(_) | WindowKind::Group(_))
        {
            w.show_peerlist = !w.show_peerlist;
        }
        return Some(Vec::new());
    }

    let (width, height) = history_area(model);
    let scroll = |model: &mut Model, f: &dyn Fn(&mut crate::scrollback::Scrollback)| {
        if let Some(w) = model.windows.active_mut() {
            f(&mut w.scrollback);
        }
    };
    if matches(&keys.scroll_line_up) {
        scroll(model, &|s| s.scroll_line_up());
        return Some(Vec::new());
    }
    if matches(&keys.scroll_line_down) {
        scroll(model, &|s| s.scroll_line_down(width, height));
        return Some(Vec::new());
    }
    if matches(&keys.half_page_up) {
        scroll(model, &|s| s.scroll_half_page_up(height));
        return Some(Vec::new());
    }
    if matches(&keys.half_page_down) {
        scroll(model, &|s| s.scroll_half_page_down(width, height));
        return Some(Vec::new());
    }
    if matches(&keys.page_bottom) {
        scroll(model, &|s| s.jump_bottom(width, height));
        return Some(Vec::new());
    }
    None
}

fn handle_friendlist_key(model: &mut Model, key: KeyEvent) -> Vec<Cmd> {
    let Some(state) = model.windows.active().and_then(|w| w.friendlist) else {
        return Vec::new();
    };

    // Delete confirmation modal swallows everything but y/n.
    if let Some(pos) = state.pending_delete {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                clear_pending_delete(model);
                return match state.mode {
                    FriendListMode::Online => delete_friend_at(model, pos),
                    FriendListMode::Blocked => {
                        if let Some(entry) = model.blocklist.by_index_pos(pos).cloned() {
                            model.blocklist.remove_by_pk(&entry.pk);
                            save_blocklist(model);
                        }
                        Vec::new()
                    }
                };
            }
            _ => {
                clear_pending_delete(model);
                return Vec::new();
            }
        }
    }

    let list_len = match state.mode {
        FriendListMode::Online => model.friends.num_active(),
        FriendListMode::Blocked => model.blocklist.num_blocked(),
    };

    match key.code {
        KeyCode::Up => with_friendlist(model, |s| {
            s.selected = s.selected.saturating_sub(1);
        }),
        KeyCode::Down => with_friendlist(model, |s| {
            if s.selected + 1 < list_len {
                s.selected += 1;
            }
        }),
        KeyCode::Left | KeyCode::Right => with_friendlist(model, |s| {
            s.mode = match s.mode {
                FriendListMode::Online => FriendListMode::Blocked,
                FriendListMode::Blocked => FriendListMode::Online,
            };
            s.selected = 0;
        }),
        KeyCode::Enter => {
            if state.mode == FriendListMode::Online
                && let Some(friend) = model.friends.by_index_pos(state.selected).map(|f| f.number)
                && let Some(id) = model.ensure_chat_window(friend)
            {
                model.windows.set_active(id);
            }
        }
        KeyCode::Delete | KeyCode::Char('d') => {
            if state.selected < list_len {
                with_friendlist(model, |s| s.pending_delete = Some(s.selected));
            }
        }
        KeyCode::Char('b') => return toggle_block(model, &state),
        _ => {}
    }
    Vec::new()
}

fn with_friendlist(model: &mut Model, f: impl FnOnce(&mut crate::windows::FriendListState)) {
    if let Some(w) = model.windows.active_mut()
        && let Some(state) = w.friendlist.as_mut()
    {
        f(state);
    }
}

fn clear_pending_delete(model: &mut Model) {
    with_friendlist(model, |s| s.pending_delete = None);
}

fn delete_friend_at(model: &mut Model, pos: usize) -> Vec<Cmd> {
    let Some(friend) = model.friends.by_index_pos(pos).map(|f| f.number) else {
        return Vec::new();
    };
    let mut cmds = model.cancel_friend_transfers(friend);
    if let Some(w) = model.windows.chat_mut(friend) {
        let id = w.id;
        model.windows.del_window(id);
    }
    if let Some(f) = model.friends.remove(friend) {
        model.sys_prompt(format!("Removed contact {}.", f.display_name()));
    }
    cmds.push(Cmd::Tox(ToxAction::DeleteFriend(friend)));
    cmds.push(Cmd::Tox(ToxAction::StoreData));
    cmds
}

/// `b` on the friend list: block in Online mode, unblock in Blocked
/// mode. Blocking copies the display fields into a block-list slot
/// and deletes the friend; unblocking re-adds without a request.
fn toggle_block(model: &mut Model, state: &crate::windows::FriendListState) -> Vec<Cmd> {
    match state.mode {
        FriendListMode::Online => {
            let Some((friend, entry)) = model.friends.by_index_pos(state.selected).map(|f| {
                (
                    f.number,
                    crate::friends::BlockedFriend {
                        pk: f.pk,
                        name: f.display_name().to_owned(),
                        last_online: f.last_online,
                    },
                )
            }) else {
                return Vec::new();
            };
            let mut cmds = model.cancel_friend_transfers(friend);
            if let Some(w) = model.windows.chat_mut(friend) {
                let id = w.id;
                model.windows.del_window(id);
            }
            model.friends.remove(friend);
            model.blocklist.add(entry);
            save_blocklist(model);
            cmds.push(Cmd::Tox(ToxAction::DeleteFriend(friend)));
            cmds.push(Cmd::Tox(ToxAction::StoreData));
            cmds
        }
        FriendListMode::Blocked => {
            let Some(entry) = model.blocklist.by_index_pos(state.selected).cloned() else {
                return Vec::new();
            };
            model.blocklist.remove_by_pk(&entry.pk);
            save_blocklist(model);
            let pk = entry.pk;
            model.pending_unblock.push(entry);
            vec![Cmd::Tox(ToxAction::AddFriendNorequest(pk))]
        }
    }
}

fn save_blocklist(model: &mut Model) {
    let path = model.paths.blocklist_file.clone();
    if let Err(e) = model.blocklist.save(&path) {
        model.sys_prompt(format!("Failed to save block list: {}", e));
    }
}

fn handle_chat_key(model: &mut Model, key: KeyEvent) -> Vec<Cmd> {
    let mut cmds = Vec::new();

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => {
            if model.config.ui.paste_mode {
                if let Some(w) = model.windows.active_mut() {
                    w.input.insert_char(crate::input::PASTE_PILCROW);
                }
                return cmds;
            }
            return handle_enter(model);
        }
        KeyCode::Tab => {
            handle_completion(model);
            return cmds;
        }
        KeyCode::Backspace => edit(model, |i| i.backspace()),
        KeyCode::Delete => edit(model, |i| i.delete()),
        KeyCode::Left if ctrl => edit(model, |i| i.word_left()),
        KeyCode::Right if ctrl => edit(model, |i| i.word_right()),
        KeyCode::Left => edit(model, |i| i.left()),
        KeyCode::Right => edit(model, |i| i.right()),
        KeyCode::Home => edit(model, |i| i.home()),
        KeyCode::End => edit(model, |i| i.end()),
        KeyCode::Up => edit(model, |i| i.history_up()),
        KeyCode::Down => edit(model, |i| i.history_down()),
        KeyCode::Char('u') if ctrl => edit(model, |i| i.delete_to_start()),
        KeyCode::Char('k') if ctrl => edit(model, |i| i.kill_to_end()),
        KeyCode::Char('y') if ctrl => edit(model, |i| i.yank()),
        KeyCode::Char('w') if ctrl => edit(model, |i| i.delete_word_left()),
        KeyCode::Char('a') if ctrl => edit(model, |i| i.home()),
        KeyCode::Char('e') if ctrl => edit(model, |i| i.end()),
        KeyCode::Char('l') if ctrl => {
            cmds.push(Cmd::App(AppCmd::Redraw));
        }
        KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
            edit(model, |i| i.insert_char(c));
        }
        _ => {}
    }

    cmds.extend(update_typing_status(model));
    cmds
}

fn edit(model: &mut Model, f: impl FnOnce(&mut crate::input::InputBuffer)) {
    if let Some(w) = model.windows.active_mut() {
        f(&mut w.input);
        model.windows.refresh = true;
    }
}

/// Sends a typing notification when the setting is on and the input
/// holds non-command text.
fn update_typing_status(model: &mut Model) -> Vec<Cmd> {
    if !model.config.ui.show_typing_self {
        return Vec::new();
    }
    let Some(w) = model.windows.active_mut() else {
        return Vec::new();
    };
    let WindowKind::Chat(friend) = w.kind else {
        return Vec::new();
    };
    let text = w.input.text();
    let typing = !text.is_empty() && !text.starts_with('/');
    if typing != w.typing_sent {
        w.typing_sent = typing;
        return vec![Cmd::Tox(ToxAction::SetTyping(friend, typing))];
    }
    Vec::new()
}

fn handle_completion(model: &mut Model) {
    let Some(w) = model.windows.active() else {
        return;
    };
    let kind = w.kind;
    let line = w.input.text();
    let cursor = w.input.cursor;

    let outcome = if line.starts_with("/sendfile ") || line.starts_with("/avatar ") {
        completion::complete_path(&line, cursor)
    } else if line.starts_with('/') && !line.contains(' ') {
        completion::complete(&line, cursor, &commands::command_names(kind))
    } else {
        completion::complete(&line, cursor, &name_candidates(model, kind))
    };

    match outcome {
        Outcome::NoMatch => {}
        Outcome::Single { line, cursor } => {
            if let Some(w) = model.windows.active_mut() {
                w.input.set_text(&line);
                w.input.cursor = cursor.min(w.input.len());
            }
        }
        Outcome::Multiple { line, cursor, candidates } => {
            model.sys_active(candidates.join("  "));
            if let Some(w) = model.windows.active_mut() {
                w.input.set_text(&line);
                w.input.cursor = cursor.min(w.input.len());
            }
        }
    }
    model.windows.refresh = true;
}

fn name_candidates(model: &Model, kind: WindowKind) -> Vec<String> {
    let mut names: Vec<String> = match kind {
        WindowKind::Conference(n) => model
            .conferences
            .get(n)
            .map(|c| c.name_list.clone())
            .unwrap_or_default(),
        WindowKind::Group(n) => model
            .groups
            .get(n)
            .map(|g| g.name_list.clone())
            .unwrap_or_default(),
        _ => model
            .friends
            .iter()
            .map(|f| f.display_name().to_owned())
            .collect(),
    };
    names.push(model.me.name.clone());
    names.sort_by_key(|n| n.to_lowercase());
    names.dedup();
    names
}

/// Enter: commands run through the executor, anything else goes down
/// the message pipeline. A blocked-word match suppresses the send and
/// leaves the buffer intact so the user can edit it.
pub fn handle_enter(model: &mut Model) -> Vec<Cmd> {
    let Some(w) = model.windows.active_mut() else {
        return Vec::new();
    };
    let line = w.input.line();
    if line.is_empty() {
        return Vec::new();
    }

    if line.starts_with('/') {
        w.input.push_history(line.clone());
        w.input.clear();
        w.input.reset_history_cursor();
        return commands::execute(model, &line);
    }

    if model.config.matches_blocked_word(&line) {
        model.sys_active("* Message contains blocked word".to_owned());
        return Vec::new();
    }

    let w = model.windows.active_mut().unwrap();
    w.input.push_history(line.clone());
    w.input.clear();
    w.input.reset_history_cursor();
    send_text(model, line, MessageKind::Normal)
}

/// The outbound message pipeline for the active window.
pub fn send_text(model: &mut Model, text: String, kind: MessageKind) -> Vec<Cmd> {
    let Some(window_kind) = model.windows.active().map(|w| w.kind) else {
        return Vec::new();
    };
    match window_kind {
        WindowKind::Chat(friend) => send_friend_text(model, friend, text, kind),
        WindowKind::Conference(number) => {
            // Conference messages echo back through the peer callback.
            vec![Cmd::Tox(ToxAction::ConferenceSendMessage(number, kind, text))]
        }
        WindowKind::Group(number) => {
            let (ts, name) = (
                model.timestamp(),
                model
                    .groups
                    .get(number)
                    .map(|g| g.self_name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| model.me.name.clone()),
            );
            let line_kind = match kind {
                MessageKind::Normal => LineKind::OutMessage,
                MessageKind::Action => LineKind::OutAction,
            };
            if let Some(w) = model.windows.group_mut(number) {
                let _ = w.scrollback.add(line_kind, &ts, &name, "", text.clone());
            }
            let mut cmds = group_log(model, number, LogHint::Message, &name, &text);
            cmds.push(Cmd::Tox(ToxAction::GroupSendMessage(number, kind, text)));
            cmds
        }
        _ => {
            model.sys_active("Invalid command.".to_owned());
            Vec::new()
        }
    }
}

fn send_friend_text(
    model: &mut Model,
    friend: FriendNumber,
    text: String,
    kind: MessageKind,
) -> Vec<Cmd> {
    let Some(f) = model.friends.get(friend) else {
        return Vec::new();
    };
    let online = f.connection.is_online();
    let ts = model.timestamp();
    let name = model.me.name.clone();
    let line_kind = match kind {
        MessageKind::Normal => LineKind::OutMessage,
        MessageKind::Action => LineKind::OutAction,
    };

    let Some(w) = model.windows.chat_mut(friend) else {
        return Vec::new();
    };
    let Some(line_id) = w.scrollback.add(line_kind, &ts, &name, "", text.clone()) else {
        return Vec::new();
    };
    if !online {
        w.scrollback.set_noread(line_id, true);
    }
    w.typing_sent = false;

    let now = model.time.now();
    let log_cmd = model.friend_log_cmd(friend, LogHint::Message, &name, &text);
    if let Some(f) = model.friends.get_mut(friend) {
        f.queue.enqueue(line_id, text.clone(), kind, now);
    }

    let mut cmds = vec![
        Cmd::Tox(ToxAction::SetTyping(friend, false)),
        Cmd::Tox(ToxAction::SendMessage(friend, kind, text, line_id)),
    ];
    cmds.extend(log_cmd);
    cmds
}

// --- file transfer entry points -------------------------------------------

/// `/sendfile` path: open the file for sending or queue the path when
/// the friend is offline.
pub fn send_file(model: &mut Model, friend: FriendNumber, path_str: &str) -> Vec<Cmd> {
    let path = PathBuf::from(path_str);
    let Some(f) = model.friends.get(friend) else {
        return Vec::new();
    };

    if !f.connection.is_online() {
        let result = model
            .friends
            .get_mut(friend)
            .map(|f| f.transfers.pending_add(&path));
        match result {
            Some(Ok(idx)) => {
                model.sys_active(format!("File transfer queued: {} ({})", path_str, idx));
            }
            Some(Err(PendingAddError::EmptyPath)) => {
                model.sys_active("Invalid file path.".to_owned());
            }
            Some(Err(PendingAddError::NameTooLong)) => {
                model.sys_active("File name is too long.".to_owned());
            }
            Some(Err(PendingAddError::QueueFull)) => {
                model.sys_active("File transfer queue is full.".to_owned());
            }
            None => {}
        }
        return Vec::new();
    }

    let Ok(meta) = std::fs::metadata(&path) else {
        model.sys_active(format!("File not found: {}", path_str));
        return Vec::new();
    };
    if !meta.is_file() {
        model.sys_active("Invalid file path.".to_owned());
        return Vec::new();
    }
    let size = meta.len();
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        model.sys_active("Invalid file path.".to_owned());
        return Vec::new();
    };
    if name.len() > toxide_net::MAX_FILENAME_LENGTH {
        model.sys_active("File name is too long.".to_owned());
        return Vec::new();
    }

    let Some(slot) = model
        .friends
        .get(friend)
        .and_then(|f| f.transfers.free_slot(TransferDirection::Send))
    else {
        model.sys_active("Too many concurrent file transfers.".to_owned());
        return Vec::new();
    };

    let ts = model.timestamp();
    let line_id = model
        .windows
        .chat_mut(friend)
        .and_then(|w| {
            w.scrollback.add(
                LineKind::System,
                &ts,
                "",
                "",
                format!("Sending file [{}]: '{}' ({})", slot, name, utils::format_size(size)),
            )
        });

    let now = model.time.now();
    let ft = FileTransfer {
        state: TransferState::Pending,
        direction: TransferDirection::Send,
        kind: FileKind::Data,
        file_id: FileId([0; 32]),
        file_number: FileNumber(0),
        friend,
        slot,
        name: name.clone(),
        path,
        size,
        position: 0,
        bps: 0,
        last_progress: now,
        last_activity: now,
        line_id,
    };
    if let Some(f) = model.friends.get_mut(friend) {
        f.transfers.insert(ft);
    }
    vec![Cmd::Tox(ToxAction::FileSend(
        friend,
        FileKind::Data,
        size,
        None,
        name,
        slot,
    ))]
}

/// `/savefile` path: open the destination and ask the sender to
/// resume.
pub fn save_file(model: &mut Model, friend: FriendNumber, slot: usize) -> Vec<Cmd> {
    let ts = model.timestamp();
    let Some(f) = model.friends.get_mut(friend) else {
        return Vec::new();
    };
    let Some(ft) = f.transfers.get_mut(TransferDirection::Receive, slot) else {
        model.sys_active("Invalid file transfer number.".to_owned());
        return Vec::new();
    };
    if ft.state != TransferState::Pending {
        model.sys_active("That transfer is already underway.".to_owned());
        return Vec::new();
    }
    ft.state = TransferState::Started;
    let (file_id, file_number, name, path, size) = (
        ft.file_id,
        ft.file_number,
        ft.name.clone(),
        ft.path.clone(),
        ft.size,
    );

    let line_id = model.windows.chat_mut(friend).and_then(|w| {
        w.scrollback.add(
            LineKind::System,
            &ts,
            "",
            "",
            format!("Receiving '{}': {}", name, utils::progress_bar(0, size, 20)),
        )
    });
    if let Some(ft) = model
        .friends
        .get_mut(friend)
        .and_then(|f| f.transfers.get_mut(TransferDirection::Receive, slot))
    {
        ft.line_id = line_id;
    }

    vec![
        Cmd::IO(IOAction::FileOpenWrite(friend, file_id, path)),
        Cmd::Tox(ToxAction::FileControl(friend, file_number, FileControl::Resume)),
    ]
}

/// Broadcast-to-one: a zero-length send means "unset avatar".
pub fn avatar_send(model: &mut Model, friend: FriendNumber) -> Vec<Cmd> {
    let online = model
        .friends
        .get(friend)
        .map(|f| f.connection.is_online())
        .unwrap_or(false);
    if !online {
        return Vec::new();
    }
    let (name, path, size) = match &model.avatar {
        Some(a) => (a.name.clone(), a.path.clone(), a.size),
        None => (String::new(), PathBuf::new(), 0),
    };

    let Some(slot) = model
        .friends
        .get(friend)
        .and_then(|f| f.transfers.free_slot(TransferDirection::Send))
    else {
        return Vec::new();
    };

    if size > 0 {
        let now = model.time.now();
        let ft = FileTransfer {
            state: TransferState::Pending,
            direction: TransferDirection::Send,
            kind: FileKind::Avatar,
            file_id: FileId([0; 32]),
            file_number: FileNumber(0),
            friend,
            slot,
            name: name.clone(),
            path,
            size,
            position: 0,
            bps: 0,
            last_progress: now,
            last_activity: now,
            line_id: None,
        };
        if let Some(f) = model.friends.get_mut(friend) {
            f.transfers.insert(ft);
        }
    }
    vec![Cmd::Tox(ToxAction::FileSend(
        friend,
        FileKind::Avatar,
        size,
        None,
        name,
        slot,
    ))]
}

// --- network events -------------------------------------------------------

fn chat_line(model: &mut Model, friend: FriendNumber, kind: LineKind, name: &str, text: String) {
    let ts = model.timestamp();
    if let Some(w) = model.windows.chat_mut(friend) {
        let _ = w.scrollback.add(kind, &ts, name, "", text);
        model.windows.refresh = true;
    }
}

fn group_log(
    model: &Model,
    number: toxide_net::GroupNumber,
    hint: LogHint,
    name: &str,
    text: &str,
) -> Vec<Cmd> {
    // Group logging follows the global autolog default.
    if !model.config.ui.autolog {
        return Vec::new();
    }
    let Some(g) = model.groups.get(number) else {
        return Vec::new();
    };
    let title = if g.name.is_empty() { "group" } else { &g.name };
    let path = model.conference_log_path(&hex::encode(g.chat_id.0), title);
    let entry = crate::chatlog::format_entry(&model.log_timestamp(), hint, name, text);
    vec![Cmd::IO(IOAction::LogLine(path, entry))]
}

fn handle_tox_event(model: &mut Model, event: ToxEvent) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    match event {
        ToxEvent::SelfConnectionStatus(status) => {
            model.me.connection = status;
            let text = if status.is_online() {
                "DHT connected."
            } else {
                "DHT disconnected."
            };
            let kind = if status.is_online() {
                LineKind::Connection
            } else {
                LineKind::Disconnection
            };
            if let Some(id) = model.windows.prompt_mut().map(|w| w.id) {
                let _ = model.line_to(id, kind, text.to_owned());
            }
        }
        ToxEvent::SelfAddress(address) => {
            model.me.address = address;
            model.sys_prompt(format!("Your new Tox ID is: {}", address));
        }
        ToxEvent::FriendRequest(pk, message) => {
            cmds.extend(handle_friend_request(model, pk, message));
        }
        ToxEvent::FriendAdded(number, pk) => {
            let config = model.config.clone();
            model.friends.add(number, pk, &config);
            if let Some(pos) = model.pending_unblock.iter().position(|b| b.pk == pk) {
                let restored = model.pending_unblock.remove(pos);
                if let Some(f) = model.friends.get_mut(number) {
                    f.name = restored.name;
                    f.last_online = restored.last_online;
                }
                model.friends.sort();
            } else {
                model.sys_prompt("Friend added.".to_owned());
            }
            cmds.push(Cmd::Tox(ToxAction::StoreData));
        }
        ToxEvent::FriendAddFailed(error) => {
            model.sys_prompt(format!("Failed to add friend: {}", error));
        }
        ToxEvent::FriendConnectionStatus(number, connection) => {
            cmds.extend(handle_friend_connection(model, number, connection));
        }
        ToxEvent::FriendMessage(number, kind, text) => {
            cmds.extend(handle_friend_message(model, number, kind, text));
        }
        ToxEvent::FriendName(number, name) => {
            cmds.extend(handle_friend_name(model, number, name));
        }
        ToxEvent::FriendStatus(number, status) => {
            if let Some(f) = model.friends.get_mut(number) {
                f.status = status;
            }
            model.windows.refresh = true;
        }
        ToxEvent::FriendStatusMessage(number, message) => {
            if let Some(f) = model.friends.get_mut(number) {
                f.status_message = message;
            }
            model.windows.refresh = true;
        }
        ToxEvent::FriendTyping(number, typing) => {
            if let Some(f) = model.friends.get_mut(number) {
                f.is_typing = typing && model.config.ui.show_typing_other;
            }
            model.windows.refresh = true;
        }
        ToxEvent::ReadReceipt(number, receipt) => {
            let acked = model
                .friends
                .get_mut(number)
                .map(|f| f.queue.ack(receipt))
                .unwrap_or_default();
            if let Some(w) = model.windows.chat_mut(number) {
                for line_id in acked {
                    w.scrollback.mark_read(line_id);
                }
            }
            model.windows.refresh = true;
        }
        ToxEvent::MessageSent(number, receipt, line_id) => {
            if let Some(f) = model.friends.get_mut(number) {
                f.queue.set_receipt(line_id, receipt);
            }
        }
        ToxEvent::MessageSendFailed(number, line_id, error) => {
            if error == SendError::FriendNotConnected {
                // Keep it queued with the unread mark; reconnect
                // drains the queue.
                if let Some(w) = model.windows.chat_mut(number) {
                    w.scrollback.set_noread(line_id, true);
                }
            } else {
                chat_line(
                    model,
                    number,
                    LineKind::System,
                    "",
                    format!("Message failed to send: {}", error),
                );
            }
        }
        ToxEvent::ConferenceInvite(number, kind, cookie) => {
            let name = model
                .friends
                .get(number)
                .map(|f| f.display_name().to_owned())
                .unwrap_or_default();
            if let Some(f) = model.friends.get_mut(number) {
                f.conference_invite = Some(crate::friends::ConferenceInvite { kind, cookie });
            }
            let target = model
                .windows
                .chat_mut(number)
                .map(|w| w.id)
                .or_else(|| model.windows.prompt_mut().map(|w| w.id));
            if let Some(id) = target {
                let _ = model.line_to(
                    id,
                    LineKind::System,
                    format!("{} has invited you to a conference (/cjoin to join).", name),
                );
                let mut flags = NotifyFlags::WNDALERT_1.union(NotifyFlags::NOFOCUS);
                if model.config.ui.bell_on_invite {
                    flags = flags.union(NotifyFlags::BEEP);
                }
                cmds.extend(model.notify(id, flags));
            }
        }
        ToxEvent::ConferenceCreated(number, id, kind) => {
            let now = model.time.now();
            let mut conference = crate::conference::Conference::new(number, kind, now);
            conference.id = Some(id);
            model.conferences.add(conference);
            let window = crate::windows::Window::new(
                WindowKind::Conference(number),
                format!("Conference {}", number.0),
                model.config.ui.history_size,
            );
            if let Ok(win_id) = model.windows.add_window(window) {
                model.windows.set_active(win_id);
            } else {
                model.sys_prompt("Failed to open a conference window.".to_owned());
            }
        }
        ToxEvent::ConferenceMessage(number, _peer, pk, name, kind, text) => {
            let is_self = pk == model.me.pk;
            let line_kind = match (kind, is_self) {
                (MessageKind::Normal, false) => LineKind::InMessage,
                (MessageKind::Normal, true) => LineKind::OutMessage,
                (MessageKind::Action, false) => LineKind::InAction,
                (MessageKind::Action, true) => LineKind::OutAction,
            };
            let ts = model.timestamp();
            let mentioned = !is_self && mentions_self(model, &text);
            if let Some(w) = model.windows.conference_mut(number) {
                let id = w.id;
                let _ = w.scrollback.add(line_kind, &ts, &name, "", text);
                if !is_self {
                    let mut flags = if mentioned {
                        NotifyFlags::WNDALERT_0
                    } else {
                        NotifyFlags::WNDALERT_1
                    };
                    if model.config.ui.bell_on_message {
                        flags = flags.union(NotifyFlags::BEEP);
                    }
                    cmds.extend(model.notify(id, flags));
                }
            }
        }
        ToxEvent::ConferencePeerList(number, peers) => {
            let now = model.time.now();
            let show = model.config.ui.show_group_connection_msg;
            if let Some(conf) = model.conferences.get_mut(number) {
                let delta = conf.update_peers(peers, now);
                if show {
                    for name in delta.joined {
                        let glyph = model.config.ui.line_join.clone();
                        conference_line(
                            model,
                            number,
                            LineKind::Connection,
                            format!("{} {} has joined the conference", glyph, name),
                        );
                    }
                    for name in delta.left {
                        let glyph = model.config.ui.line_quit.clone();
                        conference_line(
                            model,
                            number,
                            LineKind::Disconnection,
                            format!("{} {} has left the conference", glyph, name),
                        );
                    }
                }
            }
            model.windows.refresh = true;
        }
        ToxEvent::ConferencePeerName(number, peer, name) => {
            if let Some(conf) = model.conferences.get_mut(number) {
                conf.set_peer_name(peer, name);
            }
            model.windows.refresh = true;
        }
        ToxEvent::ConferenceTitle(number, title) => {
            if let Some(conf) = model.conferences.get_mut(number) {
                conf.title = title.clone();
            }
            model.conferences.sort();
            if let Some(w) = model.windows.conference_mut(number) {
                if !title.is_empty() {
                    w.name = title.clone();
                }
            }
            conference_line(
                model,
                number,
                LineKind::NameChange,
                format!("Title set to: {}", title),
            );
        }
        ToxEvent::FileRecv(number, file, kind, size, name, file_id) => {
            cmds.extend(handle_file_recv(model, number, file, kind, size, name, file_id));
        }
        ToxEvent::FileChunkRequest(number, file, position, length) => {
            cmds.extend(handle_chunk_request(model, number, file, position, length));
        }
        ToxEvent::FileRecvChunk(number, file, position, data) => {
            cmds.extend(handle_recv_chunk(model, number, file, position, data));
        }
        ToxEvent::FileControlRecv(number, file, control) => {
            cmds.extend(handle_file_control(model, number, file, control));
        }
        ToxEvent::FileSendStarted(number, file, file_id, kind, slot) => {
            let path = model.friends.get_mut(number).and_then(|f| {
                f.transfers
                    .get_mut(TransferDirection::Send, slot)
                    .filter(|ft| ft.kind == kind)
                    .map(|ft| {
                        ft.file_number = file;
                        ft.file_id = file_id;
                        ft.state = TransferState::Pending;
                        ft.path.clone()
                    })
            });
            if let Some(path) = path {
                cmds.push(Cmd::IO(IOAction::FileOpenRead(number, file_id, path)));
            }
        }
        ToxEvent::FileSendFailed(number, slot, kind, error) => {
            let taken = model
                .friends
                .get_mut(number)
                .and_then(|f| f.transfers.take(TransferDirection::Send, slot))
                .filter(|ft| ft.kind == kind);
            if let Some(ft) = taken
                && ft.kind == FileKind::Data
            {
                chat_line(
                    model,
                    number,
                    LineKind::System,
                    "",
                    format!("File transfer for '{}' failed: {}", ft.name, error),
                );
            }
        }
        ToxEvent::GroupInvite(number, data, group_name) => {
            let name = model
                .friends
                .get(number)
                .map(|f| f.display_name().to_owned())
                .unwrap_or_default();
            if let Some(f) = model.friends.get_mut(number) {
                f.group_invite = Some(crate::friends::GroupInvite {
                    data,
                    name: group_name.clone(),
                });
            }
            let target = model
                .windows
                .chat_mut(number)
                .map(|w| w.id)
                .or_else(|| model.windows.prompt_mut().map(|w| w.id));
            if let Some(id) = target {
                let _ = model.line_to(
                    id,
                    LineKind::System,
                    format!(
                        "{} has invited you to group '{}' (/gaccept to join).",
                        name, group_name
                    ),
                );
                let mut flags = NotifyFlags::WNDALERT_1.union(NotifyFlags::NOFOCUS);
                if model.config.ui.bell_on_invite {
                    flags = flags.union(NotifyFlags::BEEP);
                }
                cmds.extend(model.notify(id, flags));
            }
        }
        ToxEvent::GroupCreated(number, chat_id, name, self_name, role) => {
            let mut group = crate::group::Group::new(number, chat_id);
            group.name = name.clone();
            group.self_name = self_name;
            group.self_role = role;
            group.time_connected = Some(model.time.now());
            model.groups.add(group);
            let title = if name.is_empty() {
                format!("Group {}", number.0)
            } else {
                name
            };
            let window = crate::windows::Window::new(
                WindowKind::Group(number),
                title,
                model.config.ui.history_size,
            );
            if let Ok(win_id) = model.windows.add_window(window) {
                model.windows.set_active(win_id);
            } else {
                model.sys_prompt("Failed to open a group window.".to_owned());
            }
        }
        ToxEvent::GroupMessage(number, peer, name, kind, text) => {
            if model
                .groups
                .get(number)
                .map(|g| g.is_ignored(peer))
                .unwrap_or(false)
            {
                return cmds;
            }
            let line_kind = match kind {
                MessageKind::Normal => LineKind::InMessage,
                MessageKind::Action => LineKind::InAction,
            };
            let ts = model.timestamp();
            let mentioned = mentions_self_in_group(model, number, &text);
            cmds.extend(group_log(model, number, LogHint::Message, &name, &text));
            if let Some(w) = model.windows.group_mut(number) {
                let id = w.id;
                let _ = w.scrollback.add(line_kind, &ts, &name, "", text);
                let mut flags = if mentioned {
                    NotifyFlags::WNDALERT_0.union(NotifyFlags::NOFOCUS)
                } else {
                    NotifyFlags::WNDALERT_1
                };
                if model.config.ui.bell_on_message && mentioned {
                    flags = flags.union(NotifyFlags::BEEP);
                }
                cmds.extend(model.notify(id, flags));
            }
        }
        ToxEvent::GroupPrivateMessage(number, peer, name, _kind, text) => {
            if model
                .groups
                .get(number)
                .map(|g| g.is_ignored(peer))
                .unwrap_or(false)
            {
                return cmds;
            }
            let ts = model.timestamp();
            if let Some(w) = model.windows.group_mut(number) {
                let id = w.id;
                let _ = w.scrollback.add(LineKind::InPrivate, &ts, &name, "", text);
                let mut flags = NotifyFlags::WNDALERT_0.union(NotifyFlags::NOFOCUS);
                if model.config.ui.bell_on_message {
                    flags = flags.union(NotifyFlags::BEEP);
                }
                cmds.extend(model.notify(id, flags));
            }
        }
        ToxEvent::GroupPeerJoin(number, peer, pk, name, role) => {
            let now = model.time.now();
            let announce = model.config.ui.show_group_connection_msg
                && model
                    .groups
                    .get(number)
                    .and_then(|g| g.time_connected)
                    .is_some_and(|t| {
                        now.duration_since(t) > crate::conference::JOIN_ANNOUNCE_DEBOUNCE
                    });
            if let Some(g) = model.groups.get_mut(number) {
                g.add_peer(peer, pk, name.clone(), role, now);
            }
            if announce {
                let glyph = model.config.ui.line_join.clone();
                group_line(
                    model,
                    number,
                    LineKind::Connection,
                    format!("{} {} has joined the room", glyph, name),
                );
            }
            model.windows.refresh = true;
        }
        ToxEvent::GroupPeerExit(number, peer, nick, part_message) => {
            if let Some(g) = model.groups.get_mut(number) {
                g.remove_peer(peer);
            }
            if model.config.ui.show_group_connection_msg {
                let glyph = model.config.ui.line_quit.clone();
                let suffix = if part_message.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", part_message)
                };
                group_line(
                    model,
                    number,
                    LineKind::Disconnection,
                    format!("{} {} has left the room{}", glyph, nick, suffix),
                );
            }
            model.windows.refresh = true;
        }
        ToxEvent::GroupTopic(number, by, topic) => {
            if let Some(g) = model.groups.get_mut(number) {
                g.topic = topic.clone();
            }
            group_line(
                model,
                number,
                LineKind::NameChange,
                format!("{} set the topic to: {}", by, topic),
            );
            cmds.extend(group_log(model, number, LogHint::Topic, &by, &topic));
        }
        ToxEvent::GroupPeerLimit(number, limit) => {
            group_line(
                model,
                number,
                LineKind::System,
                format!("The peer limit has been set to {}.", limit),
            );
        }
        ToxEvent::GroupPrivacyState(number, privacy) => {
            group_line(
                model,
                number,
                LineKind::System,
                format!("The group is now {:?}.", privacy).to_lowercase(),
            );
        }
        ToxEvent::GroupTopicLock(number, lock) => {
            let text = match lock {
                toxide_net::GroupTopicLock::Enabled => "The topic is now locked.",
                toxide_net::GroupTopicLock::Disabled => "The topic is now unlocked.",
            };
            group_line(model, number, LineKind::System, text.to_owned());
        }
        ToxEvent::GroupVoiceState(number, state) => {
            group_line(
                model,
                number,
                LineKind::System,
                format!("Voice state changed: {:?}.", state),
            );
        }
        ToxEvent::GroupPassword(number, password) => {
            let text = if password.is_empty() {
                "The group password has been cleared.".to_owned()
            } else {
                "The group password has been changed.".to_owned()
            };
            group_line(model, number, LineKind::System, text);
        }
        ToxEvent::GroupNickChange(number, peer, new_name) => {
            let old = model
                .groups
                .get_mut(number)
                .and_then(|g| g.rename_peer(peer, new_name.clone()));
            if let Some(old) = old {
                group_line(
                    model,
                    number,
                    LineKind::NameChange,
                    format!("{} is now known as {}", old, new_name),
                );
            }
        }
        ToxEvent::GroupStatusChange(number, peer, status) => {
            if let Some(g) = model.groups.get_mut(number)
                && let Some(p) = g.peer_mut(peer)
            {
                p.status = status;
            }
            model.windows.refresh = true;
        }
        ToxEvent::GroupSelfJoin(number, topic, name) => {
            if let Some(g) = model.groups.get_mut(number) {
                if !name.is_empty() {
                    g.name = name.clone();
                }
                g.topic = topic.clone();
                g.time_connected = Some(model.time.now());
            }
            model.groups.sort();
            if let Some(w) = model.windows.group_mut(number)
                && !name.is_empty()
            {
                w.name = name;
            }
            group_line(model, number, LineKind::Connection, "Connected to the group.".to_owned());
            if !topic.is_empty() {
                group_line(model, number, LineKind::System, format!("Topic: {}", topic));
            }
        }
        ToxEvent::GroupRejected(number, reason) => {
            group_line(
                model,
                number,
                LineKind::System,
                format!("Failed to join the group: {:?}", reason),
            );
        }
        ToxEvent::GroupModeration(number, source, target, event) => {
            cmds.extend(handle_group_moderation(model, number, source, target, event));
        }
    }
    cmds
}

fn conference_line(
    model: &mut Model,
    number: toxide_net::ConferenceNumber,
    kind: LineKind,
    text: String,
) {
    let ts = model.timestamp();
    if let Some(w) = model.windows.conference_mut(number) {
        let _ = w.scrollback.add(kind, &ts, "", "", text);
        model.windows.refresh = true;
    }
}

fn group_line(model: &mut Model, number: toxide_net::GroupNumber, kind: LineKind, text: String) {
    let ts = model.timestamp();
    if let Some(w) = model.windows.group_mut(number) {
        let _ = w.scrollback.add(kind, &ts, "", "", text);
        model.windows.refresh = true;
    }
}

fn mentions_self(model: &Model, text: &str) -> bool {
    mention_matches(&model.me.name, text)
}

fn mentions_self_in_group(model: &Model, number: toxide_net::GroupNumber, text: &str) -> bool {
    let group_nick = model.groups.get(number).map(|g| g.self_name.clone());
    match group_nick {
        Some(nick) if !nick.is_empty() => {
            mention_matches(&nick, text) || mentions_self(model, text)
        }
        _ => mentions_self(model, text),
    }
}

fn mention_matches(name: &str, text: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let pattern = format!(r"(?i)(^|\W){}($|\W)", regex::escape(name));
    regex::Regex::new(&pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

fn handle_friend_request(
    model: &mut Model,
    pk: toxide_net::PublicKey,
    message: String,
) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    if model.blocklist.contains(&pk) {
        return cmds;
    }
    let collides = model.friends.key_prefix_collides(&pk);
    match model.requests.add(pk, message.clone()) {
        Some(slot) => {
            if collides {
                model.sys_prompt(
                    "WARNING: This contact's public key is suspiciously similar to that of an \
                     existing contact. Check the key carefully before accepting."
                        .to_owned(),
                );
            }
            model.sys_prompt(format!("Friend request with the message: {}", message));
            model.sys_prompt(format!("Use \"/accept {}\" to accept it.", slot));
            if let Some(id) = model.windows.prompt_mut().map(|w| w.id) {
                let mut flags = NotifyFlags::WNDALERT_1.union(NotifyFlags::NOFOCUS);
                if model.config.ui.bell_on_invite {
                    flags = flags.union(NotifyFlags::BEEP);
                }
                cmds.extend(model.notify(id, flags));
            }
        }
        None => {
            model.sys_prompt("A friend request was dropped: the request queue is full.".to_owned());
        }
    }
    cmds
}

fn handle_friend_connection(
    model: &mut Model,
    number: FriendNumber,
    connection: Connection,
) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    let Some(previous) = model.friends.get(number).map(|f| f.connection) else {
        return cmds;
    };
    model.friends.set_connection(number, connection);
    let went_online = !previous.is_online() && connection.is_online();
    let went_offline = previous.is_online() && !connection.is_online();

    let (name, show_msg) = model
        .friends
        .get(number)
        .map(|f| (f.display_name().to_owned(), f.show_connection_msg))
        .unwrap_or_default();

    if went_offline {
        let ts = model.time.now_local().timestamp();
        let ts_str = model.timestamp();
        if let Some(f) = model.friends.get_mut(number) {
            f.last_online = ts;
            f.last_online_str = ts_str;
        }
        if show_msg {
            let glyph = model.config.ui.line_quit.clone();
            chat_line(
                model,
                number,
                LineKind::Disconnection,
                "",
                format!("{} {} has gone offline", glyph, name),
            );
            cmds.extend(model.friend_log_cmd(number, LogHint::Disconnect, &name, "has gone offline"));
        }
        cmds.extend(pause_transfers_on_disconnect(model, number));
    }

    if went_online {
        if show_msg {
            let glyph = model.config.ui.line_join.clone();
            chat_line(model, number, LineKind::Connection, "", format!("{} {} has come online", glyph, name));
            cmds.extend(model.friend_log_cmd(number, LogHint::Connect, &name, "has come online"));
        }
        cmds.extend(resume_transfers_on_reconnect(model, number));
        cmds.extend(drain_pending_sends(model, number));
        cmds.extend(resend_unreceipted(model, number));
        if model.avatar.is_some() {
            cmds.extend(avatar_send(model, number));
        }
    }

    model.windows.refresh = true;
    cmds
}

/// Friend went offline: every started DATA transfer pauses; avatar
/// senders are killed outright.
fn pause_transfers_on_disconnect(model: &mut Model, number: FriendNumber) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    let Some(f) = model.friends.get_mut(number) else {
        return cmds;
    };
    let mut dead_avatars = Vec::new();
    for ft in f.transfers.iter_mut() {
        match ft.kind {
            FileKind::Data => {
                if ft.state == TransferState::Started {
                    ft.state = TransferState::Paused;
                }
            }
            FileKind::Avatar => dead_avatars.push((ft.direction, ft.slot)),
        }
    }
    for (direction, slot) in dead_avatars {
        if let Some(ft) = f.transfers.take(direction, slot) {
            cmds.push(Cmd::IO(IOAction::CloseFile(number, ft.file_id)));
        }
    }
    cmds
}

/// Reconnect: paused senders restart with the same stable file id and
/// a fresh filenumber.
fn resume_transfers_on_reconnect(model: &mut Model, number: FriendNumber) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    let restarts: Vec<(usize, FileKind, u64, FileId, String)> = model
        .friends
        .get_mut(number)
        .map(|f| {
            f.transfers
                .iter_mut()
                .filter(|ft| {
                    ft.direction == TransferDirection::Send && ft.state == TransferState::Paused
                })
                .map(|ft| (ft.slot, ft.kind, ft.size, ft.file_id, ft.name.clone()))
                .collect()
        })
        .unwrap_or_default();
    for (slot, kind, size, file_id, name) in restarts {
        cmds.push(Cmd::Tox(ToxAction::FileSend(
            number,
            kind,
            size,
            Some(file_id),
            name,
            slot,
        )));
    }
    cmds
}

fn drain_pending_sends(model: &mut Model, number: FriendNumber) -> Vec<Cmd> {
    let pending = model
        .friends
        .get_mut(number)
        .map(|f| f.transfers.pending_drain())
        .unwrap_or_default();
    let mut cmds = Vec::new();
    for entry in pending {
        cmds.extend(send_file(model, number, &entry.path.to_string_lossy()));
    }
    cmds
}

fn resend_unreceipted(model: &mut Model, number: FriendNumber) -> Vec<Cmd> {
    let entries = model
        .friends
        .get_mut(number)
        .map(|f| f.queue.unsent())
        .unwrap_or_default();
    entries
        .into_iter()
        .map(|e| Cmd::Tox(ToxAction::SendMessage(number, e.kind, e.text, e.line_id)))
        .collect()
}

fn handle_friend_message(
    model: &mut Model,
    number: FriendNumber,
    kind: MessageKind,
    text: String,
) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    if model.friends.get(number).is_none() {
        return cmds;
    }
    let win_id = match model.ensure_chat_window(number) {
        Some(id) => id,
        None => return cmds,
    };
    let name = model
        .friends
        .get(number)
        .map(|f| f.display_name().to_owned())
        .unwrap_or_default();
    let line_kind = match kind {
        MessageKind::Normal => LineKind::InMessage,
        MessageKind::Action => LineKind::InAction,
    };
    let ts = model.timestamp();
    if let Some(w) = model.windows.get_mut(win_id) {
        let _ = w.scrollback.add(line_kind, &ts, &name, "", text.clone());
    }
    let mut flags = NotifyFlags::WNDALERT_1.union(NotifyFlags::NOFOCUS);
    if model.config.ui.bell_on_message {
        flags = flags.union(NotifyFlags::BEEP);
    }
    cmds.extend(model.notify(win_id, flags));
    let hint = match kind {
        MessageKind::Normal => LogHint::Message,
        MessageKind::Action => LogHint::Action,
    };
    cmds.extend(model.friend_log_cmd(number, hint, &name, &text));
    cmds
}

fn handle_friend_name(model: &mut Model, number: FriendNumber, name: String) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    let Some(old) = model.friends.get(number).map(|f| f.name.clone()) else {
        return cmds;
    };
    if old == name || name.is_empty() {
        return cmds;
    }
    let old_path = model.friend_log_path(number);
    let aliased = model
        .friends
        .get(number)
        .map(|f| f.alias.is_some())
        .unwrap_or(false);
    if let Some(f) = model.friends.get_mut(number) {
        f.name = name.clone();
    }
    model.friends.sort();

    if !aliased {
        // The display name changed: move the log and retitle the tab.
        if let (Some(from), Some(to)) = (old_path, model.friend_log_path(number))
            && from != to
        {
            cmds.push(Cmd::IO(IOAction::LogRename(from, to)));
        }
        if let Some(w) = model.windows.chat_mut(number) {
            w.name = name.clone();
        }
        chat_line(
            model,
            number,
            LineKind::NameChange,
            "",
            format!("{} is now known as {}", old, name),
        );
        cmds.extend(model.friend_log_cmd(
            number,
            LogHint::NameChange,
            &old,
            &format!("is now known as {}", name),
        ));
    }
    cmds
}

fn handle_file_recv(
    model: &mut Model,
    number: FriendNumber,
    file: FileNumber,
    kind: FileKind,
    size: u64,
    name: String,
    file_id: FileId,
) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    if model.friends.get(number).is_none() {
        return cmds;
    }

    // Incoming avatars are declined; only sending is supported.
    if kind == FileKind::Avatar {
        cmds.push(Cmd::Tox(ToxAction::FileControl(number, file, FileControl::Cancel)));
        return cmds;
    }

    // Resume path: a paused receive slot with the same stable id.
    let resumed = model
        .friends
        .get_mut(number)
        .and_then(|f| f.transfers.paused_by_file_id(TransferDirection::Receive, file_id))
        .map(|ft| {
            ft.file_number = file;
            ft.state = TransferState::Started;
            (ft.position, ft.name.clone())
        });
    if let Some((position, ft_name)) = resumed {
        cmds.push(Cmd::Tox(ToxAction::FileSeek(number, file, position)));
        cmds.push(Cmd::Tox(ToxAction::FileControl(number, file, FileControl::Resume)));
        chat_line(
            model,
            number,
            LineKind::System,
            "",
            format!("Resuming file transfer: '{}'", ft_name),
        );
        return cmds;
    }

    if !transfers::filename_valid(&name) {
        cmds.push(Cmd::Tox(ToxAction::FileControl(number, file, FileControl::Cancel)));
        chat_line(
            model,
            number,
            LineKind::System,
            "",
            "File transfer rejected: invalid file name.".to_owned(),
        );
        return cmds;
    }

    let taken = model
        .friends
        .get(number)
        .map(|f| f.transfers.receiving_paths())
        .unwrap_or_default();
    let Some(dest) = transfers::collision_free_path(&model.paths.download_dir, &name, &taken)
    else {
        cmds.push(Cmd::Tox(ToxAction::FileControl(number, file, FileControl::Cancel)));
        chat_line(model, number, LineKind::System, "", "Invalid file path.".to_owned());
        return cmds;
    };

    let Some(slot) = model
        .friends
        .get(number)
        .and_then(|f| f.transfers.free_slot(TransferDirection::Receive))
    else {
        cmds.push(Cmd::Tox(ToxAction::FileControl(number, file, FileControl::Cancel)));
        chat_line(
            model,
            number,
            LineKind::System,
            "",
            "Too many concurrent file transfers.".to_owned(),
        );
        return cmds;
    };

    let now = model.time.now();
    let ft = FileTransfer {
        state: TransferState::Pending,
        direction: TransferDirection::Receive,
        kind,
        file_id,
        file_number: file,
        friend: number,
        slot,
        name: name.clone(),
        path: dest.clone(),
        size,
        position: 0,
        bps: 0,
        last_progress: now,
        last_activity: now,
        line_id: None,
    };
    let auto_accept = model
        .friends
        .get_mut(number)
        .map(|f| {
            f.transfers.insert(ft);
            f.auto_accept_files
        })
        .unwrap_or(false);

    let win_id = model.ensure_chat_window(number);
    let sender = model
        .friends
        .get(number)
        .map(|f| f.display_name().to_owned())
        .unwrap_or_default();
    chat_line(
        model,
        number,
        LineKind::System,
        "",
        format!(
            "File transfer [{}] from {}: '{}' ({})",
            slot,
            sender,
            name,
            utils::format_size(size)
        ),
    );

    if auto_accept {
        cmds.extend(save_file(model, number, slot));
    } else {
        chat_line(
            model,
            number,
            LineKind::System,
            "",
            format!("Type \"/savefile {}\" to accept it.", slot),
        );
        if let Some(id) = win_id {
            let mut flags = NotifyFlags::WNDALERT_1.union(NotifyFlags::NOFOCUS);
            if model.config.ui.bell_on_filetrans {
                flags = flags.union(NotifyFlags::BEEP);
            }
            cmds.extend(model.notify(id, flags));
        }
    }
    cmds
}

/// Sender-side chunk pump. A zero-length request signals completion.
fn handle_chunk_request(
    model: &mut Model,
    number: FriendNumber,
    file: FileNumber,
    position: u64,
    length: usize,
) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    let now = model.time.now();

    if length == 0 {
        let finished = model
            .friends
            .get_mut(number)
            .and_then(|f| {
                let slot = f
                    .transfers
                    .by_file_number(TransferDirection::Send, file)
                    .map(|ft| ft.slot)?;
                f.transfers.take(TransferDirection::Send, slot)
            });
        if let Some(ft) = finished {
            cmds.push(Cmd::IO(IOAction::CloseFile(number, ft.file_id)));
            if ft.kind == FileKind::Data {
                chat_line(
                    model,
                    number,
                    LineKind::System,
                    "",
                    format!("File '{}' successfully sent.", ft.name),
                );
            }
        }
        return cmds;
    }

    let request = model.friends.get_mut(number).and_then(|f| {
        f.transfers
            .by_file_number(TransferDirection::Send, file)
            .map(|ft| {
                ft.last_activity = now;
                if ft.position != position {
                    ft.position = position;
                }
                (ft.file_id, ft.state)
            })
    });
    if let Some((file_id, state)) = request {
        if state == TransferState::Pending {
            // First chunk request doubles as the sender-side start.
            if let Some(ft) = model
                .friends
                .get_mut(number)
                .and_then(|f| f.transfers.by_file_number(TransferDirection::Send, file))
            {
                ft.state = TransferState::Started;
            }
        }
        cmds.push(Cmd::IO(IOAction::ReadChunk(number, file, file_id, position, length)));
    }
    cmds
}

fn handle_recv_chunk(
    model: &mut Model,
    number: FriendNumber,
    file: FileNumber,
    position: u64,
    data: Vec<u8>,
) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    let now = model.time.now();

    if data.is_empty() {
        let finished = model.friends.get_mut(number).and_then(|f| {
            let slot = f
                .transfers
                .by_file_number(TransferDirection::Receive, file)
                .map(|ft| ft.slot)?;
            f.transfers.take(TransferDirection::Receive, slot)
        });
        if let Some(ft) = finished {
            cmds.push(Cmd::IO(IOAction::CloseFile(number, ft.file_id)));
            let text = format!("File '{}' successfully received.", ft.name);
            if let Some(line_id) = ft.line_id {
                if let Some(w) = model.windows.chat_mut(number) {
                    w.scrollback.set(line_id, text);
                }
            } else {
                chat_line(model, number, LineKind::System, "", text);
            }
            let mut flags = NotifyFlags::WNDALERT_2;
            if model.config.ui.bell_on_filetrans_accept {
                flags = flags.union(NotifyFlags::BEEP);
            }
            if let Some(w) = model.windows.chat_mut(number) {
                let id = w.id;
                cmds.extend(model.notify(id, flags));
            }
        }
        return cmds;
    }

    let write = model.friends.get_mut(number).and_then(|f| {
        f.transfers
            .by_file_number(TransferDirection::Receive, file)
            .map(|ft| {
                ft.last_activity = now;
                ft.file_id
            })
    });
    if let Some(file_id) = write {
        cmds.push(Cmd::IO(IOAction::WriteChunk(number, file_id, position, data)));
    }
    cmds
}

fn handle_file_control(
    model: &mut Model,
    number: FriendNumber,
    file: FileNumber,
    control: FileControl,
) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    let found = model.friends.get_mut(number).and_then(|f| {
        f.transfers
            .by_file_number(TransferDirection::Send, file)
            .map(|ft| (TransferDirection::Send, ft.slot))
            .or_else(|| {
                f.transfers
                    .by_file_number(TransferDirection::Receive, file)
                    .map(|ft| (TransferDirection::Receive, ft.slot))
            })
    });
    let Some((direction, slot)) = found else {
        return cmds;
    };

    match control {
        FileControl::Resume => {
            if let Some(ft) = model
                .friends
                .get_mut(number)
                .and_then(|f| f.transfers.get_mut(direction, slot))
            {
                let was_paused = ft.state == TransferState::Paused;
                ft.state = TransferState::Started;
                ft.last_activity = model.time.now();
                let name = ft.name.clone();
                if was_paused {
                    chat_line(
                        model,
                        number,
                        LineKind::System,
                        "",
                        format!("File transfer for '{}' resumed.", name),
                    );
                }
            }
        }
        FileControl::Pause => {
            if let Some(ft) = model
                .friends
                .get_mut(number)
                .and_then(|f| f.transfers.get_mut(direction, slot))
            {
                ft.state = TransferState::Paused;
            }
        }
        FileControl::Cancel => {
            if let Some(ft) = model
                .friends
                .get_mut(number)
                .and_then(|f| f.transfers.take(direction, slot))
            {
                cmds.push(Cmd::IO(IOAction::CloseFile(number, ft.file_id)));
                if ft.kind == FileKind::Data {
                    chat_line(
                        model,
                        number,
                        LineKind::System,
                        "",
                        format!("File transfer for '{}' was cancelled by the peer.", ft.name),
                    );
                }
            }
        }
    }
    cmds
}

fn handle_group_moderation(
    model: &mut Model,
    number: toxide_net::GroupNumber,
    source: toxide_net::GroupPeerId,
    target: toxide_net::GroupPeerId,
    event: GroupModEvent,
) -> Vec<Cmd> {
    let names = model.groups.get(number).map(|g| {
        (
            g.peer(source).map(|p| p.name.clone()).unwrap_or_else(|| "A moderator".to_owned()),
            g.peer(target).map(|p| p.name.clone()).unwrap_or_else(|| "a peer".to_owned()),
        )
    });
    let Some((src_name, tgt_name)) = names else {
        return Vec::new();
    };

    let text = match event {
        GroupModEvent::Kick => {
            if let Some(g) = model.groups.get_mut(number) {
                g.remove_peer(target);
            }
            format!("{} has kicked {} from the group", src_name, tgt_name)
        }
        GroupModEvent::Observer => {
            if let Some(g) = model.groups.get_mut(number) {
                g.set_peer_role(target, toxide_net::GroupRole::Observer);
            }
            format!("{} has silenced {}", src_name, tgt_name)
        }
        GroupModEvent::User => {
            if let Some(g) = model.groups.get_mut(number) {
                g.set_peer_role(target, toxide_net::GroupRole::User);
            }
            format!("{} has given {} the user role", src_name, tgt_name)
        }
        GroupModEvent::Moderator => {
            if let Some(g) = model.groups.get_mut(number) {
                g.set_peer_role(target, toxide_net::GroupRole::Moderator);
            }
            format!("{} has promoted {} to moderator", src_name, tgt_name)
        }
    };
    group_line(model, number, LineKind::System, text);
    Vec::new()
}

// --- I/O events -----------------------------------------------------------

fn handle_io_event(model: &mut Model, event: IOEvent) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    match event {
        IOEvent::ChunkRead(number, file_id, position, len) => {
            if let Some(ft) = model
                .friends
                .get_mut(number)
                .and_then(|f| f.transfers.by_file_id(file_id))
            {
                ft.position = position + len as u64;
                ft.bps += len as u64;
            }
        }
        IOEvent::ChunkWritten(number, file_id, position, len) => {
            if let Some(ft) = model
                .friends
                .get_mut(number)
                .and_then(|f| f.transfers.by_file_id(file_id))
            {
                ft.position = position + len as u64;
                ft.bps += len as u64;
            }
        }
        IOEvent::FileError(number, file_id, message) => {
            let taken = model.friends.get_mut(number).and_then(|f| {
                let (direction, slot) = f
                    .transfers
                    .by_file_id(file_id)
                    .map(|ft| (ft.direction, ft.slot))?;
                f.transfers.take(direction, slot)
            });
            if let Some(ft) = taken {
                cmds.push(Cmd::Tox(ToxAction::FileControl(
                    number,
                    ft.file_number,
                    FileControl::Cancel,
                )));
                cmds.push(Cmd::IO(IOAction::CloseFile(number, file_id)));
                chat_line(
                    model,
                    number,
                    LineKind::System,
                    "",
                    format!("File transfer for '{}' failed: {}", ft.name, message),
                );
            }
        }
        IOEvent::Error(message) => {
            model.sys_prompt(message);
        }
    }
    cmds
}

// --- ticks ----------------------------------------------------------------

fn handle_tick(model: &mut Model) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    model.tick_count += 1;
    let now = model.time.now();

    // Progress-bar lines are rewritten at most once per second.
    let friend_numbers: Vec<FriendNumber> = model.friends.iter().map(|f| f.number).collect();
    for number in friend_numbers {
        let mut updates: Vec<(LineId, String)> = Vec::new();
        let mut timeouts: Vec<(TransferDirection, usize)> = Vec::new();
        if let Some(f) = model.friends.get_mut(number) {
            for ft in f.transfers.iter_mut() {
                if ft.is_idle_timed_out(now) {
                    timeouts.push((ft.direction, ft.slot));
                    continue;
                }
                if ft.state == TransferState::Started
                    && now.duration_since(ft.last_progress) >= transfers::PROGRESS_INTERVAL
                    && let Some(line_id) = ft.line_id
                {
                    let text = format!(
                        "Receiving '{}': {} ({})",
                        ft.name,
                        utils::progress_bar(ft.position, ft.size, 20),
                        utils::format_speed(ft.bps),
                    );
                    updates.push((line_id, text));
                    ft.bps = 0;
                    ft.last_progress = now;
                }
            }
        }
        if !updates.is_empty() {
            if let Some(w) = model.windows.chat_mut(number) {
                for (line_id, text) in updates {
                    w.scrollback.set(line_id, text);
                }
            }
            model.windows.refresh = true;
        }
        for (direction, slot) in timeouts {
            if let Some(ft) = model
                .friends
                .get_mut(number)
                .and_then(|f| f.transfers.take(direction, slot))
            {
                cmds.push(Cmd::Tox(ToxAction::FileControl(
                    number,
                    ft.file_number,
                    FileControl::Cancel,
                )));
                cmds.push(Cmd::IO(IOAction::CloseFile(number, ft.file_id)));
                chat_line(
                    model,
                    number,
                    LineKind::System,
                    "",
                    format!("File transfer for '{}' timed out.", ft.name),
                );
            }
        }

        // Unreceipted messages to online friends get one more try.
        let online = model
            .friends
            .get(number)
            .map(|f| f.connection.is_online())
            .unwrap_or(false);
        if online {
            let due = model
                .friends
                .get_mut(number)
                .map(|f| f.queue.due_for_retry(now))
                .unwrap_or_default();
            for entry in due {
                cmds.push(Cmd::Tox(ToxAction::SendMessage(
                    number,
                    entry.kind,
                    entry.text,
                    entry.line_id,
                )));
            }
        }
    }

    // Periodic identity autosave.
    let autosave = Duration::from_secs(model.config.ui.autosave_freq_secs.max(30));
    if now.duration_since(model.last_autosave) >= autosave {
        model.last_autosave = now;
        cmds.push(Cmd::Tox(ToxAction::StoreData));
    }

    cmds
}

// /me is reachable from every conversation window.
pub fn send_action(model: &mut Model, text: String) -> Vec<Cmd> {
    send_text(model, text, MessageKind::Action)
}
