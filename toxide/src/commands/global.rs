use super::{CommandDef, info, usage};
use crate::avatar::Avatar;
use crate::config::{self, TabColor};
use crate::msg::{AppCmd, Cmd, ToxAction};
use crate::windows::HelpPage;
use std::path::Path;
use toxide_net::{ADDRESS_SIZE, Address, GroupPrivacy, PublicKey, UserStatus};

pub const COMMANDS: &[CommandDef] = &[
    CommandDef {
        name: "add",
        args: "<id> [message]",
        desc: "Send a friend request",
        exec: |model, args| {
            let Some(id_hex) = args.first() else {
                return usage(model, "/add <id> [message]");
            };
            if id_hex.len() != ADDRESS_SIZE * 2 {
                return info(model, "Invalid ID length.".to_owned());
            }
            let Some(address) = Address::from_hex(&id_hex.to_lowercase()) else {
                return info(model, "Invalid ID.".to_owned());
            };
            if !address.checksum_valid() {
                return info(model, "Invalid ID: bad checksum.".to_owned());
            }
            let message = if args.len() > 1 {
                args[1..].join(" ")
            } else {
                format!("Hello, this is {}. Care to Tox?", model.me.name)
            };
            model.sys_active("Friend request sent.".to_owned());
            vec![Cmd::Tox(ToxAction::AddFriend(
                id_hex.to_lowercase(),
                message,
            ))]
        },
    },
    CommandDef {
        name: "accept",
        args: "<n>",
        desc: "Accept a pending friend request",
        exec: |model, args| {
            let Some(slot) = args.first().and_then(|a| a.parse::<usize>().ok()) else {
                return usage(model, "/accept <request number>");
            };
            match model.requests.take(slot) {
                Some(req) => {
                    model.sys_active("Friend request accepted.".to_owned());
                    vec![Cmd::Tox(ToxAction::AddFriendNorequest(req.pk))]
                }
                None => info(model, "No pending friend request with that number.".to_owned()),
            }
        },
    },
    CommandDef {
        name: "decline",
        args: "<n>",
        desc: "Decline a pending friend request",
        exec: |model, args| {
            let Some(slot) = args.first().and_then(|a| a.parse::<usize>().ok()) else {
                return usage(model, "/decline <request number>");
            };
            match model.requests.take(slot) {
                Some(_) => info(model, "Friend request declined.".to_owned()),
                None => info(model, "No pending friend request with that number.".to_owned()),
            }
        },
    },
    CommandDef {
        name: "requests",
        args: "",
        desc: "List pending friend requests",
        exec: |model, _args| {
            let entries: Vec<String> = model
                .requests
                .iter()
                .map(|(i, r)| format!("{} : {} : {}", i, hex::encode(r.pk.0), r.message))
                .collect();
            if entries.is_empty() {
                return info(model, "No pending friend requests.".to_owned());
            }
            for e in entries {
                model.sys_active(e);
            }
            Vec::new()
        },
    },
    CommandDef {
        name: "avatar",
        args: "<path>",
        desc: "Set an avatar and broadcast it; no argument unsets",
        exec: |model, args| {
            if args.is_empty() {
                model.avatar = None;
                model.sys_active("Avatar unset.".to_owned());
                return avatar_broadcast(model);
            }
            let path = args.join(" ");
            match Avatar::set(Path::new(&path)) {
                Ok(avatar) => {
                    model.sys_active(format!("Avatar set to '{}'.", avatar.name));
                    model.avatar = Some(avatar);
                    avatar_broadcast(model)
                }
                Err(e) => info(model, format!("Failed to set avatar: {}", e)),
            }
        },
    },
    CommandDef {
        name: "clear",
        args: "",
        desc: "Clear the window history",
        exec: |model, _args| {
            if let Some(w) = model.windows.active_mut() {
                w.scrollback.clear();
                model.windows.refresh = true;
            }
            Vec::new()
        },
    },
    CommandDef {
        name: "color",
        args: "<color>",
        desc: "Set this window's tab color",
        exec: |model, args| {
            let Some(color) = args.first().and_then(|a| TabColor::parse(a)) else {
                return usage(model, "/color <default|white|red|green|yellow|blue|magenta|cyan>");
            };
            if let Some(w) = model.windows.active_mut() {
                w.tab_color = color;
                model.windows.refresh = true;
            }
            info(model, format!("Tab color set to {}.", color))
        },
    },
    CommandDef {
        name: "connect",
        args: "<host> <port> <key>",
        desc: "Bootstrap from a node",
        exec: |model, args| {
            if args.len() != 3 {
                return usage(model, "/connect <host> <port> <public key>");
            }
            let Some(port) = args[1].parse::<u16>().ok().filter(|p| *p > 0) else {
                return info(model, "Invalid port.".to_owned());
            };
            let Some(key) = PublicKey::from_hex(&args[2].to_lowercase()) else {
                return info(model, "Invalid node public key.".to_owned());
            };
            vec![Cmd::Tox(ToxAction::Bootstrap(args[0].to_owned(), port, key))]
        },
    },
    CommandDef {
        name: "conference",
        args: "",
        desc: "Create a conference",
        exec: |_model, _args| vec![Cmd::Tox(ToxAction::ConferenceNew)],
    },
    CommandDef {
        name: "group",
        args: "<name>",
        desc: "Create a group chat",
        exec: |model, args| {
            if args.is_empty() {
                return usage(model, "/group <name>");
            }
            let name = args.join(" ");
            let nick = model.me.name.clone();
            vec![Cmd::Tox(ToxAction::GroupNew(GroupPrivacy::Public, name, nick))]
        },
    },
    CommandDef {
        name: "join",
        args: "<chat id> [password]",
        desc: "Join a group chat by its chat id",
        exec: |model, args| {
            let Some(id_hex) = args.first() else {
                return usage(model, "/join <chat id> [password]");
            };
            let Some(chat_id) = toxide_net::ChatId::from_hex(&id_hex.to_lowercase()) else {
                return info(model, "Invalid chat ID.".to_owned());
            };
            let password = args.get(1).map(|s| s.to_string());
            let nick = model.me.name.clone();
            vec![Cmd::Tox(ToxAction::GroupJoin(chat_id, nick, password))]
        },
    },
    CommandDef {
        name: "log",
        args: "[on|off]",
        desc: "Toggle chat logging for this window",
        exec: |model, args| {
            let Some(friend) = super::active_chat(model) else {
                return info(model, "Logging can be toggled in chat windows.".to_owned());
            };
            let target = match args.first() {
                Some(&"on") => Some(true),
                Some(&"off") => Some(false),
                None => None,
                Some(_) => return usage(model, "/log [on|off]"),
            };
            let Some(f) = model.friends.get_mut(friend) else {
                return Vec::new();
            };
            f.logging_on = target.unwrap_or(!f.logging_on);
            let state = if f.logging_on { "enabled" } else { "disabled" };
            info(model, format!("Logging {}.", state))
        },
    },
    CommandDef {
        name: "me",
        args: "<action>",
        desc: "Send an action message",
        exec: |model, args| {
            if args.is_empty() {
                return usage(model, "/me <action>");
            }
            let is_conversation = model
                .windows
                .active()
                .map(|w| w.is_conversation())
                .unwrap_or(false);
            if !is_conversation {
                return info(model, "You cannot do that here.".to_owned());
            }
            crate::update::send_action(model, args.join(" "))
        },
    },
    CommandDef {
        name: "myid",
        args: "",
        desc: "Print your Tox ID",
        exec: |model, _args| {
            let id = model.me.address.to_string();
            info(model, id)
        },
    },
    CommandDef {
        name: "nick",
        args: "<name>",
        desc: "Set your name (in a group: your nick there)",
        exec: |model, args| {
            if args.is_empty() {
                return usage(model, "/nick <name>");
            }
            let name = args.join(" ");
            // Inside a group the nick is scoped to that group.
            if let Some(number) = super::active_group(model) {
                if let Some(g) = model.groups.get_mut(number) {
                    g.self_name = name.clone();
                }
                return vec![Cmd::Tox(ToxAction::GroupSelfSetName(number, name))];
            }
            model.me.name = name.clone();
            vec![Cmd::Tox(ToxAction::SetName(name)), Cmd::Tox(ToxAction::StoreData)]
        },
    },
    CommandDef {
        name: "note",
        args: "<message>",
        desc: "Set your status message",
        exec: |model, args| {
            let note = args.join(" ");
            model.me.note = note.clone();
            vec![Cmd::Tox(ToxAction::SetStatusMessage(note))]
        },
    },
    CommandDef {
        name: "nospam",
        args: "[hex]",
        desc: "Change your nospam to revoke the current Tox ID",
        exec: |model, args| {
            let nospam = match args.first() {
                Some(a) => match u32::from_str_radix(a.trim_start_matches("0x"), 16) {
                    Ok(v) => Some(v),
                    Err(_) => return info(model, "Invalid nospam value.".to_owned()),
                },
                None => None,
            };
            model.sys_active("Generating a new Tox ID...".to_owned());
            vec![Cmd::Tox(ToxAction::SetNospam(nospam)), Cmd::Tox(ToxAction::StoreData)]
        },
    },
    CommandDef {
        name: "status",
        args: "<online|away|busy> [note]",
        desc: "Set your user status",
        exec: |model, args| {
            let Some(status) = args.first().and_then(|s| match s.to_lowercase().as_str() {
                "online" => Some(UserStatus::Online),
                "away" => Some(UserStatus::Away),
                "busy" => Some(UserStatus::Busy),
                _ => None,
            }) else {
                return usage(model, "/status <online|away|busy> [note]");
            };
            model.me.status = status;
            let mut cmds = vec![Cmd::Tox(ToxAction::SetStatus(status))];
            if args.len() > 1 {
                let note = args[1..].join(" ");
                model.me.note = note.clone();
                cmds.push(Cmd::Tox(ToxAction::SetStatusMessage(note)));
            }
            cmds
        },
    },
    CommandDef {
        name: "close",
        args: "",
        desc: "Close this window",
        exec: |model, _args| {
            let Some(w) = model.windows.active() else {
                return Vec::new();
            };
            if !w.is_conversation() {
                return info(model, "You cannot close this window.".to_owned());
            }
            let id = w.id;
            model.close_window(id)
        },
    },
    CommandDef {
        name: "help",
        args: "",
        desc: "Show the help menu",
        exec: |model, _args| {
            if let Some(w) = model.windows.active_mut() {
                w.help = Some(HelpPage::Menu);
                model.windows.refresh = true;
            }
            Vec::new()
        },
    },
    CommandDef {
        name: "exit",
        args: "",
        desc: "Exit the client",
        exec: |_model, _args| vec![Cmd::App(AppCmd::Quit)],
    },
    CommandDef {
        name: "quit",
        args: "",
        desc: "Exit the client",
        exec: |_model, _args| vec![Cmd::App(AppCmd::Quit)],
    },
    CommandDef {
        name: "rc",
        args: "",
        desc: "Reload the config file",
        exec: |model, _args| {
            reload_config(model);
            Vec::new()
        },
    },
];

/// Issues a zero-or-sized avatar send to every connected friend.
/// Length zero means "unset".
pub fn avatar_broadcast(model: &mut crate::model::Model) -> Vec<Cmd> {
    let targets: Vec<_> = model
        .friends
        .iter()
        .filter(|f| f.connection.is_online())
        .map(|f| f.number)
        .collect();
    let mut cmds = Vec::new();
    for friend in targets {
        cmds.extend(crate::update::avatar_send(model, friend));
    }
    cmds
}

/// The hot-reload sequence: reload the file, reset per-contact
/// defaults, re-apply overrides and refresh display state.
pub fn reload_config(model: &mut crate::model::Model) {
    match config::load(&model.paths.config_file) {
        Ok(new) => {
            model.config = new;
            model.apply_config();
            model.sys_active("Config reloaded.".to_owned());
        }
        Err(e) => {
            model.sys_active(format!("Config reload failed: {}", e));
        }
    }
}
