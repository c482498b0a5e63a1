use super::{CommandDef, active_group, info, usage};
use crate::msg::{Cmd, ToxAction};
use toxide_net::{GroupNumber, GroupPeerId, GroupRole, GroupTopicLock, GroupVoiceState,
    GroupPrivacy};

fn peer_id_by_name(model: &crate::model::Model, group: GroupNumber, name: &str) -> Option<GroupPeerId> {
    model
        .groups
        .get(group)?
        .peer_by_name(name)
        .map(|p| p.id)
}

pub const COMMANDS: &[CommandDef] = &[
    CommandDef {
        name: "chatid",
        args: "",
        desc: "Print this group's chat ID",
        exec: |model, _args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            let id = model
                .groups
                .get(number)
                .map(|g| hex::encode(g.chat_id.0).to_uppercase())
                .unwrap_or_default();
            info(model, id)
        },
    },
    CommandDef {
        name: "disconnect",
        args: "",
        desc: "Disconnect from the group without leaving",
        exec: |model, _args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            model.sys_active("Disconnected from the group.".to_owned());
            vec![Cmd::Tox(ToxAction::GroupDisconnect(number))]
        },
    },
    CommandDef {
        name: "rejoin",
        args: "",
        desc: "Reconnect to the group",
        exec: |model, _args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            vec![Cmd::Tox(ToxAction::GroupReconnect(number))]
        },
    },
    CommandDef {
        name: "ignore",
        args: "<peer>",
        desc: "Ignore a peer",
        exec: |model, args| set_ignore(model, args, true),
    },
    CommandDef {
        name: "unignore",
        args: "<peer>",
        desc: "Stop ignoring a peer",
        exec: |model, args| set_ignore(model, args, false),
    },
    CommandDef {
        name: "kick",
        args: "<peer>",
        desc: "Kick a peer from the group",
        exec: |model, args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            let Some(name) = args.first() else {
                return usage(model, "/kick <peer name>");
            };
            match peer_id_by_name(model, number, name) {
                Some(peer) => vec![Cmd::Tox(ToxAction::GroupKick(number, peer))],
                None => info(model, "No peer with that name.".to_owned()),
            }
        },
    },
    CommandDef {
        name: "list",
        args: "",
        desc: "List the peers in this group",
        exec: |model, _args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            let names = model
                .groups
                .get(number)
                .map(|g| g.name_list.clone())
                .unwrap_or_default();
            model.sys_active(format!("{} peers:", names.len()));
            for name in names {
                model.sys_active(format!("  {}", name));
            }
            Vec::new()
        },
    },
    CommandDef {
        name: "locktopic",
        args: "<on|off>",
        desc: "Lock or unlock the topic",
        exec: |model, args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            let lock = match args.first() {
                Some(&"on") => GroupTopicLock::Enabled,
                Some(&"off") => GroupTopicLock::Disabled,
                _ => return usage(model, "/locktopic <on|off>"),
            };
            vec![Cmd::Tox(ToxAction::GroupSetTopicLock(number, lock))]
        },
    },
    CommandDef {
        name: "mod",
        args: "<peer>",
        desc: "Promote a peer to moderator",
        exec: |model, args| set_role(model, args, GroupRole::Moderator, "/mod <peer name>"),
    },
    CommandDef {
        name: "unmod",
        args: "<peer>",
        desc: "Demote a moderator",
        exec: |model, args| set_role(model, args, GroupRole::User, "/unmod <peer name>"),
    },
    CommandDef {
        name: "silence",
        args: "<peer>",
        desc: "Silence a peer (observer role)",
        exec: |model, args| set_role(model, args, GroupRole::Observer, "/silence <peer name>"),
    },
    CommandDef {
        name: "unsilence",
        args: "<peer>",
        desc: "Unsilence a peer",
        exec: |model, args| set_role(model, args, GroupRole::User, "/unsilence <peer name>"),
    },
    CommandDef {
        name: "passwd",
        args: "[password]",
        desc: "Set or clear the group password",
        exec: |model, args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            let password = args.first().map(|s| s.to_string());
            vec![Cmd::Tox(ToxAction::GroupSetPassword(number, password))]
        },
    },
    CommandDef {
        name: "peerlimit",
        args: "<n>",
        desc: "Set the maximum number of peers",
        exec: |model, args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            let Some(limit) = args.first().and_then(|a| a.parse::<u32>().ok()) else {
                return usage(model, "/peerlimit <n>");
            };
            vec![Cmd::Tox(ToxAction::GroupSetPeerLimit(number, limit))]
        },
    },
    CommandDef {
        name: "privacy",
        args: "<public|private>",
        desc: "Set the group privacy state",
        exec: |model, args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            let privacy = match args.first() {
                Some(&"public") => GroupPrivacy::Public,
                Some(&"private") => GroupPrivacy::Private,
                _ => return usage(model, "/privacy <public|private>"),
            };
            vec![Cmd::Tox(ToxAction::GroupSetPrivacy(number, privacy))]
        },
    },
    CommandDef {
        name: "topic",
        args: "[topic]",
        desc: "Show or set the topic",
        exec: |model, args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            if args.is_empty() {
                let topic = model
                    .groups
                    .get(number)
                    .map(|g| g.topic.clone())
                    .unwrap_or_default();
                return info(model, format!("Topic: {}", topic));
            }
            let topic = args.join(" ");
            vec![Cmd::Tox(ToxAction::GroupSetTopic(number, topic))]
        },
    },
    CommandDef {
        name: "voice",
        args: "<all|mod|founder>",
        desc: "Set who may talk",
        exec: |model, args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            let state = match args.first() {
                Some(&"all") => GroupVoiceState::All,
                Some(&"mod") => GroupVoiceState::Moderator,
                Some(&"founder") => GroupVoiceState::Founder,
                _ => return usage(model, "/voice <all|mod|founder>"),
            };
            vec![Cmd::Tox(ToxAction::GroupSetVoiceState(number, state))]
        },
    },
    CommandDef {
        name: "whisper",
        args: "<peer> <message>",
        desc: "Send a private message to a peer",
        exec: |model, args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            if args.len() < 2 {
                return usage(model, "/whisper <peer name> <message>");
            }
            let Some(peer) = peer_id_by_name(model, number, args[0]) else {
                return info(model, "No peer with that name.".to_owned());
            };
            let text = args[1..].join(" ");
            let ts = model.timestamp();
            let self_name = model
                .groups
                .get(number)
                .map(|g| g.self_name.clone())
                .unwrap_or_else(|| model.me.name.clone());
            if let Some(w) = model.windows.group_mut(number) {
                let _ = w.scrollback.add(
                    crate::scrollback::LineKind::OutPrivate,
                    &ts,
                    &self_name,
                    args[0],
                    text.clone(),
                );
            }
            vec![Cmd::Tox(ToxAction::GroupSendPrivateMessage(
                number,
                peer,
                toxide_net::MessageKind::Normal,
                text,
            ))]
        },
    },
    CommandDef {
        name: "whois",
        args: "<peer>",
        desc: "Show information about a peer",
        exec: |model, args| {
            let Some(number) = active_group(model) else {
                return Vec::new();
            };
            let Some(name) = args.first() else {
                return usage(model, "/whois <peer name>");
            };
            let details = model.groups.get(number).and_then(|g| {
                g.peer_by_name(name).map(|p| {
                    (
                        p.name.clone(),
                        hex::encode(p.pk.0),
                        format!("{:?}", p.role),
                        format!("{:?}", p.status),
                    )
                })
            });
            match details {
                Some((name, pk, role, status)) => {
                    model.sys_active(format!("Peer: {}", name));
                    model.sys_active(format!("  Public key: {}", pk));
                    model.sys_active(format!("  Role: {}", role));
                    model.sys_active(format!("  Status: {}", status));
                    Vec::new()
                }
                None => info(model, "No peer with that name.".to_owned()),
            }
        },
    },
];

fn set_ignore(model: &mut crate::model::Model, args: &[&str], ignore: bool) -> Vec<Cmd> {
    let Some(number) = active_group(model) else {
        return Vec::new();
    };
    let Some(name) = args.first() else {
        let u = if ignore { "/ignore <peer name>" } else { "/unignore <peer name>" };
        return usage(model, u);
    };
    let Some(peer) = peer_id_by_name(model, number, name) else {
        return info(model, "No peer with that name.".to_owned());
    };
    // In-memory first (out-of-band filtering), then the network call.
    if let Some(g) = model.groups.get_mut(number) {
        g.set_ignore(peer, ignore);
    }
    let verb = if ignore { "Ignoring" } else { "No longer ignoring" };
    model.sys_active(format!("{} {}.", verb, name));
    vec![Cmd::Tox(ToxAction::GroupSetIgnore(number, peer, ignore))]
}

fn set_role(
    model: &mut crate::model::Model,
    args: &[&str],
    role: GroupRole,
    usage_text: &str,
) -> Vec<Cmd> {
    let Some(number) = active_group(model) else {
        return Vec::new();
    };
    let Some(name) = args.first() else {
        return usage(model, usage_text);
    };
    match peer_id_by_name(model, number, name) {
        Some(peer) => vec![Cmd::Tox(ToxAction::GroupSetRole(number, peer, role))],
        None => info(model, "No peer with that name.".to_owned()),
    }
}
