use super::{CommandDef, active_chat, info, usage};
use crate::msg::{Cmd, ToxAction};
use crate::transfers::TransferDirection;
use crate::update;
use toxide_net::{ConferenceNumber, FileControl, GroupNumber};

pub const COMMANDS: &[CommandDef] = &[
    CommandDef {
        name: "autoaccept",
        args: "[on|off]",
        desc: "Auto-accept file transfers from this friend",
        exec: |model, args| {
            let Some(friend) = active_chat(model) else {
                return Vec::new();
            };
            let target = match args.first() {
                Some(&"on") => Some(true),
                Some(&"off") => Some(false),
                None => None,
                Some(_) => return usage(model, "/autoaccept [on|off]"),
            };
            let Some(f) = model.friends.get_mut(friend) else {
                return Vec::new();
            };
            f.auto_accept_files = target.unwrap_or(!f.auto_accept_files);
            let state = if f.auto_accept_files { "on" } else { "off" };
            info(model, format!("Auto-accepting file transfers: {}.", state))
        },
    },
    CommandDef {
        name: "cancel",
        args: "<in|out> <n>",
        desc: "Cancel a file transfer",
        exec: |model, args| {
            let Some(friend) = active_chat(model) else {
                return Vec::new();
            };
            let (dir_arg, idx) = match (args.first(), args.get(1).and_then(|a| a.parse().ok())) {
                (Some(d), Some(i)) => (*d, i),
                _ => return usage(model, "/cancel <in|out> <transfer number>"),
            };
            let direction = match dir_arg {
                "in" => TransferDirection::Receive,
                "out" => TransferDirection::Send,
                _ => return usage(model, "/cancel <in|out> <transfer number>"),
            };

            let Some(f) = model.friends.get_mut(friend) else {
                return Vec::new();
            };

            // Outbound indices name the pending queue before the slots.
            if direction == TransferDirection::Send
                && let Some(entry) = f.transfers.pending_remove(idx)
            {
                return info(
                    model,
                    format!("Queued file transfer {} cancelled: {:?}", idx, entry.path),
                );
            }

            match f.transfers.take(direction, idx) {
                Some(ft) => {
                    let mut cmds = vec![Cmd::Tox(ToxAction::FileControl(
                        friend,
                        ft.file_number,
                        FileControl::Cancel,
                    ))];
                    cmds.push(Cmd::IO(crate::msg::IOAction::CloseFile(friend, ft.file_id)));
                    model.sys_active(format!("File transfer for '{}' cancelled.", ft.name));
                    cmds
                }
                None => info(model, "Invalid file transfer number.".to_owned()),
            }
        },
    },
    CommandDef {
        name: "cinvite",
        args: "<n>",
        desc: "Invite this friend to a conference",
        exec: |model, args| {
            let Some(friend) = active_chat(model) else {
                return Vec::new();
            };
            let Some(n) = args.first().and_then(|a| a.parse::<u32>().ok()) else {
                return usage(model, "/cinvite <conference number>");
            };
            let number = ConferenceNumber(n);
            if model.conferences.get(number).is_none() {
                return info(model, "No conference with that number.".to_owned());
            }
            model.sys_active("Conference invite sent.".to_owned());
            vec![Cmd::Tox(ToxAction::ConferenceInvite(number, friend))]
        },
    },
    CommandDef {
        name: "cjoin",
        args: "",
        desc: "Join the conference this friend invited you to",
        exec: |model, _args| {
            let Some(friend) = active_chat(model) else {
                return Vec::new();
            };
            let invite = model
                .friends
                .get_mut(friend)
                .and_then(|f| f.conference_invite.take());
            match invite {
                Some(inv) => vec![Cmd::Tox(ToxAction::ConferenceJoin(friend, inv.cookie))],
                None => info(model, "No pending conference invite.".to_owned()),
            }
        },
    },
    CommandDef {
        name: "gaccept",
        args: "[password]",
        desc: "Accept the group invite from this friend",
        exec: |model, args| {
            let Some(friend) = active_chat(model) else {
                return Vec::new();
            };
            let invite = model
                .friends
                .get_mut(friend)
                .and_then(|f| f.group_invite.take());
            match invite {
                Some(inv) => {
                    let password = args.first().map(|s| s.to_string());
                    let nick = model.me.name.clone();
                    model.sys_active(format!("Joining group '{}'...", inv.name));
                    vec![Cmd::Tox(ToxAction::GroupInviteAccept(
                        friend, inv.data, nick, password,
                    ))]
                }
                None => info(model, "No pending group invite.".to_owned()),
            }
        },
    },
    CommandDef {
        name: "invite",
        args: "<n>",
        desc: "Invite this friend to a group",
        exec: |model, args| {
            let Some(friend) = active_chat(model) else {
                return Vec::new();
            };
            let Some(n) = args.first().and_then(|a| a.parse::<u32>().ok()) else {
                return usage(model, "/invite <group number>");
            };
            let number = GroupNumber(n);
            if model.groups.get(number).is_none() {
                return info(model, "No group with that number.".to_owned());
            }
            model.sys_active("Group invite sent.".to_owned());
            vec![Cmd::Tox(ToxAction::GroupInviteFriend(number, friend))]
        },
    },
    CommandDef {
        name: "savefile",
        args: "<n>",
        desc: "Accept a file transfer",
        exec: |model, args| {
            let Some(friend) = active_chat(model) else {
                return Vec::new();
            };
            let Some(idx) = args.first().and_then(|a| a.parse::<usize>().ok()) else {
                return usage(model, "/savefile <transfer number>");
            };
            update::save_file(model, friend, idx)
        },
    },
    CommandDef {
        name: "sendfile",
        args: "<path>",
        desc: "Send a file",
        exec: |model, args| {
            let Some(friend) = active_chat(model) else {
                return Vec::new();
            };
            if args.is_empty() {
                return usage(model, "/sendfile <path>");
            }
            let path = args.join(" ");
            update::send_file(model, friend, &path)
        },
    },
];
