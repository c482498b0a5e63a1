use super::{CommandDef, active_conference, info, usage};
use crate::msg::{Cmd, ToxAction};

pub const COMMANDS: &[CommandDef] = &[
    CommandDef {
        name: "title",
        args: "[title]",
        desc: "Show or set the conference title",
        exec: |model, args| {
            let Some(number) = active_conference(model) else {
                return Vec::new();
            };
            if args.is_empty() {
                let title = model
                    .conferences
                    .get(number)
                    .map(|c| c.title.clone())
                    .unwrap_or_default();
                return info(model, format!("Title: {}", title));
            }
            let title = args.join(" ");
            vec![Cmd::Tox(ToxAction::ConferenceSetTitle(number, title))]
        },
    },
    CommandDef {
        name: "audio",
        args: "<on|off>",
        desc: "Enable or disable conference audio",
        exec: |model, args| {
            let Some(number) = active_conference(model) else {
                return Vec::new();
            };
            let enable = match args.first() {
                Some(&"on") => true,
                Some(&"off") => false,
                _ => return usage(model, "/audio <on|off>"),
            };
            let device = model.config.audio.input_device;
            if enable {
                model.audio_ctl.open_input(device);
            } else {
                model.audio_ctl.close_input();
            }
            if let Some(conf) = model.conferences.get_mut(number) {
                conf.audio.enabled = enable;
                conf.audio.input_device = device;
                if !enable {
                    conf.audio.last_sent_audio = None;
                }
            }
            let state = if enable { "enabled" } else { "disabled" };
            info(model, format!("Conference audio {}.", state))
        },
    },
    CommandDef {
        name: "mute",
        args: "<peer>",
        desc: "Mute or unmute a peer's audio",
        exec: |model, args| {
            let Some(number) = active_conference(model) else {
                return Vec::new();
            };
            let Some(name) = args.first() else {
                return usage(model, "/mute <peer name>");
            };
            let mut found = None;
            if let Some(conf) = model.conferences.get_mut(number)
                && let Some(peer) = conf.peers.iter_mut().find(|p| p.name == *name)
            {
                peer.muted = !peer.muted;
                found = Some((peer.name.clone(), peer.muted, peer.output_device));
            }
            match found {
                Some((name, muted, device)) => {
                    model.audio_ctl.set_mute(device, muted);
                    let state = if muted { "muted" } else { "unmuted" };
                    info(model, format!("{} is now {}.", name, state))
                }
                None => info(model, "No peer with that name.".to_owned()),
            }
        },
    },
    CommandDef {
        name: "ptt",
        args: "<on|off>",
        desc: "Toggle push-to-talk",
        exec: |model, args| {
            let Some(number) = active_conference(model) else {
                return Vec::new();
            };
            let enable = match args.first() {
                Some(&"on") => true,
                Some(&"off") => false,
                _ => return usage(model, "/ptt <on|off>"),
            };
            if let Some(conf) = model.conferences.get_mut(number) {
                conf.audio.push_to_talk = enable;
            }
            let state = if enable { "enabled" } else { "disabled" };
            info(model, format!("Push-to-talk {}.", state))
        },
    },
    CommandDef {
        name: "sense",
        args: "<n>",
        desc: "Set the voice activation threshold",
        exec: |model, args| {
            let Some(level) = args.first().and_then(|a| a.parse::<f32>().ok()) else {
                return usage(model, "/sense <threshold>");
            };
            model.config.audio.vad_threshold = level;
            info(model, format!("VAD threshold set to {:.1}.", level))
        },
    },
];
