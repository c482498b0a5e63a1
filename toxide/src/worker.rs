//! The network worker. Owns the `Netlink` handle, polls it for
//! callbacks, enriches them with the names/keys/roles the update path
//! needs, and executes requested actions. Results that the update
//! path must observe come back as `ToxEvent`s.

use crate::msg::{IOEvent, Msg, ToxAction, ToxEvent};
use rand::Rng;
use std::path::PathBuf;
use std::sync::mpsc;
use toxide_net::{Address, NetEvent, Netlink};

pub fn spawn_net(
    tx: mpsc::Sender<Msg>,
    rx_action: mpsc::Receiver<ToxAction>,
    mut net: Box<dyn Netlink>,
    data_path: PathBuf,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        loop {
            let mut shutdown = false;
            while let Ok(action) = rx_action.try_recv() {
                if handle_action(&tx, net.as_mut(), &data_path, action) {
                    shutdown = true;
                    break;
                }
            }
            if shutdown {
                let _ = net.store_data(&data_path);
                break;
            }

            for event in net.poll() {
                let Some(translated) = translate(net.as_ref(), event) else {
                    continue;
                };
                if tx.send(Msg::Tox(translated)).is_err() {
                    return;
                }
            }

            std::thread::sleep(net.iteration_interval());
        }
    })
}

fn report_error(tx: &mpsc::Sender<Msg>, text: String) {
    let _ = tx.send(Msg::IO(IOEvent::Error(text)));
}

/// Executes one action; returns true on shutdown.
fn handle_action(
    tx: &mpsc::Sender<Msg>,
    net: &mut dyn Netlink,
    data_path: &std::path::Path,
    action: ToxAction,
) -> bool {
    match action {
        ToxAction::SendMessage(friend, kind, text, line_id) => {
            match net.friend_send_message(friend, kind, &text) {
                Ok(receipt) => {
                    let _ = tx.send(Msg::Tox(ToxEvent::MessageSent(friend, receipt, line_id)));
                }
                Err(e) => {
                    let _ = tx.send(Msg::Tox(ToxEvent::MessageSendFailed(friend, line_id, e)));
                }
            }
        }
        ToxAction::AddFriend(address_hex, message) => {
            let Some(address) = Address::from_hex(&address_hex) else {
                return false;
            };
            match net.friend_add(address, &message) {
                Ok(number) => {
                    let _ = tx.send(Msg::Tox(ToxEvent::FriendAdded(
                        number,
                        address.public_key(),
                    )));
                }
                Err(e) => {
                    let _ = tx.send(Msg::Tox(ToxEvent::FriendAddFailed(e)));
                }
            }
        }
        ToxAction::AddFriendNorequest(pk) => match net.friend_add_norequest(pk) {
            Ok(number) => {
                let _ = tx.send(Msg::Tox(ToxEvent::FriendAdded(number, pk)));
            }
            Err(e) => {
                let _ = tx.send(Msg::Tox(ToxEvent::FriendAddFailed(e)));
            }
        },
        ToxAction::DeleteFriend(friend) => {
            net.friend_delete(friend);
        }
        ToxAction::SetName(name) => net.self_set_name(&name),
        ToxAction::SetStatus(status) => net.self_set_status(status),
        ToxAction::SetStatusMessage(note) => net.self_set_status_message(&note),
        ToxAction::SetNospam(value) => {
            let nospam = value.unwrap_or_else(|| rand::thread_rng().r#gen());
            net.self_set_nospam(nospam);
            let _ = tx.send(Msg::Tox(ToxEvent::SelfAddress(net.self_address())));
        }
        ToxAction::SetTyping(friend, typing) => net.self_set_typing(friend, typing),

        ToxAction::ConferenceNew => match net.conference_new() {
            Ok(number) => {
                if let Some(id) = net.conference_id(number) {
                    let kind = net
                        .conference_type(number)
                        .unwrap_or(toxide_net::ConferenceType::Text);
                    let _ = tx.send(Msg::Tox(ToxEvent::ConferenceCreated(number, id, kind)));
                }
            }
            Err(e) => report_error(tx, format!("Failed to create a conference: {}", e)),
        },
        ToxAction::ConferenceDelete(number) => net.conference_delete(number),
        ToxAction::ConferenceInvite(number, friend) => {
            if let Err(e) = net.conference_invite(number, friend) {
                report_error(tx, format!("Conference invite failed: {}", e));
            }
        }
        ToxAction::ConferenceJoin(friend, cookie) => match net.conference_join(friend, &cookie) {
            Ok(number) => {
                if let Some(id) = net.conference_id(number) {
                    let kind = net
                        .conference_type(number)
                        .unwrap_or(toxide_net::ConferenceType::Text);
                    let _ = tx.send(Msg::Tox(ToxEvent::ConferenceCreated(number, id, kind)));
                }
            }
            Err(e) => report_error(tx, format!("Failed to join the conference: {}", e)),
        },
        ToxAction::ConferenceSendMessage(number, kind, text) => {
            if let Err(e) = net.conference_send_message(number, kind, &text) {
                report_error(tx, format!("Failed to send to the conference: {}", e));
            }
        }
        ToxAction::ConferenceSetTitle(number, title) => {
            if let Err(e) = net.conference_set_title(number, &title) {
                report_error(tx, format!("Failed to set the title: {}", e));
            }
        }

        ToxAction::GroupNew(privacy, name, nick) => match net.group_new(privacy, &name, &nick) {
            Ok(number) => send_group_created(tx, net, number),
            Err(e) => report_error(tx, format!("Failed to create the group: {}", e)),
        },
        ToxAction::GroupJoin(chat_id, nick, password) => {
            match net.group_join(chat_id, &nick, password.as_deref()) {
                Ok(number) => send_group_created(tx, net, number),
                Err(e) => report_error(tx, format!("Failed to join the group: {}", e)),
            }
        }
        ToxAction::GroupLeave(number, part) => net.group_leave(number, &part),
        ToxAction::GroupReconnect(number) => {
            if let Err(e) = net.group_reconnect(number) {
                report_error(tx, format!("Failed to rejoin the group: {}", e));
            }
        }
        ToxAction::GroupDisconnect(number) => {
            if let Err(e) = net.group_disconnect(number) {
                report_error(tx, format!("Failed to disconnect: {}", e));
            }
        }
        ToxAction::GroupInviteFriend(number, friend) => {
            if let Err(e) = net.group_invite_friend(number, friend) {
                report_error(tx, format!("Group invite failed: {}", e));
            }
        }
        ToxAction::GroupInviteAccept(friend, data, nick, password) => {
            match net.group_invite_accept(friend, &data, &nick, password.as_deref()) {
                Ok(number) => send_group_created(tx, net, number),
                Err(e) => report_error(tx, format!("Failed to join the group: {}", e)),
            }
        }
        ToxAction::GroupSendMessage(number, kind, text) => {
            if let Err(e) = net.group_send_message(number, kind, &text) {
                report_error(tx, format!("Failed to send to the group: {}", e));
            }
        }
        ToxAction::GroupSendPrivateMessage(number, peer, kind, text) => {
            if let Err(e) = net.group_send_private_message(number, peer, kind, &text) {
                report_error(tx, format!("Failed to whisper: {}", e));
            }
        }
        ToxAction::GroupSetTopic(number, topic) => {
            if let Err(e) = net.group_set_topic(number, &topic) {
                report_error(tx, format!("Failed to set the topic: {}", e));
            }
        }
        ToxAction::GroupSelfSetName(number, nick) => {
            if let Err(e) = net.group_self_set_name(number, &nick) {
                report_error(tx, format!("Failed to change the nick: {}", e));
            }
        }
        ToxAction::GroupSetIgnore(number, peer, ignore) => {
            if let Err(e) = net.group_set_ignore(number, peer, ignore) {
                report_error(tx, format!("Failed to update ignore state: {}", e));
            }
        }
        ToxAction::GroupKick(number, peer) => {
            if let Err(e) = net.group_mod_kick(number, peer) {
                report_error(tx, format!("Failed to kick: {}", e));
            }
        }
        ToxAction::GroupSetRole(number, peer, role) => {
            if let Err(e) = net.group_mod_set_role(number, peer, role) {
                report_error(tx, format!("Failed to set the role: {}", e));
            }
        }
        ToxAction::GroupSetPassword(number, password) => {
            if let Err(e) = net.group_set_password(number, password.as_deref()) {
                report_error(tx, format!("Failed to set the password: {}", e));
            }
        }
        ToxAction::GroupSetPrivacy(number, privacy) => {
            if let Err(e) = net.group_set_privacy_state(number, privacy) {
                report_error(tx, format!("Failed to set the privacy state: {}", e));
            }
        }
        ToxAction::GroupSetPeerLimit(number, limit) => {
            if let Err(e) = net.group_set_peer_limit(number, limit) {
                report_error(tx, format!("Failed to set the peer limit: {}", e));
            }
        }
        ToxAction::GroupSetTopicLock(number, lock) => {
            if let Err(e) = net.group_set_topic_lock(number, lock) {
                report_error(tx, format!("Failed to set the topic lock: {}", e));
            }
        }
        ToxAction::GroupSetVoiceState(number, state) => {
            if let Err(e) = net.group_set_voice_state(number, state) {
                report_error(tx, format!("Failed to set the voice state: {}", e));
            }
        }

        ToxAction::FileSend(friend, kind, size, file_id, name, slot) => {
            match net.file_send(friend, kind, size, file_id, &name) {
                Ok((number, id)) => {
                    let _ = tx.send(Msg::Tox(ToxEvent::FileSendStarted(
                        friend, number, id, kind, slot,
                    )));
                }
                Err(e) => {
                    let _ = tx.send(Msg::Tox(ToxEvent::FileSendFailed(friend, slot, kind, e)));
                }
            }
        }
        ToxAction::FileControl(friend, file, control) => {
            let _ = net.file_control(friend, file, control);
        }
        ToxAction::FileSeek(friend, file, position) => {
            let _ = net.file_seek(friend, file, position);
        }
        ToxAction::FileSendChunk(friend, file, position, data) => {
            let _ = net.file_send_chunk(friend, file, position, &data);
        }

        ToxAction::Bootstrap(host, port, key) => {
            if !net.bootstrap(&host, port, key) {
                report_error(tx, format!("Failed to bootstrap from {}:{}", host, port));
            }
        }
        ToxAction::StoreData => {
            if net.store_data(data_path).is_err() {
                report_error(tx, "Failed to save the data file.".to_owned());
            }
        }
        ToxAction::Shutdown => return true,
    }
    false
}

fn send_group_created(tx: &mpsc::Sender<Msg>, net: &dyn Netlink, number: toxide_net::GroupNumber) {
    let Some(chat_id) = net.group_chat_id(number) else {
        return;
    };
    let name = net.group_name(number).unwrap_or_default();
    let self_name = net.group_self_name(number).unwrap_or_default();
    let role = net
        .group_self_role(number)
        .unwrap_or(toxide_net::GroupRole::User);
    let _ = tx.send(Msg::Tox(ToxEvent::GroupCreated(
        number, chat_id, name, self_name, role,
    )));
}

/// Enriches raw callbacks with names, keys and roles so the update
/// path never has to query the handle. Callbacks that back features
/// this client does not ship are dropped here.
fn translate(net: &dyn Netlink, event: NetEvent) -> Option<ToxEvent> {
    let translated = match event {
        // Lossless custom packets carry game/scripting payloads.
        NetEvent::FriendLosslessPacket(..) => return None,
        NetEvent::SelfConnectionStatus(c) => ToxEvent::SelfConnectionStatus(c),
        NetEvent::FriendRequest(pk, msg) => ToxEvent::FriendRequest(pk, msg),
        NetEvent::FriendConnectionStatus(f, c) => ToxEvent::FriendConnectionStatus(f, c),
        NetEvent::FriendMessage(f, kind, text) => ToxEvent::FriendMessage(f, kind, text),
        NetEvent::FriendName(f, name) => ToxEvent::FriendName(f, name),
        NetEvent::FriendStatus(f, s) => ToxEvent::FriendStatus(f, s),
        NetEvent::FriendStatusMessage(f, s) => ToxEvent::FriendStatusMessage(f, s),
        NetEvent::FriendTyping(f, t) => ToxEvent::FriendTyping(f, t),
        NetEvent::FriendReadReceipt(f, r) => ToxEvent::ReadReceipt(f, r),

        NetEvent::ConferenceInvite(f, kind, cookie) => ToxEvent::ConferenceInvite(f, kind, cookie),
        NetEvent::ConferenceMessage(conf, peer, kind, text) => {
            let name = net
                .conference_peer_name(conf, peer)
                .unwrap_or_else(|| format!("Peer {}", peer.0));
            let pk = net
                .conference_peer_public_key(conf, peer)
                .unwrap_or(toxide_net::PublicKey([0; 32]));
            ToxEvent::ConferenceMessage(conf, peer, pk, name, kind, text)
        }
        NetEvent::ConferencePeerListChanged(conf) => {
            let count = net.conference_peer_count(conf);
            let mut peers = Vec::with_capacity(count);
            for i in 0..count {
                let peer = toxide_net::ConferencePeerNumber(i as u32);
                if let Some(pk) = net.conference_peer_public_key(conf, peer) {
                    let name = net
                        .conference_peer_name(conf, peer)
                        .unwrap_or_else(|| format!("Peer {}", i));
                    peers.push((peer, pk, name));
                }
            }
            ToxEvent::ConferencePeerList(conf, peers)
        }
        NetEvent::ConferencePeerName(conf, peer, name) => {
            ToxEvent::ConferencePeerName(conf, peer, name)
        }
        NetEvent::ConferenceTitle(conf, _peer, title) => ToxEvent::ConferenceTitle(conf, title),

        NetEvent::FileRecv(f, file, kind, size, name, id) => {
            ToxEvent::FileRecv(f, file, kind, size, name, id)
        }
        NetEvent::FileChunkRequest(f, file, pos, len) => {
            ToxEvent::FileChunkRequest(f, file, pos, len)
        }
        NetEvent::FileRecvChunk(f, file, pos, data) => ToxEvent::FileRecvChunk(f, file, pos, data),
        NetEvent::FileControlRecv(f, file, control) => ToxEvent::FileControlRecv(f, file, control),

        NetEvent::GroupInvite(f, data, name) => ToxEvent::GroupInvite(f, data, name),
        NetEvent::GroupMessage(g, peer, kind, text) => {
            let name = peer_name(net, g, peer);
            ToxEvent::GroupMessage(g, peer, name, kind, text)
        }
        NetEvent::GroupPrivateMessage(g, peer, kind, text) => {
            let name = peer_name(net, g, peer);
            ToxEvent::GroupPrivateMessage(g, peer, name, kind, text)
        }
        NetEvent::GroupPeerJoin(g, peer) => {
            let pk = net
                .group_peer_public_key(g, peer)
                .unwrap_or(toxide_net::PublicKey([0; 32]));
            let name = peer_name(net, g, peer);
            let role = net
                .group_peer_role(g, peer)
                .unwrap_or(toxide_net::GroupRole::User);
            ToxEvent::GroupPeerJoin(g, peer, pk, name, role)
        }
        NetEvent::GroupPeerExit(g, peer, nick, part) => ToxEvent::GroupPeerExit(g, peer, nick, part),
        NetEvent::GroupTopic(g, peer, topic) => {
            let by = peer_name(net, g, peer);
            ToxEvent::GroupTopic(g, by, topic)
        }
        NetEvent::GroupPeerLimit(g, limit) => ToxEvent::GroupPeerLimit(g, limit),
        NetEvent::GroupPrivacyState(g, p) => ToxEvent::GroupPrivacyState(g, p),
        NetEvent::GroupTopicLock(g, l) => ToxEvent::GroupTopicLock(g, l),
        NetEvent::GroupVoiceState(g, v) => ToxEvent::GroupVoiceState(g, v),
        NetEvent::GroupPassword(g, p) => ToxEvent::GroupPassword(g, p),
        NetEvent::GroupNickChange(g, peer, name) => ToxEvent::GroupNickChange(g, peer, name),
        NetEvent::GroupStatusChange(g, peer, status) => {
            ToxEvent::GroupStatusChange(g, peer, status)
        }
        NetEvent::GroupSelfJoin(g) => {
            let topic = net.group_topic(g).unwrap_or_default();
            let name = net.group_name(g).unwrap_or_default();
            ToxEvent::GroupSelfJoin(g, topic, name)
        }
        NetEvent::GroupRejected(g, why) => ToxEvent::GroupRejected(g, why),
        NetEvent::GroupModeration(g, src, target, ev) => {
            ToxEvent::GroupModeration(g, src, target, ev)
        }
    };
    Some(translated)
}

fn peer_name(
    net: &dyn Netlink,
    group: toxide_net::GroupNumber,
    peer: toxide_net::GroupPeerId,
) -> String {
    net.group_peer_name(group, peer)
        .unwrap_or_else(|| format!("Peer {}", peer.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use toxide_net::sim::SimNetlink;
    use toxide_net::{Connection, FriendNumber, MessageKind, PublicKey, SendError};

    fn drain(rx: &mpsc::Receiver<Msg>) -> Vec<Msg> {
        let mut out = Vec::new();
        while let Ok(m) = rx.try_recv() {
            out.push(m);
        }
        out
    }

    #[test]
    fn send_message_reports_receipt_or_failure() {
        let (tx, rx) = mpsc::channel();
        let mut net = SimNetlink::new();
        let friend = net.friend_add_norequest(PublicKey([9; 32])).unwrap();
        let data = std::env::temp_dir().join("toxide-worker-test");

        handle_action(
            &tx,
            &mut net,
            &data,
            ToxAction::SendMessage(
                friend,
                MessageKind::Normal,
                "hi".into(),
                crate::scrollback::LineId(1),
            ),
        );
        let msgs = drain(&rx);
        assert!(matches!(
            msgs.as_slice(),
            [Msg::Tox(ToxEvent::MessageSendFailed(
                FriendNumber(0),
                _,
                SendError::FriendNotConnected
            ))]
        ));

        net.set_friend_connection(friend, Connection::Udp);
        handle_action(
            &tx,
            &mut net,
            &data,
            ToxAction::SendMessage(
                friend,
                MessageKind::Normal,
                "hi".into(),
                crate::scrollback::LineId(2),
            ),
        );
        let msgs = drain(&rx);
        assert!(matches!(
            msgs.as_slice(),
            [Msg::Tox(ToxEvent::MessageSent(FriendNumber(0), _, _))]
        ));
    }

    #[test]
    fn file_send_round_trips_slot_context() {
        let (tx, rx) = mpsc::channel();
        let mut net = SimNetlink::new();
        let friend = net.friend_add_norequest(PublicKey([9; 32])).unwrap();
        net.set_friend_connection(friend, Connection::Udp);
        let data = std::env::temp_dir().join("toxide-worker-test");

        handle_action(
            &tx,
            &mut net,
            &data,
            ToxAction::FileSend(
                friend,
                toxide_net::FileKind::Data,
                100,
                None,
                "a.bin".into(),
                5,
            ),
        );
        let msgs = drain(&rx);
        match msgs.as_slice() {
            [Msg::Tox(ToxEvent::FileSendStarted(f, _, _, kind, slot))] => {
                assert_eq!(*f, friend);
                assert_eq!(*kind, toxide_net::FileKind::Data);
                assert_eq!(*slot, 5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
