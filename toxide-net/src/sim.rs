//! In-process backend for development and worker tests.
//!
//! `SimNetlink` keeps the full local half of a session (identity,
//! friend/conference/group tables, queued callbacks) but has no
//! transport: peers never come online on their own. Tests push events
//! with [`SimNetlink::inject`] to play the remote side.

use crate::netlink::*;
use crate::types::*;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;

const MAX_FRIENDS: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SimFriend {
    pk: PublicKey,
    name: String,
    status_message: String,
    #[serde(skip)]
    connection: Connection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedIdentity {
    public_key: PublicKey,
    secret_key: SecretKey,
    nospam: u32,
    name: String,
    status_message: String,
    status: UserStatus,
    friends: Vec<SimFriend>,
}

#[derive(Debug, Clone)]
struct SimConference {
    id: ConferenceId,
    kind: ConferenceType,
    title: String,
    peers: Vec<(ConferencePeerNumber, PublicKey, String)>,
}

#[derive(Debug, Clone)]
struct SimGroup {
    chat_id: ChatId,
    name: String,
    topic: String,
    self_name: String,
    self_role: GroupRole,
    connected: bool,
    peers: Vec<(GroupPeerId, PublicKey, String, GroupRole)>,
}

pub struct SimNetlink {
    identity: SavedIdentity,
    friends: Vec<Option<SimFriend>>,
    conferences: Vec<Option<SimConference>>,
    groups: Vec<Option<SimGroup>>,
    events: VecDeque<NetEvent>,
    next_receipt: u32,
    next_file_number: u32,
    connection: Connection,
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut b = [0u8; N];
    rand::thread_rng().fill_bytes(&mut b);
    b
}

impl SimNetlink {
    pub fn new() -> Self {
        let secret = SecretKey(random_bytes());
        // Without real crypto the public key is derived by another
        // round of randomness; it only needs to be stable and unique.
        let identity = SavedIdentity {
            public_key: PublicKey(random_bytes()),
            secret_key: secret,
            nospam: rand::thread_rng().next_u32(),
            name: String::new(),
            status_message: String::new(),
            status: UserStatus::Online,
            friends: Vec::new(),
        };
        Self {
            identity,
            friends: Vec::new(),
            conferences: Vec::new(),
            groups: Vec::new(),
            events: VecDeque::new(),
            next_receipt: 0,
            next_file_number: 0,
            connection: Connection::None,
        }
    }

    /// Loads an identity blob, or creates a fresh one when the file is
    /// missing. A present-but-unparsable file is an error so that a
    /// corrupt profile is never silently replaced.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        let identity: SavedIdentity = serde_json::from_str(&data)
            .map_err(|e| format!("{} is corrupt: {}", path.display(), e))?;
        let friends = identity.friends.iter().cloned().map(Some).collect();
        Ok(Self {
            identity,
            friends,
            conferences: Vec::new(),
            groups: Vec::new(),
            events: VecDeque::new(),
            next_receipt: 0,
            next_file_number: 0,
            connection: Connection::None,
        })
    }

    /// Test hook: queue an event as if the transport delivered it.
    pub fn inject(&mut self, event: NetEvent) {
        self.events.push_back(event);
    }

    /// Test hook: flip a friend's connection state and emit the event.
    pub fn set_friend_connection(&mut self, friend: FriendNumber, connection: Connection) {
        if let Some(Some(f)) = self.friends.get_mut(friend.0 as usize) {
            f.connection = connection;
            self.events
                .push_back(NetEvent::FriendConnectionStatus(friend, connection));
        }
    }

    fn friend(&self, n: FriendNumber) -> Option<&SimFriend> {
        self.friends.get(n.0 as usize).and_then(|f| f.as_ref())
    }

    fn insert_friend(&mut self, pk: PublicKey) -> Result<FriendNumber, FriendAddError> {
        if self.friends.iter().flatten().any(|f| f.pk == pk) {
            return Err(FriendAddError::AlreadyFriend);
        }
        if self.friends.iter().flatten().count() >= MAX_FRIENDS {
            return Err(FriendAddError::Full);
        }
        let friend = SimFriend {
            pk,
            name: String::new(),
            status_message: String::new(),
            connection: Connection::None,
        };
        for (i, slot) in self.friends.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(friend);
                return Ok(FriendNumber(i as u32));
            }
        }
        self.friends.push(Some(friend));
        Ok(FriendNumber(self.friends.len() as u32 - 1))
    }

    fn group_mut(&mut self, g: GroupNumber) -> Result<&mut SimGroup, GroupError> {
        self.groups
            .get_mut(g.0 as usize)
            .and_then(|g| g.as_mut())
            .ok_or(GroupError::NotFound)
    }

    fn group_ref(&self, g: GroupNumber) -> Option<&SimGroup> {
        self.groups.get(g.0 as usize).and_then(|g| g.as_ref())
    }
}

impl Default for SimNetlink {
    fn default() -> Self {
        Self::new()
    }
}

impl Netlink for SimNetlink {
    fn self_address(&self) -> Address {
        Address::from_public_key(self.identity.public_key, self.identity.nospam)
    }

    fn self_public_key(&self) -> PublicKey {
        self.identity.public_key
    }

    fn self_name(&self) -> String {
        self.identity.name.clone()
    }

    fn self_set_name(&mut self, name: &str) {
        self.identity.name = name.chars().take(MAX_NAME_LENGTH).collect();
    }

    fn self_status(&self) -> UserStatus {
        self.identity.status
    }

    fn self_set_status(&mut self, status: UserStatus) {
        self.identity.status = status;
    }

    fn self_status_message(&self) -> String {
        self.identity.status_message.clone()
    }

    fn self_set_status_message(&mut self, note: &str) {
        self.identity.status_message = note.chars().take(MAX_STATUS_MESSAGE_LENGTH).collect();
    }

    fn self_set_nospam(&mut self, nospam: u32) {
        self.identity.nospam = nospam;
    }

    fn self_nospam(&self) -> u32 {
        self.identity.nospam
    }

    fn friend_list(&self) -> Vec<FriendNumber> {
        self.friends
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_some())
            .map(|(i, _)| FriendNumber(i as u32))
            .collect()
    }

    fn friend_name(&self, friend: FriendNumber) -> Option<String> {
        self.friend(friend).map(|f| f.name.clone())
    }

    fn friend_add(
        &mut self,
        address: Address,
        message: &str,
    ) -> Result<FriendNumber, FriendAddError> {
        if message.is_empty() {
            return Err(FriendAddError::NoMessage);
        }
        if message.len() > MAX_FRIEND_REQUEST_LENGTH {
            return Err(FriendAddError::MessageTooLong);
        }
        if !address.checksum_valid() {
            return Err(FriendAddError::BadChecksum);
        }
        if address.public_key() == self.identity.public_key {
            return Err(FriendAddError::OwnAddress);
        }
        self.insert_friend(address.public_key())
    }

    fn friend_add_norequest(&mut self, pk: PublicKey) -> Result<FriendNumber, FriendAddError> {
        if pk == self.identity.public_key {
            return Err(FriendAddError::OwnAddress);
        }
        self.insert_friend(pk)
    }

    fn friend_delete(&mut self, friend: FriendNumber) {
        if let Some(slot) = self.friends.get_mut(friend.0 as usize) {
            *slot = None;
        }
    }

    fn friend_public_key(&self, friend: FriendNumber) -> Option<PublicKey> {
        self.friend(friend).map(|f| f.pk)
    }

    fn friend_connection_status(&self, friend: FriendNumber) -> Connection {
        self.friend(friend).map(|f| f.connection).unwrap_or_default()
    }

    fn friend_send_message(
        &mut self,
        friend: FriendNumber,
        _kind: MessageKind,
        message: &str,
    ) -> Result<ReceiptId, SendError> {
        let f = self.friend(friend).ok_or(SendError::FriendNotFound)?;
        if !f.connection.is_online() {
            return Err(SendError::FriendNotConnected);
        }
        if message.is_empty() {
            return Err(SendError::Empty);
        }
        if message.len() > MAX_MESSAGE_LENGTH {
            return Err(SendError::TooLong);
        }
        self.next_receipt += 1;
        Ok(ReceiptId(self.next_receipt))
    }

    fn self_set_typing(&mut self, _friend: FriendNumber, _typing: bool) {}

    fn conference_new(&mut self) -> Result<ConferenceNumber, ConferenceError> {
        let conf = SimConference {
            id: ConferenceId(random_bytes()),
            kind: ConferenceType::Text,
            title: String::new(),
            peers: Vec::new(),
        };
        self.conferences.push(Some(conf));
        Ok(ConferenceNumber(self.conferences.len() as u32 - 1))
    }

    fn conference_delete(&mut self, conference: ConferenceNumber) {
        if let Some(slot) = self.conferences.get_mut(conference.0 as usize) {
            *slot = None;
        }
    }

    fn conference_invite(
        &mut self,
        conference: ConferenceNumber,
        friend: FriendNumber,
    ) -> Result<(), ConferenceError> {
        if self.conference_id(conference).is_none() {
            return Err(ConferenceError::NotFound);
        }
        if self.friend(friend).is_none() {
            return Err(ConferenceError::FriendNotFound);
        }
        Ok(())
    }

    fn conference_join(
        &mut self,
        friend: FriendNumber,
        cookie: &[u8],
    ) -> Result<ConferenceNumber, ConferenceError> {
        if self.friend(friend).is_none() {
            return Err(ConferenceError::FriendNotFound);
        }
        if cookie.is_empty() {
            return Err(ConferenceError::BadInvite);
        }
        self.conference_new()
    }

    fn conference_send_message(
        &mut self,
        conference: ConferenceNumber,
        _kind: MessageKind,
        message: &str,
    ) -> Result<(), SendError> {
        if self.conference_id(conference).is_none() {
            return Err(SendError::FriendNotFound);
        }
        if message.is_empty() {
            return Err(SendError::Empty);
        }
        Ok(())
    }

    fn conference_set_title(
        &mut self,
        conference: ConferenceNumber,
        title: &str,
    ) -> Result<(), ConferenceError> {
        let conf = self
            .conferences
            .get_mut(conference.0 as usize)
            .and_then(|c| c.as_mut())
            .ok_or(ConferenceError::NotFound)?;
        conf.title = title.to_owned();
        self.events
            .push_back(NetEvent::ConferenceTitle(conference, None, title.to_owned()));
        Ok(())
    }

    fn conference_id(&self, conference: ConferenceNumber) -> Option<ConferenceId> {
        self.conferences
            .get(conference.0 as usize)
            .and_then(|c| c.as_ref())
            .map(|c| c.id)
    }

    fn conference_type(&self, conference: ConferenceNumber) -> Option<ConferenceType> {
        self.conferences
            .get(conference.0 as usize)
            .and_then(|c| c.as_ref())
            .map(|c| c.kind)
    }

    fn conference_peer_count(&self, conference: ConferenceNumber) -> usize {
        self.conferences
            .get(conference.0 as usize)
            .and_then(|c| c.as_ref())
            .map(|c| c.peers.len())
            .unwrap_or(0)
    }

    fn conference_peer_name(
        &self,
        conference: ConferenceNumber,
        peer: ConferencePeerNumber,
    ) -> Option<String> {
        self.conferences
            .get(conference.0 as usize)
            .and_then(|c| c.as_ref())?
            .peers
            .iter()
            .find(|(n, _, _)| *n == peer)
            .map(|(_, _, name)| name.clone())
    }

    fn conference_peer_public_key(
        &self,
        conference: ConferenceNumber,
        peer: ConferencePeerNumber,
    ) -> Option<PublicKey> {
        self.conferences
            .get(conference.0 as usize)
            .and_then(|c| c.as_ref())?
            .peers
            .iter()
            .find(|(n, _, _)| *n == peer)
            .map(|(_, pk, _)| *pk)
    }

    fn group_new(
        &mut self,
        _privacy: GroupPrivacy,
        name: &str,
        nick: &str,
    ) -> Result<GroupNumber, GroupError> {
        if name.len() > GROUP_MAX_GROUP_NAME_LENGTH {
            return Err(GroupError::TooLong);
        }
        let group = SimGroup {
            chat_id: ChatId(random_bytes()),
            name: name.to_owned(),
            topic: String::new(),
            self_name: nick.to_owned(),
            self_role: GroupRole::Founder,
            connected: true,
            peers: Vec::new(),
        };
        self.groups.push(Some(group));
        let number = GroupNumber(self.groups.len() as u32 - 1);
        self.events.push_back(NetEvent::GroupSelfJoin(number));
        Ok(number)
    }

    fn group_join(
        &mut self,
        chat_id: ChatId,
        nick: &str,
        _password: Option<&str>,
    ) -> Result<GroupNumber, GroupError> {
        let group = SimGroup {
            chat_id,
            name: String::new(),
            topic: String::new(),
            self_name: nick.to_owned(),
            self_role: GroupRole::User,
            connected: true,
            peers: Vec::new(),
        };
        self.groups.push(Some(group));
        Ok(GroupNumber(self.groups.len() as u32 - 1))
    }

    fn group_leave(&mut self, group: GroupNumber, _part_message: &str) {
        if let Some(slot) = self.groups.get_mut(group.0 as usize) {
            *slot = None;
        }
    }

    fn group_reconnect(&mut self, group: GroupNumber) -> Result<(), GroupError> {
        self.group_mut(group)?.connected = true;
        self.events.push_back(NetEvent::GroupSelfJoin(group));
        Ok(())
    }

    fn group_disconnect(&mut self, group: GroupNumber) -> Result<(), GroupError> {
        self.group_mut(group)?.connected = false;
        Ok(())
    }

    fn group_invite_friend(
        &mut self,
        group: GroupNumber,
        friend: FriendNumber,
    ) -> Result<(), GroupError> {
        if self.group_ref(group).is_none() {
            return Err(GroupError::NotFound);
        }
        if self.friend(friend).is_none() {
            return Err(GroupError::FriendNotFound);
        }
        Ok(())
    }

    fn group_invite_accept(
        &mut self,
        friend: FriendNumber,
        invite_data: &[u8],
        nick: &str,
        password: Option<&str>,
    ) -> Result<GroupNumber, GroupError> {
        if self.friend(friend).is_none() {
            return Err(GroupError::FriendNotFound);
        }
        if invite_data.is_empty() {
            return Err(GroupError::Failed);
        }
        self.group_join(ChatId(random_bytes()), nick, password)
    }

    fn group_send_message(
        &mut self,
        group: GroupNumber,
        _kind: MessageKind,
        message: &str,
    ) -> Result<(), SendError> {
        let g = self.group_ref(group).ok_or(SendError::FriendNotFound)?;
        if !g.connected {
            return Err(SendError::FriendNotConnected);
        }
        if message.is_empty() {
            return Err(SendError::Empty);
        }
        Ok(())
    }

    fn group_send_private_message(
        &mut self,
        group: GroupNumber,
        peer: GroupPeerId,
        kind: MessageKind,
        message: &str,
    ) -> Result<(), SendError> {
        self.group_send_message(group, kind, message)?;
        let known = self
            .group_ref(group)
            .map(|g| g.peers.iter().any(|(p, ..)| *p == peer))
            .unwrap_or(false);
        if !known {
            return Err(SendError::FriendNotFound);
        }
        Ok(())
    }

    fn group_chat_id(&self, group: GroupNumber) -> Option<ChatId> {
        self.group_ref(group).map(|g| g.chat_id)
    }

    fn group_name(&self, group: GroupNumber) -> Option<String> {
        self.group_ref(group).map(|g| g.name.clone())
    }

    fn group_topic(&self, group: GroupNumber) -> Option<String> {
        self.group_ref(group).map(|g| g.topic.clone())
    }

    fn group_set_topic(&mut self, group: GroupNumber, topic: &str) -> Result<(), GroupError> {
        if topic.len() > GROUP_MAX_TOPIC_LENGTH {
            return Err(GroupError::TooLong);
        }
        self.group_mut(group)?.topic = topic.to_owned();
        Ok(())
    }

    fn group_self_name(&self, group: GroupNumber) -> Option<String> {
        self.group_ref(group).map(|g| g.self_name.clone())
    }

    fn group_self_set_name(&mut self, group: GroupNumber, nick: &str) -> Result<(), GroupError> {
        if nick.len() > MAX_NAME_LENGTH {
            return Err(GroupError::TooLong);
        }
        self.group_mut(group)?.self_name = nick.to_owned();
        Ok(())
    }

    fn group_self_role(&self, group: GroupNumber) -> Option<GroupRole> {
        self.group_ref(group).map(|g| g.self_role)
    }

    fn group_peer_name(&self, group: GroupNumber, peer: GroupPeerId) -> Option<String> {
        self.group_ref(group)?
            .peers
            .iter()
            .find(|(p, ..)| *p == peer)
            .map(|(_, _, name, _)| name.clone())
    }

    fn group_peer_public_key(&self, group: GroupNumber, peer: GroupPeerId) -> Option<PublicKey> {
        self.group_ref(group)?
            .peers
            .iter()
            .find(|(p, ..)| *p == peer)
            .map(|(_, pk, ..)| *pk)
    }

    fn group_peer_role(&self, group: GroupNumber, peer: GroupPeerId) -> Option<GroupRole> {
        self.group_ref(group)?
            .peers
            .iter()
            .find(|(p, ..)| *p == peer)
            .map(|(.., role)| *role)
    }

    fn group_set_ignore(
        &mut self,
        group: GroupNumber,
        peer: GroupPeerId,
        _ignore: bool,
    ) -> Result<(), GroupError> {
        let g = self.group_mut(group)?;
        if !g.peers.iter().any(|(p, ..)| *p == peer) {
            return Err(GroupError::PeerNotFound);
        }
        Ok(())
    }

    fn group_mod_kick(&mut self, group: GroupNumber, peer: GroupPeerId) -> Result<(), GroupError> {
        let g = self.group_mut(group)?;
        if !matches!(g.self_role, GroupRole::Founder | GroupRole::Moderator) {
            return Err(GroupError::PermissionDenied);
        }
        g.peers.retain(|(p, ..)| *p != peer);
        Ok(())
    }

    fn group_mod_set_role(
        &mut self,
        group: GroupNumber,
        peer: GroupPeerId,
        role: GroupRole,
    ) -> Result<(), GroupError> {
        let g = self.group_mut(group)?;
        if !matches!(g.self_role, GroupRole::Founder | GroupRole::Moderator) {
            return Err(GroupError::PermissionDenied);
        }
        match g.peers.iter_mut().find(|(p, ..)| *p == peer) {
            Some(entry) => {
                entry.3 = role;
                Ok(())
            }
            None => Err(GroupError::PeerNotFound),
        }
    }

    fn group_set_password(
        &mut self,
        group: GroupNumber,
        password: Option<&str>,
    ) -> Result<(), GroupError> {
        if password.is_some_and(|p| p.len() > GROUP_MAX_PASSWORD_SIZE) {
            return Err(GroupError::TooLong);
        }
        let g = self.group_mut(group)?;
        if g.self_role != GroupRole::Founder {
            return Err(GroupError::PermissionDenied);
        }
        Ok(())
    }

    fn group_set_privacy_state(
        &mut self,
        group: GroupNumber,
        privacy: GroupPrivacy,
    ) -> Result<(), GroupError> {
        let g = self.group_mut(group)?;
        if g.self_role != GroupRole::Founder {
            return Err(GroupError::PermissionDenied);
        }
        self.events
            .push_back(NetEvent::GroupPrivacyState(group, privacy));
        Ok(())
    }

    fn group_set_peer_limit(&mut self, group: GroupNumber, limit: u32) -> Result<(), GroupError> {
        let g = self.group_mut(group)?;
        if g.self_role != GroupRole::Founder {
            return Err(GroupError::PermissionDenied);
        }
        self.events.push_back(NetEvent::GroupPeerLimit(group, limit));
        Ok(())
    }

    fn group_set_topic_lock(
        &mut self,
        group: GroupNumber,
        lock: GroupTopicLock,
    ) -> Result<(), GroupError> {
        let g = self.group_mut(group)?;
        if g.self_role != GroupRole::Founder {
            return Err(GroupError::PermissionDenied);
        }
        self.events.push_back(NetEvent::GroupTopicLock(group, lock));
        Ok(())
    }

    fn group_set_voice_state(
        &mut self,
        group: GroupNumber,
        state: GroupVoiceState,
    ) -> Result<(), GroupError> {
        let g = self.group_mut(group)?;
        if g.self_role != GroupRole::Founder {
            return Err(GroupError::PermissionDenied);
        }
        self.events.push_back(NetEvent::GroupVoiceState(group, state));
        Ok(())
    }

    fn file_send(
        &mut self,
        friend: FriendNumber,
        _kind: FileKind,
        _size: u64,
        file_id: Option<FileId>,
        name: &str,
    ) -> Result<(FileNumber, FileId), FileSendError> {
        let f = self.friend(friend).ok_or(FileSendError::FriendNotFound)?;
        if !f.connection.is_online() {
            return Err(FileSendError::FriendNotConnected);
        }
        if name.len() > MAX_FILENAME_LENGTH {
            return Err(FileSendError::NameTooLong);
        }
        self.next_file_number += 1;
        let id = file_id.unwrap_or_else(|| FileId(random_bytes()));
        Ok((FileNumber(self.next_file_number), id))
    }

    fn file_control(
        &mut self,
        friend: FriendNumber,
        _file: FileNumber,
        _control: FileControl,
    ) -> Result<(), FileSendError> {
        if self.friend(friend).is_none() {
            return Err(FileSendError::FriendNotFound);
        }
        Ok(())
    }

    fn file_seek(
        &mut self,
        friend: FriendNumber,
        _file: FileNumber,
        _position: u64,
    ) -> Result<(), FileSendError> {
        if self.friend(friend).is_none() {
            return Err(FileSendError::FriendNotFound);
        }
        Ok(())
    }

    fn file_send_chunk(
        &mut self,
        friend: FriendNumber,
        _file: FileNumber,
        _position: u64,
        data: &[u8],
    ) -> Result<(), FileSendError> {
        let f = self.friend(friend).ok_or(FileSendError::FriendNotFound)?;
        if !f.connection.is_online() {
            return Err(FileSendError::FriendNotConnected);
        }
        if data.len() > FILE_CHUNK_SIZE {
            return Err(FileSendError::BadLength);
        }
        Ok(())
    }

    fn bootstrap(&mut self, _host: &str, port: u16, _key: PublicKey) -> bool {
        if port == 0 {
            return false;
        }
        // No transport: report the attempt, stay offline.
        true
    }

    fn store_data(&self, path: &Path) -> Result<(), StoreError> {
        let mut identity = self.identity.clone();
        identity.friends = self.friends.iter().flatten().cloned().collect();
        let data = serde_json::to_string_pretty(&identity).map_err(|_| StoreError::Io)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data).map_err(|_| StoreError::Io)?;
        fs::rename(&tmp, path).map_err(|_| StoreError::Io)?;
        Ok(())
    }

    fn iteration_interval(&self) -> Duration {
        Duration::from_millis(50)
    }

    fn poll(&mut self) -> Vec<NetEvent> {
        if self.connection == Connection::None {
            // The first poll reports the (lone) local endpoint as up so
            // the prompt window shows a connection line.
            self.connection = Connection::Udp;
            self.events
                .push_front(NetEvent::SelfConnectionStatus(Connection::Udp));
        }
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friend_add_validates_address() {
        let mut net = SimNetlink::new();
        let own = net.self_address();
        assert_eq!(net.friend_add(own, "hi"), Err(FriendAddError::OwnAddress));

        let mut bad = own;
        bad.0[0] ^= 0xFF;
        assert_eq!(net.friend_add(bad, "hi"), Err(FriendAddError::BadChecksum));

        let other = Address::from_public_key(PublicKey([9; PUBLIC_KEY_SIZE]), 1);
        assert_eq!(net.friend_add(other, ""), Err(FriendAddError::NoMessage));
        let n = net.friend_add(other, "hi").unwrap();
        assert_eq!(net.friend_public_key(n), Some(PublicKey([9; PUBLIC_KEY_SIZE])));
        assert_eq!(net.friend_add(other, "hi"), Err(FriendAddError::AlreadyFriend));
    }

    #[test]
    fn friend_numbers_reuse_lowest_slot() {
        let mut net = SimNetlink::new();
        let a = net.friend_add_norequest(PublicKey([1; 32])).unwrap();
        let b = net.friend_add_norequest(PublicKey([2; 32])).unwrap();
        assert_eq!((a.0, b.0), (0, 1));
        net.friend_delete(a);
        let c = net.friend_add_norequest(PublicKey([3; 32])).unwrap();
        assert_eq!(c.0, 0);
    }

    #[test]
    fn store_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let mut net = SimNetlink::new();
        net.self_set_name("ruth");
        net.friend_add_norequest(PublicKey([5; 32])).unwrap();
        net.store_data(&path).unwrap();

        let restored = SimNetlink::load(&path).unwrap();
        assert_eq!(restored.self_public_key(), net.self_public_key());
        assert_eq!(restored.self_name(), "ruth");
        assert_eq!(restored.friend_public_key(FriendNumber(0)), Some(PublicKey([5; 32])));
    }

    #[test]
    fn load_rejects_corrupt_blob() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(SimNetlink::load(&path).is_err());
    }

    #[test]
    fn offline_friend_cannot_receive() {
        let mut net = SimNetlink::new();
        let n = net.friend_add_norequest(PublicKey([1; 32])).unwrap();
        assert_eq!(
            net.friend_send_message(n, MessageKind::Normal, "hello"),
            Err(SendError::FriendNotConnected)
        );
        net.set_friend_connection(n, Connection::Udp);
        let r1 = net.friend_send_message(n, MessageKind::Normal, "hello").unwrap();
        let r2 = net.friend_send_message(n, MessageKind::Normal, "again").unwrap();
        assert!(r2.0 > r1.0);
    }
}
