use crate::types::*;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Callbacks emitted by the network layer, drained through
/// [`Netlink::poll`]. Numbers (friend, conference, group, file) are
/// per-session handles; byte-array ids are stable across sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    SelfConnectionStatus(Connection),

    FriendRequest(PublicKey, String),
    FriendConnectionStatus(FriendNumber, Connection),
    FriendMessage(FriendNumber, MessageKind, String),
    FriendName(FriendNumber, String),
    FriendStatus(FriendNumber, UserStatus),
    FriendStatusMessage(FriendNumber, String),
    FriendTyping(FriendNumber, bool),
    FriendReadReceipt(FriendNumber, ReceiptId),
    /// Application-defined lossless payloads (games, scripting).
    FriendLosslessPacket(FriendNumber, Vec<u8>),

    ConferenceInvite(FriendNumber, ConferenceType, Vec<u8>),
    ConferenceMessage(ConferenceNumber, ConferencePeerNumber, MessageKind, String),
    ConferencePeerListChanged(ConferenceNumber),
    ConferencePeerName(ConferenceNumber, ConferencePeerNumber, String),
    ConferenceTitle(ConferenceNumber, Option<ConferencePeerNumber>, String),

    FileRecv(FriendNumber, FileNumber, FileKind, u64, String, FileId),
    FileChunkRequest(FriendNumber, FileNumber, u64, usize),
    FileRecvChunk(FriendNumber, FileNumber, u64, Vec<u8>),
    FileControlRecv(FriendNumber, FileNumber, FileControl),

    GroupInvite(FriendNumber, Vec<u8>, String),
    GroupMessage(GroupNumber, GroupPeerId, MessageKind, String),
    GroupPrivateMessage(GroupNumber, GroupPeerId, MessageKind, String),
    GroupPeerJoin(GroupNumber, GroupPeerId),
    GroupPeerExit(GroupNumber, GroupPeerId, String, String),
    GroupTopic(GroupNumber, GroupPeerId, String),
    GroupPeerLimit(GroupNumber, u32),
    GroupPrivacyState(GroupNumber, GroupPrivacy),
    GroupTopicLock(GroupNumber, GroupTopicLock),
    GroupVoiceState(GroupNumber, GroupVoiceState),
    GroupPassword(GroupNumber, String),
    GroupNickChange(GroupNumber, GroupPeerId, String),
    GroupStatusChange(GroupNumber, GroupPeerId, UserStatus),
    GroupSelfJoin(GroupNumber),
    GroupRejected(GroupNumber, GroupJoinFail),
    GroupModeration(GroupNumber, GroupPeerId, GroupPeerId, GroupModEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FriendAddError {
    #[error("the ID is too long or too short")]
    BadLength,
    #[error("the address checksum is invalid")]
    BadChecksum,
    #[error("that address is your own")]
    OwnAddress,
    #[error("already on the friend list")]
    AlreadyFriend,
    #[error("friend request message is empty")]
    NoMessage,
    #[error("friend request message is too long")]
    MessageTooLong,
    #[error("friend list is full")]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("friend not found")]
    FriendNotFound,
    #[error("friend is not connected")]
    FriendNotConnected,
    #[error("message is empty")]
    Empty,
    #[error("message is too long")]
    TooLong,
    #[error("send queue is full")]
    SendQueueFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FileSendError {
    #[error("friend not found")]
    FriendNotFound,
    #[error("friend is not connected")]
    FriendNotConnected,
    #[error("filename is too long")]
    NameTooLong,
    #[error("too many concurrent transfers")]
    TooMany,
    #[error("invalid file number")]
    BadFileNumber,
    #[error("transfer is not in the right state")]
    Denied,
    #[error("seek position is out of range")]
    BadPosition,
    #[error("chunk does not match the requested length")]
    BadLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConferenceError {
    #[error("conference not found")]
    NotFound,
    #[error("friend not found")]
    FriendNotFound,
    #[error("invalid invite cookie")]
    BadInvite,
    #[error("conference operation failed")]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("group not found")]
    NotFound,
    #[error("peer not found")]
    PeerNotFound,
    #[error("friend not found")]
    FriendNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("argument is too long")]
    TooLong,
    #[error("not connected to the group")]
    Disconnected,
    #[error("group operation failed")]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("failed to write the data file")]
    Io,
}

/// The opaque network handle. One instance per identity; all calls are
/// made from the network worker thread.
pub trait Netlink: Send {
    // Self.
    fn self_address(&self) -> Address;
    fn self_public_key(&self) -> PublicKey;
    fn self_name(&self) -> String;
    fn self_set_name(&mut self, name: &str);
    fn self_status(&self) -> UserStatus;
    fn self_set_status(&mut self, status: UserStatus);
    fn self_status_message(&self) -> String;
    fn self_set_status_message(&mut self, note: &str);
    fn self_set_nospam(&mut self, nospam: u32);
    fn self_nospam(&self) -> u32;

    // Friends.
    fn friend_list(&self) -> Vec<FriendNumber>;
    fn friend_name(&self, friend: FriendNumber) -> Option<String>;
    fn friend_add(&mut self, address: Address, message: &str)
    -> Result<FriendNumber, FriendAddError>;
    fn friend_add_norequest(&mut self, pk: PublicKey) -> Result<FriendNumber, FriendAddError>;
    fn friend_delete(&mut self, friend: FriendNumber);
    fn friend_public_key(&self, friend: FriendNumber) -> Option<PublicKey>;
    fn friend_connection_status(&self, friend: FriendNumber) -> Connection;
    fn friend_send_message(
        &mut self,
        friend: FriendNumber,
        kind: MessageKind,
        message: &str,
    ) -> Result<ReceiptId, SendError>;
    fn self_set_typing(&mut self, friend: FriendNumber, typing: bool);

    // Conferences.
    fn conference_new(&mut self) -> Result<ConferenceNumber, ConferenceError>;
    fn conference_delete(&mut self, conference: ConferenceNumber);
    fn conference_invite(
        &mut self,
        conference: ConferenceNumber,
        friend: FriendNumber,
    ) -> Result<(), ConferenceError>;
    fn conference_join(
        &mut self,
        friend: FriendNumber,
        cookie: &[u8],
    ) -> Result<ConferenceNumber, ConferenceError>;
    fn conference_send_message(
        &mut self,
        conference: ConferenceNumber,
        kind: MessageKind,
        message: &str,
    ) -> Result<(), SendError>;
    fn conference_set_title(
        &mut self,
        conference: ConferenceNumber,
        title: &str,
    ) -> Result<(), ConferenceError>;
    fn conference_id(&self, conference: ConferenceNumber) -> Option<ConferenceId>;
    fn conference_type(&self, conference: ConferenceNumber) -> Option<ConferenceType>;
    fn conference_peer_count(&self, conference: ConferenceNumber) -> usize;
    fn conference_peer_name(
        &self,
        conference: ConferenceNumber,
        peer: ConferencePeerNumber,
    ) -> Option<String>;
    fn conference_peer_public_key(
        &self,
        conference: ConferenceNumber,
        peer: ConferencePeerNumber,
    ) -> Option<PublicKey>;

    // Groups.
    fn group_new(
        &mut self,
        privacy: GroupPrivacy,
        name: &str,
        nick: &str,
    ) -> Result<GroupNumber, GroupError>;
    fn group_join(
        &mut self,
        chat_id: ChatId,
        nick: &str,
        password: Option<&str>,
    ) -> Result<GroupNumber, GroupError>;
    fn group_leave(&mut self, group: GroupNumber, part_message: &str);
    fn group_reconnect(&mut self, group: GroupNumber) -> Result<(), GroupError>;
    fn group_disconnect(&mut self, group: GroupNumber) -> Result<(), GroupError>;
    fn group_invite_friend(
        &mut self,
        group: GroupNumber,
        friend: FriendNumber,
    ) -> Result<(), GroupError>;
    fn group_invite_accept(
        &mut self,
        friend: FriendNumber,
        invite_data: &[u8],
        nick: &str,
        password: Option<&str>,
    ) -> Result<GroupNumber, GroupError>;
    fn group_send_message(
        &mut self,
        group: GroupNumber,
        kind: MessageKind,
        message: &str,
    ) -> Result<(), SendError>;
    fn group_send_private_message(
        &mut self,
        group: GroupNumber,
        peer: GroupPeerId,
        kind: MessageKind,
        message: &str,
    ) -> Result<(), SendError>;
    fn group_chat_id(&self, group: GroupNumber) -> Option<ChatId>;
    fn group_name(&self, group: GroupNumber) -> Option<String>;
    fn group_topic(&self, group: GroupNumber) -> Option<String>;
    fn group_set_topic(&mut self, group: GroupNumber, topic: &str) -> Result<(), GroupError>;
    fn group_self_name(&self, group: GroupNumber) -> Option<String>;
    fn group_self_set_name(&mut self, group: GroupNumber, nick: &str) -> Result<(), GroupError>;
    fn group_self_role(&self, group: GroupNumber) -> Option<GroupRole>;
    fn group_peer_name(&self, group: GroupNumber, peer: GroupPeerId) -> Option<String>;
    fn group_peer_public_key(&self, group: GroupNumber, peer: GroupPeerId) -> Option<PublicKey>;
    fn group_peer_role(&self, group: GroupNumber, peer: GroupPeerId) -> Option<GroupRole>;
    fn group_set_ignore(
        &mut self,
        group: GroupNumber,
        peer: GroupPeerId,
        ignore: bool,
    ) -> Result<(), GroupError>;
    fn group_mod_kick(&mut self, group: GroupNumber, peer: GroupPeerId) -> Result<(), GroupError>;
    fn group_mod_set_role(
        &mut self,
        group: GroupNumber,
        peer: GroupPeerId,
        role: GroupRole,
    ) -> Result<(), GroupError>;
    fn group_set_password(
        &mut self,
        group: GroupNumber,
        password: Option<&str>,
    ) -> Result<(), GroupError>;
    fn group_set_privacy_state(
        &mut self,
        group: GroupNumber,
        privacy: GroupPrivacy,
    ) -> Result<(), GroupError>;
    fn group_set_peer_limit(&mut self, group: GroupNumber, limit: u32) -> Result<(), GroupError>;
    fn group_set_topic_lock(
        &mut self,
        group: GroupNumber,
        lock: GroupTopicLock,
    ) -> Result<(), GroupError>;
    fn group_set_voice_state(
        &mut self,
        group: GroupNumber,
        state: GroupVoiceState,
    ) -> Result<(), GroupError>;

    // Files. `file_send` with an explicit id is the resume path; the
    // layer assigns a fresh per-session file number either way.
    fn file_send(
        &mut self,
        friend: FriendNumber,
        kind: FileKind,
        size: u64,
        file_id: Option<FileId>,
        name: &str,
    ) -> Result<(FileNumber, FileId), FileSendError>;
    fn file_control(
        &mut self,
        friend: FriendNumber,
        file: FileNumber,
        control: FileControl,
    ) -> Result<(), FileSendError>;
    fn file_seek(
        &mut self,
        friend: FriendNumber,
        file: FileNumber,
        position: u64,
    ) -> Result<(), FileSendError>;
    fn file_send_chunk(
        &mut self,
        friend: FriendNumber,
        file: FileNumber,
        position: u64,
        data: &[u8],
    ) -> Result<(), FileSendError>;

    // Session.
    fn bootstrap(&mut self, host: &str, port: u16, key: PublicKey) -> bool;
    fn store_data(&self, path: &Path) -> Result<(), StoreError>;
    fn iteration_interval(&self) -> Duration;
    fn poll(&mut self) -> Vec<NetEvent>;
}
