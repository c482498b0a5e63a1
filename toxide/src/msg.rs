//! The four inbound message families (network, input, I/O, system)
//! and the outbound command families the update function returns.
//! Network events arrive pre-enriched by the worker: peer ids come
//! with the names, keys and roles the handlers need, so the update
//! path never queries the network layer.

use crate::scrollback::LineId;
use crossterm::event::Event as CrosstermEvent;
use std::path::PathBuf;
use toxide_net::{
    Address, ChatId, ConferenceId, ConferenceNumber, ConferencePeerNumber, ConferenceType,
    Connection, FileControl, FileId, FileKind, FileNumber, FileSendError, FriendAddError,
    FriendNumber, GroupJoinFail, GroupModEvent, GroupNumber, GroupPeerId, GroupPrivacy, GroupRole,
    GroupTopicLock, GroupVoiceState, MessageKind, PublicKey, ReceiptId, SendError, UserStatus,
};

#[derive(Debug, Clone)]
pub enum Msg {
    /// Events originating from the network worker
    Tox(ToxEvent),
    /// Events originating from the user (keyboard, resize, paste)
    Input(CrosstermEvent),
    /// Events originating from the I/O worker
    IO(IOEvent),
    /// Timer ticks and other process-level events
    System(SystemEvent),
}

#[derive(Debug, Clone)]
pub enum ToxEvent {
    SelfConnectionStatus(Connection),
    /// Emitted after a nospam change regenerates the address.
    SelfAddress(Address),

    FriendRequest(PublicKey, String),
    FriendAdded(FriendNumber, PublicKey),
    FriendAddFailed(FriendAddError),
    FriendConnectionStatus(FriendNumber, Connection),
    FriendMessage(FriendNumber, MessageKind, String),
    FriendName(FriendNumber, String),
    FriendStatus(FriendNumber, UserStatus),
    FriendStatusMessage(FriendNumber, String),
    FriendTyping(FriendNumber, bool),
    ReadReceipt(FriendNumber, ReceiptId),
    MessageSent(FriendNumber, ReceiptId, LineId),
    MessageSendFailed(FriendNumber, LineId, SendError),

    ConferenceInvite(FriendNumber, ConferenceType, Vec<u8>),
    ConferenceCreated(ConferenceNumber, ConferenceId, ConferenceType),
    ConferenceMessage(
        ConferenceNumber,
        ConferencePeerNumber,
        PublicKey,
        String,
        MessageKind,
        String,
    ),
    ConferencePeerList(ConferenceNumber, Vec<(ConferencePeerNumber, PublicKey, String)>),
    ConferencePeerName(ConferenceNumber, ConferencePeerNumber, String),
    ConferenceTitle(ConferenceNumber, String),

    FileRecv(FriendNumber, FileNumber, FileKind, u64, String, FileId),
    FileChunkRequest(FriendNumber, FileNumber, u64, usize),
    FileRecvChunk(FriendNumber, FileNumber, u64, Vec<u8>),
    FileControlRecv(FriendNumber, FileNumber, FileControl),
    FileSendStarted(FriendNumber, FileNumber, FileId, FileKind, usize),
    FileSendFailed(FriendNumber, usize, FileKind, FileSendError),

    GroupInvite(FriendNumber, Vec<u8>, String),
    GroupCreated(GroupNumber, ChatId, String, String, GroupRole),
    GroupMessage(GroupNumber, GroupPeerId, String, MessageKind, String),
    GroupPrivateMessage(GroupNumber, GroupPeerId, String, MessageKind, String),
    GroupPeerJoin(GroupNumber, GroupPeerId, PublicKey, String, GroupRole),
    GroupPeerExit(GroupNumber, GroupPeerId, String, String),
    GroupTopic(GroupNumber, String, String),
    GroupPeerLimit(GroupNumber, u32),
    GroupPrivacyState(GroupNumber, GroupPrivacy),
    GroupTopicLock(GroupNumber, GroupTopicLock),
    GroupVoiceState(GroupNumber, GroupVoiceState),
    GroupPassword(GroupNumber, String),
    GroupNickChange(GroupNumber, GroupPeerId, String),
    GroupStatusChange(GroupNumber, GroupPeerId, UserStatus),
    GroupSelfJoin(GroupNumber, String, String),
    GroupRejected(GroupNumber, GroupJoinFail),
    GroupModeration(GroupNumber, GroupPeerId, GroupPeerId, GroupModEvent),
}

#[derive(Debug, Clone)]
pub enum IOEvent {
    ChunkRead(FriendNumber, FileId, u64, usize),
    ChunkWritten(FriendNumber, FileId, u64, usize),
    FileError(FriendNumber, FileId, String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    Tick,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Send a request to the network worker
    Tox(ToxAction),
    /// Send a request to the I/O worker
    IO(IOAction),
    /// Internal application commands
    App(AppCmd),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCmd {
    Quit,
    Redraw,
    Bell,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IOAction {
    FileOpenRead(FriendNumber, FileId, PathBuf),
    FileOpenWrite(FriendNumber, FileId, PathBuf),
    /// Read `len` bytes at `pos` and forward them to the network
    /// worker as a FileSendChunk.
    ReadChunk(FriendNumber, FileNumber, FileId, u64, usize),
    WriteChunk(FriendNumber, FileId, u64, Vec<u8>),
    CloseFile(FriendNumber, FileId),
    LogLine(PathBuf, String),
    LogRename(PathBuf, PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToxAction {
    SendMessage(FriendNumber, MessageKind, String, LineId),
    AddFriend(String, String),
    AddFriendNorequest(PublicKey),
    DeleteFriend(FriendNumber),
    SetName(String),
    SetStatus(UserStatus),
    SetStatusMessage(String),
    SetNospam(Option<u32>),
    SetTyping(FriendNumber, bool),

    ConferenceNew,
    ConferenceDelete(ConferenceNumber),
    ConferenceInvite(ConferenceNumber, FriendNumber),
    ConferenceJoin(FriendNumber, Vec<u8>),
    ConferenceSendMessage(ConferenceNumber, MessageKind, String),
    ConferenceSetTitle(ConferenceNumber, String),

    GroupNew(GroupPrivacy, String, String),
    GroupJoin(ChatId, String, Option<String>),
    GroupLeave(GroupNumber, String),
    GroupReconnect(GroupNumber),
    GroupDisconnect(GroupNumber),
    GroupInviteFriend(GroupNumber, FriendNumber),
    GroupInviteAccept(FriendNumber, Vec<u8>, String, Option<String>),
    GroupSendMessage(GroupNumber, MessageKind, String),
    GroupSendPrivateMessage(GroupNumber, GroupPeerId, MessageKind, String),
    GroupSetTopic(GroupNumber, String),
    GroupSelfSetName(GroupNumber, String),
    GroupSetIgnore(GroupNumber, GroupPeerId, bool),
    GroupKick(GroupNumber, GroupPeerId),
    GroupSetRole(GroupNumber, GroupPeerId, GroupRole),
    GroupSetPassword(GroupNumber, Option<String>),
    GroupSetPrivacy(GroupNumber, GroupPrivacy),
    GroupSetPeerLimit(GroupNumber, u32),
    GroupSetTopicLock(GroupNumber, GroupTopicLock),
    GroupSetVoiceState(GroupNumber, GroupVoiceState),

    /// `slot` ties the worker's started/failed reply back to the
    /// transfer slot allocated by the update path.
    FileSend(FriendNumber, FileKind, u64, Option<FileId>, String, usize),
    FileControl(FriendNumber, FileNumber, FileControl),
    FileSeek(FriendNumber, FileNumber, u64),
    FileSendChunk(FriendNumber, FileNumber, u64, Vec<u8>),

    Bootstrap(String, u16, PublicKey),
    StoreData,
    Shutdown,
}
