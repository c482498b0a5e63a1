//! Friend registry, block list and pending friend requests.
//!
//! Registries use the sparse-array discipline: `list[max_idx]` with
//! inactive holes, plus a sorted `index` rebuilt from scratch after
//! every membership or connection change. The block list persists to a
//! fixed-record file and the on-disk and in-memory forms agree after
//! every mutation.

use crate::config::{Config, TabColor};
use crate::queue::MessageQueue;
use crate::transfers::Transfers;
use std::fs;
use std::io;
use std::path::Path;
use toxide_net::{
    ConferenceType, Connection, FriendNumber, PUBLIC_KEY_SIZE, PublicKey, UserStatus,
};

/// Block-list records carry at most this many name bytes.
pub const BLOCK_NAME_MAX: usize = 32;
/// u16 name length, padded name, public key, u64 last-online. All
/// integers big-endian.
pub const BLOCK_RECORD_SIZE: usize = 2 + (BLOCK_NAME_MAX + 1) + PUBLIC_KEY_SIZE + 8;

pub const MAX_FRIEND_REQUESTS: usize = 32;

#[derive(Debug, Clone)]
pub struct ConferenceInvite {
    pub kind: ConferenceType,
    pub cookie: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GroupInvite {
    pub data: Vec<u8>,
    pub name: String,
}

#[derive(Debug)]
pub struct Friend {
    pub number: FriendNumber,
    pub pk: PublicKey,
    pub name: String,
    pub alias: Option<String>,
    pub status_message: String,
    pub connection: Connection,
    pub status: UserStatus,
    pub is_typing: bool,
    pub logging_on: bool,
    pub auto_accept_files: bool,
    pub show_connection_msg: bool,
    pub tab_color: TabColor,
    pub last_online: i64,
    pub last_online_str: String,
    pub conference_invite: Option<ConferenceInvite>,
    pub group_invite: Option<GroupInvite>,
    pub transfers: Transfers,
    pub queue: MessageQueue,
}

impl Friend {
    pub fn new(number: FriendNumber, pk: PublicKey) -> Self {
        Self {
            number,
            pk,
            name: format!("Anonymous ({})", &hex::encode(pk.0)[..6]),
            alias: None,
            status_message: String::new(),
            connection: Connection::None,
            status: UserStatus::Online,
            is_typing: false,
            logging_on: false,
            auto_accept_files: false,
            show_connection_msg: true,
            tab_color: TabColor::Default,
            last_online: 0,
            last_online_str: String::new(),
            conference_invite: None,
            group_invite: None,
            transfers: Transfers::new(),
            queue: MessageQueue::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Settings that come from config; runtime toggles (like `/log`)
    /// diverge until the window is reopened.
    pub fn apply_config(&mut self, config: &Config) {
        self.logging_on = config.ui.autolog;
        self.auto_accept_files = false;
        self.show_connection_msg = config.ui.show_connection_msg;
        self.tab_color = TabColor::Default;
        self.alias = None;
        if let Some(ov) = config.friend_overrides(&self.pk) {
            if let Some(v) = ov.autolog {
                self.logging_on = v;
            }
            if let Some(v) = ov.auto_accept_files {
                self.auto_accept_files = v;
            }
            if let Some(v) = ov.show_connection_msg {
                self.show_connection_msg = v;
            }
            if let Some(v) = ov.tab_color {
                self.tab_color = v;
            }
            if let Some(a) = &ov.alias
                && !a.is_empty()
            {
                self.alias = Some(a.clone());
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct FriendRegistry {
    list: Vec<Option<Friend>>,
    max_idx: usize,
    index: Vec<usize>,
}

impl FriendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_active(&self) -> usize {
        self.index.len()
    }

    pub fn max_idx(&self) -> usize {
        self.max_idx
    }

    /// Sorted view: online contacts first, then case-insensitive name.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn get(&self, number: FriendNumber) -> Option<&Friend> {
        self.list.get(number.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, number: FriendNumber) -> Option<&mut Friend> {
        self.list.get_mut(number.0 as usize)?.as_mut()
    }

    pub fn by_pk(&self, pk: &PublicKey) -> Option<&Friend> {
        self.iter().find(|f| &f.pk == pk)
    }

    pub fn by_index_pos(&self, pos: usize) -> Option<&Friend> {
        let slot = *self.index.get(pos)?;
        self.list[slot].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Friend> {
        self.list[..self.max_idx].iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Friend> {
        self.list[..self.max_idx].iter_mut().flatten()
    }

    pub fn add(&mut self, number: FriendNumber, pk: PublicKey, config: &Config) -> &mut Friend {
        let slot = number.0 as usize;
        if slot >= self.list.len() {
            self.list.resize_with(slot + 1, || None);
        }
        let mut friend = Friend::new(number, pk);
        friend.apply_config(config);
        self.list[slot] = Some(friend);
        if slot + 1 > self.max_idx {
            self.max_idx = slot + 1;
        }
        self.sort();
        self.list[slot].as_mut().unwrap()
    }

    pub fn remove(&mut self, number: FriendNumber) -> Option<Friend> {
        let slot = number.0 as usize;
        let removed = self.list.get_mut(slot)?.take();
        if removed.is_some() {
            while self.max_idx > 0 && self.list[self.max_idx - 1].is_none() {
                self.max_idx -= 1;
            }
            self.sort();
        }
        removed
    }

    /// Rebuilds the sorted index from scratch. Called after every
    /// insert, delete and connection-status change.
    pub fn sort(&mut self) {
        let mut idx: Vec<usize> = (0..self.max_idx)
            .filter(|&i| self.list[i].is_some())
            .collect();
        idx.sort_by_cached_key(|&i| {
            let f = self.list[i].as_ref().unwrap();
            let presence = if f.connection.is_online() { 0u8 } else { 1 };
            (presence, f.display_name().to_lowercase())
        });
        self.index = idx;
    }

    pub fn set_connection(&mut self, number: FriendNumber, connection: Connection) {
        if let Some(f) = self.get_mut(number) {
            f.connection = connection;
            self.sort();
        }
    }

    /// True when an incoming key shares its first three bytes with any
    /// existing contact (possible impersonation).
    pub fn key_prefix_collides(&self, pk: &PublicKey) -> bool {
        self.iter().any(|f| f.pk.0[..3] == pk.0[..3])
    }

    pub fn apply_config_all(&mut self, config: &Config) {
        for friend in self.list[..self.max_idx].iter_mut().flatten() {
            friend.apply_config(config);
        }
        self.sort();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedFriend {
    pub pk: PublicKey,
    pub name: String,
    pub last_online: i64,
}

#[derive(Debug, Default)]
pub struct BlockList {
    list: Vec<Option<BlockedFriend>>,
    max_idx: usize,
    index: Vec<usize>,
}

#[derive(Debug)]
pub enum BlockListError {
    Io(io::Error),
    BadSize(usize),
    BadRecord,
}

impl std::fmt::Display for BlockListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockListError::Io(e) => write!(f, "block list I/O failed: {}", e),
            BlockListError::BadSize(n) => {
                write!(f, "block list file has invalid size {}", n)
            }
            BlockListError::BadRecord => write!(f, "block list record is malformed"),
        }
    }
}

impl std::error::Error for BlockListError {}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_blocked(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn get_slot(&self, slot: usize) -> Option<&BlockedFriend> {
        self.list.get(slot)?.as_ref()
    }

    pub fn by_index_pos(&self, pos: usize) -> Option<&BlockedFriend> {
        let slot = *self.index.get(pos)?;
        self.list[slot].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockedFriend> {
        self.list[..self.max_idx].iter().flatten()
    }

    pub fn contains(&self, pk: &PublicKey) -> bool {
        self.iter().any(|b| &b.pk == pk)
    }

    pub fn add(&mut self, entry: BlockedFriend) -> usize {
        let slot = self.list[..self.max_idx]
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.max_idx);
        if slot >= self.list.len() {
            self.list.resize_with(slot + 1, || None);
        }
        self.list[slot] = Some(entry);
        if slot + 1 > self.max_idx {
            self.max_idx = slot + 1;
        }
        self.sort();
        slot
    }

    pub fn remove_by_pk(&mut self, pk: &PublicKey) -> Option<BlockedFriend> {
        let slot = self.list[..self.max_idx]
            .iter()
            .position(|b| b.as_ref().map(|b| &b.pk == pk).unwrap_or(false))?;
        let removed = self.list[slot].take();
        while self.max_idx > 0 && self.list[self.max_idx - 1].is_none() {
            self.max_idx -= 1;
        }
        self.sort();
        removed
    }

    fn sort(&mut self) {
        let mut idx: Vec<usize> = (0..self.max_idx)
            .filter(|&i| self.list[i].is_some())
            .collect();
        idx.sort_by_cached_key(|&i| self.list[i].as_ref().unwrap().name.to_lowercase());
        self.index = idx;
    }

    /// Serializes to `<path>.tmp` and rename-replaces. An empty list
    /// deletes the file.
    pub fn save(&self, path: &Path) -> Result<(), BlockListError> {
        if self.index.is_empty() {
            match fs::remove_file(path) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(BlockListError::Io(e)),
            }
        }

        let mut data = Vec::with_capacity(self.index.len() * BLOCK_RECORD_SIZE);
        for entry in self.iter() {
            let name_bytes = entry.name.as_bytes();
            let name_len = name_bytes.len().min(BLOCK_NAME_MAX);
            data.extend_from_slice(&(name_len as u16).to_be_bytes());
            let mut name_buf = [0u8; BLOCK_NAME_MAX + 1];
            name_buf[..name_len].copy_from_slice(&name_bytes[..name_len]);
            data.extend_from_slice(&name_buf);
            data.extend_from_slice(&entry.pk.0);
            data.extend_from_slice(&(entry.last_online as u64).to_be_bytes());
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &data).map_err(BlockListError::Io)?;
        fs::rename(&tmp, path).map_err(BlockListError::Io)
    }

    pub fn load(path: &Path) -> Result<Self, BlockListError> {
        let mut out = Self::new();
        let data = match fs::read(path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(BlockListError::Io(e)),
        };
        if !data.len().is_multiple_of(BLOCK_RECORD_SIZE) {
            return Err(BlockListError::BadSize(data.len()));
        }
        for record in data.chunks_exact(BLOCK_RECORD_SIZE) {
            let name_len = u16::from_be_bytes([record[0], record[1]]) as usize;
            if name_len > BLOCK_NAME_MAX {
                return Err(BlockListError::BadRecord);
            }
            let name = String::from_utf8_lossy(&record[2..2 + name_len]).into_owned();
            let pk_off = 2 + BLOCK_NAME_MAX + 1;
            let mut pk = [0u8; PUBLIC_KEY_SIZE];
            pk.copy_from_slice(&record[pk_off..pk_off + PUBLIC_KEY_SIZE]);
            let lo_off = pk_off + PUBLIC_KEY_SIZE;
            let last_online =
                u64::from_be_bytes(record[lo_off..lo_off + 8].try_into().unwrap()) as i64;
            out.add(BlockedFriend {
                pk: PublicKey(pk),
                name,
                last_online,
            });
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRequest {
    pub pk: PublicKey,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct FriendRequests {
    slots: Vec<Option<FriendRequest>>,
}

impl FriendRequests {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_FRIEND_REQUESTS).map(|_| None).collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Stores a request in the lowest free slot; `None` when full.
    pub fn add(&mut self, pk: PublicKey, message: String) -> Option<usize> {
        if self.slots.iter().flatten().any(|r| r.pk == pk) {
            return None;
        }
        let slot = self.slots.iter().position(Option::is_none)?;
        self.slots[slot] = Some(FriendRequest { pk, message });
        Some(slot)
    }

    pub fn get(&self, slot: usize) -> Option<&FriendRequest> {
        self.slots.get(slot)?.as_ref()
    }

    pub fn take(&mut self, slot: usize) -> Option<FriendRequest> {
        self.slots.get_mut(slot)?.take()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FriendRequest)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().map(|r| (i, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(names: &[(u32, &str, bool)]) -> FriendRegistry {
        let config = Config::default();
        let mut reg = FriendRegistry::new();
        for &(num, name, online) in names {
            let f = reg.add(FriendNumber(num), PublicKey([num as u8; 32]), &config);
            f.name = name.to_owned();
            if online {
                f.connection = Connection::Udp;
            }
        }
        reg.sort();
        reg
    }

    fn sorted_names(reg: &FriendRegistry) -> Vec<String> {
        (0..reg.num_active())
            .map(|pos| reg.by_index_pos(pos).unwrap().display_name().to_owned())
            .collect()
    }

    #[test]
    fn sort_puts_online_first_then_name_case_insensitive() {
        let reg = registry_with(&[
            (0, "zoe", false),
            (1, "Adam", false),
            (2, "carol", true),
            (3, "Bob", true),
        ]);
        assert_eq!(sorted_names(&reg), vec!["Bob", "carol", "Adam", "zoe"]);
    }

    #[test]
    fn max_idx_shrinks_on_tail_removal() {
        let mut reg = registry_with(&[(0, "a", false), (1, "b", false), (2, "c", false)]);
        assert_eq!(reg.max_idx(), 3);
        reg.remove(FriendNumber(2));
        assert_eq!(reg.max_idx(), 2);
        reg.remove(FriendNumber(0));
        // Hole in the middle does not shrink.
        assert_eq!(reg.max_idx(), 2);
        assert_eq!(reg.num_active(), 1);
    }

    #[test]
    fn key_prefix_collision() {
        let reg = registry_with(&[(7, "seven", false)]);
        let mut pk = [9u8; 32];
        pk[0] = 7;
        pk[1] = 7;
        pk[2] = 7;
        assert!(reg.key_prefix_collides(&PublicKey(pk)));
        pk[2] = 8;
        assert!(!reg.key_prefix_collides(&PublicKey(pk)));
    }

    #[test]
    fn blocklist_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocklist");
        let mut bl = BlockList::new();
        bl.add(BlockedFriend {
            pk: PublicKey([1; 32]),
            name: "mallory".into(),
            last_online: 1_700_000_000,
        });
        bl.add(BlockedFriend {
            pk: PublicKey([2; 32]),
            name: "eve".into(),
            last_online: 42,
        });
        bl.save(&path).unwrap();

        let loaded = BlockList::load(&path).unwrap();
        assert_eq!(loaded.num_blocked(), 2);
        let entries: Vec<_> = loaded.iter().cloned().collect();
        assert!(entries.contains(&BlockedFriend {
            pk: PublicKey([1; 32]),
            name: "mallory".into(),
            last_online: 1_700_000_000,
        }));
        assert!(entries.contains(&BlockedFriend {
            pk: PublicKey([2; 32]),
            name: "eve".into(),
            last_online: 42,
        }));

        // On-disk bytes use the fixed record size.
        assert_eq!(fs::metadata(&path).unwrap().len() as usize, 2 * BLOCK_RECORD_SIZE);
    }

    #[test]
    fn empty_blocklist_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocklist");
        let mut bl = BlockList::new();
        bl.add(BlockedFriend {
            pk: PublicKey([1; 32]),
            name: "x".into(),
            last_online: 0,
        });
        bl.save(&path).unwrap();
        assert!(path.exists());
        bl.remove_by_pk(&PublicKey([1; 32]));
        bl.save(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn blocklist_load_rejects_bad_size_and_name_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocklist");
        fs::write(&path, [0u8; BLOCK_RECORD_SIZE + 1]).unwrap();
        assert!(matches!(
            BlockList::load(&path),
            Err(BlockListError::BadSize(_))
        ));

        let mut record = [0u8; BLOCK_RECORD_SIZE];
        record[0] = 0xFF; // name length way over the cap
        record[1] = 0xFF;
        fs::write(&path, record).unwrap();
        assert!(matches!(
            BlockList::load(&path),
            Err(BlockListError::BadRecord)
        ));
    }

    #[test]
    fn request_slots_are_bounded() {
        let mut reqs = FriendRequests::new();
        for i in 0..MAX_FRIEND_REQUESTS {
            let mut pk = [0u8; 32];
            pk[0] = i as u8;
            pk[1] = 0xAA;
            assert!(reqs.add(PublicKey(pk), "hello".into()).is_some());
        }
        assert_eq!(reqs.add(PublicKey([0xBB; 32]), "full".into()), None);
        reqs.take(3);
        assert_eq!(reqs.add(PublicKey([0xBB; 32]), "fits".into()), Some(3));
    }
}
