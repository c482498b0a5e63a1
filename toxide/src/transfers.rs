//! Per-friend file transfer slots and the pending-send queue.
//!
//! A transfer occupies a fixed-index slot from allocation until it
//! goes inactive (slot cleared). File ids are stable across
//! disconnects; file numbers are per-session and are replaced when a
//! paused send restarts.

use crate::scrollback::LineId;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use toxide_net::{FileId, FileKind, FileNumber, FriendNumber, MAX_FILENAME_LENGTH};

pub const MAX_FILES: usize = 32;
pub const PENDING_QUEUE_CAPACITY: usize = 32;
pub const TRANSFER_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
/// Progress-bar lines are rewritten at most once per second.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    Started,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Send,
    Receive,
}

#[derive(Debug, Clone)]
pub struct FileTransfer {
    pub state: TransferState,
    pub direction: TransferDirection,
    pub kind: FileKind,
    pub file_id: FileId,
    pub file_number: FileNumber,
    pub friend: FriendNumber,
    pub slot: usize,
    pub name: String,
    /// Source path for sends, destination path for receives.
    pub path: PathBuf,
    pub size: u64,
    pub position: u64,
    /// Bytes moved since the last progress-line rewrite.
    pub bps: u64,
    pub last_progress: Instant,
    pub last_activity: Instant,
    pub line_id: Option<LineId>,
}

impl FileTransfer {
    pub fn is_idle_timed_out(&self, now: Instant) -> bool {
        self.state == TransferState::Started
            && now.duration_since(self.last_activity) > TRANSFER_IDLE_TIMEOUT
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAddError {
    EmptyPath,
    NameTooLong,
    QueueFull,
}

#[derive(Debug, Default)]
pub struct Transfers {
    send: Vec<Option<FileTransfer>>,
    recv: Vec<Option<FileTransfer>>,
    pub pending: VecDeque<PendingSend>,
}

impl Transfers {
    pub fn new() -> Self {
        Self {
            send: (0..MAX_FILES).map(|_| None).collect(),
            recv: (0..MAX_FILES).map(|_| None).collect(),
            pending: VecDeque::new(),
        }
    }

    fn slots(&self, direction: TransferDirection) -> &Vec<Option<FileTransfer>> {
        match direction {
            TransferDirection::Send => &self.send,
            TransferDirection::Receive => &self.recv,
        }
    }

    fn slots_mut(&mut self, direction: TransferDirection) -> &mut Vec<Option<FileTransfer>> {
        match direction {
            TransferDirection::Send => &mut self.send,
            TransferDirection::Receive => &mut self.recv,
        }
    }

    /// Lowest free slot index, if any.
    pub fn free_slot(&self, direction: TransferDirection) -> Option<usize> {
        self.slots(direction).iter().position(Option::is_none)
    }

    pub fn insert(&mut self, ft: FileTransfer) -> Option<usize> {
        let slot = ft.slot;
        let slots = self.slots_mut(ft.direction);
        if slot >= MAX_FILES || slots[slot].is_some() {
            return None;
        }
        slots[slot] = Some(ft);
        Some(slot)
    }

    pub fn get(&self, direction: TransferDirection, slot: usize) -> Option<&FileTransfer> {
        self.slots(direction).get(slot)?.as_ref()
    }

    pub fn get_mut(
        &mut self,
        direction: TransferDirection,
        slot: usize,
    ) -> Option<&mut FileTransfer> {
        self.slots_mut(direction).get_mut(slot)?.as_mut()
    }

    pub fn by_file_number(
        &mut self,
        direction: TransferDirection,
        file: FileNumber,
    ) -> Option<&mut FileTransfer> {
        self.slots_mut(direction)
            .iter_mut()
            .flatten()
            .find(|ft| ft.file_number == file)
    }

    /// Either-direction lookup by the stable id (I/O worker events).
    pub fn by_file_id(&mut self, file_id: FileId) -> Option<&mut FileTransfer> {
        self.send
            .iter_mut()
            .flatten()
            .chain(self.recv.iter_mut().flatten())
            .find(|ft| ft.file_id == file_id)
    }

    /// Resume lookup: a paused transfer with a matching stable id.
    pub fn paused_by_file_id(
        &mut self,
        direction: TransferDirection,
        file_id: FileId,
    ) -> Option<&mut FileTransfer> {
        self.slots_mut(direction)
            .iter_mut()
            .flatten()
            .find(|ft| ft.state == TransferState::Paused && ft.file_id == file_id)
    }

    /// Clears a slot, returning the transfer that occupied it.
    pub fn take(&mut self, direction: TransferDirection, slot: usize) -> Option<FileTransfer> {
        self.slots_mut(direction).get_mut(slot)?.take()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileTransfer> {
        self.send.iter().flatten().chain(self.recv.iter().flatten())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FileTransfer> {
        self.send
            .iter_mut()
            .flatten()
            .chain(self.recv.iter_mut().flatten())
    }

    /// Drains every live transfer (friend deleted, blocked, window
    /// closed). Caller emits the CANCEL controls.
    pub fn drain_all(&mut self) -> Vec<FileTransfer> {
        let mut out = Vec::new();
        for slot in self.send.iter_mut().chain(self.recv.iter_mut()) {
            if let Some(ft) = slot.take() {
                out.push(ft);
            }
        }
        self.pending.clear();
        out
    }

    /// Destination paths of live receive transfers, used to avoid
    /// handing two concurrent receives the same file name.
    pub fn receiving_paths(&self) -> Vec<PathBuf> {
        self.recv.iter().flatten().map(|ft| ft.path.clone()).collect()
    }

    pub fn pending_add(&mut self, path: &Path) -> Result<usize, PendingAddError> {
        if path.as_os_str().is_empty() {
            return Err(PendingAddError::EmptyPath);
        }
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        match name {
            None => return Err(PendingAddError::EmptyPath),
            Some(n) if n.len() > MAX_FILENAME_LENGTH => {
                return Err(PendingAddError::NameTooLong);
            }
            _ => {}
        }
        if self.pending.len() >= PENDING_QUEUE_CAPACITY {
            return Err(PendingAddError::QueueFull);
        }
        self.pending.push_back(PendingSend {
            path: path.to_path_buf(),
        });
        Ok(self.pending.len() - 1)
    }

    pub fn pending_remove(&mut self, index: usize) -> Option<PendingSend> {
        self.pending.remove(index)
    }

    /// Takes the whole pending queue for re-submission on reconnect.
    pub fn pending_drain(&mut self) -> Vec<PendingSend> {
        self.pending.drain(..).collect()
    }
}

/// Receiver-side filename validation: non-empty, no path separators,
/// not a dot-name, no leading space or hyphen.
pub fn filename_valid(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FILENAME_LENGTH {
        return false;
    }
    if name == "." || name == ".." {
        return false;
    }
    if name.contains('/') || name.contains('\0') {
        return false;
    }
    !(name.starts_with(' ') || name.starts_with('-'))
}

/// Picks a destination under `dir`, appending `(1)`, `(2)`, … up to
/// `(99)` to dodge both on-disk files and other live transfers.
pub fn collision_free_path(dir: &Path, name: &str, taken: &[PathBuf]) -> Option<PathBuf> {
    let base = dir.join(name);
    let occupied = |p: &PathBuf| p.exists() || taken.contains(p);
    if !occupied(&base) {
        return Some(base);
    }
    for n in 1..=99 {
        let candidate = dir.join(format!("{}({})", name, n));
        if !occupied(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(direction: TransferDirection, slot: usize, file: u32) -> FileTransfer {
        FileTransfer {
            state: TransferState::Pending,
            direction,
            kind: FileKind::Data,
            file_id: FileId([file as u8; 32]),
            file_number: FileNumber(file),
            friend: FriendNumber(0),
            slot,
            name: format!("file{}", file),
            path: PathBuf::from(format!("/tmp/file{}", file)),
            size: 100,
            position: 0,
            bps: 0,
            last_progress: Instant::now(),
            last_activity: Instant::now(),
            line_id: None,
        }
    }

    #[test]
    fn slots_allocate_lowest_first() {
        let mut t = Transfers::new();
        assert_eq!(t.free_slot(TransferDirection::Send), Some(0));
        t.insert(transfer(TransferDirection::Send, 0, 1));
        t.insert(transfer(TransferDirection::Send, 1, 2));
        assert_eq!(t.free_slot(TransferDirection::Send), Some(2));
        t.take(TransferDirection::Send, 0);
        assert_eq!(t.free_slot(TransferDirection::Send), Some(0));
    }

    #[test]
    fn resume_matches_paused_by_stable_id() {
        let mut t = Transfers::new();
        let mut ft = transfer(TransferDirection::Receive, 0, 7);
        ft.state = TransferState::Paused;
        t.insert(ft);
        assert!(t.paused_by_file_id(TransferDirection::Receive, FileId([7; 32])).is_some());
        assert!(t.paused_by_file_id(TransferDirection::Receive, FileId([8; 32])).is_none());
        // Started transfers are not resume candidates.
        t.get_mut(TransferDirection::Receive, 0).unwrap().state = TransferState::Started;
        assert!(t.paused_by_file_id(TransferDirection::Receive, FileId([7; 32])).is_none());
    }

    #[test]
    fn pending_queue_validates_and_bounds() {
        let mut t = Transfers::new();
        assert_eq!(t.pending_add(Path::new("")), Err(PendingAddError::EmptyPath));
        let long = "x".repeat(MAX_FILENAME_LENGTH + 1);
        assert_eq!(
            t.pending_add(&PathBuf::from("/tmp").join(long)),
            Err(PendingAddError::NameTooLong)
        );
        for i in 0..PENDING_QUEUE_CAPACITY {
            assert_eq!(t.pending_add(Path::new(&format!("/tmp/f{}", i))), Ok(i));
        }
        assert_eq!(
            t.pending_add(Path::new("/tmp/one-too-many")),
            Err(PendingAddError::QueueFull)
        );
    }

    #[test]
    fn filename_validation() {
        assert!(filename_valid("photo.png"));
        assert!(!filename_valid(""));
        assert!(!filename_valid("."));
        assert!(!filename_valid(".."));
        assert!(!filename_valid("a/b"));
        assert!(!filename_valid(" leading"));
        assert!(!filename_valid("-flag"));
        assert!(!filename_valid(&"x".repeat(MAX_FILENAME_LENGTH + 1)));
    }

    #[test]
    fn collision_suffixes_count_up_and_give_up_at_100() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("photo.png"), b"x").unwrap();

        // One on disk, one held by a live transfer.
        let taken = vec![dir.path().join("photo.png(1)")];
        let dest = collision_free_path(dir.path(), "photo.png", &taken).unwrap();
        assert_eq!(dest, dir.path().join("photo.png(2)"));

        let mut all: Vec<PathBuf> = (1..=99)
            .map(|n| dir.path().join(format!("photo.png({})", n)))
            .collect();
        all.push(dir.path().join("photo.png"));
        assert_eq!(collision_free_path(dir.path(), "photo.png", &all), None);
    }

    #[test]
    fn drain_all_clears_slots_and_pending() {
        let mut t = Transfers::new();
        t.insert(transfer(TransferDirection::Send, 0, 1));
        t.insert(transfer(TransferDirection::Receive, 0, 2));
        t.pending_add(Path::new("/tmp/q")).unwrap();
        let drained = t.drain_all();
        assert_eq!(drained.len(), 2);
        assert!(t.iter().next().is_none());
        assert!(t.pending.is_empty());
    }
}
