//! Per-conversation plain-text logs. One event per line:
//! `[<timestamp>] <hint>: <name>: <message>`. Files are created
//! lazily on first write, renamed (best effort) when a nick changes,
//! and flushed at most once every two seconds.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const FLUSH_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogHint {
    Message,
    Action,
    Connect,
    Disconnect,
    NameChange,
    Topic,
}

impl LogHint {
    fn as_str(self) -> &'static str {
        match self {
            LogHint::Message => "msg",
            LogHint::Action => "action",
            LogHint::Connect => "connect",
            LogHint::Disconnect => "disconnect",
            LogHint::NameChange => "name",
            LogHint::Topic => "topic",
        }
    }
}

fn sanitize(nick: &str) -> String {
    let cleaned: String = nick
        .chars()
        .map(|c| if c == '/' || c.is_whitespace() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_owned()
    } else {
        cleaned
    }
}

/// Log filename derived from the nick, the own key and the peer (or
/// chat) key, so history stays attached to the contact across
/// renames of either side's display name.
pub fn log_path(chatlogs_dir: &Path, nick: &str, self_key_hex: &str, other_key_hex: &str) -> PathBuf {
    let self_frag = &self_key_hex[..self_key_hex.len().min(6)];
    let other_frag = &other_key_hex[..other_key_hex.len().min(12)];
    chatlogs_dir.join(format!("{}-{}-{}.log", sanitize(nick), self_frag, other_frag))
}

pub fn format_entry(timestamp: &str, hint: LogHint, name: &str, message: &str) -> String {
    format!("[{}] {}: {}: {}", timestamp, hint.as_str(), name, message)
}

/// Owned by the I/O worker; keeps open handles and rate-limits
/// flushes.
#[derive(Debug, Default)]
pub struct Logger {
    files: HashMap<PathBuf, (File, Instant)>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, path: &Path, entry: &str) {
        if !self.files.contains_key(path) {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => {
                    self.files.insert(path.to_path_buf(), (f, Instant::now()));
                }
                Err(_) => return,
            }
        }
        if let Some((file, last_flush)) = self.files.get_mut(path) {
            let _ = writeln!(file, "{}", entry);
            if last_flush.elapsed() >= FLUSH_INTERVAL {
                let _ = file.flush();
                *last_flush = Instant::now();
            }
        }
    }

    /// Best effort: a failed rename keeps logging to the old path.
    pub fn rename(&mut self, from: &Path, to: &Path) {
        self.files.remove(from);
        if from.exists() {
            let _ = fs::rename(from, to);
        }
    }

    pub fn close_all(&mut self) {
        for (file, _) in self.files.values_mut() {
            let _ = file.flush();
        }
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_format() {
        assert_eq!(
            format_entry("2024/06/01 [12:00:00]", LogHint::Message, "alice", "hi there"),
            "[2024/06/01 [12:00:00]] msg: alice: hi there"
        );
        assert_eq!(
            format_entry("t", LogHint::Connect, "bob", "has come online"),
            "[t] connect: bob: has come online"
        );
    }

    #[test]
    fn path_is_stable_and_sanitized() {
        let dir = PathBuf::from("/logs");
        let p = log_path(&dir, "my friend", "aabbccddee", "112233445566778899");
        assert_eq!(p, dir.join("my_friend-aabbcc-112233445566.log"));
    }

    #[test]
    fn append_creates_lazily_and_rename_moves_history() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("logs/alice-aaa-bbb.log");
        let mut logger = Logger::new();
        assert!(!old.exists());
        logger.append(&old, "[t] msg: alice: one");
        logger.append(&old, "[t] msg: alice: two");
        logger.close_all();
        assert!(old.exists());

        let new = dir.path().join("logs/alicia-aaa-bbb.log");
        logger.rename(&old, &new);
        assert!(!old.exists());
        let content = fs::read_to_string(&new).unwrap();
        assert_eq!(content.lines().count(), 2);

        logger.append(&new, "[t] msg: alicia: three");
        logger.close_all();
        let content = fs::read_to_string(&new).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
