//! The self avatar: a PNG on disk, broadcast to friends as they come
//! online. The file is never loaded whole; chunk pumps read from the
//! path on demand like any other send.

use std::fs;
use std::path::{Path, PathBuf};

pub const MAX_AVATAR_SIZE: u64 = 64 * 1024;
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarError {
    Unreadable,
    Empty,
    TooLarge,
    NotPng,
}

impl std::fmt::Display for AvatarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvatarError::Unreadable => write!(f, "avatar file could not be read"),
            AvatarError::Empty => write!(f, "avatar file is empty"),
            AvatarError::TooLarge => write!(f, "avatar must be at most 64 KiB"),
            AvatarError::NotPng => write!(f, "avatar must be a PNG image"),
        }
    }
}

impl Avatar {
    /// Validates size and PNG magic, then records name/path/size.
    pub fn set(path: &Path) -> Result<Avatar, AvatarError> {
        let meta = fs::metadata(path).map_err(|_| AvatarError::Unreadable)?;
        let size = meta.len();
        if size == 0 {
            return Err(AvatarError::Empty);
        }
        if size > MAX_AVATAR_SIZE {
            return Err(AvatarError::TooLarge);
        }
        let data = fs::read(path).map_err(|_| AvatarError::Unreadable)?;
        if data.len() < PNG_MAGIC.len() || data[..PNG_MAGIC.len()] != PNG_MAGIC {
            return Err(AvatarError::NotPng);
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Avatar {
            name,
            path: path.to_path_buf(),
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(payload_len: usize) -> Vec<u8> {
        let mut v = PNG_MAGIC.to_vec();
        v.extend(std::iter::repeat_n(0u8, payload_len));
        v
    }

    #[test]
    fn accepts_png_at_exactly_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, png_bytes(MAX_AVATAR_SIZE as usize - PNG_MAGIC.len())).unwrap();
        let avatar = Avatar::set(&path).unwrap();
        assert_eq!(avatar.size, MAX_AVATAR_SIZE);
        assert_eq!(avatar.name, "a.png");
    }

    #[test]
    fn rejects_one_byte_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, png_bytes(MAX_AVATAR_SIZE as usize - PNG_MAGIC.len() + 1)).unwrap();
        assert_eq!(Avatar::set(&path), Err(AvatarError::TooLarge));
    }

    #[test]
    fn rejects_non_png_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let jpeg = dir.path().join("a.jpg");
        fs::write(&jpeg, [0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4]).unwrap();
        assert_eq!(Avatar::set(&jpeg), Err(AvatarError::NotPng));

        let empty = dir.path().join("e.png");
        fs::write(&empty, b"").unwrap();
        assert_eq!(Avatar::set(&empty), Err(AvatarError::Empty));
    }
}
