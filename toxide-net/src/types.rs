use serde::{Deserialize, Serialize};
use std::fmt;

pub const PUBLIC_KEY_SIZE: usize = 32;
pub const SECRET_KEY_SIZE: usize = 32;
pub const ADDRESS_SIZE: usize = PUBLIC_KEY_SIZE + 4 + 2;

pub const MAX_NAME_LENGTH: usize = 128;
pub const MAX_STATUS_MESSAGE_LENGTH: usize = 1007;
pub const MAX_FRIEND_REQUEST_LENGTH: usize = 1016;
pub const MAX_MESSAGE_LENGTH: usize = 1372;

pub const FILE_ID_LENGTH: usize = 32;
pub const MAX_FILENAME_LENGTH: usize = 255;
pub const FILE_CHUNK_SIZE: usize = 1024;

pub const CONFERENCE_ID_SIZE: usize = 32;
pub const GROUP_CHAT_ID_SIZE: usize = 32;
pub const GROUP_MAX_TOPIC_LENGTH: usize = 512;
pub const GROUP_MAX_PART_LENGTH: usize = 128;
pub const GROUP_MAX_GROUP_NAME_LENGTH: usize = 48;
pub const GROUP_MAX_PASSWORD_SIZE: usize = 32;

macro_rules! impl_byte_array_type {
    ($name:ident, $size:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $size]);

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                let bytes =
                    hex::decode(&s).map_err(|_| serde::de::Error::custom("invalid hex string"))?;
                if bytes.len() != $size {
                    return Err(serde::de::Error::custom(format!(
                        "invalid length for {}: expected {}, got {}",
                        stringify!($name),
                        $size,
                        bytes.len()
                    )));
                }
                let mut arr = [0u8; $size];
                arr.copy_from_slice(&bytes);
                Ok($name(arr))
            }
        }

        impl $name {
            pub fn from_hex(s: &str) -> Option<Self> {
                let bytes = hex::decode(s).ok()?;
                if bytes.len() != $size {
                    return None;
                }
                let mut arr = [0u8; $size];
                arr.copy_from_slice(&bytes);
                Some($name(arr))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0).to_uppercase())
            }
        }
    };
}

macro_rules! impl_number_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_number_newtype!(FriendNumber);
impl_number_newtype!(ConferenceNumber);
impl_number_newtype!(ConferencePeerNumber);
impl_number_newtype!(GroupNumber);
impl_number_newtype!(GroupPeerId);
impl_number_newtype!(FileNumber);
impl_number_newtype!(ReceiptId);

impl_byte_array_type!(PublicKey, PUBLIC_KEY_SIZE);
impl_byte_array_type!(SecretKey, SECRET_KEY_SIZE);
impl_byte_array_type!(Address, ADDRESS_SIZE);
impl_byte_array_type!(FileId, FILE_ID_LENGTH);
impl_byte_array_type!(ConferenceId, CONFERENCE_ID_SIZE);
impl_byte_array_type!(ChatId, GROUP_CHAT_ID_SIZE);

impl Address {
    /// An address is the public key, a 4-byte nospam and a 2-byte xor
    /// checksum over the preceding 36 bytes.
    pub fn from_public_key(pk: PublicKey, nospam: u32) -> Self {
        let mut arr = [0u8; ADDRESS_SIZE];
        arr[0..PUBLIC_KEY_SIZE].copy_from_slice(&pk.0);
        arr[PUBLIC_KEY_SIZE..PUBLIC_KEY_SIZE + 4].copy_from_slice(&nospam.to_be_bytes());

        let mut checksum = [0u8; 2];
        for i in (0..PUBLIC_KEY_SIZE + 4).step_by(2) {
            checksum[0] ^= arr[i];
            checksum[1] ^= arr[i + 1];
        }
        arr[ADDRESS_SIZE - 2] = checksum[0];
        arr[ADDRESS_SIZE - 1] = checksum[1];
        Address(arr)
    }

    pub fn public_key(&self) -> PublicKey {
        let mut pk = [0u8; PUBLIC_KEY_SIZE];
        pk.copy_from_slice(&self.0[0..PUBLIC_KEY_SIZE]);
        PublicKey(pk)
    }

    pub fn nospam(&self) -> u32 {
        u32::from_be_bytes(self.0[PUBLIC_KEY_SIZE..PUBLIC_KEY_SIZE + 4].try_into().unwrap())
    }

    pub fn checksum_valid(&self) -> bool {
        let expected = Self::from_public_key(self.public_key(), self.nospam());
        expected.0[ADDRESS_SIZE - 2..] == self.0[ADDRESS_SIZE - 2..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Connection {
    #[default]
    None,
    Tcp,
    Udp,
}

impl Connection {
    pub fn is_online(self) -> bool {
        self != Connection::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserStatus {
    #[default]
    Online,
    Away,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Normal,
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileControl {
    Resume,
    Pause,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Data,
    Avatar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConferenceType {
    Text,
    Av,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupRole {
    Founder,
    Moderator,
    User,
    Observer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupModEvent {
    Kick,
    Observer,
    User,
    Moderator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupPrivacy {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupTopicLock {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupVoiceState {
    All,
    Moderator,
    Founder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupJoinFail {
    PeerLimit,
    InvalidPassword,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_checksum_round_trip() {
        let pk = PublicKey([0xAB; PUBLIC_KEY_SIZE]);
        let addr = Address::from_public_key(pk, 0xDEAD_BEEF);
        assert!(addr.checksum_valid());
        assert_eq!(addr.public_key(), pk);
        assert_eq!(addr.nospam(), 0xDEAD_BEEF);
    }

    #[test]
    fn address_checksum_detects_corruption() {
        let addr = Address::from_public_key(PublicKey([7; PUBLIC_KEY_SIZE]), 42);
        let mut bad = addr.0;
        bad[0] ^= 0xFF;
        assert!(!Address(bad).checksum_valid());
    }

    #[test]
    fn hex_parsing_rejects_wrong_length() {
        assert!(PublicKey::from_hex("abcd").is_none());
        let full = "00".repeat(PUBLIC_KEY_SIZE);
        assert!(PublicKey::from_hex(&full).is_some());
    }
}
