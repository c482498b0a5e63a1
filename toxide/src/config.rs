//! Configuration: a TOML file with named sections and per-contact
//! overrides keyed by `pk_<64hex>`. Unknown keys are ignored so old
//! binaries can read new files. Hot reload re-runs the same sequence
//! as startup: defaults, main sections, per-contact overrides,
//! blocked-words list.

use crossterm::event::{KeyCode, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::{fmt, fs};

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%H:%M";
pub const DEFAULT_LOG_TIMESTAMP_FORMAT: &str = "%Y/%m/%d [%H:%M:%S]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabColor {
    #[default]
    Default,
    White,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
}

impl fmt::Display for TabColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TabColor::Default => "default",
            TabColor::White => "white",
            TabColor::Red => "red",
            TabColor::Green => "green",
            TabColor::Yellow => "yellow",
            TabColor::Blue => "blue",
            TabColor::Magenta => "magenta",
            TabColor::Cyan => "cyan",
        };
        write!(f, "{}", s)
    }
}

impl TabColor {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "default" => Some(TabColor::Default),
            "white" => Some(TabColor::White),
            "red" => Some(TabColor::Red),
            "green" => Some(TabColor::Green),
            "yellow" => Some(TabColor::Yellow),
            "blue" => Some(TabColor::Blue),
            "magenta" => Some(TabColor::Magenta),
            "cyan" => Some(TabColor::Cyan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub timestamps: bool,
    pub time_24h: bool,
    pub timestamp_format: String,
    pub log_timestamp_format: String,
    pub alerts: bool,
    pub bell_on_message: bool,
    pub bell_on_filetrans: bool,
    pub bell_on_filetrans_accept: bool,
    pub bell_on_invite: bool,
    pub native_colors: bool,
    pub autolog: bool,
    pub history_size: usize,
    pub notification_timeout_ms: u64,
    pub show_typing_self: bool,
    pub show_typing_other: bool,
    pub show_welcome_msg: bool,
    pub show_connection_msg: bool,
    pub show_group_connection_msg: bool,
    pub autosave_freq_secs: u64,
    pub paste_mode: bool,
    pub line_join: String,
    pub line_quit: String,
    pub line_alert: String,
    pub line_normal: String,
    pub group_part_message: String,
    pub mplex_away: bool,
    pub mplex_away_note: String,
    pub color_bar_bg: TabColor,
    pub color_bar_fg: TabColor,
    pub color_bar_accent: TabColor,
    pub color_bar_notify: TabColor,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            timestamps: true,
            time_24h: true,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_owned(),
            log_timestamp_format: DEFAULT_LOG_TIMESTAMP_FORMAT.to_owned(),
            alerts: true,
            bell_on_message: false,
            bell_on_filetrans: false,
            bell_on_filetrans_accept: false,
            bell_on_invite: false,
            native_colors: false,
            autolog: false,
            history_size: crate::scrollback::DEFAULT_HISTORY_SIZE,
            notification_timeout_ms: 6000,
            show_typing_self: true,
            show_typing_other: true,
            show_welcome_msg: true,
            show_connection_msg: true,
            show_group_connection_msg: true,
            autosave_freq_secs: 600,
            paste_mode: false,
            line_join: "-->".to_owned(),
            line_quit: "<--".to_owned(),
            line_alert: "-!-".to_owned(),
            line_normal: "---".to_owned(),
            group_part_message: String::new(),
            mplex_away: false,
            mplex_away_note: "away".to_owned(),
            color_bar_bg: TabColor::Blue,
            color_bar_fg: TabColor::White,
            color_bar_accent: TabColor::Cyan,
            color_bar_notify: TabColor::Yellow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub next_tab: String,
    pub prev_tab: String,
    pub scroll_line_up: String,
    pub scroll_line_down: String,
    pub half_page_up: String,
    pub half_page_down: String,
    pub page_bottom: String,
    pub toggle_peerlist: String,
    pub toggle_pastemode: String,
    pub reload_config: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            next_tab: "ctrl+n".to_owned(),
            prev_tab: "ctrl+p".to_owned(),
            scroll_line_up: "ctrl+up".to_owned(),
            scroll_line_down: "ctrl+down".to_owned(),
            half_page_up: "page up".to_owned(),
            half_page_down: "page down".to_owned(),
            page_bottom: "ctrl+h".to_owned(),
            toggle_peerlist: "ctrl+b".to_owned(),
            toggle_pastemode: "ctrl+t".to_owned(),
            reload_config: "ctrl+r".to_owned(),
        }
    }
}

/// A parsed key binding. Binding strings look like `ctrl+x`, `tab`,
/// `page up`, `page down`, `f5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

pub fn parse_binding(s: &str) -> Option<Binding> {
    let s = s.trim().to_lowercase();
    let (mods, key) = match s.split_once('+') {
        Some((m, k)) => {
            let mods = match m.trim() {
                "ctrl" => KeyModifiers::CONTROL,
                "alt" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                _ => return None,
            };
            (mods, k.trim().to_owned())
        }
        None => (KeyModifiers::NONE, s),
    };

    let code = match key.as_str() {
        "tab" => KeyCode::Tab,
        "enter" => KeyCode::Enter,
        "space" => KeyCode::Char(' '),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "page up" | "pageup" => KeyCode::PageUp,
        "page down" | "pagedown" => KeyCode::PageDown,
        k if k.len() == 1 => KeyCode::Char(k.chars().next().unwrap()),
        k if k.starts_with('f') => {
            let n: u8 = k[1..].parse().ok()?;
            KeyCode::F(n)
        }
        _ => return None,
    };
    Some(Binding { code, mods })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PathsConfig {
    pub download_path: Option<String>,
    pub chatlogs_path: Option<String>,
    pub avatar_path: Option<String>,
    pub autorun_path: Option<String>,
    pub password_eval: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub input_device: usize,
    pub output_device: usize,
    pub vad_threshold: f32,
    pub channels_in: u8,
    pub channels_out: u8,
    pub push_to_talk: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: 0,
            output_device: 0,
            vad_threshold: 40.0,
            channels_in: 1,
            channels_out: 2,
            push_to_talk: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SoundsConfig {
    pub self_log_in: Option<String>,
    pub self_log_out: Option<String>,
    pub user_log_in: Option<String>,
    pub user_log_out: Option<String>,
    pub notif_message: Option<String>,
    pub transfer_pending: Option<String>,
    pub transfer_completed: Option<String>,
    pub call_incoming: Option<String>,
    pub call_outgoing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FriendOverrides {
    pub alias: Option<String>,
    pub autolog: Option<bool>,
    pub auto_accept_files: Option<bool>,
    pub show_connection_msg: Option<bool>,
    pub tab_color: Option<TabColor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChatOverrides {
    pub autolog: Option<bool>,
    pub tab_color: Option<TabColor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Declared before the sections: TOML wants plain values ahead of
    /// tables when the file is written back out.
    pub blocked_words: Vec<String>,
    pub ui: UiConfig,
    pub keys: KeysConfig,
    pub tox: PathsConfig,
    pub audio: AudioConfig,
    pub sounds: SoundsConfig,
    /// Keyed by `pk_<64 lowercase hex>`.
    pub friends: BTreeMap<String, FriendOverrides>,
    pub groupchats: BTreeMap<String, ChatOverrides>,
    pub conferences: BTreeMap<String, ChatOverrides>,
}

#[derive(Debug)]
pub enum ConfigError {
    Unreadable(io::Error),
    Invalid(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Unreadable(e) => write!(f, "config file unreadable: {}", e),
            ConfigError::Invalid(e) => write!(f, "config file invalid: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn pk_key(pk: &toxide_net::PublicKey) -> String {
        format!("pk_{}", hex::encode(pk.0))
    }

    pub fn friend_overrides(&self, pk: &toxide_net::PublicKey) -> Option<&FriendOverrides> {
        self.friends.get(&Self::pk_key(pk))
    }

    pub fn group_overrides(&self, chat_id: &toxide_net::ChatId) -> Option<&ChatOverrides> {
        self.groupchats.get(&format!("pk_{}", hex::encode(chat_id.0)))
    }

    pub fn conference_overrides(
        &self,
        id: &toxide_net::ConferenceId,
    ) -> Option<&ChatOverrides> {
        self.conferences.get(&format!("pk_{}", hex::encode(id.0)))
    }

    /// Case-insensitive blocked-word test against a whole line.
    pub fn matches_blocked_word(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.blocked_words
            .iter()
            .any(|w| !w.is_empty() && lower.contains(&w.to_lowercase()))
    }

    pub fn timestamp_format(&self) -> &str {
        if self.ui.timestamp_format.is_empty() {
            DEFAULT_TIMESTAMP_FORMAT
        } else {
            &self.ui.timestamp_format
        }
    }
}

/// Missing file yields defaults; a present-but-broken file is an
/// error so a typo never silently resets every setting.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let data = fs::read_to_string(path).map_err(ConfigError::Unreadable)?;
    toml::from_str(&data).map_err(ConfigError::Invalid)
}

pub fn save(path: &Path, config: &Config) -> io::Result<()> {
    let data = toml::to_string_pretty(config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toxide_net::PublicKey;

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toxide.toml");
        let mut cfg = Config::default();
        cfg.ui.history_size = 123;
        cfg.ui.autolog = true;
        cfg.blocked_words.push("secret".into());
        cfg.friends.insert(
            Config::pk_key(&PublicKey([0xAB; 32])),
            FriendOverrides {
                alias: Some("dave".into()),
                auto_accept_files: Some(true),
                ..Default::default()
            },
        );
        save(&path, &cfg).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_is_defaults_but_broken_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(&dir.path().join("none.toml")).unwrap(), Config::default());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[ui\nhistory_size = ").unwrap();
        assert!(load(&bad).is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toxide.toml");
        fs::write(
            &path,
            "[ui]\nhistory_size = 55\nfrom_the_future = \"yes\"\n\n[brand_new_section]\nx = 1\n",
        )
        .unwrap();
        let cfg = load(&path).unwrap();
        assert_eq!(cfg.ui.history_size, 55);
    }

    #[test]
    fn per_contact_overrides_are_found_by_key() {
        let pk = PublicKey([3; 32]);
        let mut cfg = Config::default();
        cfg.friends.insert(
            Config::pk_key(&pk),
            FriendOverrides {
                autolog: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(cfg.friend_overrides(&pk).unwrap().autolog, Some(true));
        assert!(cfg.friend_overrides(&PublicKey([4; 32])).is_none());
    }

    #[test]
    fn blocked_words_match_case_insensitively() {
        let mut cfg = Config::default();
        cfg.blocked_words.push("Secret".into());
        assert!(cfg.matches_blocked_word("the SECRET handshake"));
        assert!(!cfg.matches_blocked_word("nothing to see"));
    }

    #[test]
    fn binding_strings_parse() {
        assert_eq!(
            parse_binding("ctrl+x"),
            Some(Binding {
                code: KeyCode::Char('x'),
                mods: KeyModifiers::CONTROL
            })
        );
        assert_eq!(
            parse_binding("tab"),
            Some(Binding {
                code: KeyCode::Tab,
                mods: KeyModifiers::NONE
            })
        );
        assert_eq!(
            parse_binding("Page Up"),
            Some(Binding {
                code: KeyCode::PageUp,
                mods: KeyModifiers::NONE
            })
        );
        assert_eq!(
            parse_binding("f5"),
            Some(Binding {
                code: KeyCode::F(5),
                mods: KeyModifiers::NONE
            })
        );
        assert_eq!(parse_binding("hyper+q"), None);
    }
}
