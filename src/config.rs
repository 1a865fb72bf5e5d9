// SPDX-License-Identifier: MPL-2.0

use serde::Deserialize;
use std::path::PathBuf;

pub const APP_NAME: &str = "plaza";
pub const ROOM_TITLE: &str = "The Plaza";

/// Fixed avatar set offered at registration. Immutable after signup.
pub const AVATARS: &[&str] = &["🐱", "🐶", "🦊", "🦁", "🐸", "🐼", "🦄", "🐲"];

/// Shown in place of a sender avatar on rows that predate avatars.
pub const FALLBACK_AVATAR: &str = "👤";

pub const PIN_LEN: usize = 4;
pub const STATUS_MESSAGE_MAX: usize = 30;

pub const USERS_TABLE: &str = "chat_users";
pub const MESSAGES_TABLE: &str = "chatlog";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyzcompany.supabase.co`.
    pub url: String,
    /// Publishable (anon) API key.
    pub anon_key: String,
}

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

impl ConfigFile {
    /// Default config location (~/.config/plaza/config.toml).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_NAME);
            p.push("config.toml");
            p
        })
    }

    /// Load the file at `path`, or the default location when `path` is None.
    /// A missing file is not an error; a malformed one is.
    pub fn load(path: Option<&PathBuf>) -> Result<Self, String> {
        let path = match path {
            Some(p) => p.clone(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let raw = std::fs::read_to_string(&path)
            .map_err(|e| format!("reading {}: {e}", path.display()))?;
        toml::from_str(&raw).map_err(|e| format!("parsing {}: {e}", path.display()))
    }
}
