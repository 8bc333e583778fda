//! Configuration surface of the collections client.
//!
//! Both camelCase and snake_case keys are accepted so the same structure can be
//! read from a JSON project file or a TOML config file.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_LOCAL_PATH;

/// Where collection reads are served from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientMode {
    /// Remote service only.
    #[default]
    Online,
    /// Local snapshot only; never touches the network.
    Local,
    /// Remote first, local snapshot on failure or timeout.
    WithFallback,
}

impl ClientMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientMode::Online => "online",
            ClientMode::Local => "local",
            ClientMode::WithFallback => "with-fallback",
        }
    }
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(ClientMode::Online),
            "local" => Ok(ClientMode::Local),
            "with-fallback" | "withFallback" | "with_fallback" => Ok(ClientMode::WithFallback),
            other => Err(format!(
                "unknown client mode '{}' (expected online, local or with-fallback)",
                other
            )),
        }
    }
}

/// Local snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Snapshot directory; relative paths resolve against the working directory.
    #[serde(default = "default_local_path")]
    pub path: PathBuf,

    /// Remote timeout in `with-fallback` mode. No timeout when unset.
    #[serde(default, alias = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

fn default_local_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOCAL_PATH)
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            path: default_local_path(),
            timeout_ms: None,
        }
    }
}

impl LocalStorageConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Collections client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionsConfig {
    #[serde(default, alias = "clientMode")]
    pub client_mode: ClientMode,

    #[serde(default, alias = "localStorage")]
    pub local_storage: LocalStorageConfig,

    /// Plugins requested when a call names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<String>>,

    /// Preview key sent when a call names none.
    #[serde(default, alias = "previewKey", skip_serializing_if = "Option::is_none")]
    pub preview_key: Option<String>,
}

impl CollectionsConfig {
    pub fn new(client_mode: ClientMode) -> Self {
        Self {
            client_mode,
            ..Self::default()
        }
    }

    pub fn local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_storage.path = path.into();
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.local_storage.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn plugins<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins = Some(plugins.into_iter().map(Into::into).collect());
        self
    }

    pub fn preview_key(mut self, preview_key: impl Into<String>) -> Self {
        self.preview_key = Some(preview_key.into());
        self
    }
}
