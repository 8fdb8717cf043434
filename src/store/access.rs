//! Access-control and routing configuration.

use std::{
    borrow::Borrow,
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::Deserialize;
use serde_with::{OneOrMany, serde_as};

use crate::base::error::EngineError;

fn default_reaction_trigger() -> String {
    "⭐".to_string()
}

fn default_min_reaction_count() -> u32 {
    1
}

/// A channel or user identifier.
///
/// Source documents may write identifiers as JSON strings or integers; both normalize to text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "RawIdentifier")]
pub struct Identifier(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

impl From<RawIdentifier> for Identifier {
    fn from(raw: RawIdentifier) -> Self {
        match raw {
            RawIdentifier::Unsigned(n) => Identifier(n.to_string()),
            RawIdentifier::Signed(n) => Identifier(n.to_string()),
            RawIdentifier::Text(s) => Identifier(s),
        }
    }
}

impl Identifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access and routing settings, as read from the JSON config source.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Channels whose messages are handled. Empty means none.
    #[serde(default)]
    pub allowed_channels: HashSet<Identifier>,
    /// Administrators allowed to run privileged commands.
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    pub admin_user_id: Vec<Identifier>,
    /// Receives a notice for every automated reply.
    #[serde(default)]
    pub log_channel_id: Option<Identifier>,
    /// Receives startup and reload notices.
    #[serde(default)]
    pub system_log_channel_id: Option<Identifier>,
    #[serde(default)]
    pub intro_channel_id: Option<Identifier>,
    #[serde(default)]
    pub netatwi_channel_id: Option<Identifier>,
    #[serde(default = "default_reaction_trigger")]
    pub reaction_trigger: String,
    #[serde(default = "default_min_reaction_count")]
    pub min_reaction_count: u32,
    /// Commands that only administrators may run. `restart` is always restricted.
    #[serde(default)]
    pub admin_only_commands: HashSet<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            allowed_channels: HashSet::new(),
            admin_user_id: Vec::new(),
            log_channel_id: None,
            system_log_channel_id: None,
            intro_channel_id: None,
            netatwi_channel_id: None,
            reaction_trigger: default_reaction_trigger(),
            min_reaction_count: default_min_reaction_count(),
            admin_only_commands: HashSet::new(),
        }
    }
}

impl AccessConfig {
    /// Reads and parses the JSON document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::from_io(path, e))?;

        Self::parse(&text, path)
    }

    pub fn parse(text: &str, origin: impl Into<PathBuf>) -> Result<Self, EngineError> {
        serde_json::from_str(text).map_err(|e| EngineError::Parse {
            path: origin.into(),
            message: e.to_string(),
        })
    }

    pub fn is_permitted(&self, channel_id: &str) -> bool {
        self.allowed_channels.contains(channel_id)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user_id.iter().any(|id| id.as_str() == user_id)
    }

    /// Whether `command` needs an administrator under this configuration.
    pub fn requires_admin(&self, command: &str) -> bool {
        command == "restart" || self.admin_only_commands.contains(command)
    }
}

/// Live access configuration with atomic replacement.
///
/// This is trivially cloneable; clones share the same state.
#[derive(Clone, Default)]
pub struct AccessStore {
    inner: Arc<RwLock<Arc<AccessConfig>>>,
}

impl AccessStore {
    pub fn new(config: AccessConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Swaps in `config` as a whole.
    pub fn replace(&self, config: AccessConfig) {
        *self.inner.write() = Arc::new(config);
    }

    /// The currently active configuration.
    pub fn snapshot(&self) -> Arc<AccessConfig> {
        self.inner.read().clone()
    }

    pub fn permitted_channels(&self) -> HashSet<Identifier> {
        self.snapshot().allowed_channels.clone()
    }

    pub fn admins(&self) -> Vec<Identifier> {
        self.snapshot().admin_user_id.clone()
    }

    pub fn log_channel(&self) -> Option<Identifier> {
        self.snapshot().log_channel_id.clone()
    }

    pub fn system_log_channel(&self) -> Option<Identifier> {
        self.snapshot().system_log_channel_id.clone()
    }

    pub fn intro_channel(&self) -> Option<Identifier> {
        self.snapshot().intro_channel_id.clone()
    }

    pub fn netatwi_channel(&self) -> Option<Identifier> {
        self.snapshot().netatwi_channel_id.clone()
    }
}
