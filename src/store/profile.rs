//! Read-only lookup into the cached user profile file.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::base::error::EngineError;

/// A cached user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Any other recorded fields, in file order.
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

/// A profile together with the id it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileMatch {
    pub user_id: String,
    pub profile: Profile,
}

/// Profile cache backed by a JSON object of user id to profile.
///
/// The file is read on every lookup, so external updates are picked up without a reload.
#[derive(Debug, Clone)]
pub struct ProfileDirectory {
    path: PathBuf,
}

impl ProfileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every profile; a missing file means no profiles.
    pub fn load(&self) -> Result<IndexMap<String, Profile>, EngineError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(IndexMap::new()),
            Err(e) => return Err(EngineError::from_io(&self.path, e)),
        };

        serde_json::from_str(&text).map_err(|e| EngineError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Finds a profile by raw id, mention (`<@ID>` / `<@!ID>`), display name, or user name.
    pub fn lookup(&self, query: &str) -> Result<Option<ProfileMatch>, EngineError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let profiles = self.load()?;
        let id = mention_id(query).unwrap_or(query);

        if let Some((user_id, profile)) = profiles.get_key_value(id) {
            return Ok(Some(ProfileMatch {
                user_id: user_id.clone(),
                profile: profile.clone(),
            }));
        }

        let needle = query.trim_start_matches('@').to_lowercase();
        let found = profiles
            .iter()
            .find(|(_, p)| p.display_name.to_lowercase() == needle || p.name.as_deref().is_some_and(|n| n.to_lowercase() == needle));

        Ok(found.map(|(user_id, profile)| ProfileMatch {
            user_id: user_id.clone(),
            profile: profile.clone(),
        }))
    }
}

/// Extracts the id from a `<@ID>` or `<@!ID>` mention.
fn mention_id(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("<@")?.strip_suffix('>')?;
    let inner = inner.strip_prefix('!').unwrap_or(inner);
    // Slack mentions may carry a label: `<@U123|ann>`.
    let id = inner.split('|').next()?;

    (!id.is_empty()).then_some(id)
}
