//! Trigger table and per-trigger shuffle pools.
//!
//! The table maps trigger phrases to reply templates in document order. Each trigger
//! owns a "deck" of template indices; a draw deals one card and a fresh shuffled deck
//! is dealt once the previous one runs out, so every template is used once per cycle.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexMap;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{base::error::EngineError, store::activity::MATCH_SEPARATOR};

/// Token replaced by the invoking user's display name.
pub const USER_NAME_PLACEHOLDER: &str = "[userName]";

/// A trigger value as written in the source document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponseSet {
    Single(String),
    Many(Vec<String>),
}

impl ResponseSet {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ResponseSet::Single(text) => vec![text],
            ResponseSet::Many(list) => list,
        }
    }
}

/// Immutable, insertion-ordered trigger table.
///
/// Every key is non-empty and every value holds at least one template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerTable {
    entries: IndexMap<String, Vec<String>>,
}

impl TriggerTable {
    /// Reads and parses the YAML document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::from_io(path, e))?;

        Self::parse(&text, path)
    }

    /// Parses a YAML mapping of trigger to a string or list of strings.
    ///
    /// Empty triggers and triggers without templates are dropped with a warning.
    pub fn parse(text: &str, origin: impl Into<PathBuf>) -> Result<Self, EngineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: Option<IndexMap<String, Option<ResponseSet>>> = serde_yaml::from_str(text).map_err(|e| EngineError::Parse {
            path: origin.into(),
            message: e.to_string(),
        })?;

        let mut entries = IndexMap::new();

        for (trigger, set) in raw.unwrap_or_default() {
            if trigger.is_empty() {
                warn!("Skipping empty trigger.");
                continue;
            }

            if trigger.contains(MATCH_SEPARATOR) {
                warn!("Skipping trigger `{}` containing `{}`.", trigger, MATCH_SEPARATOR);
                continue;
            }

            let responses = set.map(ResponseSet::into_vec).unwrap_or_default();
            if responses.is_empty() {
                warn!("Skipping trigger `{}` without responses.", trigger);
                continue;
            }

            entries.insert(trigger, responses);
        }

        Ok(Self { entries })
    }

    /// Builds a table from in-memory pairs, applying the same normalization as [`TriggerTable::parse`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into_iter().map(Into::into).collect::<Vec<String>>()))
            .filter(|(k, v)| !k.is_empty() && !k.contains(MATCH_SEPARATOR) && !v.is_empty())
            .collect();

        Self { entries }
    }

    /// First trigger, in table order, contained in `message`.
    pub fn first_match(&self, message: &str) -> Option<(&str, &[String])> {
        if message.is_empty() {
            return None;
        }

        self.entries.iter().find(|(trigger, _)| message.contains(trigger.as_str())).map(|(t, r)| (t.as_str(), r.as_slice()))
    }

    pub fn get(&self, trigger: &str) -> Option<&[String]> {
        self.entries.get(trigger).map(Vec::as_slice)
    }

    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of reply templates across all triggers.
    pub fn variation_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// The outcome of matching a message against the live table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub trigger: String,
    pub template: String,
}

/// A trigger's deck of not-yet-dealt template indices.
#[derive(Debug, Default)]
struct Pool {
    remaining: Vec<usize>,
    last: Option<usize>,
}

struct ResponseState {
    table: Arc<TriggerTable>,
    pools: HashMap<String, Pool>,
    rng: StdRng,
}

impl ResponseState {
    /// Deals one template index for `trigger` from the current table.
    fn deal(&mut self, trigger: &str) -> Result<String, EngineError> {
        let templates = self.table.get(trigger).ok_or_else(|| EngineError::InvariantViolation(format!("draw for unknown trigger `{trigger}`")))?;
        let count = templates.len();

        let pool = self.pools.entry(trigger.to_string()).or_default();

        if pool.remaining.is_empty() {
            pool.remaining = (0..count).collect();
            pool.remaining.shuffle(&mut self.rng);

            // Keep the cycle boundary from repeating the previous card. The displaced card
            // lands at a uniform position so the rest of the cycle stays uniform.
            if count > 1 && pool.remaining.last() == pool.last.as_ref() {
                let slot = self.rng.gen_range(0..count - 1);
                pool.remaining.swap(slot, count - 1);
            }

            debug!("Refilled pool for `{}` with {} responses.", trigger, count);
        }

        let index = pool
            .remaining
            .pop()
            .ok_or_else(|| EngineError::InvariantViolation(format!("trigger `{trigger}` has no responses")))?;
        pool.last = Some(index);

        templates
            .get(index)
            .cloned()
            .ok_or_else(|| EngineError::InvariantViolation(format!("pool for `{trigger}` references missing response {index}")))
    }
}

/// Live trigger table plus shuffle pools.
///
/// This is trivially cloneable; clones share the same state. Table and pools sit behind
/// one lock, so a replace and its pool reset are seen together.
#[derive(Clone)]
pub struct ResponseStore {
    inner: Arc<Mutex<ResponseState>>,
}

impl Default for ResponseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseStore {
    /// Creates an empty store with an entropy-seeded RNG.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates an empty store with the given RNG.
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResponseState {
                table: Arc::new(TriggerTable::default()),
                pools: HashMap::new(),
                rng,
            })),
        }
    }

    /// Swaps in `table` and drops every pool built from the old one.
    pub fn replace(&self, table: TriggerTable) {
        let mut state = self.inner.lock();
        state.table = Arc::new(table);
        state.pools.clear();
    }

    /// The currently active table.
    pub fn snapshot(&self) -> Arc<TriggerTable> {
        self.inner.lock().table.clone()
    }

    pub fn variation_count(&self) -> usize {
        self.inner.lock().table.variation_count()
    }

    /// Draws the next template for `trigger` from its pool.
    pub fn draw(&self, trigger: &str) -> Result<String, EngineError> {
        self.inner.lock().deal(trigger)
    }

    /// Finds the first trigger contained in `message` and draws a template for it.
    ///
    /// Matching and drawing happen under the same lock, so both observe one table.
    pub fn select(&self, message: &str) -> Result<Option<Selection>, EngineError> {
        let mut state = self.inner.lock();

        let Some((trigger, _)) = state.table.first_match(message) else {
            return Ok(None);
        };
        let trigger = trigger.to_string();

        let template = state.deal(&trigger)?;

        Ok(Some(Selection { trigger, template }))
    }
}

/// Replaces every placeholder occurrence in `template` with `display_name`.
pub fn render_template(template: &str, display_name: &str) -> String {
    template.replace(USER_NAME_PLACEHOLDER, display_name)
}
