//! Load process settings via `config` crate with env-override support.
//!
//! These settings are read once at startup. The hot-reloadable access configuration
//! (permitted channels, administrators) lives in [`crate::store::access`].

use std::{ops::Deref, path::PathBuf, sync::Arc};

use serde::Deserialize;

use super::types::Res;

/// Largest analytics window accepted anywhere in the bot.
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Default trigger table location.
fn default_responses_path() -> PathBuf {
    PathBuf::from("responses.yml")
}

/// Default access configuration location.
fn default_access_config_path() -> PathBuf {
    PathBuf::from("config.json")
}

/// Default activity record location.
fn default_activity_log_path() -> PathBuf {
    PathBuf::from("bot_activity.log")
}

/// Default profile cache location.
fn default_profiles_path() -> PathBuf {
    PathBuf::from("profiles.json")
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_status_window_days() -> u32 {
    7
}

fn default_report_window_days() -> u32 {
    30
}

fn default_status_tail_lines() -> usize {
    15
}

/// Configuration for the autoreply-bot process.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Slack app token used for socket mode (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Trigger table, YAML (`RESPONSES_PATH`).
    #[serde(default = "default_responses_path")]
    pub responses_path: PathBuf,
    /// Access configuration, JSON (`ACCESS_CONFIG_PATH`).
    #[serde(default = "default_access_config_path")]
    pub access_config_path: PathBuf,
    /// Append-only activity record (`ACTIVITY_LOG_PATH`).
    #[serde(default = "default_activity_log_path")]
    pub activity_log_path: PathBuf,
    /// Cached user profiles, JSON (`PROFILES_PATH`).
    #[serde(default = "default_profiles_path")]
    pub profiles_path: PathBuf,
    /// Prefix that marks a message as an administrative command (`COMMAND_PREFIX`).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Trailing days summarized by `status` (`STATUS_WINDOW_DAYS`).
    #[serde(default = "default_status_window_days")]
    pub status_window_days: u32,
    /// Trailing days covered by the detailed report (`REPORT_WINDOW_DAYS`).
    #[serde(default = "default_report_window_days")]
    pub report_window_days: u32,
    /// Number of recent activity lines quoted by `status` (`STATUS_TAIL_LINES`).
    #[serde(default = "default_status_tail_lines")]
    pub status_tail_lines: usize,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            slack_app_token: String::new(),
            slack_bot_token: String::new(),
            responses_path: default_responses_path(),
            access_config_path: default_access_config_path(),
            activity_log_path: default_activity_log_path(),
            profiles_path: default_profiles_path(),
            command_prefix: default_command_prefix(),
            status_window_days: default_status_window_days(),
            report_window_days: default_report_window_days(),
            status_tail_lines: default_status_tail_lines(),
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder();

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        // Later sources win, so the environment overlays the file.
        cfg = cfg.add_source(config::Environment::default().prefix("AUTOREPLY_BOT"));

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Res<()> {
        if self.slack_app_token.is_empty() || self.slack_bot_token.is_empty() {
            return Err(anyhow::anyhow!("Slack app and bot tokens must be set."));
        }

        if self.command_prefix.trim().is_empty() {
            return Err(anyhow::anyhow!("Command prefix must not be empty."));
        }

        if !(1..=MAX_WINDOW_DAYS).contains(&self.status_window_days) {
            return Err(anyhow::anyhow!("Status window must be between 1 and {MAX_WINDOW_DAYS} days."));
        }

        if !(1..=MAX_WINDOW_DAYS).contains(&self.report_window_days) {
            return Err(anyhow::anyhow!("Report window must be between 1 and {MAX_WINDOW_DAYS} days."));
        }

        Ok(())
    }
}
