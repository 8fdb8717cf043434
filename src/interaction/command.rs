//! Administrative commands posted as prefixed chat messages.

use std::fmt::Write;

use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        error::EngineError,
        types::{InboundMessage, Res, Void},
    },
    engine::report,
    runtime::Runtime,
    store::{activity::ActivityEvent, profile::ProfileMatch},
};

/// A recognized administrative command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reload,
    Status,
    DetailedReport,
    LogReset,
    Restart,
    UserInfo(String),
}

impl Command {
    /// Parses `text` as `<prefix><name> [args]`; anything else is not a command.
    pub fn parse(prefix: &str, text: &str) -> Option<Self> {
        let body = text.trim().strip_prefix(prefix)?;
        let (name, args) = body.split_once(char::is_whitespace).map(|(n, a)| (n, a.trim())).unwrap_or((body, ""));

        match (name, args) {
            ("reload", "") => Some(Command::Reload),
            ("status", "") => Some(Command::Status),
            ("report" | "monthly-report" | "detailed-report", "") => Some(Command::DetailedReport),
            ("log-reset", "") => Some(Command::LogReset),
            ("restart", "") => Some(Command::Restart),
            ("user-info" | "userinfo", query) => Some(Command::UserInfo(query.to_string())),
            _ => None,
        }
    }

    /// Canonical name, as used in the activity log and in `admin_only_commands`.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Reload => "reload",
            Command::Status => "status",
            Command::DetailedReport => "detailed-report",
            Command::LogReset => "log-reset",
            Command::Restart => "restart",
            Command::UserInfo(_) => "user-info",
        }
    }
}

/// Authorizes and runs `command`, replying in the message's channel.
///
/// Failures are logged in full and answered with a short readable message.
#[instrument(skip_all, fields(command = command.name()))]
pub async fn execute(command: Command, message: &InboundMessage, runtime: &Runtime) -> Void {
    let channel_id = &message.channel_id;
    let identity = message.author.to_string();

    // Authorization first.

    if let Err(err) = authorize(&command, message, runtime) {
        warn!("{}", err);
        runtime.activity.warning(format!("Denied: {} by {}", command.name(), identity))?;
        runtime.chat.send_message(channel_id, &format!("⛔ {}", err.user_message())).await?;
        return Ok(());
    }

    // Run the command.

    match run(&command, message, runtime).await {
        Ok(()) => {
            info!("Command `{}` executed by {}", command.name(), identity);

            // Reset writes its own marker; restart records itself before the process exits.
            if !matches!(command, Command::LogReset | Command::Restart) {
                runtime.activity.info(ActivityEvent::Command { name: command.name(), by: &identity })?;
            }

            Ok(())
        }
        Err(err) => {
            error!("Command `{}` failed: {:#}", command.name(), err);
            let _ = runtime.activity.error(format!("Command {} failed: {:#}", command.name(), err));
            runtime.chat.send_message(channel_id, &format!("❌ `{}` failed; see the activity log for details.", command.name())).await
        }
    }
}

/// Checks whether the author may run `command` under the live access configuration.
pub fn authorize(command: &Command, message: &InboundMessage, runtime: &Runtime) -> Result<(), EngineError> {
    let access = runtime.access.snapshot();

    if access.requires_admin(command.name()) && !access.is_admin(&message.author.id) {
        return Err(EngineError::AuthorizationDenied {
            command: command.name().to_string(),
            user: message.author.to_string(),
        });
    }

    Ok(())
}

async fn run(command: &Command, message: &InboundMessage, runtime: &Runtime) -> Void {
    let channel_id = &message.channel_id;

    match command {
        Command::Reload => {
            let outcome = runtime.reloader.reload();
            let text = report::reload_message(&outcome);

            runtime.chat.send_message(channel_id, &text).await?;

            if let Some(system_channel) = runtime.access.system_log_channel()
                && system_channel.as_str() != channel_id.as_str()
            {
                let notice = format!("{text}\n_Requested by {}_", message.author);
                if let Err(err) = runtime.chat.send_message(system_channel.as_str(), &notice).await {
                    warn!("Failed to post reload notice: {}", err);
                }
            }
        }
        Command::Status => {
            let stats = runtime.analytics.summarize(runtime.config.status_window_days)?;
            let recent = runtime.activity.tail(runtime.config.status_tail_lines)?;

            runtime.chat.send_message(channel_id, &report::status_message(&stats, &recent)).await?;
        }
        Command::DetailedReport => {
            let document = runtime.analytics.render_detailed_report(runtime.config.report_window_days)?;

            runtime.chat.send_document(channel_id, &document.title, &document.filename, &document.body).await?;
            runtime.chat.send_message(channel_id, &document.summary).await?;
        }
        Command::LogReset => {
            runtime.activity.reset(&message.author.to_string())?;

            runtime.chat.send_message(channel_id, "🧹 Activity log reset.").await?;
        }
        Command::Restart => {
            warn!("Restart requested by {}", message.author);
            runtime.activity.info(ActivityEvent::Command {
                name: command.name(),
                by: &message.author.to_string(),
            })?;
            runtime.chat.send_message(channel_id, "♻️ Restarting ...").await?;
            runtime.request_restart();
        }
        Command::UserInfo(query) => {
            let text = match runtime.profiles.lookup(query)? {
                Some(found) => render_profile(&found),
                None if query.is_empty() => "Usage: `user-info <name | id | mention>`".to_string(),
                None => format!("No profile found for `{query}`."),
            };

            runtime.chat.send_message(channel_id, &text).await?;
        }
    }

    Ok(())
}

/// Renders a profile as a short field list.
pub fn render_profile(found: &ProfileMatch) -> String {
    let profile = &found.profile;

    let mut out = format!("*👤 {}* (`{}`)", profile.display_name, found.user_id);
    if let Some(name) = &profile.name {
        let _ = write!(out, "\n*Name:* {name}");
    }
    for (key, value) in &profile.fields {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let _ = write!(out, "\n*{key}:* {value}");
    }

    out
}

/// Parses and runs `message` if it is a command; returns whether it was one.
pub async fn try_execute(message: &InboundMessage, runtime: &Runtime) -> Res<bool> {
    let Some(command) = Command::parse(&runtime.config.command_prefix, &message.text) else {
        return Ok(false);
    };

    execute(command, message, runtime).await?;

    Ok(true)
}
