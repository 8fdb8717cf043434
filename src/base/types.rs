use std::fmt;

use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// The author of an inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Platform identifier of the user.
    pub id: String,
    /// Name shown in the channel; substituted into reply templates.
    pub display_name: String,
    /// Whether the platform flags the author as a bot.
    #[serde(default)]
    pub is_bot: bool,
}

impl Author {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_bot: false,
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// A chat message as handed over by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel_id: String,
    pub author: Author,
    pub text: String,
}

/// A reply produced by the match engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEvent {
    /// Final reply text, placeholders already substituted.
    pub text: String,
    /// The trigger phrase that produced the reply.
    pub trigger: String,
}

/// How the runtime stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The chat listener returned on its own (e.g. Ctrl-C).
    Stopped,
    /// An administrator asked for a restart; the supervisor should start a new process.
    Restart,
}
