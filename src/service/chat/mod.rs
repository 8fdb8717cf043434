pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{base::types::Void, runtime::Runtime};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the gateway boundary: event delivery in, messages out. Implementing
/// it allows different chat platforms to be used with the autoreply-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Messages authored by this ID are never answered.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// This sets up event listeners for the chat platform and hands every inbound message
    /// to the runtime. It returns when the listener shuts down.
    async fn start(&self, runtime: Runtime) -> Void;

    /// Send a message to a channel.
    async fn send_message(&self, channel_id: &str, text: &str) -> Void;

    /// Attach a longer document (e.g. a report) to a channel as a file named `filename`.
    async fn send_document(&self, channel_id: &str, title: &str, filename: &str, body: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
