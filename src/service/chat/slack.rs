//! Slack socket-mode gateway.
//!
//! Push message events are converted to [`InboundMessage`] and handed to the runtime;
//! outgoing text goes through `chat.postMessage` and documents through the external file upload flow.

use crate::{
    base::{
        config::Config,
        types::{Author, InboundMessage, Res, Void},
    },
    interaction,
    runtime::Runtime,
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tracing::{debug, info, instrument, warn};

use parking_lot::RwLock;
use std::{collections::HashMap, ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    runtime: Runtime,
    client: SlackChatClient,
}

/// Display names already resolved, keyed by user ID.
#[derive(Clone, Default)]
struct NameCache {
    names: Arc<RwLock<HashMap<String, String>>>,
}

impl NameCache {
    fn get(&self, user_id: &str) -> Option<String> {
        self.names.read().get(user_id).cloned()
    }

    fn insert(&self, user_id: &str, name: &str) {
        self.names.write().insert(user_id.to_string(), name.to_string());
    }
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    bot_user_id: String,
    client: Arc<FullClient>,
    names: NameCache,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
            names: NameCache::default(),
        })
    }

    /// Resolves the name shown for `user_id`, falling back to the raw ID.
    ///
    /// Successful lookups are cached for the life of the client; failures are retried.
    #[instrument(skip(self))]
    async fn display_name(&self, user_id: &str) -> String {
        if let Some(name) = self.names.get(user_id) {
            return name;
        }

        let session = self.client.open_session(&self.bot_token);
        let request = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));

        match session.users_info(&request).await {
            Ok(response) => {
                let user = response.user;
                let name = user
                    .profile
                    .and_then(|p| p.display_name.filter(|n| !n.is_empty()).or(p.real_name))
                    .filter(|n| !n.is_empty())
                    .or(user.name)
                    .unwrap_or_else(|| user_id.to_string());

                self.names.insert(user_id, &name);
                name
            }
            Err(err) => {
                warn!("Failed to resolve display name for `{}`: {}", user_id, err);
                user_id.to_string()
            }
        }
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self, runtime: Runtime) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState { runtime, client: self.clone() }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel_id: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message).with_link_names(true);

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn send_document(&self, channel_id: &str, title: &str, filename: &str, body: &str) -> Void {
        let session = self.client.open_session(&self.bot_token);

        // Reserve an upload slot, push the bytes, then share the file in the channel.

        let slot = session
            .get_upload_url_external(&SlackApiFilesGetUploadUrlExternalRequest::new(filename.to_string(), body.len()))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to reserve upload for `{}`: {}", filename, e))?;

        let upload = SlackApiFilesUploadViaUrlRequest::new(slot.upload_url, body.as_bytes().to_vec(), "text/markdown".to_string());
        session.files_upload_via_url(&upload).await.map_err(|e| anyhow::anyhow!("Failed to upload `{}`: {}", filename, e))?;

        let complete = SlackApiFilesCompleteUploadExternalRequest::new(vec![SlackApiFilesComplete::new(slot.file_id).with_title(title.to_string())])
            .with_channel_id(SlackChannelId(channel_id.to_string()));
        session
            .files_complete_upload_external(&complete)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to share `{}`: {}", filename, e))?;

        Ok(())
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(
        SlackMessageContent::new().with_text("Slash commands are not supported; post `!status`, `!reload`, etc. in the channel instead.".into()),
    ))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            debug!("Received message event ...");

            let Some(channel_id) = slack_message_event.origin.channel.as_ref().map(|c| c.0.clone()) else {
                warn!("Skipping message event without a channel.");
                return Ok(());
            };

            // Edits, joins and other subtypes are not fresh messages.
            if slack_message_event.subtype.is_some() {
                debug!("Skipping message event with a subtype.");
                return Ok(());
            }

            let text = slack_message_event.content.as_ref().and_then(|c| c.text.clone()).unwrap_or_default();
            let is_bot = slack_message_event.sender.bot_id.is_some();

            let Some(user_id) = slack_message_event.sender.user.as_ref().map(|u| u.0.clone()) else {
                debug!("Skipping message event without a user.");
                return Ok(());
            };

            // Skip the name lookup for messages the runtime will drop anyway.
            if is_bot || user_id == user_state.client.bot_user_id || !user_state.runtime.access.snapshot().is_permitted(&channel_id) {
                debug!("Skipping message event from a bot or an unpermitted channel.");
                return Ok(());
            }

            let display_name = user_state.client.display_name(&user_id).await;

            let message = InboundMessage {
                channel_id,
                author: Author {
                    id: user_id,
                    display_name,
                    is_bot,
                },
                text,
            };

            interaction::message::handle_message(message, user_state.runtime.clone());
        }
        _ => {
            debug!("Received unhandled push event.")
        }
    }

    Ok(())
}
