//! Runtime services and shared state for the autoreply-bot.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Shutdown},
    },
    engine::{analytics::AnalyticsEngine, matcher::MatchEngine, reload::ReloadCoordinator},
    service::chat::ChatClient,
    store::{access::AccessStore, activity::ActivityLog, profile::ProfileDirectory, responses::ResponseStore},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the stores, the engines built over them, the chat client, and
/// configuration. It is designed to be trivially cloneable, allowing it to be passed
/// around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// Trigger table and shuffle pools.
    pub responses: ResponseStore,
    /// Access and routing configuration.
    pub access: AccessStore,
    /// The activity record.
    pub activity: ActivityLog,
    /// Cached user profiles.
    pub profiles: ProfileDirectory,
    pub matcher: MatchEngine,
    pub reloader: ReloadCoordinator,
    pub analytics: AnalyticsEngine,
    /// The chat client instance.
    pub chat: ChatClient,
    restart: Arc<Notify>,
}

impl Runtime {
    /// Create a new runtime instance connected to Slack.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the chat client.
        let chat = ChatClient::slack(&config).await?;

        Self::with_chat(config, chat)
    }

    /// Create a runtime over an existing chat client and load state from the backing files.
    ///
    /// Load failures are logged; the affected store starts empty.
    pub fn with_chat(config: Config, chat: ChatClient) -> Res<Self> {
        // Initialize the stores.

        let responses = ResponseStore::new();
        let access = AccessStore::default();
        let activity = ActivityLog::open(&config.activity_log_path)?;
        let profiles = ProfileDirectory::new(&config.profiles_path);

        // Initialize the engines.

        let matcher = MatchEngine::new(responses.clone(), activity.clone());
        let reloader = ReloadCoordinator::new(&config.access_config_path, &config.responses_path, access.clone(), responses.clone(), activity.clone());
        let analytics = AnalyticsEngine::new(activity.clone(), responses.clone());

        // Load the initial state.

        let report = reloader.reload();
        if let Err(err) = &report.config {
            warn!("Starting with an empty access config: {}", err);
        }
        if let Err(err) = &report.responses {
            warn!("Starting with an empty trigger table: {}", err);
        }

        Ok(Self {
            config,
            responses,
            access,
            activity,
            profiles,
            matcher,
            reloader,
            analytics,
            chat,
            restart: Arc::new(Notify::new()),
        })
    }

    /// Asks the running listener to stop so the supervisor can start a fresh process.
    pub fn request_restart(&self) {
        let _ = self.activity.warning("Restart requested.");
        self.restart.notify_one();
    }

    /// Announces the bot and runs the chat listener until it stops or a restart is requested.
    pub async fn start(&self) -> Res<Shutdown> {
        self.activity.info(format!("Logged in as {}", self.chat.bot_user_id()))?;

        if let Some(channel) = self.access.system_log_channel() {
            let notice = format!("*🚀 Bot Online*\n*Status:* ✅ running\n*Triggers:* {}", self.responses.snapshot().len());

            if let Err(err) = self.chat.send_message(channel.as_str(), &notice).await {
                warn!("Failed to post startup notice: {}", err);
            }
        }

        info!("Listening for messages ...");

        tokio::select! {
            result = self.chat.start(self.clone()) => result.map(|_| Shutdown::Stopped),
            _ = self.restart.notified() => Ok(Shutdown::Restart),
        }
    }
}
