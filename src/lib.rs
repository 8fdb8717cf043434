//! Library root for `autoreply-bot`.
//!
//! Autoreply-bot watches a fixed set of chat channels and answers messages that
//! contain a known trigger phrase:
//! - Replies are drawn from a per-trigger pool without repeats until it is exhausted
//! - The trigger table and access configuration can be reloaded while running
//! - An activity record feeds daily statistics and detailed reports
//!
//! The bot integrates with Slack for chat. The architecture is built around
//! cloneable store handles and a chat trait that allows other gateways.

pub mod base;
pub mod engine;
pub mod interaction;
pub mod runtime;
pub mod service;
pub mod store;

use base::{
    config::Config,
    types::{Res, Shutdown},
};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the autoreply-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with stores, engines and the chat client
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Res<Shutdown> {
    info!("Starting autoreply-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().map_err(|_| anyhow::anyhow!("Failed to install the rustls crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await
}
