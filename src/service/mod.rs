//! Service integrations for external APIs and clients.
//!
//! This module contains the chat gateway used by the autoreply-bot. It defines
//! both the generic trait and a concrete Slack implementation, allowing for
//! extensibility and easy testing.

pub mod chat;
