//! Event handling and user interactions for autoreply-bot.
//!
//! This module provides functionality for handling chat events:
//! - Filtering and routing incoming messages
//! - Running administrative commands
//! - Dispatching automated replies and audit notices

pub mod command;
pub mod message;
