//! Core components, types, and utilities for the autoreply-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Process settings loaded from file and environment variables.
//! - Domain error kinds shared by the stores and engines.
//! - Common types and result handling.

pub mod config;
pub mod error;
pub mod types;
