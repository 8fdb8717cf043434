//! Live state owned by the bot.
//!
//! - `responses`: the trigger table and its shuffle pools.
//! - `access`: permitted channels, administrators and auxiliary channels.
//! - `activity`: the append-only activity record.
//! - `profile`: the cached user profile file.
//!
//! Every store is a cloneable handle over shared state and is replaced only as a whole.

pub mod access;
pub mod activity;
pub mod profile;
pub mod responses;
