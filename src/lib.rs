//! Mirrors a Minecraft server's status into Discord.
//!
//! Every few minutes the status APIs are polled; the result becomes the
//! bot's "Watching ..." presence and, optionally, the name of a voice
//! channel. Channel renames are deduplicated and rate-limited.

pub mod config;
pub mod discord;
pub mod error;
pub mod presence;
pub mod scheduler;
pub mod shutdown;
pub mod status;
