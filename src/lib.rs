//! A minimal hook-driven IRC client.
//!
//! [`irc::Client`] owns one server connection, registers, answers PINGs and
//! hands every other frame to the hooks in an [`irc::HookRegistry`]. The
//! [`plugins`] module holds the hooks the `crabdrop` binary ships with.

pub mod config;
pub mod irc;
pub mod logging;
pub mod plugins;
pub mod session;
