//! Built-in hooks.
//!
//! Each plugin is a [`Hook`](crate::irc::Hook) that reads its settings from
//! the client's config map:
//! - **registered**: marks the client registered when the server welcomes it.
//! - **autojoin**: joins the channels in `channels` after the welcome.
//! - **oper**: sends OPER with `oper-name`/`oper-password`, then sets
//!   `oper-umodes` once the server confirms.
//! - **recordips**: appends IPs from ircd-ratbox CLICONN notices to
//!   `record-ip-file`.

pub mod autojoin;
pub mod oper;
pub mod recordips;
pub mod registered;

use crate::irc::HookRegistry;

/// Register every built-in plugin. Order matters: the registered flag is set
/// before anything else reacts to the welcome.
pub fn register_all(registry: &mut HookRegistry) {
    registry
        .register(registered::Registered)
        .register(autojoin::AutoJoin)
        .register(oper::Oper)
        .register(recordips::RecordIps);
}
