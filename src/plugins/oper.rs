//! Become an IRC operator after registering.
//!
//! Settings:
//! - `oper-name`, `oper-password`: credentials for OPER. Both must be
//!   non-empty or nothing is sent.
//! - `oper-umodes`: user modes to set once the server accepts the OPER,
//!   e.g. `+s +cC`.

use crate::irc::{Client, Hook};
use async_trait::async_trait;
use irc::client::prelude::{Command, Message, Response};
use tracing::{info, warn};

pub struct Oper;

#[async_trait]
impl Hook for Oper {
    fn name(&self) -> &str {
        "oper"
    }

    async fn on_message(&self, client: &mut Client, message: &Message) {
        match message.command {
            Command::Response(Response::RPL_WELCOME, _) => send_oper(client).await,
            Command::Response(Response::RPL_YOUREOPER, _) => send_umodes(client).await,
            _ => {}
        }
    }
}

async fn send_oper(client: &mut Client) {
    let (name, password) = match (client.setting("oper-name"), client.setting("oper-password")) {
        (Some(name), Some(password)) if !name.is_empty() && !password.is_empty() => {
            (name.to_string(), password.to_string())
        }
        _ => return,
    };

    match client.oper(&name, &password).await {
        Ok(()) => info!("sent OPER"),
        Err(e) => warn!(error = %e, "unable to send OPER"),
    }
}

async fn send_umodes(client: &mut Client) {
    let Some(modes) = client.setting("oper-umodes").map(String::from) else {
        return;
    };
    let nick = client.nick().to_string();

    match client.user_mode(&nick, &modes).await {
        Ok(()) => info!(modes = %modes, "sent MODE"),
        Err(e) => warn!(error = %e, "problem sending MODE"),
    }
}
