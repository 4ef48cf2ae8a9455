use crate::irc::{Client, Hook};
use async_trait::async_trait;
use irc::client::prelude::{Command, Message, Response};
use tracing::{info, warn};

/// Joins the space-separated `channels` setting once the server welcomes us.
pub struct AutoJoin;

#[async_trait]
impl Hook for AutoJoin {
    fn name(&self) -> &str {
        "autojoin"
    }

    async fn on_message(&self, client: &mut Client, message: &Message) {
        if !matches!(message.command, Command::Response(Response::RPL_WELCOME, _)) {
            return;
        }
        let Some(channels) = client.setting("channels") else {
            return;
        };
        let channels: Vec<String> = channels.split_whitespace().map(String::from).collect();

        for channel in &channels {
            if let Err(e) = client.join(channel).await {
                warn!(channel = %channel, error = %e, "autojoin failed");
                return;
            }
            info!(channel = %channel, "joining");
        }
    }
}
