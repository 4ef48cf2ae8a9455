use crate::irc::{Client, Hook};
use async_trait::async_trait;
use irc::client::prelude::{Command, Message, Response};
use tracing::info;

/// Marks the client registered on RPL_WELCOME.
pub struct Registered;

#[async_trait]
impl Hook for Registered {
    fn name(&self) -> &str {
        "registered"
    }

    async fn on_message(&self, client: &mut Client, message: &Message) {
        if let Command::Response(Response::RPL_WELCOME, _) = message.command {
            client.set_registered();
            info!(nick = client.nick(), "registered");
        }
    }
}
