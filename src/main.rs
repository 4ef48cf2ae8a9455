use anyhow::Result;
use crabdrop::irc::{Client, HookRegistry};
use crabdrop::session::{self, Shutdown};
use crabdrop::{config, logging, plugins};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let arg = std::env::args().nth(1);
    let cfg = config::load_config(arg.as_deref())?;
    logging::init(&cfg.logging);

    let mut registry = HookRegistry::new();
    plugins::register_all(&mut registry);
    info!(hooks = ?registry.names(), "plugins loaded");

    let server = &cfg.server;
    let mut client = Client::new(server.identity(), server.target(), Arc::new(registry))
        .with_config(cfg.settings.clone());
    client.set_timeout(cfg.client.timeout());

    // Ctrl-C queues a QUIT; the session ends when the server acknowledges it.
    let shutdown = Arc::new(Shutdown::new());
    {
        let shutdown = Arc::clone(&shutdown);
        let handle = client.handle();
        let quit_message = cfg.client.quit_message.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            info!("interrupted, quitting");
            shutdown.trigger();
            if let Err(e) = handle.quit(&quit_message) {
                warn!(error = %e, "unable to queue QUIT");
            }
        });
    }

    session::supervise(&mut client, cfg.client.reconnect_delay(), &shutdown).await;
    Ok(())
}
