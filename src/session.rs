//! Keeps a client connected until it is told to stop.
//!
//! The client itself never reconnects. [`supervise`] runs connect, register
//! and the receive loop, and starts over after `reconnect_delay` whenever the
//! session ends, whether through a transport error or an ERROR the server
//! sent on its own (K-line, server restart, ping timeout). It returns only
//! once [`Shutdown::trigger`] has been called.

use crate::irc::{Client, ClientError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Stop request shared between the signal handler and [`supervise`].
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
    wake: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if !self.is_triggered() {
            self.wake.notified().await;
        }
    }
}

/// Run sessions back to back until `shutdown` is triggered.
pub async fn supervise(client: &mut Client, reconnect_delay: Duration, shutdown: &Shutdown) {
    loop {
        match session(client).await {
            Ok(()) => info!("server ended the session"),
            Err(e) => error!(error = %e, "session failed"),
        }
        if let Err(e) = client.close().await {
            warn!(error = %e, "error closing connection");
        }
        if shutdown.is_triggered() {
            info!("shutting down");
            return;
        }

        info!(delay_secs = reconnect_delay.as_secs(), "reconnecting after delay");
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = shutdown.wait() => {
                info!("shutting down");
                return;
            }
        }
    }
}

async fn session(client: &mut Client) -> Result<(), ClientError> {
    client.connect().await?;
    client.register().await?;
    client.run().await
}
