//! Record the IPs of connecting users, as seen by an operator.
//!
//! Watches for ircd-ratbox client connection notices:
//!
//! ```text
//! :irc.example.com NOTICE * :*** Notice -- CLICONN will will example.com 192.168.1.2 opers will 192.168.1.2 0 will
//! ```
//!
//! and appends each new IP to the file named by `record-ip-file`, one per
//! line, with the nick and time. IPs already in the file are skipped. The
//! file is meant to feed a firewall allow list.

use crate::irc::{Client, Hook};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use irc::client::prelude::{Command, Message};
use std::io;
use std::net::IpAddr;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub struct RecordIps;

#[async_trait]
impl Hook for RecordIps {
    fn name(&self) -> &str {
        "recordips"
    }

    async fn on_message(&self, client: &mut Client, message: &Message) {
        let Command::NOTICE(_, text) = &message.command else {
            return;
        };
        let Some(conn) = parse_cliconn(text) else {
            return;
        };
        let Some(path) = client.setting("record-ip-file").filter(|p| !p.is_empty()) else {
            return;
        };

        let comment = format!("IRC: {}", conn.nick);
        match record_ip(Path::new(path), conn.ip, &comment, Local::now()).await {
            Ok(true) => info!(ip = %conn.ip, nick = %conn.nick, "recorded IP"),
            Ok(false) => debug!(ip = %conn.ip, "IP already recorded"),
            Err(e) => warn!(ip = %conn.ip, error = %e, "unable to record IP"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ClientConnect {
    pub nick: String,
    pub ip: IpAddr,
}

/// Pull nick and IP out of a CLICONN notice body.
pub fn parse_cliconn(text: &str) -> Option<ClientConnect> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < 8 || fields[3] != "CLICONN" {
        return None;
    }
    let ip = fields[7].parse().ok()?;
    Some(ClientConnect {
        nick: fields[4].to_string(),
        ip,
    })
}

/// Append `ip` to the list at `path` unless it is already there. Returns
/// whether a line was written.
pub async fn record_ip(
    path: &Path,
    ip: IpAddr,
    comment: &str,
    when: DateTime<Local>,
) -> io::Result<bool> {
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    if existing.lines().any(|line| line_ip(line) == Some(ip)) {
        return Ok(false);
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    let line = format!("{} # {} {}\n", ip, comment, when.to_rfc3339());
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(true)
}

/// The address at the start of a list line, with any host-length CIDR
/// suffix stripped.
fn line_ip(line: &str) -> Option<IpAddr> {
    let first = line.split_whitespace().next()?;
    let addr = first
        .strip_suffix("/32")
        .or_else(|| first.strip_suffix("/128"))
        .unwrap_or(first);
    addr.parse().ok()
}
