//! Events reported by a running session.
//!
//! The session never prints anything itself. Every lifecycle change, send,
//! discarded datagram and discovered peer is handed to a [`StatusSink`] as an
//! [`Event`]; [`LogSink`] turns them into `tracing` records.

use std::fmt;

use tracing::{debug, info, warn};

use crate::addr::IpAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Pinger,
    Listener,
    Quacker,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Task::Pinger => "pinger",
            Task::Listener => "listener",
            Task::Quacker => "quacker",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TaskStarted { task: Task },
    PacketSent { task: Task, destination: IpAddress, size: usize, sequence: u16 },
    SendFailed { task: Task, error: String },
    DecodeFailed { source: IpAddress, reason: String },
    PeerDiscovered { address: IpAddress },
    TaskStopped { task: Task, reason: String },
}

pub trait StatusSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Writes every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn emit(&self, event: Event) {
        match event {
            Event::TaskStarted { task } => info!(%task, "task started"),
            Event::PacketSent { task, destination, size, sequence } => {
                info!(%task, %destination, size, sequence, "packet sent")
            }
            Event::SendFailed { task, error } => warn!(%task, %error, "send failed"),
            Event::DecodeFailed { source, reason } => debug!(%source, %reason, "datagram discarded"),
            Event::PeerDiscovered { address } => info!(peer = %address, "peer found"),
            Event::TaskStopped { task, reason } => info!(%task, %reason, "task stopped"),
        }
    }
}
