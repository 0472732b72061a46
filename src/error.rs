use std::io;

use crate::addr::IpAddress;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("truncated packet: need at least {needed} byte(s), got {got}")]
    TruncatedPacket { needed: usize, got: usize },

    #[error("header encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("packet too large: {len} byte(s) exceed the 16-bit total length")]
    PacketTooLarge { len: usize },

    #[error("failed to bind raw socket to {addr}: {source}")]
    SocketBind { addr: IpAddress, source: io::Error },

    #[error("failed to open raw socket to {addr}: {source}")]
    SocketConnect { addr: IpAddress, source: io::Error },

    #[error("read error: {0}")]
    SocketRead(io::Error),

    #[error("failed to spawn task: {0}")]
    Spawn(io::Error),

    #[error("could not resolve {0}")]
    Resolve(String),
}

pub type Result<T> = std::result::Result<T, Error>;
