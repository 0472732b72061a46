use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::random;
use tracing::debug;

use crate::addr::IpAddress;
use crate::error::{Error, Result};
use crate::icmp::IcmpPacket;
use crate::ip::IpPacket;
use crate::packet::{dest_unreachable, IcmpType, IpProtocol};
use crate::shutdown::Shutdown;
use crate::socket::{self, PacketReceiver, PacketSender, Transport};
use crate::status::{Event, StatusSink, Task};

/// The ICMP error every peer wraps announcements in, and the only outer type
/// the listener accepts. Firewalls answer traffic toward the decoy with
/// destination unreachable; peers running a different type cannot see each
/// other.
pub const ERROR_TYPE: IcmpType = IcmpType::DestinationUnreachable;
pub const ERROR_CODE: u8 = dest_unreachable::HOST_UNREACHABLE;

pub const MAGIC_IDENTIFIER: u16 = 0xC4AC;
pub const MAGIC_PAYLOAD: &[u8] = b"quack";

/// 4.21.3.11
pub const DEFAULT_DECOY: IpAddress = IpAddress(0x0415_030B);
pub const PING_INTERVAL: Duration = Duration::from_secs(5);
pub const LISTEN_DEADLINE: Duration = Duration::from_secs(15);
pub const QUACK_TTL: u8 = 63;

const RECV_BUFFER_LEN: usize = 2048;

/// The echo request every peer sends toward the decoy and embeds in quacks.
#[derive(Debug, Clone, PartialEq)]
pub struct MagicPacket {
    pub identifier: u16,
    pub payload: Vec<u8>,
}

impl Default for MagicPacket {
    fn default() -> Self {
        MagicPacket {
            identifier: MAGIC_IDENTIFIER,
            payload: MAGIC_PAYLOAD.to_vec(),
        }
    }
}

impl MagicPacket {
    pub fn packet(&self, sequence: u16) -> IcmpPacket {
        IcmpPacket::new(IcmpType::EchoRequest, 0, self.identifier, sequence, self.payload.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Local address: the listener binds here and quacks claim it as source.
    pub interface: IpAddress,
    /// The peer quacks are sent to.
    pub target: IpAddress,
    pub decoy: IpAddress,
    pub ping_interval: Duration,
    pub listen_deadline: Duration,
    pub magic: MagicPacket,
    pub quack_ttl: u8,
}

impl Config {
    pub fn new(interface: IpAddress, target: IpAddress) -> Self {
        Config {
            interface,
            target,
            decoy: DEFAULT_DECOY,
            ping_interval: PING_INTERVAL,
            listen_deadline: LISTEN_DEADLINE,
            magic: MagicPacket::default(),
            quack_ttl: QUACK_TTL,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.interface.is_nil() {
            return Err(Error::InvalidAddress("invalid or missing interface address".into()));
        }
        if self.target.is_nil() {
            return Err(Error::InvalidAddress("target ip is not defined".into()));
        }
        if self.decoy.is_nil() {
            return Err(Error::InvalidAddress("decoy ip is not defined".into()));
        }
        if self.ping_interval == Duration::ZERO {
            return Err(Error::InvalidConfig("ping interval must be greater than zero".into()));
        }
        if self.listen_deadline == Duration::ZERO {
            return Err(Error::InvalidConfig("listen deadline must be greater than zero".into()));
        }
        // A magic payload too large to embed would fail every quack.
        build_quack(self, 0, 0)?;
        Ok(())
    }
}

/// Build a quack: the magic echo request, inside an IP header claiming it
/// went from our interface to the decoy, inside an ICMP error.
pub fn build_quack(config: &Config, identifier: u16, sequence: u16) -> Result<Vec<u8>> {
    let magic = config.magic.packet(0).to_bytes()?;

    let mut ip = IpPacket::new(IpProtocol::Icmp, config.interface, config.decoy, magic)?;
    ip.ttl = config.quack_ttl;
    let embedded = ip.to_bytes()?;

    IcmpPacket::new(ERROR_TYPE, ERROR_CODE, identifier, sequence, embedded).to_bytes()
}

/// Why the listener threw a datagram away.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("packet parse error: {0}")]
    Malformed(String),

    #[error("ip packet read error: {0}")]
    MalformedEmbeddedIp(String),

    #[error("error parsing contained icmp packet: {0}")]
    MalformedEmbeddedIcmp(String),

    #[error("received invalid icmp packet")]
    BadChecksum,

    #[error("unexpected icmp type: {0}")]
    UnexpectedType(IcmpType),

    #[error("embedded packet is {0:?}, not icmp")]
    NotIcmp(IpProtocol),

    #[error("ip packet not destined for decoy ({0})")]
    WrongDestination(IpAddress),

    #[error("embedded packet was sent by us")]
    SelfSourced,

    #[error("icmp packet not sent by peer (identifier {0:#06x})")]
    WrongIdentifier(u16),
}

/// The listener's per-datagram pipeline: outer ICMP error, embedded IP
/// header toward the decoy, embedded magic echo request.
#[derive(Debug, Clone)]
pub struct Matcher {
    interface: IpAddress,
    decoy: IpAddress,
    identifier: u16,
}

impl Matcher {
    pub fn new(config: &Config) -> Self {
        Matcher {
            interface: config.interface,
            decoy: config.decoy,
            identifier: config.magic.identifier,
        }
    }

    /// Returns the peer address (`source`) if `datagram` is a DDP announcement.
    pub fn inspect(&self, datagram: &[u8], source: IpAddress) -> std::result::Result<IpAddress, Rejection> {
        let outer = IcmpPacket::from_bytes(datagram).map_err(|e| Rejection::Malformed(e.to_string()))?;
        if !outer.is_valid() {
            return Err(Rejection::BadChecksum);
        }
        if outer.kind != ERROR_TYPE {
            return Err(Rejection::UnexpectedType(outer.kind));
        }

        // Error messages carry the ip packet that caused them, which tells
        // us where the original traffic was headed.
        let embedded = IpPacket::from_bytes(&outer.payload)
            .map_err(|e| Rejection::MalformedEmbeddedIp(e.to_string()))?;
        if embedded.protocol != IpProtocol::Icmp {
            return Err(Rejection::NotIcmp(embedded.protocol));
        }
        if embedded.destination != self.decoy {
            return Err(Rejection::WrongDestination(embedded.destination));
        }
        if embedded.source == self.interface {
            return Err(Rejection::SelfSourced);
        }

        let inner = IcmpPacket::from_bytes(&embedded.payload)
            .map_err(|e| Rejection::MalformedEmbeddedIcmp(e.to_string()))?;
        if inner.identifier != self.identifier {
            return Err(Rejection::WrongIdentifier(inner.identifier));
        }

        Ok(source)
    }
}

/// A running DDP session: pinger, listener and quacker threads sharing one
/// read-only config and one shutdown signal.
pub struct Session {
    config: Arc<Config>,
    shutdown: Shutdown,
    tasks: Vec<(Task, JoinHandle<()>)>,
}

impl Session {
    /// Open every socket, then spawn the three tasks. Nothing is spawned if
    /// any socket fails to open.
    pub fn start(
        config: Config,
        transport: &dyn Transport,
        sink: Arc<dyn StatusSink>,
        shutdown: Shutdown,
    ) -> Result<Session> {
        config.validate()?;
        let config = Arc::new(config);

        let receiver = transport
            .receiver(config.interface)
            .map_err(|source| Error::SocketBind { addr: config.interface, source })?;
        let decoy_conn = transport
            .sender(config.decoy)
            .map_err(|source| Error::SocketConnect { addr: config.decoy, source })?;
        let target_conn = transport
            .sender(config.target)
            .map_err(|source| Error::SocketConnect { addr: config.target, source })?;

        let mut session = Session {
            config: config.clone(),
            shutdown: shutdown.clone(),
            tasks: Vec::with_capacity(3),
        };

        let listener = {
            let (config, sink, shutdown) = (config.clone(), sink.clone(), shutdown.clone());
            move || listen(&config, receiver, &*sink, &shutdown)
        };
        session.spawn(Task::Listener, listener)?;

        let pinger = {
            let (config, sink, shutdown) = (config.clone(), sink.clone(), shutdown.clone());
            move || {
                let magic = config.magic.clone();
                let ticker = Ticker { task: Task::Pinger, destination: config.decoy, interval: config.ping_interval };
                ticker.run(decoy_conn, &*sink, &shutdown, |sequence| magic.packet(sequence).to_bytes())
            }
        };
        session.spawn(Task::Pinger, pinger)?;

        let quacker = {
            let (config, sink, shutdown) = (config.clone(), sink.clone(), shutdown.clone());
            move || {
                let identifier = quack_identifier(config.magic.identifier);
                let ticker = Ticker { task: Task::Quacker, destination: config.target, interval: config.ping_interval };
                ticker.run(target_conn, &*sink, &shutdown, |sequence| build_quack(&config, identifier, sequence))
            }
        };
        session.spawn(Task::Quacker, quacker)?;

        Ok(session)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Block until every task has observed the shutdown signal and released
    /// its socket.
    pub fn wait(self) {
        for (task, handle) in self.tasks {
            if handle.join().is_err() {
                debug!(%task, "task panicked");
            }
        }
    }

    fn spawn<F>(&mut self, task: Task, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let spawned = thread::Builder::new().name(format!("ddp-{}", task)).spawn(f);
        match spawned {
            Ok(handle) => {
                self.tasks.push((task, handle));
                Ok(())
            }
            Err(e) => {
                self.shutdown.trigger();
                for (_, handle) in self.tasks.drain(..) {
                    let _ = handle.join();
                }
                Err(Error::Spawn(e))
            }
        }
    }
}

/// Any identifier but the magic one; the outer identifier of a quack is
/// never matched on.
fn quack_identifier(magic: u16) -> u16 {
    loop {
        let identifier = random::<u16>();
        if identifier != magic {
            return identifier;
        }
    }
}

/// Fixed interval send loop shared by the pinger and the quacker. Sends once
/// straight away, then once per interval until shutdown.
struct Ticker {
    task: Task,
    destination: IpAddress,
    interval: Duration,
}

impl Ticker {
    fn run<F>(&self, mut conn: Box<dyn PacketSender>, sink: &dyn StatusSink, shutdown: &Shutdown, mut build: F)
    where
        F: FnMut(u16) -> Result<Vec<u8>>,
    {
        sink.emit(Event::TaskStarted { task: self.task });

        let mut sequence = 0u16;
        while !shutdown.is_triggered() {
            match build(sequence) {
                Ok(packet) => match conn.send(&packet) {
                    Ok(size) => sink.emit(Event::PacketSent {
                        task: self.task,
                        destination: self.destination,
                        size,
                        sequence,
                    }),
                    Err(e) => sink.emit(Event::SendFailed { task: self.task, error: e.to_string() }),
                },
                Err(e) => sink.emit(Event::SendFailed { task: self.task, error: e.to_string() }),
            }
            sequence = sequence.wrapping_add(1);

            if shutdown.wait_timeout(self.interval) {
                break;
            }
        }

        drop(conn);
        sink.emit(Event::TaskStopped { task: self.task, reason: "shutdown".into() });
    }
}

fn listen(config: &Config, mut conn: Box<dyn PacketReceiver>, sink: &dyn StatusSink, shutdown: &Shutdown) {
    sink.emit(Event::TaskStarted { task: Task::Listener });

    let matcher = Matcher::new(config);
    let mut buf = vec![0u8; RECV_BUFFER_LEN];

    let reason = loop {
        if shutdown.is_triggered() {
            break "shutdown".to_string();
        }

        if let Err(e) = conn.set_deadline(config.listen_deadline) {
            break format!("failed to extend read deadline: {}", e);
        }

        let (n, from) = match conn.recv_from(&mut buf) {
            Ok(received) => received,
            Err(ref e) if socket::is_deadline(e) => continue,
            Err(e) => break Error::SocketRead(e).to_string(),
        };

        match matcher.inspect(&buf[..n], from) {
            Ok(peer) => sink.emit(Event::PeerDiscovered { address: peer }),
            Err(rejection) => sink.emit(Event::DecodeFailed { source: from, reason: rejection.to_string() }),
        }
    };

    drop(conn);
    sink.emit(Event::TaskStopped { task: Task::Listener, reason });
}
