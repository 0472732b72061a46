//! Duck Decoy Protocol: serverless peer discovery over ICMP.
//!
//! Each peer pings an unroutable decoy address so that devices along the
//! path answer with ICMP errors embedding the original echo request, and
//! sends "quacks" (forged errors of the same shape) straight at its target.
//! A listener on the other side unwraps both and reports the sender.

pub mod addr;
pub mod ddp;
pub mod error;
pub mod icmp;
pub mod ip;
pub mod packet;
pub mod shutdown;
pub mod socket;
pub mod status;
pub mod util;

pub use addr::IpAddress;
pub use ddp::{build_quack, Config, MagicPacket, Matcher, Rejection, Session};
pub use error::{Error, Result};
pub use icmp::IcmpPacket;
pub use ip::IpPacket;
pub use packet::{IcmpType, IpProtocol};
pub use shutdown::Shutdown;
pub use socket::{RawTransport, Transport};
pub use status::{Event, LogSink, StatusSink, Task};
