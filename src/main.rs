use std::fmt::Display;
use std::net::IpAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{App, AppSettings, Arg};
use colored::*;
use dns_lookup::lookup_addr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ddp::{util, Config, Event, IpAddress, LogSink, RawTransport, Session, Shutdown, StatusSink};

/// Prints discovered peers to the terminal, everything else goes to the log.
struct ConsoleSink {
    log: LogSink,
}

impl StatusSink for ConsoleSink {
    fn emit(&self, event: Event) {
        if let Event::PeerDiscovered { address } = &event {
            let hostname = lookup_addr(&IpAddr::V4((*address).into())).ok();
            println!("{} {} ({})",
                "QUACK".green().bold(), hostname.unwrap_or_else(|| address.to_string()).yellow(), address);
        }
        self.log.emit(event);
    }
}

fn fatal(msg: &str, err: impl Display) -> ! {
    eprintln!("{} {}: {}", "error:".red().bold(), msg, err);
    process::exit(1);
}

fn duration_arg(value: Option<&str>, default: Duration, what: &str) -> Duration {
    match value {
        Some(v) => humantime::parse_duration(v)
            .unwrap_or_else(|e| fatal(&format!("Invalid duration for {} (ex: 1s, 400ms, 1m)", what), e)),
        None => default,
    }
}

fn main() {
    let matches = App::new("ddp")
        .setting(AppSettings::ColoredHelp)
        .version("v1.0")
        .about("Duck Decoy Protocol.\nFinds a peer behind NAT by trading forged ICMP errors about an unroutable decoy address.")
        .arg(Arg::with_name("INTERFACE")
            .help("Local interface IP address to listen on")
            .required(true)
            .index(1))
        .arg(Arg::with_name("TARGET")
            .help("Hostname or IP address of the peer")
            .required(true)
            .index(2))
        .arg(Arg::with_name("decoy")
            .help("The unroutable IP address to ping (Default 4.21.3.11)")
            .short("d")
            .long("decoy")
            .takes_value(true))
        .arg(Arg::with_name("interval")
            .help("Set how long to wait in between pings and quacks (Default 5s)")
            .short("I")
            .long("interval")
            .takes_value(true))
        .arg(Arg::with_name("deadline")
            .help("Set the listener read deadline, which bounds shutdown time (Default 15s)")
            .short("W")
            .long("deadline")
            .takes_value(true))
        .arg(Arg::with_name("verbose")
            .help("Log every discarded datagram")
            .short("v")
            .long("verbose"))
        .get_matches();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if matches.is_present("verbose") {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Both positionals are required, clap guarantees they are present.
    let interface = IpAddress::parse(matches.value_of("INTERFACE").unwrap_or_default());
    let target_host = matches.value_of("TARGET").unwrap_or_default();
    let target = util::resolve_dest(target_host).unwrap_or_else(|e| fatal("Error resolving target", e));

    let mut config = Config::new(interface, target);
    if let Some(decoy) = matches.value_of("decoy") {
        config.decoy = IpAddress::parse(decoy);
    }
    config.ping_interval = duration_arg(matches.value_of("interval"), config.ping_interval, "interval");
    config.listen_deadline = duration_arg(matches.value_of("deadline"), config.listen_deadline, "deadline");

    let sink = Arc::new(ConsoleSink { log: LogSink });
    let session = Session::start(config, &RawTransport, sink, Shutdown::new())
        .unwrap_or_else(|e| fatal("Error starting session", e));

    let config = session.config();
    println!("{} {} via {} (decoy {})", "DDP".cyan(), target_host.bold(), config.interface, config.decoy);

    let s = session.shutdown().clone();
    let max_wait = config.listen_deadline;
    ctrlc::set_handler(move || {
        info!("shutting down, max wait time {}", humantime::format_duration(max_wait));
        s.trigger();
    }).expect("Error setting Ctrl-C handler");

    info!("ddp started - ctrl+c to quit");
    session.wait();
}
