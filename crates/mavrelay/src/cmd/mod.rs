use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use mavrelay_bus::{BusConfig, UdpBus, MAVLINK};
use mavrelay_transfer::Orientation;
use tokio_util::sync::CancellationToken;

use crate::exit::{bus_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod bridge;
pub mod ping;
pub mod receive;
pub mod record;
pub mod replay;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bridge a serial link and the bus.
    Bridge(BridgeArgs),
    /// Answer image requests with chunked transfers from a directory.
    Stream(StreamArgs),
    /// Reassemble chunked transfers from the bus into files.
    Receive(ReceiveArgs),
    /// Measure round-trip latency to every system on the bus.
    Ping(PingArgs),
    /// Replay a recorded session onto the bus.
    Replay(ReplayArgs),
    /// Record bus traffic to a session log.
    Record(RecordArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, bus: BusConfig, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Bridge(args) => bridge::run(args, bus, format),
        Command::Stream(args) => stream::run(args, bus, format),
        Command::Receive(args) => receive::run(args, bus, format),
        Command::Ping(args) => ping::run(args, bus, format),
        Command::Replay(args) => replay::run(args, bus, format),
        Command::Record(args) => record::run(args, bus, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// System id of this vehicle.
    #[arg(long, env = "MAVRELAY_SYSID", default_value_t = 1)]
    pub sysid: u8,
    /// Component id this bridge sends as.
    #[arg(long, env = "MAVRELAY_COMPID", default_value_t = 110)]
    pub compid: u8,
    /// Component id of the device on the serial link.
    #[arg(long, default_value_t = 200)]
    pub link_compid: u8,
    /// Serial device.
    #[arg(long, short = 'p', env = "MAVRELAY_PORT", default_value = "/dev/ttyUSB0")]
    pub port: PathBuf,
    /// Baud rate; unsupported rates fall back to 115200.
    #[arg(long, short = 'b', env = "MAVRELAY_BAUD", default_value_t = 115_200)]
    pub baud: u32,
    /// The serial link is a radio back to an operator station.
    #[arg(long, alias = "pc2serial")]
    pub uplink: bool,
    /// SYSTEM_TIME beacon period on the serial link (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s", conflicts_with = "no_beacon")]
    pub beacon_interval: String,
    /// Do not send SYSTEM_TIME beacons.
    #[arg(long)]
    pub no_beacon: bool,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Directory of encoded frames; the newest one is sent.
    pub dir: PathBuf,
    #[arg(long, env = "MAVRELAY_SYSID", default_value_t = 42)]
    pub sysid: u8,
    #[arg(long, env = "MAVRELAY_COMPID", default_value_t = 30)]
    pub compid: u8,
    /// Camera id reported with frames.
    #[arg(long, default_value_t = 0)]
    pub camera: u64,
    #[arg(long, value_enum, default_value = "forward")]
    pub orientation: OrientationArg,
    /// Frame width announced in descriptors.
    #[arg(long, default_value_t = 640)]
    pub width: u16,
    /// Frame height announced in descriptors.
    #[arg(long, default_value_t = 480)]
    pub height: u16,
    /// Data packets sent between request checks.
    #[arg(long, default_value_t = 16)]
    pub burst: usize,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Directory completed transfers are written to.
    pub out: PathBuf,
    /// Exit after N completed transfers.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    #[arg(long, env = "MAVRELAY_SYSID", default_value_t = 1)]
    pub sysid: u8,
    #[arg(long, env = "MAVRELAY_COMPID", default_value_t = 30)]
    pub compid: u8,
    /// Number of probes to send.
    #[arg(long, short = 'c', default_value_t = 10)]
    pub count: u32,
    /// Time between probes (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub interval: String,
    /// How long to wait for replies after the last probe.
    #[arg(long, default_value = "1s")]
    pub wait: String,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Session log to replay.
    pub log: PathBuf,
    /// Left (mono) image directory. Default: <log without extension>/left.
    #[arg(long)]
    pub images_left: Option<PathBuf>,
    /// Right image directory. Default: <log without extension>/right.
    #[arg(long)]
    pub images_right: Option<PathBuf>,
    /// Skip everything before this capture or record timestamp (µs).
    #[arg(long, alias = "start-image")]
    pub start: Option<u64>,
    /// Publish EXTENDED_MESSAGE records with their trailers.
    #[arg(long)]
    pub publish_extended: bool,
    /// Replay messages only, no images.
    #[arg(long)]
    pub no_images: bool,
    #[arg(long, value_enum, default_value = "forward")]
    pub orientation: OrientationArg,
    /// System id replayed images are sent as.
    #[arg(long, env = "MAVRELAY_SYSID", default_value_t = 1)]
    pub sysid: u8,
    /// Component id replayed images are sent as.
    #[arg(long, env = "MAVRELAY_COMPID", default_value_t = 50)]
    pub compid: u8,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Log file to create.
    pub out: PathBuf,
    /// Topic to record.
    #[arg(long, default_value = MAVLINK)]
    pub topic: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OrientationArg {
    Forward,
    Downward,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Forward => Orientation::Forward,
            OrientationArg::Downward => Orientation::Downward,
        }
    }
}

/// Join the UDP bus.
pub fn open_bus(config: BusConfig) -> CliResult<UdpBus> {
    UdpBus::new(config).map_err(|err| bus_error("bus setup failed", err))
}

/// Token cancelled on Ctrl-C.
pub fn shutdown_token() -> CliResult<CancellationToken> {
    let cancel = CancellationToken::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || handler.cancel()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })?;
    Ok(cancel)
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
