mod cmd;
mod exit;
mod logging;
mod output;

use std::net::Ipv4Addr;

use clap::{Args, Parser};
use mavrelay_bus::{BusConfig, DEFAULT_GROUP, DEFAULT_PORT};

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mavrelay", version, about = "MAVLink serial bridge, image streaming and replay")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Only log errors.
    #[arg(long, short = 's', global = true)]
    silent: bool,

    /// Log at debug level.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Log everything.
    #[arg(long, global = true)]
    debug: bool,

    #[command(flatten)]
    bus: BusArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct BusArgs {
    /// Multicast group of the local bus.
    #[arg(long, env = "MAVRELAY_BUS_GROUP", default_value_t = DEFAULT_GROUP, global = true)]
    bus_group: Ipv4Addr,

    /// UDP port of the local bus.
    #[arg(long, env = "MAVRELAY_BUS_PORT", default_value_t = DEFAULT_PORT, global = true)]
    bus_port: u16,

    /// Multicast TTL; 0 keeps the bus on this host.
    #[arg(long, default_value_t = 0, global = true)]
    bus_ttl: u32,

    /// Interface address to join the bus on.
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED, global = true)]
    bus_interface: Ipv4Addr,
}

impl From<BusArgs> for BusConfig {
    fn from(args: BusArgs) -> Self {
        BusConfig {
            group: args.bus_group,
            port: args.bus_port,
            ttl: args.bus_ttl,
            interface: args.bus_interface,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(
        cli.log_format,
        cli.log_level.with_flags(cli.silent, cli.verbose, cli.debug),
    );

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, cli.bus.into(), format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bridge_with_legacy_alias() {
        let cli = Cli::try_parse_from([
            "mavrelay",
            "bridge",
            "--port",
            "/dev/ttyS1",
            "--baud",
            "57600",
            "--pc2serial",
        ])
        .expect("bridge args should parse");

        match cli.command {
            Command::Bridge(args) => {
                assert!(args.uplink);
                assert_eq!(args.baud, 57_600);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_beacon_interval_with_no_beacon() {
        let err = Cli::try_parse_from([
            "mavrelay",
            "bridge",
            "--no-beacon",
            "--beacon-interval",
            "1s",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_replay_start_image_alias() {
        let cli = Cli::try_parse_from([
            "mavrelay",
            "replay",
            "flight.mavlink",
            "--start-image",
            "1500000",
        ])
        .expect("replay args should parse");

        match cli.command {
            Command::Replay(args) => assert_eq!(args.start, Some(1_500_000)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bus_options_are_global() {
        let cli = Cli::try_parse_from(["mavrelay", "ping", "--bus-port", "9000", "--bus-ttl", "1"])
            .expect("bus args should parse after the subcommand");
        let config = BusConfig::from(cli.bus);
        assert_eq!(config.port, 9000);
        assert_eq!(config.ttl, 1);
        assert_eq!(config.group, DEFAULT_GROUP);
    }
}
