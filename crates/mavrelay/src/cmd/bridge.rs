use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mavrelay_bus::BusConfig;
use mavrelay_link::{Bridge, BridgeConfig, LocalIdentity, Mode};
use mavrelay_transport::{SerialConfig, SerialPort};
use tracing::info;

use crate::cmd::{open_bus, parse_duration, shutdown_token, BridgeArgs};
use crate::exit::{link_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat};

pub fn run(args: BridgeArgs, bus: BusConfig, format: OutputFormat) -> CliResult<i32> {
    let config = bridge_config(&args)?;

    let serial = SerialConfig {
        baud: args.baud,
        ..SerialConfig::default()
    };
    let rx = SerialPort::open(&args.port, &serial)
        .map_err(|err| transport_error("serial open failed", err))?;
    let tx = rx
        .try_clone()
        .map_err(|err| transport_error("serial open failed", err))?;

    let bus = Arc::new(open_bus(bus)?);
    let cancel = shutdown_token()?;
    let handle = Bridge::new(config, bus)
        .spawn(rx, tx, &cancel)
        .map_err(|err| link_error("bridge start failed", err))?;

    while !handle.is_stopping() {
        thread::sleep(Duration::from_millis(100));
    }
    info!("bridge stopping");
    let report = handle
        .join()
        .map_err(|err| link_error("bridge failed", err))?;

    print_report("bridge-report", &report, format);
    Ok(SUCCESS)
}

fn bridge_config(args: &BridgeArgs) -> CliResult<BridgeConfig> {
    let beacon_interval = if args.no_beacon {
        None
    } else {
        Some(parse_duration(&args.beacon_interval)?)
    };
    Ok(BridgeConfig {
        identity: LocalIdentity::new(args.sysid, args.compid, args.link_compid),
        mode: if args.uplink {
            Mode::OperatorUplink
        } else {
            Mode::Vehicle
        },
        beacon_interval,
        ..BridgeConfig::default()
    })
}
