use std::time::Duration;

use mavrelay_bus::BusConfig;
use mavrelay_replay::{run_recorder, LogWriter};

use crate::cmd::{open_bus, shutdown_token, RecordArgs};
use crate::exit::{replay_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat};

pub fn run(args: RecordArgs, bus: BusConfig, format: OutputFormat) -> CliResult<i32> {
    let mut writer =
        LogWriter::create(&args.out).map_err(|err| replay_error("record failed", err))?;
    let bus = open_bus(bus)?;
    let cancel = shutdown_token()?;

    let stats = run_recorder(
        &bus,
        &args.topic,
        &mut writer,
        Duration::from_millis(100),
        &cancel,
    )
    .map_err(|err| replay_error("record failed", err))?;

    print_report("record-report", &stats, format);
    Ok(SUCCESS)
}
