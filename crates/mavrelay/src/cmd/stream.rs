use mavrelay_bus::BusConfig;
use mavrelay_frame::Origin;
use mavrelay_transfer::{run_streamer, DirectoryFrameSource, TransferConfig};

use crate::cmd::{open_bus, shutdown_token, StreamArgs};
use crate::exit::{io_error, transfer_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_report, OutputFormat};

pub fn run(args: StreamArgs, bus: BusConfig, format: OutputFormat) -> CliResult<i32> {
    let meta = std::fs::metadata(&args.dir)
        .map_err(|err| io_error(&format!("frame directory {}", args.dir.display()), err))?;
    if !meta.is_dir() {
        return Err(CliError::new(
            USAGE,
            format!("{} is not a directory", args.dir.display()),
        ));
    }
    if args.burst == 0 {
        return Err(CliError::new(USAGE, "--burst must be at least 1"));
    }

    let mut source = DirectoryFrameSource::new(&args.dir)
        .with_camera(args.camera, args.orientation.into())
        .with_dimensions(args.width, args.height);
    let config = TransferConfig {
        origin: Origin::new(args.sysid, args.compid),
        burst: args.burst,
        ..TransferConfig::default()
    };

    let bus = open_bus(bus)?;
    let cancel = shutdown_token()?;
    let stats = run_streamer(&bus, &mut source, &config, &cancel)
        .map_err(|err| transfer_error("streamer failed", err))?;

    print_report("stream-report", &stats, format);
    Ok(SUCCESS)
}
