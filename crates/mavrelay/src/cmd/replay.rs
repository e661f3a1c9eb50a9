use std::path::Path;
use std::sync::Arc;

use mavrelay_bus::BusConfig;
use mavrelay_frame::Origin;
use mavrelay_replay::{
    default_image_dirs, run_replay, ImageIndex, LogReader, ReplayConfig, ReplayEngine,
    SystemClock, TransferImageSink,
};
use tracing::info;

use crate::cmd::{open_bus, shutdown_token, ReplayArgs};
use crate::exit::{replay_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat};

pub fn run(args: ReplayArgs, bus: BusConfig, format: OutputFormat) -> CliResult<i32> {
    let config = ReplayConfig {
        start: args.start,
        publish_extended: args.publish_extended,
        orientation: args.orientation.into(),
        ..ReplayConfig::default()
    };
    let mut reader = LogReader::open_with(&args.log, config.frame.clone())
        .map_err(|err| replay_error("replay failed", err))?;

    let (left, right) = if args.no_images {
        (ImageIndex::new(), ImageIndex::new())
    } else {
        let (default_left, default_right) = default_image_dirs(&args.log);
        let left_dir = args.images_left.unwrap_or(default_left);
        let right_dir = args.images_right.unwrap_or(default_right);
        info!(left = %left_dir.display(), right = %right_dir.display(), "image directories");
        let scan = |dir: &Path| {
            ImageIndex::scan(dir).map_err(|err| replay_error("image index failed", err))
        };
        (scan(&left_dir)?, scan(&right_dir)?)
    };

    let bus = Arc::new(open_bus(bus)?);
    let mut sink = TransferImageSink::new(
        Arc::clone(&bus),
        Origin::new(args.sysid, args.compid),
        config.orientation,
    );
    let engine = ReplayEngine::new(config, left, right);
    let cancel = shutdown_token()?;

    let report = run_replay(
        bus.as_ref(),
        &mut reader,
        engine,
        &SystemClock::new(),
        &mut sink,
        &cancel,
    )
    .map_err(|err| replay_error("replay failed", err))?;

    print_report("replay-report", &report, format);
    report
        .ensure_start_reached()
        .map_err(|err| replay_error("replay incomplete", err))?;
    Ok(SUCCESS)
}
