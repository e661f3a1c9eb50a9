use mavrelay_bus::BusConfig;
use mavrelay_frame::Origin;
use mavrelay_link::{run_prober, ProbeConfig, ProbeReport};

use crate::cmd::{open_bus, parse_duration, shutdown_token, PingArgs};
use crate::exit::{link_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_report, OutputFormat};

pub fn run(args: PingArgs, bus: BusConfig, format: OutputFormat) -> CliResult<i32> {
    let config = probe_config(&args)?;
    let bus = open_bus(bus)?;
    let cancel = shutdown_token()?;

    let report =
        run_prober(&bus, &config, &cancel).map_err(|err| link_error("ping failed", err))?;
    print_report("ping-report", &report, format);
    Ok(exit_code(&report))
}

fn probe_config(args: &PingArgs) -> CliResult<ProbeConfig> {
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be at least 1"));
    }
    Ok(ProbeConfig {
        identity: Origin::new(args.sysid, args.compid),
        count: args.count,
        interval: parse_duration(&args.interval)?,
        wait: parse_duration(&args.wait)?,
    })
}

/// No reply at all is a timeout; partial loss still succeeds.
fn exit_code(report: &ProbeReport) -> i32 {
    if report.received == 0 {
        TIMEOUT
    } else {
        SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn builds_probe_config() {
        let config = probe_config(&PingArgs {
            sysid: 9,
            compid: 30,
            count: 3,
            interval: "250ms".to_string(),
            wait: "2s".to_string(),
        })
        .unwrap();
        assert_eq!(config.identity, Origin::new(9, 30));
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.wait, Duration::from_secs(2));
    }

    #[test]
    fn zero_count_is_rejected() {
        let err = probe_config(&PingArgs {
            sysid: 1,
            compid: 30,
            count: 0,
            interval: "1s".to_string(),
            wait: "1s".to_string(),
        })
        .unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn silence_is_a_timeout() {
        let report = ProbeReport {
            sent: 3,
            lost: 3,
            ..ProbeReport::default()
        };
        assert_eq!(exit_code(&report), TIMEOUT);
    }
}
