use std::fmt;
use std::io;

use mavrelay_bus::BusError;
use mavrelay_link::LinkError;
use mavrelay_replay::ReplayError;
use mavrelay_transfer::TransferError;
use mavrelay_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const BUS_ERROR: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn bus_error(context: &str, err: BusError) -> CliError {
    match err {
        BusError::TooLarge { .. } | BusError::Malformed(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(BUS_ERROR, format!("{context}: {other}")),
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Bus(err) => bus_error(context, err),
        LinkError::Frame(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn transfer_error(context: &str, err: TransferError) -> CliError {
    match err {
        TransferError::Bus(err) => bus_error(context, err),
        TransferError::Source { source, path } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn replay_error(context: &str, err: ReplayError) -> CliError {
    match err {
        ReplayError::Open { source, path } => {
            io_error(&format!("{context}: cannot open {}", path.display()), source)
        }
        ReplayError::Io(source) => io_error(context, source),
        ReplayError::Bus(err) => bus_error(context, err),
        ReplayError::StartNotReached { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_plain_failure() {
        let err = replay_error(
            "replay failed",
            ReplayError::Open {
                path: "/nope.mavlink".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.message.contains("/nope.mavlink"));
    }

    #[test]
    fn unreached_start_fails() {
        let err = replay_error("replay failed", ReplayError::StartNotReached { start: 5 });
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn configure_failure_is_a_transport_error() {
        let err = transport_error(
            "open failed",
            TransportError::Configure {
                path: "/dev/null".into(),
                reason: "not a tty".into(),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}
