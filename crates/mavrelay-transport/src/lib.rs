//! Byte-stream transport adapters.
//!
//! This is the lowest layer of mavrelay. A transport is split into a receive
//! half ([`TransportRx`]) and a send half ([`TransportTx`]) so that each
//! bridge pump owns exactly one of them:
//! - Serial ports (termios, Unix)
//! - Any `Read`/`Write` stream (sockets, pipes, test doubles)

pub mod baud;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use baud::{resolve_baud, DEFAULT_BAUD_RATE, SUPPORTED_BAUD_RATES};
pub use error::{Result, TransportError};
pub use traits::{StreamReceiver, StreamSender, TransportRx, TransportTx};

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort};
