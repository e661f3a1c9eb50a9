//! Serial MAVLink bridging, chunked image transfer, latency probing and
//! session replay over a shared publish/subscribe bus.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial ports and generic byte streams
//! - [`frame`]: message envelopes and MAVLink 1.0 framing
//! - [`bus`]: the bus trait with in-process and UDP multicast buses
//! - [`link`]: filter rules, the serial bridge and the latency prober
//! - [`transfer`]: chunked transfer of images larger than one message
//! - [`replay`]: session logs and their re-timed replay

/// Re-export transport types.
pub mod transport {
    pub use mavrelay_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mavrelay_frame::*;
}

/// Re-export bus types.
pub mod bus {
    pub use mavrelay_bus::*;
}

/// Re-export link types.
pub mod link {
    pub use mavrelay_link::*;
}

/// Re-export transfer types.
pub mod transfer {
    pub use mavrelay_transfer::*;
}

/// Re-export replay types.
pub mod replay {
    pub use mavrelay_replay::*;
}
