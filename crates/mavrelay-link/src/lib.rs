//! Bridging between a serial transport and the bus.
//!
//! A [`Bridge`] runs two pumps on dedicated threads, each owning one half of
//! the transport. What crosses in each direction is decided by a
//! [`FilterRuleSet`], a table of allow rules evaluated per direction.

pub mod beacon;
pub mod config;
pub mod error;
pub mod filter;
pub mod probe;
pub mod router;

pub use beacon::SystemTimeBeacon;
pub use config::{BridgeConfig, LocalIdentity, Mode};
pub use error::{LinkError, Result};
pub use filter::{Direction, FilterRule, FilterRuleSet, ModeCondition, OriginPredicate, TypeSelector};
pub use probe::{
    echo_reply, run_prober, LatencyProber, ProbeConfig, ProbeEvent, ProbeReport, RoundTrip,
};
pub use router::{
    Bridge, BridgeHandle, BridgeReport, BusToTransport, Dispatch, PumpStats, TransportToBus,
};

pub use mavrelay_frame::unix_micros;
