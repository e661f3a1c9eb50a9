use std::time::Duration;

use mavrelay_frame::{FrameConfig, Origin};

/// Component id conventionally used by the flight controller's IMU.
pub const DEFAULT_LINK_COMPONENT: u8 = 200;

/// Component id of the serial bridge itself.
pub const DEFAULT_BRIDGE_COMPONENT: u8 = 110;

/// Who this process is, and who sits on the other end of the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalIdentity {
    pub system_id: u8,
    /// Component id this process sends as.
    pub component_id: u8,
    /// Component id of the device attached to the serial link.
    pub link_component_id: u8,
}

impl LocalIdentity {
    pub fn new(system_id: u8, component_id: u8, link_component_id: u8) -> Self {
        Self {
            system_id,
            component_id,
            link_component_id,
        }
    }

    /// Identity used for messages this process originates.
    pub fn origin(&self) -> Origin {
        Origin::new(self.system_id, self.component_id)
    }

    /// True when `origin` is the device on the serial link.
    pub fn is_link_device(&self, origin: Origin) -> bool {
        origin.system_id == self.system_id && origin.component_id == self.link_component_id
    }
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new(1, DEFAULT_BRIDGE_COMPONENT, DEFAULT_LINK_COMPONENT)
    }
}

/// Which end of a radio link the bridge serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Serial port talks to the vehicle's flight controller.
    #[default]
    Vehicle,
    /// Serial port is a radio back to an operator station.
    OperatorUplink,
}

/// Bridge settings.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub identity: LocalIdentity,
    pub mode: Mode,
    /// How long the bus pump blocks before rechecking for shutdown.
    pub bus_poll: Duration,
    /// Period of the SYSTEM_TIME beacon written to the transport; `None` disables it.
    pub beacon_interval: Option<Duration>,
    pub frame: FrameConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            identity: LocalIdentity::default(),
            mode: Mode::Vehicle,
            bus_poll: Duration::from_millis(100),
            beacon_interval: Some(Duration::from_secs(2)),
            frame: FrameConfig::default(),
        }
    }
}
