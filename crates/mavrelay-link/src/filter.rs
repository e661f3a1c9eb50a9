//! Allow-list rules deciding which messages cross the bridge.
//!
//! Rules are plain data; [`FilterRuleSet::permits`] walks them in order and
//! allows a message only when some rule matches. No match means drop.

use mavrelay_frame::{msgid, Origin};

use crate::config::{LocalIdentity, Mode};

/// Which way a message is crossing the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    BusToTransport,
    TransportToBus,
}

/// Message types a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSelector {
    Any,
    Ids(Vec<u8>),
}

impl TypeSelector {
    fn matches(&self, type_tag: u8) -> bool {
        match self {
            Self::Any => true,
            Self::Ids(ids) => ids.contains(&type_tag),
        }
    }
}

/// Bridge modes a rule is active in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCondition {
    Any,
    Only(Mode),
}

impl ModeCondition {
    fn matches(self, mode: Mode) -> bool {
        match self {
            Self::Any => true,
            Self::Only(required) => required == mode,
        }
    }
}

/// Condition on the sender of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginPredicate {
    Always,
    /// Not the device attached to the serial link.
    NotLinkDevice,
    /// Any component of the local system.
    LocalSystem,
}

impl OriginPredicate {
    fn matches(self, origin: Origin, local: &LocalIdentity) -> bool {
        match self {
            Self::Always => true,
            Self::NotLinkDevice => !local.is_link_device(origin),
            Self::LocalSystem => origin.system_id == local.system_id,
        }
    }
}

/// One allow rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub selector: TypeSelector,
    pub direction: Direction,
    pub mode: ModeCondition,
    pub origin: OriginPredicate,
}

impl FilterRule {
    fn matches(
        &self,
        type_tag: u8,
        direction: Direction,
        origin: Origin,
        local: &LocalIdentity,
        mode: Mode,
    ) -> bool {
        self.direction == direction
            && self.mode.matches(mode)
            && self.selector.matches(type_tag)
            && self.origin.matches(origin, local)
    }
}

/// Ordered allow rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRuleSet {
    rules: Vec<FilterRule>,
}

/// Messages the flight controller consumes.
const VEHICLE_INBOUND: &[u8] = &[
    msgid::SET_MODE,
    msgid::HEARTBEAT,
    msgid::COMMAND_LONG,
    msgid::SYSTEM_TIME,
    msgid::REQUEST_DATA_STREAM,
    msgid::PARAM_REQUEST_LIST,
    msgid::PARAM_REQUEST_READ,
    msgid::PARAM_SET,
    msgid::PARAM_VALUE,
    msgid::IMAGE_TRIGGER_CONTROL,
    msgid::VISION_POSITION_ESTIMATE,
    msgid::GLOBAL_VISION_POSITION_ESTIMATE,
    msgid::VICON_POSITION_ESTIMATE,
    msgid::PING,
    msgid::STATUSTEXT,
    msgid::SET_LOCAL_POSITION_SETPOINT,
    msgid::SET_GLOBAL_POSITION_SETPOINT_INT,
    msgid::SET_POSITION_CONTROL_OFFSET,
    msgid::OPTICAL_FLOW,
];

/// Status the operator station wants to see.
const UPLINK_OUTBOUND: &[u8] = &[
    msgid::MISSION_ITEM,
    msgid::MISSION_ACK,
    msgid::MISSION_CLEAR_ALL,
    msgid::MISSION_COUNT,
    msgid::MISSION_CURRENT,
    msgid::MISSION_ITEM_REACHED,
    msgid::MISSION_REQUEST,
    msgid::MISSION_REQUEST_LIST,
    msgid::MISSION_SET_CURRENT,
    msgid::SET_GPS_GLOBAL_ORIGIN,
    msgid::GPS_GLOBAL_ORIGIN,
    msgid::HEARTBEAT,
    msgid::PARAM_VALUE,
    msgid::STATUSTEXT,
    msgid::COMMAND_ACK,
    msgid::SYS_STATUS,
    msgid::SYSTEM_TIME,
    msgid::POSITION_CONTROL_SETPOINT,
    msgid::ROLL_PITCH_YAW_SPEED_THRUST_SETPOINT,
    msgid::ROLL_PITCH_YAW_THRUST_SETPOINT,
    msgid::DEBUG,
    msgid::DEBUG_VECT,
    msgid::GPS_STATUS,
    msgid::GLOBAL_POSITION_INT,
    msgid::LOCAL_POSITION_NED,
    msgid::LOCAL_POSITION_SETPOINT,
    msgid::ATTITUDE,
];

impl FilterRuleSet {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    /// A rule set that drops everything.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Tables of the deployed serial bridge.
    pub fn bridge_default() -> Self {
        Self::new(vec![
            FilterRule {
                selector: TypeSelector::Ids(VEHICLE_INBOUND.to_vec()),
                direction: Direction::BusToTransport,
                mode: ModeCondition::Only(Mode::Vehicle),
                origin: OriginPredicate::NotLinkDevice,
            },
            FilterRule {
                selector: TypeSelector::Ids(UPLINK_OUTBOUND.to_vec()),
                direction: Direction::BusToTransport,
                mode: ModeCondition::Only(Mode::OperatorUplink),
                origin: OriginPredicate::LocalSystem,
            },
            FilterRule {
                selector: TypeSelector::Any,
                direction: Direction::TransportToBus,
                mode: ModeCondition::Any,
                origin: OriginPredicate::Always,
            },
        ])
    }

    /// Append a rule.
    pub fn push(&mut self, rule: FilterRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// Whether a message may cross in `direction`.
    pub fn permits(
        &self,
        type_tag: u8,
        direction: Direction,
        origin: Origin,
        local: &LocalIdentity,
        mode: Mode,
    ) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.matches(type_tag, direction, origin, local, mode))
    }
}
