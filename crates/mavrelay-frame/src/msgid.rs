//! Message type tags and their checksum seeds.
//!
//! Only the messages this system relays, filters or decodes are named here.
//! Any other tag still travels through the bridge untouched.

pub const HEARTBEAT: u8 = 0;
pub const SYS_STATUS: u8 = 1;
pub const SYSTEM_TIME: u8 = 2;
pub const PING: u8 = 4;
pub const SET_MODE: u8 = 11;
pub const PARAM_REQUEST_READ: u8 = 20;
pub const PARAM_REQUEST_LIST: u8 = 21;
pub const PARAM_VALUE: u8 = 22;
pub const PARAM_SET: u8 = 23;
pub const GPS_STATUS: u8 = 25;
pub const ATTITUDE: u8 = 30;
pub const LOCAL_POSITION_NED: u8 = 32;
pub const GLOBAL_POSITION_INT: u8 = 33;
pub const MISSION_ITEM: u8 = 39;
pub const MISSION_REQUEST: u8 = 40;
pub const MISSION_SET_CURRENT: u8 = 41;
pub const MISSION_CURRENT: u8 = 42;
pub const MISSION_REQUEST_LIST: u8 = 43;
pub const MISSION_COUNT: u8 = 44;
pub const MISSION_CLEAR_ALL: u8 = 45;
pub const MISSION_ITEM_REACHED: u8 = 46;
pub const MISSION_ACK: u8 = 47;
pub const SET_GPS_GLOBAL_ORIGIN: u8 = 48;
pub const GPS_GLOBAL_ORIGIN: u8 = 49;
pub const SET_LOCAL_POSITION_SETPOINT: u8 = 50;
pub const LOCAL_POSITION_SETPOINT: u8 = 51;
pub const SET_GLOBAL_POSITION_SETPOINT_INT: u8 = 53;
pub const ROLL_PITCH_YAW_THRUST_SETPOINT: u8 = 58;
pub const ROLL_PITCH_YAW_SPEED_THRUST_SETPOINT: u8 = 59;
pub const REQUEST_DATA_STREAM: u8 = 66;
pub const COMMAND_LONG: u8 = 76;
pub const COMMAND_ACK: u8 = 77;
pub const OPTICAL_FLOW: u8 = 100;
pub const GLOBAL_VISION_POSITION_ESTIMATE: u8 = 101;
pub const VISION_POSITION_ESTIMATE: u8 = 102;
pub const VICON_POSITION_ESTIMATE: u8 = 104;
pub const DATA_TRANSMISSION_HANDSHAKE: u8 = 130;
pub const ENCAPSULATED_DATA: u8 = 131;
pub const IMAGE_TRIGGERED: u8 = 152;
pub const IMAGE_TRIGGER_CONTROL: u8 = 153;
pub const IMAGE_AVAILABLE: u8 = 154;
pub const SET_POSITION_CONTROL_OFFSET: u8 = 160;
pub const POSITION_CONTROL_SETPOINT: u8 = 170;
pub const DEBUG_VECT: u8 = 250;
pub const STATUSTEXT: u8 = 253;
pub const DEBUG: u8 = 254;
pub const EXTENDED_MESSAGE: u8 = 255;

/// Checksum seed ("CRC extra") mixed into the frame checksum.
///
/// Returns `None` for tags without a known seed; those frames are checked
/// with the plain header and payload checksum.
pub fn crc_extra(msg_id: u8) -> Option<u8> {
    let seed = match msg_id {
        HEARTBEAT => 50,
        SYS_STATUS => 124,
        SYSTEM_TIME => 137,
        PING => 237,
        SET_MODE => 89,
        PARAM_REQUEST_READ => 214,
        PARAM_REQUEST_LIST => 159,
        PARAM_VALUE => 220,
        PARAM_SET => 168,
        GPS_STATUS => 23,
        ATTITUDE => 39,
        LOCAL_POSITION_NED => 185,
        GLOBAL_POSITION_INT => 104,
        MISSION_ITEM => 254,
        MISSION_REQUEST => 230,
        MISSION_SET_CURRENT => 28,
        MISSION_CURRENT => 28,
        MISSION_REQUEST_LIST => 132,
        MISSION_COUNT => 221,
        MISSION_CLEAR_ALL => 232,
        MISSION_ITEM_REACHED => 11,
        MISSION_ACK => 153,
        SET_GPS_GLOBAL_ORIGIN => 41,
        GPS_GLOBAL_ORIGIN => 39,
        REQUEST_DATA_STREAM => 148,
        COMMAND_LONG => 152,
        COMMAND_ACK => 143,
        OPTICAL_FLOW => 175,
        GLOBAL_VISION_POSITION_ESTIMATE => 102,
        VISION_POSITION_ESTIMATE => 158,
        VICON_POSITION_ESTIMATE => 56,
        DATA_TRANSMISSION_HANDSHAKE => 29,
        ENCAPSULATED_DATA => 223,
        DEBUG_VECT => 49,
        STATUSTEXT => 83,
        DEBUG => 46,
        _ => return None,
    };
    Some(seed)
}

/// Human-readable name for a message tag, for logs.
pub fn name(msg_id: u8) -> &'static str {
    match msg_id {
        HEARTBEAT => "HEARTBEAT",
        SYS_STATUS => "SYS_STATUS",
        SYSTEM_TIME => "SYSTEM_TIME",
        PING => "PING",
        SET_MODE => "SET_MODE",
        PARAM_REQUEST_READ => "PARAM_REQUEST_READ",
        PARAM_REQUEST_LIST => "PARAM_REQUEST_LIST",
        PARAM_VALUE => "PARAM_VALUE",
        PARAM_SET => "PARAM_SET",
        GPS_STATUS => "GPS_STATUS",
        ATTITUDE => "ATTITUDE",
        LOCAL_POSITION_NED => "LOCAL_POSITION_NED",
        GLOBAL_POSITION_INT => "GLOBAL_POSITION_INT",
        MISSION_ITEM => "MISSION_ITEM",
        MISSION_REQUEST => "MISSION_REQUEST",
        MISSION_SET_CURRENT => "MISSION_SET_CURRENT",
        MISSION_CURRENT => "MISSION_CURRENT",
        MISSION_REQUEST_LIST => "MISSION_REQUEST_LIST",
        MISSION_COUNT => "MISSION_COUNT",
        MISSION_CLEAR_ALL => "MISSION_CLEAR_ALL",
        MISSION_ITEM_REACHED => "MISSION_ITEM_REACHED",
        MISSION_ACK => "MISSION_ACK",
        SET_GPS_GLOBAL_ORIGIN => "SET_GPS_GLOBAL_ORIGIN",
        GPS_GLOBAL_ORIGIN => "GPS_GLOBAL_ORIGIN",
        SET_LOCAL_POSITION_SETPOINT => "SET_LOCAL_POSITION_SETPOINT",
        LOCAL_POSITION_SETPOINT => "LOCAL_POSITION_SETPOINT",
        SET_GLOBAL_POSITION_SETPOINT_INT => "SET_GLOBAL_POSITION_SETPOINT_INT",
        ROLL_PITCH_YAW_THRUST_SETPOINT => "ROLL_PITCH_YAW_THRUST_SETPOINT",
        ROLL_PITCH_YAW_SPEED_THRUST_SETPOINT => "ROLL_PITCH_YAW_SPEED_THRUST_SETPOINT",
        REQUEST_DATA_STREAM => "REQUEST_DATA_STREAM",
        COMMAND_LONG => "COMMAND_LONG",
        COMMAND_ACK => "COMMAND_ACK",
        OPTICAL_FLOW => "OPTICAL_FLOW",
        GLOBAL_VISION_POSITION_ESTIMATE => "GLOBAL_VISION_POSITION_ESTIMATE",
        VISION_POSITION_ESTIMATE => "VISION_POSITION_ESTIMATE",
        VICON_POSITION_ESTIMATE => "VICON_POSITION_ESTIMATE",
        DATA_TRANSMISSION_HANDSHAKE => "DATA_TRANSMISSION_HANDSHAKE",
        ENCAPSULATED_DATA => "ENCAPSULATED_DATA",
        IMAGE_TRIGGERED => "IMAGE_TRIGGERED",
        IMAGE_TRIGGER_CONTROL => "IMAGE_TRIGGER_CONTROL",
        IMAGE_AVAILABLE => "IMAGE_AVAILABLE",
        SET_POSITION_CONTROL_OFFSET => "SET_POSITION_CONTROL_OFFSET",
        POSITION_CONTROL_SETPOINT => "POSITION_CONTROL_SETPOINT",
        DEBUG_VECT => "DEBUG_VECT",
        STATUSTEXT => "STATUSTEXT",
        DEBUG => "DEBUG",
        EXTENDED_MESSAGE => "EXTENDED_MESSAGE",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_seeds() {
        assert_eq!(crc_extra(HEARTBEAT), Some(50));
        assert_eq!(crc_extra(PING), Some(237));
        assert_eq!(crc_extra(ENCAPSULATED_DATA), Some(223));
        assert_eq!(crc_extra(IMAGE_TRIGGERED), None);
    }

    #[test]
    fn names() {
        assert_eq!(name(SYSTEM_TIME), "SYSTEM_TIME");
        assert_eq!(name(EXTENDED_MESSAGE), "EXTENDED_MESSAGE");
        assert_eq!(name(200), "UNKNOWN");
    }
}
