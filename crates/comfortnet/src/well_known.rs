//! Code tables of the CT-485 bus
//!
//! All codes are transparent newtypes with associated constants rather than
//! closed enums: a node on a shared bus sees traffic from devices newer than
//! itself, and an unknown code must survive decoding untouched.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Acknowledgment sentinel, first payload byte of an ACK
pub const R2R_ACK: u8 = 0x06;
/// Negative acknowledgment sentinel
pub const R2R_NACK: u8 = 0x15;

/// Largest payload a frame may carry. Also bounds the node list.
pub const MAX_PAYLOAD_SIZE: usize = 240;

/// Size of the little-endian command header at the start of a
/// `SET_CONTROL_COMMAND` payload
pub const CONTROL_COMMAND_HEADER_SIZE: usize = 2;

#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MessageType(pub u8);

const RESPONSE_BIT: u8 = 0x80;

impl MessageType {
    pub const GET_CONFIGURATION: Self = Self(0x01);
    pub const GET_CONFIGURATION_RESPONSE: Self = Self(0x81);
    pub const GET_STATUS: Self = Self(0x02);
    pub const GET_STATUS_RESPONSE: Self = Self(0x82);
    pub const SET_CONTROL_COMMAND: Self = Self(0x03);
    pub const SET_CONTROL_COMMAND_RESPONSE: Self = Self(0x83);
    pub const SET_DISPLAY_MESSAGE: Self = Self(0x04);
    pub const SET_DISPLAY_MESSAGE_RESPONSE: Self = Self(0x84);
    pub const SET_DIAGNOSTICS: Self = Self(0x05);
    pub const SET_DIAGNOSTICS_RESPONSE: Self = Self(0x85);
    pub const GET_DIAGNOSTICS: Self = Self(0x06);
    pub const GET_DIAGNOSTICS_RESPONSE: Self = Self(0x86);
    pub const GET_SENSOR_DATA: Self = Self(0x07);
    pub const GET_SENSOR_DATA_RESPONSE: Self = Self(0x87);
    pub const SET_IDENTIFICATION: Self = Self(0x0D);
    pub const SET_IDENTIFICATION_RESPONSE: Self = Self(0x8D);
    pub const GET_IDENTIFICATION: Self = Self(0x0E);
    pub const GET_IDENTIFICATION_RESPONSE: Self = Self(0x8E);
    pub const SET_APPLICATION_SHARED_DATA_TO_NETWORK: Self = Self(0x10);
    pub const SET_APPLICATION_SHARED_DATA_TO_NETWORK_RESPONSE: Self = Self(0x90);
    pub const GET_APPLICATION_SHARED_DATA_TO_NETWORK: Self = Self(0x11);
    pub const GET_APPLICATION_SHARED_DATA_TO_NETWORK_RESPONSE: Self = Self(0x91);
    pub const SET_MANUFACTURER_DEVICE_DATA: Self = Self(0x12);
    pub const SET_MANUFACTURER_DEVICE_DATA_RESPONSE: Self = Self(0x92);
    pub const GET_MANUFACTURER_DEVICE_DATA: Self = Self(0x13);
    pub const GET_MANUFACTURER_DEVICE_DATA_RESPONSE: Self = Self(0x93);
    pub const SET_NETWORK_NODE_LIST: Self = Self(0x14);
    pub const SET_NETWORK_NODE_LIST_RESPONSE: Self = Self(0x94);
    pub const DIRECT_MEMORY_ACCESS_READ: Self = Self(0x1D);
    pub const DIRECT_MEMORY_ACCESS_READ_RESPONSE: Self = Self(0x9D);
    pub const DIRECT_MEMORY_ACCESS_READ_RESPONSE_MOTOR: Self = Self(0x1E);
    pub const SET_MANUFACTURER_GENERIC_DATA: Self = Self(0x1F);
    pub const SET_MANUFACTURER_GENERIC_DATA_RESPONSE: Self = Self(0x9F);
    pub const GET_MANUFACTURER_GENERIC_DATA: Self = Self(0x20);
    pub const GET_MANUFACTURER_GENERIC_DATA_RESPONSE: Self = Self(0xA0);
    pub const GET_MANUFACTURER_GENERIC_DATA_RESPONSE_MOTOR: Self = Self(0x21);
    pub const GET_USER_MENU: Self = Self(0x41);
    pub const GET_USER_MENU_RESPONSE: Self = Self(0xC1);
    pub const SET_USER_MENU: Self = Self(0x42);
    pub const SET_USER_MENU_RESPONSE: Self = Self(0xC2);
    pub const SET_FACTORY_SHARED_DATA_TO_APPLICATION: Self = Self(0x43);
    pub const SET_FACTORY_SHARED_DATA_TO_APPLICATION_RESPONSE: Self = Self(0xC3);
    pub const GET_SHARED_DATA_FROM_APPLICATION: Self = Self(0x44);
    pub const GET_SHARED_DATA_FROM_APPLICATION_RESPONSE: Self = Self(0xC4);
    pub const SET_ECHO_DATA: Self = Self(0x5A);
    pub const SET_ECHO_DATA_RESPONSE: Self = Self(0xDA);

    // CT-485 network management
    pub const REQUEST_TO_RECEIVE_RESPONSE: Self = Self(0x00);
    pub const NETWORK_STATE_REQUEST: Self = Self(0x75);
    pub const NETWORK_STATE_REQUEST_RESPONSE: Self = Self(0xF5);
    pub const ADDRESS_CONFIRMATION: Self = Self(0x76);
    pub const ADDRESS_CONFIRMATION_RESPONSE: Self = Self(0xF6);
    pub const TOKEN_OFFER: Self = Self(0x77);
    pub const TOKEN_OFFER_RESPONSE: Self = Self(0xF7);
    pub const VERSION_ANNOUNCEMENT: Self = Self(0x78);
    pub const NODE_DISCOVERY: Self = Self(0x79);
    pub const NODE_DISCOVERY_RESPONSE: Self = Self(0xF9);
    pub const SET_ADDRESS: Self = Self(0x7A);
    pub const SET_ADDRESS_RESPONSE: Self = Self(0xFA);
    pub const GET_NODE_ID: Self = Self(0x7B);
    pub const GET_NODE_ID_RESPONSE: Self = Self(0xFB);
    pub const NETWORK_SHARED_DATA_SECTOR_IMAGE_READ_WRITE_REQUEST: Self = Self(0x7D);
    pub const NETWORK_SHARED_DATA_SECTOR_IMAGE_READ_WRITE_REQUEST_RESPONSE: Self = Self(0xFD);
    pub const NETWORK_ENCAPSULATION_REQUEST: Self = Self(0x7E);
    pub const NETWORK_ENCAPSULATION_REQUEST_RESPONSE: Self = Self(0xFE);

    /// The response variant of this code: `request | 0x80`
    #[inline]
    pub const fn response(self) -> Self {
        Self(self.0 | RESPONSE_BIT)
    }

    /// The request variant of this code: `response & !0x80`
    #[inline]
    pub const fn request(self) -> Self {
        Self(self.0 & !RESPONSE_BIT)
    }

    #[inline]
    pub const fn is_response(self) -> bool {
        self.0 & RESPONSE_BIT != 0
    }

    /// Queries that carry no payload, and so can be synthesized from a poll
    /// registration alone.
    pub fn is_poll_query(self) -> bool {
        matches!(
            self,
            Self::GET_STATUS
                | Self::GET_SENSOR_DATA
                | Self::GET_IDENTIFICATION
                | Self::GET_CONFIGURATION
        )
    }

    /// Responses delivered to packet listeners when seen outside a dataflow
    /// cycle.
    pub fn is_eavesdropped_response(self) -> bool {
        matches!(
            self,
            Self::GET_STATUS_RESPONSE
                | Self::GET_SENSOR_DATA_RESPONSE
                | Self::GET_CONFIGURATION_RESPONSE
                | Self::GET_IDENTIFICATION_RESPONSE
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Control command codes, carried little-endian in the first two bytes of a
/// `SET_CONTROL_COMMAND` payload.
#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct CommandType(pub u16);

impl CommandType {
    pub const HEAT_SET_POINT_TEMPERATURE_MODIFY: Self = Self(0x01);
    pub const COOL_SET_POINT_TEMPERATURE_MODIFY: Self = Self(0x02);
    pub const HEAT_PROFILE_CHANGE: Self = Self(0x03);
    pub const COOL_PROFILE_CHANGE: Self = Self(0x04);
    pub const SYSTEM_SWITCH_MODIFY: Self = Self(0x05);
    pub const PERMANENT_SET_POINT_TEMP_HOLD_MODIFY: Self = Self(0x06);
    pub const FAN_KEY_SELECTION: Self = Self(0x07);
    pub const HOLD_OVERRIDE: Self = Self(0x08);
    pub const BEEPER_ENABLE: Self = Self(0x09);
    pub const FAHRENHEIT_CELSIUS_DISPLAY: Self = Self(0x0C);
    pub const COMFORT_RECOVERY_MODIFY: Self = Self(0x0E);
    pub const REAL_TIME_DAY_OVERRIDE: Self = Self(0x0F);
    pub const CHANGE_FILTER_TIME_REMAINING: Self = Self(0x14);
    pub const VACATION_MODE: Self = Self(0x15);
    pub const HIGH_ALARM_LIMIT_CHANGE: Self = Self(0x16);
    pub const LOW_ALARM_LIMIT_CHANGE: Self = Self(0x17);
    pub const HIGH_OUTDOOR_ALARM_LIMIT_CHANGE: Self = Self(0x18);
    pub const LOW_OUTDOOR_ALARM_LIMIT_CHANGE: Self = Self(0x19);
    pub const TEMP_DISPLAY_ADJ_FACTOR_CHANGE: Self = Self(0x1A);
    pub const CLEAR_COMPRESSOR_RUN_TIME: Self = Self(0x2D);
    pub const RESET_CONTROL: Self = Self(0x31);
    pub const COMPRESSOR_LOCKOUT: Self = Self(0x33);
    pub const HOLD_RELEASE: Self = Self(0x3D);
    pub const PROGRAM_INTERVAL_TYPE_MODIFICATION: Self = Self(0x3E);
    pub const COMMUNICATIONS_RECEIVER_ON_OFF: Self = Self(0x3F);
    pub const FORCE_PHONE_NUMBER_DISPLAY: Self = Self(0x40);
    pub const RESTORE_FACTORY_DEFAULTS: Self = Self(0x45);
    pub const CUSTOM_MESSAGE_AREA_DISPLAY_DATA: Self = Self(0x46);
    pub const SET_POINT_TEMP_AND_TEMPORARY_HOLD: Self = Self(0x47);
    pub const CONTINUOUS_DISPLAY_LIGHT: Self = Self(0x48);
    pub const ADVANCE_REAL_TIME_DAY_OVERRIDE: Self = Self(0x4E);
    pub const KEYPAD_LOCKOUT: Self = Self(0x4F);
    pub const TEST_MODE: Self = Self(0x50);
    pub const SUBSYSTEM_INSTALLATION_TEST: Self = Self(0x51);
    pub const SET_POINT_TEMP_TEMPORARY_HOLD: Self = Self(0x53);
    pub const COMFORT_MODE_MODIFICATION: Self = Self(0x55);
    pub const LIMITED_HEAT_AND_COOL_RANGE: Self = Self(0x56);
    pub const AUTO_PAIRING_REQUEST: Self = Self(0x57);
    pub const PAIRING_OWNERSHIP_REQUEST: Self = Self(0x58);
    pub const REVERSING_VALVE_CONFIG: Self = Self(0x59);
    pub const DEHUM_HUM_CONFIG: Self = Self(0x5A);
    pub const CHANGE_UV_LIGHT_MAINTENANCE_TIMER: Self = Self(0x5B);
    pub const CHANGE_HUMIDIFIER_PAD_MAINT_TIMER: Self = Self(0x5C);
    pub const DEHUMIDIFICATION_SET_POINT_MODIFY: Self = Self(0x5D);
    pub const HUMIDIFICATION_SET_POINT_MODIFY: Self = Self(0x5E);
    pub const DAMPER_CLOSURE_POSITION_DEMAND: Self = Self(0x60);
    pub const SUBSYSTEM_BUSY_STATUS: Self = Self(0x61);
    pub const DEHUMIDIFICATION_DEMAND: Self = Self(0x62);
    pub const HUMIDIFICATION_DEMAND: Self = Self(0x63);
    pub const HEAT_DEMAND: Self = Self(0x64);
    pub const COOL_DEMAND: Self = Self(0x65);
    pub const FAN_DEMAND: Self = Self(0x66);
    pub const BACK_UP_HEAT_DEMAND: Self = Self(0x67);
    pub const DEFROST_HEAT_DEMAND: Self = Self(0x68);
    pub const AUX_HEAT_DEMAND: Self = Self(0x69);
    pub const SET_MOTOR_SPEED: Self = Self(0x6A);
    pub const SET_MOTOR_TORQUE: Self = Self(0x6B);
    pub const SET_AIRFLOW_DEMAND: Self = Self(0x6C);
    pub const SET_CONTROL_MODE: Self = Self(0x6D);
    pub const SET_DEMAND_RAMP_RATE: Self = Self(0x6E);
    pub const SET_MOTOR_DIRECTION: Self = Self(0x6F);
    pub const SET_MOTOR_TORQUE_PERCENT: Self = Self(0x70);
    pub const SET_MOTOR_POSITION_DEMAND: Self = Self(0x71);
    pub const SET_BLOWER_COEFFICIENT_1: Self = Self(0x72);
    pub const SET_BLOWER_COEFFICIENT_2: Self = Self(0x73);
    pub const SET_BLOWER_COEFFICIENT_3: Self = Self(0x74);
    pub const SET_BLOWER_COEFFICIENT_4: Self = Self(0x75);
    pub const SET_BLOWER_COEFFICIENT_5: Self = Self(0x76);
    pub const SET_BLOWER_IDENTIFICATION_0: Self = Self(0x77);
    pub const SET_BLOWER_IDENTIFICATION_1: Self = Self(0x78);
    pub const SET_BLOWER_IDENTIFICATION_2: Self = Self(0x79);
    pub const SET_BLOWER_IDENTIFICATION_3: Self = Self(0x7A);
    pub const SET_BLOWER_IDENTIFICATION_4: Self = Self(0x7B);
    pub const SET_BLOWER_IDENTIFICATION_5: Self = Self(0x7C);
    pub const SET_SPEED_LIMIT: Self = Self(0x7F);
    pub const SET_TORQUE_LIMIT: Self = Self(0x80);
    pub const SET_AIRFLOW_LIMIT: Self = Self(0x81);
    pub const SET_POWER_OUTPUT_LIMIT: Self = Self(0x82);
    pub const SET_DEVICE_TEMPERATURE_LIMIT: Self = Self(0x83);
    pub const STOP_MOTOR_BY_BRAKING: Self = Self(0x85);
    pub const RUN_STOP_MOTOR: Self = Self(0x86);
    pub const SET_DEMAND_RAMP_TIME: Self = Self(0x88);
    pub const SET_INDUCER_RAMP_RATE: Self = Self(0x89);
    pub const SET_BLOWER_COEFFICIENT_6: Self = Self(0x8A);
    pub const SET_BLOWER_COEFFICIENT_7: Self = Self(0x8B);
    pub const SET_BLOWER_COEFFICIENT_8: Self = Self(0x8C);
    pub const SET_BLOWER_COEFFICIENT_9: Self = Self(0x8D);
    pub const SET_BLOWER_COEFFICIENT_10: Self = Self(0x8E);
    pub const PUBLISH_PRICE: Self = Self(0xE0);
    pub const WATER_HEATER_MODIFY: Self = Self(0xF0);

    #[inline]
    pub const fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    #[inline]
    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Device classes, from the node type table
#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct NodeType(pub u8);

impl NodeType {
    /// Wildcard for addressing purposes, not a valid device type
    pub const ANY: Self = Self(0x00);
    pub const THERMOSTAT: Self = Self(0x01);
    pub const GAS_FURNACE: Self = Self(0x02);
    pub const AIR_HANDLER: Self = Self(0x03);
    pub const AIR_CONDITIONER: Self = Self(0x04);
    pub const HEAT_PUMP: Self = Self(0x05);
    pub const ELECTRIC_FURNACE: Self = Self(0x06);
    pub const PACKAGE_SYSTEM_GAS: Self = Self(0x07);
    pub const PACKAGE_SYSTEM_ELECTRIC: Self = Self(0x08);
    pub const CROSSOVER: Self = Self(0x09);
    pub const SECONDARY_COMPRESSOR: Self = Self(0x0A);
    pub const AIR_EXCHANGER: Self = Self(0x0B);
    pub const UNITARY_CONTROL: Self = Self(0x0C);
    pub const DEHUMIDIFIER: Self = Self(0x0D);
    pub const ELECTRONIC_AIR_CLEANER: Self = Self(0x0E);
    pub const ERV: Self = Self(0x0F);
    pub const HUMIDIFIER_EVAPORATIVE: Self = Self(0x10);
    pub const HUMIDIFIER_STEAM: Self = Self(0x11);
    pub const HRV: Self = Self(0x12);
    pub const IAQ_ANALYZER: Self = Self(0x13);
    pub const MEDIA_AIR_CLEANER: Self = Self(0x14);
    pub const ZONE_CONTROL: Self = Self(0x15);
    pub const ZONE_USER_INTERFACE: Self = Self(0x16);
    pub const BOILER: Self = Self(0x17);
    pub const WATER_HEATER_GAS: Self = Self(0x18);
    pub const WATER_HEATER_ELECTRIC: Self = Self(0x19);
    pub const WATER_HEATER_COMMERCIAL: Self = Self(0x1A);
    pub const POOL_HEATER: Self = Self(0x1B);
    pub const CEILING_FAN: Self = Self(0x1C);
    pub const GATEWAY: Self = Self(0x1D);
    pub const DIAGNOSTIC_DEVICE: Self = Self(0x1E);
    pub const LIGHTING_CONTROL: Self = Self(0x1F);
    pub const SECURITY_SYSTEM: Self = Self(0x20);
    pub const UV_LIGHT: Self = Self(0x21);
    pub const WEATHER_DATA_DEVICE: Self = Self(0x22);
    pub const WHOLE_HOUSE_FAN: Self = Self(0x23);
    pub const SOLAR_INVERTER: Self = Self(0x24);
    pub const ZONE_DAMPER: Self = Self(0x25);
    pub const ZONE_TEMPERATURE_CONTROL: Self = Self(0x26);
    pub const TEMPERATURE_SENSOR: Self = Self(0x27);
    pub const OCCUPANCY_SENSOR: Self = Self(0x28);
    pub const NETWORK_COORDINATOR: Self = Self(0xA5);

    /// Whether an offer or query naming `self` applies to a node of type `ours`
    #[inline]
    pub fn matches(self, ours: NodeType) -> bool {
        self == Self::ANY || self == ours
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// How the coordinator should route a frame
#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct SendMethod(pub u8);

impl SendMethod {
    /// Talking to direct neighbors
    pub const NO_ROUTE: Self = Self(0x00);
    /// Forwarded to the best node for the control command in send parameter 1
    pub const CONTROL_COMMAND: Self = Self(0x01);
    /// Forwarded to the best node of the type in send parameter 1
    pub const NODE_TYPE: Self = Self(0x02);
    /// Forwarded to the node at the node list position in send parameter 1
    pub const NODE_ID: Self = Self(0x03);
}

/// Send parameter 1 values for [`SendMethod::CONTROL_COMMAND`]
#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ControlCommandRoute(pub u8);

impl ControlCommandRoute {
    pub const HEAT: Self = Self(0x64);
    pub const COOL: Self = Self(0x65);
    pub const FAN: Self = Self(0x66);
    pub const EMERGENCY: Self = Self(0x67);
    pub const DEFROST: Self = Self(0x68);
    pub const AUX_HEAT: Self = Self(0x69);
}
