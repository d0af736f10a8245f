/// Calendar timestamp as transmitted in the telegram clock block.
///
/// No timezone conversion is done anywhere; deviation (signed minutes from
/// UTC) and the clock status flags are passed through verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockTimestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
    pub deviation: i16,
    pub clock_status: u8,
}

/// Encoded size of the clock block on the wire.
pub const CLOCK_ENCODED_LEN: u8 = 12;

/// One wire-level value: its type tag and the raw value bytes.
///
/// For unsupported tags the byte region is empty; the value counts as
/// present-but-unparsed.
#[derive(Debug, Clone)]
pub struct DataElement {
    pub type_tag: u8,
    pub bytes: Vec<u8>,
}

/// One OBIS parameter: the dot-joined identifier and its value element.
#[derive(Debug, Clone)]
pub struct ObisParameter {
    pub identifier: String,
    pub value: DataElement,
}

/// Decoded result of one telegram.
///
/// Every field starts at its default; a telegram that omits an OBIS code
/// simply leaves the matching field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    pub timestamp: ClockTimestamp,
    pub meter_id: String,
    pub meter_type: String,
    pub active_power_plus: u32,
    pub active_power_minus: u32,
    pub reactive_power_plus: u32,
    pub reactive_power_minus: u32,
    pub l1_current: f32,
    pub l2_current: f32,
    pub l3_current: f32,
    pub l1_voltage: u16,
    pub l2_voltage: u16,
    pub l3_voltage: u16,
}
