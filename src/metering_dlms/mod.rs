use log::{debug, warn};
use thiserror::Error;

pub mod reader;
pub mod registry;
pub mod structs;

use reader::TelegramReader;
use registry::{ReadingField, WireKind};
use structs::*;

// Fixed framing constants of the HAN telegram
const PREAMBLE: [u8; 8] = [0x7E, 0xA0, 0xE2, 0x2B, 0x21, 0x13, 0x23, 0x9A];
const INFO_HEADER: [u8; 8] = [0xE6, 0xE7, 0x00, 0x0F, 0x00, 0x00, 0x00, 0x00];
const FRAME_END: u8 = 0x7E;

// Element type tags
const TAG_STRUCTURE: u8 = 0x02;
const TAG_IDENTIFIER: u8 = 0x09;
pub(crate) const TAG_UNSIGNED32: u8 = 0x06;
pub(crate) const TAG_STRING: u8 = 0x0A;
pub(crate) const TAG_UNSIGNED16: u8 = 0x12;

/// Custom error types for DLMS telegram parsing
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlmsParseError {
    #[error("Invalid frame header")]
    InvalidHeader,
    #[error("Invalid information header")]
    InvalidInfoHeader,
    #[error("Invalid clock encoding")]
    InvalidClockEncoding,
    #[error("Invalid structure tag")]
    InvalidStructureTag,
    #[error("Unexpected type tag")]
    UnexpectedTypeTag,
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("Invalid frame end flag")]
    InvalidFrameEnd,
}

/// Decode one complete telegram buffer into a `Reading`.
///
/// The buffer must hold exactly one already-delimited telegram; assembling
/// telegrams out of the serial byte stream is the caller's business. Every
/// call returns a fresh `Reading`, so concurrent decodes on independent
/// buffers cannot interfere. All errors are per-telegram; the caller is
/// expected to log and continue with the next one.
pub fn decode_telegram(buf: &[u8]) -> Result<Reading, DlmsParseError> {
    debug!("Decoding telegram of {} bytes", buf.len());
    let mut reader = TelegramReader::new(buf);
    let mut reading = Reading::default();

    if reader.read_bytes(8)? != PREAMBLE {
        return Err(DlmsParseError::InvalidHeader);
    }
    debug!("Frame header found");

    if reader.read_bytes(8)? != INFO_HEADER {
        return Err(DlmsParseError::InvalidInfoHeader);
    }
    debug!("Information header found");

    reading.timestamp = decode_clock(&mut reader)?;
    debug!("Clock: {:?}", reading.timestamp);

    if reader.read_u8()? != TAG_STRUCTURE {
        return Err(DlmsParseError::InvalidStructureTag);
    }
    let element_count = reader.read_u8()?;
    debug!("Structure with {} elements", element_count);

    // First element is always the version/model identifier string. It is
    // logged for diagnostics but not part of the reading.
    if reader.read_u8()? != TAG_STRING {
        return Err(DlmsParseError::UnexpectedTypeTag);
    }
    let (length, version) = reader.read_length_prefixed_string()?;
    debug!("Version identifier ({}): {}", length, version);

    // Remaining elements come in identifier/value pairs
    for _ in 0..element_count.saturating_sub(1) / 2 {
        if reader.read_u8()? != TAG_IDENTIFIER {
            return Err(DlmsParseError::UnexpectedTypeTag);
        }
        let parameter = decode_obis_parameter(&mut reader)?;
        apply_parameter(&mut reading, &parameter);
    }

    // Frame check sequence is captured but not verified, matching what the
    // deployed meters get away with; see DESIGN.md.
    let fcs = reader.read_bytes(2)?;
    debug!("FCS: {}", hex::encode(fcs));

    if reader.read_u8()? != FRAME_END {
        return Err(DlmsParseError::InvalidFrameEnd);
    }

    Ok(reading)
}

/// Clock block: one declared length byte, then the 12-byte calendar layout.
fn decode_clock(reader: &mut TelegramReader) -> Result<ClockTimestamp, DlmsParseError> {
    let declared_len = reader.read_u8()?;
    if declared_len != CLOCK_ENCODED_LEN {
        return Err(DlmsParseError::InvalidClockEncoding);
    }

    Ok(ClockTimestamp {
        year: reader.read_u16()?,
        month: reader.read_u8()?,
        day: reader.read_u8()?,
        weekday: reader.read_u8()?,
        hour: reader.read_u8()?,
        minute: reader.read_u8()?,
        second: reader.read_u8()?,
        hundredths: reader.read_u8()?,
        deviation: reader.read_u16()? as i16,
        clock_status: reader.read_u8()?,
    })
}

/// One OBIS parameter: the identifier element body plus its value element.
///
/// The identifier tag byte has already been consumed by the caller.
fn decode_obis_parameter(reader: &mut TelegramReader) -> Result<ObisParameter, DlmsParseError> {
    let component_count = reader.read_u8()?;

    let mut identifier = String::new();
    for i in 0..component_count {
        let component = reader.read_u8()?;
        if i > 0 {
            identifier.push('.');
        }
        identifier.push_str(&component.to_string());
    }
    debug!("OBIS identifier: {}", identifier);

    let type_tag = reader.read_u8()?;
    let bytes = match type_tag {
        TAG_UNSIGNED32 => reader.read_bytes(4)?.to_vec(),
        TAG_STRING => reader.read_length_prefixed_bytes()?.to_vec(),
        TAG_UNSIGNED16 => reader.read_bytes(2)?.to_vec(),
        other => {
            // Unsupported value encodings are present-but-unparsed, not errors
            debug!("Unsupported value type tag 0x{:02X} for {}", other, identifier);
            Vec::new()
        }
    };

    Ok(ObisParameter {
        identifier,
        value: DataElement { type_tag, bytes },
    })
}

/// Route one decoded parameter into the reading via the registry.
///
/// Unrecognized identifiers are skipped. When the wire tag disagrees with the
/// registry, the captured bytes are still decoded per the registry's
/// expectation (inherited behavior, see DESIGN.md); a region too short for
/// that leaves the field at its default.
fn apply_parameter(reading: &mut Reading, parameter: &ObisParameter) {
    let Some(entry) = registry::lookup(&parameter.identifier) else {
        debug!("Unknown OBIS identifier {}", parameter.identifier);
        return;
    };

    let element = &parameter.value;
    if element.type_tag != entry.kind.type_tag() {
        warn!(
            "OBIS {} transmitted with type tag 0x{:02X}, registry expects 0x{:02X}",
            parameter.identifier,
            element.type_tag,
            entry.kind.type_tag()
        );
    }

    match entry.kind {
        WireKind::Text => {
            let text = String::from_utf8_lossy(&element.bytes).into_owned();
            set_text_field(reading, entry.field, text);
        }
        WireKind::Unsigned16 | WireKind::Unsigned32 => {
            let mut value_reader = TelegramReader::new(&element.bytes);
            let raw = if entry.kind == WireKind::Unsigned16 {
                value_reader.read_u16().map(u32::from)
            } else {
                value_reader.read_u32()
            };
            match raw {
                Ok(raw) => set_numeric_field(reading, entry.field, raw, entry.scale),
                Err(_) => {
                    warn!(
                        "OBIS {} value region too short for {:?}, field left at default",
                        parameter.identifier, entry.kind
                    );
                }
            }
        }
    }
}

fn set_text_field(reading: &mut Reading, field: ReadingField, text: String) {
    match field {
        ReadingField::MeterId => reading.meter_id = text,
        ReadingField::MeterType => reading.meter_type = text,
        other => warn!("Registry maps a text value onto numeric field {:?}", other),
    }
}

fn set_numeric_field(reading: &mut Reading, field: ReadingField, raw: u32, scale: u32) {
    match field {
        ReadingField::ActivePowerPlus => reading.active_power_plus = raw / scale,
        ReadingField::ActivePowerMinus => reading.active_power_minus = raw / scale,
        ReadingField::ReactivePowerPlus => reading.reactive_power_plus = raw / scale,
        ReadingField::ReactivePowerMinus => reading.reactive_power_minus = raw / scale,
        ReadingField::L1Current => reading.l1_current = raw as f32 / scale as f32,
        ReadingField::L2Current => reading.l2_current = raw as f32 / scale as f32,
        ReadingField::L3Current => reading.l3_current = raw as f32 / scale as f32,
        ReadingField::L1Voltage => reading.l1_voltage = (raw / scale) as u16,
        ReadingField::L2Voltage => reading.l2_voltage = (raw / scale) as u16,
        ReadingField::L3Voltage => reading.l3_voltage = (raw / scale) as u16,
        other => warn!("Registry maps a numeric value onto text field {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION_ID: &[u8] = b"Kamstrup_V0001";

    fn clock_block() -> Vec<u8> {
        // 2023-11-02 (Thursday) 16:32:05.00, +60 min deviation, status 0
        vec![
            0x0C, 0x07, 0xE7, 0x0B, 0x02, 0x04, 0x10, 0x20, 0x05, 0x00, 0x00, 0x3C, 0x00,
        ]
    }

    fn expected_clock() -> ClockTimestamp {
        ClockTimestamp {
            year: 2023,
            month: 11,
            day: 2,
            weekday: 4,
            hour: 16,
            minute: 32,
            second: 5,
            hundredths: 0,
            deviation: 60,
            clock_status: 0,
        }
    }

    /// Assemble a complete telegram around the given identifier/value pairs.
    fn telegram(pairs: &[(&[u8], u8, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&PREAMBLE);
        buf.extend_from_slice(&INFO_HEADER);
        buf.extend_from_slice(&clock_block());
        buf.push(TAG_STRUCTURE);
        buf.push((1 + pairs.len() * 2) as u8);
        buf.push(TAG_STRING);
        buf.push(VERSION_ID.len() as u8);
        buf.extend_from_slice(VERSION_ID);
        for (identifier, tag, value) in pairs {
            buf.push(TAG_IDENTIFIER);
            buf.push(identifier.len() as u8);
            buf.extend_from_slice(identifier);
            buf.push(*tag);
            if *tag == TAG_STRING {
                buf.push(value.len() as u8);
            }
            buf.extend_from_slice(value);
        }
        buf.extend_from_slice(&[0xAB, 0xCD]); // FCS placeholder, not verified
        buf.push(FRAME_END);
        buf
    }

    #[test]
    fn test_decode_single_power_pair() {
        let buf = telegram(&[(
            &[1, 1, 1, 7, 0, 255],
            TAG_UNSIGNED32,
            &[0x00, 0x00, 0x11, 0xF4],
        )]);
        let reading = decode_telegram(&buf).unwrap();
        assert_eq!(
            reading,
            Reading {
                timestamp: expected_clock(),
                active_power_plus: 4596,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_decode_full_telegram() {
        let buf = telegram(&[
            (&[1, 1, 0, 0, 5, 255], TAG_STRING, b"73409942"),
            (&[1, 1, 96, 1, 1, 255], TAG_STRING, b"6841121"),
            (&[1, 1, 1, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x11, 0xF4]),
            (&[1, 1, 2, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x00, 0x00]),
            (&[1, 1, 3, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x00, 0x7B]),
            (&[1, 1, 4, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x01, 0xC8]),
            (&[1, 1, 31, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x03, 0xE8]),
            (&[1, 1, 51, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x00, 0x00]),
            (&[1, 1, 71, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x01, 0x2C]),
            (&[1, 1, 32, 7, 0, 255], TAG_UNSIGNED16, &[0x00, 0xE6]),
            (&[1, 1, 52, 7, 0, 255], TAG_UNSIGNED16, &[0x00, 0xE7]),
            (&[1, 1, 72, 7, 0, 255], TAG_UNSIGNED16, &[0x00, 0xE5]),
        ]);
        let reading = decode_telegram(&buf).unwrap();
        assert_eq!(reading.meter_id, "73409942");
        assert_eq!(reading.meter_type, "6841121");
        assert_eq!(reading.active_power_plus, 4596);
        assert_eq!(reading.active_power_minus, 0);
        assert_eq!(reading.reactive_power_plus, 123);
        assert_eq!(reading.reactive_power_minus, 456);
        assert_eq!(reading.l1_current, 10.0);
        assert_eq!(reading.l2_current, 0.0);
        assert_eq!(reading.l3_current, 3.0);
        assert_eq!(reading.l1_voltage, 230);
        assert_eq!(reading.l2_voltage, 231);
        assert_eq!(reading.l3_voltage, 229);
        assert_eq!(reading.timestamp, expected_clock());
    }

    #[test]
    fn test_decode_is_deterministic() {
        let buf = telegram(&[
            (&[1, 1, 0, 0, 5, 255], TAG_STRING, b"73409942"),
            (&[1, 1, 31, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x03, 0xE8]),
        ]);
        let first = decode_telegram(&buf).unwrap();
        let second = decode_telegram(&buf).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_header() {
        let mut buf = telegram(&[]);
        buf[0] = 0x7F;
        assert_eq!(decode_telegram(&buf), Err(DlmsParseError::InvalidHeader));
    }

    #[test]
    fn test_invalid_info_header() {
        let mut buf = telegram(&[]);
        buf[8] = 0x00;
        assert_eq!(decode_telegram(&buf), Err(DlmsParseError::InvalidInfoHeader));
    }

    #[test]
    fn test_clock_length_mismatch() {
        let mut buf = telegram(&[]);
        buf[16] = 0x0B; // clock declares 11 bytes instead of 12
        assert_eq!(
            decode_telegram(&buf),
            Err(DlmsParseError::InvalidClockEncoding)
        );
    }

    #[test]
    fn test_invalid_structure_tag() {
        let mut buf = telegram(&[]);
        buf[29] = 0x01;
        assert_eq!(
            decode_telegram(&buf),
            Err(DlmsParseError::InvalidStructureTag)
        );
    }

    #[test]
    fn test_invalid_version_element_tag() {
        let mut buf = telegram(&[]);
        buf[31] = TAG_UNSIGNED32;
        assert_eq!(decode_telegram(&buf), Err(DlmsParseError::UnexpectedTypeTag));
    }

    #[test]
    fn test_invalid_identifier_element_tag() {
        let mut buf = telegram(&[(
            &[1, 1, 1, 7, 0, 255],
            TAG_UNSIGNED32,
            &[0x00, 0x00, 0x11, 0xF4],
        )]);
        // First pair starts right after the version element
        let pair_start = 33 + VERSION_ID.len();
        assert_eq!(buf[pair_start], TAG_IDENTIFIER);
        buf[pair_start] = TAG_STRING;
        assert_eq!(decode_telegram(&buf), Err(DlmsParseError::UnexpectedTypeTag));
    }

    #[test]
    fn test_invalid_frame_end() {
        let mut buf = telegram(&[]);
        let last = buf.len() - 1;
        buf[last] = 0x00;
        assert_eq!(decode_telegram(&buf), Err(DlmsParseError::InvalidFrameEnd));
    }

    #[test]
    fn test_truncation_at_every_offset() {
        let buf = telegram(&[
            (&[1, 1, 0, 0, 5, 255], TAG_STRING, b"73409942"),
            (&[1, 1, 1, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x11, 0xF4]),
            (&[1, 1, 32, 7, 0, 255], TAG_UNSIGNED16, &[0x00, 0xE6]),
        ]);
        for end in 0..buf.len() {
            // Never a panic, never a silently successful partial decode
            assert!(decode_telegram(&buf[..end]).is_err(), "offset {}", end);
        }
    }

    #[test]
    fn test_unknown_obis_identifier_is_skipped() {
        let buf = telegram(&[
            (&[1, 1, 99, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x00, 0x2A]),
            (&[1, 1, 1, 7, 0, 255], TAG_UNSIGNED32, &[0x00, 0x00, 0x11, 0xF4]),
        ]);
        let reading = decode_telegram(&buf).unwrap();
        assert_eq!(reading.active_power_plus, 4596);
    }

    #[test]
    fn test_unsupported_value_tag_is_skipped() {
        // Tag 0x0F carries no value bytes; the rest of the telegram still decodes
        let buf = telegram(&[
            (&[1, 1, 1, 7, 0, 255], 0x0F, &[]),
            (&[1, 1, 32, 7, 0, 255], TAG_UNSIGNED16, &[0x00, 0xE6]),
        ]);
        let reading = decode_telegram(&buf).unwrap();
        assert_eq!(reading.active_power_plus, 0);
        assert_eq!(reading.l1_voltage, 230);
    }

    #[test]
    fn test_type_mismatch_decodes_per_registry() {
        // Voltage transmitted as a four-byte unsigned; the registry still
        // reads an unsigned-16 over the captured region
        let buf = telegram(&[(
            &[1, 1, 32, 7, 0, 255],
            TAG_UNSIGNED32,
            &[0x00, 0xE6, 0x00, 0x00],
        )]);
        let reading = decode_telegram(&buf).unwrap();
        assert_eq!(reading.l1_voltage, 230);
    }

    #[test]
    fn test_zero_scaled_current() {
        let buf = telegram(&[(
            &[1, 1, 31, 7, 0, 255],
            TAG_UNSIGNED32,
            &[0x00, 0x00, 0x00, 0x00],
        )]);
        let reading = decode_telegram(&buf).unwrap();
        assert_eq!(reading.l1_current, 0.0);
    }

    #[test]
    fn test_identifier_rendering() {
        let data = [6, 1, 1, 1, 7, 0, 255, TAG_UNSIGNED32, 0, 0, 0, 0];
        let mut reader = TelegramReader::new(&data);
        let parameter = decode_obis_parameter(&mut reader).unwrap();
        assert_eq!(parameter.identifier, "1.1.1.7.0.255");
    }

    #[test]
    fn test_empty_structure() {
        // Version element only, no parameter pairs
        let reading = decode_telegram(&telegram(&[])).unwrap();
        assert_eq!(reading, Reading {
            timestamp: expected_clock(),
            ..Default::default()
        });
    }
}
