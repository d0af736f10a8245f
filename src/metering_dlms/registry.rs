use lazy_static::lazy_static;
use std::collections::HashMap;

/// Wire encoding the registry expects for a mapped identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    Text,
    Unsigned16,
    Unsigned32,
}

impl WireKind {
    /// Type tag this kind is encoded with on the wire.
    pub fn type_tag(&self) -> u8 {
        match self {
            WireKind::Text => super::TAG_STRING,
            WireKind::Unsigned16 => super::TAG_UNSIGNED16,
            WireKind::Unsigned32 => super::TAG_UNSIGNED32,
        }
    }
}

/// Target field in a `Reading` for a mapped identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingField {
    MeterId,
    MeterType,
    ActivePowerPlus,
    ActivePowerMinus,
    ReactivePowerPlus,
    ReactivePowerMinus,
    L1Current,
    L2Current,
    L3Current,
    L1Voltage,
    L2Voltage,
    L3Voltage,
}

/// One registry row: where a decoded value goes and how to decode it.
#[derive(Debug, Clone, Copy)]
pub struct ObisEntry {
    pub field: ReadingField,
    pub kind: WireKind,
    /// Divisor applied to the decoded integer (e.g. 100 for centiamps).
    pub scale: u32,
}

fn entry(field: ReadingField, kind: WireKind, scale: u32) -> ObisEntry {
    ObisEntry { field, kind, scale }
}

lazy_static! {
    static ref OBIS_REGISTRY: HashMap<&'static str, ObisEntry> = {
        use ReadingField::*;
        use WireKind::*;
        let mut map = HashMap::new();

        // Identification
        map.insert("1.1.0.0.5.255", entry(MeterId, Text, 1));
        map.insert("1.1.96.1.1.255", entry(MeterType, Text, 1));

        // Power totals, watts / vars as transmitted
        map.insert("1.1.1.7.0.255", entry(ActivePowerPlus, Unsigned32, 1));
        map.insert("1.1.2.7.0.255", entry(ActivePowerMinus, Unsigned32, 1));
        map.insert("1.1.3.7.0.255", entry(ReactivePowerPlus, Unsigned32, 1));
        map.insert("1.1.4.7.0.255", entry(ReactivePowerMinus, Unsigned32, 1));

        // Phase currents, transmitted in centiamps
        map.insert("1.1.31.7.0.255", entry(L1Current, Unsigned32, 100));
        map.insert("1.1.51.7.0.255", entry(L2Current, Unsigned32, 100));
        map.insert("1.1.71.7.0.255", entry(L3Current, Unsigned32, 100));

        // Phase voltages, volts as transmitted
        map.insert("1.1.32.7.0.255", entry(L1Voltage, Unsigned16, 1));
        map.insert("1.1.52.7.0.255", entry(L2Voltage, Unsigned16, 1));
        map.insert("1.1.72.7.0.255", entry(L3Voltage, Unsigned16, 1));

        map
    };
}

/// Exact-match lookup on the canonical dot-joined identifier.
pub fn lookup(identifier: &str) -> Option<&'static ObisEntry> {
    OBIS_REGISTRY.get(identifier)
}
