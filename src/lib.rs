//! Decode DLMS/HDLC telegrams from a utility meter HAN port and push the
//! measurements to InfluxDB.
//!
//! The decoder itself is a pure function from one telegram buffer to a
//! `Reading`; the serial byte source and the InfluxDB sink live around it.

pub mod config;
pub mod influx;
pub mod metering_dlms;
pub mod serial;

// Re-export common types for easier access
pub use config::CONFIG;
pub use influx::InfluxSink;
pub use metering_dlms::structs::Reading;
pub use metering_dlms::{decode_telegram, DlmsParseError};
pub use serial::SerialManager;
