use crate::metering_dlms::structs::Reading;
use log::{debug, error};

/// InfluxDB sink.
///
/// A reading is rendered as line protocol, one line per numeric field tagged
/// with the meter identifier, and POSTed to the /write endpoint. Publish
/// failures are logged and never stop the decode loop.
pub struct InfluxSink {
    client: reqwest::Client,
    write_url: String,
    measurement: String,
}

impl InfluxSink {
    pub fn new(url: &str, database: &str, measurement: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            write_url: format!("{}/write?db={}", url.trim_end_matches('/'), database),
            measurement: measurement.to_string(),
        }
    }

    /// Render one reading as InfluxDB line protocol.
    pub fn format_lines(&self, reading: &Reading) -> String {
        let m = &self.measurement;
        let meter = &reading.meter_id;
        let mut lines = String::new();
        lines.push_str(&format!("{},meter={} active_power_plus={}\n", m, meter, reading.active_power_plus));
        lines.push_str(&format!("{},meter={} active_power_minus={}\n", m, meter, reading.active_power_minus));
        lines.push_str(&format!("{},meter={} reactive_power_plus={}\n", m, meter, reading.reactive_power_plus));
        lines.push_str(&format!("{},meter={} reactive_power_minus={}\n", m, meter, reading.reactive_power_minus));
        lines.push_str(&format!("{},meter={} l1_current={:.2}\n", m, meter, reading.l1_current));
        lines.push_str(&format!("{},meter={} l2_current={:.2}\n", m, meter, reading.l2_current));
        lines.push_str(&format!("{},meter={} l3_current={:.2}\n", m, meter, reading.l3_current));
        lines.push_str(&format!("{},meter={} l1_voltage={}\n", m, meter, reading.l1_voltage));
        lines.push_str(&format!("{},meter={} l2_voltage={}\n", m, meter, reading.l2_voltage));
        lines.push_str(&format!("{},meter={} l3_voltage={}\n", m, meter, reading.l3_voltage));
        lines
    }

    pub async fn publish(&self, reading: &Reading) {
        let body = self.format_lines(reading);

        let result = self
            .client
            .post(&self.write_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Published reading for meter {}", reading.meter_id);
            }
            Ok(response) => {
                error!("InfluxDB write rejected: {}", response.status());
            }
            Err(e) => {
                error!("InfluxDB write failed: {}", e);
            }
        }
    }
}
