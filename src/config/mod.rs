use lazy_static::lazy_static;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::RwLock;

fn serial_device_default() -> String { return "/dev/ttyUSB0".to_string() }
fn serial_baudrate_default() -> u32 { return 2400 }
fn serial_frame_gap_ms_default() -> u64 { return 500 }

#[derive(Deserialize, Serialize, Clone)]
pub struct SerialConfig {
    #[serde(default="serial_device_default")]
    pub device: String,
    #[serde(default="serial_baudrate_default")]
    pub baudrate: u32,
    /// Read pause that delimits one telegram on the wire
    #[serde(default="serial_frame_gap_ms_default")]
    pub frame_gap_ms: u64,
}

fn influx_url_default() -> String { return "http://localhost:8086".to_string() }
fn influx_database_default() -> String { return "meter".to_string() }
fn influx_measurement_default() -> String { return "data".to_string() }

#[derive(Deserialize, Serialize, Clone)]
pub struct InfluxConfig {
    #[serde(default="influx_url_default")]
    pub url: String,
    #[serde(default="influx_database_default")]
    pub database: String,
    #[serde(default="influx_measurement_default")]
    pub measurement: String,
}

fn serial_default() -> SerialConfig {
    return SerialConfig {
        device: serial_device_default(),
        baudrate: serial_baudrate_default(),
        frame_gap_ms: serial_frame_gap_ms_default(),
    }
}

fn influx_default() -> InfluxConfig {
    return InfluxConfig {
        url: influx_url_default(),
        database: influx_database_default(),
        measurement: influx_measurement_default(),
    }
}

#[derive(Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default="serial_default")]
    pub serial: SerialConfig,
    #[serde(default="influx_default")]
    pub influx: InfluxConfig,
}

impl Default for Config {
    fn default() -> Self {
        return Config {
            serial: serial_default(),
            influx: influx_default(),
        }
    }
}

pub struct ConfigHolder {
    pub config: Config,
}

impl ConfigHolder {
    pub fn load() -> Self {
        let path = std::env::var("HAN2INFLUX_CONFIG").unwrap_or("han2influx.yml".to_string());
        return ConfigHolder {
            config: Self::load_from_path(&path),
        }
    }

    fn load_from_path(path: &str) -> Config {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                info!("No config file at {}, using defaults", path);
                return Config::default();
            }
        };

        match serde_yml::from_str(&contents) {
            Ok(config) => {
                info!("Config loaded from {}", path);
                config
            }
            Err(e) => {
                warn!("Unable to parse config file {}: {}, using defaults", path, e);
                Config::default()
            }
        }
    }

    pub fn get_complete_config(&self) -> Config {
        return self.config.clone();
    }
}

lazy_static! {
    pub static ref CONFIG: RwLock<ConfigHolder> = RwLock::new(ConfigHolder::load());
}
