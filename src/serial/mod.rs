use crate::config::CONFIG;
use log::{debug, error, info};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::Sender;
use tokio_serial::SerialPortBuilderExt;

/// Byte source for the HAN port.
///
/// The meter transmits a telegram as one burst of bytes followed by silence,
/// so a read pause longer than the configured frame gap delimits a complete
/// telegram. Each complete buffer is forwarded over the channel; the decoder
/// never sees a partial burst.
pub struct SerialManager {
    sender: Sender<Vec<u8>>,
}

impl SerialManager {
    pub fn new(sender: Sender<Vec<u8>>) -> Self {
        Self { sender }
    }

    pub async fn start_thread(&mut self) {
        let serial_config = {
            let c = CONFIG.read().unwrap();
            c.config.serial.clone()
        };

        info!(
            "Opening serial device {} at {} baud",
            serial_config.device, serial_config.baudrate
        );

        // 8N1, matching the HAN port of the meter
        let mut port = match tokio_serial::new(&serial_config.device, serial_config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .open_native_async()
        {
            Ok(port) => port,
            Err(e) => {
                error!(
                    "Unable to open serial device {}: {}",
                    serial_config.device, e
                );
                return;
            }
        };

        let frame_gap = Duration::from_millis(serial_config.frame_gap_ms);
        let mut chunk = [0u8; 1024];
        let mut telegram: Vec<u8> = Vec::new();

        loop {
            match tokio::time::timeout(frame_gap, port.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    error!("Serial device {} closed", serial_config.device);
                    return;
                }
                Ok(Ok(n)) => {
                    telegram.extend_from_slice(&chunk[..n]);
                }
                Ok(Err(e)) => {
                    error!("Error reading from serial device: {}", e);
                }
                Err(_) => {
                    // Inter-frame gap elapsed, forward what was collected
                    if !telegram.is_empty() {
                        debug!("{} bytes received", telegram.len());
                        let complete = std::mem::take(&mut telegram);
                        if self.sender.send(complete).await.is_err() {
                            // Receiver gone, nothing left to feed
                            return;
                        }
                    }
                }
            }
        }
    }
}
