use han2influx::{decode_telegram, InfluxSink, SerialManager, CONFIG};
use log::{debug, error, info};
use std::time::Duration;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    let default_filter = std::env::var("HAN2INFLUX_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let config = {
        let c = CONFIG.read().unwrap();
        c.get_complete_config()
    };

    // Complete telegram buffers travel from the serial reader to the decode loop
    let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<u8>>(10);

    let mut threads: Vec<JoinHandle<()>> = Vec::new();

    let mut serial = SerialManager::new(tx);
    threads.push(tokio::spawn(async move {
        serial.start_thread().await;
    }));

    let sink = InfluxSink::new(
        &config.influx.url,
        &config.influx.database,
        &config.influx.measurement,
    );
    threads.push(tokio::spawn(async move {
        while let Some(telegram) = rx.recv().await {
            debug!("Telegram: {}", hex::encode(&telegram));
            match decode_telegram(&telegram) {
                Ok(reading) => {
                    info!("Decoded reading for meter {}", reading.meter_id);
                    sink.publish(&reading).await;
                }
                Err(e) => {
                    // One malformed telegram must not abort the stream
                    error!("Error decoding telegram: {}", e);
                }
            }
        }
    }));

    info!("All modules started, now waiting for a signal to exit");
    loop {
        tokio::time::sleep(Duration::from_secs(10)).await;
        let mut kill_all_tasks = false;
        for task in threads.iter() {
            if task.is_finished() {
                kill_all_tasks = true;
            }
        }

        if kill_all_tasks == true {
            for task in threads.iter_mut() {
                task.abort();
            }
            break;
        }
    }
    Ok(())
}
