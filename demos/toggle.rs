//! This example flips a Bot on and then off again.
//! The path to an accessory config JSON should be given as a command line argument.

use std::sync::Arc;

use switchbot_bot::{Accessory, BleTransport, BotConfig, CharacteristicSink, HapStatus};
use tokio::time::{sleep, Duration};

struct PrintSink;

impl CharacteristicSink for PrintSink {
    fn update_on(&self, value: bool) {
        println!("Switch is now {}", if value { "ON" } else { "OFF" });
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).expect("Expected config path");
    pretty_env_logger::init();

    let config = BotConfig::from_path(path)?;
    let accessory = Accessory::new(&config, Arc::new(BleTransport::new()), Arc::new(PrintSink))?;

    println!("{:?}", accessory.information());
    println!("Mode: {:?}", accessory.bot().mode());

    for value in [true, false] {
        match accessory.handle_set_on(value).await {
            HapStatus::Success => println!("Set to {}", value),
            status => println!("Failed to set {}: {:?}", value, status),
        }
        sleep(Duration::from_secs(2)).await;
    }

    println!("Battery: {}%", accessory.handle_get_battery_level());
    println!("Low battery: {:?}", accessory.handle_get_status_low_battery());

    accessory.bot().shutdown().await;

    Ok(())
}
