//! This example listens to a Bot's advertisements and prints what it reports.
//! The device address should be given as a command line argument.

use std::sync::Arc;

use switchbot_bot::common::BOT_MODEL;
use switchbot_bot::{AdvertisementListener, BDAddr, BleTransport, DeviceFilter};
use tokio::time::{sleep, Duration};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address: BDAddr = std::env::args()
        .nth(1)
        .expect("Expected device address")
        .parse()?;
    pretty_env_logger::init();

    let filter = DeviceFilter {
        address,
        model: BOT_MODEL,
        duration: Duration::from_secs(5),
    };
    let transport = Arc::new(BleTransport::new());
    let listener = AdvertisementListener::new(transport, filter, Duration::from_secs(30));
    listener.start_if_idle();

    while listener.is_scanning() {
        sleep(Duration::from_secs(1)).await;
        println!("{:?}", listener.observation());
    }

    listener.stop().await;

    Ok(())
}
