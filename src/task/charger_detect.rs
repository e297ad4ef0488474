//! Charging contact detection
//!
//! Samples the contact sense pin and publishes a debounced state. Leaving the
//! station is reported to the control loop as a command, so the charging mode
//! ends only on a real disconnect.

use defmt::info;
use embassy_rp::gpio::{Input, Pull};
use embassy_time::{Duration, Ticker};
use mower_core::Command;

use crate::system::command;
use crate::system::resources::ChargerResources;
use crate::system::sensors::CHARGER_CONNECTED;

/// Time between sense pin samples
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Equal samples in a row before the state changes
const STABLE_SAMPLES: u8 = 5;

#[embassy_executor::task]
pub async fn charger_detect(r: ChargerResources) {
    let sense = Input::new(r.sense_pin, Pull::Down);
    let mut connected = false;
    let mut stable = 0u8;
    let mut ticker = Ticker::every(SAMPLE_INTERVAL);

    loop {
        ticker.next().await;

        if sense.is_high() == connected {
            stable = 0;
            continue;
        }
        stable += 1;
        if stable < STABLE_SAMPLES {
            continue;
        }

        stable = 0;
        connected = !connected;
        CHARGER_CONNECTED.publish(connected);
        info!("charger {}", if connected { "connected" } else { "disconnected" });
        if !connected {
            command::send(Command::ChargerDisconnected).await;
        }
    }
}
