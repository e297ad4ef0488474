//! Control loop
//!
//! Owns the mower controller and its scheduler. The scheduler is polled every
//! millisecond and decides itself which of the orientation, control and
//! telemetry blocks are due. Operator commands are applied between polls.

use defmt::{info, warn};
use embassy_time::{Duration, Instant, Ticker};
use mower_core::service::AlarmKind;
use mower_core::{Controller, ControllerConfig, Scheduler};

use crate::system::command;
use crate::system::platform::{DefmtTelemetry, EmbassyClock, MowerPlatform};
use crate::system::sensors::ALARM;

/// Scheduler poll period
const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[embassy_executor::task]
pub async fn control_loop() {
    let config = ControllerConfig::default();
    // boot timing jitter is the only entropy available this early
    let seed = Instant::now().as_ticks() ^ 0x9E37_79B9_7F4A_7C15;

    let mut controller = match Controller::new(config, MowerPlatform::new(seed)) {
        Ok(controller) => controller,
        Err(e) => {
            warn!("invalid controller configuration: {}", e);
            return;
        }
    };
    let mut scheduler = Scheduler::new(EmbassyClock, config.scheduler);
    let mut telemetry = DefmtTelemetry;

    info!("controller ready");
    ALARM.signal(AlarmKind::Ready);

    let mut ticker = Ticker::every(POLL_INTERVAL);
    loop {
        while let Some(next) = command::try_receive() {
            info!("command {}", next);
            controller.apply(next);
        }
        scheduler.poll(&mut controller, &mut telemetry);
        ticker.next().await;
    }
}
