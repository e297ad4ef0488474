//! Buzzer Module
//!
//! Plays a short tone sequence on the piezo buzzer for each alarm the
//! controller raises. A new alarm interrupts the sequence in progress.

use defmt::info;
use embassy_futures::select::{select, Either};
use embassy_rp::pwm::{self, Pwm};
use embassy_time::{Duration, Timer};
use mower_core::service::AlarmKind;

use crate::system::resources::BuzzerResources;
use crate::system::sensors::ALARM;

/// One step of a tone sequence: frequency (0 = silence) and length
type Tone = (u32, u64);

const READY: &[Tone] = &[(1_000, 100), (0, 50), (1_500, 100)];
const WIRE_TIMEOUT: &[Tone] = &[(800, 300), (0, 150), (800, 300), (0, 150), (800, 300)];
const TILT: &[Tone] = &[(2_500, 600), (0, 100), (2_500, 600)];

fn melody(kind: AlarmKind) -> &'static [Tone] {
    match kind {
        AlarmKind::Ready => READY,
        AlarmKind::WireTimeout => WIRE_TIMEOUT,
        AlarmKind::Tilt => TILT,
    }
}

/// PWM settings for a square wave at `freq_hz`, silent for 0
fn tone_config(freq_hz: u32) -> pwm::Config {
    let mut config = pwm::Config::default();
    if freq_hz == 0 {
        config.compare_a = 0;
        return config;
    }
    let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();

    // Calculate minimum divider needed to keep period under 16-bit limit (65535)
    let divider = ((clock_freq_hz / freq_hz) / 65535 + 1) as u8;
    let period = (clock_freq_hz / (freq_hz * divider as u32)) as u16 - 1;

    config.divider = divider.into();
    config.top = period;
    config.compare_a = period / 2;
    config
}

#[embassy_executor::task]
pub async fn alarm(r: BuzzerResources) {
    let mut buzzer = Pwm::new_output_a(r.slice, r.pin, tone_config(0));
    let mut pending = None;

    loop {
        let kind = match pending.take() {
            Some(kind) => kind,
            None => ALARM.wait().await,
        };
        info!("alarm {}", kind);

        for &(freq_hz, length_ms) in melody(kind) {
            buzzer.set_config(&tone_config(freq_hz));
            if let Either::Second(next) = select(Timer::after(Duration::from_millis(length_ms)), ALARM.wait()).await {
                pending = Some(next);
                break;
            }
        }
        buzzer.set_config(&tone_config(0));
    }
}
