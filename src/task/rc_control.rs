//! RC button handling
//!
//! Debounces the four remote control buttons and turns presses and holds
//! into controller commands:
//!
//! | Button | Press | Hold |
//! |---|---|---|
//! | A | lane mowing | map the boundary, then lanes |
//! | B | random mowing | track the wire clockwise |
//! | C | stop | calibrate gyro |
//! | D | remote control | track the wire counter-clockwise |

use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{Input, Level, Pull};
use embassy_time::{Duration, Timer};
use mower_core::{Command, MowPattern};

use crate::system::command;
use crate::system::resources::{RCResourcesA, RCResourcesB, RCResourcesC, RCResourcesD};

/// Button hold threshold (ms)
const HOLD_DURATION: Duration = Duration::from_millis(700);

/// Button debounce delay (ms)
const DEBOUNCE_DURATION: Duration = Duration::from_millis(30);

/// Commands bound to one button: (press, hold)
type Binding = (Command, Command);

/// Button A handler
#[embassy_executor::task]
pub async fn rc_button_a_handle(r: RCResourcesA) {
    let mut btn = Input::new(r.btn_a, Pull::Down);
    handle_button(
        &mut btn,
        (Command::StartLaneMowing, Command::StartMappingThen(MowPattern::Lanes)),
    )
    .await;
}

/// Button B handler
#[embassy_executor::task]
pub async fn rc_button_b_handle(r: RCResourcesB) {
    let mut btn = Input::new(r.btn_b, Pull::Down);
    handle_button(
        &mut btn,
        (Command::StartRandomMowing, Command::StartTracking { clockwise: true }),
    )
    .await;
}

/// Button C handler
#[embassy_executor::task]
pub async fn rc_button_c_handle(r: RCResourcesC) {
    let mut btn = Input::new(r.btn_c, Pull::Down);
    handle_button(&mut btn, (Command::Stop, Command::CalibrateGyro)).await;
}

/// Button D handler
#[embassy_executor::task]
pub async fn rc_button_d_handle(r: RCResourcesD) {
    let mut btn = Input::new(r.btn_d, Pull::Down);
    handle_button(
        &mut btn,
        (Command::RemoteControl, Command::StartTracking { clockwise: false }),
    )
    .await;
}

/// Processes button input and sends the bound command
///
/// A short press sends the press command, holding past [`HOLD_DURATION`]
/// sends the hold command once the hold starts.
async fn handle_button(button: &mut Input<'static>, (press, hold): Binding) {
    loop {
        let init_level = debounce(button).await;

        if init_level != Level::High {
            continue;
        };

        match select(Timer::after(HOLD_DURATION), debounce(button)).await {
            Either::First(()) => {
                command::send(hold).await;
                button.wait_for_low().await;
            }
            Either::Second(_) => {
                command::send(press).await;
            }
        };
    }
}

/// Ensures stable button state
async fn debounce(button: &mut Input<'static>) -> Level {
    loop {
        let st_level = button.get_level();
        button.wait_for_any_edge().await;
        Timer::after(DEBOUNCE_DURATION).await;
        let end_level = button.get_level();
        if st_level != end_level {
            break end_level;
        }
    }
}
