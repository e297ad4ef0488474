//! Perimeter coil sampling
//!
//! Each coil feeds a demodulating amplifier whose output sits at mid-rail
//! without signal, swings low inside the loop and high outside. The task
//! samples both coils through the shared ADC, median-filters them and
//! publishes the signed magnitudes together with the inside decision.
//!
//! # Timeout
//! When neither coil reported inside for [`NOT_INSIDE_TIMEOUT`], the signal is
//! considered lost (wire cut, sender off, robot left the area). The control
//! loop restarts the window after a gyro calibration.

use embassy_futures::select::{select, Either};
use embassy_rp::{adc::Channel, gpio::Pull};
use embassy_time::{Duration, Instant, Ticker, Timer};
use moving_median::MovingMedian;

use crate::system::error::{self, SensorError};
use crate::system::resources::{get_adc, PerimeterResources};
use crate::system::sensors::{WireReading, WIRE, WIRE_TIMEOUT_RESET};

/// Time between coil samples
const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// ADC count of the amplifier output without signal (mid-rail, 12 bit)
const ADC_MIDPOINT: f32 = 2048.0;

/// Magnitude beyond which a coil reading counts as inside (ADC counts)
const INSIDE_THRESHOLD: f32 = 50.0;

/// Maximum time without any inside reading
const NOT_INSIDE_TIMEOUT: Duration = Duration::from_secs(15);

/// Median filter window, long enough to drop single PWM spikes
const MEDIAN_WINDOW_SIZE: usize = 5;

/// Signed magnitude, negative inside
fn magnitude(raw: u16) -> f32 {
    f32::from(raw) - ADC_MIDPOINT
}

fn is_inside(magnitude: f32) -> bool {
    magnitude < -INSIDE_THRESHOLD
}

async fn sample(channel: &mut Channel<'static>) -> Result<u16, SensorError> {
    let mut adc_guard = get_adc().lock().await;
    let adc = adc_guard.as_mut().ok_or(SensorError::AdcUnavailable)?;
    adc.read(channel).await.map_err(|_| SensorError::Adc)
}

#[embassy_executor::task]
pub async fn perimeter_read(r: PerimeterResources) {
    let mut left_channel = Channel::new_pin(r.left_coil_pin, Pull::None);
    let mut right_channel = Channel::new_pin(r.right_coil_pin, Pull::None);

    let mut left_filter = MovingMedian::<f32, MEDIAN_WINDOW_SIZE>::new();
    let mut right_filter = MovingMedian::<f32, MEDIAN_WINDOW_SIZE>::new();

    // Initial delay to let the amplifiers settle
    Timer::after(Duration::from_millis(500)).await;

    let mut last_inside = Instant::now();
    let mut ticker = Ticker::every(SAMPLE_INTERVAL);

    loop {
        // reset first, a sample taken before it would republish the stale timeout
        if let Either::First(()) = select(WIRE_TIMEOUT_RESET.wait(), ticker.next()).await {
            last_inside = Instant::now();
            continue;
        }

        match (sample(&mut left_channel).await, sample(&mut right_channel).await) {
            (Ok(left), Ok(right)) => {
                left_filter.add_value(magnitude(left));
                right_filter.add_value(magnitude(right));
            }
            (Err(e), _) | (_, Err(e)) => {
                error::report(e);
                continue;
            }
        }

        let left = left_filter.median();
        let right = right_filter.median();
        let left_inside = is_inside(left);
        let right_inside = is_inside(right);
        if left_inside || right_inside {
            last_inside = Instant::now();
        }

        WIRE.publish(WireReading {
            left,
            right,
            left_inside,
            right_inside,
            timed_out: last_inside.elapsed() > NOT_INSIDE_TIMEOUT,
        });
    }
}
