//! Boundary outline recording
//!
//! The outline starts at the point where the robot first meets the wire and
//! is sampled every [`POINT_SPACING_M`] while the robot follows it. The loop
//! can close only after [`MIN_LOOP_LENGTH_M`] of wire, otherwise the start
//! point itself would close it immediately.
//!
//! Storage is bounded. Once it is full the outline keeps measuring the path
//! and keeps reporting the distance to its start point, it just stops storing
//! new points. One slot stays free for the closing point.

use heapless::Vec;

/// Distance between recorded outline points (m)
pub const POINT_SPACING_M: f32 = 0.25;

/// Shortest wire run that may close the loop (m)
pub const MIN_LOOP_LENGTH_M: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Recording {
    Off,
    /// Cleared, waiting for the first wire contact
    Armed,
    On,
}

/// Bounded boundary outline of at most `N` points
#[derive(Debug, Clone)]
pub struct Outline<const N: usize> {
    points: Vec<(f32, f32), N>,
    last_sample: (f32, f32),
    path_length: f32,
    recording: Recording,
    full: bool,
}

impl<const N: usize> Default for Outline<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Outline<N> {
    pub const fn new() -> Self {
        Self {
            points: Vec::new(),
            last_sample: (0.0, 0.0),
            path_length: 0.0,
            recording: Recording::Off,
            full: false,
        }
    }

    /// Drops the stored outline and waits for [`Outline::start`]
    pub fn arm(&mut self) {
        self.points.clear();
        self.path_length = 0.0;
        self.full = false;
        self.recording = Recording::Armed;
    }

    /// Starts recording at `position` if armed, returns whether it did
    pub fn start(&mut self, position: (f32, f32)) -> bool {
        if self.recording != Recording::Armed {
            return false;
        }
        self.points.clear();
        let _ = self.points.push(position);
        self.last_sample = position;
        self.recording = Recording::On;
        true
    }

    /// Samples the robot position while recording
    pub fn record(&mut self, position: (f32, f32)) {
        if self.recording != Recording::On {
            return;
        }
        let step = distance(self.last_sample, position);
        if step < POINT_SPACING_M {
            return;
        }
        self.path_length += step;
        self.last_sample = position;
        if self.full {
            return;
        }
        if self.points.len() + 1 >= N {
            warn!("outline full at {} points, only the path length is tracked now", self.points.len());
            self.full = true;
            return;
        }
        let _ = self.points.push(position);
    }

    /// Appends the start point so the stored outline is a closed ring
    pub fn close(&mut self) {
        if let Some(&first) = self.points.first() {
            if self.points.last() != Some(&first) {
                let _ = self.points.push(first);
            }
        }
    }

    /// Stops recording and leaves the stored points as they are
    pub fn finish(&mut self) {
        self.recording = Recording::Off;
    }

    /// Distance from `position` to the start point, `f32::MAX` while the loop cannot close
    pub fn distance_to_start(&self, position: (f32, f32)) -> f32 {
        match self.points.first() {
            Some(&origin) if self.recording == Recording::On && self.path_length >= MIN_LOOP_LENGTH_M => {
                distance(origin, position)
            }
            _ => f32::MAX,
        }
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Wire length followed since the start point (m)
    pub fn path_length(&self) -> f32 {
        self.path_length
    }

    pub fn is_recording(&self) -> bool {
        self.recording == Recording::On
    }

    pub fn is_full(&self) -> bool {
        self.full
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    libm::hypotf(b.0 - a.0, b.1 - a.1)
}
