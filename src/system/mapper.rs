//! Boundary mapper on top of dead reckoning
//!
//! Localisation is the pose the drive task integrates. The outline itself is
//! recorded by [`Outline`], this module feeds it positions and keeps the last
//! committed map.

use defmt::info;
use heapless::Vec;
use mower_core::outline::Outline;
use mower_core::service::BoundaryMapper;

use crate::system::motion::MOTION_STATUS;

const MAX_POINTS: usize = 512;

pub struct OutlineMapper {
    position: (f32, f32),
    outline: Outline<MAX_POINTS>,
    map: Vec<(f32, f32), MAX_POINTS>,
}

impl OutlineMapper {
    pub const fn new() -> Self {
        Self {
            position: (0.0, 0.0),
            outline: Outline::new(),
            map: Vec::new(),
        }
    }
}

impl BoundaryMapper for OutlineMapper {
    fn update(&mut self) {
        let status = MOTION_STATUS.read();
        self.position = (status.x, status.y);
        self.outline.record(self.position);
    }

    fn clear_outline(&mut self) {
        self.outline.arm();
    }

    fn distribute_particles_along_outline(&mut self) {
        if self.outline.start(self.position) {
            info!("outline started at ({}, {})", self.position.0, self.position.1);
        } else {
            info!("localising against {} map points", self.map.len());
        }
    }

    fn correct_outline(&mut self) {
        self.outline.close();
    }

    fn commit_outline_to_map(&mut self) {
        self.map.clear();
        // both hold at most MAX_POINTS
        let _ = self.map.extend_from_slice(self.outline.points());
        self.outline.finish();
    }

    fn save_map(&mut self) {
        info!(
            "map with {} points, {} m perimeter",
            self.map.len(),
            self.outline.path_length()
        );
    }

    fn robot_position(&self) -> (f32, f32) {
        self.position
    }

    fn distance_to_map_origin(&self, x: f32, y: f32) -> f32 {
        self.outline.distance_to_start((x, y))
    }
}
