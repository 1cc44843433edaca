//! Simulated pedestrian for driving the guidance loop without a device.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use safepath_core::spatial::heading_deg;
use safepath_core::Vec3;

/// Trait for walk implementations.
pub trait WalkPath: Send + Sync {
    /// Position at time t seconds from start.
    fn position_at(&self, t: f64) -> Vec3;

    /// Approximate heading at time t (degrees, 0 = north).
    fn heading_at(&self, t: f64) -> f64 {
        let dt = 0.1;
        heading_deg(&self.position_at(t), &self.position_at(t + dt))
    }

    fn speed_mps(&self) -> f64;
}

/// Constant-speed walk between two points, stopping at the end.
pub struct StraightWalk {
    pub from: Vec3,
    pub to: Vec3,
    pub speed_mps: f64,
    pub duration: f64,
}

impl StraightWalk {
    pub fn new(from: Vec3, to: Vec3, speed_mps: f64) -> Self {
        let distance = from.horizontal_distance(&to);
        let duration = if speed_mps > 0.0 {
            distance / speed_mps
        } else {
            0.0
        };
        Self {
            from,
            to,
            speed_mps,
            duration,
        }
    }
}

impl WalkPath for StraightWalk {
    fn position_at(&self, t: f64) -> Vec3 {
        if self.duration <= 0.0 {
            return if self.speed_mps > 0.0 { self.to } else { self.from };
        }
        let progress = (t / self.duration).clamp(0.0, 1.0);
        self.from.lerp(&self.to, progress)
    }

    fn heading_at(&self, _t: f64) -> f64 {
        heading_deg(&self.from, &self.to)
    }

    fn speed_mps(&self) -> f64 {
        self.speed_mps
    }
}

/// Walker that heads for whatever target guidance gives it, with a little
/// lateral sway.
pub struct SimulatedWalker {
    position: Vec3,
    heading_deg: f64,
    speed_mps: f64,
    jitter_m: f64,
    rng: StdRng,
}

impl SimulatedWalker {
    pub fn new(start: Vec3, speed_mps: f64, jitter_m: f64, seed: u64) -> Self {
        Self {
            position: start,
            heading_deg: 0.0,
            speed_mps,
            jitter_m,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    /// Walk toward `target` for `dt` seconds.
    pub fn step_toward(&mut self, target: Vec3, dt: f64) -> Vec3 {
        let walk = StraightWalk::new(self.position, target, self.speed_mps);
        let mut next = walk.position_at(dt);
        if self.jitter_m > 0.0 {
            next.x += self.rng.random_range(-self.jitter_m..self.jitter_m);
            next.z += self.rng.random_range(-self.jitter_m..self.jitter_m);
        }
        if walk.duration > 0.0 {
            self.heading_deg = walk.heading_at(dt);
        }
        self.position = next;
        next
    }
}
