//! Environment probes supplied by the host's sensing stack.

use crate::spatial::Vec3;

/// Queries the planner may ask of the physical environment.
///
/// Implemented by the host (physics raycasts, depth maps, ...). Both methods
/// have permissive defaults so a host can implement only what it senses.
pub trait EnvironmentProbe: Send + Sync {
    /// Surface slope in degrees at `position`, or `None` when unknown.
    fn slope_at(&self, _position: Vec3) -> Option<f64> {
        None
    }

    /// Whether the straight walk from `from` to `to` is free of obstacles.
    fn segment_clear(&self, _from: Vec3, _to: Vec3) -> bool {
        true
    }
}

/// Flat, unobstructed floor. Used when the host has no probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFloor;

impl EnvironmentProbe for OpenFloor {}

/// Probe backed by plain closures, handy for hosts and tests.
pub struct FnProbe<S, C>
where
    S: Fn(Vec3) -> Option<f64> + Send + Sync,
    C: Fn(Vec3, Vec3) -> bool + Send + Sync,
{
    slope: S,
    clear: C,
}

impl<S, C> FnProbe<S, C>
where
    S: Fn(Vec3) -> Option<f64> + Send + Sync,
    C: Fn(Vec3, Vec3) -> bool + Send + Sync,
{
    pub fn new(slope: S, clear: C) -> Self {
        Self { slope, clear }
    }
}

impl<S, C> EnvironmentProbe for FnProbe<S, C>
where
    S: Fn(Vec3) -> Option<f64> + Send + Sync,
    C: Fn(Vec3, Vec3) -> bool + Send + Sync,
{
    fn slope_at(&self, position: Vec3) -> Option<f64> {
        (self.slope)(position)
    }

    fn segment_clear(&self, from: Vec3, to: Vec3) -> bool {
        (self.clear)(from, to)
    }
}
