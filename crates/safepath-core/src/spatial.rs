//! Spatial math for planning and guidance.
//!
//! Coordinates follow the host's AR frame: x east, y up, z north. Planning
//! happens on the horizontal (x, z) plane; y only carries the floor height.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Points closer than this are treated as coincident.
pub const EPSILON: f64 = 1e-9;

/// A point or direction in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        (*other - *self).length()
    }

    /// Distance on the walking plane, ignoring height.
    pub fn horizontal_distance(&self, other: &Vec3) -> f64 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Linear interpolation; `t = 0` yields `self`, `t = 1` yields `other`.
    pub fn lerp(&self, other: &Vec3, t: f64) -> Vec3 {
        *self + (*other - *self) * t
    }

    pub fn midpoint(&self, other: &Vec3) -> Vec3 {
        self.lerp(other, 0.5)
    }

    /// Same point with the height replaced.
    pub fn with_y(self, y: f64) -> Vec3 {
        Vec3 { y, ..self }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Compass heading from `from` to `to` in degrees (0 = north/+z, 90 = east/+x).
pub fn heading_deg(from: &Vec3, to: &Vec3) -> f64 {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    if dx.abs() < EPSILON && dz.abs() < EPSILON {
        return 0.0;
    }
    let heading = dx.atan2(dz).to_degrees();
    if heading < 0.0 {
        heading + 360.0
    } else {
        heading
    }
}

/// Normalize an angle in degrees to [-180, 180].
pub fn normalize_deg(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a < -180.0 {
        a += 360.0;
    }
    a
}

/// Signed direction change at `b` when walking `a -> b -> c`, in degrees.
///
/// Positive values are right (clockwise seen from above) turns. Returns `None`
/// when either leg has no horizontal length.
pub fn signed_turn_deg(a: &Vec3, b: &Vec3, c: &Vec3) -> Option<f64> {
    if a.horizontal_distance(b) < EPSILON || b.horizontal_distance(c) < EPSILON {
        return None;
    }
    Some(normalize_deg(heading_deg(b, c) - heading_deg(a, b)))
}

/// Absolute direction change at `b`, 0 when degenerate.
pub fn turn_angle_deg(a: &Vec3, b: &Vec3, c: &Vec3) -> f64 {
    signed_turn_deg(a, b, c).map(f64::abs).unwrap_or(0.0)
}

/// Closest point on segment `a-b` to `p` on the horizontal plane, as the
/// segment parameter in [0, 1].
pub fn closest_param_on_segment(p: &Vec3, a: &Vec3, b: &Vec3) -> f64 {
    let abx = b.x - a.x;
    let abz = b.z - a.z;
    let len2 = abx * abx + abz * abz;
    if len2 < EPSILON {
        return 0.0;
    }
    (((p.x - a.x) * abx + (p.z - a.z) * abz) / len2).clamp(0.0, 1.0)
}

/// Horizontal distance from `p` to segment `a-b`.
pub fn point_segment_distance(p: &Vec3, a: &Vec3, b: &Vec3) -> f64 {
    let t = closest_param_on_segment(p, a, b);
    p.horizontal_distance(&a.lerp(b, t))
}

/// Sum of consecutive 3D distances.
pub fn polyline_length(points: &[Vec3]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}
