//! Integer arena geometry: points, velocities, bounds and the two movement
//! rules (wall bounce and target approach).
//!
//! Points and bounds are packed into a single `u64` so that a phone can
//! publish its whole position with one atomic store.

use serde::{Deserialize, Serialize};

/// A position in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }

    pub(crate) fn pack(self) -> u64 {
        pack(self.x, self.y)
    }

    pub(crate) fn unpack(bits: u64) -> Self {
        let (x, y) = unpack(bits);
        Self { x, y }
    }
}

/// Per-step displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: i32,
    pub dy: i32,
}

impl Velocity {
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub(crate) fn pack(self) -> u64 {
        pack(self.dx, self.dy)
    }

    pub(crate) fn unpack(bits: u64) -> Self {
        let (dx, dy) = unpack(bits);
        Self { dx, dy }
    }
}

/// Inclusive upper corner of the area a phone may occupy; the lower corner
/// is always the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    pub const fn new(max_x: i32, max_y: i32) -> Self {
        Self { max_x, max_y }
    }

    /// Bounds for a sprite of `sprite_size` inside a `width` x `height` arena.
    pub fn for_arena(width: i32, height: i32, sprite_size: i32) -> Self {
        Self {
            max_x: (width - sprite_size).max(0),
            max_y: (height - sprite_size).max(0),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        (0..=self.max_x).contains(&p.x) && (0..=self.max_y).contains(&p.y)
    }

    pub(crate) fn pack(self) -> u64 {
        pack(self.max_x, self.max_y)
    }

    pub(crate) fn unpack(bits: u64) -> Self {
        let (max_x, max_y) = unpack(bits);
        Self { max_x, max_y }
    }
}

fn pack(a: i32, b: i32) -> u64 {
    (u64::from(a as u32) << 32) | u64::from(b as u32)
}

fn unpack(bits: u64) -> (i32, i32) {
    ((bits >> 32) as u32 as i32, bits as u32 as i32)
}

/// Advances one axis and reflects it off the walls at `0` and `max`.
fn bounce_axis(pos: i32, vel: i32, max: i32) -> (i32, i32) {
    let next = pos.saturating_add(vel);
    if next <= 0 || next >= max {
        (next.clamp(0, max), -vel)
    } else {
        (next, vel)
    }
}

/// One step of free movement. Any axis that touches a wall has its velocity
/// component negated and its coordinate clamped into `bounds`.
pub fn bounce(position: Point, velocity: Velocity, bounds: Bounds) -> (Point, Velocity) {
    let (x, dx) = bounce_axis(position.x, velocity.dx, bounds.max_x);
    let (y, dy) = bounce_axis(position.y, velocity.dy, bounds.max_y);
    (Point::new(x, y), Velocity::new(dx, dy))
}

/// One step toward `target`, at most `speed` per axis.
///
/// Returns `None` once `position` is within `tolerance` of the target on
/// both axes.
pub fn approach(position: Point, target: Point, speed: i32, tolerance: i32) -> Option<Point> {
    let dx = target.x.saturating_sub(position.x);
    let dy = target.y.saturating_sub(position.y);
    if dx.abs() <= tolerance && dy.abs() <= tolerance {
        return None;
    }
    Some(Point::new(
        position.x + dx.clamp(-speed, speed),
        position.y + dy.clamp(-speed, speed),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pack_round_trips_negative_values() {
        let p = Point::new(-3, 4_000);
        assert_eq!(Point::unpack(p.pack()), p);
    }

    #[test]
    fn test_bounce_off_right_wall() {
        let bounds = Bounds::new(100, 100);
        let (p, v) = bounce(Point::new(100, 50), Velocity::new(1, 1), bounds);
        assert_eq!(p, Point::new(100, 51));
        assert_eq!(v, Velocity::new(-1, 1));
    }

    #[test]
    fn test_bounce_off_origin_corner() {
        let bounds = Bounds::new(100, 100);
        let (p, v) = bounce(Point::new(0, 0), Velocity::new(-1, -1), bounds);
        assert_eq!(p, Point::new(0, 0));
        assert_eq!(v, Velocity::new(1, 1));
    }

    #[test]
    fn test_approach_caps_speed_and_stops_in_tolerance() {
        let target = Point::new(100, 100);
        assert_eq!(approach(Point::new(0, 97), target, 7, 5), Some(Point::new(7, 100)));
        assert_eq!(approach(Point::new(96, 104), target, 7, 5), None);
    }

    #[test]
    fn test_distance() {
        assert!((Point::new(0, 0).distance(&Point::new(3, 4)) - 5.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_bounce_stays_in_bounds(
            max_x in 0i32..2_000,
            max_y in 0i32..2_000,
            fx in 0.0f64..=1.0,
            fy in 0.0f64..=1.0,
            dx in -10i32..=10,
            dy in -10i32..=10,
            steps in 1usize..200,
        ) {
            let bounds = Bounds::new(max_x, max_y);
            let mut p = Point::new((fx * max_x as f64) as i32, (fy * max_y as f64) as i32);
            let mut v = Velocity::new(dx, dy);
            for _ in 0..steps {
                let (np, nv) = bounce(p, v, bounds);
                prop_assert!(bounds.contains(np));
                prop_assert_eq!(nv.dx.abs(), dx.abs());
                prop_assert_eq!(nv.dy.abs(), dy.abs());
                p = np;
                v = nv;
            }
        }

        #[test]
        fn prop_approach_converges(
            sx in -500i32..500, sy in -500i32..500,
            tx in -500i32..500, ty in -500i32..500,
        ) {
            let target = Point::new(tx, ty);
            let mut p = Point::new(sx, sy);
            let mut steps = 0;
            while let Some(next) = approach(p, target, 7, 5) {
                p = next;
                steps += 1;
                prop_assert!(steps < 1_000);
            }
            prop_assert!((p.x - tx).abs() <= 5 && (p.y - ty).abs() <= 5);
        }
    }
}
