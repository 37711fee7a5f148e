//! Geometry Engine - Dial Coordinates
//!
//! Angles are degrees measured clockwise from 12 o'clock (0° points straight
//! up). Every placement on the dial goes through [`polar_to_point`].

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fraction of the shorter canvas side used as the dial radius
pub const DIAL_RADIUS_RATIO: f64 = 0.4;

/// Upper bound on ticks enumerated for a single scale. Far beyond anything
/// distinguishable on a dial; it only keeps a runaway count from exhausting
/// memory.
pub const MAX_TICKS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Convert a clockwise-from-top bearing into canvas coordinates (y grows down).
pub fn polar_to_point(center_x: f64, center_y: f64, radius: f64, angle_degrees: f64) -> Point {
    let theta = angle_degrees.to_radians();
    Point {
        x: center_x + radius * theta.sin(),
        y: center_y - radius * theta.cos(),
    }
}

/// The single dial radius every layout computation refers to.
pub fn dial_radius(canvas_width: f64, canvas_height: f64) -> f64 {
    DIAL_RADIUS_RATIO * canvas_width.min(canvas_height)
}

/// Clamp a configured tick count into an enumerable number of ticks.
///
/// Zero or negative counts mean "no ticks". Counts above [`MAX_TICKS`] are
/// clamped with a warning.
pub fn tick_count(count: i64) -> usize {
    if count <= 0 {
        0
    } else if count as u64 > MAX_TICKS as u64 {
        warn!(count, max = MAX_TICKS, "tick count clamped");
        MAX_TICKS
    } else {
        count as usize
    }
}

/// Angles of `count` evenly spaced ticks, the first at `offset`.
pub fn tick_angles(count: i64, offset: f64) -> impl Iterator<Item = f64> {
    let n = tick_count(count);
    let step = if n == 0 { 0.0 } else { 360.0 / n as f64 };
    (0..n).map(move |i| i as f64 * step + offset)
}

/// Normalize an angle into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Rotate `p` clockwise (screen coordinates) by `angle_degrees` around `origin`.
pub fn rotate_about(p: Point, origin: Point, angle_degrees: f64) -> Point {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let dx = p.x - origin.x;
    let dy = p.y - origin.y;
    Point {
        x: origin.x + dx * cos - dy * sin,
        y: origin.y + dx * sin + dy * cos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_zero_degrees_points_up() {
        let p = polar_to_point(400.0, 400.0, 100.0, 0.0);
        assert!(approx(p.x, 400.0));
        assert!(approx(p.y, 300.0));
    }

    #[test]
    fn test_quarter_turns_are_clockwise() {
        let east = polar_to_point(0.0, 0.0, 10.0, 90.0);
        assert!(approx(east.x, 10.0) && approx(east.y, 0.0));

        let south = polar_to_point(0.0, 0.0, 10.0, 180.0);
        assert!(approx(south.x, 0.0) && approx(south.y, 10.0));

        let west = polar_to_point(0.0, 0.0, 10.0, 270.0);
        assert!(approx(west.x, -10.0) && approx(west.y, 0.0));
    }

    #[test]
    fn test_dial_radius_uses_shorter_side() {
        assert_eq!(dial_radius(800.0, 800.0), 320.0);
        assert_eq!(dial_radius(1000.0, 500.0), 200.0);
    }

    #[test]
    fn test_non_positive_count_yields_no_ticks() {
        assert_eq!(tick_angles(0, 0.0).count(), 0);
        assert_eq!(tick_angles(-5, 15.0).count(), 0);
    }

    #[test]
    fn test_large_counts_enumerate_exactly() {
        let angles: Vec<f64> = tick_angles(4000, 0.0).collect();
        assert_eq!(angles.len(), 4000);
        assert!(approx(angles[1], 360.0 / 4000.0));
    }

    #[test]
    fn test_tick_count_is_capped() {
        assert_eq!(tick_count(i64::MAX), MAX_TICKS);
        assert_eq!(tick_count(MAX_TICKS as i64), MAX_TICKS);
    }

    #[test]
    fn test_rotate_about_is_clockwise() {
        let up = Point::new(0.0, -1.0);
        let r = rotate_about(up, Point::new(0.0, 0.0), 90.0);
        assert!(approx(r.x, 1.0) && approx(r.y, 0.0));
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(390.0), 30.0);
        assert_eq!(normalize_degrees(-30.0), 330.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_point_lies_on_circle(
            cx in -1000.0f64..1000.0,
            cy in -1000.0f64..1000.0,
            r in 0.0f64..2000.0,
            angle in -720.0f64..720.0,
        ) {
            let p = polar_to_point(cx, cy, r, angle);
            let d = p.distance(&Point::new(cx, cy));
            prop_assert!((d - r).abs() < 1e-6 * (1.0 + r));
        }

        #[test]
        fn prop_bearing_matches_angle(angle in 0.0f64..360.0, r in 1.0f64..500.0) {
            let p = polar_to_point(0.0, 0.0, r, angle);
            // atan2 of (east, north) gives the clockwise bearing from up
            let bearing = normalize_degrees(p.x.atan2(-p.y).to_degrees());
            let diff = (bearing - angle).abs();
            prop_assert!(diff < 1e-6 || (360.0 - diff) < 1e-6);
        }

        #[test]
        fn prop_ticks_evenly_spaced(count in 1i64..400, offset in -360.0f64..360.0) {
            let angles: Vec<f64> = tick_angles(count, offset).collect();
            prop_assert_eq!(angles.len(), count as usize);
            prop_assert!((angles[0] - offset).abs() < EPS);
            let step = 360.0 / count as f64;
            for pair in angles.windows(2) {
                prop_assert!((pair[1] - pair[0] - step).abs() < 1e-9);
            }
        }
    }
}
