use bevy_math::{Quat, Vec3};

use crate::mask::TrackMask;

/// Infers the local track tangent from a ring of mask samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionEstimator {
    pub samples: usize,
    pub radius: f32,
}

impl Default for DirectionEstimator {
    fn default() -> Self {
        Self { samples: 16, radius: 3.0 }
    }
}

impl DirectionEstimator {
    pub fn new(samples: usize, radius: f32) -> Self {
        Self { samples, radius }
    }

    /// On-track ring samples around `position`, in ring order.
    pub fn ring_samples(&self, mask: &TrackMask, position: Vec3) -> Vec<Vec3> {
        let step = 360.0 / self.samples as f32;
        (0..self.samples)
            .map(|i| position + rotate_heading(Vec3::Z, i as f32 * step) * self.radius)
            .filter(|p| mask.is_drivable(*p))
            .collect()
    }

    /// Unit horizontal tangent at `position`, oriented to agree with
    /// `default_heading`. Returns `default_heading` unchanged when fewer than
    /// two ring samples are on the track.
    pub fn estimate(&self, mask: &TrackMask, position: Vec3, default_heading: Vec3) -> Vec3 {
        let points = self.ring_samples(mask, position);
        if points.len() < 2 {
            return default_heading;
        }

        // first pair wins ties
        let mut best = 0.0;
        let mut pair = (points[0], points[1]);
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let d = points[i].distance(points[j]);
                if d > best {
                    best = d;
                    pair = (points[i], points[j]);
                }
            }
        }

        let mut dir = pair.1 - pair.0;
        dir.y = 0.0;
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return default_heading;
        }
        if dir.dot(default_heading) < 0.0 {
            -dir
        } else {
            dir
        }
    }
}

/// Rotates a heading about +Y by `degrees`; positive turns +Z toward +X.
pub fn rotate_heading(heading: Vec3, degrees: f32) -> Vec3 {
    Quat::from_rotation_y(degrees.to_radians()) * heading
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::TerrainExtent;
    use bevy_math::Vec2;

    fn mask(f: impl Fn(f32, f32) -> bool) -> TrackMask {
        let extent = TerrainExtent::new(Vec3::ZERO, Vec2::new(60.0, 60.0));
        TrackMask::from_fn(60, 60, extent, |col, row| {
            if f(col as f32 + 0.5, row as f32 + 0.5) { 1.0 } else { 0.0 }
        })
        .unwrap()
    }

    #[test]
    fn rotation_matches_compass_convention() {
        let east = rotate_heading(Vec3::Z, 90.0);
        assert!(east.distance(Vec3::X) < 1e-5);
        let west = rotate_heading(Vec3::Z, -90.0);
        assert!(west.distance(-Vec3::X) < 1e-5);
    }

    #[test]
    fn narrow_east_west_band_gives_x_axis() {
        // one pixel row, so only the east and west ring samples land on it
        let mask = mask(|_, z| (z - 30.5).abs() < 0.1);
        let est = DirectionEstimator::default();
        let at = Vec3::new(30.5, 0.0, 30.5);
        assert_eq!(est.ring_samples(&mask, at).len(), 2);
        let dir = est.estimate(&mask, at, Vec3::X);
        assert!(dir.distance(Vec3::X) < 1e-4, "{dir:?}");
        let back = est.estimate(&mask, at, -Vec3::X);
        assert!(back.distance(-Vec3::X) < 1e-4, "{back:?}");
    }

    #[test]
    fn equal_pairs_keep_the_first_found() {
        // one-pixel plus: north-south and east-west pairs are exactly as far apart
        let mask = mask(|x, z| (x - 30.5).abs() < 0.1 || (z - 30.5).abs() < 0.1);
        let est = DirectionEstimator::default();
        let at = Vec3::new(30.5, 0.0, 30.5);
        assert_eq!(est.ring_samples(&mask, at).len(), 4);
        // the heading leans east, but north-south is found first
        let dir = est.estimate(&mask, at, Vec3::new(0.98, 0.0, 0.196));
        assert!(dir.distance(Vec3::Z) < 1e-4, "{dir:?}");
    }

    #[test]
    fn heading_is_kept_when_estimate_is_impossible() {
        let mask = mask(|_, _| false);
        let heading = Vec3::new(0.6, 0.0, 0.8);
        let est = DirectionEstimator::default();
        assert_eq!(est.estimate(&mask, Vec3::new(30.0, 0.0, 30.0), heading), heading);
    }

    #[test]
    fn result_is_horizontal_unit() {
        let mask = mask(|x, z| (x - z).abs() < 1.5);
        let est = DirectionEstimator::default();
        let dir = est.estimate(&mask, Vec3::new(30.0, 4.0, 30.0), Vec3::Z);
        assert_eq!(dir.y, 0.0);
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert!(dir.dot(Vec3::Z) >= 0.0);
    }
}
