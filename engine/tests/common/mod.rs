#![allow(dead_code)]

use track_engine::{ExtractionParams, TerrainExtent, TrackMask, Vec2, Vec3};

/// 120x120 mask at one pixel per unit: a square band 10 wide, outer edge
/// spanning 10..110 on both axes.
pub fn square_ring() -> TrackMask {
    let extent = TerrainExtent::new(Vec3::ZERO, Vec2::new(120.0, 120.0));
    TrackMask::from_fn(120, 120, extent, |col, row| {
        let (x, z) = (col as f32 + 0.5, row as f32 + 0.5);
        let inside = (10.0..=110.0).contains(&x) && (10.0..=110.0).contains(&z);
        let hole = x > 20.0 && x < 100.0 && z > 20.0 && z < 100.0;
        if inside && !hole { 1.0 } else { 0.0 }
    })
    .unwrap()
}

/// The sample ring spans the band's width, so the farthest on-track pair lies
/// along the band rather than across a patch of equally distant samples.
pub fn ring_params() -> ExtractionParams {
    ExtractionParams { step_spacing: 5.0, max_waypoints: 100, sample_radius: 6.0, ..Default::default() }
}

/// Straight north-south strip, 4 units wide and 200 long.
pub fn straight_strip() -> TrackMask {
    let extent = TerrainExtent::new(Vec3::ZERO, Vec2::new(40.0, 220.0));
    TrackMask::from_fn(40, 220, extent, |col, row| {
        let (x, z) = (col as f32 + 0.5, row as f32 + 0.5);
        if (18.0..=22.0).contains(&x) && (10.0..=210.0).contains(&z) { 1.0 } else { 0.0 }
    })
    .unwrap()
}

pub fn strip_params() -> ExtractionParams {
    ExtractionParams { step_spacing: 10.0, max_waypoints: 100, ..Default::default() }
}

/// Points along the middle of the ring's band.
pub fn ring_centerline() -> Vec<Vec3> {
    (15..=105)
        .flat_map(|t| {
            let t = t as f32;
            [
                Vec3::new(15.0, 0.5, t),
                Vec3::new(105.0, 0.5, t),
                Vec3::new(t, 0.5, 15.0),
                Vec3::new(t, 0.5, 105.0),
            ]
        })
        .collect()
}
