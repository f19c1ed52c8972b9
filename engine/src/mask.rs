use std::path::Path;

use bevy_math::{Vec2, Vec3};
use image::DynamicImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};

/// Intensity above which a mask sample counts as track surface.
pub const DRIVABLE_THRESHOLD: f32 = 0.1;

/// World-space placement of a mask: `origin` is the (min x, base y, min z)
/// corner, `size.x` spans world x and `size.y` spans world z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainExtent {
    pub origin: Vec3,
    pub size: Vec2,
}

impl TerrainExtent {
    pub fn new(origin: Vec3, size: Vec2) -> Self {
        Self { origin, size }
    }

    pub fn to_normalized(&self, world: Vec3) -> Vec2 {
        Vec2::new(
            (world.x - self.origin.x) / self.size.x,
            (world.z - self.origin.z) / self.size.y,
        )
    }

    /// Height of the returned point is the extent's base height.
    pub fn to_world(&self, uv: Vec2) -> Vec3 {
        Vec3::new(
            self.origin.x + uv.x * self.size.x,
            self.origin.y,
            self.origin.z + uv.y * self.size.y,
        )
    }

    pub fn contains(&self, world: Vec3) -> bool {
        let uv = self.to_normalized(world);
        (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y)
    }

    /// Rejects extents that cannot be inverted by [`to_normalized`](Self::to_normalized).
    pub fn validate(&self) -> Result<()> {
        if self.size.x > 0.0 && self.size.y > 0.0 {
            Ok(())
        } else {
            Err(TrackError::InvalidMask(format!(
                "terrain extent must be positive, got {}x{}",
                self.size.x, self.size.y
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drivability {
    OnTrack,
    OffTrack,
    OutOfBounds,
}

/// Read-only drivability raster. Row 0 is the `v = 0` (min z) edge.
#[derive(Debug, Clone)]
pub struct TrackMask {
    field: Array2<f32>,
    extent: TerrainExtent,
    threshold: f32,
}

impl TrackMask {
    pub fn new(field: Array2<f32>, extent: TerrainExtent) -> Result<Self> {
        let (rows, cols) = field.dim();
        if rows == 0 || cols == 0 {
            return Err(TrackError::InvalidMask("mask has no pixels".into()));
        }
        extent.validate()?;
        Ok(Self { field, extent, threshold: DRIVABLE_THRESHOLD })
    }

    /// Builds a mask from a per-pixel intensity function `f(col, row)`.
    pub fn from_fn(
        width: usize,
        height: usize,
        extent: TerrainExtent,
        f: impl Fn(usize, usize) -> f32,
    ) -> Result<Self> {
        let field = Array2::from_shape_fn((height, width), |(row, col)| f(col, row));
        Self::new(field, extent)
    }

    /// Uses the red channel. Image rows run top-down, so the top row maps to `v = 1`.
    pub fn from_image(img: &DynamicImage, extent: TerrainExtent) -> Result<Self> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let (width, height) = (width as usize, height as usize);
        Self::from_fn(width, height, extent, |col, row| {
            let y = (height - 1 - row) as u32;
            rgba.get_pixel(col as u32, y).0[0] as f32 / 255.0
        })
    }

    pub fn open<P: AsRef<Path>>(path: P, extent: TerrainExtent) -> Result<Self> {
        let img = image::open(path.as_ref())?;
        Self::from_image(&img, extent)
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn extent(&self) -> &TerrainExtent {
        &self.extent
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn width(&self) -> usize {
        self.field.dim().1
    }

    pub fn height(&self) -> usize {
        self.field.dim().0
    }

    pub fn to_normalized(&self, world: Vec3) -> Vec2 {
        self.extent.to_normalized(world)
    }

    pub fn to_world(&self, uv: Vec2) -> Vec3 {
        self.extent.to_world(uv)
    }

    /// Bilinear intensity at normalized coordinates, clamped at the edges.
    pub fn sample(&self, uv: Vec2) -> f32 {
        sample_bilinear(&self.field, uv)
    }

    pub fn is_drivable_uv(&self, uv: Vec2) -> bool {
        self.sample(uv) > self.threshold
    }

    pub fn classify(&self, world: Vec3) -> Drivability {
        let uv = self.to_normalized(world);
        if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
            return Drivability::OutOfBounds;
        }
        if self.is_drivable_uv(uv) {
            Drivability::OnTrack
        } else {
            Drivability::OffTrack
        }
    }

    pub fn is_drivable(&self, world: Vec3) -> bool {
        self.classify(world) == Drivability::OnTrack
    }

    /// Fraction of pixels above the threshold.
    pub fn coverage(&self) -> f32 {
        let on = self.field.iter().filter(|v| **v > self.threshold).count();
        on as f32 / self.field.len() as f32
    }
}

/// Pixel centers sit at `(i + 0.5) / n`; lookups outside the raster clamp to the edge.
pub(crate) fn sample_bilinear(field: &Array2<f32>, uv: Vec2) -> f32 {
    let (rows, cols) = field.dim();
    let x = uv.x * cols as f32 - 0.5;
    let y = uv.y * rows as f32 - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let px = |c: f32, r: f32| -> f32 {
        let c = (c as i64).clamp(0, cols as i64 - 1) as usize;
        let r = (r as i64).clamp(0, rows as i64 - 1) as usize;
        field[[r, c]]
    };

    let bottom = px(x0, y0) * (1.0 - fx) + px(x0 + 1.0, y0) * fx;
    let top = px(x0, y0 + 1.0) * (1.0 - fx) + px(x0 + 1.0, y0 + 1.0) * fx;
    bottom * (1.0 - fy) + top * fy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent() -> TerrainExtent {
        TerrainExtent::new(Vec3::new(-50.0, 2.0, 10.0), Vec2::new(100.0, 40.0))
    }

    fn band_mask() -> TrackMask {
        // drivable for world x in [-20, 20]
        TrackMask::from_fn(100, 40, extent(), |col, _| {
            let x = -50.0 + col as f32 + 0.5;
            if (-20.0..=20.0).contains(&x) { 1.0 } else { 0.0 }
        })
        .unwrap()
    }

    #[test]
    fn normalized_mapping_is_affine_and_reversible() {
        let ext = extent();
        let world = Vec3::new(-25.0, 2.0, 30.0);
        let uv = ext.to_normalized(world);
        assert!((uv.x - 0.25).abs() < 1e-6);
        assert!((uv.y - 0.5).abs() < 1e-6);
        let back = ext.to_world(uv);
        assert!(back.distance(world) < 1e-4);
    }

    #[test]
    fn out_of_bounds_differs_from_off_track() {
        let mask = band_mask();
        assert_eq!(mask.classify(Vec3::new(0.0, 0.0, 20.0)), Drivability::OnTrack);
        assert_eq!(mask.classify(Vec3::new(-40.0, 0.0, 20.0)), Drivability::OffTrack);
        assert_eq!(mask.classify(Vec3::new(0.0, 0.0, 9.0)), Drivability::OutOfBounds);
        assert_eq!(mask.classify(Vec3::new(60.0, 0.0, 20.0)), Drivability::OutOfBounds);
        assert!(!mask.is_drivable(Vec3::new(0.0, 0.0, 51.0)));
    }

    #[test]
    fn bilinear_sampling_blends_neighbours() {
        let field = Array2::from_shape_vec((1, 2), vec![0.0, 1.0]).unwrap();
        let mid = sample_bilinear(&field, Vec2::new(0.5, 0.5));
        assert!((mid - 0.5).abs() < 1e-6);
        assert_eq!(sample_bilinear(&field, Vec2::new(0.0, 0.5)), 0.0);
        assert_eq!(sample_bilinear(&field, Vec2::new(1.0, 0.5)), 1.0);
    }

    #[test]
    fn threshold_is_tunable() {
        let mask = TrackMask::from_fn(4, 4, extent(), |_, _| 0.3).unwrap();
        assert!(mask.is_drivable(Vec3::new(0.0, 0.0, 30.0)));
        let strict = mask.with_threshold(0.5);
        assert!(!strict.is_drivable(Vec3::new(0.0, 0.0, 30.0)));
    }

    #[test]
    fn image_rows_are_flipped_into_mask_space() {
        let mut img = image::RgbaImage::new(2, 2);
        // top-left pixel of the image is the far (+z) edge
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        let ext = TerrainExtent::new(Vec3::ZERO, Vec2::new(2.0, 2.0));
        let mask = TrackMask::from_image(&DynamicImage::ImageRgba8(img), ext).unwrap();
        assert!(mask.is_drivable(Vec3::new(0.5, 0.0, 1.5)));
        assert!(!mask.is_drivable(Vec3::new(0.5, 0.0, 0.5)));
    }

    #[test]
    fn rejects_empty_or_degenerate_masks() {
        assert!(TrackMask::from_fn(0, 3, extent(), |_, _| 1.0).is_err());
        let flat = TerrainExtent::new(Vec3::ZERO, Vec2::new(0.0, 10.0));
        assert!(TrackMask::from_fn(3, 3, flat, |_, _| 1.0).is_err());
    }
}
