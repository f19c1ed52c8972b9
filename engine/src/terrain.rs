use std::path::Path;

use bevy_math::{Vec2, Vec3};
use image::DynamicImage;
use ndarray::Array2;

use crate::error::{Result, TrackError};
use crate::mask::{sample_bilinear, TerrainExtent};

/// Ground height lookup used to place waypoints on the terrain surface.
pub trait HeightSampler: Send + Sync {
    fn height_at(&self, x: f32, z: f32) -> f32;
}

/// Constant-height ground.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatTerrain {
    pub height: f32,
}

impl FlatTerrain {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl HeightSampler for FlatTerrain {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }
}

/// Greyscale heightmap laid over a terrain extent. Heights are
/// `extent.origin.y + intensity * max_height`, sampled bilinearly.
#[derive(Debug, Clone)]
pub struct Heightmap {
    field: Array2<f32>,
    extent: TerrainExtent,
    max_height: f32,
}

impl Heightmap {
    pub fn new(field: Array2<f32>, extent: TerrainExtent, max_height: f32) -> Result<Self> {
        let (rows, cols) = field.dim();
        if rows == 0 || cols == 0 {
            return Err(TrackError::InvalidMask("heightmap has no pixels".into()));
        }
        extent.validate()?;
        Ok(Self { field, extent, max_height })
    }

    pub fn from_image(img: &DynamicImage, extent: TerrainExtent, max_height: f32) -> Result<Self> {
        let luma = img.to_luma16();
        let (width, height) = luma.dimensions();
        let (width, height) = (width as usize, height as usize);
        let field = Array2::from_shape_fn((height, width), |(row, col)| {
            let y = (height - 1 - row) as u32;
            luma.get_pixel(col as u32, y).0[0] as f32 / u16::MAX as f32
        });
        Self::new(field, extent, max_height)
    }

    pub fn open<P: AsRef<Path>>(path: P, extent: TerrainExtent, max_height: f32) -> Result<Self> {
        let img = image::open(path.as_ref())?;
        Self::from_image(&img, extent, max_height)
    }

    pub fn extent(&self) -> &TerrainExtent {
        &self.extent
    }
}

impl HeightSampler for Heightmap {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        let uv = self.extent.to_normalized(Vec3::new(x, 0.0, z));
        let uv = uv.clamp(Vec2::ZERO, Vec2::ONE);
        self.extent.origin.y + sample_bilinear(&self.field, uv) * self.max_height
    }
}
