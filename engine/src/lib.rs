//! Track path extraction and navigation.
//!
//! A [`TrackMask`] describes where the track surface is. [`PathWalker`] walks
//! it once, offline, into a [`WaypointGraph`], which runtime code then queries
//! for tangents, lookahead points and lap markers.

pub mod direction;
pub mod error;
pub mod graph;
pub mod mask;
pub mod observer;
pub mod params;
pub mod persist;
pub mod shared;
pub mod terrain;
pub mod walker;

pub use bevy_math::{IVec2, Vec2, Vec3};

pub use direction::{rotate_heading, DirectionEstimator};
pub use error::{Result, TrackError};
pub use graph::{StartFinish, Waypoint, WaypointGraph, DEFAULT_LINE_THRESHOLD, DEFAULT_MIN_LOOP_SIZE, FORWARD};
pub use mask::{Drivability, TerrainExtent, TrackMask, DRIVABLE_THRESHOLD};
pub use observer::{DebugCapture, ExtractionObserver, NoopObserver, Rejection};
pub use params::ExtractionParams;
pub use persist::{waypoint_label, TrackFile, TrackFormat, WaypointRecord, FORMAT_VERSION};
pub use shared::{CancelToken, SharedTrack};
pub use terrain::{FlatTerrain, HeightSampler, Heightmap};
pub use walker::{Extraction, ExtractionStatus, PathWalker, VisitedCells};

/// Runs an extraction with default terrain and no observer.
pub fn extract_path(mask: &TrackMask, params: ExtractionParams) -> Result<Extraction> {
    PathWalker::new(mask, params).extract()
}
