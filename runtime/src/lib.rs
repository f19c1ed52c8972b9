//! Bevy integration: background track regeneration and per-tick guidance.

use std::path::Path;

use bevy::prelude::*;
use track_engine::{SharedTrack, TrackFile, WaypointGraph};

pub mod debug_draw;
pub mod guidance;
pub mod regenerate;

pub use debug_draw::{TrackDebugDraw, TrackDebugDrawPlugin};
pub use guidance::{TrackFollower, TrackGuidance};
pub use regenerate::{RegenerateTrack, RegenerationTask, TrackRegenerated, TrackSource};

/// The graph every follower queries. Cloning shares the same handle.
#[derive(Resource, Clone, Default, Deref)]
pub struct ActiveTrack(pub SharedTrack);

impl ActiveTrack {
    pub fn new(graph: WaypointGraph) -> Self {
        Self(SharedTrack::new(graph))
    }

    /// Loads an authored track file.
    pub fn open<P: AsRef<Path>>(path: P) -> track_engine::Result<Self> {
        let graph = TrackFile::load(path)?.to_graph()?;
        Ok(Self::new(graph))
    }
}

/// Track regeneration and follower guidance. Gizmo drawing lives in
/// [`TrackDebugDrawPlugin`].
pub struct TrackPathPlugin;

impl Plugin for TrackPathPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActiveTrack>()
            .add_event::<RegenerateTrack>()
            .add_event::<TrackRegenerated>()
            .add_systems(
                Update,
                (
                    regenerate::start_regeneration,
                    regenerate::finish_regeneration,
                    guidance::attach_guidance,
                    guidance::update_guidance,
                )
                    .chain(),
            );
    }
}
