use bevy::prelude::*;
use track_engine::{DEFAULT_LINE_THRESHOLD, FORWARD};

use crate::ActiveTrack;

/// Entity that wants track guidance each frame, e.g. a chase camera target.
#[derive(Component, Debug, Clone, Copy)]
pub struct TrackFollower {
    /// Distance ahead of the follower for the lead point.
    pub lead_distance: f32,
    /// Distance along the local tangent for the look-at point.
    pub look_ahead: f32,
    /// Radius for the start/finish proximity flags.
    pub line_threshold: f32,
}

impl Default for TrackFollower {
    fn default() -> Self {
        Self { lead_distance: 5.0, look_ahead: 10.0, line_threshold: DEFAULT_LINE_THRESHOLD }
    }
}

/// Track queries answered for a follower's current position.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct TrackGuidance {
    pub closest: Option<usize>,
    pub tangent: Vec3,
    pub lead_point: Vec3,
    pub look_at: Vec3,
    pub near_start: bool,
    pub near_finish: bool,
}

impl Default for TrackGuidance {
    fn default() -> Self {
        Self {
            closest: None,
            tangent: FORWARD,
            lead_point: Vec3::ZERO,
            look_at: Vec3::ZERO,
            near_start: false,
            near_finish: false,
        }
    }
}

pub fn attach_guidance(
    mut commands: Commands,
    followers: Query<Entity, (With<TrackFollower>, Without<TrackGuidance>)>,
) {
    for entity in &followers {
        commands.entity(entity).insert(TrackGuidance::default());
    }
}

pub fn update_guidance(
    active: Res<ActiveTrack>,
    mut followers: Query<(&Transform, &TrackFollower, &mut TrackGuidance)>,
) {
    let graph = active.snapshot();
    for (transform, follower, mut guidance) in &mut followers {
        let position = transform.translation;
        *guidance = TrackGuidance {
            closest: graph.closest_index(position),
            tangent: graph.tangent_at(position),
            lead_point: graph.lead_position(position, follower.lead_distance),
            look_at: graph.look_at_position(position, follower.look_ahead),
            near_start: graph.near_start(position, follower.line_threshold),
            near_finish: graph.near_finish(position, follower.line_threshold),
        };
    }
}
