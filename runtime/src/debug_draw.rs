use bevy::prelude::*;
use track_engine::{Waypoint, WaypointGraph};

use crate::ActiveTrack;

/// Gizmo settings for [`TrackDebugDrawPlugin`].
#[derive(Resource, Debug, Clone)]
pub struct TrackDebugDraw {
    pub enabled: bool,
    pub path_color: Color,
    pub waypoint_color: Color,
    pub waypoint_radius: f32,
    /// Lift applied to everything drawn so lines clear the ground.
    pub path_height: f32,
    pub checkpoint_width: f32,
    pub start_color: Color,
    pub finish_color: Color,
}

impl Default for TrackDebugDraw {
    fn default() -> Self {
        Self {
            enabled: true,
            path_color: Color::BLUE,
            waypoint_color: Color::YELLOW,
            waypoint_radius: 0.5,
            path_height: 0.2,
            checkpoint_width: 10.0,
            start_color: Color::GREEN,
            finish_color: Color::RED,
        }
    }
}

/// Draws the active track with gizmos. Needs the render plugins.
pub struct TrackDebugDrawPlugin;

impl Plugin for TrackDebugDrawPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrackDebugDraw>()
            .add_systems(Update, draw_track);
    }
}

/// Consecutive path segments, plus the closing one when the graph wraps.
pub fn path_segments(graph: &WaypointGraph) -> Vec<(Vec3, Vec3)> {
    let mut segments: Vec<_> = graph
        .waypoints()
        .windows(2)
        .map(|w| (w[0].position, w[1].position))
        .collect();
    if let (true, Some(first), Some(last)) = (graph.wraps(), graph.first(), graph.last()) {
        segments.push((last.position, first.position));
    }
    segments
}

/// Endpoints of a start/finish line across `waypoint`.
pub fn checkpoint_line(waypoint: &Waypoint, width: f32) -> (Vec3, Vec3) {
    let half = waypoint.right() * (width / 2.0);
    (waypoint.position - half, waypoint.position + half)
}

fn draw_track(active: Res<ActiveTrack>, settings: Res<TrackDebugDraw>, mut gizmos: Gizmos) {
    if !settings.enabled {
        return;
    }
    let graph = active.snapshot();
    let lift = Vec3::Y * settings.path_height;

    for (a, b) in path_segments(&graph) {
        gizmos.line(a + lift, b + lift, settings.path_color);
    }
    for w in graph.iter() {
        gizmos.sphere(w.position + lift, Quat::IDENTITY, settings.waypoint_radius, settings.waypoint_color);
    }

    let Some(sf) = graph.start_finish() else {
        return;
    };
    let (a, b) = checkpoint_line(&graph.waypoints()[sf.start], settings.checkpoint_width);
    gizmos.line(a + lift, b + lift, settings.start_color);
    if sf.finish != sf.start {
        let (a, b) = checkpoint_line(&graph.waypoints()[sf.finish], settings.checkpoint_width);
        gizmos.line(a + lift, b + lift, settings.finish_color);
    }
}
