//! Offline maintenance passes over a loaded track file.
//!
//! Every pass edits the [`TrackFile`] in place and keeps its start/finish
//! indices pointing at the same waypoints.

use anyhow::{bail, Result};
use track_engine::{waypoint_label, HeightSampler, TrackFile, Vec3, WaypointGraph, WaypointRecord};
use tracing::{info, warn};

fn graph_of(file: &TrackFile) -> WaypointGraph {
    let waypoints = file.waypoints.iter().map(WaypointRecord::waypoint).collect();
    WaypointGraph::new(waypoints, file.looped).with_min_loop_size(file.min_loop_size)
}

fn horizontal(mut v: Vec3) -> Option<Vec3> {
    v.y = 0.0;
    v.try_normalize()
}

/// Puts every waypoint `height_above` over the terrain. Returns how many moved.
pub fn snap_to_terrain(file: &mut TrackFile, terrain: &dyn HeightSampler, height_above: f32) -> usize {
    let mut moved = 0;
    for record in &mut file.waypoints {
        let [x, y, z] = record.position;
        let snapped = terrain.height_at(x, z) + height_above;
        if snapped != y {
            record.position[1] = snapped;
            moved += 1;
        }
    }
    info!(moved, total = file.waypoints.len(), "snapped waypoints to terrain");
    moved
}

/// Points each waypoint at its successor on the horizontal plane.
///
/// The successor follows the graph's looping rules, so the last waypoint of an
/// open track keeps its forward. `strict` always wraps the last waypoint to the
/// first.
pub fn orient(file: &mut TrackFile, strict: bool) -> usize {
    let n = file.waypoints.len();
    if n < 2 {
        warn!(waypoints = n, "not enough waypoints to orient");
        return 0;
    }
    let graph = graph_of(file);
    let mut adjusted = 0;
    for i in 0..n {
        let next = if strict { (i + 1) % n } else { graph.next_index(i).unwrap_or(i) };
        if next == i {
            continue;
        }
        let from = Vec3::from_array(file.waypoints[i].position);
        let to = Vec3::from_array(file.waypoints[next].position);
        if let Some(dir) = horizontal(to - from) {
            file.waypoints[i].forward = dir.to_array();
            adjusted += 1;
        }
    }
    info!(adjusted, strict, "recomputed waypoint rotations");
    adjusted
}

/// Adds a waypoint halfway between `index` and its successor, facing the
/// successor. Returns the new waypoint's index.
pub fn insert_after(
    file: &mut TrackFile,
    index: usize,
    terrain: Option<(&dyn HeightSampler, f32)>,
) -> Result<usize> {
    let len = file.waypoints.len();
    if index >= len {
        bail!("waypoint {index} out of range, track has {len}");
    }
    let graph = graph_of(file);
    let next = graph.next_index(index).unwrap_or(index);
    if next == index {
        bail!("waypoint {index} has no successor");
    }

    let from = Vec3::from_array(file.waypoints[index].position);
    let to = Vec3::from_array(file.waypoints[next].position);
    let mut position = from.lerp(to, 0.5);
    if let Some((terrain, height_above)) = terrain {
        position.y = terrain.height_at(position.x, position.z) + height_above;
    }
    let forward = horizontal(to - position).unwrap_or(Vec3::from_array(file.waypoints[index].forward));

    let at = index + 1;
    file.waypoints.insert(
        at,
        WaypointRecord {
            label: waypoint_label(len),
            position: position.to_array(),
            forward: forward.to_array(),
        },
    );
    for marker in [&mut file.start, &mut file.finish].into_iter().flatten() {
        if *marker >= at {
            *marker += 1;
        }
    }
    info!(index = at, "inserted waypoint");
    Ok(at)
}

/// Labels waypoints `Waypoint001`, `Waypoint002`, ... in current order.
pub fn renumber(file: &mut TrackFile) {
    for (i, record) in file.waypoints.iter_mut().enumerate() {
        record.label = waypoint_label(i);
    }
}

/// Reorders waypoints by label, ordinal comparison, ties keep their order.
pub fn sort_by_label(file: &mut TrackFile) {
    let mut order: Vec<usize> = (0..file.waypoints.len()).collect();
    order.sort_by(|a, b| file.waypoints[*a].label.cmp(&file.waypoints[*b].label));

    let remap = |old: usize| order.iter().position(|o| *o == old).unwrap_or(old);
    file.start = file.start.map(remap);
    file.finish = file.finish.map(remap);

    let mut records: Vec<Option<WaypointRecord>> = file.waypoints.drain(..).map(Some).collect();
    file.waypoints = order.iter().filter_map(|i| records[*i].take()).collect();
}
