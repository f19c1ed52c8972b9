use std::ptr;

use bevy_math::{Vec2, Vec3};

use crate::error::{Result, TrackError};

/// Direction returned by queries that cannot infer one.
pub const FORWARD: Vec3 = Vec3::Z;

pub const DEFAULT_MIN_LOOP_SIZE: usize = 10;

/// Default radius for start/finish proximity checks.
pub const DEFAULT_LINE_THRESHOLD: f32 = 3.0;

/// A path sample: world position plus horizontal forward direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    pub forward: Vec3,
}

impl Waypoint {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }

    /// Horizontal right-hand side of the forward direction.
    pub fn right(&self) -> Vec3 {
        Vec3::Y.cross(self.forward).normalize_or_zero()
    }
}

/// Indices of the lap start and finish waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartFinish {
    pub start: usize,
    pub finish: usize,
}

/// Ordered waypoint sequence produced by one extraction or authoring pass.
///
/// The graph is immutable once built. All queries are O(n) scans over the
/// waypoints and never fail: degenerate graphs answer with fallbacks
/// ([`FORWARD`], or the query position unchanged).
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointGraph {
    waypoints: Vec<Waypoint>,
    looped: bool,
    min_loop_size: usize,
    start_finish: Option<StartFinish>,
}

impl Default for WaypointGraph {
    fn default() -> Self {
        Self::new(Vec::new(), false)
    }
}

impl WaypointGraph {
    pub fn new(waypoints: Vec<Waypoint>, looped: bool) -> Self {
        Self {
            waypoints,
            looped,
            min_loop_size: DEFAULT_MIN_LOOP_SIZE,
            start_finish: None,
        }
    }

    pub fn with_min_loop_size(mut self, min_loop_size: usize) -> Self {
        self.min_loop_size = min_loop_size;
        self
    }

    /// Overrides the derived start/finish waypoints.
    pub fn with_start_finish(mut self, start: usize, finish: usize) -> Result<Self> {
        let len = self.waypoints.len();
        for index in [start, finish] {
            if index >= len {
                return Err(TrackError::IndexOutOfRange { index, len });
            }
        }
        self.start_finish = Some(StartFinish { start, finish });
        Ok(self)
    }

    /// `count` waypoints on a horizontal circle, each facing the next one.
    pub fn circle(center: Vec3, radius: f32, count: usize) -> Self {
        let step = 360.0 / count.max(1) as f32;
        let point = |i: usize| {
            let angle = (i as f32 * step).to_radians();
            center + Vec3::new(angle.sin(), 0.0, angle.cos()) * radius
        };
        let waypoints = (0..count)
            .map(|i| {
                let position = point(i);
                let forward = (point((i + 1) % count) - position).normalize_or_zero();
                Waypoint::new(position, forward)
            })
            .collect();
        Self::new(waypoints, true).with_min_loop_size(count.min(DEFAULT_MIN_LOOP_SIZE))
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    pub fn min_loop_size(&self) -> usize {
        self.min_loop_size
    }

    /// Looping only applies once the graph reaches `min_loop_size`.
    pub fn wraps(&self) -> bool {
        self.looped && self.waypoints.len() >= self.min_loop_size
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Waypoint> {
        self.waypoints.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn first(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn last(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// Index of `waypoint` by identity, i.e. only references into this graph match.
    pub fn index_of(&self, waypoint: &Waypoint) -> Option<usize> {
        self.waypoints.iter().position(|w| ptr::eq(w, waypoint))
    }

    pub fn closest_index(&self, position: Vec3) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, w) in self.waypoints.iter().enumerate() {
            let d = w.position.distance(position);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn closest(&self, position: Vec3) -> Option<&Waypoint> {
        self.closest_index(position).map(|i| &self.waypoints[i])
    }

    pub fn next_index(&self, index: usize) -> Option<usize> {
        let len = self.waypoints.len();
        if index >= len {
            return None;
        }
        if index + 1 < len {
            Some(index + 1)
        } else if self.wraps() {
            Some(0)
        } else {
            Some(index)
        }
    }

    pub fn previous_index(&self, index: usize) -> Option<usize> {
        let len = self.waypoints.len();
        if index >= len {
            return None;
        }
        if index > 0 {
            Some(index - 1)
        } else if self.wraps() {
            Some(len - 1)
        } else {
            Some(0)
        }
    }

    /// Successor of `current`. A waypoint that does not belong to this graph
    /// is replaced by the graph's closest waypoint to its position.
    pub fn next<'a>(&'a self, current: &'a Waypoint) -> &'a Waypoint {
        self.step(current, Self::next_index)
    }

    pub fn previous<'a>(&'a self, current: &'a Waypoint) -> &'a Waypoint {
        self.step(current, Self::previous_index)
    }

    fn step<'a>(
        &'a self,
        current: &'a Waypoint,
        advance: fn(&Self, usize) -> Option<usize>,
    ) -> &'a Waypoint {
        if self.waypoints.len() <= 1 {
            return current;
        }
        match self.index_of(current) {
            Some(i) => advance(self, i).map_or(current, |j| &self.waypoints[j]),
            None => self.closest(current.position).unwrap_or(current),
        }
    }

    /// Horizontal unit direction from waypoint `a` to `b`, if they differ.
    pub fn segment_direction(&self, a: usize, b: usize) -> Option<Vec3> {
        let from = self.waypoints.get(a)?.position;
        let to = self.waypoints.get(b)?.position;
        horizontal_direction(to - from)
    }

    /// Track direction at `position`: closest waypoint toward its successor.
    pub fn tangent_at(&self, position: Vec3) -> Vec3 {
        if self.waypoints.len() <= 1 {
            return FORWARD;
        }
        let Some(closest) = self.closest_index(position) else {
            return FORWARD;
        };
        match self.next_index(closest) {
            Some(next) if next != closest => self.segment_direction(closest, next).unwrap_or(FORWARD),
            _ => FORWARD,
        }
    }

    /// Point `lead_distance` ahead of `position` along the path.
    ///
    /// The current segment is the one `position` projects closest onto. Far
    /// from that segment's end this aims straight at the end waypoint. Within
    /// `lead_distance` of it, the direction toward the waypoint and the
    /// direction of the path beyond it are blended by the fraction of the lead
    /// used up reaching it: the waypoint is reached and the remainder follows
    /// the path onward, continuing straight past an open end. The lead point
    /// moves continuously as `position` moves along the path.
    pub fn lead_position(&self, position: Vec3, lead_distance: f32) -> Vec3 {
        if self.waypoints.len() <= 1 || !(lead_distance > 0.0) {
            return position;
        }
        let Some((start, end)) = self.closest_segment(position) else {
            return position;
        };

        let mut to_next = self.waypoints[end].position - position;
        to_next.y = 0.0;
        let distance = to_next.length();
        if distance > lead_distance {
            return position + to_next / distance * lead_distance;
        }

        let heading = self.segment_direction(start, end).unwrap_or(FORWARD);
        self.advance_from(end, position.y, lead_distance - distance, heading)
    }

    /// Segment `(index, next)` passing horizontally closest to `position`;
    /// the first one wins ties.
    fn closest_segment(&self, position: Vec3) -> Option<(usize, usize)> {
        let mut best: Option<((usize, usize), f32)> = None;
        for start in 0..self.waypoints.len() {
            let Some(end) = self.next_index(start).filter(|&end| end != start) else {
                continue;
            };
            let d = horizontal_segment_distance(
                position,
                self.waypoints[start].position,
                self.waypoints[end].position,
            );
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some(((start, end), d)),
            }
        }
        best.map(|(segment, _)| segment)
    }

    /// Walks `remaining` horizontally along the path from waypoint `from` at
    /// height `y`. Past an open end the walk continues along `heading`, the
    /// last segment direction seen.
    fn advance_from(&self, mut from: usize, y: f32, mut remaining: f32, mut heading: Vec3) -> Vec3 {
        let at_height = |p: Vec3| Vec3::new(p.x, y, p.z);
        let mut point = at_height(self.waypoints[from].position);
        for _ in 0..self.waypoints.len() {
            let Some(to) = self.next_index(from).filter(|&to| to != from) else {
                break;
            };
            let target = at_height(self.waypoints[to].position);
            let length = point.distance(target);
            if let Some(dir) = horizontal_direction(target - point) {
                if length >= remaining {
                    return point + dir * remaining;
                }
                heading = dir;
            }
            remaining -= length;
            point = target;
            from = to;
        }
        point + heading * remaining
    }

    /// Aim point straight ahead along the local tangent.
    pub fn look_at_position(&self, position: Vec3, distance: f32) -> Vec3 {
        position + self.tangent_at(position) * distance
    }

    /// Explicit override, or first/first for loops and first/last otherwise.
    pub fn start_finish(&self) -> Option<StartFinish> {
        if self.waypoints.is_empty() {
            return None;
        }
        if let Some(sf) = self.start_finish {
            return Some(sf);
        }
        let finish = if self.looped { 0 } else { self.waypoints.len() - 1 };
        Some(StartFinish { start: 0, finish })
    }

    /// The override set with [`with_start_finish`](Self::with_start_finish), if any.
    pub fn start_finish_override(&self) -> Option<StartFinish> {
        self.start_finish
    }

    pub fn start(&self) -> Option<&Waypoint> {
        self.start_finish().map(|sf| &self.waypoints[sf.start])
    }

    pub fn finish(&self) -> Option<&Waypoint> {
        self.start_finish().map(|sf| &self.waypoints[sf.finish])
    }

    pub fn near_start(&self, position: Vec3, threshold: f32) -> bool {
        self.start()
            .is_some_and(|w| w.position.distance(position) < threshold)
    }

    pub fn near_finish(&self, position: Vec3, threshold: f32) -> bool {
        self.finish()
            .is_some_and(|w| w.position.distance(position) < threshold)
    }

    /// Polyline length, including the closing segment when the graph wraps.
    pub fn total_length(&self) -> f32 {
        let open: f32 = self
            .waypoints
            .windows(2)
            .map(|w| w[0].position.distance(w[1].position))
            .sum();
        match (self.wraps(), self.waypoints.first(), self.waypoints.last()) {
            (true, Some(first), Some(last)) => open + last.position.distance(first.position),
            _ => open,
        }
    }
}

fn horizontal_segment_distance(position: Vec3, a: Vec3, b: Vec3) -> f32 {
    let p = Vec2::new(position.x, position.z);
    let a = Vec2::new(a.x, a.z);
    let ab = Vec2::new(b.x, b.z) - a;
    let len_sq = ab.length_squared();
    let t = if len_sq > 0.0 { ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0) } else { 0.0 };
    p.distance(a + ab * t)
}

fn horizontal_direction(mut v: Vec3) -> Option<Vec3> {
    v.y = 0.0;
    let len = v.length();
    if len > 1e-6 {
        Some(v / len)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize, spacing: f32) -> WaypointGraph {
        let waypoints = (0..n)
            .map(|i| Waypoint::new(Vec3::new(0.0, 0.0, i as f32 * spacing), FORWARD))
            .collect();
        WaypointGraph::new(waypoints, false)
    }

    /// Waypoints `step` apart up +Z to the corner at (0, 25), then along +X to (25, 25).
    fn corner_with_step(step: f32) -> WaypointGraph {
        let n = (25.0 / step).round() as usize;
        let mut pts: Vec<Vec3> = (0..=n).map(|i| Vec3::new(0.0, 0.0, i as f32 * step)).collect();
        pts.extend((1..=n).map(|i| Vec3::new(i as f32 * step, 0.0, 25.0)));
        WaypointGraph::new(pts.into_iter().map(|p| Waypoint::new(p, FORWARD)).collect(), false)
    }

    fn corner() -> WaypointGraph {
        corner_with_step(5.0)
    }

    fn worst_jump(graph: &WaypointGraph, path: impl Iterator<Item = Vec3>, lead: f32) -> f32 {
        let points: Vec<Vec3> = path.map(|p| graph.lead_position(p, lead)).collect();
        points
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .fold(0.0_f32, f32::max)
    }

    #[test]
    fn closest_prefers_first_on_ties() {
        let graph = line(3, 10.0);
        assert_eq!(graph.closest_index(Vec3::new(0.0, 0.0, 5.0)), Some(0));
        assert_eq!(graph.closest_index(Vec3::new(3.0, 0.0, 14.0)), Some(1));
        assert_eq!(graph.closest_index(Vec3::new(0.0, 0.0, 1e6)), Some(2));
    }

    #[test]
    fn open_graph_clamps_at_both_ends() {
        let graph = line(5, 10.0);
        let last = graph.last().unwrap();
        assert!(ptr::eq(graph.next(last), last));
        let first = graph.first().unwrap();
        assert!(ptr::eq(graph.previous(first), first));
        for w in &graph.waypoints()[1..4] {
            assert!(ptr::eq(graph.next(graph.previous(w)), w));
            assert!(ptr::eq(graph.previous(graph.next(w)), w));
        }
    }

    #[test]
    fn looped_graph_wraps_once_large_enough() {
        let graph = WaypointGraph::circle(Vec3::ZERO, 30.0, 12);
        assert!(graph.wraps());
        for w in graph.iter() {
            assert!(ptr::eq(graph.next(graph.previous(w)), w));
        }
        assert_eq!(graph.next_index(11), Some(0));
        assert_eq!(graph.previous_index(0), Some(11));
    }

    #[test]
    fn small_loop_does_not_wrap() {
        let waypoints = line(4, 5.0).waypoints().to_vec();
        let graph = WaypointGraph::new(waypoints, true).with_min_loop_size(10);
        assert!(!graph.wraps());
        assert_eq!(graph.next_index(3), Some(3));
        assert_eq!(graph.previous_index(0), Some(0));
    }

    #[test]
    fn foreign_waypoint_falls_back_to_closest() {
        let graph = line(5, 10.0);
        let stranger = Waypoint::new(Vec3::new(1.0, 0.0, 21.0), FORWARD);
        let resolved = graph.next(&stranger);
        assert!(ptr::eq(resolved, &graph.waypoints()[2]));
        assert_eq!(graph.index_of(&stranger), None);
    }

    #[test]
    fn degenerate_graphs_use_fallbacks() {
        let empty = WaypointGraph::default();
        let p = Vec3::new(4.0, 1.0, -2.0);
        assert_eq!(empty.closest(p), None);
        assert_eq!(empty.tangent_at(p), FORWARD);
        assert_eq!(empty.lead_position(p, 10.0), p);
        assert!(!empty.near_start(p, 100.0));
        assert_eq!(empty.start_finish(), None);

        let single = line(1, 1.0);
        let only = single.first().unwrap();
        assert!(ptr::eq(single.next(only), only));
        assert_eq!(single.tangent_at(p), FORWARD);
        assert_eq!(single.lead_position(p, 10.0), p);
    }

    #[test]
    fn tangent_is_horizontal_and_forward_at_open_end() {
        let graph = WaypointGraph::new(
            vec![
                Waypoint::new(Vec3::new(0.0, 0.0, 0.0), FORWARD),
                Waypoint::new(Vec3::new(10.0, 5.0, 0.0), FORWARD),
            ],
            false,
        );
        let t = graph.tangent_at(Vec3::new(-1.0, 0.0, 0.0));
        assert!(t.distance(Vec3::X) < 1e-6);
        assert_eq!(graph.tangent_at(Vec3::new(11.0, 0.0, 0.0)), FORWARD);
    }

    #[test]
    fn lead_aims_at_next_waypoint_when_far() {
        let graph = line(5, 10.0);
        let lead = graph.lead_position(Vec3::new(3.0, 0.0, 1.0), 2.0);
        let expected = Vec3::new(3.0, 0.0, 1.0) + (Vec3::new(-3.0, 0.0, 9.0)).normalize() * 2.0;
        assert!(lead.distance(expected) < 1e-5);
    }

    #[test]
    fn lead_bends_around_corner() {
        let graph = corner();
        let lead = graph.lead_position(Vec3::new(0.0, 0.0, 24.0), 6.0);
        assert!(lead.distance(Vec3::new(5.0, 0.0, 25.0)) < 1e-4, "{lead:?}");
        let lead = graph.lead_position(Vec3::new(0.0, 0.0, 24.0), 3.0);
        assert!(lead.distance(Vec3::new(2.0, 0.0, 25.0)) < 1e-4, "{lead:?}");
    }

    #[test]
    fn lead_continues_past_open_end() {
        let graph = line(5, 10.0);
        let lead = graph.lead_position(Vec3::new(0.0, 2.0, 38.0), 5.0);
        assert!(lead.distance(Vec3::new(0.0, 2.0, 43.0)) < 1e-4, "{lead:?}");
    }

    #[test]
    fn lead_moves_continuously_through_a_waypoint() {
        let graph = corner();
        for lead in [2.0, 4.0, 8.0, 12.0] {
            // from the start of the last straight segment, across its midpoint
            // and the corner waypoint, onto the next leg
            let approach = (0..=500).map(|j| Vec3::new(0.0, 0.0, 20.0 + j as f32 * 0.01));
            let leave = (1..=240).map(|j| Vec3::new(j as f32 * 0.01, 0.0, 25.0));
            let worst = worst_jump(&graph, approach.chain(leave), lead);
            assert!(worst < 0.05, "lead {lead}: jump of {worst}");
        }
    }

    #[test]
    fn lead_is_continuous_with_segments_shorter_than_the_lead() {
        let graph = corner_with_step(1.0);
        let approach = (0..=600).map(|j| Vec3::new(0.0, 0.0, 19.0 + j as f32 * 0.01));
        let leave = (1..=300).map(|j| Vec3::new(j as f32 * 0.01, 0.0, 25.0));
        let worst = worst_jump(&graph, approach.chain(leave), 4.0);
        assert!(worst < 0.05, "jump of {worst}");
    }

    #[test]
    fn start_finish_derivation_and_override() {
        let open = line(4, 5.0);
        assert_eq!(open.start_finish(), Some(StartFinish { start: 0, finish: 3 }));
        assert!(open.near_finish(Vec3::new(0.0, 0.0, 16.0), DEFAULT_LINE_THRESHOLD));
        assert!(!open.near_start(Vec3::new(0.0, 0.0, 16.0), DEFAULT_LINE_THRESHOLD));

        let looped = WaypointGraph::circle(Vec3::ZERO, 20.0, 8);
        assert_eq!(looped.start_finish(), Some(StartFinish { start: 0, finish: 0 }));

        let custom = line(4, 5.0).with_start_finish(1, 2).unwrap();
        assert!(custom.near_start(Vec3::new(0.0, 0.0, 5.5), 1.0));
        assert!(line(4, 5.0).with_start_finish(0, 4).is_err());
    }

    #[test]
    fn circle_layout_faces_next_waypoint() {
        let graph = WaypointGraph::circle(Vec3::new(5.0, 1.0, 5.0), 20.0, 8);
        assert_eq!(graph.len(), 8);
        assert!(graph.is_looped());
        assert!(graph.get(0).unwrap().position.distance(Vec3::new(5.0, 1.0, 25.0)) < 1e-4);
        for (i, w) in graph.iter().enumerate() {
            let next = graph.get((i + 1) % 8).unwrap().position;
            assert!(w.forward.dot((next - w.position).normalize()) > 0.999);
        }
        let chord = 2.0 * 20.0 * (std::f32::consts::PI / 8.0).sin();
        assert!((graph.total_length() - chord * 8.0).abs() < 1e-2);
    }

    #[test]
    fn right_vector_is_perpendicular() {
        let w = Waypoint::new(Vec3::ZERO, Vec3::Z);
        assert!(w.right().distance(Vec3::X) < 1e-6);
    }

    #[test]
    fn graph_is_shareable_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WaypointGraph>();
    }
}
