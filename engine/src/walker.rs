use std::collections::HashSet;

use bevy_math::{IVec2, Vec2, Vec3};
use tracing::{debug, info, warn};

use crate::direction::{rotate_heading, DirectionEstimator};
use crate::error::{Result, TrackError};
use crate::graph::{Waypoint, WaypointGraph, FORWARD};
use crate::mask::{Drivability, TrackMask};
use crate::observer::{ExtractionObserver, NoopObserver, Rejection};
use crate::params::ExtractionParams;
use crate::shared::CancelToken;
use crate::terrain::{FlatTerrain, HeightSampler};

/// How an extraction run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// Returned to the seed; the graph is looped.
    Closed,
    /// Hit `max_waypoints` without closing.
    BudgetReached,
    /// No candidate survived; the graph is partial.
    AdvanceFailed { produced: usize },
    /// Cancelled from outside.
    Aborted { produced: usize },
    SeedNotFound,
}

/// Result of one run: the graph built so far plus how the run ended.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub graph: WaypointGraph,
    pub status: ExtractionStatus,
}

impl Extraction {
    pub fn is_looped(&self) -> bool {
        self.graph.is_looped()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, ExtractionStatus::Closed | ExtractionStatus::BudgetReached)
    }

    /// Turns a missing seed into an error; any other outcome passes through.
    pub fn check(self) -> Result<Self> {
        match self.status {
            ExtractionStatus::SeedNotFound => Err(TrackError::SeedNotFound),
            _ => Ok(self),
        }
    }
}

/// Integer grid over world x/z used to stop the walker doubling back.
#[derive(Debug, Clone)]
pub struct VisitedCells {
    cell_size: i32,
    cells: HashSet<IVec2>,
}

impl VisitedCells {
    pub fn new(cell_size: i32) -> Self {
        Self { cell_size: cell_size.max(1), cells: HashSet::new() }
    }

    pub fn cell_of(&self, position: Vec3) -> IVec2 {
        let size = self.cell_size as f32;
        IVec2::new((position.x / size).round() as i32, (position.z / size).round() as i32)
    }

    pub fn contains(&self, position: Vec3) -> bool {
        self.cells.contains(&self.cell_of(position))
    }

    pub fn insert(&mut self, position: Vec3) -> bool {
        let cell = self.cell_of(position);
        self.cells.insert(cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

enum Step {
    Advance(Vec3),
    Close(Vec3),
    Stuck,
}

/// Greedy walker that traces the centerline of a drivable mask.
///
/// ```ignore
/// let extraction = PathWalker::new(&mask, params)
///     .with_terrain(&heightmap)
///     .extract()?;
/// ```
pub struct PathWalker<'a> {
    mask: &'a TrackMask,
    params: ExtractionParams,
    terrain: Option<&'a dyn HeightSampler>,
    observer: Option<&'a mut dyn ExtractionObserver>,
    cancel: Option<CancelToken>,
}

impl<'a> PathWalker<'a> {
    pub fn new(mask: &'a TrackMask, params: ExtractionParams) -> Self {
        Self { mask, params, terrain: None, observer: None, cancel: None }
    }

    /// Ground heights for emitted waypoints. Defaults to flat ground at the
    /// mask origin height.
    pub fn with_terrain(mut self, terrain: &'a dyn HeightSampler) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn with_observer(mut self, observer: &'a mut dyn ExtractionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn params(&self) -> &ExtractionParams {
        &self.params
    }

    /// Runs the walk. Only invalid parameters are errors; every other outcome
    /// is reported through [`Extraction::status`].
    pub fn extract(self) -> Result<Extraction> {
        self.params.validate()?;
        let Self { mask, params, terrain, observer, cancel } = self;

        let rethresholded;
        let mask = if mask.threshold() == params.drivable_threshold {
            mask
        } else {
            rethresholded = mask.clone().with_threshold(params.drivable_threshold);
            &rethresholded
        };
        let flat = FlatTerrain::new(mask.extent().origin.y);
        let terrain: &dyn HeightSampler = match terrain {
            Some(terrain) => terrain,
            None => &flat,
        };
        let mut noop = NoopObserver;
        let observer: &mut dyn ExtractionObserver = match observer {
            Some(observer) => observer,
            None => &mut noop,
        };

        let run = Run {
            mask,
            params: &params,
            terrain,
            estimator: DirectionEstimator::new(params.sample_count, params.sample_radius),
            cancel: cancel.as_ref(),
        };
        Ok(run.walk(observer))
    }
}

struct Run<'a> {
    mask: &'a TrackMask,
    params: &'a ExtractionParams,
    terrain: &'a dyn HeightSampler,
    estimator: DirectionEstimator,
    cancel: Option<&'a CancelToken>,
}

impl Run<'_> {
    fn walk(&self, observer: &mut dyn ExtractionObserver) -> Extraction {
        let params = self.params;
        let Some(seed) = self.find_seed() else {
            warn!("no drivable sample on the mask, nothing extracted");
            return Extraction {
                graph: WaypointGraph::default().with_min_loop_size(params.min_loop_size),
                status: ExtractionStatus::SeedNotFound,
            };
        };
        observer.on_seed(seed);
        info!(x = seed.x, z = seed.z, "extraction seed found");

        let mut visited = VisitedCells::new(params.effective_cell_size());
        visited.insert(seed);

        let mut heading = self.estimator.estimate(self.mask, seed, FORWARD);
        debug!(?heading, "initial heading");

        let mut waypoints = vec![Waypoint::new(seed, heading)];
        let mut current = seed;
        let mut looped = false;

        let status = loop {
            if waypoints.len() >= params.max_waypoints {
                break ExtractionStatus::BudgetReached;
            }
            if self.cancel.is_some_and(CancelToken::is_cancelled) {
                break ExtractionStatus::Aborted { produced: waypoints.len() };
            }

            match self.next_step(current, heading, seed, waypoints.len(), &visited, observer) {
                Step::Stuck => {
                    warn!(
                        produced = waypoints.len(),
                        x = current.x,
                        z = current.z,
                        "walker found no candidate, stopping early"
                    );
                    break ExtractionStatus::AdvanceFailed { produced: waypoints.len() };
                }
                Step::Close(point) => {
                    observer.on_accepted(point);
                    let forward = self.estimator.estimate(self.mask, point, step_direction(current, point, heading));
                    waypoints.push(Waypoint::new(point, forward));
                    looped = true;
                    break ExtractionStatus::Closed;
                }
                Step::Advance(point) => {
                    observer.on_accepted(point);
                    heading = self.estimator.estimate(self.mask, point, step_direction(current, point, heading));
                    visited.insert(point);
                    waypoints.push(Waypoint::new(point, heading));
                    current = point;
                }
            }
        };

        let graph = WaypointGraph::new(waypoints, looped).with_min_loop_size(params.min_loop_size);
        info!(
            waypoints = graph.len(),
            looped,
            length = graph.total_length(),
            ?status,
            "extraction finished"
        );
        Extraction { graph, status }
    }

    /// Coarse scan, `u` outer and `v` inner.
    fn find_seed(&self) -> Option<Vec3> {
        let steps = (1.0 / self.params.seed_scan_step).round().max(1.0) as usize;
        let step = 1.0 / steps as f32;
        (0..steps)
            .flat_map(|i| (0..steps).map(move |j| Vec2::new(i as f32 * step, j as f32 * step)))
            .find(|uv| self.mask.is_drivable_uv(*uv))
            .map(|uv| self.grounded(self.mask.to_world(uv)))
    }

    fn next_step(
        &self,
        current: Vec3,
        heading: Vec3,
        seed: Vec3,
        emitted: usize,
        visited: &VisitedCells,
        observer: &mut dyn ExtractionObserver,
    ) -> Step {
        let params = self.params;
        let can_close = emitted >= params.min_loop_steps;
        for &angle in &params.fan_angles {
            let dir = rotate_heading(heading, angle);
            for &multiplier in &params.distance_multipliers {
                let candidate = self.grounded(current + dir * params.step_spacing * multiplier);
                match self.mask.classify(candidate) {
                    Drivability::OnTrack => {}
                    Drivability::OutOfBounds => {
                        observer.on_rejected(candidate, Rejection::OutOfBounds);
                        continue;
                    }
                    Drivability::OffTrack => {
                        observer.on_rejected(candidate, Rejection::OffTrack);
                        continue;
                    }
                }
                if can_close && horizontal_distance(candidate, seed) < params.step_spacing {
                    return Step::Close(candidate);
                }
                if visited.len() > params.visited_grace && visited.contains(candidate) {
                    observer.on_rejected(candidate, Rejection::Visited);
                    continue;
                }
                return Step::Advance(candidate);
            }
        }
        Step::Stuck
    }

    fn grounded(&self, mut point: Vec3) -> Vec3 {
        point.y = self.terrain.height_at(point.x, point.z) + self.params.height_above_terrain;
        point
    }
}

fn step_direction(from: Vec3, to: Vec3, fallback: Vec3) -> Vec3 {
    let mut d = to - from;
    d.y = 0.0;
    d.try_normalize().unwrap_or(fallback)
}

fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}
