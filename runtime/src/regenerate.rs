use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;
use track_engine::{CancelToken, Extraction, ExtractionParams, ExtractionStatus, HeightSampler, PathWalker, TrackMask};

use crate::ActiveTrack;

/// Inputs for regenerating the active track.
#[derive(Resource, Clone)]
pub struct TrackSource {
    pub mask: Arc<TrackMask>,
    pub params: ExtractionParams,
    pub terrain: Option<Arc<dyn HeightSampler>>,
}

impl TrackSource {
    pub fn new(mask: TrackMask, params: ExtractionParams) -> Self {
        Self { mask: Arc::new(mask), params, terrain: None }
    }

    pub fn with_terrain(mut self, terrain: impl HeightSampler + 'static) -> Self {
        self.terrain = Some(Arc::new(terrain));
        self
    }

    fn extract(&self, cancel: CancelToken) -> track_engine::Result<Extraction> {
        let mut walker = PathWalker::new(&self.mask, self.params.clone()).with_cancel(cancel);
        if let Some(terrain) = &self.terrain {
            walker = walker.with_terrain(terrain.as_ref());
        }
        walker.extract()
    }
}

/// Request a rebuild from the current [`TrackSource`].
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct RegenerateTrack;

/// Sent when a rebuild finishes. The active graph is only replaced when a
/// seed was found.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct TrackRegenerated {
    pub status: ExtractionStatus,
    pub waypoints: usize,
}

/// Extraction running on the async compute pool.
#[derive(Component)]
pub struct RegenerationTask {
    pub task: Task<track_engine::Result<Extraction>>,
    pub cancel: CancelToken,
}

/// Starts one extraction per frame with requests, aborting any run in flight.
pub fn start_regeneration(
    mut commands: Commands,
    mut requests: EventReader<RegenerateTrack>,
    source: Option<Res<TrackSource>>,
    running: Query<(Entity, &RegenerationTask)>,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();
    let Some(source) = source else {
        warn!("track regeneration requested without a TrackSource");
        return;
    };

    for (entity, running) in &running {
        running.cancel.cancel();
        commands.entity(entity).despawn();
    }

    let cancel = CancelToken::new();
    let token = cancel.clone();
    let source = source.clone();
    let task = AsyncComputeTaskPool::get().spawn(async move { source.extract(token) });
    commands.spawn(RegenerationTask { task, cancel });
    debug!("track regeneration started");
}

/// Publishes finished extractions to [`ActiveTrack`].
pub fn finish_regeneration(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut RegenerationTask)>,
    active: Res<ActiveTrack>,
    mut finished: EventWriter<TrackRegenerated>,
) {
    for (entity, mut task) in &mut tasks {
        let Some(result) = future::block_on(future::poll_once(&mut task.task)) else {
            continue;
        };
        commands.entity(entity).despawn();

        let extraction = match result {
            Ok(extraction) => extraction,
            Err(e) => {
                error!("track regeneration failed: {}", e);
                continue;
            }
        };
        let status = extraction.status;
        let waypoints = extraction.graph.len();
        match status {
            ExtractionStatus::Aborted { .. } => continue,
            ExtractionStatus::SeedNotFound => {
                warn!("regenerated track has no seed, keeping the current one");
            }
            ExtractionStatus::AdvanceFailed { produced } => {
                warn!("regenerated track stopped early after {} waypoints", produced);
                active.replace(extraction.graph);
            }
            _ => {
                info!("regenerated track with {} waypoints ({:?})", waypoints, status);
                active.replace(extraction.graph);
            }
        }
        finished.send(TrackRegenerated { status, waypoints });
    }
}
