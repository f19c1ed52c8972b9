use bevy_math::Vec3;

/// Why the walker skipped a candidate point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    OutOfBounds,
    OffTrack,
    Visited,
}

/// Hooks into an extraction run. All methods default to no-ops.
pub trait ExtractionObserver {
    fn on_seed(&mut self, _seed: Vec3) {}
    fn on_accepted(&mut self, _point: Vec3) {}
    fn on_rejected(&mut self, _point: Vec3, _reason: Rejection) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExtractionObserver for NoopObserver {}

/// Records every sampled and rejected candidate for visualization.
#[derive(Debug, Default, Clone)]
pub struct DebugCapture {
    pub seed: Option<Vec3>,
    pub sampled: Vec<Vec3>,
    pub rejected: Vec<(Vec3, Rejection)>,
}

impl DebugCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.seed = None;
        self.sampled.clear();
        self.rejected.clear();
    }

    pub fn rejected_by(&self, reason: Rejection) -> impl Iterator<Item = Vec3> + '_ {
        self.rejected
            .iter()
            .filter(move |(_, r)| *r == reason)
            .map(|(p, _)| *p)
    }
}

impl ExtractionObserver for DebugCapture {
    fn on_seed(&mut self, seed: Vec3) {
        self.seed = Some(seed);
    }

    fn on_accepted(&mut self, point: Vec3) {
        self.sampled.push(point);
    }

    fn on_rejected(&mut self, point: Vec3, reason: Rejection) {
        self.rejected.push((point, reason));
    }
}
