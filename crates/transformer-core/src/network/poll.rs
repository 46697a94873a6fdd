//! Fixed-interval timers driven by frame time.

use transformer_proto::NodeId;

use crate::scene::SceneGraph;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollTimer {
    interval: f32,
    since_last: f32,
    elapsed: f32,
}

impl PollTimer {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            since_last: 0.0,
            elapsed: 0.0,
        }
    }

    /// Advance by `dt` seconds. Returns true when the interval elapsed.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        self.since_last += dt;
        if self.since_last + f32::EPSILON >= self.interval {
            self.since_last = 0.0;
            true
        } else {
            false
        }
    }

    /// Seconds since the timer started.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

/// Waits for freshly cloned nodes to be live and replicated.
#[derive(Debug, Clone)]
pub(crate) struct ClonePoll {
    timer: PollTimer,
    minimum_time: f32,
    pending: Vec<NodeId>,
}

impl ClonePoll {
    pub(crate) fn new(clones: Vec<NodeId>, check_frequency: f32, minimum_time: f32) -> Self {
        Self {
            timer: PollTimer::new(check_frequency),
            minimum_time,
            pending: clones,
        }
    }

    pub(crate) fn pending(&self) -> &[NodeId] {
        &self.pending
    }

    fn is_ready(&self, scene: &dyn SceneGraph, node: NodeId) -> bool {
        scene.has_begun_play(node) && scene.is_replicated(node) && self.timer.elapsed() > self.minimum_time
    }

    /// Drop every ready clone. Returns true once none are left.
    ///
    /// Destroyed clones count as ready.
    pub(crate) fn poll(&mut self, scene: &dyn SceneGraph, dt: f32) -> bool {
        if !self.timer.advance(dt) {
            return false;
        }
        let pending = std::mem::take(&mut self.pending);
        self.pending = pending
            .into_iter()
            .filter(|node| scene.contains(*node) && !self.is_ready(scene, *node))
            .collect();
        self.pending.is_empty()
    }
}
