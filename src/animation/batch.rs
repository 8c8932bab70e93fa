use eframe::egui::Vec2;
use tracing::{debug, warn};

use crate::tree::{NodeId, VisualTree};

use super::camera::{Camera, ease};

/// Margin in world units added around a node for the visibility test.
const VISIBILITY_MARGIN: f32 = 60.0;

/// Camera command deferred until the running layout transition ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraRequest {
    Overview,
    Selection,
    Focus { node: NodeId, zoom: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct NodeMove {
    node: NodeId,
    from: Vec2,
    to: Vec2,
    animate: bool,
}

#[derive(Debug)]
struct Transition {
    moves: Vec<NodeMove>,
    elapsed: f32,
    duration: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Anchor {
    node: NodeId,
    last: Vec2,
}

/// Collects the moves of one layout pass and plays them as a single
/// transition.
#[derive(Debug)]
pub struct Animator {
    enabled: bool,
    duration: f32,
    batch: Option<(bool, Vec<NodeMove>)>,
    transition: Option<Transition>,
    anchor: Option<Anchor>,
    pending_camera: Option<CameraRequest>,
}

impl Animator {
    pub fn new(enabled: bool, duration: f32) -> Self {
        Self {
            enabled,
            duration: duration.max(0.0),
            batch: None,
            transition: None,
            anchor: None,
            pending_camera: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    pub fn batch_open(&self) -> bool {
        self.batch.is_some()
    }

    pub fn begin_layout_batch(&mut self, disable_animation: bool) {
        if self.batch.is_some() {
            warn!("layout batch already open, merging");
            return;
        }
        self.batch = Some((disable_animation, Vec::new()));
    }

    /// Outside of a batch the node jumps immediately.
    pub fn move_node_to(&mut self, tree: &mut VisualTree, camera: &Camera, node: NodeId, target: Vec2) {
        let Some(from) = tree.position(node) else {
            return;
        };
        let Some((_, moves)) = &mut self.batch else {
            tree.set_position(node, target);
            return;
        };
        let anchored = self.anchor.is_some_and(|anchor| anchor.node == node);
        let animate = anchored
            || camera.is_visible(from, VISIBILITY_MARGIN)
            || camera.is_visible(target, VISIBILITY_MARGIN);
        moves.push(NodeMove {
            node,
            from,
            to: target,
            animate,
        });
    }

    /// Closes the batch, replacing any running transition. Returns a
    /// deferred camera request when the batch finished without starting a
    /// transition.
    pub fn end_layout_batch(
        &mut self,
        tree: &mut VisualTree,
        camera: &mut Camera,
    ) -> Option<CameraRequest> {
        let (disable_animation, moves) = self.batch.take()?;
        if let Some(previous) = self.transition.take() {
            debug!(nodes = previous.moves.len(), "layout transition superseded");
            for step in &previous.moves {
                tree.set_position(step.node, step.to);
            }
        }
        let animate = self.enabled
            && !disable_animation
            && self.duration > 0.0
            && moves.iter().any(|step| step.animate && step.from != step.to);

        if !animate {
            for step in &moves {
                tree.set_position(step.node, step.to);
            }
            self.follow_anchor(tree, camera);
            self.anchor = None;
            return self.pending_camera.take();
        }

        let mut animated = Vec::with_capacity(moves.len());
        for step in moves {
            if step.animate {
                animated.push(step);
            } else {
                tree.set_position(step.node, step.to);
            }
        }
        debug!(nodes = animated.len(), "layout transition started");
        self.transition = Some(Transition {
            moves: animated,
            elapsed: 0.0,
            duration: self.duration,
        });
        None
    }

    /// Keeps `node` stationary on screen until the next transition ends.
    pub fn fix_camera_on_node(&mut self, tree: &VisualTree, node: NodeId) {
        if let Some(last) = tree.position(node) {
            self.anchor = Some(Anchor { node, last });
        }
    }

    /// Queues a camera command for the end of the current transition. The
    /// latest request wins.
    pub fn queue_camera(&mut self, request: CameraRequest) {
        self.pending_camera = Some(request);
    }

    /// Hands out a queued request when nothing is running.
    pub fn take_idle_camera_request(&mut self) -> Option<CameraRequest> {
        if self.transition.is_some() || self.batch.is_some() {
            return None;
        }
        self.pending_camera.take()
    }

    /// Advances the transition by `dt` seconds. Returns the deferred camera
    /// request exactly once, on the frame the transition completes.
    pub fn tick(
        &mut self,
        tree: &mut VisualTree,
        camera: &mut Camera,
        dt: f32,
    ) -> Option<CameraRequest> {
        let transition = self.transition.as_mut()?;
        transition.elapsed += dt.max(0.0);
        let t = (transition.elapsed / transition.duration).clamp(0.0, 1.0);
        let eased = ease(t);
        for step in &transition.moves {
            tree.set_position(step.node, step.from + (step.to - step.from) * eased);
        }
        self.follow_anchor(tree, camera);

        if t < 1.0 {
            return None;
        }
        self.transition = None;
        self.anchor = None;
        debug!("layout transition finished");
        self.pending_camera.take()
    }

    /// Jumps a running transition to its end.
    pub fn finish(&mut self, tree: &mut VisualTree, camera: &mut Camera) -> Option<CameraRequest> {
        let duration = self.transition.as_ref()?.duration;
        self.tick(tree, camera, duration)
    }

    fn follow_anchor(&mut self, tree: &VisualTree, camera: &mut Camera) {
        let Some(anchor) = &mut self.anchor else {
            return;
        };
        let Some(current) = tree.position(anchor.node) else {
            self.anchor = None;
            return;
        };
        camera.follow(current - anchor.last);
        anchor.last = current;
    }
}
