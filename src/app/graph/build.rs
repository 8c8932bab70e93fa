use eframe::egui::Vec2;
use tracing::{debug, info};

use crate::animation::CameraRequest;
use crate::layout::{LayoutInput, LayoutKind, run_pass};
use crate::scene::node_size;
use crate::selection::SelectionState;
use crate::sorting::{AppliedJob, VisualChannel};

use super::super::ViewModel;

/// Relative zoom change that triggers a relayout of zoom dependent
/// strategies.
const ZOOM_RELAYOUT_RATIO: f32 = 1.25;

impl ViewModel {
    /// Runs one layout pass and hands the targets to the animator as a
    /// single batch.
    pub(in crate::app) fn relayout(&mut self, disable_animation: bool) {
        let input = LayoutInput::from_tree(
            &self.tree,
            &*self.dataset,
            self.engine.mappings(),
            self.camera.zoom(),
            self.fixed_radius,
        );
        let result = run_pass(&*self.layout, &self.tree, &input);

        self.animator.begin_layout_batch(disable_animation);
        for (node, target) in &result.positions {
            self.animator
                .move_node_to(&mut self.tree, &self.camera, *node, *target);
        }
        self.layout_input = input;
        self.layout_result = result;
        self.layout_zoom = self.camera.zoom();
        self.tree.mark_layout_valid();

        if let Some(request) = self.animator.end_layout_batch(&mut self.tree, &mut self.camera) {
            self.run_camera_request(request);
        }
    }

    pub(in crate::app) fn set_layout(&mut self, kind: LayoutKind) {
        if self.layout.kind() == kind {
            return;
        }
        info!(layout = kind.label(), "layout strategy changed");
        self.layout = kind.build();
        self.tree.invalidate_layout();
        self.animator.queue_camera(CameraRequest::Overview);
    }

    pub(in crate::app) fn adjust_radii(&mut self, delta: f32) {
        self.layout.update_radii(delta);
        self.tree.invalidate_layout();
    }

    pub(in crate::app) fn reset_radii(&mut self) {
        self.layout.reset_radii();
        self.tree.invalidate_layout();
    }

    fn animation_secs(&self) -> f32 {
        if self.animator.enabled() {
            self.animator.duration()
        } else {
            0.0
        }
    }

    pub(in crate::app) fn run_camera_request(&mut self, request: CameraRequest) {
        let duration = self.animation_secs();
        match request {
            CameraRequest::Overview => {
                if let Some(bounds) = self.layout_result.bounds(&self.layout_input) {
                    self.camera.zoom_to_overview(bounds, duration);
                }
            }
            CameraRequest::Selection => {
                if let Some(bounds) = self.selection_bounds() {
                    self.camera.zoom_to_selection(bounds, duration);
                }
            }
            CameraRequest::Focus { node, zoom } => {
                if let Some(position) = self
                    .layout_result
                    .position(node)
                    .or_else(|| self.tree.position(node))
                {
                    self.camera.focus_on(position, zoom, duration);
                }
            }
        }
    }

    /// Starts a camera move now, or defers it to the end of the running
    /// layout transition.
    pub(in crate::app) fn request_camera(&mut self, request: CameraRequest) {
        if self.animator.is_animating() || self.tree.layout_invalid() {
            self.animator.queue_camera(request);
        } else {
            self.run_camera_request(request);
        }
    }

    fn selection_bounds(&self) -> Option<(Vec2, Vec2)> {
        self.tree
            .preorder()
            .into_iter()
            .filter(|node| self.tree.selection_state(*node) != SelectionState::Unselected)
            .filter_map(|node| {
                let position = self.layout_result.position(node)?;
                let half =
                    node_size(&self.tree, &*self.dataset, self.engine.mappings(), node) * 0.5;
                Some((position - half, position + half))
            })
            .reduce(|(lo, hi), (min, max)| (lo.min(min), hi.max(max)))
    }

    fn zoom_wants_relayout(&self) -> bool {
        if self.fixed_radius || self.layout.kind() != LayoutKind::RadialWidth {
            return false;
        }
        let ratio = self.camera.zoom() / self.layout_zoom.max(f32::EPSILON);
        !(1.0 / ZOOM_RELAYOUT_RATIO..=ZOOM_RELAYOUT_RATIO).contains(&ratio)
    }

    /// Per-frame bookkeeping that does not need a `Ui`: observers, job
    /// results, animation and the layout pass.
    pub(in crate::app) fn frame_step(&mut self, dt: f32) -> bool {
        let mut busy = false;

        if self.selection_rx.try_iter().count() > 0 {
            self.tree.refresh_selection(&*self.dataset, &self.selection);
        }

        for applied in self.engine.poll(&mut self.tree) {
            match applied {
                AppliedJob::Sorted { ticket } => {
                    debug!(ticket, "sort result applied");
                    self.status = None;
                }
                AppliedJob::Mapped { ticket, channel } => {
                    debug!(ticket, channel = channel.label(), "mapping result applied");
                    if channel == VisualChannel::NodeSize {
                        self.tree.invalidate_layout();
                    }
                }
                AppliedJob::Failed { reason, .. } => {
                    self.status = Some(reason);
                }
            }
        }
        busy |= self.engine.is_busy();

        for event in self.detail_events.try_iter() {
            self.details.handle_event(&event);
        }
        self.tracker.sync(&self.tree);

        if let Some(request) = self.animator.tick(&mut self.tree, &mut self.camera, dt) {
            self.run_camera_request(request);
        }
        busy |= self.camera.tick(dt);
        busy |= self.animator.is_animating();

        let relayout = self.tree.layout_invalid() || (!busy && self.zoom_wants_relayout());
        if relayout && !self.animator.batch_open() {
            self.relayout(false);
            busy = true;
        }

        if let Some(request) = self.animator.take_idle_camera_request() {
            self.run_camera_request(request);
            busy = true;
        }

        busy || self.animator.is_animating() || self.camera.is_animating()
    }
}
