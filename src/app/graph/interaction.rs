use eframe::egui::{self, Key, Pos2, Rect, Ui};
use tracing::{debug, warn};

use crate::animation::CameraRequest;
use crate::dataset::{HierarchyProvider, ScaffoldId};
use crate::scene::{node_size, visible_nodes};
use crate::tree::{ExpandDepth, NodeId};

use super::super::{CursorMove, ViewModel};

/// Smallest on-screen hit box, so dots stay clickable.
const MIN_HIT_EXTENT: f32 = 8.0;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        self.camera.zoom_about(pointer, scroll);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.camera.pan_by(response.drag_delta());
        }
    }

    pub(in crate::app) fn handle_graph_keys(&mut self, ui: &Ui, response: &egui::Response) {
        if !response.hovered() || ui.ctx().wants_keyboard_input() {
            return;
        }

        let (up, down, left, right, plus, minus, home) = ui.input(|input| {
            (
                input.key_pressed(Key::ArrowUp),
                input.key_pressed(Key::ArrowDown),
                input.key_pressed(Key::ArrowLeft),
                input.key_pressed(Key::ArrowRight),
                input.key_pressed(Key::Plus) || input.key_pressed(Key::Equals),
                input.key_pressed(Key::Minus),
                input.key_pressed(Key::Home),
            )
        });

        if up {
            self.move_cursor(CursorMove::Parent);
        }
        if down {
            self.move_cursor(CursorMove::FirstChild);
        }
        if left {
            self.move_cursor(CursorMove::PreviousSibling);
        }
        if right {
            self.move_cursor(CursorMove::NextSibling);
        }
        if let Some(node) = self.cursor {
            if plus && self.tree.is_expandable(&*self.dataset, node) {
                self.toggle_node(node);
            } else if minus && self.tree.is_reducible(node) {
                self.toggle_node(node);
            }
        }
        if home {
            self.request_camera(CameraRequest::Overview);
        }
    }

    /// Topmost visible node whose depiction contains `pointer`.
    pub(in crate::app) fn node_at(&self, pointer: Pos2) -> Option<NodeId> {
        let zoom = self.camera.zoom();
        visible_nodes(&self.tree, &*self.dataset, self.engine.mappings(), &self.camera)
            .into_iter()
            .rev()
            .find(|node| {
                let Some(world) = self.tree.position(*node) else {
                    return false;
                };
                let size = (node_size(&self.tree, &*self.dataset, self.engine.mappings(), *node)
                    * zoom)
                    .max(egui::Vec2::splat(MIN_HIT_EXTENT));
                Rect::from_center_size(self.camera.world_to_screen(world), size).contains(pointer)
            })
    }

    /// Selects the molecules of `node`. With `extend` the node is toggled
    /// in the current selection instead of replacing it.
    pub(in crate::app) fn select_node(&mut self, node: NodeId, extend: bool) {
        let Some(scaffold) = self.tree.scaffold_of(node) else {
            return;
        };
        let molecules = self.dataset.molecules(scaffold);
        if extend {
            self.selection.toggle(molecules);
        } else {
            self.selection.clear();
            self.selection.add_all(molecules);
        }
        self.cursor = Some(node);
    }

    pub(in crate::app) fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Expands a collapsed node by one level or reduces an expanded one,
    /// keeping it stationary on screen.
    pub(in crate::app) fn toggle_node(&mut self, node: NodeId) {
        self.animator.fix_camera_on_node(&self.tree, node);
        if self.tree.is_expandable(&*self.dataset, node) {
            match self.tree.try_expand(&*self.dataset, node, ExpandDepth::Levels(1)) {
                Ok(()) => self.engine.resort_subtree(&mut self.tree, node),
                Err(error) => debug!(%error, "expand ignored"),
            }
        } else if let Err(error) = self.tree.try_reduce(node) {
            debug!(%error, "reduce ignored");
        }
        self.keep_cursor_or(node);
    }

    pub(in crate::app) fn expand_subtree(&mut self, node: NodeId) {
        self.animator.fix_camera_on_node(&self.tree, node);
        match self.tree.try_expand(&*self.dataset, node, ExpandDepth::All) {
            Ok(()) => self.engine.resort_subtree(&mut self.tree, node),
            Err(error) => debug!(%error, "subtree expansion ignored"),
        }
    }

    pub(in crate::app) fn reduce_to_root(&mut self) {
        let Some(root) = self.tree.root() else {
            return;
        };
        self.animator.fix_camera_on_node(&self.tree, root);
        if self.tree.reduce(root) {
            self.cursor = Some(root);
            self.animator.queue_camera(CameraRequest::Overview);
        }
    }

    pub(in crate::app) fn expand_root_upward(&mut self) {
        if !self.tree.expand_root_upward(&*self.dataset) {
            return;
        }
        if let Some(root) = self.tree.root() {
            self.engine.resort_subtree(&mut self.tree, root);
        }
        self.animator.queue_camera(CameraRequest::Overview);
    }

    /// Makes `scaffold` visible and moves the camera onto it.
    pub(in crate::app) fn install_scaffold(&mut self, scaffold: ScaffoldId) {
        match self
            .tree
            .install_node(&*self.dataset, scaffold, self.install_expands_ancestors)
        {
            Ok(node) => {
                if let Some(root) = self.tree.root() {
                    self.engine.resort_subtree(&mut self.tree, root);
                }
                self.cursor = Some(node);
                let zoom = self.camera.zoom().max(1.0);
                self.request_camera(CameraRequest::Focus { node, zoom });
            }
            Err(error) => {
                warn!(%error, "cannot install scaffold");
                self.status = Some(error.to_string());
            }
        }
    }

    pub(in crate::app) fn move_cursor(&mut self, step: CursorMove) {
        let Some(current) = self.cursor.or_else(|| self.tree.root()) else {
            return;
        };
        let next = match step {
            CursorMove::Parent => self.tree.parent(current),
            CursorMove::FirstChild => self.tree.children(current).first().copied(),
            CursorMove::PreviousSibling | CursorMove::NextSibling => {
                self.tree.parent(current).and_then(|parent| {
                    let siblings = self.tree.children(parent);
                    let index = siblings.iter().position(|sibling| *sibling == current)?;
                    if step == CursorMove::NextSibling {
                        siblings.get(index + 1).copied()
                    } else {
                        index.checked_sub(1).and_then(|index| siblings.get(index).copied())
                    }
                })
            }
        };
        let Some(next) = next else {
            self.cursor = Some(current);
            return;
        };
        self.cursor = Some(next);

        if let Some(world) = self.tree.position(next)
            && !self.camera.is_visible(world, 0.0)
        {
            let zoom = self.camera.zoom();
            self.request_camera(CameraRequest::Focus { node: next, zoom });
        }
    }

    fn keep_cursor_or(&mut self, fallback: NodeId) {
        if self.cursor.is_some_and(|cursor| self.tree.node(cursor).is_none()) {
            self.cursor = Some(fallback);
        }
    }
}
