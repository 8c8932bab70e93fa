use std::collections::HashSet;

use eframe::egui::{self, Align2, Color32, FontId, Painter, Sense, StrokeKind, Ui, vec2};

use crate::animation::CameraRequest;
use crate::dataset::HierarchyProvider;
use crate::scene::{Scene, SceneInput, SceneKind, Shape, build_scene, node_zoom_level, visible_nodes};
use crate::util::short_label;

use super::super::render_utils::{
    annular_wedge, dim_color, draw_background, gradient_line, histogram_bars, molecule_grid,
};
use super::super::ViewModel;

impl ViewModel {
    /// Attaches or drops detail views for the current frame.
    fn update_detail_views(&mut self) {
        let visible = visible_nodes(
            &self.tree,
            &*self.dataset,
            self.engine.mappings(),
            &self.camera,
        );
        let keep = visible.iter().copied().collect::<HashSet<_>>();
        self.details.retain(|node| keep.contains(&node));
        for node in visible {
            let level = node_zoom_level(&self.tree, self.engine.mappings(), self.camera.zoom(), node);
            self.details.update(&*self.dataset, &self.tree, node, level);
        }
    }

    fn build_frame_scene(&self) -> Scene {
        build_scene(&SceneInput {
            tree: &self.tree,
            hierarchy: &*self.dataset,
            layout: &self.layout_result,
            layout_kind: self.layout.kind(),
            camera: &self.camera,
            mappings: self.engine.mappings(),
            sort: self.engine.state(),
            details: &self.details,
            cursor: self.cursor,
            show_guides: self.show_guides,
        })
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        if self.camera.set_viewport(rect) {
            self.request_camera(CameraRequest::Overview);
        }
        draw_background(&painter, rect, self.camera.pan(), self.camera.zoom());

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        self.handle_graph_keys(ui, &response);

        self.update_detail_views();
        let scene = self.build_frame_scene();
        self.visible_node_count = scene.visible_nodes;
        self.visible_edge_count = scene.visible_edges;
        paint_scene(&painter, &scene);

        let hovered = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer))
            .and_then(|pointer| self.node_at(pointer));
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if response.double_clicked_by(egui::PointerButton::Primary) {
            if let Some(node) = hovered {
                self.cursor = Some(node);
                self.toggle_node(node);
            }
        } else if response.clicked_by(egui::PointerButton::Primary) {
            let extend = ui.input(|input| input.modifiers.shift);
            match hovered {
                Some(node) => self.select_node(node, extend),
                None if !extend => self.clear_selection(),
                None => {}
            }
        }

        if let Some(node) = hovered
            && let Some(scaffold) = self.tree.scaffold_of(node)
        {
            let panel_text = format!(
                "{}  |  {scaffold}  |  {} molecules",
                short_label(self.dataset.label(scaffold), 40),
                self.dataset.molecules(scaffold).len()
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }
    }
}

fn paint_scene(painter: &Painter, scene: &Scene) {
    for item in &scene.items {
        match (&item.kind, &item.shape) {
            (
                SceneKind::Segment,
                Shape::Wedge {
                    center,
                    inner,
                    outer,
                    sector,
                    fill,
                },
            ) => annular_wedge(painter, *center, *inner, *outer, *sector, dim_color(*fill, 0.55)),
            (SceneKind::Segment, Shape::Band { rect, fill }) => {
                painter.rect_filled(*rect, 0.0, dim_color(*fill, 0.55));
            }
            (_, Shape::Ring {
                center,
                radius,
                stroke,
            }) => {
                painter.circle_stroke(*center, *radius, *stroke);
            }
            (
                _,
                Shape::Line {
                    from,
                    to,
                    width,
                    from_color,
                    to_color,
                },
            ) => gradient_line(painter, *from, *to, *width, *from_color, *to_color),
            (
                _,
                Shape::Circle {
                    center,
                    radius,
                    fill,
                    stroke,
                },
            ) => {
                painter.circle(*center, *radius, *fill, *stroke);
            }
            (
                _,
                Shape::RoundedRect {
                    rect,
                    rounding,
                    fill,
                    stroke,
                },
            ) => {
                painter.rect(*rect, *rounding, *fill, *stroke, StrokeKind::Inside);
            }
            (
                _,
                Shape::Text {
                    pos,
                    text,
                    size,
                    color,
                    align,
                },
            ) => {
                painter.text(*pos, *align, text, FontId::proportional(*size), *color);
            }
            (_, Shape::Bars { rect, bins, color }) => histogram_bars(painter, *rect, bins, *color),
            (
                _,
                Shape::Grid {
                    rect,
                    columns,
                    cells,
                    page,
                    pages,
                },
            ) => molecule_grid(painter, *rect, *columns, cells, *page, *pages),
            (_, Shape::Wedge { .. } | Shape::Band { .. }) => {}
        }
    }
    if scene.items.is_empty() {
        painter.text(
            painter.clip_rect().center(),
            Align2::CENTER_CENTER,
            "The tree is empty.",
            FontId::proportional(14.0),
            Color32::from_gray(200),
        );
    }
}
