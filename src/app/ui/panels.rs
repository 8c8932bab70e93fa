use std::collections::VecDeque;
use std::sync::Arc;

use eframe::egui::{self, Align, Context, Layout};
use tracing::warn;

use crate::animation::{Animator, Camera, CameraRequest};
use crate::config::ViewerConfig;
use crate::dataset::{HierarchyProvider, ScaffoldDataset};
use crate::layout::{LayoutInput, LayoutResult};
use crate::selection::SelectionSet;
use crate::sorting::SortEngine;
use crate::tree::{ExpandDepth, VisualTree};
use crate::view_state::{ViewSnapshot, ViewStateTracker};
use crate::zoom::DetailViews;

use super::super::{MappingForm, SortForm, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(
        dataset: Arc<ScaffoldDataset>,
        config: &ViewerConfig,
        snapshot: Option<ViewSnapshot>,
    ) -> Self {
        let mut tree = VisualTree::new();
        let tracker = ViewStateTracker::attach(&mut tree);
        let detail_events = tree.subscribe();
        let mut selection = SelectionSet::new();
        let selection_rx = selection.subscribe();

        match snapshot {
            Some(snapshot) => {
                if let Err(error) = snapshot.restore(&mut tree, &*dataset) {
                    warn!(%error, "view state could not be fully restored");
                }
            }
            None => {
                if let Some(root_scaffold) = dataset.root() {
                    match tree.create_root(&*dataset, root_scaffold) {
                        Ok(root) => {
                            tree.expand(&*dataset, root, ExpandDepth::Levels(config.initial_depth));
                        }
                        Err(error) => warn!(%error, "cannot create the tree root"),
                    }
                }
            }
        }

        let mut model = Self {
            engine: SortEngine::new(Arc::clone(&dataset)),
            source_label: config.source.describe(),
            dataset,
            cursor: tree.root(),
            tree,
            detail_events,
            tracker,
            layout: config.layout.build(),
            layout_result: LayoutResult::default(),
            layout_input: LayoutInput::default(),
            layout_zoom: 1.0,
            fixed_radius: true,
            show_guides: true,
            camera: Camera::default(),
            animator: Animator::new(config.animation, config.animation_secs),
            selection,
            selection_rx,
            details: DetailViews::new(true),
            search: String::new(),
            install_expands_ancestors: false,
            sort_form: SortForm::default(),
            mapping_form: MappingForm::default(),
            status: None,
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
            visible_node_count: 0,
            visible_edge_count: 0,
        };
        model.tracker.sync(&model.tree);
        model.relayout(true);
        model.run_camera_request(CameraRequest::Overview);
        model
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.update_fps_counter(ctx);
        let dt = ctx.input(|input| input.stable_dt).clamp(0.0, 0.1);
        if self.frame_step(dt) {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Scaffold Hunter");
                    ui.separator();
                    ui.label(format!("dataset: {}", self.dataset.name));
                    ui.label(format!("source: {}", self.source_label));
                    ui.label(format!("scaffolds: {}", self.dataset.scaffold_count()));
                    ui.label(format!("molecules: {}", self.dataset.molecule_count()));
                    ui.label(format!("shown: {}", self.tree.node_count()));
                    ui.label(format!(
                        "loaded values: {}",
                        self.dataset.properties().loaded_count()
                    ));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload dataset"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Relayout").clicked() {
                        self.tree.invalidate_layout();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_tree_text());
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                        if self.engine.is_busy() {
                            ui.spinner();
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_details(ui));
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }
}
