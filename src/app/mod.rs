use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use tracing::{info, warn};

use crate::animation::{Animator, Camera};
use crate::config::{DatasetSource, ViewerConfig};
use crate::dataset::{PropertyKey, ScaffoldDataset};
use crate::layout::{LayoutInput, LayoutResult, TreeLayout};
use crate::selection::{SelectionChanged, SelectionSet};
use crate::sorting::{Accumulation, SortDirection, SortEngine, VisualChannel};
use crate::tree::{NodeId, TreeEvent, VisualTree};
use crate::view_state::{ViewSnapshot, ViewStateTracker};
use crate::zoom::DetailViews;

mod graph;
mod render_utils;
mod ui;

type LoadResult = Result<ScaffoldDataset, String>;

pub struct ScaffoldHunterApp {
    config: ViewerConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    dataset: Arc<ScaffoldDataset>,
    source_label: String,
    tree: VisualTree,
    detail_events: Receiver<TreeEvent>,
    tracker: ViewStateTracker,
    layout: Box<dyn TreeLayout>,
    layout_result: LayoutResult,
    layout_input: LayoutInput,
    layout_zoom: f32,
    fixed_radius: bool,
    show_guides: bool,
    camera: Camera,
    animator: Animator,
    engine: SortEngine<ScaffoldDataset>,
    selection: SelectionSet,
    selection_rx: Receiver<SelectionChanged>,
    details: DetailViews,
    cursor: Option<NodeId>,
    search: String,
    install_expands_ancestors: bool,
    sort_form: SortForm,
    mapping_form: MappingForm,
    status: Option<String>,
    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
    visible_node_count: usize,
    visible_edge_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CursorMove {
    Parent,
    FirstChild,
    PreviousSibling,
    NextSibling,
}

struct SortForm {
    key: Option<PropertyKey>,
    accumulation: Accumulation,
    cumulative: bool,
    direction: SortDirection,
    color_segments: bool,
    captions: bool,
}

struct MappingForm {
    channel: VisualChannel,
    key: Option<PropertyKey>,
    accumulation: Accumulation,
    cumulative: bool,
}

impl ScaffoldHunterApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Self {
        let state = Self::start_load(config.source.clone());
        Self {
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: DatasetSource) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = source.load().map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: DatasetSource) -> AppState {
        info!(source = %source.describe(), "loading dataset");
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }

    fn ready(&self, dataset: ScaffoldDataset, snapshot: Option<ViewSnapshot>) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(
            Arc::new(dataset),
            &self.config,
            snapshot,
        )))
    }
}

impl eframe::App for ScaffoldHunterApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(dataset)) => transition = Some(Ok((dataset, None))),
                    Ok(Err(error)) => transition = Some(Err(error)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading scaffold tree...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the scaffold dataset");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    info!("reloading dataset");
                    self.reload_rx = Some(Self::spawn_load(self.config.source.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(dataset)) => {
                            transition = Some(Ok((dataset, Some(model.tracker.snapshot()))));
                        }
                        Ok(Err(error)) => {
                            warn!(%error, "reload failed, keeping the current tree");
                            model.status = Some(format!("Reload failed: {error}"));
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.status = Some("Background load worker disconnected".to_owned());
                        }
                    }
                }
            }
        }

        if retry {
            self.state = Self::start_load(self.config.source.clone());
        }

        if let Some(next) = transition {
            self.reload_rx = None;
            self.state = match next {
                Ok((dataset, snapshot)) => self.ready(dataset, snapshot),
                Err(error) => AppState::Error(error),
            };
        }
    }
}

impl Default for SortForm {
    fn default() -> Self {
        Self {
            key: None,
            accumulation: Accumulation::Average,
            cumulative: false,
            direction: SortDirection::Ascending,
            color_segments: true,
            captions: true,
        }
    }
}

impl Default for MappingForm {
    fn default() -> Self {
        Self {
            channel: VisualChannel::NodeColor,
            key: None,
            accumulation: Accumulation::Average,
            cumulative: false,
        }
    }
}
