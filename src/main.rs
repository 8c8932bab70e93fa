mod animation;
mod app;
mod config;
mod dataset;
mod layout;
mod scene;
mod selection;
mod sorting;
mod tree;
mod util;
mod view_state;
mod zoom;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_DEMO_SCAFFOLDS, DEFAULT_DEMO_SEED, DatasetSource, ViewerConfig};
use crate::layout::LayoutKind;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON scaffold dataset. A synthetic one is generated when omitted.
    #[arg(long)]
    dataset: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_DEMO_SCAFFOLDS)]
    demo_scaffolds: usize,

    #[arg(long, default_value = DEFAULT_DEMO_SEED)]
    demo_seed: String,

    #[arg(long, value_enum, default_value_t = LayoutKind::Radial)]
    layout: LayoutKind,

    /// Levels expanded below the root at start.
    #[arg(long, default_value_t = 2)]
    initial_depth: usize,

    #[arg(long, default_value_t = 600)]
    animation_ms: u64,

    #[arg(long)]
    no_animation: bool,

    /// Tracing filter directive, e.g. `scaffold_hunter=debug`.
    #[arg(long)]
    log_filter: Option<String>,
}

impl Args {
    fn into_config(self) -> ViewerConfig {
        let source = match self.dataset {
            Some(path) => DatasetSource::File(path),
            None => DatasetSource::Demo {
                scaffolds: self.demo_scaffolds,
                seed: self.demo_seed,
            },
        };
        ViewerConfig {
            source,
            layout: self.layout,
            initial_depth: self.initial_depth,
            animation: !self.no_animation,
            animation_secs: self.animation_ms as f32 / 1000.0,
        }
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = filter
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref());
    let config = args.into_config();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Scaffold Hunter",
        options,
        Box::new(move |cc| Ok(Box::new(app::ScaffoldHunterApp::new(cc, config.clone())))),
    )
}
