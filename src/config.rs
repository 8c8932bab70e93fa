use std::path::PathBuf;

use anyhow::Result;

use crate::dataset::{ScaffoldDataset, generate_demo_dataset, load_dataset};
use crate::layout::LayoutKind;

pub const DEFAULT_DEMO_SCAFFOLDS: usize = 1500;
pub const DEFAULT_DEMO_SEED: &str = "scaffold-hunter";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Demo { scaffolds: usize, seed: String },
}

impl DatasetSource {
    pub fn load(&self) -> Result<ScaffoldDataset> {
        match self {
            Self::File(path) => load_dataset(path),
            Self::Demo { scaffolds, seed } => Ok(generate_demo_dataset(*scaffolds, seed)?),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Demo { scaffolds, seed } => format!("demo ({scaffolds} scaffolds, seed {seed})"),
        }
    }
}

/// Everything the viewer needs from the command line.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub source: DatasetSource,
    pub layout: LayoutKind,
    pub initial_depth: usize,
    pub animation: bool,
    pub animation_secs: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            source: DatasetSource::Demo {
                scaffolds: DEFAULT_DEMO_SCAFFOLDS,
                seed: DEFAULT_DEMO_SEED.to_owned(),
            },
            layout: LayoutKind::Radial,
            initial_depth: 2,
            animation: true,
            animation_secs: 0.6,
        }
    }
}
