use std::cmp::Ordering;
use std::fmt;

use eframe::egui::Color32;

use crate::dataset::PropertyKey;
use crate::dataset::format_number;

mod accumulate;
mod engine;
mod job;
mod mapping;
mod order;
mod segments;
mod worker;

pub use engine::{AppliedJob, SortEngine};
pub use mapping::{ChannelMapping, MappingRequest, MappingState, VisualChannel};
pub use order::ChildOrder;
pub use segments::ColorSegment;

#[derive(Clone, Debug, PartialEq)]
pub enum SortValue {
    Number(f64),
    Text(String),
}

impl SortValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    /// Numbers order before text so mixed columns stay total.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }

    pub fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => {
                (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for SortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => f.write_str(&format_number(*value)),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Accumulation {
    #[default]
    Average,
    Sum,
    Min,
    Max,
}

impl Accumulation {
    pub const ALL: [Self; 4] = [Self::Average, Self::Sum, Self::Min, Self::Max];

    pub fn label(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Sum => "sum",
            Self::Min => "minimum",
            Self::Max => "maximum",
        }
    }
}

/// Declarative description of one property-driven value per scaffold.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyRequest {
    pub key: PropertyKey,
    pub accumulation: Accumulation,
    /// Fold the whole hierarchy subtree into each scaffold instead of only
    /// its own molecules.
    pub cumulative: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SortRequest {
    pub property: PropertyRequest,
    pub direction: SortDirection,
    pub color_segments: bool,
    pub captions: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendSample {
    pub caption: String,
    pub color: Color32,
}

/// What the UI shows about the active sort.
#[derive(Clone, Debug, Default)]
pub struct SortState {
    pub active: Option<SortRequest>,
    pub segments: Vec<ColorSegment>,
    pub legend: Vec<LegendSample>,
    pub last_error: Option<String>,
}
