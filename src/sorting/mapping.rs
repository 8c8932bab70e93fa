use std::collections::HashMap;

use eframe::egui::Color32;

use crate::dataset::ScaffoldId;
use crate::util::{blend_color, stable_unit};

use super::{PropertyRequest, SortValue};

pub const INFO_BAR_BINS: usize = 8;
const MIN_NODE_SCALE: f32 = 0.5;
const MAX_NODE_SCALE: f32 = 2.0;
const MIN_EDGE_WIDTH: f32 = 1.0;
const MAX_EDGE_WIDTH: f32 = 6.0;
const LOW_COLOR: Color32 = Color32::from_rgb(66, 133, 214);
const HIGH_COLOR: Color32 = Color32::from_rgb(232, 96, 64);
pub const MISSING_COLOR: Color32 = Color32::from_rgb(118, 118, 118);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisualChannel {
    NodeSize,
    NodeColor,
    EdgeWidth,
    InfoBar,
}

impl VisualChannel {
    pub const ALL: [Self; 4] = [Self::NodeSize, Self::NodeColor, Self::EdgeWidth, Self::InfoBar];

    pub fn label(self) -> &'static str {
        match self {
            Self::NodeSize => "Node size",
            Self::NodeColor => "Node color",
            Self::EdgeWidth => "Edge width",
            Self::InfoBar => "Info bar",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MappingRequest {
    pub channel: VisualChannel,
    pub property: PropertyRequest,
}

/// Applied mapping for one channel. Holds plain values only, so it stays
/// valid after the provider released its locks.
#[derive(Clone, Debug)]
pub struct ChannelMapping {
    pub request: MappingRequest,
    values: HashMap<ScaffoldId, SortValue>,
    range: Option<(f64, f64)>,
    histograms: HashMap<ScaffoldId, Vec<u32>>,
}

impl ChannelMapping {
    pub fn new(
        request: MappingRequest,
        values: HashMap<ScaffoldId, SortValue>,
        samples: &HashMap<ScaffoldId, Vec<f64>>,
    ) -> Self {
        let range = values
            .values()
            .filter_map(SortValue::as_number)
            .fold(None, |range: Option<(f64, f64)>, value| match range {
                Some((min, max)) => Some((min.min(value), max.max(value))),
                None => Some((value, value)),
            });

        let sample_range = samples
            .values()
            .flatten()
            .fold(None, |range: Option<(f64, f64)>, value| match range {
                Some((min, max)) => Some((min.min(*value), max.max(*value))),
                None => Some((*value, *value)),
            });
        let histograms = match sample_range {
            Some((min, max)) => samples
                .iter()
                .map(|(scaffold, values)| (*scaffold, histogram(values, min, max)))
                .collect(),
            None => HashMap::new(),
        };

        Self {
            request,
            values,
            range,
            histograms,
        }
    }

    pub fn value(&self, scaffold: ScaffoldId) -> Option<&SortValue> {
        self.values.get(&scaffold)
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    /// Position of the scaffold's value in `[0, 1]`. Text values hash to a
    /// stable position.
    pub fn normalized(&self, scaffold: ScaffoldId) -> Option<f32> {
        match self.values.get(&scaffold)? {
            SortValue::Number(value) => {
                let (min, max) = self.range?;
                let span = max - min;
                if span <= f64::EPSILON {
                    return Some(0.5);
                }
                Some((((value - min) / span) as f32).clamp(0.0, 1.0))
            }
            SortValue::Text(text) => Some(stable_unit(text)),
        }
    }

    pub fn histogram(&self, scaffold: ScaffoldId) -> Option<&[u32]> {
        self.histograms.get(&scaffold).map(Vec::as_slice)
    }
}

fn histogram(values: &[f64], min: f64, max: f64) -> Vec<u32> {
    let mut bins = vec![0u32; INFO_BAR_BINS];
    let span = max - min;
    for value in values {
        let bin = if span <= f64::EPSILON {
            INFO_BAR_BINS / 2
        } else {
            (((value - min) / span) * INFO_BAR_BINS as f64).floor() as usize
        };
        bins[bin.min(INFO_BAR_BINS - 1)] += 1;
    }
    bins
}

/// Every active mapping, at most one per channel.
#[derive(Clone, Debug, Default)]
pub struct MappingState {
    channels: HashMap<VisualChannel, ChannelMapping>,
}

impl MappingState {
    pub fn install(&mut self, mapping: ChannelMapping) {
        self.channels.insert(mapping.request.channel, mapping);
    }

    pub fn disable(&mut self, channel: VisualChannel) -> bool {
        self.channels.remove(&channel).is_some()
    }

    pub fn is_active(&self, channel: VisualChannel) -> bool {
        self.channels.contains_key(&channel)
    }

    pub fn get(&self, channel: VisualChannel) -> Option<&ChannelMapping> {
        self.channels.get(&channel)
    }

    pub fn node_scale(&self, scaffold: ScaffoldId) -> f32 {
        self.channels
            .get(&VisualChannel::NodeSize)
            .and_then(|mapping| mapping.normalized(scaffold))
            .map(|t| MIN_NODE_SCALE + (MAX_NODE_SCALE - MIN_NODE_SCALE) * t)
            .unwrap_or(1.0)
    }

    /// `None` when no color mapping is active.
    pub fn node_color(&self, scaffold: ScaffoldId) -> Option<Color32> {
        let mapping = self.channels.get(&VisualChannel::NodeColor)?;
        Some(match mapping.normalized(scaffold) {
            Some(t) => blend_color(LOW_COLOR, HIGH_COLOR, t),
            None => MISSING_COLOR,
        })
    }

    /// Width of the edge leading into `scaffold`.
    pub fn edge_width(&self, scaffold: ScaffoldId) -> Option<f32> {
        let mapping = self.channels.get(&VisualChannel::EdgeWidth)?;
        Some(match mapping.normalized(scaffold) {
            Some(t) => MIN_EDGE_WIDTH + (MAX_EDGE_WIDTH - MIN_EDGE_WIDTH) * t,
            None => MIN_EDGE_WIDTH,
        })
    }

    pub fn info_bar(&self, scaffold: ScaffoldId) -> Option<&[u32]> {
        self.channels
            .get(&VisualChannel::InfoBar)
            .and_then(|mapping| mapping.histogram(scaffold))
    }
}
