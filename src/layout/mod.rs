use std::collections::HashMap;
use std::time::Instant;

use eframe::egui::{Vec2, vec2};
use tracing::debug;

use crate::dataset::HierarchyProvider;
use crate::sorting::MappingState;
use crate::tree::{NodeId, VisualTree};

mod balloon;
mod linear;
mod radial;
mod radial_width;

pub use balloon::BalloonLayout;
pub use linear::LinearLayout;
pub use radial::RadialLayout;
pub use radial_width::RadialWidthLayout;

const DEFAULT_NODE_SIZE: Vec2 = vec2(80.0, 60.0);
const MIN_NODE_EXTENT: f32 = 4.0;
pub const MIN_RADIUS_FACTOR: f32 = 0.2;
pub const MAX_RADIUS_FACTOR: f32 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum LayoutKind {
    #[default]
    Radial,
    RadialWidth,
    Balloon,
    Linear,
}

impl LayoutKind {
    pub const ALL: [Self; 4] = [Self::Radial, Self::RadialWidth, Self::Balloon, Self::Linear];

    pub fn label(self) -> &'static str {
        match self {
            Self::Radial => "Radial",
            Self::RadialWidth => "Radial (width)",
            Self::Balloon => "Balloon",
            Self::Linear => "Linear",
        }
    }

    pub fn is_radial(self) -> bool {
        matches!(self, Self::Radial | Self::RadialWidth)
    }

    pub fn build(self) -> Box<dyn TreeLayout> {
        match self {
            Self::Radial => Box::new(RadialLayout::default()),
            Self::RadialWidth => Box::new(RadialWidthLayout::default()),
            Self::Balloon => Box::new(BalloonLayout::default()),
            Self::Linear => Box::new(LinearLayout::default()),
        }
    }
}

/// Interchangeable strategy turning the materialized tree into positions.
/// `compute` is pure: the same tree and input always give the same result.
pub trait TreeLayout: Send {
    fn kind(&self) -> LayoutKind;
    fn compute(&self, tree: &VisualTree, input: &LayoutInput) -> LayoutResult;
    fn radius_factor(&self) -> f32;
    fn update_radii(&mut self, delta: f32);
    fn reset_radii(&mut self);
}

/// Everything a layout pass reads besides the tree structure.
#[derive(Clone, Debug)]
pub struct LayoutInput {
    pub sizes: HashMap<NodeId, Vec2>,
    /// Current camera scale, only read when `fixed_radius` is off.
    pub zoom: f32,
    pub fixed_radius: bool,
}

impl Default for LayoutInput {
    fn default() -> Self {
        Self {
            sizes: HashMap::new(),
            zoom: 1.0,
            fixed_radius: true,
        }
    }
}

impl LayoutInput {
    pub fn from_tree(
        tree: &VisualTree,
        hierarchy: &dyn HierarchyProvider,
        mappings: &MappingState,
        zoom: f32,
        fixed_radius: bool,
    ) -> Self {
        let sizes = tree
            .preorder()
            .into_iter()
            .filter_map(|node| {
                let visual = tree.node(node)?;
                let scale = visual.scale() * mappings.node_scale(visual.scaffold);
                Some((node, hierarchy.intrinsic_size(visual.scaffold) * scale))
            })
            .collect();
        Self {
            sizes,
            zoom,
            fixed_radius,
        }
    }

    pub fn size(&self, node: NodeId) -> Vec2 {
        self.sizes
            .get(&node)
            .copied()
            .unwrap_or(DEFAULT_NODE_SIZE)
            .max(Vec2::splat(MIN_NODE_EXTENT))
    }

    /// Diameter of the circle enclosing the node's depiction.
    pub fn diameter(&self, node: NodeId) -> f32 {
        self.size(node).length()
    }
}

/// Angular interval in radians, `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sector {
    pub start: f32,
    pub end: f32,
}

impl Sector {
    pub fn span(&self) -> f32 {
        self.end - self.start
    }

    pub fn mid(&self) -> f32 {
        (self.start + self.end) * 0.5
    }
}

/// Vertical interval owned by a subtree in the linear layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Band {
    pub top: f32,
    pub bottom: f32,
}

impl Band {
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> f32 {
        (self.top + self.bottom) * 0.5
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Guide {
    Circle { radius: f32 },
    Separator { angle: f32, inner: f32, outer: f32 },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutResult {
    pub positions: HashMap<NodeId, Vec2>,
    pub sectors: HashMap<NodeId, Sector>,
    pub bands: HashMap<NodeId, Band>,
    /// Ring radius per depth for radial strategies, `radii[0] == 0`.
    pub radii: Vec<f32>,
    pub guides: Vec<Guide>,
    /// Smallest center distance the pass kept between same-depth nodes.
    pub spacing: f32,
}

impl LayoutResult {
    pub fn position(&self, node: NodeId) -> Option<Vec2> {
        self.positions.get(&node).copied()
    }

    /// Axis-aligned world bounds of all placed nodes including their sizes.
    pub fn bounds(&self, input: &LayoutInput) -> Option<(Vec2, Vec2)> {
        self.positions.iter().fold(None, |bounds, (node, position)| {
            let half = input.size(*node) * 0.5;
            let (min, max) = (*position - half, *position + half);
            Some(match bounds {
                Some((lo, hi)) => (min.min(lo), max.max(hi)),
                None => (min, max),
            })
        })
    }
}

pub fn run_pass(layout: &dyn TreeLayout, tree: &VisualTree, input: &LayoutInput) -> LayoutResult {
    let started = Instant::now();
    let result = layout.compute(tree, input);
    debug!(
        kind = ?layout.kind(),
        nodes = result.positions.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "layout pass"
    );
    result
}

/// User adjustable multiplier on ring distances shared by all strategies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RadiusScale(f32);

impl Default for RadiusScale {
    fn default() -> Self {
        Self(1.0)
    }
}

impl RadiusScale {
    pub(crate) fn get(self) -> f32 {
        self.0
    }

    pub(crate) fn adjust(&mut self, delta: f32) {
        self.0 = (self.0 + delta).clamp(MIN_RADIUS_FACTOR, MAX_RADIUS_FACTOR);
    }

    pub(crate) fn reset(&mut self) {
        self.0 = 1.0;
    }
}

/// Nodes grouped by depth, each level in tree order.
pub(crate) fn levels(tree: &VisualTree, root: NodeId) -> Vec<Vec<NodeId>> {
    let mut levels = vec![vec![root]];
    loop {
        let next = levels
            .last()
            .map(|level| {
                level
                    .iter()
                    .flat_map(|node| tree.children(*node).iter().copied())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if next.is_empty() {
            return levels;
        }
        levels.push(next);
    }
}

pub(crate) fn leaf_counts(tree: &VisualTree, root: NodeId) -> HashMap<NodeId, usize> {
    let mut counts = HashMap::new();
    for node in tree.subtree(root).into_iter().rev() {
        let children = tree.children(node);
        let count = if children.is_empty() {
            1
        } else {
            children
                .iter()
                .map(|child| counts.get(child).copied().unwrap_or(1))
                .sum()
        };
        counts.insert(node, count);
    }
    counts
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::dataset::test_support::DatasetBuilder;
    use crate::dataset::{ScaffoldDataset, ScaffoldId};
    use crate::tree::{ExpandDepth, VisualTree};

    /// Fully expanded tree over `edges` given as `(child, parent)`.
    pub(crate) fn tree_from(root: u32, edges: &[(u32, u32)]) -> (ScaffoldDataset, VisualTree) {
        let mut builder = DatasetBuilder::new().scaffold(root, None);
        for (child, parent) in edges {
            builder = builder.scaffold(*child, Some(*parent));
        }
        let data = builder.build();
        let mut tree = VisualTree::new();
        if let Ok(node) = tree.create_root(&data, ScaffoldId(root)) {
            tree.expand(&data, node, ExpandDepth::All);
        }
        (data, tree)
    }

    /// Root 1 with a mix of wide and deep branches.
    pub(crate) fn mixed_tree() -> (ScaffoldDataset, VisualTree) {
        tree_from(
            1,
            &[
                (2, 1),
                (3, 1),
                (4, 1),
                (5, 2),
                (6, 2),
                (7, 2),
                (8, 3),
                (9, 8),
                (10, 9),
                (11, 4),
                (12, 4),
                (13, 11),
                (14, 11),
                (15, 11),
                (16, 11),
            ],
        )
    }
}
