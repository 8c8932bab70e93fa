use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, TAU};

use eframe::egui::{Vec2, vec2};

use crate::tree::{NodeId, VisualTree};

use super::{
    Guide, LayoutInput, LayoutKind, LayoutResult, RadiusScale, Sector, TreeLayout, leaf_counts,
    levels,
};

const NODE_GAP: f32 = 24.0;
const LEVEL_GAP: f32 = 180.0;
const MIN_HALF_ANGLE: f32 = 1e-4;
const MIN_WEIGHT: f32 = 1e-3;

/// Classic radial layout: every subtree owns an angular sector proportional
/// to its leaf count.
#[derive(Clone, Debug, Default)]
pub struct RadialLayout {
    radius: RadiusScale,
}

impl TreeLayout for RadialLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Radial
    }

    fn compute(&self, tree: &VisualTree, input: &LayoutInput) -> LayoutResult {
        let Some(root) = tree.root() else {
            return LayoutResult::default();
        };

        let weights = leaf_counts(tree, root)
            .into_iter()
            .map(|(node, leaves)| (node, leaves as f32))
            .collect::<HashMap<_, _>>();
        let levels = levels(tree, root);
        let spacing = levels
            .iter()
            .flatten()
            .map(|node| input.diameter(*node))
            .fold(0.0_f32, f32::max)
            + NODE_GAP;
        let gap = (LEVEL_GAP * self.radius.get()).max(spacing);

        let plan = RingPlan {
            spacing: vec![spacing; levels.len()],
            increments: vec![gap; levels.len()],
        };
        place_on_rings(tree, root, &levels, &weights, &plan)
    }

    fn radius_factor(&self) -> f32 {
        self.radius.get()
    }

    fn update_radii(&mut self, delta: f32) {
        self.radius.adjust(delta);
    }

    fn reset_radii(&mut self) {
        self.radius.reset();
    }
}

/// Per-depth distances that drive ring placement.
pub(super) struct RingPlan {
    /// Minimum center distance between two nodes on ring `d`.
    pub(super) spacing: Vec<f32>,
    /// Minimum radial step from ring `d - 1` to ring `d`.
    pub(super) increments: Vec<f32>,
}

/// Shared sector machinery of both radial strategies.
pub(super) fn place_on_rings(
    tree: &VisualTree,
    root: NodeId,
    levels: &[Vec<NodeId>],
    weights: &HashMap<NodeId, f32>,
    plan: &RingPlan,
) -> LayoutResult {
    let sectors = allocate_sectors(tree, root, weights);

    let mut radii = vec![0.0_f32; levels.len()];
    for depth in 1..levels.len() {
        let spacing = plan.spacing.get(depth).copied().unwrap_or(0.0);
        let needed = levels[depth]
            .iter()
            .filter_map(|node| sectors.get(node))
            .map(|sector| ring_radius_for(spacing, sector.span()))
            .fold(0.0_f32, f32::max);
        let increment = plan.increments.get(depth).copied().unwrap_or(0.0);
        radii[depth] = needed.max(radii[depth - 1] + increment);
    }

    let mut positions = HashMap::with_capacity(sectors.len());
    for (depth, level) in levels.iter().enumerate() {
        for node in level {
            let position = match sectors.get(node) {
                Some(sector) if depth > 0 => polar(radii[depth], sector.mid()),
                _ => Vec2::ZERO,
            };
            positions.insert(*node, position);
        }
    }

    let guides = ring_guides(tree, root, &sectors, &radii, plan);
    let spacing = plan
        .spacing
        .iter()
        .skip(1)
        .copied()
        .fold(f32::INFINITY, f32::min);

    LayoutResult {
        positions,
        sectors,
        radii,
        guides,
        spacing: if spacing.is_finite() { spacing } else { 0.0 },
        ..LayoutResult::default()
    }
}

/// Smallest radius at which two nodes whose sectors are at least `span`
/// wide keep `spacing` between their centers.
pub(super) fn ring_radius_for(spacing: f32, span: f32) -> f32 {
    let half = (span * 0.5).clamp(MIN_HALF_ANGLE, FRAC_PI_2);
    spacing / (2.0 * half.sin())
}

/// Top-down sector split. An only child inherits its parent's sector, so
/// it sits on the parent's ray.
fn allocate_sectors(
    tree: &VisualTree,
    root: NodeId,
    weights: &HashMap<NodeId, f32>,
) -> HashMap<NodeId, Sector> {
    let mut sectors = HashMap::new();
    sectors.insert(
        root,
        Sector {
            start: 0.0,
            end: TAU,
        },
    );

    for node in tree.subtree(root) {
        let Some(sector) = sectors.get(&node).copied() else {
            continue;
        };
        let children = tree.children(node);
        if let [only] = children {
            sectors.insert(*only, sector);
            continue;
        }

        let weight = |child: &NodeId| weights.get(child).copied().unwrap_or(1.0).max(MIN_WEIGHT);
        let total = children.iter().map(weight).sum::<f32>().max(MIN_WEIGHT);
        let mut start = sector.start;
        for (index, child) in children.iter().enumerate() {
            let end = if index + 1 == children.len() {
                sector.end
            } else {
                start + sector.span() * weight(child) / total
            };
            sectors.insert(*child, Sector { start, end });
            start = end;
        }
    }
    sectors
}

fn ring_guides(
    tree: &VisualTree,
    root: NodeId,
    sectors: &HashMap<NodeId, Sector>,
    radii: &[f32],
    plan: &RingPlan,
) -> Vec<Guide> {
    let mut guides = radii
        .iter()
        .skip(1)
        .map(|radius| Guide::Circle { radius: *radius })
        .collect::<Vec<_>>();

    let top_level = tree.children(root);
    if top_level.len() > 1 {
        let inner = radii.get(1).copied().unwrap_or(0.0) * 0.5;
        let outer = radii.last().copied().unwrap_or(0.0)
            + plan.spacing.last().copied().unwrap_or(0.0);
        guides.extend(
            top_level
                .iter()
                .filter_map(|child| sectors.get(child))
                .map(|sector| Guide::Separator {
                    angle: sector.start,
                    inner,
                    outer,
                }),
        );
    }
    guides
}

pub(super) fn polar(radius: f32, angle: f32) -> Vec2 {
    vec2(angle.cos(), angle.sin()) * radius
}

#[cfg(test)]
pub(super) fn assert_siblings_apart(
    tree: &VisualTree,
    result: &LayoutResult,
    min_distance: impl Fn(NodeId, NodeId) -> f32,
) {
    for node in tree.preorder() {
        let children = tree.children(node);
        for (index, a) in children.iter().enumerate() {
            for b in &children[index + 1..] {
                let (sa, sb) = (result.sectors[a], result.sectors[b]);
                assert!(
                    sa.end <= sb.start + 1e-4 || sb.end <= sa.start + 1e-4,
                    "sectors of {a:?} and {b:?} overlap"
                );
                let distance = (result.positions[a] - result.positions[b]).length();
                assert!(
                    distance + 1e-2 >= min_distance(*a, *b),
                    "{a:?} and {b:?} are {distance} apart"
                );
            }
        }
    }
}
