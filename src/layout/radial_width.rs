use std::collections::HashMap;

use crate::tree::{NodeId, VisualTree};

use super::radial::{RingPlan, place_on_rings};
use super::{LayoutInput, LayoutKind, LayoutResult, RadiusScale, TreeLayout, levels};

const NODE_GAP: f32 = 16.0;
const MIN_ZOOM: f32 = 0.01;
/// On-screen diameter a node keeps when zoomed out with a floating radius.
const MIN_SCREEN_DIAMETER: f32 = 12.0;

/// Radial layout whose sectors follow the drawn size of each subtree
/// instead of its leaf count.
#[derive(Clone, Debug, Default)]
pub struct RadialWidthLayout {
    radius: RadiusScale,
}

impl RadialWidthLayout {
    fn effective_diameter(input: &LayoutInput, node: NodeId) -> f32 {
        let diameter = input.diameter(node);
        if input.fixed_radius {
            diameter
        } else {
            diameter.max(MIN_SCREEN_DIAMETER / input.zoom.max(MIN_ZOOM))
        }
    }
}

impl TreeLayout for RadialWidthLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::RadialWidth
    }

    fn compute(&self, tree: &VisualTree, input: &LayoutInput) -> LayoutResult {
        let Some(root) = tree.root() else {
            return LayoutResult::default();
        };

        let nodes = tree.subtree(root);
        let diameters = nodes
            .iter()
            .map(|node| (*node, Self::effective_diameter(input, *node)))
            .collect::<HashMap<_, _>>();
        let diameter = |node: &NodeId| diameters.get(node).copied().unwrap_or(0.0);

        let mut widths = HashMap::with_capacity(nodes.len());
        for node in nodes.iter().rev() {
            let children_width = tree
                .children(*node)
                .iter()
                .map(|child| widths.get(child).copied().unwrap_or(0.0))
                .sum::<f32>();
            widths.insert(*node, diameter(node).max(children_width));
        }

        // Widest neighbouring pair anywhere in the tree, parent/child
        // links included.
        let widest_pair = nodes
            .iter()
            .flat_map(|node| {
                let children = tree.children(*node);
                let own = diameter(node);
                children
                    .windows(2)
                    .map(|pair| diameter(&pair[0]) + diameter(&pair[1]))
                    .chain(children.iter().map(move |child| own + diameter(child)))
                    .collect::<Vec<_>>()
            })
            .fold(0.0_f32, f32::max);
        let min_increment = (widest_pair * 0.5 + NODE_GAP) * self.radius.get();

        let levels = levels(tree, root);
        let level_diameter = levels
            .iter()
            .map(|level| level.iter().map(diameter).fold(0.0_f32, f32::max))
            .collect::<Vec<_>>();
        let spacing = level_diameter
            .iter()
            .map(|widest| widest + NODE_GAP)
            .collect::<Vec<_>>();
        let increments = level_diameter
            .iter()
            .enumerate()
            .map(|(depth, widest)| {
                let previous = depth
                    .checked_sub(1)
                    .and_then(|parent| level_diameter.get(parent))
                    .copied()
                    .unwrap_or(0.0);
                min_increment.max((previous + widest) * 0.5 + NODE_GAP)
            })
            .collect::<Vec<_>>();

        place_on_rings(
            tree,
            root,
            &levels,
            &widths,
            &RingPlan {
                spacing,
                increments,
            },
        )
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
