use std::collections::HashMap;

use eframe::egui::vec2;

use crate::tree::VisualTree;

use super::{Band, LayoutInput, LayoutKind, LayoutResult, RadiusScale, TreeLayout, leaf_counts};

const LEVEL_DISTANCE: f32 = 220.0;
const ROW_GAP: f32 = 14.0;

/// Left-to-right layout. Each subtree gets a vertical band proportional to
/// its leaf count, children split their parent's band in order.
#[derive(Clone, Debug, Default)]
pub struct LinearLayout {
    radius: RadiusScale,
}

impl TreeLayout for LinearLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Linear
    }

    fn compute(&self, tree: &VisualTree, input: &LayoutInput) -> LayoutResult {
        let Some(root) = tree.root() else {
            return LayoutResult::default();
        };

        let nodes = tree.subtree(root);
        let leaves = leaf_counts(tree, root);
        let (widest, tallest) = nodes.iter().fold((0.0_f32, 0.0_f32), |(w, h), node| {
            let size = input.size(*node);
            (w.max(size.x), h.max(size.y))
        });
        let level_distance = (LEVEL_DISTANCE * self.radius.get()).max(widest + ROW_GAP);
        let row = tallest + ROW_GAP;

        let total = leaves.get(&root).copied().unwrap_or(1) as f32 * row;
        let mut bands = HashMap::with_capacity(nodes.len());
        bands.insert(
            root,
            Band {
                top: -total * 0.5,
                bottom: total * 0.5,
            },
        );

        let mut positions = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            let Some(band) = bands.get(node).copied() else {
                continue;
            };
            let depth = tree.depth(*node);
            positions.insert(
                *node,
                vec2((depth + 1) as f32 * level_distance, band.center()),
            );

            let children = tree.children(*node);
            let child_leaves = children
                .iter()
                .map(|child| leaves.get(child).copied().unwrap_or(1))
                .sum::<usize>()
                .max(1) as f32;
            let mut top = band.top;
            for (index, child) in children.iter().enumerate() {
                let bottom = if index + 1 == children.len() {
                    band.bottom
                } else {
                    let share = leaves.get(child).copied().unwrap_or(1) as f32 / child_leaves;
                    top + band.height() * share
                };
                bands.insert(*child, Band { top, bottom });
                top = bottom;
            }
        }

        LayoutResult {
            positions,
            bands,
            spacing: row,
            ..LayoutResult::default()
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ScaffoldId;
    use crate::layout::test_util::tree_from;
    use crate::sorting::MappingState;

    #[test]
    fn bands_split_by_leaf_count() {
        let (data, tree) = tree_from(1, &[(2, 1), (3, 1), (4, 2), (5, 2), (6, 3), (7, 3), (8, 3)]);
        let input = LayoutInput::from_tree(&tree, &data, &MappingState::default(), 1.0, true);
        let result = LinearLayout::default().compute(&tree, &input);
        let band = |id: u32| result.bands[&tree.node_for(ScaffoldId(id)).expect("node")];

        let (parent, first, second) = (band(1), band(2), band(3));
        assert!((first.height() * 3.0 - second.height() * 2.0).abs() < 1e-3);
        assert!((first.top - parent.top).abs() < 1e-3);
        assert!((first.bottom - second.top).abs() < 1e-3);
        assert!((second.bottom - parent.bottom).abs() < 1e-3);
        assert!((first.height() + second.height() - parent.height()).abs() < 1e-3);
    }

    #[test]
    fn columns_follow_depth() {
        let (data, tree) = tree_from(1, &[(2, 1), (3, 2)]);
        let input = LayoutInput::from_tree(&tree, &data, &MappingState::default(), 1.0, true);
        let result = LinearLayout::default().compute(&tree, &input);
        let at = |id: u32| result.positions[&tree.node_for(ScaffoldId(id)).expect("node")];

        assert_eq!(at(1).x, LEVEL_DISTANCE);
        assert_eq!(at(2).x, 2.0 * LEVEL_DISTANCE);
        assert_eq!(at(3).x, 3.0 * LEVEL_DISTANCE);
        assert_eq!(at(1).y, 0.0);
        assert_eq!(at(3).y, 0.0);
    }
}
