use std::collections::HashMap;
use std::f32::consts::{PI, TAU};

use eframe::egui::Vec2;

use crate::tree::{NodeId, VisualTree};

use super::radial::polar;
use super::{LayoutInput, LayoutKind, LayoutResult, RadiusScale, TreeLayout};

const MIN_RING: f32 = 120.0;
const NODE_GAP: f32 = 12.0;
/// Compensates for placing children on the chord instead of the arc.
const CIRCUMFERENCE_CORRECTION: f32 = 1.25;
/// Opening kept free towards the parent when fanning out many children.
const BACK_GAP: f32 = PI / 3.0;
const PAIR_OFFSET: f32 = PI / 6.0;
const TRIPLE_OFFSET: f32 = PI / 3.0;
const MIN_HALF_ANGLE: f32 = 1e-4;

/// Every subtree sits inside its own circle; children are arranged on a
/// ring around their parent.
#[derive(Clone, Debug, Default)]
pub struct BalloonLayout {
    radius: RadiusScale,
}

/// Ring radius and child direction offsets of one node, relative to the
/// direction the node itself was placed in.
struct Fan {
    ring: f32,
    offsets: Vec<f32>,
}

impl BalloonLayout {
    fn fan(&self, own_radius: f32, extents: &[f32], is_root: bool) -> Fan {
        let offsets = child_offsets(extents, is_root);

        let total = extents.iter().sum::<f32>();
        let widest = extents.iter().copied().fold(0.0_f32, f32::max);
        let mut ring = (MIN_RING * self.radius.get())
            .max(CIRCUMFERENCE_CORRECTION * total / PI * self.radius.get())
            .max(own_radius + widest + NODE_GAP);

        for (i, (a, offset_a)) in extents.iter().zip(&offsets).enumerate() {
            for (b, offset_b) in extents.iter().zip(&offsets).skip(i + 1) {
                let separation = (offset_a - offset_b).abs().rem_euclid(TAU);
                let separation = separation.min(TAU - separation);
                let half = (separation * 0.5).max(MIN_HALF_ANGLE);
                ring = ring.max((a + b + NODE_GAP) / (2.0 * half.sin()));
            }
        }
        Fan { ring, offsets }
    }
}

/// Fixed fans for up to three children, extent weighted beyond that.
fn child_offsets(extents: &[f32], is_root: bool) -> Vec<f32> {
    match extents.len() {
        0 => Vec::new(),
        1 => vec![0.0],
        2 => vec![-PAIR_OFFSET, PAIR_OFFSET],
        3 => vec![-TRIPLE_OFFSET, 0.0, TRIPLE_OFFSET],
        _ => {
            let available = if is_root { TAU } else { TAU - BACK_GAP };
            let total = extents.iter().sum::<f32>().max(f32::EPSILON);
            let mut cursor = -available * 0.5;
            extents
                .iter()
                .map(|extent| {
                    let share = available * extent / total;
                    let offset = cursor + share * 0.5;
                    cursor += share;
                    offset
                })
                .collect()
        }
    }
}

impl TreeLayout for BalloonLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Balloon
    }

    fn compute(&self, tree: &VisualTree, input: &LayoutInput) -> LayoutResult {
        let Some(root) = tree.root() else {
            return LayoutResult::default();
        };

        let nodes = tree.subtree(root);
        let mut extents: HashMap<NodeId, f32> = HashMap::with_capacity(nodes.len());
        let mut fans: HashMap<NodeId, Fan> = HashMap::with_capacity(nodes.len());
        for node in nodes.iter().rev() {
            let own_radius = input.diameter(*node) * 0.5;
            let children = tree.children(*node);
            if children.is_empty() {
                extents.insert(*node, own_radius);
                continue;
            }
            let child_extents = children
                .iter()
                .map(|child| extents.get(child).copied().unwrap_or(own_radius))
                .collect::<Vec<_>>();
            let fan = self.fan(own_radius, &child_extents, *node == root);
            let widest = child_extents.iter().copied().fold(0.0_f32, f32::max);
            extents.insert(*node, (fan.ring + widest).max(own_radius));
            fans.insert(*node, fan);
        }

        let mut positions = HashMap::with_capacity(nodes.len());
        let mut directions = HashMap::with_capacity(nodes.len());
        positions.insert(root, Vec2::ZERO);
        directions.insert(root, 0.0_f32);
        for node in &nodes {
            let (Some(origin), Some(direction), Some(fan)) = (
                positions.get(node).copied(),
                directions.get(node).copied(),
                fans.get(node),
            ) else {
                continue;
            };
            for (child, offset) in tree.children(*node).iter().zip(&fan.offsets) {
                let angle = direction + offset;
                positions.insert(*child, origin + polar(fan.ring, angle));
                directions.insert(*child, angle);
            }
        }

        LayoutResult {
            positions,
            spacing: NODE_GAP,
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
    use crate::layout::test_util::{mixed_tree, tree_from};
    use crate::sorting::MappingState;

    fn angle_between(from: Vec2, to: Vec2) -> f32 {
        (to - from).angle()
    }

    #[test]
    fn two_children_sit_thirty_degrees_off_the_parent_ray() {
        let (data, tree) = tree_from(1, &[(2, 1), (3, 1), (4, 3), (5, 3)]);
        let input = LayoutInput::from_tree(&tree, &data, &MappingState::default(), 1.0, true);
        let result = BalloonLayout::default().compute(&tree, &input);
        let at = |id: u32| result.positions[&tree.node_for(ScaffoldId(id)).expect("node")];

        let root_to_3 = angle_between(at(1), at(3));
        assert!((root_to_3 - PAIR_OFFSET).abs() < 1e-4);
        assert!((angle_between(at(1), at(2)) + PAIR_OFFSET).abs() < 1e-4);

        let first = angle_between(at(3), at(4));
        let second = angle_between(at(3), at(5));
        assert!((first - (root_to_3 - PAIR_OFFSET)).abs() < 1e-4);
        assert!((second - (root_to_3 + PAIR_OFFSET)).abs() < 1e-4);
        let ring_a = (at(4) - at(3)).length();
        let ring_b = (at(5) - at(3)).length();
        assert!((ring_a - ring_b).abs() < 1e-3);
    }

    #[test]
    fn single_and_triple_fans_follow_fixed_angles() {
        assert_eq!(child_offsets(&[10.0], false), vec![0.0]);
        assert_eq!(
            child_offsets(&[1.0, 2.0, 3.0], false),
            vec![-TRIPLE_OFFSET, 0.0, TRIPLE_OFFSET]
        );

        let spread = child_offsets(&[1.0, 1.0, 1.0, 1.0], false);
        assert_eq!(spread.len(), 4);
        assert!(spread.windows(2).all(|pair| pair[1] > pair[0]));
        assert!(spread[0] > -PI && spread[3] < PI);
    }

    #[test]
    fn sibling_subtrees_do_not_overlap() {
        let (data, tree) = mixed_tree();
        let input = LayoutInput::from_tree(&tree, &data, &MappingState::default(), 1.0, true);
        let result = BalloonLayout::default().compute(&tree, &input);

        for node in tree.preorder() {
            let children = tree.children(node);
            for (index, a) in children.iter().enumerate() {
                for b in &children[index + 1..] {
                    let distance = (result.positions[a] - result.positions[b]).length();
                    let needed = (input.diameter(*a) + input.diameter(*b)) * 0.5;
                    assert!(distance >= needed, "{a:?} and {b:?} are {distance} apart");
                }
            }
        }
    }
}
