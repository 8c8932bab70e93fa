use std::ops::Range;

use eframe::egui::Color32;

use crate::tree::{NodeId, VisualTree};

use super::{ChildOrder, SortValue};

const SEGMENT_PALETTE: [Color32; 2] = [
    Color32::from_rgba_premultiplied(46, 62, 84, 90),
    Color32::from_rgba_premultiplied(70, 58, 40, 90),
];

/// Contiguous run of the root's children that share one sort value.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorSegment {
    pub nodes: Vec<NodeId>,
    pub value: Option<SortValue>,
    pub color: Color32,
    pub caption: Option<String>,
}

impl ColorSegment {
    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

/// Splits an ordered value list wherever the value changes. Missing values
/// form runs of their own.
pub fn partition_runs(values: &[Option<&SortValue>]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for index in 1..=values.len() {
        let boundary = index == values.len()
            || match (values[index - 1], values[index]) {
                (Some(previous), Some(current)) => !previous.approx_eq(current),
                (None, None) => false,
                _ => true,
            };
        if boundary {
            runs.push(start..index);
            start = index;
        }
    }
    runs
}

pub fn build_segments(tree: &VisualTree, order: &ChildOrder, captions: bool) -> Vec<ColorSegment> {
    let Some(root) = tree.root() else {
        return Vec::new();
    };
    let children = tree.children(root);
    let values = children
        .iter()
        .map(|child| {
            tree.scaffold_of(*child)
                .and_then(|scaffold| order.value(scaffold))
        })
        .collect::<Vec<_>>();

    partition_runs(&values)
        .into_iter()
        .enumerate()
        .map(|(index, run)| {
            let value = values[run.start].cloned();
            let caption = captions.then(|| match &value {
                Some(value) => value.to_string(),
                None => "n/a".to_owned(),
            });
            ColorSegment {
                nodes: children[run].to_vec(),
                value,
                color: SEGMENT_PALETTE[index % SEGMENT_PALETTE.len()],
                caption,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::dataset::ScaffoldId;
    use crate::dataset::test_support::DatasetBuilder;
    use crate::sorting::SortDirection;
    use crate::tree::ExpandDepth;

    #[test]
    fn equal_neighbours_share_a_segment() {
        let one = SortValue::Number(1.0);
        let two = SortValue::Number(2.0);
        let values = [Some(&one), Some(&one), Some(&two), Some(&two), Some(&two)];
        assert_eq!(partition_runs(&values), vec![0..2, 2..5]);
    }

    #[test]
    fn missing_values_get_their_own_run() {
        let one = SortValue::Number(1.0);
        let values = [Some(&one), None, None];
        assert_eq!(partition_runs(&values), vec![0..1, 1..3]);
        assert!(partition_runs(&[]).is_empty());
    }

    #[test]
    fn segments_start_at_value_changes() {
        let data = DatasetBuilder::new()
            .scaffold(1, None)
            .scaffold(10, Some(1))
            .scaffold(11, Some(1))
            .scaffold(12, Some(1))
            .scaffold(13, Some(1))
            .scaffold(14, Some(1))
            .build();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&data, ScaffoldId(1)).expect("root");
        tree.expand(&data, root, ExpandDepth::Levels(1));

        let values = [(10, 1.0), (11, 1.0), (12, 2.0), (13, 2.0), (14, 2.0)]
            .into_iter()
            .map(|(id, value)| (ScaffoldId(id), SortValue::Number(value)))
            .collect::<HashMap<_, _>>();
        let order = ChildOrder::new(Arc::new(values), SortDirection::Ascending);
        tree.set_child_order(order.clone());

        let segments = build_segments(&tree, &order, true);
        assert_eq!(segments.len(), 2);
        assert_eq!(
            segments[0].first().and_then(|node| tree.scaffold_of(node)),
            Some(ScaffoldId(10))
        );
        assert_eq!(
            segments[1].first().and_then(|node| tree.scaffold_of(node)),
            Some(ScaffoldId(12))
        );
        assert_eq!(segments[1].nodes.len(), 3);
        assert_eq!(segments[0].caption.as_deref(), Some("1"));
        assert_ne!(segments[0].color, segments[1].color);
    }
}
