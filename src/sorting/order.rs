use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::dataset::ScaffoldId;

use super::{SortDirection, SortValue};

/// Missing values sort after every present value in both directions and
/// never compare equal to one.
pub fn compare_with_nulls(
    a: Option<&SortValue>,
    b: Option<&SortValue>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Ascending => a.total_cmp(b),
            SortDirection::Descending => b.total_cmp(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sibling order installed on the tree after a sort job was applied.
#[derive(Clone, Debug)]
pub struct ChildOrder {
    values: Arc<HashMap<ScaffoldId, SortValue>>,
    direction: SortDirection,
}

impl ChildOrder {
    pub fn new(values: Arc<HashMap<ScaffoldId, SortValue>>, direction: SortDirection) -> Self {
        Self { values, direction }
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn value(&self, scaffold: ScaffoldId) -> Option<&SortValue> {
        self.values.get(&scaffold)
    }

    pub fn compare(&self, a: ScaffoldId, b: ScaffoldId) -> Ordering {
        compare_with_nulls(self.value(a), self.value(b), self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::DatasetBuilder;
    use crate::tree::{ExpandDepth, VisualTree};

    fn sorted(values: &[Option<f64>], direction: SortDirection) -> Vec<Option<f64>> {
        let mut values = values.to_vec();
        values.sort_by(|a, b| {
            compare_with_nulls(
                a.map(SortValue::Number).as_ref(),
                b.map(SortValue::Number).as_ref(),
                direction,
            )
        });
        values
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let values = [Some(3.0), None, Some(1.0)];
        assert_eq!(
            sorted(&values, SortDirection::Ascending),
            vec![Some(1.0), Some(3.0), None]
        );
        assert_eq!(
            sorted(&values, SortDirection::Descending),
            vec![Some(3.0), Some(1.0), None]
        );
    }

    #[test]
    fn null_never_equals_value() {
        let value = SortValue::Number(0.0);
        assert_ne!(
            compare_with_nulls(None, Some(&value), SortDirection::Ascending),
            Ordering::Equal
        );
        assert_eq!(
            compare_with_nulls(None, None, SortDirection::Descending),
            Ordering::Equal
        );
    }

    #[test]
    fn tree_children_follow_installed_order() {
        let dataset = DatasetBuilder::new()
            .scaffold(1, None)
            .scaffold(2, Some(1))
            .scaffold(3, Some(1))
            .scaffold(4, Some(1))
            .build();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");
        tree.expand(&dataset, root, ExpandDepth::Levels(1));

        let values = HashMap::from([
            (ScaffoldId(2), SortValue::Number(3.0)),
            (ScaffoldId(4), SortValue::Number(1.0)),
        ]);
        tree.set_child_order(ChildOrder::new(Arc::new(values), SortDirection::Ascending));

        let order = tree
            .children(root)
            .iter()
            .filter_map(|child| tree.scaffold_of(*child))
            .collect::<Vec<_>>();
        assert_eq!(order, vec![ScaffoldId(4), ScaffoldId(2), ScaffoldId(3)]);

        tree.clear_child_order(&dataset);
        let restored = tree
            .children(root)
            .iter()
            .filter_map(|child| tree.scaffold_of(*child))
            .collect::<Vec<_>>();
        assert_eq!(restored, vec![ScaffoldId(2), ScaffoldId(3), ScaffoldId(4)]);
    }
}
