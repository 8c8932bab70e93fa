use std::collections::BTreeSet;
use std::sync::mpsc::Receiver;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{HierarchyProvider, ScaffoldId};
use crate::tree::{TreeError, TreeEvent, VisualTree};

/// Remembers which scaffolds are materialized by listening to tree events.
#[derive(Debug)]
pub struct ViewStateTracker {
    events: Receiver<TreeEvent>,
    materialized: BTreeSet<ScaffoldId>,
    root: Option<ScaffoldId>,
}

/// Serializable copy of the expansion state of one tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub root: Option<ScaffoldId>,
    pub scaffolds: Vec<ScaffoldId>,
}

impl ViewStateTracker {
    pub fn attach(tree: &mut VisualTree) -> Self {
        let materialized = tree
            .preorder()
            .into_iter()
            .filter_map(|node| tree.scaffold_of(node))
            .collect();
        let root = tree.root().and_then(|node| tree.scaffold_of(node));
        Self {
            events: tree.subscribe(),
            materialized,
            root,
        }
    }

    /// Drains pending events. Returns how many were consumed.
    pub fn sync(&mut self, tree: &VisualTree) -> usize {
        let mut consumed = 0;
        for event in self.events.try_iter() {
            match event {
                TreeEvent::NodeAdded { scaffold, .. } => {
                    self.materialized.insert(scaffold);
                }
                TreeEvent::NodeRemoved { scaffold, .. } => {
                    self.materialized.remove(&scaffold);
                }
            }
            consumed += 1;
        }
        if consumed > 0 {
            self.root = tree.root().and_then(|node| tree.scaffold_of(node));
        }
        consumed
    }

    pub fn len(&self) -> usize {
        self.materialized.len()
    }

    pub fn contains(&self, scaffold: ScaffoldId) -> bool {
        self.materialized.contains(&scaffold)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            root: self.root,
            scaffolds: self.materialized.iter().copied().collect(),
        }
    }
}

impl ViewSnapshot {
    /// Reinstalls every remembered scaffold that still exists in
    /// `hierarchy`. Ancestors go first so each install only adds one node.
    pub fn restore(
        &self,
        tree: &mut VisualTree,
        hierarchy: &dyn HierarchyProvider,
    ) -> Result<usize, TreeError> {
        if tree.is_empty() {
            let root = self
                .root
                .filter(|root| hierarchy.contains(*root))
                .or_else(|| hierarchy.root());
            if let Some(root) = root {
                tree.create_root(hierarchy, root)?;
            }
        }

        let mut pending = self
            .scaffolds
            .iter()
            .copied()
            .filter(|scaffold| hierarchy.contains(*scaffold))
            .map(|scaffold| (hierarchy_depth(hierarchy, scaffold), scaffold))
            .collect::<Vec<_>>();
        pending.sort_unstable();
        let skipped = self.scaffolds.len() - pending.len();
        if skipped > 0 {
            debug!(skipped, "scaffolds missing from the new hierarchy");
        }

        let mut restored = 0;
        for (_, scaffold) in pending {
            if tree.node_for(scaffold).is_some() {
                continue;
            }
            tree.install_node(hierarchy, scaffold, false)?;
            restored += 1;
        }

        info!(restored, nodes = tree.node_count(), "view state restored");
        Ok(restored)
    }
}

fn hierarchy_depth(hierarchy: &dyn HierarchyProvider, scaffold: ScaffoldId) -> usize {
    let mut depth = 0;
    let mut cursor = scaffold;
    while let Some(parent) = hierarchy.parent(cursor) {
        depth += 1;
        cursor = parent;
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::sample_dataset;
    use crate::tree::ExpandDepth;

    fn scaffolds(tree: &VisualTree) -> BTreeSet<ScaffoldId> {
        tree.preorder()
            .into_iter()
            .filter_map(|node| tree.scaffold_of(node))
            .collect()
    }

    #[test]
    fn tracker_follows_expand_and_reduce() {
        let data = sample_dataset();
        let mut tree = VisualTree::new();
        let mut tracker = ViewStateTracker::attach(&mut tree);
        let root = tree.create_root(&data, ScaffoldId(1)).expect("root");
        tree.expand(&data, root, ExpandDepth::All);
        tracker.sync(&tree);
        assert_eq!(tracker.len(), 7);

        let node = tree.node_for(ScaffoldId(2)).expect("2");
        tree.reduce(node);
        tracker.sync(&tree);
        assert_eq!(tracker.len(), 4);
        assert!(!tracker.contains(ScaffoldId(5)));
    }

    #[test]
    fn snapshot_restores_the_same_scaffolds() {
        let data = sample_dataset();
        let mut tree = VisualTree::new();
        let mut tracker = ViewStateTracker::attach(&mut tree);
        let root = tree.create_root(&data, ScaffoldId(1)).expect("root");
        tree.expand(&data, root, ExpandDepth::Levels(1));
        tree.install_node(&data, ScaffoldId(5), false).expect("install");
        tracker.sync(&tree);
        let before = scaffolds(&tree);

        let snapshot = tracker.snapshot();
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let snapshot: ViewSnapshot = serde_json::from_str(&json).expect("deserialize");

        let mut rebuilt = VisualTree::new();
        snapshot.restore(&mut rebuilt, &data).expect("restore");
        assert_eq!(scaffolds(&rebuilt), before);
        assert_eq!(rebuilt.edge_count(), rebuilt.node_count() - 1);
    }

    #[test]
    fn restore_skips_vanished_scaffolds() {
        let data = sample_dataset();
        let snapshot = ViewSnapshot {
            root: Some(ScaffoldId(1)),
            scaffolds: vec![ScaffoldId(1), ScaffoldId(3), ScaffoldId(99)],
        };
        let mut tree = VisualTree::new();
        let restored = snapshot.restore(&mut tree, &data).expect("restore");
        assert_eq!(restored, 1);
        assert_eq!(tree.node_count(), 2);
    }
}
