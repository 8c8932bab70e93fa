use tracing::debug;

use crate::dataset::{HierarchyProvider, ScaffoldId};

use super::{ExpandDepth, NodeId, TreeError, VisualTree};

impl VisualTree {
    /// Makes sure `scaffold` has a node, materializing the ancestor chain
    /// down from the closest materialized ancestor. With `expand_ancestors`
    /// every ancestor on the way gets all of its children.
    pub fn install_node(
        &mut self,
        hierarchy: &dyn HierarchyProvider,
        scaffold: ScaffoldId,
        expand_ancestors: bool,
    ) -> Result<NodeId, TreeError> {
        if !hierarchy.contains(scaffold) {
            return Err(TreeError::UnknownScaffold(scaffold));
        }
        if let Some(existing) = self.node_for(scaffold) {
            return Ok(existing);
        }

        if self.root.is_none() {
            let top = hierarchy
                .root()
                .ok_or(TreeError::UnknownScaffold(scaffold))?;
            self.create_root(hierarchy, top)?;
            if let Some(existing) = self.node_for(scaffold) {
                return Ok(existing);
            }
        }

        let (anchor, path) = loop {
            if let Some(found) = self.materialized_path(hierarchy, scaffold) {
                break found;
            }
            if !self.expand_root_upward(hierarchy) {
                return Err(TreeError::UnknownScaffold(scaffold));
            }
        };

        let mut parent = anchor;
        for step in path.into_iter().rev() {
            let node = if expand_ancestors {
                self.expand(hierarchy, parent, ExpandDepth::Levels(1));
                self.node_for(step)
            } else {
                Some(self.attach_child(hierarchy, parent, step))
            };
            parent = node.ok_or(TreeError::UnknownScaffold(step))?;
        }

        self.sort_subtree(anchor);
        self.layout_invalid = true;
        debug!(%scaffold, expand_ancestors, "installed scaffold");
        Ok(parent)
    }

    /// Walks up the real hierarchy from `scaffold` until a materialized
    /// ancestor is met. Returns that ancestor and the unmaterialized chain
    /// below it, closest-to-`scaffold` first.
    fn materialized_path(
        &self,
        hierarchy: &dyn HierarchyProvider,
        scaffold: ScaffoldId,
    ) -> Option<(NodeId, Vec<ScaffoldId>)> {
        let mut path = Vec::new();
        let mut cursor = scaffold;
        loop {
            if let Some(node) = self.node_for(cursor) {
                return Some((node, path));
            }
            path.push(cursor);
            cursor = hierarchy.parent(cursor)?;
        }
    }

    /// Replaces the visible root by its hierarchy parent. Returns `false`
    /// when the root already is the hierarchy root.
    pub fn expand_root_upward(&mut self, hierarchy: &dyn HierarchyProvider) -> bool {
        let Some(old_root) = self.root else {
            return false;
        };
        let Some(old_scaffold) = self.scaffold_of(old_root) else {
            return false;
        };
        let Some(parent_scaffold) = hierarchy.parent(old_scaffold) else {
            return false;
        };

        let origin = self.position(old_root).unwrap_or_default();
        let new_root = self.insert_node(hierarchy, parent_scaffold, origin);
        self.link(hierarchy, new_root, old_root);
        if let Some(visual) = self.nodes.get_mut(&new_root) {
            visual.children.push(old_root);
        }
        self.root = Some(new_root);
        self.layout_invalid = true;
        debug!(%parent_scaffold, "expanded root upward");
        true
    }
}
