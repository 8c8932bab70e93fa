use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Receiver;

use eframe::egui::Vec2;
use thiserror::Error;
use tracing::debug;

use crate::dataset::{HierarchyProvider, MoleculeId, ScaffoldId};
use crate::selection::{SelectionSet, SelectionState};
use crate::sorting::ChildOrder;

mod events;
mod install;
mod node;

use events::EventBus;
pub use events::TreeEvent;
pub use node::{EdgeId, NodeId, VisualEdge, VisualNode};

const MIN_NODE_SCALE: f32 = 0.25;
const MAX_NODE_SCALE: f32 = 4.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("the tree already has a root")]
    RootAlreadyExists,
    #[error("node {0:?} is not part of the tree")]
    UnknownNode(NodeId),
    #[error("scaffold {0} is not part of the hierarchy")]
    UnknownScaffold(ScaffoldId),
    #[error("node {0:?} has nothing left to expand")]
    NotExpandable(NodeId),
    #[error("node {0:?} has no children to reduce")]
    NotReducible(NodeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpandDepth {
    Levels(usize),
    All,
}

impl ExpandDepth {
    fn remaining(self) -> Option<usize> {
        match self {
            Self::Levels(levels) => Some(levels),
            Self::All => None,
        }
    }
}

/// Partially materialized mirror of the scaffold hierarchy.
#[derive(Debug, Default)]
pub struct VisualTree {
    root: Option<NodeId>,
    nodes: HashMap<NodeId, VisualNode>,
    edges: HashMap<EdgeId, VisualEdge>,
    index: HashMap<ScaffoldId, NodeId>,
    next_node: u64,
    next_edge: u64,
    layout_invalid: bool,
    child_order: Option<ChildOrder>,
    /// Selection seen by the last refresh, applied to nodes created later.
    selected: HashSet<MoleculeId>,
    events: EventBus,
}

impl VisualTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<TreeEvent> {
        self.events.subscribe()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn node(&self, node: NodeId) -> Option<&VisualNode> {
        self.nodes.get(&node)
    }

    pub fn node_for(&self, scaffold: ScaffoldId) -> Option<NodeId> {
        self.index.get(&scaffold).copied()
    }

    pub fn scaffold_of(&self, node: NodeId) -> Option<ScaffoldId> {
        self.nodes.get(&node).map(|node| node.scaffold)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|node| node.parent)
    }

    pub fn position(&self, node: NodeId) -> Option<Vec2> {
        self.nodes.get(&node).map(|node| node.position)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &VisualEdge> + '_ {
        self.edges.values()
    }

    pub fn child_order(&self) -> Option<&ChildOrder> {
        self.child_order.as_ref()
    }

    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = node;
        while let Some(parent) = self.parent(cursor) {
            depth += 1;
            cursor = parent;
        }
        depth
    }

    /// Pre-order walk from the root honoring the current sibling order.
    pub fn preorder(&self) -> Vec<NodeId> {
        match self.root {
            Some(root) => self.subtree(root),
            None => Vec::new(),
        }
    }

    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(&node) {
            return out;
        }
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn is_expandable(&self, hierarchy: &dyn HierarchyProvider, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|visual| {
            hierarchy
                .children(visual.scaffold)
                .iter()
                .any(|child| !self.index.contains_key(child))
        })
    }

    pub fn is_reducible(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|visual| !visual.children.is_empty())
    }

    pub fn layout_invalid(&self) -> bool {
        self.layout_invalid
    }

    pub fn invalidate_layout(&mut self) {
        self.layout_invalid = true;
    }

    pub fn mark_layout_valid(&mut self) {
        self.layout_invalid = false;
    }

    pub(crate) fn set_position(&mut self, node: NodeId, position: Vec2) {
        if let Some(visual) = self.nodes.get_mut(&node) {
            visual.position = position;
        }
    }

    pub fn set_scale(&mut self, node: NodeId, scale: f32) {
        if let Some(visual) = self.nodes.get_mut(&node) {
            let scale = scale.clamp(MIN_NODE_SCALE, MAX_NODE_SCALE);
            if (visual.scale - scale).abs() > f32::EPSILON {
                visual.scale = scale;
                self.layout_invalid = true;
            }
        }
    }

    pub fn create_root(
        &mut self,
        hierarchy: &dyn HierarchyProvider,
        scaffold: ScaffoldId,
    ) -> Result<NodeId, TreeError> {
        if self.root.is_some() {
            return Err(TreeError::RootAlreadyExists);
        }
        if !hierarchy.contains(scaffold) {
            return Err(TreeError::UnknownScaffold(scaffold));
        }

        let id = self.insert_node(hierarchy, scaffold, Vec2::ZERO);
        self.root = Some(id);
        self.layout_invalid = true;
        debug!(%scaffold, "created tree root");
        Ok(id)
    }

    /// Materializes children of `node`. Returns `false` when nothing was added.
    pub fn expand(
        &mut self,
        hierarchy: &dyn HierarchyProvider,
        node: NodeId,
        depth: ExpandDepth,
    ) -> bool {
        let added = self.expand_levels(hierarchy, node, depth.remaining());
        if added {
            self.sort_subtree(node);
            self.layout_invalid = true;
            debug!(?node, ?depth, nodes = self.nodes.len(), "expanded node");
        }
        added
    }

    fn expand_levels(
        &mut self,
        hierarchy: &dyn HierarchyProvider,
        node: NodeId,
        remaining: Option<usize>,
    ) -> bool {
        if remaining == Some(0) {
            return false;
        }
        let Some(scaffold) = self.scaffold_of(node) else {
            return false;
        };

        let mut added = false;
        for &child in hierarchy.children(scaffold) {
            if !self.index.contains_key(&child) {
                self.attach_child(hierarchy, node, child);
                added = true;
            }
        }

        if remaining != Some(1) {
            let next = remaining.map(|levels| levels - 1);
            let children = self.children(node).to_vec();
            for child in children {
                added |= self.expand_levels(hierarchy, child, next);
            }
        }
        added
    }

    /// Checked variant of [`Self::expand`] for interactive commands.
    pub fn try_expand(
        &mut self,
        hierarchy: &dyn HierarchyProvider,
        node: NodeId,
        depth: ExpandDepth,
    ) -> Result<(), TreeError> {
        if !self.nodes.contains_key(&node) {
            return Err(TreeError::UnknownNode(node));
        }
        if !self.expand(hierarchy, node, depth) {
            return Err(TreeError::NotExpandable(node));
        }
        Ok(())
    }

    pub fn try_reduce(&mut self, node: NodeId) -> Result<(), TreeError> {
        if !self.nodes.contains_key(&node) {
            return Err(TreeError::UnknownNode(node));
        }
        if !self.reduce(node) {
            return Err(TreeError::NotReducible(node));
        }
        Ok(())
    }

    /// Removes every descendant of `node`. Returns `false` when `node` has
    /// no materialized children.
    pub fn reduce(&mut self, node: NodeId) -> bool {
        if !self.is_reducible(node) {
            return false;
        }

        let children = self.children(node).to_vec();
        for child in children {
            self.destroy_subtree(child);
        }
        self.layout_invalid = true;
        debug!(?node, nodes = self.nodes.len(), "reduced node");
        true
    }

    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            self.destroy_subtree(root);
        }
        self.layout_invalid = true;
        debug!("cleared tree");
    }

    pub fn set_child_order(&mut self, order: ChildOrder) {
        self.child_order = Some(order);
        if let Some(root) = self.root {
            self.sort_subtree(root);
        }
        self.layout_invalid = true;
    }

    /// Drops the active sort and restores hierarchy order everywhere.
    pub fn clear_child_order(&mut self, hierarchy: &dyn HierarchyProvider) {
        self.child_order = None;
        for node in self.preorder() {
            let Some(scaffold) = self.scaffold_of(node) else {
                continue;
            };
            let rank = hierarchy
                .children(scaffold)
                .iter()
                .enumerate()
                .map(|(rank, child)| (*child, rank))
                .collect::<HashMap<_, _>>();
            let mut children = self.take_children(node);
            children.sort_by_key(|child| {
                self.scaffold_of(*child)
                    .and_then(|scaffold| rank.get(&scaffold).copied())
                    .unwrap_or(usize::MAX)
            });
            self.put_children(node, children);
        }
        self.layout_invalid = true;
    }

    /// Re-sorts siblings under `node` with the last applied order. No-op
    /// when no sort has run yet.
    pub fn sort_subtree(&mut self, node: NodeId) {
        let Some(order) = self.child_order.clone() else {
            return;
        };
        for current in self.subtree(node) {
            let mut children = self.take_children(current);
            if children.len() > 1 {
                children.sort_by(|a, b| match (self.scaffold_of(*a), self.scaffold_of(*b)) {
                    (Some(a), Some(b)) => order.compare(a, b),
                    _ => std::cmp::Ordering::Equal,
                });
                self.layout_invalid = true;
            }
            self.put_children(current, children);
        }
    }

    pub fn refresh_selection(
        &mut self,
        hierarchy: &dyn HierarchyProvider,
        selection: &SelectionSet,
    ) {
        self.selected = selection.snapshot();
        for visual in self.nodes.values_mut() {
            visual.selection =
                SelectionState::of(&self.selected, hierarchy.molecules(visual.scaffold));
        }
    }

    pub fn selection_state(&self, node: NodeId) -> SelectionState {
        self.nodes
            .get(&node)
            .map(|visual| visual.selection)
            .unwrap_or(SelectionState::Unselected)
    }

    fn take_children(&mut self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get_mut(&node)
            .map(|visual| std::mem::take(&mut visual.children))
            .unwrap_or_default()
    }

    fn put_children(&mut self, node: NodeId, children: Vec<NodeId>) {
        if let Some(visual) = self.nodes.get_mut(&node) {
            visual.children = children;
        }
    }

    fn insert_node(
        &mut self,
        hierarchy: &dyn HierarchyProvider,
        scaffold: ScaffoldId,
        position: Vec2,
    ) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        let mut visual = VisualNode::new(id, scaffold, position);
        visual.selection = SelectionState::of(&self.selected, hierarchy.molecules(scaffold));
        self.nodes.insert(id, visual);
        self.index.insert(scaffold, id);
        self.events.emit(TreeEvent::NodeAdded { node: id, scaffold });
        id
    }

    fn link(&mut self, hierarchy: &dyn HierarchyProvider, parent: NodeId, child: NodeId) {
        let visible = self
            .scaffold_of(parent)
            .is_some_and(|scaffold| !hierarchy.is_synthetic_root(scaffold));
        let edge = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            edge,
            VisualEdge {
                id: edge,
                parent,
                child,
                visible,
            },
        );
        if let Some(visual) = self.nodes.get_mut(&parent) {
            visual.child_edges.push(edge);
        }
        if let Some(visual) = self.nodes.get_mut(&child) {
            visual.parent = Some(parent);
            visual.parent_edge = Some(edge);
        }
    }

    /// New child starts at its parent's position so the first animated
    /// layout grows it outwards.
    fn attach_child(
        &mut self,
        hierarchy: &dyn HierarchyProvider,
        parent: NodeId,
        scaffold: ScaffoldId,
    ) -> NodeId {
        let Some(parent_visual) = self.nodes.get(&parent) else {
            return self.insert_node(hierarchy, scaffold, Vec2::ZERO);
        };
        let origin = parent_visual.position;
        let parent_scaffold = parent_visual.scaffold;

        let id = self.insert_node(hierarchy, scaffold, origin);
        self.link(hierarchy, parent, id);

        let rank = |candidate: ScaffoldId| {
            hierarchy
                .children(parent_scaffold)
                .iter()
                .position(|child| *child == candidate)
                .unwrap_or(usize::MAX)
        };
        let own_rank = rank(scaffold);
        let mut children = self.take_children(parent);
        let insert_at = children
            .iter()
            .position(|sibling| {
                self.scaffold_of(*sibling)
                    .is_some_and(|sibling| rank(sibling) > own_rank)
            })
            .unwrap_or(children.len());
        children.insert(insert_at, id);
        self.put_children(parent, children);
        id
    }

    /// Tears `node` and all of its descendants down bottom-up, detaching
    /// every adjacent edge from both endpoints before the node leaves the
    /// index.
    fn destroy_subtree(&mut self, node: NodeId) {
        let doomed = self.subtree(node);
        for current in doomed.into_iter().rev() {
            let Some(visual) = self.nodes.get(&current) else {
                continue;
            };
            let parent = visual.parent;
            let parent_edge = visual.parent_edge;
            let child_edges = visual.child_edges.clone();
            let scaffold = visual.scaffold;

            for edge in child_edges {
                if let Some(removed) = self.edges.remove(&edge)
                    && let Some(child) = self.nodes.get_mut(&removed.child)
                {
                    child.parent_edge = None;
                    child.parent = None;
                }
            }

            if let Some(edge) = parent_edge {
                self.edges.remove(&edge);
            }
            if let Some(parent) = parent
                && let Some(parent_visual) = self.nodes.get_mut(&parent)
            {
                parent_visual.children.retain(|child| *child != current);
                if let Some(edge) = parent_edge {
                    parent_visual.child_edges.retain(|candidate| *candidate != edge);
                }
            }

            if self.index.get(&scaffold) == Some(&current) {
                self.index.remove(&scaffold);
            }
            self.nodes.remove(&current);
            if self.root == Some(current) {
                self.root = None;
            }
            self.events.emit(TreeEvent::NodeRemoved {
                node: current,
                scaffold,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::dataset::test_support::{DatasetBuilder, sample_dataset};

    fn child_scaffolds(tree: &VisualTree, node: NodeId) -> Vec<ScaffoldId> {
        tree.children(node)
            .iter()
            .filter_map(|child| tree.scaffold_of(*child))
            .collect()
    }

    #[test]
    fn create_root_rejects_second_root() {
        let dataset = sample_dataset();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");
        assert_eq!(tree.position(root), Some(Vec2::ZERO));
        assert_eq!(
            tree.create_root(&dataset, ScaffoldId(2)),
            Err(TreeError::RootAlreadyExists)
        );
    }

    #[test]
    fn expand_then_reduce_leaves_only_root() {
        let dataset = DatasetBuilder::new()
            .scaffold(1, None)
            .scaffold(2, Some(1))
            .scaffold(3, Some(1))
            .build();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");

        assert!(tree.expand(&dataset, root, ExpandDepth::Levels(1)));
        assert_eq!(child_scaffolds(&tree, root), vec![ScaffoldId(2), ScaffoldId(3)]);
        assert_eq!(tree.edge_count(), 2);

        assert!(tree.reduce(root));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.edge_count(), 0);
        assert_eq!(tree.node_for(ScaffoldId(2)), None);
        assert_eq!(tree.node_for(ScaffoldId(3)), None);
        assert!(tree.node(root).is_some_and(|node| node.child_edges.is_empty()));
    }

    #[test]
    fn expand_is_noop_without_new_children() {
        let dataset = sample_dataset();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");
        assert!(tree.expand(&dataset, root, ExpandDepth::Levels(1)));
        assert!(!tree.expand(&dataset, root, ExpandDepth::Levels(1)));

        let leaf = tree.node_for(ScaffoldId(3)).expect("3");
        let leaf_child = {
            tree.expand(&dataset, leaf, ExpandDepth::Levels(1));
            tree.node_for(ScaffoldId(7)).expect("7")
        };
        assert!(!tree.expand(&dataset, leaf_child, ExpandDepth::All));
        assert!(!tree.reduce(leaf_child));
    }

    #[test]
    fn expand_levels_and_all() {
        let dataset = sample_dataset();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");

        assert!(tree.expand(&dataset, root, ExpandDepth::Levels(2)));
        assert_eq!(tree.node_count(), 7);

        tree.reduce(root);
        assert!(tree.expand(&dataset, root, ExpandDepth::All));
        assert_eq!(tree.node_count(), 7);
        assert_eq!(tree.edge_count(), 6);
    }

    #[test]
    fn reduce_then_expand_restores_children_without_leaking_edges() {
        let dataset = sample_dataset();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");
        tree.expand(&dataset, root, ExpandDepth::All);

        let node = tree.node_for(ScaffoldId(2)).expect("2");
        let before = child_scaffolds(&tree, node)
            .into_iter()
            .collect::<BTreeSet<_>>();
        let edges_before = tree.edge_count();

        assert!(tree.reduce(node));
        assert!(tree.expand(&dataset, node, ExpandDepth::Levels(1)));
        let after = child_scaffolds(&tree, node)
            .into_iter()
            .collect::<BTreeSet<_>>();

        assert_eq!(before, after);
        assert_eq!(tree.edge_count(), edges_before);
    }

    #[test]
    fn events_report_additions_and_removals() {
        let dataset = sample_dataset();
        let mut tree = VisualTree::new();
        let events = tree.subscribe();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");
        tree.expand(&dataset, root, ExpandDepth::Levels(1));
        tree.clear();

        let collected = events.try_iter().collect::<Vec<_>>();
        let added = collected
            .iter()
            .filter(|event| matches!(event, TreeEvent::NodeAdded { .. }))
            .count();
        let removed = collected
            .iter()
            .filter(|event| matches!(event, TreeEvent::NodeRemoved { .. }))
            .count();
        assert_eq!(added, 3);
        assert_eq!(removed, 3);
        assert!(tree.is_empty());
        assert_eq!(tree.edge_count(), 0);
    }

    #[test]
    fn clear_allows_new_root() {
        let dataset = sample_dataset();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");
        tree.expand(&dataset, root, ExpandDepth::All);
        tree.clear();
        assert_eq!(tree.node_count(), 0);
        assert!(tree.create_root(&dataset, ScaffoldId(2)).is_ok());
    }

    #[test]
    fn synthetic_root_edges_are_hidden() {
        let dataset = DatasetBuilder::new()
            .scaffold(0, None)
            .synthetic(0)
            .scaffold(1, Some(0))
            .scaffold(2, Some(1))
            .build();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(0)).expect("root");
        tree.expand(&dataset, root, ExpandDepth::All);

        let hidden = tree.edges().filter(|edge| !edge.visible).count();
        let shown = tree.edges().filter(|edge| edge.visible).count();
        assert_eq!((hidden, shown), (1, 1));
    }

    #[test]
    fn layout_flag_tracks_structure() {
        let dataset = sample_dataset();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");
        assert!(tree.layout_invalid());
        tree.mark_layout_valid();

        assert!(!tree.reduce(root));
        assert!(!tree.layout_invalid());

        tree.expand(&dataset, root, ExpandDepth::Levels(1));
        assert!(tree.layout_invalid());
    }

    #[test]
    fn new_children_start_at_parent_position() {
        let dataset = sample_dataset();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");
        tree.expand(&dataset, root, ExpandDepth::Levels(1));
        let child = tree.node_for(ScaffoldId(2)).expect("2");
        tree.set_position(child, Vec2::new(50.0, -20.0));
        tree.expand(&dataset, child, ExpandDepth::Levels(1));
        let grandchild = tree.node_for(ScaffoldId(4)).expect("4");
        assert_eq!(tree.position(grandchild), Some(Vec2::new(50.0, -20.0)));
    }

    #[test]
    fn checked_commands_report_misuse() {
        let dataset = sample_dataset();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");

        assert_eq!(tree.try_reduce(root), Err(TreeError::NotReducible(root)));
        assert_eq!(tree.try_expand(&dataset, root, ExpandDepth::Levels(1)), Ok(()));
        assert_eq!(
            tree.try_expand(&dataset, root, ExpandDepth::Levels(1)),
            Err(TreeError::NotExpandable(root))
        );
        assert_eq!(tree.try_reduce(root), Ok(()));
    }

    #[test]
    fn nodes_created_after_a_selection_change_start_selected() {
        let dataset = DatasetBuilder::new()
            .scaffold(1, None)
            .scaffold(2, Some(1))
            .scaffold(3, Some(1))
            .molecules(2, &[20, 21])
            .molecules(3, &[30])
            .build();
        let mut selection = SelectionSet::new();
        selection.add_all(&[MoleculeId(20), MoleculeId(30)]);

        let mut tree = VisualTree::new();
        let root = tree.create_root(&dataset, ScaffoldId(1)).expect("root");
        tree.refresh_selection(&dataset, &selection);
        tree.expand(&dataset, root, ExpandDepth::Levels(1));

        let two = tree.node_for(ScaffoldId(2)).expect("2");
        let three = tree.node_for(ScaffoldId(3)).expect("3");
        assert_eq!(tree.selection_state(two), SelectionState::HalfSelected);
        assert_eq!(tree.selection_state(three), SelectionState::Selected);
        assert_eq!(tree.selection_state(root), SelectionState::Unselected);
    }
}
