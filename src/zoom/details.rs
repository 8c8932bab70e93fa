use std::collections::HashMap;

use tracing::debug;

use crate::dataset::{HierarchyProvider, MoleculeId};
use crate::tree::{NodeId, TreeEvent, VisualTree};

use super::{RenderMode, ZoomLevel, render_mode};

pub const MOLECULES_PER_PAGE: usize = 12;

/// Paged grid of the molecules behind one scaffold node.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailView {
    molecules: Vec<MoleculeId>,
    page: usize,
}

impl DetailView {
    fn new(molecules: Vec<MoleculeId>) -> Self {
        Self { molecules, page: 0 }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.molecules.len().div_ceil(MOLECULES_PER_PAGE).max(1)
    }

    pub fn molecule_count(&self) -> usize {
        self.molecules.len()
    }

    pub fn visible(&self) -> &[MoleculeId] {
        let start = (self.page * MOLECULES_PER_PAGE).min(self.molecules.len());
        let end = (start + MOLECULES_PER_PAGE).min(self.molecules.len());
        &self.molecules[start..end]
    }

    pub fn next_page(&mut self) -> bool {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            return true;
        }
        false
    }

    pub fn previous_page(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            return true;
        }
        false
    }
}

/// Owner of every attached detail view. Views exist only while their node
/// is rendered at `Close` or nearer with details enabled.
#[derive(Debug, Default)]
pub struct DetailViews {
    views: HashMap<NodeId, DetailView>,
    enabled: bool,
    attached_total: u64,
}

impl DetailViews {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled && !self.views.is_empty() {
            debug!(views = self.views.len(), "details off, dropping detail views");
            self.views.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn attached_total(&self) -> u64 {
        self.attached_total
    }

    pub fn get(&self, node: NodeId) -> Option<&DetailView> {
        self.views.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut DetailView> {
        self.views.get_mut(&node)
    }

    /// Drops the views of nodes for which `keep` answers `false`.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        self.views.retain(|node, _| keep(*node));
    }

    /// Resolves the render mode of `node` at `level`, attaching or
    /// destroying its detail view on a threshold crossing. Repeated calls
    /// at the same level change nothing.
    pub fn update(
        &mut self,
        hierarchy: &dyn HierarchyProvider,
        tree: &VisualTree,
        node: NodeId,
        level: ZoomLevel,
    ) -> RenderMode {
        let Some(scaffold) = tree.scaffold_of(node) else {
            self.views.remove(&node);
            return render_mode(level, false);
        };
        let molecules = hierarchy.molecules(scaffold);
        let wanted = self.enabled && level.shows_depiction() && !molecules.is_empty();

        if wanted {
            if !self.views.contains_key(&node) {
                self.views.insert(node, DetailView::new(molecules.to_vec()));
                self.attached_total += 1;
            }
        } else {
            self.views.remove(&node);
        }
        render_mode(level, wanted)
    }

    pub fn handle_event(&mut self, event: &TreeEvent) {
        if let TreeEvent::NodeRemoved { node, .. } = event {
            self.views.remove(node);
        }
    }

    pub fn clear(&mut self) {
        self.views.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ScaffoldId;
    use crate::dataset::test_support::DatasetBuilder;
    use crate::tree::ExpandDepth;

    fn setup() -> (crate::dataset::ScaffoldDataset, VisualTree, NodeId) {
        let molecules = (100..130).collect::<Vec<_>>();
        let data = DatasetBuilder::new()
            .scaffold(1, None)
            .scaffold(2, Some(1))
            .molecules(2, &molecules)
            .build();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&data, ScaffoldId(1)).expect("root");
        tree.expand(&data, root, ExpandDepth::Levels(1));
        let node = tree.node_for(ScaffoldId(2)).expect("2");
        (data, tree, node)
    }

    #[test]
    fn detail_view_attaches_once_and_drops_below_close() {
        let (data, tree, node) = setup();
        let mut views = DetailViews::new(true);

        assert_eq!(
            views.update(&data, &tree, node, ZoomLevel::Medium),
            RenderMode::Badge
        );
        assert!(views.is_empty());

        for _ in 0..3 {
            assert_eq!(
                views.update(&data, &tree, node, ZoomLevel::Close),
                RenderMode::Depiction { details: true }
            );
        }
        views.update(&data, &tree, node, ZoomLevel::VeryClose);
        assert_eq!(views.attached_total(), 1);
        assert_eq!(views.len(), 1);

        views.update(&data, &tree, node, ZoomLevel::Medium);
        assert!(views.get(node).is_none());
        views.update(&data, &tree, node, ZoomLevel::Close);
        assert_eq!(views.attached_total(), 2);
    }

    #[test]
    fn disabling_details_destroys_views() {
        let (data, tree, node) = setup();
        let mut views = DetailViews::new(true);
        views.update(&data, &tree, node, ZoomLevel::Close);
        views.set_enabled(false);
        assert!(views.is_empty());
        assert_eq!(
            views.update(&data, &tree, node, ZoomLevel::Close),
            RenderMode::Depiction { details: false }
        );
        assert!(views.is_empty());
    }

    #[test]
    fn scaffolds_without_molecules_get_no_view() {
        let (data, tree, _) = setup();
        let root = tree.root().expect("root");
        let mut views = DetailViews::new(true);
        assert_eq!(
            views.update(&data, &tree, root, ZoomLevel::VeryClose),
            RenderMode::Depiction { details: false }
        );
        assert!(views.is_empty());
    }

    #[test]
    fn removed_nodes_lose_their_view() {
        let (data, mut tree, node) = setup();
        let events = tree.subscribe();
        let mut views = DetailViews::new(true);
        views.update(&data, &tree, node, ZoomLevel::Close);

        let root = tree.root().expect("root");
        tree.reduce(root);
        for event in events.try_iter() {
            views.handle_event(&event);
        }
        assert!(views.is_empty());
    }

    #[test]
    fn offscreen_views_are_dropped() {
        let (data, tree, node) = setup();
        let mut views = DetailViews::new(true);
        views.update(&data, &tree, node, ZoomLevel::Close);
        views.retain(|kept| kept != node);
        assert!(views.is_empty());
    }

    #[test]
    fn pages_cover_all_molecules() {
        let (data, tree, node) = setup();
        let mut views = DetailViews::new(true);
        views.update(&data, &tree, node, ZoomLevel::Close);
        let view = views.get_mut(node).expect("view");

        assert_eq!(view.page_count(), 3);
        assert_eq!(view.visible().len(), MOLECULES_PER_PAGE);
        assert!(view.next_page());
        assert!(view.next_page());
        assert!(!view.next_page());
        assert_eq!(view.visible().len(), 6);
        assert!(view.previous_page());
        assert_eq!(view.page(), 1);
    }
}
