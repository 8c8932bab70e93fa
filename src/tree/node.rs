use eframe::egui::Vec2;

use crate::dataset::ScaffoldId;
use crate::selection::SelectionState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(super) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(super) u64);

#[derive(Clone, Debug)]
pub struct VisualNode {
    pub id: NodeId,
    pub scaffold: ScaffoldId,
    pub(super) position: Vec2,
    pub(super) scale: f32,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) parent_edge: Option<EdgeId>,
    pub(super) child_edges: Vec<EdgeId>,
    pub(super) selection: SelectionState,
}

impl VisualNode {
    pub(super) fn new(id: NodeId, scaffold: ScaffoldId, position: Vec2) -> Self {
        Self {
            id,
            scaffold,
            position,
            scale: 1.0,
            parent: None,
            children: Vec::new(),
            parent_edge: None,
            child_edges: Vec::new(),
            selection: SelectionState::Unselected,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }
}

#[derive(Clone, Copy, Debug)]
pub struct VisualEdge {
    pub id: EdgeId,
    pub parent: NodeId,
    pub child: NodeId,
    /// Edges hanging off a synthetic hierarchy root are kept for structure
    /// but not drawn.
    pub visible: bool,
}
