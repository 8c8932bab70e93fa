use eframe::egui::{Align2, Color32, Pos2, Rect, Stroke, Vec2, vec2};

use crate::animation::Camera;
use crate::dataset::HierarchyProvider;
use crate::layout::{Guide, LayoutKind, LayoutResult, Sector};
use crate::selection::SelectionState;
use crate::sorting::{ColorSegment, MappingState, SortState};
use crate::tree::{NodeId, VisualTree};
use crate::util::{blend_color, short_label};
use crate::zoom::{DetailViews, RenderMode, ZoomLevel, render_mode};

const NODE_FILL: Color32 = Color32::from_rgb(58, 74, 94);
const HALF_SELECTED_FILL: Color32 = Color32::from_rgb(150, 128, 70);
const SELECTED_FILL: Color32 = Color32::from_rgb(236, 184, 64);
const EDGE_COLOR: Color32 = Color32::from_rgb(96, 110, 126);
const SELECTED_EDGE_COLOR: Color32 = Color32::from_rgb(236, 184, 64);
const GUIDE_COLOR: Color32 = Color32::from_rgba_premultiplied(50, 60, 72, 70);
const LABEL_COLOR: Color32 = Color32::from_rgb(225, 230, 236);
const CURSOR_STROKE: Stroke = Stroke {
    width: 2.5,
    color: Color32::from_rgb(120, 200, 255),
};
const DOT_RADIUS: f32 = 4.0;
const DEFAULT_EDGE_WIDTH: f32 = 1.5;
const INFO_BAR_HEIGHT: f32 = 14.0;
const DETAIL_COLUMNS: usize = 4;
const DETAIL_CELL: f32 = 46.0;

/// Capability tag the painter dispatches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneKind {
    Scaffold,
    Label,
    Icon,
    DetailGrid,
    InfoBar,
    Edge,
    Guide,
    Segment,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Circle {
        center: Pos2,
        radius: f32,
        fill: Color32,
        stroke: Stroke,
    },
    RoundedRect {
        rect: Rect,
        rounding: f32,
        fill: Color32,
        stroke: Stroke,
    },
    Line {
        from: Pos2,
        to: Pos2,
        width: f32,
        from_color: Color32,
        to_color: Color32,
    },
    Ring {
        center: Pos2,
        radius: f32,
        stroke: Stroke,
    },
    Wedge {
        center: Pos2,
        inner: f32,
        outer: f32,
        sector: Sector,
        fill: Color32,
    },
    Band {
        rect: Rect,
        fill: Color32,
    },
    Text {
        pos: Pos2,
        text: String,
        size: f32,
        color: Color32,
        align: Align2,
    },
    Bars {
        rect: Rect,
        bins: Vec<u32>,
        color: Color32,
    },
    Grid {
        rect: Rect,
        columns: usize,
        cells: Vec<String>,
        page: usize,
        pages: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneItem {
    pub kind: SceneKind,
    pub node: Option<NodeId>,
    pub shape: Shape,
}

#[derive(Debug, Default)]
pub struct Scene {
    pub items: Vec<SceneItem>,
    pub visible_nodes: usize,
    pub visible_edges: usize,
}

impl Scene {
    #[cfg(test)]
    pub fn count(&self, kind: SceneKind) -> usize {
        self.items.iter().filter(|item| item.kind == kind).count()
    }

    fn push(&mut self, kind: SceneKind, node: Option<NodeId>, shape: Shape) {
        self.items.push(SceneItem { kind, node, shape });
    }
}

pub struct SceneInput<'a> {
    pub tree: &'a VisualTree,
    pub hierarchy: &'a dyn HierarchyProvider,
    pub layout: &'a LayoutResult,
    pub layout_kind: LayoutKind,
    pub camera: &'a Camera,
    pub mappings: &'a MappingState,
    pub sort: &'a SortState,
    pub details: &'a DetailViews,
    pub cursor: Option<NodeId>,
    pub show_guides: bool,
}

/// World size of a node's depiction, mapping scale included.
pub fn node_size(
    tree: &VisualTree,
    hierarchy: &dyn HierarchyProvider,
    mappings: &MappingState,
    node: NodeId,
) -> Vec2 {
    let Some(visual) = tree.node(node) else {
        return Vec2::ZERO;
    };
    hierarchy.intrinsic_size(visual.scaffold) * visual.scale() * mappings.node_scale(visual.scaffold)
}

pub fn node_zoom_level(
    tree: &VisualTree,
    mappings: &MappingState,
    camera_zoom: f32,
    node: NodeId,
) -> ZoomLevel {
    let scale = tree.node(node).map_or(1.0, |visual| {
        visual.scale() * mappings.node_scale(visual.scaffold)
    });
    ZoomLevel::from_scale(camera_zoom * scale)
}

/// Nodes whose depiction intersects the viewport.
pub fn visible_nodes(
    tree: &VisualTree,
    hierarchy: &dyn HierarchyProvider,
    mappings: &MappingState,
    camera: &Camera,
) -> Vec<NodeId> {
    tree.preorder()
        .into_iter()
        .filter(|node| {
            let size = node_size(tree, hierarchy, mappings, *node);
            tree.position(*node)
                .is_some_and(|position| camera.is_visible(position, size.length() * 0.5))
        })
        .collect()
}

pub fn build_scene(input: &SceneInput<'_>) -> Scene {
    let mut scene = Scene::default();
    if input.tree.is_empty() {
        return scene;
    }

    push_segments(&mut scene, input);
    if input.show_guides {
        push_guides(&mut scene, input);
    }
    push_edges(&mut scene, input);
    for node in visible_nodes(input.tree, input.hierarchy, input.mappings, input.camera) {
        push_node(&mut scene, input, node);
        scene.visible_nodes += 1;
    }
    scene
}

fn selection_fill(state: SelectionState) -> Color32 {
    match state {
        SelectionState::Unselected => NODE_FILL,
        SelectionState::HalfSelected => HALF_SELECTED_FILL,
        SelectionState::Selected => SELECTED_FILL,
    }
}

fn push_node(scene: &mut Scene, input: &SceneInput<'_>, node: NodeId) {
    let (tree, camera) = (input.tree, input.camera);
    let Some(visual) = tree.node(node) else {
        return;
    };
    let Some(world) = tree.position(node) else {
        return;
    };
    let center = camera.world_to_screen(world);
    let size = node_size(tree, input.hierarchy, input.mappings, node) * camera.zoom();
    let fill = input
        .mappings
        .node_color(visual.scaffold)
        .unwrap_or_else(|| selection_fill(visual.selection()));
    let selection_stroke = match visual.selection() {
        SelectionState::Unselected => Stroke::new(1.0, blend_color(fill, Color32::WHITE, 0.25)),
        _ => Stroke::new(2.0, SELECTED_FILL),
    };
    let stroke = if input.cursor == Some(node) {
        CURSOR_STROKE
    } else {
        selection_stroke
    };

    let level = node_zoom_level(tree, input.mappings, camera.zoom(), node);
    let details = input.details.get(node);
    let rect = Rect::from_center_size(center, size);

    match render_mode(level, details.is_some()) {
        RenderMode::Dot => {
            scene.push(
                SceneKind::Scaffold,
                Some(node),
                Shape::Circle {
                    center,
                    radius: (size.length() * 0.25).clamp(2.0, DOT_RADIUS),
                    fill,
                    stroke,
                },
            );
        }
        RenderMode::Badge => {
            scene.push(
                SceneKind::Scaffold,
                Some(node),
                Shape::RoundedRect {
                    rect,
                    rounding: 4.0,
                    fill,
                    stroke,
                },
            );
        }
        RenderMode::Depiction { .. } => {
            scene.push(
                SceneKind::Scaffold,
                Some(node),
                Shape::RoundedRect {
                    rect,
                    rounding: 8.0,
                    fill,
                    stroke,
                },
            );
            let max_chars = if level == ZoomLevel::VeryClose { 48 } else { 18 };
            let molecules = input.hierarchy.molecules(visual.scaffold).len();
            let text = if level == ZoomLevel::VeryClose {
                format!(
                    "{}\n{} · {molecules} molecules",
                    short_label(input.hierarchy.label(visual.scaffold), max_chars),
                    visual.scaffold
                )
            } else {
                short_label(input.hierarchy.label(visual.scaffold), max_chars)
            };
            scene.push(
                SceneKind::Label,
                Some(node),
                Shape::Text {
                    pos: rect.center(),
                    text,
                    size: (11.0 * camera.zoom().sqrt()).clamp(9.0, 16.0),
                    color: LABEL_COLOR,
                    align: Align2::CENTER_CENTER,
                },
            );
            push_icon(scene, input, node, rect);
            if let Some(view) = details {
                let rows = view.visible().len().div_ceil(DETAIL_COLUMNS).max(1);
                let grid_size = vec2(
                    DETAIL_COLUMNS as f32 * DETAIL_CELL,
                    rows as f32 * DETAIL_CELL + 18.0,
                ) * camera.zoom().min(1.5);
                let grid = Rect::from_min_size(
                    rect.center_bottom() + vec2(-grid_size.x * 0.5, 6.0),
                    grid_size,
                );
                scene.push(
                    SceneKind::DetailGrid,
                    Some(node),
                    Shape::Grid {
                        rect: grid,
                        columns: DETAIL_COLUMNS,
                        cells: view.visible().iter().map(ToString::to_string).collect(),
                        page: view.page(),
                        pages: view.page_count(),
                    },
                );
            }
        }
    }

    if level >= ZoomLevel::Medium
        && let Some(bins) = input.mappings.info_bar(visual.scaffold)
    {
        let bar = Rect::from_min_size(
            rect.left_top() - vec2(0.0, INFO_BAR_HEIGHT + 3.0),
            vec2(rect.width().max(24.0), INFO_BAR_HEIGHT),
        );
        scene.push(
            SceneKind::InfoBar,
            Some(node),
            Shape::Bars {
                rect: bar,
                bins: bins.to_vec(),
                color: blend_color(fill, Color32::WHITE, 0.35),
            },
        );
    }
}

fn push_icon(scene: &mut Scene, input: &SceneInput<'_>, node: NodeId, rect: Rect) {
    let glyph = if input.tree.is_expandable(input.hierarchy, node) {
        "+"
    } else if input.tree.is_reducible(node) {
        "−"
    } else {
        return;
    };
    scene.push(
        SceneKind::Icon,
        Some(node),
        Shape::Text {
            pos: rect.right_top() + vec2(-8.0, 8.0),
            text: glyph.to_owned(),
            size: 13.0,
            color: LABEL_COLOR,
            align: Align2::CENTER_CENTER,
        },
    );
}

fn push_edges(scene: &mut Scene, input: &SceneInput<'_>) {
    let (tree, camera) = (input.tree, input.camera);
    let viewport = camera.viewport();
    for edge in tree.edges().filter(|edge| edge.visible) {
        let (Some(from), Some(to)) = (tree.position(edge.parent), tree.position(edge.child)) else {
            continue;
        };
        let (from, to) = (camera.world_to_screen(from), camera.world_to_screen(to));
        if !edge_visible(viewport, from, to, 4.0) {
            continue;
        }
        let Some(scaffold) = tree.scaffold_of(edge.child) else {
            continue;
        };

        let width = input
            .mappings
            .edge_width(scaffold)
            .unwrap_or(DEFAULT_EDGE_WIDTH);
        let edge_color = |node| match tree.selection_state(node) {
            SelectionState::Unselected => EDGE_COLOR,
            _ => SELECTED_EDGE_COLOR,
        };
        scene.push(
            SceneKind::Edge,
            Some(edge.child),
            Shape::Line {
                from,
                to,
                width,
                from_color: edge_color(edge.parent),
                to_color: edge_color(edge.child),
            },
        );
        scene.visible_edges += 1;
    }
}

fn push_guides(scene: &mut Scene, input: &SceneInput<'_>) {
    let camera = input.camera;
    let center = camera.world_to_screen(Vec2::ZERO);
    for guide in &input.layout.guides {
        let shape = match *guide {
            Guide::Circle { radius } => Shape::Ring {
                center,
                radius: radius * camera.zoom(),
                stroke: Stroke::new(1.0, GUIDE_COLOR),
            },
            Guide::Separator {
                angle,
                inner,
                outer,
            } => {
                let direction = vec2(angle.cos(), angle.sin());
                Shape::Line {
                    from: center + direction * inner * camera.zoom(),
                    to: center + direction * outer * camera.zoom(),
                    width: 1.0,
                    from_color: GUIDE_COLOR,
                    to_color: GUIDE_COLOR,
                }
            }
        };
        scene.push(SceneKind::Guide, None, shape);
    }
}

fn push_segments(scene: &mut Scene, input: &SceneInput<'_>) {
    for segment in &input.sort.segments {
        if input.layout_kind.is_radial() {
            push_wedge(scene, input, segment);
        } else if input.layout_kind == LayoutKind::Linear {
            push_band(scene, input, segment);
        }
    }
}

fn push_wedge(scene: &mut Scene, input: &SceneInput<'_>, segment: &ColorSegment) {
    let layout = input.layout;
    let sectors = segment
        .nodes
        .iter()
        .filter_map(|node| layout.sectors.get(node))
        .collect::<Vec<_>>();
    let (Some(first), Some(last)) = (sectors.first(), sectors.last()) else {
        return;
    };
    let sector = Sector {
        start: first.start,
        end: last.end,
    };
    let zoom = input.camera.zoom();
    let inner = layout.radii.get(1).copied().unwrap_or(0.0) * 0.5 * zoom;
    let outer = (layout.radii.last().copied().unwrap_or(0.0) + layout.spacing) * zoom;
    let center = input.camera.world_to_screen(Vec2::ZERO);

    scene.push(
        SceneKind::Segment,
        None,
        Shape::Wedge {
            center,
            inner,
            outer,
            sector,
            fill: segment.color,
        },
    );
    if let Some(caption) = &segment.caption {
        let direction = vec2(sector.mid().cos(), sector.mid().sin());
        scene.push(
            SceneKind::Segment,
            None,
            Shape::Text {
                pos: center + direction * (outer + 14.0),
                text: caption.clone(),
                size: 13.0,
                color: LABEL_COLOR,
                align: Align2::CENTER_CENTER,
            },
        );
    }
}

fn push_band(scene: &mut Scene, input: &SceneInput<'_>, segment: &ColorSegment) {
    let layout = input.layout;
    let bands = segment
        .nodes
        .iter()
        .filter_map(|node| layout.bands.get(node))
        .collect::<Vec<_>>();
    let (Some(first), Some(last)) = (bands.first(), bands.last()) else {
        return;
    };
    let right = layout
        .positions
        .values()
        .map(|position| position.x)
        .fold(0.0_f32, f32::max)
        + layout.spacing * 4.0;
    let left = segment
        .nodes
        .first()
        .and_then(|node| layout.position(*node))
        .map_or(0.0, |position| position.x - layout.spacing * 2.0);

    let camera = input.camera;
    let rect = Rect::from_two_pos(
        camera.world_to_screen(vec2(left, first.top)),
        camera.world_to_screen(vec2(right, last.bottom)),
    );
    scene.push(
        SceneKind::Segment,
        None,
        Shape::Band {
            rect,
            fill: segment.color,
        },
    );
    if let Some(caption) = &segment.caption {
        scene.push(
            SceneKind::Segment,
            None,
            Shape::Text {
                pos: rect.left_center() + vec2(6.0, 0.0),
                text: caption.clone(),
                size: 13.0,
                color: LABEL_COLOR,
                align: Align2::LEFT_CENTER,
            },
        );
    }
}

fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    if max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom() {
        return false;
    }

    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let top_left = rect.left_top();
    let top_right = rect.right_top();
    let bottom_left = rect.left_bottom();
    let bottom_right = rect.right_bottom();

    segments_intersect(start, end, top_left, top_right)
        || segments_intersect(start, end, top_right, bottom_right)
        || segments_intersect(start, end, bottom_right, bottom_left)
        || segments_intersect(start, end, bottom_left, top_left)
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let c1 = cross(a1, a2, b1);
    let c2 = cross(a1, a2, b2);
    let c3 = cross(b1, b2, a1);
    let c4 = cross(b1, b2, a2);

    (c1 <= 0.0 && c2 >= 0.0 || c1 >= 0.0 && c2 <= 0.0)
        && (c3 <= 0.0 && c4 >= 0.0 || c3 >= 0.0 && c4 <= 0.0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::animation::Camera;
    use crate::dataset::test_support::DatasetBuilder;
    use crate::dataset::{PropertyKey, ScaffoldDataset, ScaffoldId};
    use crate::layout::LayoutInput;
    use crate::sorting::{
        Accumulation, ChannelMapping, MappingRequest, PropertyRequest, SortValue, VisualChannel,
    };
    use crate::tree::ExpandDepth;

    fn dataset() -> ScaffoldDataset {
        DatasetBuilder::new()
            .scaffold(0, None)
            .synthetic(0)
            .scaffold(1, Some(0))
            .scaffold(2, Some(1))
            .scaffold(3, Some(1))
            .molecules(2, &[20, 21])
            .build()
    }

    struct Fixture {
        data: ScaffoldDataset,
        tree: VisualTree,
        layout: LayoutResult,
        camera: Camera,
        mappings: MappingState,
        sort: SortState,
        details: DetailViews,
    }

    fn fixture(kind: LayoutKind) -> Fixture {
        let data = dataset();
        let mut tree = VisualTree::new();
        let root = tree.create_root(&data, ScaffoldId(0)).expect("root");
        tree.expand(&data, root, ExpandDepth::All);
        let mappings = MappingState::default();
        let input = LayoutInput::from_tree(&tree, &data, &mappings, 1.0, true);
        let layout = kind.build().compute(&tree, &input);
        for (node, position) in &layout.positions {
            tree.set_position(*node, *position);
        }
        let mut camera = Camera::default();
        if let Some(bounds) = layout.bounds(&input) {
            camera.zoom_to_overview(bounds, 0.0);
        }
        Fixture {
            data,
            tree,
            layout,
            camera,
            mappings,
            sort: SortState::default(),
            details: DetailViews::new(true),
        }
    }

    fn build(fixture: &Fixture, kind: LayoutKind) -> Scene {
        build_scene(&SceneInput {
            tree: &fixture.tree,
            hierarchy: &fixture.data,
            layout: &fixture.layout,
            layout_kind: kind,
            camera: &fixture.camera,
            mappings: &fixture.mappings,
            sort: &fixture.sort,
            details: &fixture.details,
            cursor: None,
            show_guides: true,
        })
    }

    #[test]
    fn distant_nodes_are_dots_without_labels() {
        let mut fixture = fixture(LayoutKind::Radial);
        fixture.camera.focus_on(Vec2::ZERO, 0.1, 0.0);
        let scene = build(&fixture, LayoutKind::Radial);

        assert_eq!(scene.visible_nodes, 4);
        assert_eq!(scene.count(SceneKind::Label), 0);
        assert!(scene.items.iter().all(|item| item.kind != SceneKind::Scaffold
            || matches!(item.shape, Shape::Circle { .. })));
    }

    #[test]
    fn synthetic_root_edge_is_not_drawn() {
        let fixture = fixture(LayoutKind::Radial);
        let scene = build(&fixture, LayoutKind::Radial);
        assert_eq!(fixture.tree.edge_count(), 3);
        assert_eq!(scene.count(SceneKind::Edge), 2);
        assert!(scene.count(SceneKind::Guide) > 0);
    }

    #[test]
    fn close_zoom_shows_depiction_and_detail_grid() {
        let mut fixture = fixture(LayoutKind::Radial);
        let node = fixture.tree.node_for(ScaffoldId(2)).expect("2");
        let world = fixture.tree.position(node).expect("position");
        fixture.camera.focus_on(world, 2.0, 0.0);
        let level = node_zoom_level(&fixture.tree, &fixture.mappings, fixture.camera.zoom(), node);
        fixture
            .details
            .update(&fixture.data, &fixture.tree, node, level);

        let scene = build(&fixture, LayoutKind::Radial);
        let grid = scene
            .items
            .iter()
            .find(|item| item.kind == SceneKind::DetailGrid)
            .expect("detail grid");
        assert_eq!(grid.node, Some(node));
        assert!(matches!(&grid.shape, Shape::Grid { cells, .. } if cells.len() == 2));
        assert!(scene.count(SceneKind::Label) >= 1);
    }

    #[test]
    fn mapped_edge_width_is_used() {
        let mut fixture = fixture(LayoutKind::Balloon);
        fixture.mappings.install(ChannelMapping::new(
            MappingRequest {
                channel: VisualChannel::EdgeWidth,
                property: PropertyRequest {
                    key: PropertyKey::new("mw"),
                    accumulation: Accumulation::Average,
                    cumulative: false,
                },
            },
            HashMap::from([
                (ScaffoldId(2), SortValue::Number(1.0)),
                (ScaffoldId(3), SortValue::Number(5.0)),
            ]),
            &HashMap::new(),
        ));
        let scene = build(&fixture, LayoutKind::Balloon);
        let mut widths = scene
            .items
            .iter()
            .filter_map(|item| match item.shape {
                Shape::Line { width, .. } if item.kind == SceneKind::Edge => Some(width),
                _ => None,
            })
            .collect::<Vec<_>>();
        widths.sort_by(f32::total_cmp);
        assert_eq!(widths, vec![1.0, 6.0]);
    }

    #[test]
    fn segments_follow_the_layout_shape() {
        for (kind, wedge) in [(LayoutKind::Radial, true), (LayoutKind::Linear, false)] {
            let mut fixture = fixture(kind);
            let root = fixture.tree.root().expect("root");
            fixture.sort.segments = vec![ColorSegment {
                nodes: fixture.tree.children(root).to_vec(),
                value: Some(SortValue::Number(1.0)),
                color: Color32::RED,
                caption: Some("1".to_owned()),
            }];
            let scene = build(&fixture, kind);
            let shapes = scene
                .items
                .iter()
                .filter(|item| item.kind == SceneKind::Segment)
                .collect::<Vec<_>>();
            assert_eq!(shapes.len(), 2);
            assert_eq!(matches!(shapes[0].shape, Shape::Wedge { .. }), wedge);
            assert_eq!(matches!(shapes[0].shape, Shape::Band { .. }), !wedge);
        }
    }

    #[test]
    fn offscreen_edges_are_culled() {
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(100.0, 100.0));
        assert!(edge_visible(rect, Pos2::new(-50.0, 50.0), Pos2::new(150.0, 50.0), 0.0));
        assert!(!edge_visible(rect, Pos2::new(-50.0, -50.0), Pos2::new(-10.0, 200.0), 0.0));
    }
}
