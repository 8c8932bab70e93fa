use eframe::egui::{
    Align2, Color32, CornerRadius, FontId, Mesh, Painter, Pos2, Rect, Shape, Stroke, StrokeKind, Vec2,
    pos2, vec2,
};

use crate::layout::Sector;
use crate::util::blend_color;

const GRADIENT_STEPS: usize = 6;
const ARC_STEP: f32 = 0.04;

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.25 + (factor * 0.35))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (64.0 * zoom.clamp(0.5, 2.0)).max(24.0);
    let origin = rect.center() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 50));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([pos2(x, rect.top()), pos2(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([pos2(rect.left(), y), pos2(rect.right(), y)], stroke);
        y += step;
    }
}

/// Line whose color runs from `from_color` to `to_color`.
pub(super) fn gradient_line(
    painter: &Painter,
    from: Pos2,
    to: Pos2,
    width: f32,
    from_color: Color32,
    to_color: Color32,
) {
    if from_color == to_color {
        painter.line_segment([from, to], Stroke::new(width, from_color));
        return;
    }
    for step in 0..GRADIENT_STEPS {
        let t0 = step as f32 / GRADIENT_STEPS as f32;
        let t1 = (step + 1) as f32 / GRADIENT_STEPS as f32;
        let color = blend_color(from_color, to_color, (t0 + t1) * 0.5);
        painter.line_segment(
            [from + (to - from) * t0, from + (to - from) * t1],
            Stroke::new(width, color),
        );
    }
}

/// Annulus slice between `inner` and `outer` over `sector`.
pub(super) fn annular_wedge(
    painter: &Painter,
    center: Pos2,
    inner: f32,
    outer: f32,
    sector: Sector,
    fill: Color32,
) {
    let steps = ((sector.span() / ARC_STEP).ceil() as usize).max(1);
    let mut mesh = Mesh::default();
    for step in 0..=steps {
        let angle = sector.start + sector.span() * step as f32 / steps as f32;
        let direction = vec2(angle.cos(), angle.sin());
        mesh.colored_vertex(center + direction * inner, fill);
        mesh.colored_vertex(center + direction * outer, fill);
    }
    for step in 0..steps as u32 {
        let base = step * 2;
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base + 1, base + 3, base + 2);
    }
    painter.add(Shape::mesh(mesh));
}

pub(super) fn histogram_bars(painter: &Painter, rect: Rect, bins: &[u32], color: Color32) {
    painter.rect_filled(rect, CornerRadius::same(2), Color32::from_black_alpha(140));
    let Some(peak) = bins.iter().copied().max().filter(|peak| *peak > 0) else {
        return;
    };
    let width = rect.width() / bins.len().max(1) as f32;
    for (index, count) in bins.iter().enumerate() {
        let height = rect.height() * (*count as f32 / peak as f32);
        let left = rect.left() + index as f32 * width;
        let bar = Rect::from_min_max(
            pos2(left + 0.5, rect.bottom() - height),
            pos2(left + width - 0.5, rect.bottom()),
        );
        painter.rect_filled(bar, 0.0, color);
    }
}

pub(super) fn molecule_grid(
    painter: &Painter,
    rect: Rect,
    columns: usize,
    cells: &[String],
    page: usize,
    pages: usize,
) {
    painter.rect(
        rect,
        CornerRadius::same(6),
        Color32::from_rgba_unmultiplied(24, 30, 38, 230),
        Stroke::new(1.0, Color32::from_gray(90)),
        StrokeKind::Inside,
    );
    let footer = 18.0_f32.min(rect.height() * 0.3);
    let columns = columns.max(1);
    let rows = cells.len().div_ceil(columns).max(1);
    let cell = vec2(
        rect.width() / columns as f32,
        (rect.height() - footer) / rows as f32,
    );
    let font = FontId::monospace((cell.y * 0.28).clamp(7.0, 13.0));

    for (index, label) in cells.iter().enumerate() {
        let min = rect.min + vec2((index % columns) as f32 * cell.x, (index / columns) as f32 * cell.y);
        let slot = Rect::from_min_size(min, cell).shrink(2.0);
        painter.rect_filled(slot, CornerRadius::same(3), Color32::from_rgb(40, 48, 60));
        painter.text(
            slot.center(),
            Align2::CENTER_CENTER,
            label,
            font.clone(),
            Color32::from_gray(220),
        );
    }

    painter.text(
        pos2(rect.center().x, rect.bottom() - footer * 0.5),
        Align2::CENTER_CENTER,
        format!("page {} / {}", page + 1, pages.max(1)),
        FontId::proportional((footer * 0.6).clamp(7.0, 12.0)),
        Color32::from_gray(170),
    );
}
