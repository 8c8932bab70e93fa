use eframe::egui::{Pos2, Rect, Vec2, vec2};
use tracing::debug;

pub const MIN_ZOOM: f32 = 0.02;
pub const MAX_ZOOM: f32 = 6.0;
const FIT_MARGIN: f32 = 48.0;
const SETTLE_EPSILON: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl CameraView {
    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            pan: self.pan + (other.pan - self.pan) * t,
            zoom: self.zoom + (other.zoom - self.zoom) * t,
        }
    }

    fn approx_eq(self, other: Self) -> bool {
        (self.pan - other.pan).length() <= SETTLE_EPSILON
            && (self.zoom - other.zoom).abs() <= SETTLE_EPSILON * self.zoom.max(1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CameraAnimation {
    from: CameraView,
    to: CameraView,
    elapsed: f32,
    duration: f32,
}

/// Pan/zoom state of the canvas. A world point `w` lands on screen at
/// `viewport.center() + pan + w * zoom`.
#[derive(Clone, Debug)]
pub struct Camera {
    view: CameraView,
    viewport: Rect,
    animation: Option<CameraAnimation>,
    user_zoomed: bool,
    auto_fit: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: CameraView::default(),
            viewport: Rect::from_min_size(Pos2::ZERO, vec2(1280.0, 800.0)),
            animation: None,
            user_zoomed: false,
            auto_fit: true,
        }
    }
}

impl Camera {
    #[cfg(test)]
    pub fn view(&self) -> CameraView {
        self.view
    }

    pub fn zoom(&self) -> f32 {
        self.view.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.view.pan
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn user_zoomed(&self) -> bool {
        self.user_zoomed
    }

    /// Returns `true` when the viewport size changed and the view should be
    /// refit. Never asks for a refit after the user zoomed by hand.
    pub fn set_viewport(&mut self, viewport: Rect) -> bool {
        let resized = (viewport.size() - self.viewport.size()).length() > 0.5;
        self.viewport = viewport;
        resized && self.auto_fit && !self.user_zoomed
    }

    pub fn world_to_screen(&self, world: Vec2) -> Pos2 {
        self.viewport.center() + self.view.pan + world * self.view.zoom
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Vec2 {
        (screen - self.viewport.center() - self.view.pan) / self.view.zoom
    }

    pub fn is_visible(&self, world: Vec2, world_radius: f32) -> bool {
        let screen = self.world_to_screen(world);
        let radius = world_radius * self.view.zoom;
        self.viewport.expand(radius).contains(screen)
    }

    /// Wheel zoom about the pointer. Marks the view as user controlled.
    pub fn zoom_about(&mut self, pointer: Pos2, scroll: f32) {
        let world_before = self.screen_to_world(pointer);
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.view.zoom = (self.view.zoom * zoom_factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.view.pan = pointer - self.viewport.center() - (world_before * self.view.zoom);
        self.animation = None;
        self.user_zoomed = true;
        self.auto_fit = false;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.view.pan += delta;
        self.animation = None;
        self.auto_fit = false;
    }

    /// Shifts the view so whatever sat at a world point that moved by
    /// `delta` stays put on screen.
    pub fn follow(&mut self, delta: Vec2) {
        let shift = delta * self.view.zoom;
        self.view.pan -= shift;
        if let Some(animation) = &mut self.animation {
            animation.from.pan -= shift;
            animation.to.pan -= shift;
        }
    }

    /// View that centers `world` at `zoom`.
    pub fn centered_on(&self, world: Vec2, zoom: f32) -> CameraView {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        CameraView {
            pan: -world * zoom,
            zoom,
        }
    }

    /// View that fits the world box `(min, max)` into the viewport.
    pub fn fitted(&self, (min, max): (Vec2, Vec2)) -> CameraView {
        let extent = (max - min).max(Vec2::splat(1.0));
        let available = (self.viewport.size() - Vec2::splat(FIT_MARGIN * 2.0)).max(Vec2::splat(1.0));
        let zoom = (available.x / extent.x).min(available.y / extent.y);
        self.centered_on((min + max) * 0.5, zoom)
    }

    pub fn focus_on(&mut self, world: Vec2, zoom: f32, duration: f32) {
        let target = self.centered_on(world, zoom);
        self.auto_fit = false;
        self.animate_to(target, duration);
    }

    /// Fits the whole layout. Converges: once settled, calling it again
    /// with the same bounds leaves the view untouched.
    pub fn zoom_to_overview(&mut self, bounds: (Vec2, Vec2), duration: f32) -> bool {
        self.user_zoomed = false;
        self.auto_fit = true;
        let target = self.fitted(bounds);
        self.animate_to(target, duration)
    }

    pub fn zoom_to_selection(&mut self, bounds: (Vec2, Vec2), duration: f32) -> bool {
        self.auto_fit = false;
        let target = self.fitted(bounds);
        self.animate_to(target, duration)
    }

    /// Installs a new camera animation, superseding any running one.
    /// Returns `false` when the view already sits at `target`.
    fn animate_to(&mut self, target: CameraView, duration: f32) -> bool {
        if let Some(animation) = &self.animation
            && animation.to.approx_eq(target)
        {
            return false;
        }
        if self.animation.is_none() && self.view.approx_eq(target) {
            return false;
        }

        if duration <= 0.0 {
            self.view = target;
            self.animation = None;
        } else {
            self.animation = Some(CameraAnimation {
                from: self.view,
                to: target,
                elapsed: 0.0,
                duration,
            });
        }
        debug!(zoom = target.zoom, "camera move");
        true
    }

    /// Advances the camera animation. Returns `true` while still moving.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(animation) = &mut self.animation else {
            return false;
        };
        animation.elapsed += dt.max(0.0);
        let t = (animation.elapsed / animation.duration).clamp(0.0, 1.0);
        if t >= 1.0 {
            self.view = animation.to;
            self.animation = None;
            return false;
        }
        self.view = animation.from.lerp(animation.to, ease(t));
        true
    }
}

pub(super) fn ease(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> (Vec2, Vec2) {
        (vec2(-500.0, -300.0), vec2(700.0, 300.0))
    }

    #[test]
    fn screen_and_world_round_trip() {
        let mut camera = Camera::default();
        camera.zoom_about(Pos2::new(100.0, 100.0), 120.0);
        let world = vec2(37.0, -12.0);
        let back = camera.screen_to_world(camera.world_to_screen(world));
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn wheel_zoom_keeps_pointer_fixed() {
        let mut camera = Camera::default();
        let pointer = Pos2::new(300.0, 200.0);
        let before = camera.screen_to_world(pointer);
        camera.zoom_about(pointer, 200.0);
        let after = camera.screen_to_world(pointer);
        assert!((before - after).length() < 1e-3);
        assert!(camera.zoom() > 1.0);
    }

    #[test]
    fn overview_converges_and_is_idempotent() {
        let mut camera = Camera::default();
        assert!(camera.zoom_to_overview(bounds(), 0.5));
        assert!(!camera.zoom_to_overview(bounds(), 0.5));
        for _ in 0..40 {
            camera.tick(1.0 / 60.0);
        }
        assert!(!camera.is_animating());
        let settled = camera.view();
        assert_eq!(settled, camera.fitted(bounds()));

        assert!(!camera.zoom_to_overview(bounds(), 0.5));
        camera.tick(1.0 / 60.0);
        assert_eq!(camera.view(), settled);
    }

    #[test]
    fn fitted_view_contains_bounds() {
        let camera = Camera::default();
        let view = camera.fitted(bounds());
        let mut fitted = camera.clone();
        fitted.view = view;
        assert!(camera.viewport().contains(fitted.world_to_screen(bounds().0)));
        assert!(camera.viewport().contains(fitted.world_to_screen(bounds().1)));
    }

    #[test]
    fn user_zoom_blocks_resize_refit() {
        let mut camera = Camera::default();
        assert!(camera.set_viewport(Rect::from_min_size(Pos2::ZERO, vec2(900.0, 700.0))));
        camera.zoom_about(Pos2::new(10.0, 10.0), -120.0);
        assert!(!camera.set_viewport(Rect::from_min_size(Pos2::ZERO, vec2(1000.0, 700.0))));

        camera.zoom_to_overview(bounds(), 0.0);
        assert!(camera.set_viewport(Rect::from_min_size(Pos2::ZERO, vec2(1100.0, 700.0))));
    }

    #[test]
    fn new_command_supersedes_running_animation() {
        let mut camera = Camera::default();
        camera.focus_on(vec2(1000.0, 0.0), 2.0, 1.0);
        camera.tick(0.2);
        camera.focus_on(vec2(-1000.0, 0.0), 0.5, 1.0);
        camera.tick(5.0);
        assert_eq!(camera.view(), camera.centered_on(vec2(-1000.0, 0.0), 0.5));
    }
}
