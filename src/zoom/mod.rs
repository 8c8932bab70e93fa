mod details;

pub use details::DetailViews;

const MEDIUM_THRESHOLD: f32 = 0.25;
const CLOSE_THRESHOLD: f32 = 0.6;
const VERY_CLOSE_THRESHOLD: f32 = 1.5;

/// Semantic zoom level, ordered from zoomed out to zoomed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ZoomLevel {
    Distant,
    Medium,
    Close,
    VeryClose,
}

impl ZoomLevel {
    /// `scale` is the on-screen magnification of a node: camera zoom times
    /// the node's own scale.
    pub fn from_scale(scale: f32) -> Self {
        if scale.is_nan() || scale < MEDIUM_THRESHOLD {
            Self::Distant
        } else if scale < CLOSE_THRESHOLD {
            Self::Medium
        } else if scale < VERY_CLOSE_THRESHOLD {
            Self::Close
        } else {
            Self::VeryClose
        }
    }

    pub fn shows_depiction(self) -> bool {
        self >= Self::Close
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Distant => "distant",
            Self::Medium => "medium",
            Self::Close => "close",
            Self::VeryClose => "very close",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Dot,
    Badge,
    Depiction { details: bool },
}

pub fn render_mode(level: ZoomLevel, has_details: bool) -> RenderMode {
    match level {
        ZoomLevel::Distant => RenderMode::Dot,
        ZoomLevel::Medium => RenderMode::Badge,
        ZoomLevel::Close | ZoomLevel::VeryClose => RenderMode::Depiction {
            details: has_details,
        },
    }
}
