use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use eframe::egui::Color32;

fn stable_hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic value in `[0, 1)` derived from `key`.
pub fn stable_unit(key: &str) -> f32 {
    ((stable_hash(key) >> 40) as f64 / (1u64 << 24) as f64) as f32
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub fn short_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_owned();
    }
    let mut out = label
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_unit_is_deterministic_and_bounded() {
        for key in ["a", "scaffold-17", ""] {
            let unit = stable_unit(key);
            assert!((0.0..1.0).contains(&unit));
            assert_eq!(unit, stable_unit(key));
        }
    }

    #[test]
    fn short_label_truncates_on_char_boundaries() {
        assert_eq!(short_label("c1ccccc1", 20), "c1ccccc1");
        assert_eq!(short_label("αβγδε", 3), "αβ…");
    }
}
