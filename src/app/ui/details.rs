use eframe::egui::{self, RichText, Ui};

use crate::dataset::{
    HierarchyProvider, PropertyLevel, PropertyTarget, PropertyValue, format_number,
};
use crate::sorting::VisualChannel;

use super::super::ViewModel;

const SCALE_STEP: f32 = 1.25;

fn format_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Number(number) => format_number(*number),
        PropertyValue::Text(text) => text.clone(),
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Scaffold Details");
        ui.add_space(6.0);

        let Some(node) = self.cursor else {
            ui.label("Click a scaffold in the tree.");
            return;
        };
        let Some(scaffold) = self.tree.scaffold_of(node) else {
            ui.label("The selected scaffold is no longer shown.");
            return;
        };

        let dataset = std::sync::Arc::clone(&self.dataset);
        let molecules = dataset.molecules(scaffold);

        ui.label(RichText::new(dataset.label(scaffold)).strong());
        ui.small(format!("{scaffold}"));
        ui.add_space(6.0);
        ui.label(format!("Depth: {}", self.tree.depth(node)));
        ui.label(format!("Molecules: {}", molecules.len()));
        ui.label(format!(
            "Children shown: {} of {}",
            self.tree.children(node).len(),
            dataset.children(scaffold).len()
        ));
        ui.label(format!("Selection: {:?}", self.tree.selection_state(node)));
        let scale = self.tree.node(node).map_or(1.0, |visual| visual.scale());
        ui.horizontal(|ui| {
            ui.label(format!("Scale: {scale:.2}"));
            if ui.small_button("−").clicked() {
                self.tree.set_scale(node, scale / SCALE_STEP);
            }
            if ui.small_button("+").clicked() {
                self.tree.set_scale(node, scale * SCALE_STEP);
            }
        });
        if dataset.is_synthetic_root(scaffold) {
            ui.label("Synthetic root");
        }
        if !dataset.has_children(scaffold) {
            ui.label("Leaf scaffold");
        }

        ui.horizontal(|ui| {
            let expandable = self.tree.is_expandable(&*dataset, node);
            let reducible = self.tree.is_reducible(node);
            if ui
                .add_enabled(expandable || reducible, egui::Button::new(if expandable {
                    "Expand"
                } else {
                    "Reduce"
                }))
                .clicked()
            {
                self.toggle_node(node);
            }
            if ui.button("Select molecules").clicked() {
                self.select_node(node, false);
            }
        });

        ui.separator();
        ui.label(RichText::new("Properties").strong());
        let store = dataset.properties();
        let mut any = false;
        for definition in store.definitions() {
            if definition.level != PropertyLevel::Scaffold {
                continue;
            }
            if let Some(value) = store.peek(&definition.key, PropertyTarget::Scaffold(scaffold)) {
                ui.label(format!("{}: {}", definition.title, format_value(value)));
                any = true;
            }
        }
        if !any {
            ui.label("No scaffold properties.");
        }

        let mappings = self.engine.mappings();
        for channel in VisualChannel::ALL {
            if let Some(mapping) = mappings.get(channel) {
                let value = mapping
                    .value(scaffold)
                    .map_or_else(|| "n/a".to_owned(), ToString::to_string);
                ui.label(format!("{} ({}): {value}", channel.label(), mapping.request.property.key));
            }
        }

        ui.separator();
        ui.label(RichText::new("Molecules").strong());
        let Some(view) = self.details.get_mut(node) else {
            if molecules.is_empty() {
                ui.label("No molecules.");
            } else {
                ui.label("Zoom in with details enabled to page through molecules.");
            }
            return;
        };

        ui.horizontal(|ui| {
            if ui.small_button("◀").clicked() {
                view.previous_page();
            }
            ui.label(format!("page {} / {}", view.page() + 1, view.page_count()));
            if ui.small_button("▶").clicked() {
                view.next_page();
            }
        });
        for molecule in view.visible() {
            let selected = self.selection.contains(*molecule);
            let mut line = format!("{molecule}");
            for definition in store.definitions() {
                if definition.level == PropertyLevel::Molecule
                    && let Some(value) = store.peek(&definition.key, PropertyTarget::Molecule(*molecule))
                {
                    line.push_str(&format!("  {}={}", definition.key, format_value(value)));
                }
            }
            if selected {
                ui.label(RichText::new(line).strong());
            } else {
                ui.label(line);
            }
        }
    }
}
