use eframe::egui::{self, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::animation::CameraRequest;
use crate::dataset::{
    HierarchyProvider, PropertyDefinition, PropertyKey, PropertyLevel, ScaffoldDataset, ScaffoldId,
    format_number,
};
use crate::layout::{LayoutKind, MAX_RADIUS_FACTOR, MIN_RADIUS_FACTOR};
use crate::sorting::{
    Accumulation, MappingRequest, PropertyRequest, SortDirection, SortRequest, VisualChannel,
};
use crate::util::short_label;

use super::super::ViewModel;

const SEARCH_RESULTS: usize = 10;
const RADIUS_STEP: f32 = 0.1;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Scaffolds whose label or id matches `query`, best first. An exact id
/// (`42` or `S42`) always ranks first.
fn search_scaffolds(dataset: &ScaffoldDataset, query: &str, limit: usize) -> Vec<ScaffoldId> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let exact = query
        .trim_start_matches(['S', 's'])
        .parse::<u32>()
        .ok()
        .map(ScaffoldId)
        .filter(|scaffold| dataset.contains(*scaffold));

    let matcher = SkimMatcherV2::default();
    let mut scored = dataset
        .scaffold_ids()
        .filter(|scaffold| Some(*scaffold) != exact)
        .filter_map(|scaffold| {
            fuzzy_match_score(&matcher, dataset.label(scaffold), query)
                .map(|score| (score, scaffold))
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    exact
        .into_iter()
        .chain(scored.into_iter().map(|(_, scaffold)| scaffold))
        .take(limit)
        .collect()
}

fn property_combo(
    ui: &mut Ui,
    id: &str,
    definitions: &[PropertyDefinition],
    selected: &mut Option<PropertyKey>,
) {
    let current = selected
        .as_ref()
        .and_then(|key| definitions.iter().find(|definition| &definition.key == key))
        .map_or("(choose property)", |definition| definition.title.as_str());
    egui::ComboBox::from_id_salt(id)
        .selected_text(current)
        .show_ui(ui, |ui| {
            for definition in definitions {
                let level = match definition.level {
                    PropertyLevel::Scaffold => "scaffold",
                    PropertyLevel::Molecule => "molecule",
                };
                ui.selectable_value(
                    selected,
                    Some(definition.key.clone()),
                    format!("{} ({level})", definition.title),
                );
            }
        });
}

fn accumulation_combo(ui: &mut Ui, id: &str, accumulation: &mut Accumulation) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(accumulation.label())
        .show_ui(ui, |ui| {
            for option in Accumulation::ALL {
                ui.selectable_value(accumulation, option, option.label());
            }
        });
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Tree Controls");
        ui.separator();

        self.draw_layout_controls(ui);
        ui.separator();
        self.draw_tree_controls(ui);
        ui.separator();
        self.draw_search(ui);
        ui.separator();
        self.draw_sort_controls(ui);
        ui.separator();
        self.draw_mapping_controls(ui);

        if let Some(status) = &self.status {
            ui.separator();
            ui.colored_label(egui::Color32::from_rgb(232, 120, 96), status.as_str());
        }
    }

    fn draw_layout_controls(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Layout").strong());
        let mut kind = self.layout.kind();
        ui.horizontal_wrapped(|ui| {
            for option in LayoutKind::ALL {
                ui.selectable_value(&mut kind, option, option.label());
            }
        });
        if kind != self.layout.kind() {
            self.set_layout(kind);
        }

        ui.horizontal(|ui| {
            let current = self.layout.radius_factor();
            let mut factor = current;
            let slider = egui::Slider::new(&mut factor, MIN_RADIUS_FACTOR..=MAX_RADIUS_FACTOR)
                .step_by(f64::from(RADIUS_STEP))
                .text("radius factor");
            if ui.add(slider).changed() {
                self.adjust_radii(factor - current);
            }
            if ui.small_button("reset").clicked() {
                self.reset_radii();
            }
        });

        if ui
            .checkbox(&mut self.fixed_radius, "Fixed radius")
            .on_hover_text("When off, radial-width rings grow as you zoom out.")
            .changed()
        {
            self.tree.invalidate_layout();
        }
        ui.checkbox(&mut self.show_guides, "Show guides");

        let mut details = self.details.enabled();
        if ui
            .checkbox(&mut details, "Molecule details")
            .on_hover_text("Attach a paged molecule grid to scaffolds at close zoom.")
            .changed()
        {
            self.details.set_enabled(details);
        }

        let mut animate = self.animator.enabled();
        if ui.checkbox(&mut animate, "Animate layout changes").changed() {
            self.animator.set_enabled(animate);
        }
        ui.checkbox(&mut self.show_fps_bar, "Show FPS");

        ui.horizontal(|ui| {
            if ui.button("Zoom to overview").clicked() {
                self.request_camera(CameraRequest::Overview);
            }
            if ui
                .add_enabled(!self.selection.is_empty(), egui::Button::new("Zoom to selection"))
                .clicked()
            {
                self.request_camera(CameraRequest::Selection);
            }
        });
        if self.camera.user_zoomed() {
            ui.small("Auto-fit paused after manual zoom.");
        }
    }

    fn draw_tree_controls(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Tree").strong());
        ui.horizontal_wrapped(|ui| {
            let cursor = self.cursor;
            if ui
                .add_enabled(cursor.is_some(), egui::Button::new("Expand subtree"))
                .clicked()
                && let Some(node) = cursor
            {
                self.expand_subtree(node);
            }
            if ui.button("Reduce to root").clicked() {
                self.reduce_to_root();
            }
            if ui.button("Show parent").clicked() {
                self.expand_root_upward();
            }
            if ui
                .add_enabled(!self.selection.is_empty(), egui::Button::new("Clear selection"))
                .clicked()
            {
                self.clear_selection();
            }
        });
        ui.small("Double-click toggles a node. Arrows move the cursor, +/- expand or reduce, Home fits the view.");
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Find scaffold").strong())
            .on_hover_text("Fuzzy search by label, or type a scaffold id.");
        ui.text_edit_singleline(&mut self.search);
        ui.checkbox(&mut self.install_expands_ancestors, "Expand ancestors");

        let matches = search_scaffolds(&self.dataset, &self.search, SEARCH_RESULTS);
        let mut chosen = None;
        for scaffold in matches {
            let shown = if self.tree.node_for(scaffold).is_some() {
                ""
            } else {
                "  (hidden)"
            };
            let text = format!(
                "{scaffold}  {}{shown}",
                short_label(self.dataset.label(scaffold), 36)
            );
            if ui.link(text).clicked() {
                chosen = Some(scaffold);
            }
        }
        if let Some(scaffold) = chosen {
            self.install_scaffold(scaffold);
        }
    }

    fn draw_sort_controls(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Sort").strong());
        let definitions = self.dataset.properties().definitions().to_vec();
        property_combo(ui, "sort_property", &definitions, &mut self.sort_form.key);
        ui.horizontal(|ui| {
            accumulation_combo(ui, "sort_accumulation", &mut self.sort_form.accumulation);
            ui.checkbox(&mut self.sort_form.cumulative, "cumulative");
        });
        ui.horizontal(|ui| {
            ui.selectable_value(
                &mut self.sort_form.direction,
                SortDirection::Ascending,
                "ascending",
            );
            ui.selectable_value(
                &mut self.sort_form.direction,
                SortDirection::Descending,
                "descending",
            );
        });
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.sort_form.color_segments, "color segments");
            ui.add_enabled(
                self.sort_form.color_segments,
                egui::Checkbox::new(&mut self.sort_form.captions, "captions"),
            );
        });

        ui.horizontal(|ui| {
            let ready = self.sort_form.key.is_some();
            if ui.add_enabled(ready, egui::Button::new("Sort")).clicked()
                && let Some(key) = self.sort_form.key.clone()
            {
                let request = SortRequest {
                    property: PropertyRequest {
                        key,
                        accumulation: self.sort_form.accumulation,
                        cumulative: self.sort_form.cumulative,
                    },
                    direction: self.sort_form.direction,
                    color_segments: self.sort_form.color_segments,
                    captions: self.sort_form.captions,
                };
                if self.engine.request_sort(request).is_none() {
                    self.status = Some("The background worker is gone.".to_owned());
                }
            }
            let sorted = self.engine.state().active.is_some();
            if ui
                .add_enabled(sorted, egui::Button::new("Clear sort"))
                .clicked()
            {
                self.engine.clear_sort(&mut self.tree);
            }
        });

        let state = self.engine.state();
        if let Some(active) = &state.active {
            ui.small(format!(
                "sorted by {} ({}, {:?})",
                active.property.key,
                active.property.accumulation.label(),
                active.direction
            ));
        }
        if let Some(error) = &state.last_error {
            ui.colored_label(egui::Color32::from_rgb(232, 120, 96), error.as_str());
        }
        for sample in &state.legend {
            ui.horizontal(|ui| {
                let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                ui.painter().rect_filled(rect, 2.0, sample.color);
                ui.label(sample.caption.as_str());
            });
        }
    }

    fn draw_mapping_controls(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Visual mapping").strong());
        egui::ComboBox::from_id_salt("mapping_channel")
            .selected_text(self.mapping_form.channel.label())
            .show_ui(ui, |ui| {
                for channel in VisualChannel::ALL {
                    ui.selectable_value(&mut self.mapping_form.channel, channel, channel.label());
                }
            });
        let definitions = self.dataset.properties().definitions().to_vec();
        property_combo(ui, "mapping_property", &definitions, &mut self.mapping_form.key);
        ui.horizontal(|ui| {
            accumulation_combo(ui, "mapping_accumulation", &mut self.mapping_form.accumulation);
            ui.checkbox(&mut self.mapping_form.cumulative, "cumulative");
        });

        let ready = self.mapping_form.key.is_some();
        let apply_text = if self.engine.mappings().is_active(self.mapping_form.channel) {
            "Replace mapping"
        } else {
            "Apply mapping"
        };
        if ui.add_enabled(ready, egui::Button::new(apply_text)).clicked()
            && let Some(key) = self.mapping_form.key.clone()
        {
            let request = MappingRequest {
                channel: self.mapping_form.channel,
                property: PropertyRequest {
                    key,
                    accumulation: self.mapping_form.accumulation,
                    cumulative: self.mapping_form.cumulative,
                },
            };
            if self.engine.request_mapping(request).is_none() {
                self.status = Some("The background worker is gone.".to_owned());
            }
        }

        let mut disable = None;
        for channel in VisualChannel::ALL {
            let Some(mapping) = self.engine.mappings().get(channel) else {
                continue;
            };
            let range = mapping
                .range()
                .map(|(min, max)| format!(" [{} – {}]", format_number(min), format_number(max)))
                .unwrap_or_default();
            ui.horizontal(|ui| {
                ui.label(format!(
                    "{}: {}{range}",
                    channel.label(),
                    mapping.request.property.key
                ));
                if ui.small_button("off").clicked() {
                    disable = Some(channel);
                }
            });
        }
        if let Some(channel) = disable {
            self.engine.disable_mapping(channel);
            if channel == VisualChannel::NodeSize {
                self.tree.invalidate_layout();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::DatasetBuilder;

    #[test]
    fn exact_ids_rank_before_fuzzy_matches() {
        let data = DatasetBuilder::new()
            .scaffold(1, None)
            .scaffold(2, Some(1))
            .scaffold(12, Some(1))
            .build();
        let results = search_scaffolds(&data, "S12", 5);
        assert_eq!(results.first(), Some(&ScaffoldId(12)));
        assert!(search_scaffolds(&data, "   ", 5).is_empty());
    }

    #[test]
    fn results_are_limited() {
        let mut builder = DatasetBuilder::new().scaffold(1, None);
        for id in 2..40 {
            builder = builder.scaffold(id, Some(1));
        }
        let data = builder.build();
        let results = search_scaffolds(&data, "scaffold", 7);
        assert_eq!(results.len(), 7);
    }
}
