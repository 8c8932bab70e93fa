use std::collections::{HashMap, HashSet};

use eframe::egui::vec2;
use serde::Deserialize;

use super::{
    DatasetError, MoleculeId, PropertyDefinition, PropertyKey, PropertyStore, PropertyTarget,
    PropertyValue, ScaffoldDataset, ScaffoldId, ScaffoldRecord,
};

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawDataset {
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(default)]
    pub(super) properties: Vec<PropertyDefinition>,
    pub(super) scaffolds: Vec<RawScaffold>,
    #[serde(default)]
    pub(super) molecules: Vec<RawMolecule>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawScaffold {
    pub(super) id: ScaffoldId,
    #[serde(default)]
    pub(super) parent: Option<ScaffoldId>,
    #[serde(default)]
    pub(super) synthetic: bool,
    #[serde(default)]
    pub(super) label: String,
    #[serde(default = "default_size")]
    pub(super) size: [f32; 2],
    #[serde(default)]
    pub(super) molecules: Vec<MoleculeId>,
    #[serde(default)]
    pub(super) properties: HashMap<String, PropertyValue>,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct RawMolecule {
    pub(super) id: MoleculeId,
    #[serde(default)]
    pub(super) properties: HashMap<String, PropertyValue>,
}

fn default_size() -> [f32; 2] {
    [80.0, 60.0]
}

pub(super) fn parse_dataset(raw: &str, fallback_name: &str) -> Result<ScaffoldDataset, DatasetError> {
    let parsed: RawDataset = serde_json::from_str(raw)?;
    build_dataset(parsed, fallback_name)
}

pub(super) fn build_dataset(
    raw: RawDataset,
    fallback_name: &str,
) -> Result<ScaffoldDataset, DatasetError> {
    let known_keys = raw
        .properties
        .iter()
        .map(|definition| definition.key.clone())
        .collect::<HashSet<_>>();
    let known_molecules = raw
        .molecules
        .iter()
        .map(|molecule| molecule.id)
        .collect::<HashSet<_>>();

    let mut store = PropertyStore::new(raw.properties);
    let mut records = Vec::with_capacity(raw.scaffolds.len());

    for scaffold in raw.scaffolds {
        for molecule in &scaffold.molecules {
            if !known_molecules.contains(molecule) {
                return Err(DatasetError::Inconsistent(format!(
                    "scaffold {} references unknown molecule {molecule}",
                    scaffold.id
                )));
            }
        }

        for (key, value) in scaffold.properties {
            let key = PropertyKey(key);
            if known_keys.contains(&key) {
                store.insert(&key, PropertyTarget::Scaffold(scaffold.id), value);
            }
        }

        records.push(ScaffoldRecord {
            id: scaffold.id,
            parent: scaffold.parent,
            label: scaffold.label,
            size: vec2(scaffold.size[0], scaffold.size[1]),
            molecules: scaffold.molecules,
            synthetic: scaffold.synthetic,
        });
    }

    for molecule in raw.molecules {
        for (key, value) in molecule.properties {
            let key = PropertyKey(key);
            if known_keys.contains(&key) {
                store.insert(&key, PropertyTarget::Molecule(molecule.id), value);
            }
        }
    }

    let name = raw.name.unwrap_or_else(|| fallback_name.to_owned());
    ScaffoldDataset::new(name, records, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{HierarchyProvider, PropertyLevel};

    const SAMPLE: &str = r#"{
        "name": "sample",
        "properties": [
            {"key": "mw", "title": "Molecular weight", "level": "molecule", "kind": "numeric"},
            {"key": "series", "title": "Series", "level": "scaffold", "kind": "text"}
        ],
        "scaffolds": [
            {"id": 0, "synthetic": true},
            {"id": 1, "parent": 0, "label": "c1ccccc1", "size": [120, 90], "molecules": [10, 11],
             "properties": {"series": "A"}},
            {"id": 2, "parent": 0, "molecules": [12]}
        ],
        "molecules": [
            {"id": 10, "properties": {"mw": 180.2}},
            {"id": 11, "properties": {"mw": 210}},
            {"id": 12, "properties": {"mw": "95.5", "ignored": 3}}
        ]
    }"#;

    #[test]
    fn parses_hierarchy_and_properties() {
        let dataset = parse_dataset(SAMPLE, "fallback").expect("valid dataset");
        assert_eq!(dataset.name, "sample");
        assert_eq!(dataset.scaffold_count(), 3);
        assert_eq!(dataset.molecule_count(), 3);
        assert!(dataset.is_synthetic_root(ScaffoldId(0)));
        assert_eq!(dataset.label(ScaffoldId(1)), "c1ccccc1");
        assert_eq!(dataset.intrinsic_size(ScaffoldId(1)), vec2(120.0, 90.0));

        let definition = dataset
            .properties()
            .definition(&PropertyKey::new("series"))
            .expect("series defined");
        assert_eq!(definition.level, PropertyLevel::Scaffold);

        let peeked = dataset
            .properties()
            .peek(&PropertyKey::new("mw"), PropertyTarget::Molecule(MoleculeId(12)));
        assert_eq!(peeked, Some(&PropertyValue::Text("95.5".to_owned())));
    }

    #[test]
    fn rejects_unknown_molecule_reference() {
        let raw = r#"{"scaffolds": [{"id": 0, "molecules": [5]}]}"#;
        let result = parse_dataset(raw, "broken");
        assert!(matches!(result, Err(DatasetError::Inconsistent(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = parse_dataset("{\"scaffolds\": 4}", "broken");
        assert!(matches!(result, Err(DatasetError::Parse(_))));
    }
}
