use eframe::egui::vec2;

use super::{
    MoleculeId, PropertyDefinition, PropertyKey, PropertyKind, PropertyLevel, PropertyStore,
    PropertyTarget, PropertyValue, ScaffoldDataset, ScaffoldId, ScaffoldRecord,
};

#[derive(Default)]
pub struct DatasetBuilder {
    records: Vec<ScaffoldRecord>,
    definitions: Vec<PropertyDefinition>,
    values: Vec<(PropertyKey, PropertyTarget, PropertyValue)>,
    unavailable: Vec<PropertyKey>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scaffold(mut self, id: u32, parent: Option<u32>) -> Self {
        self.records.push(ScaffoldRecord {
            id: ScaffoldId(id),
            parent: parent.map(ScaffoldId),
            label: format!("scaffold-{id}"),
            size: vec2(40.0, 30.0),
            molecules: Vec::new(),
            synthetic: false,
        });
        self
    }

    pub fn synthetic(mut self, id: u32) -> Self {
        if let Some(record) = self.record_mut(id) {
            record.synthetic = true;
        }
        self
    }

    pub fn sized(mut self, id: u32, width: f32, height: f32) -> Self {
        if let Some(record) = self.record_mut(id) {
            record.size = vec2(width, height);
        }
        self
    }

    pub fn molecules(mut self, id: u32, molecules: &[u32]) -> Self {
        if let Some(record) = self.record_mut(id) {
            record.molecules = molecules.iter().copied().map(MoleculeId).collect();
        }
        self
    }

    pub fn property(mut self, key: &str, level: PropertyLevel, kind: PropertyKind) -> Self {
        self.definitions.push(PropertyDefinition {
            key: PropertyKey::new(key),
            title: key.to_owned(),
            level,
            kind,
        });
        self
    }

    pub fn scaffold_value(mut self, key: &str, scaffold: u32, value: f64) -> Self {
        self.values.push((
            PropertyKey::new(key),
            PropertyTarget::Scaffold(ScaffoldId(scaffold)),
            PropertyValue::Number(value),
        ));
        self
    }

    pub fn scaffold_text(mut self, key: &str, scaffold: u32, value: &str) -> Self {
        self.values.push((
            PropertyKey::new(key),
            PropertyTarget::Scaffold(ScaffoldId(scaffold)),
            PropertyValue::Text(value.to_owned()),
        ));
        self
    }

    pub fn molecule_value(mut self, key: &str, molecule: u32, value: f64) -> Self {
        self.values.push((
            PropertyKey::new(key),
            PropertyTarget::Molecule(MoleculeId(molecule)),
            PropertyValue::Number(value),
        ));
        self
    }

    pub fn unavailable(mut self, key: &str) -> Self {
        self.unavailable.push(PropertyKey::new(key));
        self
    }

    pub fn build(self) -> ScaffoldDataset {
        let mut store = PropertyStore::new(self.definitions);
        for (key, target, value) in self.values {
            store.insert(&key, target, value);
        }
        for key in &self.unavailable {
            store.mark_unavailable(key);
        }
        ScaffoldDataset::new("test", self.records, store).expect("test dataset is consistent")
    }

    fn record_mut(&mut self, id: u32) -> Option<&mut ScaffoldRecord> {
        self.records
            .iter_mut()
            .find(|record| record.id == ScaffoldId(id))
    }
}

/// Root 1 with children 2 and 3; 2 has children 4, 5 and 6; 3 has child 7.
pub fn sample_dataset() -> ScaffoldDataset {
    DatasetBuilder::new()
        .scaffold(1, None)
        .scaffold(2, Some(1))
        .scaffold(3, Some(1))
        .scaffold(4, Some(2))
        .scaffold(5, Some(2))
        .scaffold(6, Some(2))
        .scaffold(7, Some(3))
        .build()
}
