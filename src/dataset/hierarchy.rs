use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use super::{
    DatasetError, HierarchyProvider, MoleculeId, PropertyDefinition, PropertyKey,
    PropertyProvider, PropertyStore, PropertyTarget, ScaffoldId,
};

const MIN_INTRINSIC_EXTENT: f32 = 8.0;

#[derive(Clone, Debug)]
pub struct ScaffoldRecord {
    pub id: ScaffoldId,
    pub parent: Option<ScaffoldId>,
    pub label: String,
    pub size: Vec2,
    pub molecules: Vec<MoleculeId>,
    pub synthetic: bool,
}

#[derive(Debug)]
struct ScaffoldEntry {
    record: ScaffoldRecord,
    children: Vec<ScaffoldId>,
}

#[derive(Debug)]
pub struct ScaffoldDataset {
    pub name: String,
    root: Option<ScaffoldId>,
    scaffolds: HashMap<ScaffoldId, ScaffoldEntry>,
    molecule_count: usize,
    properties: PropertyStore,
}

impl ScaffoldDataset {
    pub fn new(
        name: impl Into<String>,
        records: Vec<ScaffoldRecord>,
        properties: PropertyStore,
    ) -> Result<Self, DatasetError> {
        let mut order = Vec::with_capacity(records.len());
        let mut scaffolds = HashMap::with_capacity(records.len());
        for mut record in records {
            record.size = vec2(
                record.size.x.max(MIN_INTRINSIC_EXTENT),
                record.size.y.max(MIN_INTRINSIC_EXTENT),
            );
            let id = record.id;
            order.push(id);
            let previous = scaffolds.insert(
                id,
                ScaffoldEntry {
                    record,
                    children: Vec::new(),
                },
            );
            if previous.is_some() {
                return Err(DatasetError::Inconsistent(format!(
                    "scaffold {id} is defined twice"
                )));
            }
        }

        let mut root = None;
        for id in &order {
            let parent = scaffolds.get(id).and_then(|entry| entry.record.parent);
            match parent {
                None => {
                    if let Some(existing) = root {
                        return Err(DatasetError::Inconsistent(format!(
                            "multiple hierarchy roots: {existing} and {id}"
                        )));
                    }
                    root = Some(*id);
                }
                Some(parent) => {
                    let Some(parent_entry) = scaffolds.get_mut(&parent) else {
                        return Err(DatasetError::Inconsistent(format!(
                            "scaffold {id} references missing parent {parent}"
                        )));
                    };
                    parent_entry.children.push(*id);
                }
            }
        }

        if root.is_none() && !scaffolds.is_empty() {
            return Err(DatasetError::Inconsistent(
                "hierarchy has no root scaffold".to_owned(),
            ));
        }

        let bound = scaffolds.len();
        for id in &order {
            let mut cursor = *id;
            let mut steps = 0usize;
            while let Some(parent) = scaffolds.get(&cursor).and_then(|entry| entry.record.parent) {
                steps += 1;
                if steps > bound {
                    return Err(DatasetError::Inconsistent(format!(
                        "scaffold {id} is part of a parent cycle"
                    )));
                }
                cursor = parent;
            }
        }

        let molecule_count = scaffolds
            .values()
            .map(|entry| entry.record.molecules.len())
            .sum();

        Ok(Self {
            name: name.into(),
            root,
            scaffolds,
            molecule_count,
            properties,
        })
    }

    pub fn scaffold_count(&self) -> usize {
        self.scaffolds.len()
    }

    pub fn molecule_count(&self) -> usize {
        self.molecule_count
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn depth(&self, scaffold: ScaffoldId) -> usize {
        let mut depth = 0;
        let mut cursor = scaffold;
        while let Some(parent) = self.parent(cursor) {
            depth += 1;
            cursor = parent;
        }
        depth
    }

    pub fn scaffold_ids(&self) -> impl Iterator<Item = ScaffoldId> + '_ {
        self.scaffolds.keys().copied()
    }
}

impl HierarchyProvider for ScaffoldDataset {
    fn root(&self) -> Option<ScaffoldId> {
        self.root
    }

    fn contains(&self, scaffold: ScaffoldId) -> bool {
        self.scaffolds.contains_key(&scaffold)
    }

    fn children(&self, scaffold: ScaffoldId) -> &[ScaffoldId] {
        self.scaffolds
            .get(&scaffold)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    fn parent(&self, scaffold: ScaffoldId) -> Option<ScaffoldId> {
        self.scaffolds
            .get(&scaffold)
            .and_then(|entry| entry.record.parent)
    }

    fn molecules(&self, scaffold: ScaffoldId) -> &[MoleculeId] {
        self.scaffolds
            .get(&scaffold)
            .map(|entry| entry.record.molecules.as_slice())
            .unwrap_or(&[])
    }

    fn is_synthetic_root(&self, scaffold: ScaffoldId) -> bool {
        self.scaffolds
            .get(&scaffold)
            .is_some_and(|entry| entry.record.synthetic && entry.record.parent.is_none())
    }

    fn intrinsic_size(&self, scaffold: ScaffoldId) -> Vec2 {
        self.scaffolds
            .get(&scaffold)
            .map(|entry| entry.record.size)
            .unwrap_or(Vec2::splat(MIN_INTRINSIC_EXTENT))
    }

    fn label(&self, scaffold: ScaffoldId) -> &str {
        self.scaffolds
            .get(&scaffold)
            .map(|entry| entry.record.label.as_str())
            .unwrap_or("")
    }
}

impl PropertyProvider for ScaffoldDataset {
    fn definitions(&self) -> &[PropertyDefinition] {
        self.properties.definitions()
    }

    fn definition(&self, key: &PropertyKey) -> Option<&PropertyDefinition> {
        self.properties.definition(key)
    }

    fn lock_and_load(
        &self,
        keys: &[PropertyKey],
        targets: &[PropertyTarget],
    ) -> Result<(), DatasetError> {
        self.properties.lock_and_load(keys, targets)
    }

    fn unlock_and_unload(&self, keys: &[PropertyKey], targets: &[PropertyTarget]) {
        self.properties.unlock_and_unload(keys, targets);
    }

    fn numeric_value(&self, key: &PropertyKey, target: PropertyTarget) -> Option<f64> {
        self.properties.numeric_value(key, target)
    }

    fn string_value(&self, key: &PropertyKey, target: PropertyTarget) -> Option<String> {
        self.properties.string_value(key, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::DatasetBuilder;

    fn record(id: u32, parent: Option<u32>) -> ScaffoldRecord {
        ScaffoldRecord {
            id: ScaffoldId(id),
            parent: parent.map(ScaffoldId),
            label: format!("s{id}"),
            size: vec2(40.0, 30.0),
            molecules: Vec::new(),
            synthetic: false,
        }
    }

    #[test]
    fn children_follow_record_order() {
        let dataset = DatasetBuilder::new()
            .scaffold(1, None)
            .scaffold(3, Some(1))
            .scaffold(2, Some(1))
            .build();
        assert_eq!(dataset.children(ScaffoldId(1)), &[ScaffoldId(3), ScaffoldId(2)]);
        assert_eq!(dataset.parent(ScaffoldId(2)), Some(ScaffoldId(1)));
        assert_eq!(dataset.root(), Some(ScaffoldId(1)));
    }

    #[test]
    fn rejects_multiple_roots() {
        let result = ScaffoldDataset::new(
            "bad",
            vec![record(1, None), record(2, None)],
            PropertyStore::default(),
        );
        assert!(matches!(result, Err(DatasetError::Inconsistent(_))));
    }

    #[test]
    fn rejects_parent_cycles() {
        let result = ScaffoldDataset::new(
            "cycle",
            vec![record(1, None), record(2, Some(3)), record(3, Some(2))],
            PropertyStore::default(),
        );
        assert!(matches!(result, Err(DatasetError::Inconsistent(_))));
    }

    #[test]
    fn rejects_dangling_parent() {
        let result = ScaffoldDataset::new(
            "dangling",
            vec![record(1, None), record(2, Some(9))],
            PropertyStore::default(),
        );
        assert!(matches!(result, Err(DatasetError::Inconsistent(_))));
    }

    #[test]
    fn intrinsic_size_is_floored() {
        let mut tiny = record(1, None);
        tiny.size = Vec2::ZERO;
        let dataset =
            ScaffoldDataset::new("tiny", vec![tiny], PropertyStore::default()).expect("valid");
        let size = dataset.intrinsic_size(ScaffoldId(1));
        assert!(size.x > 0.0 && size.y > 0.0);
    }

    #[test]
    fn subtree_is_preorder() {
        let dataset = DatasetBuilder::new()
            .scaffold(1, None)
            .scaffold(2, Some(1))
            .scaffold(4, Some(2))
            .scaffold(3, Some(1))
            .build();
        assert_eq!(
            dataset.subtree(ScaffoldId(1)),
            vec![ScaffoldId(1), ScaffoldId(2), ScaffoldId(4), ScaffoldId(3)]
        );
        assert_eq!(dataset.depth(ScaffoldId(4)), 2);
    }
}
