use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use super::{DatasetError, PropertyDefinition, PropertyKey, PropertyTarget, PropertyValue};

type LoadKey = (PropertyKey, PropertyTarget);

#[derive(Debug, Default)]
pub struct PropertyStore {
    definitions: Vec<PropertyDefinition>,
    values: HashMap<PropertyKey, HashMap<PropertyTarget, PropertyValue>>,
    unavailable: HashSet<PropertyKey>,
    locks: Mutex<HashMap<LoadKey, usize>>,
}

impl PropertyStore {
    pub fn new(definitions: Vec<PropertyDefinition>) -> Self {
        Self {
            definitions,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, key: &PropertyKey, target: PropertyTarget, value: PropertyValue) {
        self.values
            .entry(key.clone())
            .or_default()
            .insert(target, value);
    }

    /// Marks a property as backed by a source that fails on every load.
    pub fn mark_unavailable(&mut self, key: &PropertyKey) {
        self.unavailable.insert(key.clone());
    }

    pub fn definitions(&self) -> &[PropertyDefinition] {
        &self.definitions
    }

    pub fn definition(&self, key: &PropertyKey) -> Option<&PropertyDefinition> {
        self.definitions.iter().find(|definition| &definition.key == key)
    }

    pub fn lock_and_load(
        &self,
        keys: &[PropertyKey],
        targets: &[PropertyTarget],
    ) -> Result<(), DatasetError> {
        for key in keys {
            if self.definition(key).is_none() {
                return Err(DatasetError::UnknownProperty(key.clone()));
            }
            if self.unavailable.contains(key) {
                return Err(DatasetError::LoadFailed {
                    key: key.clone(),
                    reason: "property source is unavailable".to_owned(),
                });
            }
        }

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            for target in targets {
                *locks.entry((key.clone(), *target)).or_insert(0) += 1;
            }
        }
        Ok(())
    }

    pub fn unlock_and_unload(&self, keys: &[PropertyKey], targets: &[PropertyTarget]) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            for target in targets {
                let load_key = (key.clone(), *target);
                if let Some(count) = locks.get_mut(&load_key) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        locks.remove(&load_key);
                    }
                }
            }
        }
    }

    pub fn is_loaded(&self, key: &PropertyKey, target: PropertyTarget) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.contains_key(&(key.clone(), target))
    }

    pub fn loaded_count(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn loaded_value(&self, key: &PropertyKey, target: PropertyTarget) -> Option<&PropertyValue> {
        if !self.is_loaded(key, target) {
            return None;
        }
        self.values.get(key).and_then(|values| values.get(&target))
    }

    pub fn numeric_value(&self, key: &PropertyKey, target: PropertyTarget) -> Option<f64> {
        match self.loaded_value(key, target)? {
            PropertyValue::Number(value) if value.is_finite() => Some(*value),
            PropertyValue::Number(_) => None,
            PropertyValue::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }

    pub fn string_value(&self, key: &PropertyKey, target: PropertyTarget) -> Option<String> {
        match self.loaded_value(key, target)? {
            PropertyValue::Number(value) => Some(format_number(*value)),
            PropertyValue::Text(text) => Some(text.clone()),
        }
    }

    /// Unlocked peek used by the details panel, which shows raw values
    /// without pinning them in memory.
    pub fn peek(&self, key: &PropertyKey, target: PropertyTarget) -> Option<&PropertyValue> {
        self.values.get(key).and_then(|values| values.get(&target))
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract().abs() < 1e-9 && value.abs() < 1e12 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MoleculeId, PropertyKind, PropertyLevel};

    fn store() -> (PropertyStore, PropertyKey) {
        let key = PropertyKey::new("mw");
        let mut store = PropertyStore::new(vec![PropertyDefinition {
            key: key.clone(),
            title: "Molecular weight".to_owned(),
            level: PropertyLevel::Molecule,
            kind: PropertyKind::Numeric,
        }]);
        store.insert(
            &key,
            PropertyTarget::Molecule(MoleculeId(1)),
            PropertyValue::Number(180.0),
        );
        (store, key)
    }

    #[test]
    fn values_are_hidden_until_loaded() {
        let (store, key) = store();
        let target = PropertyTarget::Molecule(MoleculeId(1));
        assert_eq!(store.numeric_value(&key, target), None);

        store
            .lock_and_load(std::slice::from_ref(&key), &[target])
            .expect("load");
        assert_eq!(store.numeric_value(&key, target), Some(180.0));

        store.unlock_and_unload(std::slice::from_ref(&key), &[target]);
        assert_eq!(store.numeric_value(&key, target), None);
    }

    #[test]
    fn nested_locks_are_reference_counted() {
        let (store, key) = store();
        let target = PropertyTarget::Molecule(MoleculeId(1));
        let keys = std::slice::from_ref(&key);

        store.lock_and_load(keys, &[target]).expect("first");
        store.lock_and_load(keys, &[target]).expect("second");
        store.unlock_and_unload(keys, &[target]);
        assert!(store.is_loaded(&key, target));

        store.unlock_and_unload(keys, &[target]);
        assert!(!store.is_loaded(&key, target));

        store.unlock_and_unload(keys, &[target]);
        assert_eq!(store.loaded_count(), 0);
    }

    #[test]
    fn failed_load_leaves_nothing_locked() {
        let (mut store, key) = store();
        store.mark_unavailable(&key);
        let target = PropertyTarget::Molecule(MoleculeId(1));
        let result = store.lock_and_load(std::slice::from_ref(&key), &[target]);
        assert!(matches!(result, Err(DatasetError::LoadFailed { .. })));
        assert_eq!(store.loaded_count(), 0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let (store, _) = store();
        let result = store.lock_and_load(
            &[PropertyKey::new("missing")],
            &[PropertyTarget::Molecule(MoleculeId(1))],
        );
        assert!(matches!(result, Err(DatasetError::UnknownProperty(_))));
    }
}
