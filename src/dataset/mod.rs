use std::fmt;

use eframe::egui::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod demo;
mod hierarchy;
mod load;
mod parse;
mod properties;
#[cfg(test)]
pub mod test_support;

pub use demo::generate_demo_dataset;
pub use hierarchy::{ScaffoldDataset, ScaffoldRecord};
pub use load::load_dataset;
pub use properties::{PropertyStore, format_number};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaffoldId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoleculeId(pub u32);

impl fmt::Display for ScaffoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl fmt::Display for MoleculeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyKey(pub String);

impl PropertyKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyTarget {
    Scaffold(ScaffoldId),
    Molecule(MoleculeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyLevel {
    Scaffold,
    Molecule,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Numeric,
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub key: PropertyKey,
    pub title: String,
    pub level: PropertyLevel,
    pub kind: PropertyKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("unknown property `{0}`")]
    UnknownProperty(PropertyKey),
    #[error("failed to load property `{key}`: {reason}")]
    LoadFailed { key: PropertyKey, reason: String },
    #[error("invalid dataset JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("inconsistent dataset: {0}")]
    Inconsistent(String),
}

/// Read access to the scaffold hierarchy owned by the data layer.
pub trait HierarchyProvider {
    fn root(&self) -> Option<ScaffoldId>;
    fn contains(&self, scaffold: ScaffoldId) -> bool;
    fn children(&self, scaffold: ScaffoldId) -> &[ScaffoldId];
    fn parent(&self, scaffold: ScaffoldId) -> Option<ScaffoldId>;
    fn molecules(&self, scaffold: ScaffoldId) -> &[MoleculeId];
    fn is_synthetic_root(&self, scaffold: ScaffoldId) -> bool;
    fn intrinsic_size(&self, scaffold: ScaffoldId) -> Vec2;
    fn label(&self, scaffold: ScaffoldId) -> &str;

    fn has_children(&self, scaffold: ScaffoldId) -> bool {
        !self.children(scaffold).is_empty()
    }

    /// All scaffolds of the subtree rooted at `scaffold`, in pre-order.
    fn subtree(&self, scaffold: ScaffoldId) -> Vec<ScaffoldId> {
        let mut out = Vec::new();
        if !self.contains(scaffold) {
            return out;
        }
        let mut stack = vec![scaffold];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }
}

/// Reference-counted property access. Values are only visible between a
/// `lock_and_load` and the matching `unlock_and_unload`.
pub trait PropertyProvider {
    fn definitions(&self) -> &[PropertyDefinition];
    fn definition(&self, key: &PropertyKey) -> Option<&PropertyDefinition>;
    fn lock_and_load(
        &self,
        keys: &[PropertyKey],
        targets: &[PropertyTarget],
    ) -> Result<(), DatasetError>;
    fn unlock_and_unload(&self, keys: &[PropertyKey], targets: &[PropertyTarget]);
    fn numeric_value(&self, key: &PropertyKey, target: PropertyTarget) -> Option<f64>;
    fn string_value(&self, key: &PropertyKey, target: PropertyTarget) -> Option<String>;
}
