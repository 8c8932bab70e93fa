use std::collections::VecDeque;

use eframe::egui::vec2;

use crate::util::stable_unit;

use super::{
    DatasetError, MoleculeId, PropertyDefinition, PropertyKey, PropertyKind, PropertyLevel,
    PropertyStore, PropertyTarget, PropertyValue, ScaffoldDataset, ScaffoldId, ScaffoldRecord,
};

const MAX_DEMO_DEPTH: usize = 7;
const RING_FRAGMENTS: [&str; 8] = [
    "c1ccccc1",
    "C1CCNCC1",
    "c1ccncc1",
    "C1CCOC1",
    "c1ccc2ccccc2c1",
    "C1CC1",
    "c1cc[nH]c1",
    "O=C1CCCN1",
];
const SERIES: [&str; 5] = ["A", "B", "C", "D", "E"];

fn demo_definitions() -> Vec<PropertyDefinition> {
    let define = |key: &str, title: &str, level, kind| PropertyDefinition {
        key: PropertyKey::new(key),
        title: title.to_owned(),
        level,
        kind,
    };
    vec![
        define("mw", "Molecular weight", PropertyLevel::Molecule, PropertyKind::Numeric),
        define("logp", "logP", PropertyLevel::Molecule, PropertyKind::Numeric),
        define("hbd", "H-bond donors", PropertyLevel::Molecule, PropertyKind::Numeric),
        define("rings", "Ring count", PropertyLevel::Scaffold, PropertyKind::Numeric),
        define("heavy_atoms", "Heavy atoms", PropertyLevel::Scaffold, PropertyKind::Numeric),
        define("series", "Series", PropertyLevel::Scaffold, PropertyKind::Text),
        define(
            "solubility",
            "Solubility (assay offline)",
            PropertyLevel::Molecule,
            PropertyKind::Numeric,
        ),
    ]
}

/// Builds a deterministic synthetic hierarchy with roughly `scaffold_target`
/// scaffolds below a synthetic root.
pub fn generate_demo_dataset(
    scaffold_target: usize,
    seed: &str,
) -> Result<ScaffoldDataset, DatasetError> {
    let mut store = PropertyStore::new(demo_definitions());
    let mw = PropertyKey::new("mw");
    let logp = PropertyKey::new("logp");
    let hbd = PropertyKey::new("hbd");
    let rings = PropertyKey::new("rings");
    let heavy_atoms = PropertyKey::new("heavy_atoms");
    let series = PropertyKey::new("series");

    let mut records = vec![ScaffoldRecord {
        id: ScaffoldId(0),
        parent: None,
        label: "root".to_owned(),
        size: vec2(40.0, 40.0),
        molecules: Vec::new(),
        synthetic: true,
    }];

    let mut next_scaffold = 1u32;
    let mut next_molecule = 0u32;
    let mut queue = VecDeque::from([(ScaffoldId(0), 0usize)]);

    while let Some((parent, depth)) = queue.pop_front() {
        if records.len() > scaffold_target || depth >= MAX_DEMO_DEPTH {
            continue;
        }

        let roll = stable_unit(&format!("{seed}:children:{}", parent.0));
        let child_count = match depth {
            0 => 4 + (roll * 6.0) as usize,
            1 => 1 + (roll * 4.0) as usize,
            _ => (roll * 3.6) as usize,
        };

        for _ in 0..child_count {
            if records.len() > scaffold_target {
                break;
            }

            let id = ScaffoldId(next_scaffold);
            next_scaffold += 1;
            let key = format!("{seed}:scaffold:{}", id.0);
            let shape = stable_unit(&format!("{key}:shape"));
            let fragment = RING_FRAGMENTS[(shape * RING_FRAGMENTS.len() as f32) as usize
                % RING_FRAGMENTS.len()];

            let molecule_total = 1 + (stable_unit(&format!("{key}:molecules")) * 6.0) as u32;
            let mut molecules = Vec::with_capacity(molecule_total as usize);
            for _ in 0..molecule_total {
                let molecule = MoleculeId(next_molecule);
                next_molecule += 1;
                let molecule_key = format!("{seed}:molecule:{}", molecule.0);
                let target = PropertyTarget::Molecule(molecule);
                store.insert(
                    &mw,
                    target,
                    PropertyValue::Number(
                        150.0 + 450.0 * f64::from(stable_unit(&format!("{molecule_key}:mw"))),
                    ),
                );
                store.insert(
                    &logp,
                    target,
                    PropertyValue::Number(
                        -2.0 + 8.0 * f64::from(stable_unit(&format!("{molecule_key}:logp"))),
                    ),
                );
                let donors = stable_unit(&format!("{molecule_key}:hbd"));
                if donors >= 0.1 {
                    store.insert(&hbd, target, PropertyValue::Number(f64::from((donors * 5.0).floor())));
                }
                molecules.push(molecule);
            }

            let target = PropertyTarget::Scaffold(id);
            let ring_count = depth + 1;
            store.insert(&rings, target, PropertyValue::Number(ring_count as f64));
            store.insert(
                &heavy_atoms,
                target,
                PropertyValue::Number((6 * ring_count) as f64 + f64::from((shape * 6.0).floor())),
            );
            let series_roll = stable_unit(&format!("{key}:series"));
            store.insert(
                &series,
                target,
                PropertyValue::Text(
                    SERIES[(series_roll * SERIES.len() as f32) as usize % SERIES.len()].to_owned(),
                ),
            );

            records.push(ScaffoldRecord {
                id,
                parent: Some(parent),
                label: format!("{fragment}.{}", id.0),
                size: vec2(
                    70.0 + 70.0 * stable_unit(&format!("{key}:w")),
                    50.0 + 50.0 * stable_unit(&format!("{key}:h")),
                ),
                molecules,
                synthetic: false,
            });
            queue.push_back((id, depth + 1));
        }
    }

    store.mark_unavailable(&PropertyKey::new("solubility"));
    ScaffoldDataset::new(format!("demo ({seed})"), records, store)
}
