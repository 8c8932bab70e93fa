use std::collections::HashMap;

use crate::dataset::{
    DatasetError, HierarchyProvider, PropertyKey, PropertyKind, PropertyLevel, PropertyProvider,
    PropertyTarget, ScaffoldId,
};

use super::accumulate::{Aggregate, TextAggregate};
use super::{MappingRequest, PropertyRequest, SortRequest, SortValue, VisualChannel};

#[derive(Clone, Debug, PartialEq)]
pub enum JobKind {
    Sort(SortRequest),
    Mapping(MappingRequest),
}

impl JobKind {
    pub fn property(&self) -> &PropertyRequest {
        match self {
            Self::Sort(request) => &request.property,
            Self::Mapping(request) => &request.property,
        }
    }

    fn wants_samples(&self) -> bool {
        matches!(self, Self::Mapping(request) if request.channel == VisualChannel::InfoBar)
    }
}

#[derive(Clone, Debug)]
pub struct PropertyJob {
    pub ticket: u64,
    pub root: ScaffoldId,
    pub kind: JobKind,
}

/// Plain values produced off the UI thread. `keys`/`targets` stay locked in
/// the provider until the apply step hands them back.
#[derive(Debug, Default)]
pub struct LoadedValues {
    pub values: HashMap<ScaffoldId, SortValue>,
    pub samples: HashMap<ScaffoldId, Vec<f64>>,
    pub keys: Vec<PropertyKey>,
    pub targets: Vec<PropertyTarget>,
}

#[derive(Debug)]
pub struct JobOutcome {
    pub ticket: u64,
    pub kind: JobKind,
    pub result: Result<LoadedValues, DatasetError>,
}

pub fn run_job<D>(data: &D, job: PropertyJob) -> JobOutcome
where
    D: HierarchyProvider + PropertyProvider + ?Sized,
{
    let result = load_values(data, job.root, job.kind.property(), job.kind.wants_samples());
    JobOutcome {
        ticket: job.ticket,
        kind: job.kind,
        result,
    }
}

fn load_values<D>(
    data: &D,
    root: ScaffoldId,
    request: &PropertyRequest,
    wants_samples: bool,
) -> Result<LoadedValues, DatasetError>
where
    D: HierarchyProvider + PropertyProvider + ?Sized,
{
    let definition = data
        .definition(&request.key)
        .cloned()
        .ok_or_else(|| DatasetError::UnknownProperty(request.key.clone()))?;

    let scaffolds = data.subtree(root);
    let targets = match definition.level {
        PropertyLevel::Molecule => scaffolds
            .iter()
            .flat_map(|scaffold| {
                data.molecules(*scaffold)
                    .iter()
                    .map(|molecule| PropertyTarget::Molecule(*molecule))
            })
            .collect::<Vec<_>>(),
        PropertyLevel::Scaffold => scaffolds
            .iter()
            .map(|scaffold| PropertyTarget::Scaffold(*scaffold))
            .collect::<Vec<_>>(),
    };
    let keys = vec![request.key.clone()];
    data.lock_and_load(&keys, &targets)?;

    let own_targets = |scaffold: ScaffoldId| -> Vec<PropertyTarget> {
        match definition.level {
            PropertyLevel::Molecule => data
                .molecules(scaffold)
                .iter()
                .map(|molecule| PropertyTarget::Molecule(*molecule))
                .collect(),
            PropertyLevel::Scaffold => vec![PropertyTarget::Scaffold(scaffold)],
        }
    };

    let mut samples: HashMap<ScaffoldId, Vec<f64>> = HashMap::new();
    let values = match definition.kind {
        PropertyKind::Numeric => {
            let mut aggregates = HashMap::with_capacity(scaffolds.len());
            for &scaffold in &scaffolds {
                let mut aggregate = Aggregate::default();
                for target in own_targets(scaffold) {
                    if let Some(value) = data.numeric_value(&request.key, target) {
                        aggregate.push(value);
                        if wants_samples {
                            samples.entry(scaffold).or_default().push(value);
                        }
                    }
                }
                aggregates.insert(scaffold, aggregate);
            }
            if request.cumulative {
                fold_subtrees(data, &scaffolds, &mut aggregates, Aggregate::merge);
            }
            aggregates
                .into_iter()
                .filter_map(|(scaffold, aggregate)| {
                    aggregate
                        .finish(request.accumulation)
                        .map(|value| (scaffold, SortValue::Number(value)))
                })
                .collect()
        }
        PropertyKind::Text => {
            let mut aggregates = HashMap::with_capacity(scaffolds.len());
            for &scaffold in &scaffolds {
                let mut aggregate = TextAggregate::default();
                for target in own_targets(scaffold) {
                    if let Some(value) = data.string_value(&request.key, target) {
                        aggregate.push(&value);
                    }
                }
                aggregates.insert(scaffold, aggregate);
            }
            if request.cumulative {
                fold_subtrees(data, &scaffolds, &mut aggregates, TextAggregate::merge);
            }
            aggregates
                .into_iter()
                .filter_map(|(scaffold, aggregate)| {
                    aggregate
                        .finish(request.accumulation)
                        .map(|value| (scaffold, value))
                })
                .collect()
        }
    };

    Ok(LoadedValues {
        values,
        samples,
        keys,
        targets,
    })
}

/// Post-order fold: every scaffold absorbs the already-folded partials of
/// its children. `scaffolds` is in pre-order, so walking it backwards
/// visits children first.
fn fold_subtrees<D, A>(
    data: &D,
    scaffolds: &[ScaffoldId],
    aggregates: &mut HashMap<ScaffoldId, A>,
    merge: impl Fn(&mut A, &A),
) where
    D: HierarchyProvider + ?Sized,
    A: Clone,
{
    for &scaffold in scaffolds.iter().rev() {
        let folded_children = data
            .children(scaffold)
            .iter()
            .filter_map(|child| aggregates.get(child).cloned())
            .collect::<Vec<_>>();
        if let Some(own) = aggregates.get_mut(&scaffold) {
            for child in &folded_children {
                merge(own, child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::DatasetBuilder;
    use crate::dataset::{PropertyKind, PropertyLevel};
    use crate::sorting::{Accumulation, SortDirection};

    fn dataset() -> crate::dataset::ScaffoldDataset {
        DatasetBuilder::new()
            .scaffold(1, None)
            .scaffold(2, Some(1))
            .scaffold(3, Some(1))
            .scaffold(4, Some(2))
            .molecules(2, &[20, 21])
            .molecules(3, &[30])
            .molecules(4, &[40])
            .property("mw", PropertyLevel::Molecule, PropertyKind::Numeric)
            .property("series", PropertyLevel::Scaffold, PropertyKind::Text)
            .property("broken", PropertyLevel::Molecule, PropertyKind::Numeric)
            .molecule_value("mw", 20, 100.0)
            .molecule_value("mw", 21, 200.0)
            .molecule_value("mw", 30, 50.0)
            .molecule_value("mw", 40, 600.0)
            .scaffold_text("series", 2, "B")
            .scaffold_text("series", 4, "A")
            .unavailable("broken")
            .build()
    }

    fn sort_job(key: &str, accumulation: Accumulation, cumulative: bool) -> PropertyJob {
        PropertyJob {
            ticket: 1,
            root: ScaffoldId(1),
            kind: JobKind::Sort(SortRequest {
                property: PropertyRequest {
                    key: PropertyKey::new(key),
                    accumulation,
                    cumulative,
                },
                direction: SortDirection::Ascending,
                color_segments: false,
                captions: false,
            }),
        }
    }

    #[test]
    fn per_node_values_use_own_molecules() {
        let data = dataset();
        let outcome = run_job(&data, sort_job("mw", Accumulation::Average, false));
        let loaded = outcome.result.expect("loaded");
        assert_eq!(loaded.values.get(&ScaffoldId(2)), Some(&SortValue::Number(150.0)));
        assert_eq!(loaded.values.get(&ScaffoldId(3)), Some(&SortValue::Number(50.0)));
        assert_eq!(loaded.values.get(&ScaffoldId(1)), None);
        assert_eq!(loaded.targets.len(), 4);
    }

    #[test]
    fn cumulative_values_fold_descendants() {
        let data = dataset();
        let sum = run_job(&data, sort_job("mw", Accumulation::Sum, true))
            .result
            .expect("loaded");
        assert_eq!(sum.values.get(&ScaffoldId(2)), Some(&SortValue::Number(900.0)));
        assert_eq!(sum.values.get(&ScaffoldId(1)), Some(&SortValue::Number(950.0)));

        let average = run_job(&data, sort_job("mw", Accumulation::Average, true))
            .result
            .expect("loaded");
        assert_eq!(average.values.get(&ScaffoldId(2)), Some(&SortValue::Number(300.0)));

        let max = run_job(&data, sort_job("mw", Accumulation::Max, true))
            .result
            .expect("loaded");
        assert_eq!(max.values.get(&ScaffoldId(1)), Some(&SortValue::Number(600.0)));
    }

    #[test]
    fn text_properties_keep_scaffold_values() {
        let data = dataset();
        let loaded = run_job(&data, sort_job("series", Accumulation::Min, true))
            .result
            .expect("loaded");
        assert_eq!(
            loaded.values.get(&ScaffoldId(2)),
            Some(&SortValue::Text("A".to_owned()))
        );
        assert_eq!(loaded.values.get(&ScaffoldId(3)), None);
    }

    #[test]
    fn values_stay_locked_after_the_job() {
        let data = dataset();
        let loaded = run_job(&data, sort_job("mw", Accumulation::Average, false))
            .result
            .expect("loaded");
        assert_eq!(data.properties().loaded_count(), 4);
        data.unlock_and_unload(&loaded.keys, &loaded.targets);
        assert_eq!(data.properties().loaded_count(), 0);
    }

    #[test]
    fn failing_source_reports_error() {
        let data = dataset();
        let outcome = run_job(&data, sort_job("broken", Accumulation::Average, false));
        assert!(matches!(outcome.result, Err(DatasetError::LoadFailed { .. })));
        assert_eq!(data.properties().loaded_count(), 0);
    }
}
