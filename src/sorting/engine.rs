use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dataset::{HierarchyProvider, PropertyProvider};
use crate::tree::{NodeId, VisualTree};

use super::job::{JobKind, JobOutcome, LoadedValues, PropertyJob};
use super::mapping::{ChannelMapping, MappingRequest, MappingState, VisualChannel};
use super::order::ChildOrder;
use super::segments::build_segments;
use super::worker::PropertyWorker;
use super::{LegendSample, SortRequest, SortState};

#[derive(Clone, Debug, PartialEq)]
pub enum AppliedJob {
    Sorted { ticket: u64 },
    Mapped { ticket: u64, channel: VisualChannel },
    Failed { ticket: u64, reason: String },
}

/// UI-thread side of property driven sorting and mapping. Jobs go to the
/// background worker, results are applied in submission order by `poll`.
pub struct SortEngine<D> {
    data: Arc<D>,
    worker: PropertyWorker,
    next_ticket: u64,
    in_flight: usize,
    state: SortState,
    mappings: MappingState,
}

impl<D> SortEngine<D>
where
    D: HierarchyProvider + PropertyProvider + Send + Sync + 'static,
{
    pub fn new(data: Arc<D>) -> Self {
        let worker = PropertyWorker::spawn(Arc::clone(&data));
        Self {
            data,
            worker,
            next_ticket: 0,
            in_flight: 0,
            state: SortState::default(),
            mappings: MappingState::default(),
        }
    }

    pub fn state(&self) -> &SortState {
        &self.state
    }

    pub fn mappings(&self) -> &MappingState {
        &self.mappings
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn request_sort(&mut self, request: SortRequest) -> Option<u64> {
        self.submit(JobKind::Sort(request))
    }

    pub fn request_mapping(&mut self, request: MappingRequest) -> Option<u64> {
        self.submit(JobKind::Mapping(request))
    }

    pub fn disable_mapping(&mut self, channel: VisualChannel) {
        if self.mappings.disable(channel) {
            debug!(?channel, "mapping disabled");
        }
    }

    fn submit(&mut self, kind: JobKind) -> Option<u64> {
        let root = self.data.root()?;
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        debug!(ticket, property = %kind.property().key, "queueing property job");
        if !self.worker.submit(PropertyJob { ticket, root, kind }) {
            return None;
        }
        self.in_flight += 1;
        Some(ticket)
    }

    /// Applies every finished job. Never blocks.
    pub fn poll(&mut self, tree: &mut VisualTree) -> Vec<AppliedJob> {
        let mut applied = Vec::new();
        while let Some(outcome) = self.worker.try_next() {
            applied.push(self.apply_outcome(tree, outcome));
        }
        applied
    }

    /// Load, apply, then release. The provider locks taken by the worker
    /// are only dropped after the tree has read what it needs.
    pub fn apply_outcome(&mut self, tree: &mut VisualTree, outcome: JobOutcome) -> AppliedJob {
        self.in_flight = self.in_flight.saturating_sub(1);
        let ticket = outcome.ticket;

        let loaded = match outcome.result {
            Ok(loaded) => loaded,
            Err(error) => {
                warn!(ticket, %error, "property job failed");
                let reason = error.to_string();
                match outcome.kind {
                    JobKind::Sort(_) => self.state.last_error = Some(reason.clone()),
                    JobKind::Mapping(request) => self.disable_mapping(request.channel),
                }
                return AppliedJob::Failed { ticket, reason };
            }
        };

        let applied = match outcome.kind {
            JobKind::Sort(request) => {
                self.apply_sort(tree, request, &loaded);
                AppliedJob::Sorted { ticket }
            }
            JobKind::Mapping(request) => {
                let channel = request.channel;
                info!(ticket, ?channel, values = loaded.values.len(), "mapping applied");
                self.mappings
                    .install(ChannelMapping::new(request, loaded.values.clone(), &loaded.samples));
                AppliedJob::Mapped { ticket, channel }
            }
        };

        self.data.unlock_and_unload(&loaded.keys, &loaded.targets);
        applied
    }

    fn apply_sort(&mut self, tree: &mut VisualTree, request: SortRequest, loaded: &LoadedValues) {
        let order = ChildOrder::new(Arc::new(loaded.values.clone()), request.direction);
        tree.set_child_order(order);
        info!(
            property = %request.property.key,
            direction = ?request.direction,
            values = loaded.values.len(),
            "sort applied"
        );
        self.state.active = Some(request);
        self.state.last_error = None;
        self.refresh_segments(tree);
    }

    /// Re-sorts below `node` with the last applied sort. No-op before the
    /// first sort.
    pub fn resort_subtree(&mut self, tree: &mut VisualTree, node: NodeId) {
        if self.state.active.is_none() {
            return;
        }
        tree.sort_subtree(node);
        if tree.root() == Some(node) || tree.parent(node) == tree.root() {
            self.refresh_segments(tree);
        }
    }

    pub fn refresh_segments(&mut self, tree: &VisualTree) {
        let wants_segments = self
            .state
            .active
            .as_ref()
            .is_some_and(|request| request.color_segments);
        let (Some(order), true) = (tree.child_order(), wants_segments) else {
            self.state.segments.clear();
            self.state.legend.clear();
            return;
        };

        let captions = self
            .state
            .active
            .as_ref()
            .is_some_and(|request| request.captions);
        self.state.segments = build_segments(tree, order, captions);
        self.state.legend = self
            .state
            .segments
            .iter()
            .filter_map(|segment| {
                segment.caption.as_ref().map(|caption| LegendSample {
                    caption: caption.clone(),
                    color: segment.color,
                })
            })
            .collect();
    }

    pub fn clear_sort(&mut self, tree: &mut VisualTree) {
        tree.clear_child_order(&*self.data);
        self.state = SortState::default();
        debug!("sort cleared");
    }
}
