use std::sync::mpsc::{self, Receiver, Sender};

use crate::dataset::ScaffoldId;

use super::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEvent {
    NodeAdded { node: NodeId, scaffold: ScaffoldId },
    NodeRemoved { node: NodeId, scaffold: ScaffoldId },
}

#[derive(Debug, Default)]
pub(super) struct EventBus {
    listeners: Vec<Sender<TreeEvent>>,
}

impl EventBus {
    pub(super) fn subscribe(&mut self) -> Receiver<TreeEvent> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    pub(super) fn emit(&mut self, event: TreeEvent) {
        self.listeners.retain(|listener| listener.send(event).is_ok());
    }
}
