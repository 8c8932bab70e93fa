use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::dataset::MoleculeId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Unselected,
    HalfSelected,
    Selected,
}

impl SelectionState {
    /// State of a scaffold owning `molecules` when `selected` is the global
    /// selection.
    pub fn of(selected: &HashSet<MoleculeId>, molecules: &[MoleculeId]) -> Self {
        if molecules.is_empty() {
            return Self::Unselected;
        }
        let hits = molecules
            .iter()
            .filter(|molecule| selected.contains(molecule))
            .count();
        if hits == 0 {
            Self::Unselected
        } else if hits == molecules.len() {
            Self::Selected
        } else {
            Self::HalfSelected
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionChanged {
    pub revision: u64,
    pub size: usize,
}

/// Global molecule selection. Node selection states are derived from it.
#[derive(Debug, Default)]
pub struct SelectionSet {
    molecules: HashSet<MoleculeId>,
    revision: u64,
    listeners: Vec<Sender<SelectionChanged>>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<SelectionChanged> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    pub fn contains(&self, molecule: MoleculeId) -> bool {
        self.molecules.contains(&molecule)
    }

    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MoleculeId> + '_ {
        self.molecules.iter().copied()
    }

    pub fn add_all(&mut self, molecules: &[MoleculeId]) {
        let before = self.molecules.len();
        self.molecules.extend(molecules.iter().copied());
        if self.molecules.len() != before {
            self.notify();
        }
    }

    pub fn remove_all(&mut self, molecules: &[MoleculeId]) {
        let before = self.molecules.len();
        for molecule in molecules {
            self.molecules.remove(molecule);
        }
        if self.molecules.len() != before {
            self.notify();
        }
    }

    /// Selects all of `molecules` unless they already are, in which case
    /// they are deselected.
    pub fn toggle(&mut self, molecules: &[MoleculeId]) {
        if self.state_for(molecules) == SelectionState::Selected {
            self.remove_all(molecules);
        } else {
            self.add_all(molecules);
        }
    }

    pub fn clear(&mut self) {
        if !self.molecules.is_empty() {
            self.molecules.clear();
            self.notify();
        }
    }

    pub fn state_for(&self, molecules: &[MoleculeId]) -> SelectionState {
        SelectionState::of(&self.molecules, molecules)
    }

    /// Copy of the selected molecules at this revision.
    pub fn snapshot(&self) -> HashSet<MoleculeId> {
        self.molecules.clone()
    }

    fn notify(&mut self) {
        self.revision = self.revision.wrapping_add(1);
        let event = SelectionChanged {
            revision: self.revision,
            size: self.molecules.len(),
        };
        self.listeners.retain(|listener| listener.send(event).is_ok());
    }
}
