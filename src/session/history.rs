//! Bounded undo/redo history of model parameters

use std::collections::VecDeque;

use crate::types::ModelParameters;

/// Past and future parameter snapshots, each capped at `capacity`.
///
/// Committing a change pushes the prior value onto `past` (evicting the
/// oldest entry when full) and clears `future`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterHistory {
    past: VecDeque<ModelParameters>,
    future: VecDeque<ModelParameters>,
    capacity: usize,
}

impl ParameterHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            past: VecDeque::with_capacity(capacity),
            future: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `prior` as undoable and drop the redo stack.
    pub fn commit(&mut self, prior: ModelParameters) {
        push_bounded(&mut self.past, prior, self.capacity);
        self.future.clear();
    }

    /// Step back: returns the value to restore, and remembers `current` for redo.
    pub fn undo(&mut self, current: ModelParameters) -> Option<ModelParameters> {
        let restored = self.past.pop_back()?;
        push_bounded(&mut self.future, current, self.capacity);
        Some(restored)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: ModelParameters) -> Option<ModelParameters> {
        let restored = self.future.pop_back()?;
        push_bounded(&mut self.past, current, self.capacity);
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn push_bounded(stack: &mut VecDeque<ModelParameters>, value: ModelParameters, capacity: usize) {
    if stack.len() == capacity {
        stack.pop_front();
    }
    stack.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: f64) -> ModelParameters {
        ModelParameters::new(k, 0.0, 0.01)
    }

    #[test]
    fn test_undo_redo_mirror() {
        let mut history = ParameterHistory::new(20);
        history.commit(params(1.0));
        let restored = history.undo(params(2.0)).unwrap();
        assert_eq!(restored.permeability_md, 1.0);
        assert!(history.can_redo());
        let again = history.redo(restored).unwrap();
        assert_eq!(again.permeability_md, 2.0);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = ParameterHistory::new(20);
        for i in 0..25 {
            history.commit(params(i as f64));
        }
        assert_eq!(history.past_len(), 20);
        // Oldest surviving entry is the sixth commit
        let mut current = params(99.0);
        let mut last = None;
        while let Some(p) = history.undo(current) {
            current = p;
            last = Some(p);
        }
        assert_eq!(last.map(|p| p.permeability_md), Some(5.0));
    }

    #[test]
    fn test_commit_clears_future() {
        let mut history = ParameterHistory::new(5);
        history.commit(params(1.0));
        history.undo(params(2.0));
        history.commit(params(3.0));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_history_is_a_no_op() {
        let mut history = ParameterHistory::new(5);
        assert!(history.undo(params(1.0)).is_none());
        assert!(history.redo(params(1.0)).is_none());
        assert_eq!(history.future_len(), 0);
    }
}
