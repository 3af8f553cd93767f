//! Undo/redo over serialized snapshots of the editable root.
//!
//! Provides:
//! - `UndoManager` trait for abstracting undo implementations
//! - `SnapshotStack` - keeps whole-content HTML snapshots with a step limit

use serde::{Deserialize, Serialize};

/// Trait for managing undo/redo history.
///
/// Snapshot managers cannot restore the tree themselves, so `undo` and
/// `redo` hand back the state the caller must apply.
pub trait UndoManager {
    type State;

    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Record a new current state. Clears the redo history.
    fn record(&mut self, state: Self::State);

    /// Step back. Returns the state to restore.
    fn undo(&mut self) -> Option<&Self::State>;

    /// Step forward again. Returns the state to restore.
    fn redo(&mut self) -> Option<&Self::State>;

    /// Clear all undo/redo history, keeping the current state.
    fn clear_history(&mut self);
}

/// Selection boundary stored as child indices from the editable root, so
/// it survives the tree being rebuilt from HTML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPosition {
    pub path: Vec<usize>,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub html: String,
    /// Start and end of the range selection at the time of the snapshot.
    pub selection: Option<(SnapshotPosition, SnapshotPosition)>,
}

/// Linear history of snapshots. `current` always points at the snapshot
/// matching the live content.
#[derive(Clone, Debug, Default)]
pub struct SnapshotStack {
    snapshots: Vec<Snapshot>,
    current: usize,
    max_steps: usize,
}

impl SnapshotStack {
    pub fn new(max_steps: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            current: 0,
            max_steps: max_steps.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.current)
    }
}

impl UndoManager for SnapshotStack {
    type State = Snapshot;

    fn can_undo(&self) -> bool {
        self.current > 0
    }

    fn can_redo(&self) -> bool {
        self.current + 1 < self.snapshots.len()
    }

    fn record(&mut self, state: Snapshot) {
        if self.current().is_some_and(|s| s.html == state.html) {
            // Same content, only the selection moved.
            if let Some(last) = self.snapshots.get_mut(self.current) {
                last.selection = state.selection;
            }
            return;
        }
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.current + 1);
        }
        self.snapshots.push(state);

        // Trim if over max (the extra one is the current state)
        while self.snapshots.len() > self.max_steps + 1 {
            self.snapshots.remove(0);
        }
        self.current = self.snapshots.len() - 1;
    }

    fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.current -= 1;
        self.snapshots.get(self.current)
    }

    fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        self.snapshots.get(self.current)
    }

    fn clear_history(&mut self) {
        if self.snapshots.is_empty() {
            return;
        }
        let current = self.snapshots.swap_remove(self.current);
        self.snapshots = vec![current];
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(html: &str) -> Snapshot {
        Snapshot {
            html: html.to_string(),
            selection: None,
        }
    }

    #[test]
    fn test_undo_redo_walks_history() {
        let mut stack = SnapshotStack::new(10);
        stack.record(snapshot("a"));
        stack.record(snapshot("ab"));
        stack.record(snapshot("abc"));

        assert!(stack.can_undo());
        assert!(!stack.can_redo());
        assert_eq!(stack.undo().map(|s| s.html.as_str()), Some("ab"));
        assert_eq!(stack.undo().map(|s| s.html.as_str()), Some("a"));
        assert!(stack.undo().is_none());
        assert_eq!(stack.redo().map(|s| s.html.as_str()), Some("ab"));
    }

    #[test]
    fn test_record_after_undo_drops_redo() {
        let mut stack = SnapshotStack::new(10);
        stack.record(snapshot("a"));
        stack.record(snapshot("ab"));
        stack.undo();
        stack.record(snapshot("ax"));
        assert!(!stack.can_redo());
        assert_eq!(stack.undo().map(|s| s.html.as_str()), Some("a"));
    }

    #[test]
    fn test_same_content_only_updates_selection() {
        let mut stack = SnapshotStack::new(10);
        stack.record(snapshot("a"));
        let caret = SnapshotPosition {
            path: vec![0],
            offset: 1,
        };
        stack.record(Snapshot {
            html: "a".into(),
            selection: Some((caret.clone(), caret)),
        });
        assert_eq!(stack.len(), 1);
        assert!(stack.current().is_some_and(|s| s.selection.is_some()));
    }

    #[test]
    fn test_max_steps_trims_oldest() {
        let mut stack = SnapshotStack::new(2);
        for html in ["a", "b", "c", "d"] {
            stack.record(snapshot(html));
        }
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.undo().map(|s| s.html.as_str()), Some("c"));
        assert_eq!(stack.undo().map(|s| s.html.as_str()), Some("b"));
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_clear_history_keeps_current() {
        let mut stack = SnapshotStack::new(5);
        stack.record(snapshot("a"));
        stack.record(snapshot("b"));
        stack.clear_history();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.current().map(|s| s.html.as_str()), Some("b"));
        assert!(!stack.can_undo());
    }
}
