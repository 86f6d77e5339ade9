use std::collections::VecDeque;

/// Linear undo/redo over full snapshots of some state `T`.
///
/// The cursor always addresses the current snapshot. Pushing after an undo drops every
/// snapshot ahead of the cursor; once `capacity` is exceeded the oldest snapshot is dropped.
#[derive(Clone, Debug)]
pub struct History<T> {
    snapshots: VecDeque<T>,
    cursor: usize,
    capacity: usize,
}

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

impl<T: Clone> History<T> {
    /// Start a history whose only snapshot is `initial`.
    pub fn new(initial: T, capacity: usize) -> Self {
        let mut snapshots = VecDeque::with_capacity(capacity.min(64));
        snapshots.push_back(initial);
        Self {
            snapshots,
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, state: T) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push_back(state);
        if self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot. `None` when already at the oldest one.
    pub fn undo(&mut self) -> Option<&T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.snapshots.get(self.cursor)
    }

    /// Step forward one snapshot. `None` when already at the newest one.
    pub fn redo(&mut self) -> Option<&T> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor)
    }

    /// Forget everything and restart from `initial`.
    pub fn reset(&mut self, initial: T) {
        self.snapshots.clear();
        self.snapshots.push_back(initial);
        self.cursor = 0;
    }

    pub fn current(&self) -> Option<&T> {
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of snapshots kept, the current one included. Never zero.
    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }
}
