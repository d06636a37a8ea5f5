//! Linear undo history of deep-copied snapshots

/// Snapshot stack with a movable cursor
///
/// Index 0 holds the baseline captured at load. Committing after an undo
/// discards every snapshot above the cursor, so history never branches.
#[derive(Debug, Clone)]
pub struct History<T> {
    snapshots: Vec<T>,
    index: usize,
    capacity: Option<usize>,
}

impl<T: Clone> History<T> {
    pub fn new(baseline: T) -> Self {
        Self::with_capacity(baseline, None)
    }

    /// History keeping at most `capacity` snapshots, baseline included
    pub fn with_capacity(baseline: T, capacity: Option<usize>) -> Self {
        Self { snapshots: vec![baseline], index: 0, capacity: capacity.map(|c| c.max(1)) }
    }

    /// Push a copy of `state` above the cursor
    pub fn commit(&mut self, state: &T) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(state.clone());
        self.index = self.snapshots.len() - 1;

        if let Some(capacity) = self.capacity {
            let excess = self.snapshots.len().saturating_sub(capacity);
            if excess > 0 {
                self.snapshots.drain(..excess);
                self.index -= excess;
            }
        }
        log::debug!("history commit: index={} len={}", self.index, self.snapshots.len());
    }

    /// Step back; `None` at the baseline
    pub fn undo(&mut self) -> Option<&T> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.snapshots.get(self.index)
    }

    /// Step forward again; `None` once a commit has discarded the future
    pub fn redo(&mut self) -> Option<&T> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        self.snapshots.get(self.index)
    }

    /// Snapshot at the cursor
    pub fn current(&self) -> &T {
        &self.snapshots[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_at_baseline_is_noop() {
        let mut history = History::new(vec![0]);
        assert!(history.undo().is_none());
        assert_eq!(history.index(), 0);
        assert_eq!(history.current(), &vec![0]);
    }

    #[test]
    fn commit_after_undo_discards_the_future() {
        let mut history = History::new("s0");
        history.commit(&"s1");
        history.commit(&"s2");

        assert_eq!(history.undo(), Some(&"s1"));
        history.commit(&"s3");

        assert_eq!(history.len(), 3);
        assert!(history.redo().is_none());
        assert_eq!(history.undo(), Some(&"s1"));
        assert_eq!(history.redo(), Some(&"s3"));
        assert!(!history.can_redo());
    }

    #[test]
    fn redo_walks_forward_until_the_top() {
        let mut history = History::new(1);
        history.commit(&2);
        history.commit(&3);
        history.undo();
        history.undo();

        assert!(history.can_redo());
        assert_eq!(history.redo(), Some(&2));
        assert_eq!(history.redo(), Some(&3));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let mut state = vec![String::from("a")];
        let mut history = History::new(state.clone());
        state.push("b".to_string());
        history.commit(&state);
        state.push("c".to_string());

        assert_eq!(history.current().len(), 2);
        assert_eq!(history.undo().map(Vec::len), Some(1));
    }

    #[test]
    fn capacity_drops_oldest_snapshots() {
        let mut history = History::with_capacity(0, Some(3));
        for value in 1..=5 {
            history.commit(&value);
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), 2);
        assert_eq!(history.undo(), Some(&4));
        assert_eq!(history.undo(), Some(&3));
        assert_eq!(history.undo(), None);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Commit,
        Undo,
        Redo,
    }

    fn step() -> impl proptest::strategy::Strategy<Value = Step> {
        use proptest::prelude::*;
        prop_oneof![Just(Step::Commit), Just(Step::Undo), Just(Step::Redo)]
    }

    proptest::proptest! {
        #[test]
        fn cursor_tracks_a_linear_model(steps in proptest::collection::vec(step(), 0..64)) {
            let mut history = History::new(0u32);
            let mut model = vec![0u32];
            let mut cursor = 0usize;
            let mut next = 1u32;

            for step in steps {
                match step {
                    Step::Commit => {
                        model.truncate(cursor + 1);
                        model.push(next);
                        cursor = model.len() - 1;
                        history.commit(&next);
                        next += 1;
                    }
                    Step::Undo => {
                        let expected = cursor.checked_sub(1).map(|index| model[index]);
                        proptest::prop_assert_eq!(history.undo().copied(), expected);
                        cursor = cursor.saturating_sub(1);
                    }
                    Step::Redo => {
                        let expected = model.get(cursor + 1).copied();
                        proptest::prop_assert_eq!(history.redo().copied(), expected);
                        cursor = (cursor + 1).min(model.len() - 1);
                    }
                }
                proptest::prop_assert_eq!(history.index(), cursor);
                proptest::prop_assert_eq!(history.len(), model.len());
                proptest::prop_assert_eq!(*history.current(), model[cursor]);
            }
        }
    }
}
