//! Load/store queue: a FIFO of program indices for in-flight memory ops,
//! enforcing in-order address resolution.

use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct LoadStoreQueue {
    entries: VecDeque<usize>,
}

impl LoadStoreQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, program_index: usize) {
        self.entries.push_back(program_index);
    }

    #[must_use]
    pub fn front(&self) -> Option<usize> {
        self.entries.front().copied()
    }

    pub fn pop_front(&mut self) -> Option<usize> {
        self.entries.pop_front()
    }

    /// Drops every entry whose issue cycle (looked up via `issue_cycle_of`)
    /// is strictly greater than `threshold_issue_cycle`, as happens on a
    /// speculative flush. Entries are popped from the tail since younger
    /// instructions sit at the back of program order.
    pub fn flush_younger_than(
        &mut self,
        threshold_issue_cycle: u64,
        issue_cycle_of: impl Fn(usize) -> u64,
    ) {
        while let Some(&back) = self.entries.back() {
            if issue_cycle_of(back) > threshold_issue_cycle {
                let _ = self.entries.pop_back();
            } else {
                break;
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
