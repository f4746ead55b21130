//! Lane queues for tasks.
//!
//! The pool keeps one FIFO per priority plus a retry lane. All of them live
//! behind the pool mutex, so nothing here synchronizes on its own.

use std::collections::VecDeque;

use crate::pool::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lane {
    High = 0,
    Medium = 1,
    Low = 2,
    Retry = 3,
}

impl From<Priority> for Lane {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::High => Lane::High,
            Priority::Medium => Lane::Medium,
            Priority::Low => Lane::Low,
        }
    }
}

/// Order in which workers look for runnable work. The retry lane is never
/// drained directly.
const DRAIN_ORDER: [Lane; 3] = [Lane::High, Lane::Medium, Lane::Low];

#[derive(Debug, Default)]
pub(crate) struct LaneQueues {
    lanes: [VecDeque<Task>; 4],
}

impl LaneQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, lane: Lane, task: Task) {
        self.lanes[lane as usize].push_back(task);
    }

    /// Pops the front task of the highest-priority non-empty lane.
    pub fn pop_next(&mut self) -> Option<Task> {
        DRAIN_ORDER
            .iter()
            .find_map(|&lane| self.lanes[lane as usize].pop_front())
    }

    /// Moves every parked task to the back of the low-priority lane, keeping
    /// their relative order. Returns how many were moved.
    pub fn readmit_retries(&mut self) -> usize {
        let retries = std::mem::take(&mut self.lanes[Lane::Retry as usize]);
        let moved = retries.len();
        self.lanes[Lane::Low as usize].extend(retries);
        moved
    }

    /// Drops every queued task, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        self.lanes
            .iter_mut()
            .map(|lane| {
                let n = lane.len();
                lane.clear();
                n
            })
            .sum()
    }

    pub fn pending(&self) -> usize {
        DRAIN_ORDER
            .iter()
            .map(|&lane| self.lanes[lane as usize].len())
            .sum()
    }

    pub fn retry_pending(&self) -> usize {
        self.lanes[Lane::Retry as usize].len()
    }
}
