// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Priority Tracker (C4): per-direction highest-priority active stream.

use streammgr_ipc::Direction;

use super::stream::StreamId;

#[derive(Debug, Clone, Copy)]
struct TopStream {
    id: StreamId,
    priority: i32,
    seq: u64,
}

#[derive(Debug, Default)]
struct DirectionTracker {
    top: Option<TopStream>,
    /// Candidate chosen on new-data, committed to `top` on `put`.
    pending: Option<TopStream>,
    next_seq: u64,
}

impl DirectionTracker {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// On equal priority the later arrival wins, so the comparison is `>=`
    /// against the current holder.
    fn beats(candidate_priority: i32, incumbent: Option<TopStream>) -> bool {
        match incumbent {
            None => true,
            Some(t) => candidate_priority >= t.priority,
        }
    }
}

/// Maintains, for each direction, the single highest-priority active
/// stream (§3, §4.4).
#[derive(Debug, Default)]
pub struct PriorityTracker {
    sink_input: DirectionTracker,
    source_output: DirectionTracker,
}

impl PriorityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn tracker(&self, direction: Direction) -> &DirectionTracker {
        match direction {
            Direction::Out => &self.sink_input,
            Direction::In => &self.source_output,
        }
    }

    fn tracker_mut(&mut self, direction: Direction) -> &mut DirectionTracker {
        match direction {
            Direction::Out => &mut self.sink_input,
            Direction::In => &mut self.source_output,
        }
    }

    pub fn top(&self, direction: Direction) -> Option<StreamId> {
        self.tracker(direction).top.map(|t| t.id)
    }

    /// `on_stream_new_data`: compares the new stream against the current
    /// top. Returns `true` (need `ChangeRouteStartWithNewData`) if it wins;
    /// the win is only staged as `pending` until `commit` is called on
    /// `put`.
    pub fn consider_new_data(&mut self, direction: Direction, id: StreamId, priority: i32) -> bool {
        let tracker = self.tracker_mut(direction);
        let wins = DirectionTracker::beats(priority, tracker.top);
        if wins {
            let seq = tracker.next_seq();
            tracker.pending = Some(TopStream { id, priority, seq });
        }
        wins
    }

    /// `on_stream_started` / commit path for `put`, `state-changed`, and
    /// `move-finish`. If a pending candidate from new-data matches `id`, it
    /// is promoted. Otherwise this runs the same comparison directly
    /// against committed state, matching "if no pending flag, sets the
    /// top" in §4.4.
    pub fn commit(&mut self, direction: Direction, id: StreamId, priority: i32) -> bool {
        let tracker = self.tracker_mut(direction);
        if let Some(pending) = tracker.pending {
            if pending.id == id {
                tracker.top = Some(pending);
                tracker.pending = None;
                return true;
            }
        }
        let wins = DirectionTracker::beats(priority, tracker.top);
        if wins {
            let seq = tracker.next_seq();
            tracker.top = Some(TopStream { id, priority, seq });
        }
        wins
    }

    /// `on_stream_ended`: if `id` was the top, clears it. The caller is
    /// responsible for rescanning the owning device's surviving input set
    /// and calling [`PriorityTracker::recompute`] with the result.
    pub fn clear_if_top(&mut self, direction: Direction, id: StreamId) -> bool {
        let tracker = self.tracker_mut(direction);
        if tracker.top.map(|t| t.id) == Some(id) {
            tracker.top = None;
            if tracker.pending.map(|t| t.id) == Some(id) {
                tracker.pending = None;
            }
            true
        } else {
            false
        }
    }

    /// Rescans the surviving input set (given in arrival order, oldest
    /// first) and picks the maximum priority, ties going to the later
    /// entry. Returns the new top, or `None` if the set is empty.
    pub fn recompute(
        &mut self,
        direction: Direction,
        remaining_in_arrival_order: &[(StreamId, i32)],
    ) -> Option<StreamId> {
        let mut best: Option<(StreamId, i32)> = None;
        for &(id, priority) in remaining_in_arrival_order {
            let better = match best {
                None => true,
                Some((_, bp)) => priority >= bp,
            };
            if better {
                best = Some((id, priority));
            }
        }
        let tracker = self.tracker_mut(direction);
        tracker.top = best.map(|(id, priority)| {
            let seq = tracker.next_seq;
            TopStream { id, priority, seq }
        });
        if tracker.top.is_some() {
            tracker.next_seq += 1;
        }
        tracker.top.map(|t| t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_replacement_scenario_1() {
        let mut tracker = PriorityTracker::new();
        // media(A) starts, becomes top.
        tracker.consider_new_data(Direction::Out, 1, 100);
        tracker.commit(Direction::Out, 1, 100);
        assert_eq!(tracker.top(Direction::Out), Some(1));

        // phone(B) out-prioritizes media -> need ChangeRouteStartWithNewData.
        let need_update = tracker.consider_new_data(Direction::Out, 2, 300);
        assert!(need_update);
        // top not yet committed until `put`.
        assert_eq!(tracker.top(Direction::Out), Some(1));
        tracker.commit(Direction::Out, 2, 300);
        assert_eq!(tracker.top(Direction::Out), Some(2));

        // B ends -> rescan picks A back up.
        assert!(tracker.clear_if_top(Direction::Out, 2));
        let new_top = tracker.recompute(Direction::Out, &[(1, 100)]);
        assert_eq!(new_top, Some(1));
        assert_eq!(tracker.top(Direction::Out), Some(1));
    }

    #[test]
    fn equal_priority_ties_go_to_the_later_arrival() {
        let mut tracker = PriorityTracker::new();
        tracker.consider_new_data(Direction::Out, 1, 100);
        tracker.commit(Direction::Out, 1, 100);
        let wins = tracker.consider_new_data(Direction::Out, 2, 100);
        assert!(wins);
        tracker.commit(Direction::Out, 2, 100);
        assert_eq!(tracker.top(Direction::Out), Some(2));
    }

    #[test]
    fn ending_a_non_top_stream_does_not_disturb_the_tracker() {
        let mut tracker = PriorityTracker::new();
        tracker.consider_new_data(Direction::Out, 1, 300);
        tracker.commit(Direction::Out, 1, 300);
        tracker.consider_new_data(Direction::Out, 2, 100);
        tracker.commit(Direction::Out, 2, 100);
        assert_eq!(tracker.top(Direction::Out), Some(1));

        assert!(!tracker.clear_if_top(Direction::Out, 2));
        assert_eq!(tracker.top(Direction::Out), Some(1));
    }

    #[test]
    fn directions_are_never_compared_against_each_other() {
        let mut tracker = PriorityTracker::new();
        tracker.consider_new_data(Direction::Out, 1, 1000);
        tracker.commit(Direction::Out, 1, 1000);
        tracker.consider_new_data(Direction::In, 2, 1);
        tracker.commit(Direction::In, 2, 1);
        assert_eq!(tracker.top(Direction::Out), Some(1));
        assert_eq!(tracker.top(Direction::In), Some(2));
    }
}
