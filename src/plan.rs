//! A time-ordered queue of pending work ("plans").
//!
//! `Context` stores every scheduled callback here. Plans fire in increasing order of time; plans
//! scheduled for the same time fire in the order they were added. Adding a plan and retrieving
//! the next one are both *O*(log(*n*)).
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A plan popped off the queue, ready to run.
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}

/// Stores payloads of type `T` ordered by `f64` time, then by insertion sequence.
pub struct PlanQueue<T> {
    queue: BinaryHeap<Entry<T>>,
    plan_counter: u64,
}

impl<T> PlanQueue<T> {
    #[must_use]
    pub fn new() -> PlanQueue<T> {
        PlanQueue {
            queue: BinaryHeap::new(),
            plan_counter: 0,
        }
    }

    pub fn add_plan(&mut self, time: f64, data: T) {
        self.queue.push(Entry {
            time,
            id: self.plan_counter,
            data,
        });
        self.plan_counter += 1;
    }

    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        self.queue.pop().map(|entry| Plan {
            time: entry.time,
            data: entry.data,
        })
    }
}

impl<T> Default for PlanQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry<T> {
    time: f64,
    id: u64,
    data: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// `BinaryHeap` is a max-heap, so both comparisons are reversed to pop the earliest
// time (and, among equal times, the lowest id) first.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_queue() {
        let mut plan_queue = PlanQueue::<()>::new();
        assert!(plan_queue.get_next_plan().is_none());
    }

    #[test]
    fn plans_come_out_in_time_order() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(3.0, "third");
        plan_queue.add_plan(1.0, "first");
        plan_queue.add_plan(2.0, "second");

        let order: Vec<(f64, &str)> = std::iter::from_fn(|| plan_queue.get_next_plan())
            .map(|plan| (plan.time, plan.data))
            .collect();
        assert_eq!(order, vec![(1.0, "first"), (2.0, "second"), (3.0, "third")]);
    }

    #[test]
    fn equal_times_keep_insertion_order() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, 1);
        plan_queue.add_plan(1.0, 2);
        plan_queue.add_plan(1.0, 3);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 1);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 2);
        assert_eq!(plan_queue.get_next_plan().unwrap().data, 3);
    }

    #[test]
    fn plans_added_while_draining_interleave_by_time() {
        let mut plan_queue = PlanQueue::new();
        plan_queue.add_plan(1.0, "a");
        plan_queue.add_plan(3.0, "c");
        assert_eq!(plan_queue.get_next_plan().unwrap().data, "a");
        plan_queue.add_plan(2.0, "b");
        assert_eq!(plan_queue.get_next_plan().unwrap().data, "b");
        assert_eq!(plan_queue.get_next_plan().unwrap().data, "c");
        assert!(plan_queue.get_next_plan().is_none());
    }
}
