//! Bounded, non-blocking rings for handing request objects between a host
//! (command-queue poller) and a single FTL worker thread.
//!
//! Each direction gets its own ring: `to_ftl[i]` carries commands from
//! poller `i` to the worker, `to_poller[i]` carries completions back. Both
//! are used single-producer/single-consumer in practice, but are built on
//! `crossbeam`'s lock-free bounded queue so they remain correct if a caller
//! ever needs more than one producer or consumer.

use crossbeam::queue::ArrayQueue;
use std::collections::VecDeque;

pub struct Ring<T> {
    queue: ArrayQueue<T>,
}

impl<T> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Enqueues a single item. Non-blocking: returns the item back on
    /// failure if the ring is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.queue.push(item)
    }

    /// Non-blocking dequeue of a single item.
    pub fn try_pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Enqueues as many items from `items` as fit, draining them off the
    /// front in order. Returns the number of elements transferred.
    pub fn enqueue(&self, items: &mut VecDeque<T>) -> usize {
        let mut n = 0;
        while let Some(item) = items.pop_front() {
            match self.queue.push(item) {
                Ok(()) => n += 1,
                Err(item) => {
                    items.push_front(item);
                    break;
                }
            }
        }
        n
    }

    /// Dequeues up to `max` items into `out`. Returns the number
    /// transferred.
    pub fn dequeue(&self, out: &mut Vec<T>, max: usize) -> usize {
        let mut n = 0;
        while n < max {
            match self.queue.pop() {
                Some(item) => {
                    out.push(item);
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_roundtrip() {
        let ring: Ring<u32> = Ring::new(4);
        assert!(ring.try_push(1).is_ok());
        assert!(ring.try_push(2).is_ok());
        assert_eq!(ring.try_pop(), Some(1));
        assert_eq!(ring.try_pop(), Some(2));
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn push_fails_when_full() {
        let ring: Ring<u32> = Ring::new(2);
        assert!(ring.try_push(1).is_ok());
        assert!(ring.try_push(2).is_ok());
        assert_eq!(ring.try_push(3), Err(3));
    }

    #[test]
    fn enqueue_dequeue_counts() {
        let ring: Ring<u32> = Ring::new(3);
        let mut items: VecDeque<u32> = vec![1, 2, 3, 4, 5].into();
        let n = ring.enqueue(&mut items);
        assert_eq!(n, 3);
        assert_eq!(items, VecDeque::from(vec![4, 5]));

        let mut out = Vec::new();
        let n = ring.dequeue(&mut out, 10);
        assert_eq!(n, 3);
        assert_eq!(out, vec![1, 2, 3]);
    }
}
