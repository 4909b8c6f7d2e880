//! The Cached Mapping Table: a bounded, dirty-tracking LRU cache over
//! `maptbl` entries, backed by an arena so hash-chain, LRU-list, and
//! free-list membership are all just index juggling instead of separate
//! allocations per entry.

use arena_stack::Stack;

use crate::constants::INVALID_LPN;

const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dirty {
    Clean,
    Dirty,
}

#[derive(Debug, Clone)]
struct Entry {
    lpn: u64,
    ppn: u64,
    dirty: Dirty,
    // intrusive doubly linked LRU list
    prev: u32,
    next: u32,
    // singly linked hash chain
    hash_next: u32,
}

/// Outcome of evicting an entry, telling the caller whether a writeback to
/// the on-flash translation page is owed.
pub struct Evicted {
    pub lpn: u64,
    pub was_dirty: bool,
}

pub struct Cmt {
    entries: Vec<Entry>,
    free: Stack<u32>,
    buckets: Vec<u32>,
    head: u32,
    tail: u32,
    pub used: usize,
    pub capacity: usize,
}

fn bucket_count(capacity: usize) -> usize {
    // a prime-ish odd size keeps clustering down without pulling in a
    // dependency just for a prime sieve
    (capacity * 2 + 1).max(7)
}

impl Cmt {
    pub fn new(capacity: usize) -> Self {
        let entries = (0..capacity)
            .map(|_| Entry {
                lpn: INVALID_LPN,
                ppn: u64::MAX,
                dirty: Dirty::Clean,
                prev: NIL,
                next: NIL,
                hash_next: NIL,
            })
            .collect();
        Cmt {
            entries,
            free: Stack::filled_with_range(capacity),
            buckets: vec![NIL; bucket_count(capacity)],
            head: NIL,
            tail: NIL,
            used: 0,
            capacity,
        }
    }

    fn hash(&self, lpn: u64) -> usize {
        (lpn as usize) % self.buckets.len()
    }

    fn find(&self, lpn: u64) -> Option<u32> {
        let mut cur = self.buckets[self.hash(lpn)];
        while cur != NIL {
            if self.entries[cur as usize].lpn == lpn {
                return Some(cur);
            }
            cur = self.entries[cur as usize].hash_next;
        }
        None
    }

    fn unlink_lru(&mut self, idx: u32) {
        let (prev, next) = (self.entries[idx as usize].prev, self.entries[idx as usize].next);
        if prev != NIL {
            self.entries[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.entries[next as usize].prev = prev;
        } else {
            self.tail = prev;
        }
        self.entries[idx as usize].prev = NIL;
        self.entries[idx as usize].next = NIL;
    }

    fn push_front(&mut self, idx: u32) {
        self.entries[idx as usize].prev = NIL;
        self.entries[idx as usize].next = self.head;
        if self.head != NIL {
            self.entries[self.head as usize].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn hash_insert(&mut self, idx: u32) {
        let b = self.hash(self.entries[idx as usize].lpn);
        self.entries[idx as usize].hash_next = self.buckets[b];
        self.buckets[b] = idx;
    }

    fn hash_remove(&mut self, idx: u32) {
        let lpn = self.entries[idx as usize].lpn;
        let b = self.hash(lpn);
        let mut cur = self.buckets[b];
        if cur == idx {
            self.buckets[b] = self.entries[idx as usize].hash_next;
            return;
        }
        while cur != NIL {
            let next = self.entries[cur as usize].hash_next;
            if next == idx {
                self.entries[cur as usize].hash_next = self.entries[idx as usize].hash_next;
                return;
            }
            cur = next;
        }
    }

    /// Looks up `lpn`, promoting it to most-recently-used on a hit.
    /// Returns `(ppn, dirty)` of the hit entry.
    pub fn hit(&mut self, lpn: u64) -> Option<(u64, Dirty)> {
        let idx = self.find(lpn)?;
        self.unlink_lru(idx);
        self.push_front(idx);
        Some((self.entries[idx as usize].ppn, self.entries[idx as usize].dirty))
    }

    pub fn contains(&self, lpn: u64) -> bool {
        self.find(lpn).is_some()
    }

    /// Updates `ppn`/dirty bit in place without touching LRU order, for GC
    /// fixing up a mapping the CMT happens to still be holding. Returns
    /// whether an entry for `lpn` existed.
    pub fn update_in_place(&mut self, lpn: u64, ppn: u64) -> bool {
        match self.find(lpn) {
            Some(idx) => {
                self.entries[idx as usize].ppn = ppn;
                self.entries[idx as usize].dirty = Dirty::Dirty;
                true
            }
            None => false,
        }
    }

    /// Inserts a fresh (clean) entry. Panics via the fatal-abort path if
    /// called while the table is already at capacity; callers must evict
    /// first.
    pub fn insert(&mut self, lpn: u64, ppn: u64) {
        let idx = match self.free.pop() {
            Some(i) => i,
            None => crate::error::fatal(crate::error::FatalCondition::CmtOverCapacity),
        };
        self.entries[idx as usize] = Entry {
            lpn,
            ppn,
            dirty: Dirty::Clean,
            prev: NIL,
            next: NIL,
            hash_next: NIL,
        };
        self.push_front(idx);
        self.hash_insert(idx);
        self.used += 1;
    }

    pub fn mark_dirty(&mut self, lpn: u64, ppn: u64) {
        if let Some(idx) = self.find(lpn) {
            self.entries[idx as usize].ppn = ppn;
            self.entries[idx as usize].dirty = Dirty::Dirty;
        }
    }

    /// Evicts the least-recently-used entry (the tail of the LRU list).
    pub fn evict_lru(&mut self) -> Evicted {
        let idx = self.tail;
        debug_assert_ne!(idx, NIL, "evict_lru called on an empty CMT");
        self.unlink_lru(idx);
        self.hash_remove(idx);
        let entry = &self.entries[idx as usize];
        let result = Evicted {
            lpn: entry.lpn,
            was_dirty: entry.dirty == Dirty::Dirty,
        };
        self.entries[idx as usize].lpn = INVALID_LPN;
        self.entries[idx as usize].ppn = u64::MAX;
        self.entries[idx as usize].dirty = Dirty::Clean;
        self.free.push(idx);
        self.used -= 1;
        result
    }

    pub fn is_full(&self) -> bool {
        self.used >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_hit_promotes_to_front() {
        let mut cmt = Cmt::new(4);
        cmt.insert(1, 100);
        cmt.insert(2, 200);
        cmt.insert(3, 300);
        // touching lpn 1 should keep it alive past 2 and 3 on eviction
        cmt.hit(1);
        let ev = cmt.evict_lru();
        assert_eq!(ev.lpn, 2);
    }

    #[test]
    fn insert_up_to_capacity_then_evict_frees_a_slot() {
        let mut cmt = Cmt::new(2);
        cmt.insert(1, 100);
        cmt.insert(2, 200);
        assert!(cmt.is_full());
        let ev = cmt.evict_lru();
        assert_eq!(ev.lpn, 1);
        assert!(!cmt.is_full());
        cmt.insert(3, 300);
        assert!(cmt.is_full());
    }

    #[test]
    fn dirty_tracking_survives_reinsertion_after_hit() {
        let mut cmt = Cmt::new(4);
        cmt.insert(1, 100);
        cmt.mark_dirty(1, 101);
        let (ppn, dirty) = cmt.hit(1).unwrap();
        assert_eq!(ppn, 101);
        assert_eq!(dirty, Dirty::Dirty);
    }

    #[test]
    fn miss_on_absent_lpn() {
        let mut cmt = Cmt::new(4);
        cmt.insert(1, 100);
        assert!(cmt.hit(42).is_none());
    }
}
