//! Super-block ("line") bookkeeping: the free/victim/full line lists, the
//! victim priority queue used to pick a GC target, and the two write
//! frontiers (data and translation) that hand out fresh pages.

use std::collections::HashSet;

use crate::error::{fatal, FatalCondition};
use crate::geometry::{Ppa, SsdParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    None,
    Data,
    Trans,
}

#[derive(Debug, Clone)]
pub struct Line {
    pub id: u32,
    pub ipc: u32,
    pub vpc: u32,
    pub line_type: LineType,
    /// 1-based position in the victim heap; 0 means "not currently queued".
    pos: usize,
}

impl Line {
    fn new(id: u32) -> Self {
        Line {
            id,
            ipc: 0,
            vpc: 0,
            line_type: LineType::None,
            pos: 0,
        }
    }

    fn in_queue(&self) -> bool {
        self.pos != 0
    }
}

/// Which comparator the victim queue surfaces first. The device this model
/// is based on always runs `HighestVpc`; `HighestIpc` is offered as an
/// explicit alternative since a controller could just as well prioritize
/// the line with the most garbage instead of the most live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VictimPolicy {
    HighestVpc,
    HighestIpc,
}

impl VictimPolicy {
    fn priority(&self, line: &Line) -> u32 {
        match self {
            VictimPolicy::HighestVpc => line.vpc,
            VictimPolicy::HighestIpc => line.ipc,
        }
    }
}

/// A binary max-heap of line ids keyed by [`VictimPolicy::priority`], with
/// O(log n) decrease/increase-key support via a `pos` field stored directly
/// on each `Line`. `heap[0]` is unused so 1-based sift math is simpler.
pub struct VictimPriorityQueue {
    heap: Vec<u32>,
    policy: VictimPolicy,
}

impl VictimPriorityQueue {
    fn new(capacity: usize, policy: VictimPolicy) -> Self {
        let mut heap = Vec::with_capacity(capacity + 1);
        heap.push(u32::MAX); // sentinel at index 0
        VictimPriorityQueue { heap, policy }
    }

    fn len(&self) -> usize {
        self.heap.len() - 1
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prio(&self, lines: &[Line], id: u32) -> u32 {
        self.policy.priority(&lines[id as usize])
    }

    fn swap(&mut self, lines: &mut [Line], i: usize, j: usize) {
        self.heap.swap(i, j);
        lines[self.heap[i] as usize].pos = i;
        lines[self.heap[j] as usize].pos = j;
    }

    fn sift_up(&mut self, lines: &mut [Line], mut i: usize) {
        while i > 1 {
            let parent = i / 2;
            if self.prio(lines, self.heap[i]) > self.prio(lines, self.heap[parent]) {
                self.swap(lines, i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, lines: &mut [Line], mut i: usize) {
        let n = self.len();
        loop {
            let (l, r) = (2 * i, 2 * i + 1);
            let mut largest = i;
            if l <= n && self.prio(lines, self.heap[l]) > self.prio(lines, self.heap[largest]) {
                largest = l;
            }
            if r <= n && self.prio(lines, self.heap[r]) > self.prio(lines, self.heap[largest]) {
                largest = r;
            }
            if largest == i {
                break;
            }
            self.swap(lines, i, largest);
            i = largest;
        }
    }

    pub fn insert(&mut self, lines: &mut [Line], id: u32) {
        self.heap.push(id);
        let pos = self.heap.len() - 1;
        lines[id as usize].pos = pos;
        self.sift_up(lines, pos);
    }

    pub fn peek(&self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.heap[1])
        }
    }

    /// Pops the highest-priority line and clears its `pos`.
    pub fn pop(&mut self, lines: &mut [Line]) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        let top = self.heap[1];
        let last = self.heap.pop().unwrap();
        lines[top as usize].pos = 0;
        if !self.is_empty() {
            self.heap[1] = last;
            lines[last as usize].pos = 1;
            self.sift_down(lines, 1);
        }
        Some(top)
    }

    /// Re-heapifies `id` after its priority field has already changed
    /// in-place (used when an overwrite decrements `vpc` under a queued
    /// line). No-op if `id` isn't currently queued.
    pub fn reheap(&mut self, lines: &mut [Line], id: u32) {
        let pos = lines[id as usize].pos;
        if pos == 0 {
            return;
        }
        self.sift_up(lines, pos);
        self.sift_down(lines, pos);
    }
}

pub struct LineManager {
    pub lines: Vec<Line>,
    free_list: Vec<u32>,
    full_list: HashSet<u32>,
    pub victim_pq: VictimPriorityQueue,
    pub free_line_cnt: usize,
    pub full_line_cnt: usize,
    pub victim_line_cnt: usize,
}

impl LineManager {
    pub fn new(p: &SsdParams, policy: VictimPolicy) -> Self {
        let lines: Vec<Line> = (0..p.tt_lines as u32).map(Line::new).collect();
        let free_list: Vec<u32> = (0..p.tt_lines as u32).rev().collect();
        LineManager {
            free_line_cnt: free_list.len(),
            lines,
            free_list,
            full_list: HashSet::new(),
            victim_pq: VictimPriorityQueue::new(p.tt_lines, policy),
            full_line_cnt: 0,
            victim_line_cnt: 0,
        }
    }

    fn take_free_line(&mut self) -> Option<u32> {
        let id = self.free_list.pop();
        if id.is_some() {
            self.free_line_cnt -= 1;
        }
        id
    }

    pub fn get_line(&self, ppa: &Ppa) -> &Line {
        &self.lines[ppa.blk as usize]
    }

    pub fn get_line_mut(&mut self, ppa: &Ppa) -> &mut Line {
        &mut self.lines[ppa.blk as usize]
    }

    /// Retires the line a write pointer just finished filling: full lines
    /// (no invalid pages yet) go to the full set, everything else becomes a
    /// GC candidate. Returns the freshly allocated replacement line id.
    fn retire_and_replace(&mut self, finished: u32, p: &SsdParams, kind: LineType) -> u32 {
        let vpc = self.lines[finished as usize].vpc;
        if vpc == p.pgs_per_line as u32 {
            self.full_list.insert(finished);
            self.full_line_cnt += 1;
        } else {
            self.victim_pq.insert(&mut self.lines, finished);
            self.victim_line_cnt += 1;
        }

        let next = match self.take_free_line() {
            Some(id) => id,
            None => fatal(FatalCondition::NoFreeLine),
        };
        self.lines[next as usize].line_type = kind;
        next
    }

    pub fn select_victim_line(&mut self, p: &SsdParams, force: bool) -> Option<u32> {
        let top = self.victim_pq.peek()?;
        if !force && self.lines[top as usize].ipc < p.pgs_per_line as u32 / crate::constants::GC_VICTIM_IPC_GATE_DENOM {
            return None;
        }
        let id = self.victim_pq.pop(&mut self.lines).unwrap();
        self.victim_line_cnt -= 1;
        Some(id)
    }

    pub fn mark_line_free(&mut self, id: u32) {
        let line = &mut self.lines[id as usize];
        line.ipc = 0;
        line.vpc = 0;
        line.line_type = LineType::None;
        self.free_list.push(id);
        self.free_line_cnt += 1;
    }

    /// Marks the line owning `ppa` as having one fewer valid page. If the
    /// line was sitting in the full-line set (not yet queued for GC), this
    /// is the transition that makes it eligible: it moves into the victim
    /// queue. Returns the line's new `vpc` for the caller (block/page
    /// accounting lives in [`crate::device::Ssd`]).
    pub fn on_page_invalidated(&mut self, ppa: &Ppa, p: &SsdParams) -> u32 {
        let id = ppa.blk;
        let was_full = self.lines[id as usize].vpc == p.pgs_per_line as u32;
        self.lines[id as usize].ipc += 1;

        if self.lines[id as usize].in_queue() {
            self.lines[id as usize].vpc -= 1;
            self.victim_pq.reheap(&mut self.lines, id);
        } else {
            self.lines[id as usize].vpc -= 1;
        }

        if was_full {
            self.full_list.remove(&id);
            self.full_line_cnt -= 1;
            self.victim_pq.insert(&mut self.lines, id);
            self.victim_line_cnt += 1;
        }

        self.lines[id as usize].vpc
    }

    pub fn on_page_validated(&mut self, ppa: &Ppa) {
        self.lines[ppa.blk as usize].vpc += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierKind {
    Data,
    Trans,
}

/// One of the two append-only write frontiers (data / translation pages).
/// Increments channel, then LUN, then page, wrapping into a fresh line
/// once the current super-block's last page has been handed out.
pub struct WritePointer {
    kind: FrontierKind,
    ch: u32,
    lun: u32,
    pg: u32,
    pub curline: u32,
}

impl WritePointer {
    pub fn new(kind: FrontierKind, lm: &mut LineManager) -> Self {
        let id = lm.take_free_line().unwrap_or_else(|| fatal(FatalCondition::NoFreeLine));
        lm.lines[id as usize].line_type = match kind {
            FrontierKind::Data => LineType::Data,
            FrontierKind::Trans => LineType::Trans,
        };
        WritePointer {
            kind,
            ch: 0,
            lun: 0,
            pg: 0,
            curline: id,
        }
    }

    pub fn peek(&self) -> Ppa {
        Ppa {
            ch: self.ch,
            lun: self.lun,
            pl: 0,
            blk: self.curline,
            pg: self.pg,
            sec: 0,
        }
    }

    /// Advances channel -> lun -> page in that order, rolling the current
    /// line into the full/victim lists and allocating a fresh one once the
    /// last page of the super-block has been consumed.
    pub fn advance(&mut self, lm: &mut LineManager, p: &SsdParams) {
        self.ch += 1;
        if self.ch == p.nchs as u32 {
            self.ch = 0;
            self.lun += 1;
            if self.lun == p.luns_per_ch as u32 {
                self.lun = 0;
                self.pg += 1;
                if self.pg == p.pgs_per_blk as u32 {
                    self.pg = 0;
                    let kind = match self.kind {
                        FrontierKind::Data => LineType::Data,
                        FrontierKind::Trans => LineType::Trans,
                    };
                    self.curline = lm.retire_and_replace(self.curline, p, kind);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_pointer_walks_channels_then_luns_then_pages() {
        let p = SsdParams::small_for_test();
        let mut lm = LineManager::new(&p, VictimPolicy::HighestVpc);
        let mut wp = WritePointer::new(FrontierKind::Data, &mut lm);

        let first = wp.peek();
        assert_eq!((first.ch, first.lun, first.pg), (0, 0, 0));

        wp.advance(&mut lm, &p);
        let second = wp.peek();
        assert_eq!((second.ch, second.lun, second.pg), (1, 0, 0));
    }

    #[test]
    fn filling_a_super_block_retires_it_as_full_when_no_invalidations() {
        let p = SsdParams::small_for_test();
        let mut lm = LineManager::new(&p, VictimPolicy::HighestVpc);
        let mut wp = WritePointer::new(FrontierKind::Data, &mut lm);
        let first_line = wp.curline;

        for _ in 0..p.pgs_per_line {
            let ppa = wp.peek();
            lm.lines[ppa.blk as usize].vpc += 1;
            wp.advance(&mut lm, &p);
        }

        assert!(lm.full_list.contains(&first_line));
        assert_eq!(lm.full_line_cnt, 1);
        assert_ne!(wp.curline, first_line);
    }

    #[test]
    fn victim_pq_pops_highest_vpc_first() {
        let p = SsdParams::small_for_test();
        let mut lm = LineManager::new(&p, VictimPolicy::HighestVpc);
        lm.lines[0].vpc = 3;
        lm.lines[1].vpc = 7;
        lm.lines[2].vpc = 5;
        lm.victim_pq.insert(&mut lm.lines, 0);
        lm.victim_pq.insert(&mut lm.lines, 1);
        lm.victim_pq.insert(&mut lm.lines, 2);

        assert_eq!(lm.victim_pq.pop(&mut lm.lines), Some(1));
        assert_eq!(lm.victim_pq.pop(&mut lm.lines), Some(2));
        assert_eq!(lm.victim_pq.pop(&mut lm.lines), Some(0));
    }

    #[test]
    fn select_victim_line_is_gated_by_ipc_unless_forced() {
        let p = SsdParams::small_for_test();
        let mut lm = LineManager::new(&p, VictimPolicy::HighestVpc);
        lm.lines[0].vpc = 10;
        lm.lines[0].ipc = 0;
        lm.victim_pq.insert(&mut lm.lines, 0);
        lm.victim_line_cnt += 1;

        assert_eq!(lm.select_victim_line(&p, false), None);
        assert_eq!(lm.select_victim_line(&p, true), Some(0));
    }
}
