//! Garbage collection: victim selection and the copy-forward loops that
//! reclaim a data or translation super-block.

use smallvec::SmallVec;

use crate::device::Ssd;
use crate::geometry::Ppa;
use crate::line::LineType;
use crate::timing::NandCmdKind;

impl Ssd {
    fn gc_read_page(&mut self, ppa: &Ppa) {
        if self.params.enable_gc_delay {
            self.advance_status(ppa, NandCmdKind::Read, 0);
        }
    }

    /// Copies a still-valid data page forward to a fresh page on the data
    /// write frontier, updating maptbl/rmap to point at the new location.
    fn gc_write_page(&mut self, old_ppa: &Ppa) {
        let lpn = self.addrmap.get_rmap_ent(old_ppa.to_pgidx(&self.params));
        let new_ppa = self.get_new_page();
        self.addrmap.set_maptbl_ent(lpn, new_ppa);
        self.addrmap.set_rmap_ent(new_ppa.to_pgidx(&self.params), lpn);
        self.mark_page_valid(&new_ppa);
        self.advance_write_pointer();

        if self.params.enable_gc_delay {
            self.advance_status(&new_ppa, NandCmdKind::Write, 0);
        }
    }

    /// Same as [`Self::gc_write_page`] but for a translation page: updates
    /// the GTD instead of maptbl.
    fn gc_translation_page_write(&mut self, old_ppa: &Ppa) {
        let tvpn = self.addrmap.get_rmap_ent(old_ppa.to_pgidx(&self.params));
        let new_ppa = self.get_new_trans_page();
        self.addrmap.set_gtd_ent(tvpn, new_ppa);
        self.addrmap.set_rmap_ent(new_ppa.to_pgidx(&self.params), tvpn);
        self.mark_page_valid(&new_ppa);
        self.advance_trans_write_pointer();

        if self.params.enable_gc_delay {
            self.advance_status(&new_ppa, NandCmdKind::Write, 0);
        }
    }

    /// Copies every still-valid page out of a victim data block. Deduplicates
    /// translation-page writebacks per block with a small inline buffer,
    /// since several LPNs in the same block can share a `tvpn`.
    fn clean_one_data_block(&mut self, ppa: &mut Ppa) {
        let pgs_per_blk = self.params.pgs_per_blk;
        let ents_per_pg = self.params.ents_per_pg as u64;
        let mut batch_update: SmallVec<[u64; 32]> = SmallVec::new();

        for pg in 0..pgs_per_blk {
            ppa.pg = pg as u32;
            let status = self.get_page_mut(ppa).status;
            debug_assert_ne!(status, crate::geometry::PageStatus::Free);
            if status != crate::geometry::PageStatus::Valid {
                continue;
            }

            self.gc_read_page(ppa);
            let lpn = self.addrmap.get_rmap_ent(ppa.to_pgidx(&self.params));
            let owning_ppa = self.addrmap.get_maptbl_ent(lpn);
            if ppa.to_pgidx(&self.params) != owning_ppa.to_pgidx(&self.params) {
                log::warn!("data block contains a page whose rmap entry is stale");
                continue;
            }

            self.gc_write_page(ppa);
            let new_ppa = self.addrmap.get_maptbl_ent(lpn);
            let new_ppn = new_ppa.to_pgidx(&self.params);
            if !self.cmt.update_in_place(lpn, new_ppn) {
                let tvpn = lpn / ents_per_pg;
                if !batch_update.contains(&tvpn) {
                    batch_update.push(tvpn);
                    let trans_ppa = self.addrmap.get_gtd_ent(tvpn);
                    self.translation_page_read_no_req(&trans_ppa);
                    self.translation_page_write(&trans_ppa);
                }
            }
        }
    }

    /// Copies every still-valid page out of a victim translation block.
    fn clean_one_trans_block(&mut self, ppa: &mut Ppa) {
        let pgs_per_blk = self.params.pgs_per_blk;
        for pg in 0..pgs_per_blk {
            ppa.pg = pg as u32;
            let status = self.get_page_mut(ppa).status;
            debug_assert_ne!(status, crate::geometry::PageStatus::Free);
            if status != crate::geometry::PageStatus::Valid {
                continue;
            }

            self.gc_read_page(ppa);
            let tvpn = self.addrmap.get_rmap_ent(ppa.to_pgidx(&self.params));
            let owning_ppa = self.addrmap.get_gtd_ent(tvpn);
            if ppa.to_pgidx(&self.params) != owning_ppa.to_pgidx(&self.params) {
                log::warn!("translation block contains a page whose GTD entry is stale");
                continue;
            }
            self.gc_translation_page_write(ppa);
        }
    }

    /// Reclaims one super-block: selects a victim line (or bails if none
    /// qualifies), walks every channel/LUN to clean and erase its block,
    /// then returns the line to the free list. Returns `None` if there was
    /// no eligible victim.
    pub fn do_gc(&mut self, force: bool) -> Option<()> {
        let victim_id = self.lm.select_victim_line(&self.params, force)?;
        let victim_type = self.lm.lines[victim_id as usize].line_type;

        for ch in 0..self.params.nchs as u32 {
            for lun in 0..self.params.luns_per_ch as u32 {
                let mut ppa = Ppa {
                    ch,
                    lun,
                    pl: 0,
                    blk: victim_id,
                    pg: 0,
                    sec: 0,
                };

                match victim_type {
                    LineType::Data => self.clean_one_data_block(&mut ppa),
                    LineType::Trans => self.clean_one_trans_block(&mut ppa),
                    LineType::None => log::error!("victim line had no type set"),
                }

                self.mark_block_free(&ppa);

                if self.params.enable_gc_delay {
                    self.advance_status(&ppa, NandCmdKind::Erase, 0);
                }

                let lun_state = self.get_lun_mut(&ppa);
                lun_state.gc_endtime = lun_state.next_avail_time;
            }
        }

        self.lm.mark_line_free(victim_id);
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SsdParams;
    use crate::request::{Opcode, Request};

    #[test]
    fn gc_is_a_noop_when_nothing_qualifies_as_a_victim() {
        let mut ssd = Ssd::new(SsdParams::small_for_test());
        assert_eq!(ssd.do_gc(false), None);
    }

    #[test]
    fn repeated_overwrites_eventually_produce_a_gc_candidate() {
        let p = SsdParams::small_for_test();
        let mut ssd = Ssd::new(p);
        let secs = ssd.params.secs_per_pg as u32;

        // overwrite the same LPN range enough times to invalidate a full
        // super-block's worth of pages, forcing some line onto the victim
        // queue.
        for t in 0..(p.pgs_per_line as u64 + 4) {
            let req = Request::new(Opcode::Write, 0, secs, t);
            ssd.write(&req);
        }

        assert!(ssd.lm.victim_line_cnt > 0 || ssd.lm.full_line_cnt > 0);
    }
}
