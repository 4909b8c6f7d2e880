//! Translation-page I/O: reading/writing the on-flash pages that back the
//! global translation directory, and the demand-paging glue that keeps the
//! CMT populated from them.

use crate::device::Ssd;
use crate::geometry::Ppa;
use crate::timing::NandCmdKind;

impl Ssd {
    /// Charges a translation-page read at the request's own submission
    /// time, as part of a foreground (user I/O) operation.
    pub fn translation_page_read(&mut self, ppa: &Ppa, stime: u64) -> u64 {
        self.advance_status(ppa, NandCmdKind::Read, stime)
    }

    /// Same as [`Self::translation_page_read`] but charged at time zero,
    /// for translation reads triggered by eviction/GC rather than directly
    /// by a host request.
    pub fn translation_page_read_no_req(&mut self, ppa: &Ppa) -> u64 {
        self.advance_status(ppa, NandCmdKind::Read, 0)
    }

    /// Writes back an updated translation page: invalidates the old
    /// physical copy (if any), allocates a fresh page from the translation
    /// write frontier, and updates the GTD/rmap to point at it.
    pub fn translation_page_write(&mut self, old_ppa: &Ppa) -> u64 {
        debug_assert!(old_ppa.is_mapped(), "translation_page_write expects an existing translation page");
        let tvpn = self.addrmap.get_rmap_ent(old_ppa.to_pgidx(&self.params));

        self.mark_page_invalid(old_ppa);
        self.addrmap.set_rmap_ent(old_ppa.to_pgidx(&self.params), crate::constants::INVALID_LPN);

        let new_ppa = self.get_new_trans_page();
        self.addrmap.set_gtd_ent(tvpn, new_ppa);
        self.addrmap.set_rmap_ent(new_ppa.to_pgidx(&self.params), tvpn);
        self.mark_page_valid(&new_ppa);
        self.advance_trans_write_pointer();

        self.advance_status(&new_ppa, NandCmdKind::Write, 0)
    }

    /// Writes a brand-new translation page for a `tvpn` that has never had
    /// one before (no old copy to invalidate).
    pub fn translation_page_new_write(&mut self, tvpn: u64) -> u64 {
        let new_ppa = self.get_new_trans_page();
        self.addrmap.set_gtd_ent(tvpn, new_ppa);
        self.addrmap.set_rmap_ent(new_ppa.to_pgidx(&self.params), tvpn);
        self.mark_page_valid(&new_ppa);
        self.advance_trans_write_pointer();

        self.advance_status(&new_ppa, NandCmdKind::Write, 0)
    }

    /// Evicts the CMT's LRU entry if dirty, writing its translation page
    /// back (new write if the GTD slot was never populated, else a
    /// read-modify-write of the existing translation page).
    fn evict_cmt_entry(&mut self) {
        let evicted = self.cmt.evict_lru();
        if !evicted.was_dirty {
            return;
        }
        let tvpn = evicted.lpn / self.params.ents_per_pg as u64;
        let ppa = self.addrmap.get_gtd_ent(tvpn);
        if !ppa.is_mapped() || !ppa.is_valid_for(&self.params) {
            self.translation_page_new_write(tvpn);
        } else {
            self.translation_page_read_no_req(&ppa);
            self.translation_page_write(&ppa);
        }
    }

    /// Inserts `(lpn, ppn)` into the CMT, evicting the LRU entry first if
    /// the table is already full.
    fn insert_or_evict_then_insert(&mut self, lpn: u64, ppn: u64) {
        if self.cmt.is_full() {
            self.evict_cmt_entry();
        }
        self.cmt.insert(lpn, ppn);
    }

    /// Demand-pages a mapping in on a CMT read miss: reads the owning
    /// translation page, then inserts the resolved entry (possibly
    /// unmapped, if the LPN has genuinely never been written).
    ///
    /// Returns the translation page's LUN's `next_avail_time` once that
    /// read has been charged, so the caller can serialize the subsequent
    /// data-page read behind it even when the two pages live on different
    /// LUNs. Returns `None` when no translation read happened (GTD slot
    /// still unmapped).
    pub fn process_translation_page_read(&mut self, lpn: u64, stime: u64) -> Option<u64> {
        let tvpn = lpn / self.params.ents_per_pg as u64;
        let ppa = self.addrmap.get_gtd_ent(tvpn);
        if !ppa.is_mapped() || !ppa.is_valid_for(&self.params) {
            return None;
        }
        self.translation_page_read(&ppa, stime);
        let trans_lun_avail = self.get_lun_mut(&ppa).next_avail_time;

        let data_ppa = self.addrmap.get_maptbl_ent(lpn);
        if data_ppa.is_mapped() && data_ppa.is_valid_for(&self.params) {
            let ppn = data_ppa.to_pgidx(&self.params);
            self.insert_or_evict_then_insert(lpn, ppn);
        }
        Some(trans_lun_avail)
    }

    /// Demand-pages a mapping in on a CMT write miss. A GTD slot that
    /// isn't mapped yet means this LPN has never been written: the CMT
    /// still gets an entry (unmapped ppn), it'll be filled in by the write
    /// path that called us.
    pub fn process_translation_page_write(&mut self, lpn: u64, stime: u64) {
        let tvpn = lpn / self.params.ents_per_pg as u64;
        let ppa = self.addrmap.get_gtd_ent(tvpn);

        if !ppa.is_mapped() || !ppa.is_valid_for(&self.params) {
            self.insert_or_evict_then_insert(lpn, u64::MAX);
            return;
        }

        self.translation_page_read(&ppa, stime);
        let data_ppa = self.addrmap.get_maptbl_ent(lpn);
        if !data_ppa.is_mapped() || !data_ppa.is_valid_for(&self.params) {
            self.insert_or_evict_then_insert(lpn, u64::MAX);
        } else {
            let ppn = data_ppa.to_pgidx(&self.params);
            self.insert_or_evict_then_insert(lpn, ppn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SsdParams;
    use crate::request::{Opcode, Request};

    #[test]
    fn cmt_eviction_under_pressure_writes_back_dirty_entries() {
        let mut ssd = Ssd::new(SsdParams::small_for_test());
        let cap = ssd.cmt.capacity as u64;
        // write enough distinct LPNs to force at least one eviction
        for lpn in 0..cap + 2 {
            let req = Request::new(Opcode::Write, lpn * ssd.params.secs_per_pg as u64, ssd.params.secs_per_pg as u32, 0);
            ssd.write(&req);
        }
        assert!(ssd.stats.cmt_miss_cnt >= cap + 2);
    }
}
