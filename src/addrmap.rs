//! The two-level address map: `maptbl` (LPN -> PPA, fully resident),
//! `rmap` (PPA -> LPN, the reverse map used by GC to find who owns a page),
//! and `gtd` (the global translation directory: which physical page holds
//! the on-flash translation page for a given LPN range).

use crate::constants::INVALID_LPN;
use crate::geometry::{Ppa, SsdParams};

pub struct AddressMap {
    maptbl: Vec<Ppa>,
    rmap: Vec<u64>,
    gtd: Vec<Ppa>,
}

impl AddressMap {
    pub fn new(p: &SsdParams) -> Self {
        AddressMap {
            maptbl: vec![Ppa::UNMAPPED; p.tt_pgs],
            rmap: vec![INVALID_LPN; p.tt_pgs],
            gtd: vec![Ppa::UNMAPPED; p.tt_gtd_size],
        }
    }

    pub fn get_maptbl_ent(&self, lpn: u64) -> Ppa {
        self.maptbl[lpn as usize]
    }

    pub fn set_maptbl_ent(&mut self, lpn: u64, ppa: Ppa) {
        self.maptbl[lpn as usize] = ppa;
    }

    pub fn get_rmap_ent(&self, pgidx: u64) -> u64 {
        self.rmap[pgidx as usize]
    }

    /// Points a physical page back at the LPN it currently holds. `lpn ==
    /// INVALID_LPN` clears the entry (the page has been invalidated or
    /// erased).
    pub fn set_rmap_ent(&mut self, pgidx: u64, lpn: u64) {
        self.rmap[pgidx as usize] = lpn;
    }

    /// `tvpn` is the translation-page index (`lpn / ents_per_pg`), already
    /// computed by the caller — this indexes `gtd` directly rather than
    /// dividing again.
    pub fn get_gtd_ent(&self, tvpn: u64) -> Ppa {
        self.gtd[tvpn as usize]
    }

    pub fn set_gtd_ent(&mut self, tvpn: u64, ppa: Ppa) {
        self.gtd[tvpn as usize] = ppa;
    }

    pub fn tt_pgs(&self) -> usize {
        self.maptbl.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_map_is_entirely_unmapped() {
        let p = SsdParams::small_for_test();
        let m = AddressMap::new(&p);
        assert!(!m.get_maptbl_ent(0).is_mapped());
        assert_eq!(m.get_rmap_ent(0), INVALID_LPN);
        assert!(!m.get_gtd_ent(0).is_mapped());
    }

    #[test]
    fn maptbl_and_rmap_are_independently_settable() {
        let p = SsdParams::small_for_test();
        let mut m = AddressMap::new(&p);
        let ppa = Ppa { ch: 0, lun: 0, pl: 0, blk: 1, pg: 2, sec: 0 };
        m.set_maptbl_ent(5, ppa);
        m.set_rmap_ent(ppa.to_pgidx(&p), 5);
        assert_eq!(m.get_maptbl_ent(5), ppa);
        assert_eq!(m.get_rmap_ent(ppa.to_pgidx(&p)), 5);
    }

    #[test]
    fn gtd_entries_are_shared_across_a_translation_page_range() {
        let p = SsdParams::small_for_test();
        let mut m = AddressMap::new(&p);
        let ppa = Ppa { ch: 0, lun: 1, pl: 0, blk: 0, pg: 0, sec: 0 };

        // Every lpn in [0, ents_per_pg) resolves to the same tvpn, and thus
        // the same gtd slot, as the caller is responsible for dividing down
        // to tvpn before calling get/set_gtd_ent.
        let lpn_a = 0u64;
        let lpn_b = 1u64;
        let lpn_c = p.ents_per_pg as u64 - 1;
        let tvpn = lpn_a / p.ents_per_pg as u64;
        assert_eq!(tvpn, lpn_b / p.ents_per_pg as u64);
        assert_eq!(tvpn, lpn_c / p.ents_per_pg as u64);

        m.set_gtd_ent(tvpn, ppa);
        assert_eq!(m.get_gtd_ent(tvpn), ppa);
    }
}
