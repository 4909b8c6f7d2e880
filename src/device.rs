//! The `Ssd`: the single struct that owns every piece of mutable FTL
//! state. Nothing under here is shared across threads; a [`crate::worker`]
//! spins exactly one of these up and owns it for the process lifetime.

use crate::addrmap::AddressMap;
use crate::cmt::Cmt;
use crate::constants::INVALID_LPN;
use crate::error::{fatal, FatalCondition};
use crate::geometry::{build_channels, Channel, Page, PageStatus, Ppa, SsdParams};
use crate::line::{FrontierKind, LineManager, VictimPolicy, WritePointer};
use crate::request::{Opcode, Request};
use crate::stats::Statistics;
use crate::timing::NandCmdKind;

pub struct Ssd {
    pub params: SsdParams,
    pub channels: Vec<Channel>,
    pub addrmap: AddressMap,
    pub lm: LineManager,
    pub cmt: Cmt,
    pub wp: WritePointer,
    pub twp: WritePointer,
    pub stats: Statistics,
}

impl Ssd {
    pub fn new(params: SsdParams) -> Self {
        Self::with_victim_policy(params, VictimPolicy::HighestVpc)
    }

    pub fn with_victim_policy(params: SsdParams, policy: VictimPolicy) -> Self {
        let channels = build_channels(&params);
        let addrmap = AddressMap::new(&params);
        let mut lm = LineManager::new(&params, policy);
        let wp = WritePointer::new(FrontierKind::Data, &mut lm);
        let twp = WritePointer::new(FrontierKind::Trans, &mut lm);
        let cmt = Cmt::new(params.tt_cmt_size);

        Ssd {
            params,
            channels,
            addrmap,
            lm,
            cmt,
            wp,
            twp,
            stats: Statistics::new(),
        }
    }

    pub fn get_lun_mut(&mut self, ppa: &Ppa) -> &mut crate::geometry::Lun {
        &mut self.channels[ppa.ch as usize].luns[ppa.lun as usize]
    }

    pub fn get_block_mut(&mut self, ppa: &Ppa) -> &mut crate::geometry::Block {
        &mut self.channels[ppa.ch as usize].luns[ppa.lun as usize].planes[ppa.pl as usize].blocks[ppa.blk as usize]
    }

    pub fn get_page_mut(&mut self, ppa: &Ppa) -> &mut Page {
        &mut self.get_block_mut(ppa).pages[ppa.pg as usize]
    }

    /// Advances the owning LUN's clock for this command, charging `lat`
    /// against whichever is later: the command's own start time or the
    /// LUN's prior busy-until time. Returns the latency the *caller*
    /// experiences (completion time minus `stime`), matching the timing
    /// model's convention of reporting added delay, not absolute time.
    pub fn advance_status(&mut self, ppa: &Ppa, kind: NandCmdKind, stime: u64) -> u64 {
        let lun = self.get_lun_mut(ppa);
        let completion = lun.advance(stime, kind, &self.params);
        completion - stime
    }

    pub fn should_gc(&self) -> bool {
        self.lm.free_line_cnt <= self.params.gc_thres_lines
    }

    pub fn should_gc_high(&self) -> bool {
        self.lm.free_line_cnt <= self.params.gc_thres_lines_high
    }

    pub fn get_new_page(&self) -> Ppa {
        self.wp.peek()
    }

    pub fn get_new_trans_page(&self) -> Ppa {
        self.twp.peek()
    }

    pub fn advance_write_pointer(&mut self) {
        self.wp.advance(&mut self.lm, &self.params);
    }

    pub fn advance_trans_write_pointer(&mut self) {
        self.twp.advance(&mut self.lm, &self.params);
    }

    /// Transitions a page `Valid -> Invalid`, propagating the bookkeeping
    /// up through the owning block and line.
    pub fn mark_page_invalid(&mut self, ppa: &Ppa) {
        {
            let pg = self.get_page_mut(ppa);
            debug_assert_eq!(pg.status, PageStatus::Valid);
            pg.status = PageStatus::Invalid;
        }
        {
            let blk = self.get_block_mut(ppa);
            blk.ipc += 1;
            blk.vpc -= 1;
        }
        self.lm.on_page_invalidated(ppa, &self.params);
    }

    /// Transitions a page `Free -> Valid`.
    pub fn mark_page_valid(&mut self, ppa: &Ppa) {
        {
            let pg = self.get_page_mut(ppa);
            debug_assert_eq!(pg.status, PageStatus::Free);
            pg.status = PageStatus::Valid;
        }
        self.get_block_mut(ppa).vpc += 1;
        self.lm.on_page_validated(ppa);
    }

    /// Resets every page in the block to `Free` and bumps its erase
    /// counter. Called once a victim block's valid pages have all been
    /// copied elsewhere.
    pub fn mark_block_free(&mut self, ppa: &Ppa) {
        let pgs_per_blk = self.params.pgs_per_blk;
        let blk = self.get_block_mut(ppa);
        for pg in blk.pages.iter_mut().take(pgs_per_blk) {
            pg.status = PageStatus::Free;
        }
        blk.ipc = 0;
        blk.vpc = 0;
        blk.erase_cnt += 1;
    }

    /// The demand-paged read path: for each LPN covered by the request,
    /// resolve the mapping (CMT hit, or a translation-page read on miss)
    /// and charge the data-page read latency. Returns the worst-case
    /// latency across all LPNs touched, matching the convention that a
    /// multi-page request's reported latency is its slowest sub-operation.
    pub fn read(&mut self, req: &Request) -> u64 {
        let spp = &self.params;
        let start_lpn = req.slba / spp.secs_per_pg as u64;
        let end_lpn = (req.slba + req.nlb as u64 - 1) / spp.secs_per_pg as u64;
        if end_lpn >= spp.tt_pgs as u64 {
            fatal(FatalCondition::LpnOutOfRange { end_lpn, tt_pgs: spp.tt_pgs });
        }

        let mut maxlat = 0u64;
        for lpn in start_lpn..=end_lpn {
            self.stats.access_cnt += 1;
            let ppa = if let Some((_ppn, _dirty)) = self.cmt.hit(lpn) {
                self.stats.cmt_hit_cnt += 1;
                self.addrmap.get_maptbl_ent(lpn)
            } else {
                self.stats.cmt_miss_cnt += 1;
                let trans_lun_avail = self.process_translation_page_read(lpn, req.stime);
                let ppa = self.addrmap.get_maptbl_ent(lpn);
                if ppa.is_mapped() {
                    if let Some(old_avail) = trans_lun_avail {
                        let lun = self.get_lun_mut(&ppa);
                        lun.next_avail_time = lun.next_avail_time.max(old_avail);
                    }
                }
                ppa
            };

            if !ppa.is_mapped() {
                continue;
            }

            let sublat = self.advance_status(&ppa, NandCmdKind::Read, req.stime);
            maxlat = maxlat.max(sublat);
        }
        maxlat
    }

    /// The write path: runs foreground GC until below the high watermark,
    /// then for each LPN invalidates the old mapping (if any), allocates a
    /// fresh page from the data write frontier, and updates maptbl/rmap/CMT.
    pub fn write(&mut self, req: &Request) -> u64 {
        while self.should_gc_high() {
            if self.do_gc(true).is_none() {
                break;
            }
        }

        let spp = self.params;
        let start_lpn = req.slba / spp.secs_per_pg as u64;
        let end_lpn = (req.slba + req.nlb as u64 - 1) / spp.secs_per_pg as u64;
        if end_lpn >= spp.tt_pgs as u64 {
            fatal(FatalCondition::LpnOutOfRange { end_lpn, tt_pgs: spp.tt_pgs });
        }

        let mut maxlat = 0u64;
        for lpn in start_lpn..=end_lpn {
            self.stats.access_cnt += 1;
            if self.cmt.hit(lpn).is_some() {
                self.stats.cmt_hit_cnt += 1;
            } else {
                self.stats.cmt_miss_cnt += 1;
                self.process_translation_page_write(lpn, req.stime);
            }

            let old_ppa = self.addrmap.get_maptbl_ent(lpn);
            if old_ppa.is_mapped() {
                self.mark_page_invalid(&old_ppa);
                self.addrmap.set_rmap_ent(old_ppa.to_pgidx(&self.params), INVALID_LPN);
            }

            let new_ppa = self.get_new_page();
            self.addrmap.set_maptbl_ent(lpn, new_ppa);
            self.cmt.mark_dirty(lpn, new_ppa.to_pgidx(&self.params));
            self.addrmap.set_rmap_ent(new_ppa.to_pgidx(&self.params), lpn);

            self.mark_page_valid(&new_ppa);
            self.advance_write_pointer();

            let lat = self.advance_status(&new_ppa, NandCmdKind::Write, req.stime);
            maxlat = maxlat.max(lat);
        }
        maxlat
    }

    /// Entry point used by the worker loop: dispatches on opcode and
    /// charges whatever latency the operation produced. `Dsm` (deallocate)
    /// is accepted but unmodeled, matching the upstream behavior of simply
    /// reporting zero latency for trims.
    pub fn service(&mut self, req: &mut Request) {
        let lat = match req.opcode {
            Opcode::Write => self.write(req),
            Opcode::Read => self.read(req),
            Opcode::Dsm => 0,
            Opcode::Unknown(op) => {
                log::warn!("FTL received unknown opcode 0x{op:x}, ignoring");
                0
            }
        };
        req.reqlat = lat;
        req.expire_time += lat;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SsdParams;

    fn small_ssd() -> Ssd {
        Ssd::new(SsdParams::small_for_test())
    }

    #[test]
    fn write_then_read_round_trips_through_cmt_miss_then_hit() {
        let mut ssd = small_ssd();
        let w = Request::new(Opcode::Write, 0, 2, 100);
        let lat_w = ssd.write(&w);
        assert!(lat_w > 0);

        let r1 = Request::new(Opcode::Read, 0, 2, 200);
        let lat_r1 = ssd.read(&r1);
        assert!(lat_r1 > 0);
        assert_eq!(ssd.stats.cmt_hit_cnt, 1, "page just written should still be CMT-resident");

        let r2 = Request::new(Opcode::Read, 0, 2, 300);
        let _ = ssd.read(&r2);
    }

    #[test]
    fn read_miss_serializes_the_data_read_behind_a_busier_translation_lun() {
        let mut ssd = small_ssd();
        let secs = ssd.params.secs_per_pg as u32;

        let trans_ppa = Ppa { ch: 0, lun: 0, pl: 0, blk: 0, pg: 0, sec: 0 };
        let data_ppa = Ppa { ch: 0, lun: 1, pl: 0, blk: 0, pg: 0, sec: 0 };
        ssd.addrmap.set_gtd_ent(0, trans_ppa);
        ssd.addrmap.set_maptbl_ent(0, data_ppa);

        // The translation page's LUN is busy far into the future; the data
        // page's LUN is otherwise idle.
        let busy_until = 10_000_000u64;
        ssd.get_lun_mut(&trans_ppa).next_avail_time = busy_until;

        let r = Request::new(Opcode::Read, 0, secs, 0);
        let lat = ssd.read(&r);

        // Without raising the data LUN's clock to the translation LUN's
        // completion time, the reported latency would only ever reflect a
        // single idle-LUN pg_rd_lat, regardless of how busy the translation
        // page's LUN was.
        assert!(
            lat > busy_until,
            "read latency {lat} should be serialized behind the translation read's busy_until={busy_until}"
        );
    }

    #[test]
    fn overwrite_invalidates_the_old_physical_page() {
        let mut ssd = small_ssd();
        let w1 = Request::new(Opcode::Write, 0, 2, 100);
        ssd.write(&w1);
        let first_ppa = ssd.addrmap.get_maptbl_ent(0);

        let w2 = Request::new(Opcode::Write, 0, 2, 200);
        ssd.write(&w2);
        let second_ppa = ssd.addrmap.get_maptbl_ent(0);

        assert_ne!(first_ppa, second_ppa);
        let blk = ssd.get_block_mut(&first_ppa);
        assert!(blk.ipc > 0);
    }

    #[test]
    fn dsm_request_is_zero_latency() {
        let mut ssd = small_ssd();
        let mut req = Request::new(Opcode::Dsm, 0, 1, 50);
        ssd.service(&mut req);
        assert_eq!(req.reqlat, 0);
    }
}
