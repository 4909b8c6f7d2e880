//! The per-LUN NAND timing model: each LUN is a single server with one
//! `next_avail_time` clock. An operation starting at `stime` can't begin
//! before the LUN is free, and charges its latency starting from whichever
//! is later.

use crate::geometry::{Lun, SsdParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NandCmdKind {
    Read,
    Write,
    Erase,
}

impl NandCmdKind {
    pub fn latency(&self, p: &SsdParams) -> u64 {
        match self {
            NandCmdKind::Read => p.pg_rd_lat,
            NandCmdKind::Write => p.pg_wr_lat,
            NandCmdKind::Erase => p.blk_er_lat,
        }
    }
}

impl Lun {
    /// Advances this LUN's clock for an operation issued at `stime`.
    /// Returns the completion time. This is the only place NAND timing is
    /// computed; everything else just asks a `Lun` to advance.
    pub fn advance(&mut self, stime: u64, cmd: NandCmdKind, p: &SsdParams) -> u64 {
        let start = stime.max(self.next_avail_time);
        let lat = cmd.latency(p);
        let end = start + lat;
        self.next_avail_time = end;
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::build_channels;

    #[test]
    fn back_to_back_ops_serialize_on_the_lun() {
        let p = SsdParams::small_for_test();
        let mut chans = build_channels(&p);
        let lun = &mut chans[0].luns[0];

        let t1 = lun.advance(0, NandCmdKind::Read, &p);
        assert_eq!(t1, p.pg_rd_lat);

        // issued "early" (before the LUN is free): still serializes after t1
        let t2 = lun.advance(10, NandCmdKind::Write, &p);
        assert_eq!(t2, t1 + p.pg_wr_lat);
    }

    #[test]
    fn op_issued_after_lun_is_free_starts_immediately() {
        let p = SsdParams::small_for_test();
        let mut chans = build_channels(&p);
        let lun = &mut chans[0].luns[0];

        let t1 = lun.advance(0, NandCmdKind::Read, &p);
        let far_future = t1 + 1_000_000;
        let t2 = lun.advance(far_future, NandCmdKind::Read, &p);
        assert_eq!(t2, far_future + p.pg_rd_lat);
    }

    #[test]
    fn erase_uses_block_erase_latency() {
        let p = SsdParams::small_for_test();
        let mut chans = build_channels(&p);
        let lun = &mut chans[0].luns[0];
        let t = lun.advance(0, NandCmdKind::Erase, &p);
        assert_eq!(t, p.blk_er_lat);
    }
}
