//! Compile-time defaults for NAND geometry, timing, and translation sizing.
//!
//! These mirror the defaults of the device this FTL was modeled after; every
//! one of them is overridable at runtime through [`crate::geometry::SsdParams`].

pub const DEFAULT_SECSZ: usize = 512;
pub const DEFAULT_SECS_PER_PG: usize = 8;
pub const DEFAULT_PGS_PER_BLK: usize = 256;
pub const DEFAULT_BLKS_PER_PL: usize = 256;
pub const DEFAULT_PLS_PER_LUN: usize = 1;
pub const DEFAULT_LUNS_PER_CH: usize = 8;
pub const DEFAULT_NCHS: usize = 8;

pub const DEFAULT_ENTS_PER_PG: usize = 512;

/// Nanoseconds. These are illustrative NAND timings, not a specific part's
/// datasheet numbers.
pub const NAND_READ_LATENCY_NS: u64 = 40_000;
pub const NAND_PROG_LATENCY_NS: u64 = 200_000;
pub const NAND_ERASE_LATENCY_NS: u64 = 2_000_000;

/// Background GC kicks in once free lines drop to this fraction of the total.
pub const GC_THRES_PCENT: f64 = 0.75;
/// Foreground (blocking) GC kicks in at this much higher occupancy.
pub const GC_THRES_PCENT_HIGH: f64 = 0.95;

/// A victim line below this fraction of invalid pages isn't worth reclaiming
/// unless GC is running in forced (foreground) mode.
pub const GC_VICTIM_IPC_GATE_DENOM: u32 = 8;

pub const INVALID_LPN: u64 = u64::MAX;
