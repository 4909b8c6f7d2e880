//! Demand-based Flash Translation Layer core.
//!
//! A single-threaded simulation of an SSD controller's address-translation
//! layer: a two-level map (a bounded, dirty-tracking LRU cache over a
//! fully-resident on-flash translation directory), an append-only
//! write-frontier allocator with its own line-based garbage collector, and
//! a per-LUN NAND timing model. [`device::Ssd`] is the entry point; wire it
//! up to a pair of [`rings::Ring`]s and hand it to [`worker::FtlWorker`] to
//! run it off the calling thread.

pub mod addrmap;
pub mod cli;
pub mod cmt;
pub mod constants;
pub mod device;
pub mod error;
pub mod gc;
pub mod geometry;
pub mod line;
pub mod request;
pub mod stats;
pub mod timing;
pub mod translation;
pub mod worker;

pub use device::Ssd;
pub use geometry::SsdParams;
pub use request::{Opcode, Request};
