//! Error taxonomy for the FTL core.
//!
//! Three severities are distinguished: a silent skip needs no type at all
//! (it's just "no latency charged"), a logged anomaly goes through
//! `log::warn!` and execution continues, and a fatal condition is a
//! programming bug, not an operational error - it aborts the process rather
//! than returning a `Result` the caller could paper over.

use std::fmt;

/// Conditions that indicate the FTL's own invariants have been violated.
/// None of these are expected to be reachable from valid host traffic;
/// they exist so a broken caller or a bug surfaces loudly instead of
/// corrupting the address map silently.
#[derive(Debug)]
pub enum FatalCondition {
    NoFreeLine,
    CmtOverCapacity,
    CounterInvariant(&'static str),
    LpnOutOfRange { end_lpn: u64, tt_pgs: usize },
}

impl fmt::Display for FatalCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalCondition::NoFreeLine => write!(f, "no free line available for write frontier"),
            FatalCondition::CmtOverCapacity => {
                write!(f, "CMT used-entry count exceeds total capacity")
            }
            FatalCondition::CounterInvariant(what) => write!(f, "counter invariant broken: {what}"),
            FatalCondition::LpnOutOfRange { end_lpn, tt_pgs } => {
                write!(f, "request spans end_lpn={end_lpn} beyond addressable tt_pgs={tt_pgs}")
            }
        }
    }
}

/// Logs the condition at error level and aborts the process. Used for
/// conditions that can only happen if the FTL's own bookkeeping is wrong.
#[track_caller]
pub fn fatal(cond: FatalCondition) -> ! {
    log::error!("fatal FTL invariant violation: {cond}");
    std::process::abort();
}

/// Errors surfaced to callers of the standalone host-facing tools (trace
/// replay, trace generation). Never returned by the FTL's own read/write
/// path, which always completes and reports latency.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("I/O error reading trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed trace line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
