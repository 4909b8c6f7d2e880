use clap::{Parser, ValueEnum};

use crate::line::VictimPolicy;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum, Debug)]
#[clap(rename_all = "verbatim")]
pub enum VictimPolicyChoice {
    HighestVpc,
    HighestIpc,
}

impl From<VictimPolicyChoice> for VictimPolicy {
    fn from(c: VictimPolicyChoice) -> Self {
        match c {
            VictimPolicyChoice::HighestVpc => VictimPolicy::HighestVpc,
            VictimPolicyChoice::HighestIpc => VictimPolicy::HighestIpc,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Trace file to replay, one request per line: `<op> <slba> <nlb> <stime>`.
    #[arg(required = true)]
    pub trace: String,

    #[arg(long, default_value_t = 8)]
    pub nchs: usize,
    #[arg(long, default_value_t = 8)]
    pub luns_per_ch: usize,
    #[arg(long, default_value_t = 256)]
    pub blks_per_pl: usize,
    #[arg(long, default_value_t = 256)]
    pub pgs_per_blk: usize,
    #[arg(long, default_value_t = 8)]
    pub secs_per_pg: usize,
    #[arg(long, default_value_t = 512)]
    pub secsz: usize,

    #[arg(long, value_enum, default_value_t = VictimPolicyChoice::HighestVpc)]
    pub victim_policy: VictimPolicyChoice,

    /// Disable NAND timing charges during GC copy-forward, reflecting only
    /// host-visible I/O latency.
    #[arg(long, default_value_t = false)]
    pub no_gc_delay: bool,

    /// Number of poller lanes (and matching to_ftl/to_poller ring pairs) to
    /// set up, if the binary is driving a worker thread directly.
    #[arg(long, default_value_t = 1)]
    pub pollers: usize,

    #[arg(long, default_value_t = 4096)]
    pub ring_capacity: usize,
}
