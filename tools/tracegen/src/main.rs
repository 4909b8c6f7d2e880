use std::io::Write;

use anyhow::Result;
use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Generates a synthetic LPN request trace for replaying against the FTL
/// simulator: lines of `<op> <slba> <nlb> <stime>`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of requests to generate.
    #[arg(short, long, default_value_t = 10_000)]
    count: usize,

    /// Highest sector LBA a request may start at.
    #[arg(long, default_value_t = 1_000_000)]
    max_lba: u64,

    /// Sectors per request, upper bound (inclusive).
    #[arg(long, default_value_t = 8)]
    max_nlb: u32,

    /// Fraction of requests that are writes, 0.0-1.0.
    #[arg(long, default_value_t = 0.5)]
    write_ratio: f64,

    /// Average nanoseconds between consecutive requests' submission time.
    #[arg(long, default_value_t = 10_000)]
    interarrival_ns: u64,

    /// Skew accesses toward a hot region this fraction of `max_lba` wide.
    #[arg(long, default_value_t = 0.2)]
    hot_region_frac: f64,

    /// Fraction of requests that land in the hot region.
    #[arg(long, default_value_t = 0.8)]
    hot_region_weight: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SmallRng::seed_from_u64(args.seed);

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::BufWriter::new(std::io::stdout())),
    };

    let hot_span = ((args.max_lba as f64) * args.hot_region_frac).max(1.0) as u64;
    let mut stime = 0u64;

    for _ in 0..args.count {
        let slba = if rng.gen_bool(args.hot_region_weight) {
            rng.gen_range(0..hot_span)
        } else {
            rng.gen_range(0..args.max_lba)
        };
        let nlb = rng.gen_range(1..=args.max_nlb);
        let op = if rng.gen_bool(args.write_ratio) { "W" } else { "R" };

        writeln!(out, "{op} {slba} {nlb} {stime}")?;

        let jitter = rng.gen_range(0..=args.interarrival_ns.max(1) * 2);
        stime += jitter;
    }

    Ok(())
}
