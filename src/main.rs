#[macro_use]
extern crate log;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use dftl::cli::Args;
use dftl::error::TraceError;
use dftl::geometry::SsdParams;
use dftl::request::{Opcode, Request};
use dftl::Ssd;

fn parse_opcode(s: &str) -> Opcode {
    match s {
        "W" | "w" | "WRITE" | "write" => Opcode::Write,
        "R" | "r" | "READ" | "read" => Opcode::Read,
        "D" | "d" | "DSM" | "dsm" => Opcode::Dsm,
        other => match other.parse::<u8>() {
            Ok(v) => Opcode::Unknown(v),
            Err(_) => Opcode::Unknown(0xff),
        },
    }
}

/// Parses one `<op> <slba> <nlb> <stime>` line into a [`Request`].
fn parse_trace_line(line_no: usize, line: &str) -> Result<Request, TraceError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(TraceError::Malformed {
            line: line_no,
            reason: format!("expected 4 fields, got {}", fields.len()),
        });
    }
    let opcode = parse_opcode(fields[0]);
    let slba: u64 = fields[1].parse().map_err(|_| TraceError::Malformed {
        line: line_no,
        reason: "slba is not a valid integer".to_string(),
    })?;
    let nlb: u32 = fields[2].parse().map_err(|_| TraceError::Malformed {
        line: line_no,
        reason: "nlb is not a valid integer".to_string(),
    })?;
    let stime: u64 = fields[3].parse().map_err(|_| TraceError::Malformed {
        line: line_no,
        reason: "stime is not a valid integer".to_string(),
    })?;
    Ok(Request::new(opcode, slba, nlb, stime))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut params = SsdParams::new(
        args.secsz,
        args.secs_per_pg,
        args.pgs_per_blk,
        args.blks_per_pl,
        1,
        args.luns_per_ch,
        args.nchs,
    );
    params.enable_gc_delay = !args.no_gc_delay;

    let mut ssd = Ssd::with_victim_policy(params, args.victim_policy.into());

    let file = File::open(&args.trace).with_context(|| format!("opening trace file {}", args.trace))?;
    let reader = BufReader::new(file);

    let mut requests = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {} line {}", args.trace, i + 1))?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let req = parse_trace_line(i + 1, &line)?;
        requests.push(req);
    }
    info!("loaded {} requests from {}", requests.len(), args.trace);

    let start = Instant::now();
    let mut total_lat = 0u64;
    let mut max_lat = 0u64;
    for mut req in requests {
        ssd.service(&mut req);
        total_lat += req.reqlat;
        max_lat = max_lat.max(req.reqlat);
    }
    let elapsed = start.elapsed();

    info!(
        "serviced {} requests in {:.2}ms wall-clock",
        ssd.stats.access_cnt,
        elapsed.as_secs_f64() * 1000.0
    );
    info!(
        "cmt hit ratio: {:.4} ({} hits / {} accesses)",
        ssd.stats.hit_ratio(),
        ssd.stats.cmt_hit_cnt,
        ssd.stats.access_cnt,
    );
    info!("simulated total latency: {total_lat} ns, max single-request latency: {max_lat} ns");
    info!(
        "lines: {} free, {} full, {} victim-queued",
        ssd.lm.free_line_cnt, ssd.lm.full_line_cnt, ssd.lm.victim_line_cnt
    );

    Ok(())
}
