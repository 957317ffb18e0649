//! slotbench - load generator for the slotcache engine

mod stats;
mod workload;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use slotcache::{Backend, CacheBuilder, HashMode};
use tracing::{info, warn};

use crate::stats::{BenchStats, StatsSnapshot};
use crate::workload::{KeySpace, Rng};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Off-heap region size in bytes
    #[arg(short = 's', long, default_value_t = 64 * 1024 * 1024)]
    total_size: usize,

    /// Key size in bytes
    #[arg(short, long, default_value_t = 16)]
    key_size: usize,

    /// Value size in bytes
    #[arg(short, long, default_value_t = 32)]
    value_size: usize,

    /// Number of distinct keys in the working set
    #[arg(long, default_value_t = 1_000_000)]
    keys: u64,

    /// Operations per thread
    #[arg(short, long, default_value_t = 1_000_000)]
    ops: u64,

    /// Worker threads sharing the cache
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Fraction of operations that are reads
    #[arg(short, long, default_value_t = 0.9)]
    read_ratio: f64,

    /// Hash mode: deterministic or randomized
    #[arg(long, default_value_t = HashMode::Deterministic)]
    hash: HashMode,

    /// Region backend: anonymous or system
    #[arg(long, default_value_t = Backend::Anonymous)]
    backend: Backend,

    /// Seed for key material and op selection
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    total_size: usize,
    key_size: usize,
    value_size: usize,
    slot_count: usize,
    capacity: usize,
    keys: u64,
    threads: usize,
    hash: String,
    backend: String,
    elapsed_ms: u64,
    ops_per_sec: f64,
    stats: StatsSnapshot,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    if !(0.0..=1.0).contains(&args.read_ratio) {
        bail!("read ratio must be between 0 and 1, got {}", args.read_ratio);
    }
    if args.keys == 0 || args.threads == 0 {
        bail!("keys and threads must be non-zero");
    }

    info!("Starting slotbench v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Region: {} bytes, key {} bytes, value {} bytes",
        args.total_size, args.key_size, args.value_size
    );

    let cache = CacheBuilder::new(args.total_size, args.key_size, args.value_size)
        .backend(args.backend)
        .hash_mode(args.hash)?
        .build()
        .context("failed to create cache")?;
    let cache = Arc::new(cache);

    info!(
        "Cache ready: {} slots, room for {} entries ({} hash, {} backend)",
        cache.slot_count(),
        cache.capacity(),
        args.hash,
        args.backend
    );
    if args.keys > cache.capacity() as u64 {
        warn!(
            "Working set of {} keys exceeds capacity {}; expect evictions",
            args.keys,
            cache.capacity()
        );
    }

    let space = KeySpace {
        keys: args.keys,
        key_size: args.key_size,
        value_size: args.value_size,
        seed: args.seed,
    };
    let stats = Arc::new(BenchStats::new());

    let started = Instant::now();
    let handles: Vec<_> = (0..args.threads)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let stats = Arc::clone(&stats);
            let mut rng = Rng::new(args.seed.wrapping_add(t as u64 + 1));
            let ops = args.ops;
            let read_ratio = args.read_ratio;
            thread::spawn(move || {
                workload::run(&*cache, &space, &stats, ops, read_ratio, &mut rng)
            })
        })
        .collect();

    for handle in handles {
        match handle.join() {
            Ok(result) => result.context("worker failed")?,
            Err(_) => bail!("worker thread panicked"),
        }
    }
    let elapsed = started.elapsed();

    let report = build_report(&args, &cache, &stats, elapsed);
    if report.stats.torn > 0 {
        warn!("{} reads saw a value from a racing write", report.stats.torn);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn build_report(
    args: &Args,
    cache: &slotcache::ConstantSizeCache,
    stats: &BenchStats,
    elapsed: Duration,
) -> Report {
    let total_ops = args.ops * args.threads as u64;
    let secs = elapsed.as_secs_f64();

    Report {
        total_size: cache.total_size(),
        key_size: cache.key_size(),
        value_size: cache.value_size(),
        slot_count: cache.slot_count(),
        capacity: cache.capacity(),
        keys: args.keys,
        threads: args.threads,
        hash: args.hash.to_string(),
        backend: args.backend.to_string(),
        elapsed_ms: elapsed.as_millis() as u64,
        ops_per_sec: if secs > 0.0 { total_ops as f64 / secs } else { 0.0 },
        stats: stats.snapshot(),
    }
}

fn print_report(report: &Report) {
    println!("\nslotbench results");
    println!("   Slots:        {} ({} entries max)", report.slot_count, report.capacity);
    println!("   Working set:  {} keys", report.keys);
    println!("   Threads:      {}", report.threads);
    println!("   Elapsed:      {} ms", report.elapsed_ms);
    println!("   Throughput:   {:.0} ops/sec", report.ops_per_sec);
    println!("   Hits:         {}", report.stats.hits);
    println!("   Misses:       {}", report.stats.misses);
    println!("   Torn reads:   {}", report.stats.torn);
    println!("   Puts:         {}", report.stats.puts);
    println!("   Hit ratio:    {:.2}%", report.stats.hit_ratio * 100.0);
}
