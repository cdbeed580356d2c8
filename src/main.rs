use chrono::Local;
use clap::{Parser, ValueEnum};
use merkle_accumulator::{Blake3Combiner, Combiner, Result, Sha256Combiner};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::driver::Driver;

mod driver;
mod stat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HashKind {
  Blake3,
  Sha256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
  Memory,
  Rocksdb,
  All,
}

#[derive(Parser)]
#[command(name = "merkle-bench")]
#[command(author, version, about = "Benchmark insertion and proof generation of the incremental Merkle tree")]
struct Args {
  /// Output directory for benchmark results and working temporary files
  #[arg(index = 1, default_value = ".")]
  dir: PathBuf,

  /// Largest number of leaves in the series
  #[arg(short = 'n', long, default_value_t = 64 * 1024)]
  max_n: u32,

  /// Number of points in the series
  #[arg(long, default_value_t = 8)]
  division: u32,

  /// Trials per point
  #[arg(short, long, default_value_t = 5)]
  trials: usize,

  /// Proofs generated and verified per trial
  #[arg(short, long, default_value_t = 1000)]
  queries: usize,

  #[arg(long, value_enum, default_value_t = HashKind::Blake3)]
  hash: HashKind,

  #[arg(long, value_enum, default_value_t = StoreKind::All)]
  store: StoreKind,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
  let args = Args::parse();

  let id = Local::now().format("%Y%m%d%H%M%S").to_string();

  create_dir_all(&args.dir)?;
  println!("Working directory: {:?}", &args.dir);

  match args.hash {
    HashKind::Blake3 => run_all(&args, &id, Blake3Combiner),
    HashKind::Sha256 => run_all(&args, &id, Sha256Combiner),
  }
}

fn run_all<C: Combiner + Copy>(args: &Args, id: &str, combiner: C) -> Result<()> {
  let hash = format!("{:?}", args.hash).to_lowercase();
  if args.store != StoreKind::Rocksdb {
    let name = format!("insert-memory-{hash}");
    run_series(args, id, &name, driver::MemoryInsertDriver::new(combiner))?;
    let name = format!("proof-memory-{hash}");
    run_series(args, id, &name, driver::MemoryProofDriver::new(combiner, args.queries))?;
  }
  if args.store != StoreKind::Memory {
    let name = format!("insert-rocksdb-{hash}");
    run_series(args, id, &name, driver::RocksDBInsertDriver::new(combiner, args.dir.clone()))?;
    let name = format!("proof-rocksdb-{hash}");
    run_series(args, id, &name, driver::RocksDBProofDriver::new(combiner, args.dir.clone(), args.queries)?)?;
  }
  Ok(())
}

fn run_series<T, D: Driver<T>>(args: &Args, id: &str, name: &str, mut driver: D) -> Result<()> {
  println!("[{name}]");
  let step = (args.max_n / args.division.max(1)).max(1);
  let mut report = stat::Report::new();
  for n in (step..=args.max_n).step_by(step as usize) {
    let mut size = 0;
    for _ in 0..args.trials {
      let mut target = driver.setup(n)?;
      let elapsed = driver.run(&mut target, n)?;
      size = driver.size(&target);
      driver.cleanup(target)?;
      report.add(n, elapsed, size);
    }
    let s = report.single(n);
    println!("  n={n}: {s}; {size} bytes");
  }

  let path = report_path(&args.dir, id, name);
  report.save_to_csv(&path)?;
  println!("==> {}", path.to_string_lossy());
  Ok(())
}

fn report_path(dir: &Path, id: &str, name: &str) -> PathBuf {
  dir.join(format!("{id}-{name}.csv"))
}
