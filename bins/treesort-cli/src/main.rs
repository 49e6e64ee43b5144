// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Treesort CLI
//!
//! Sorts a generated integer array on a worker tree: `run` uses the
//! in-process thread mesh, `root`/`worker` form a multi-process cluster over
//! Unix sockets (start the workers first, then the root; every rank must be
//! given the same workers/threshold/policy).

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use treesort_core::{
    BubbleSort, SequentialSorter, SortOrchestrator, StdSort, Topology, TopologyPolicy,
    TransportChannel, WorkerContext, WorkerId, ROOT,
};
use treesort_net::{default_socket_dir, SocketChannel};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Distributed divide-and-conquer integer sort", long_about = None)]
struct Args {
    /// Command to execute
    #[clap(subcommand)]
    cmd: Command,

    /// Enable debug-level logging
    #[clap(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sort in-process on a thread-per-worker mesh
    Run {
        /// Number of elements to generate and sort
        #[clap(long)]
        size: NonZeroUsize,
        /// Delegation threshold Δ: ranges of at most this size sort locally
        #[clap(long, default_value = "32")]
        threshold: NonZeroUsize,
        /// Worker count
        #[clap(long, default_value = "4")]
        workers: NonZeroUsize,
        /// Process-tree addressing policy
        #[clap(long, value_enum, default_value_t = PolicyArg::Fixed)]
        policy: PolicyArg,
        /// Sequential sorter used below the threshold
        #[clap(long, value_enum, default_value_t = SorterArg::Std)]
        sorter: SorterArg,
        /// Seed for the generated test data
        #[clap(long, default_value_t = 314159)]
        seed: u64,
        /// Also check the result is a permutation of the input
        #[clap(long)]
        verify: bool,
    },
    /// Run rank 0 of a multi-process cluster over Unix sockets
    Root {
        /// Number of elements to generate and sort
        #[clap(long)]
        size: NonZeroUsize,
        /// Delegation threshold Δ: ranges of at most this size sort locally
        #[clap(long, default_value = "32")]
        threshold: NonZeroUsize,
        /// Total ranks in the cluster, this one included
        #[clap(long)]
        workers: NonZeroUsize,
        /// Process-tree addressing policy
        #[clap(long, value_enum, default_value_t = PolicyArg::Fixed)]
        policy: PolicyArg,
        /// Sequential sorter used below the threshold
        #[clap(long, value_enum, default_value_t = SorterArg::Std)]
        sorter: SorterArg,
        /// Seed for the generated test data
        #[clap(long, default_value_t = 314159)]
        seed: u64,
        /// Directory for the per-rank sockets (defaults to the runtime dir)
        #[clap(long)]
        socket_dir: Option<PathBuf>,
        /// Also check the result is a permutation of the input
        #[clap(long)]
        verify: bool,
    },
    /// Run one helper rank of a multi-process cluster over Unix sockets
    Worker {
        /// This worker's rank, in [1, workers)
        #[clap(long)]
        rank: NonZeroUsize,
        /// Total ranks in the cluster
        #[clap(long)]
        workers: NonZeroUsize,
        /// Delegation threshold Δ — must match the root's
        #[clap(long, default_value = "32")]
        threshold: NonZeroUsize,
        /// Process-tree addressing policy — must match the root's
        #[clap(long, value_enum, default_value_t = PolicyArg::Fixed)]
        policy: PolicyArg,
        /// Sequential sorter used below the threshold
        #[clap(long, value_enum, default_value_t = SorterArg::Std)]
        sorter: SorterArg,
        /// Directory for the per-rank sockets (defaults to the runtime dir)
        #[clap(long)]
        socket_dir: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    /// Static binary-heap addressing (children 2r+1, 2r+2)
    Fixed,
    /// Recursive doubling (delegate r + 2^level)
    Doubling,
}

impl From<PolicyArg> for TopologyPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Fixed => TopologyPolicy::FixedOffset,
            PolicyArg::Doubling => TopologyPolicy::RecursiveDoubling,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SorterArg {
    /// slice::sort_unstable
    Std,
    /// Exchange sort, O(n²) — the reference workload's local sort
    Bubble,
}

impl SorterArg {
    fn as_sorter(self) -> &'static (dyn SequentialSorter + Sync) {
        match self {
            SorterArg::Std => &StdSort,
            SorterArg::Bubble => &BubbleSort,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    match args.cmd {
        Command::Run {
            size,
            threshold,
            workers,
            policy,
            sorter,
            seed,
            verify,
        } => cmd_run(
            size.get(),
            threshold.get(),
            workers.get(),
            policy.into(),
            sorter.as_sorter(),
            seed,
            verify,
        ),
        Command::Root {
            size,
            threshold,
            workers,
            policy,
            sorter,
            seed,
            socket_dir,
            verify,
        } => cmd_root(
            size.get(),
            threshold.get(),
            workers.get(),
            policy.into(),
            sorter.as_sorter(),
            seed,
            socket_dir.unwrap_or_else(default_socket_dir),
            verify,
        ),
        Command::Worker {
            rank,
            workers,
            threshold,
            policy,
            sorter,
            socket_dir,
        } => cmd_worker(
            rank.get(),
            workers.get(),
            threshold.get(),
            policy.into(),
            sorter.as_sorter(),
            socket_dir.unwrap_or_else(default_socket_dir),
        ),
    }
}

/// Seeded test data, values drawn in [0, size) like the reference workload.
fn generate(size: usize, seed: u64) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let bound = i32::try_from(size).unwrap_or(i32::MAX).max(1);
    (0..size).map(|_| rng.gen_range(0..bound)).collect()
}

fn check_result(data: &[i32], original: &[i32], verify: bool) -> Result<()> {
    if let Some(i) = data.windows(2).position(|w| w[0] > w[1]) {
        bail!(
            "implementation error: data[{i}]={} > data[{}]={}",
            data[i],
            i + 1,
            data[i + 1]
        );
    }
    if verify {
        let mut want = original.to_vec();
        want.sort_unstable();
        if data != want {
            bail!("implementation error: result is not a permutation of the input");
        }
        info!("verified: sorted and a permutation of the input");
    }
    Ok(())
}

fn cmd_run(
    size: usize,
    threshold: usize,
    workers: usize,
    policy: TopologyPolicy,
    sorter: &(dyn SequentialSorter + Sync),
    seed: u64,
    verify: bool,
) -> Result<()> {
    let original = generate(size, seed);
    let mut data = original.clone();

    let started = Instant::now();
    treesort_mesh::run_job(&mut data, workers, threshold, policy, sorter)?;
    let elapsed = started.elapsed();

    check_result(&data, &original, verify)?;
    info!(
        size,
        workers,
        threshold,
        elapsed_ms = elapsed.as_millis() as u64,
        "sorted"
    );
    println!("Sorted {size} elements with {workers} workers in {elapsed:.2?}");
    Ok(())
}

fn cmd_root(
    size: usize,
    threshold: usize,
    workers: usize,
    policy: TopologyPolicy,
    sorter: &(dyn SequentialSorter + Sync),
    seed: u64,
    socket_dir: PathBuf,
    verify: bool,
) -> Result<()> {
    let topology = Topology::new(policy, workers)?;
    let ctx = WorkerContext::new(ROOT, topology, threshold)?;
    let mut channel = SocketChannel::bind(ROOT, workers, &socket_dir)?;

    let original = generate(size, seed);
    let mut data = original.clone();
    info!(size, workers, threshold, dir = %socket_dir.display(), "root dispatching");

    let started = Instant::now();
    let outcome = SortOrchestrator::new(ctx, &mut channel, sorter).run_root(&mut data);
    if let Err(err) = &outcome {
        channel.abort(&err.to_string());
    }
    outcome?;
    let elapsed = started.elapsed();

    check_result(&data, &original, verify)?;
    info!(
        size,
        workers,
        threshold,
        elapsed_ms = elapsed.as_millis() as u64,
        "sorted"
    );
    println!("Sorted {size} elements with {workers} workers in {elapsed:.2?}");
    Ok(())
}

fn cmd_worker(
    rank: usize,
    workers: usize,
    threshold: usize,
    policy: TopologyPolicy,
    sorter: &(dyn SequentialSorter + Sync),
    socket_dir: PathBuf,
) -> Result<()> {
    if rank >= workers {
        bail!("rank {rank} outside the rank space of {workers} workers");
    }
    let id = WorkerId(rank);
    let topology = Topology::new(policy, workers)?;
    let ctx = WorkerContext::new(id, topology, threshold)?;
    let mut channel = SocketChannel::bind(id, workers, &socket_dir)?;
    info!(worker = %id, workers, dir = %socket_dir.display(), "worker awaiting assignment");

    let outcome = SortOrchestrator::new(ctx, &mut channel, sorter).run_helper();
    if let Err(err) = &outcome {
        channel.abort(&err.to_string());
    }
    let report = outcome?;
    info!(worker = %id, ?report, "worker done");
    Ok(())
}
