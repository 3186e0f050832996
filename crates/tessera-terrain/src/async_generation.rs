//! Asynchronous chunk solving with a configurable thread pool.
//!
//! Offloads the constraint solve of each chunk to background threads,
//! supports cancellation, and delivers solved chunks via bounded channels.
//! Workers never touch the tile store: smoothing and merging happen on the
//! caller's thread in [`crate::TerrainStreamer::merge_completed`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;

use crate::coords::ChunkCoord;
use crate::height::HeightGenerator;
use crate::rules::AdjacencyRules;
use crate::seed::chunk_rng;
use crate::solver::{SolveError, SolveStats, WaveCollapseSolver};
use crate::tile::TileMap;

/// A request to solve a single chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkTask {
    /// The chunk to solve.
    pub chunk: ChunkCoord,
    /// World seed; the chunk RNG is derived from it.
    pub seed: u64,
    /// Tiles per chunk edge.
    pub tile_unit_size: u32,
    /// Recovery budget handed to the solver.
    pub max_backtracks: u32,
}

/// A solved chunk ready to be smoothed and merged.
#[derive(Debug)]
pub struct SolvedChunk {
    /// The chunk matching the original task.
    pub chunk: ChunkCoord,
    /// Chunk-local tiles and solver counters, or the failure.
    pub outcome: Result<(TileMap, SolveStats), SolveError>,
    /// Solve time in microseconds, traced when the chunk is merged.
    pub generation_time_us: u64,
}

/// Internal wrapper that carries the task and its cancellation flag.
struct QueuedTask {
    task: ChunkTask,
    cancelled: Arc<AtomicBool>,
}

/// Solves one chunk and samples its heights. Tiles are keyed by chunk-local
/// coordinate.
///
/// This is the CPU-intensive step shared by the synchronous streamer and the
/// worker threads, so both paths produce identical tiles for the same task.
pub fn solve_chunk(
    rules: &AdjacencyRules,
    heights: &HeightGenerator,
    task: &ChunkTask,
) -> Result<(TileMap, SolveStats), SolveError> {
    let size = task.tile_unit_size as usize;
    let mut rng = chunk_rng(task.seed, task.chunk);
    let grid = WaveCollapseSolver::new(rules, size, size)
        .with_max_backtracks(task.max_backtracks)
        .solve(&mut rng)?;
    let tiles = grid.materialize(heights, &mut rng);
    Ok((tiles, grid.stats()))
}

/// Manages asynchronous chunk solving across a thread pool.
pub struct AsyncChunkSolver {
    /// Sender for submitting tasks.
    task_sender: Sender<QueuedTask>,
    /// Receiver for collecting solved chunks on the main thread.
    result_receiver: Receiver<SolvedChunk>,
    /// Shared cancellation flag per task.
    active_tasks: Arc<DashMap<ChunkCoord, Arc<AtomicBool>>>,
    /// Current number of in-flight tasks.
    in_flight: Arc<AtomicU64>,
}

impl AsyncChunkSolver {
    /// Create a new async solver.
    ///
    /// # Arguments
    /// - `thread_count`: Number of worker threads.
    /// - `max_concurrent`: Maximum queued tasks. Excess submissions are rejected.
    /// - `result_capacity`: Bounded channel capacity for solved chunks.
    pub fn new(
        rules: AdjacencyRules,
        heights: HeightGenerator,
        thread_count: usize,
        max_concurrent: usize,
        result_capacity: usize,
    ) -> Self {
        let (task_sender, task_receiver) = bounded::<QueuedTask>(max_concurrent.max(1) * 2);
        let (result_sender, result_receiver) = bounded::<SolvedChunk>(result_capacity.max(1));
        let in_flight = Arc::new(AtomicU64::new(0));
        let rules = Arc::new(rules);
        let heights = Arc::new(heights);

        for i in 0..thread_count.max(1) {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let rules = Arc::clone(&rules);
            let heights = Arc::clone(&heights);

            std::thread::Builder::new()
                .name(format!("chunk-solver-{i}"))
                .spawn(move || {
                    while let Ok(queued) = receiver.recv() {
                        if queued.cancelled.load(Ordering::Relaxed) {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let start = std::time::Instant::now();
                        let outcome = solve_chunk(&rules, &heights, &queued.task);
                        let elapsed = start.elapsed().as_micros() as u64;

                        if !queued.cancelled.load(Ordering::Relaxed) {
                            let _ = sender.send(SolvedChunk {
                                chunk: queued.task.chunk,
                                outcome,
                                generation_time_us: elapsed,
                            });
                        }

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })
                .expect("Failed to spawn chunk solver worker thread");
        }

        Self {
            task_sender,
            result_receiver,
            active_tasks: Arc::new(DashMap::new()),
            in_flight,
        }
    }

    /// Create a solver with a thread count based on CPU cores, leaving
    /// headroom for the main thread.
    pub fn with_defaults(rules: AdjacencyRules, heights: HeightGenerator) -> Self {
        let cpus = num_cpus::get().max(2);
        Self::new(rules, heights, (cpus - 1).max(1), 64, 128)
    }

    /// Submit a chunk for background solving.
    ///
    /// Returns `Err(task)` if the queue is full.
    pub fn submit(&self, task: ChunkTask) -> Result<(), ChunkTask> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.active_tasks.insert(task.chunk, Arc::clone(&cancelled));
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        self.task_sender
            .try_send(QueuedTask { task, cancelled })
            .map_err(|e| {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                let task = e.into_inner().task;
                self.active_tasks.remove(&task.chunk);
                task
            })
    }

    /// Cancel a pending or in-progress task. No-op if it already finished.
    pub fn cancel(&self, chunk: ChunkCoord) {
        if let Some((_, cancelled)) = self.active_tasks.remove(&chunk) {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Drain all solved chunks from the result channel.
    ///
    /// Call this once per frame on the main thread.
    pub fn drain_results(&self) -> Vec<SolvedChunk> {
        let mut results = Vec::new();
        while let Ok(solved) = self.result_receiver.try_recv() {
            self.active_tasks.remove(&solved.chunk);
            results.push(solved);
        }
        results
    }

    /// Number of tasks currently queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns `true` if a task for `chunk` is currently pending.
    pub fn is_pending(&self, chunk: ChunkCoord) -> bool {
        self.active_tasks.contains_key(&chunk)
    }
}
