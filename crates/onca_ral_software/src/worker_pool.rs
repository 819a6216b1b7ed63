//! Parallel scanline dispatch (§4.5): `N` worker OS threads, each with a FIFO job
//! queue, each owning a disjoint stripe of scanlines via [`ScanlineOwnership`].
//!
//! `queue` is a pass-through dispatch: a draw is pushed to every worker whose row
//! ownership might intersect its bounding box, immediately. `sync` drains every
//! worker's queue and blocks until all of them are idle — used both for explicit
//! VSync points and for syncpoint draws that must not race an in-flight one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::ownership::ScanlineOwnership;
use crate::raster_data::RasterizerData;

/// Per-worker draw logic. Implemented by [`crate::rasterizer::Rasterizer`]; kept
/// as a trait here so the dispatcher doesn't need to know about pixel formats.
pub trait DrawWorker: Send {
    fn draw(&mut self, data: &RasterizerData);
}

/// Lock-free per-worker draw/pixel totals, mirroring `GSPerfMon::WorkerDraw0 + id`
/// without a full profiling subsystem (§10.5).
#[derive(Default)]
struct WorkerStats {
    draws: AtomicU64,
    pixels: AtomicU64,
}

/// A point-in-time copy of one worker's totals, returned by [`WorkerPool::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub draws: u64,
    pub pixels: u64,
}

struct QueueState {
    jobs: VecDeque<Arc<RasterizerData>>,
    in_flight: usize,
    shutdown: bool,
}

struct Queue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    idle: Condvar,
}

impl Queue {
    fn new() -> Self {
        Queue {
            state: Mutex::new(QueueState { jobs: VecDeque::new(), in_flight: 0, shutdown: false }),
            not_empty: Condvar::new(),
            idle: Condvar::new(),
        }
    }

    fn push(&self, job: Arc<RasterizerData>) {
        let mut state = self.state.lock();
        state.jobs.push_back(job);
        state.in_flight += 1;
        self.not_empty.notify_one();
    }

    fn wait_idle(&self) {
        let mut state = self.state.lock();
        while state.in_flight != 0 {
            self.idle.wait(&mut state);
        }
    }

    fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.not_empty.notify_all();
    }
}

fn worker_loop<W: DrawWorker>(queue: Arc<Queue>, mut worker: W, stats: Arc<WorkerStats>) {
    loop {
        let job = {
            let mut state = queue.state.lock();
            loop {
                if let Some(job) = state.jobs.pop_front() {
                    break Some(job);
                }
                if state.shutdown {
                    break None;
                }
                queue.not_empty.wait(&mut state);
            }
        };

        let Some(job) = job else { break };

        worker.draw(&job);
        log::trace!(target: crate::LOG_CAT_DISPATCH, "worker drew {} pixels", job.pixels());
        stats.draws.fetch_add(1, Ordering::Relaxed);
        stats.pixels.fetch_add(job.pixels(), Ordering::Relaxed);

        let mut state = queue.state.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 {
            queue.idle.notify_all();
        }
    }
}

/// Owns the worker threads and their job queues. Dropped cleanly: signals
/// shutdown and joins every thread.
pub struct WorkerPool {
    queues: Vec<Arc<Queue>>,
    ownerships: Vec<ScanlineOwnership>,
    handles: Vec<JoinHandle<()>>,
    stats: Vec<Arc<WorkerStats>>,
}

impl WorkerPool {
    /// Spawns `threads` worker threads, each built by `make_worker(ownership)`.
    pub fn new<W, F>(threads: usize, make_worker: F) -> Result<Self>
    where
        W: DrawWorker + 'static,
        F: Fn(ScanlineOwnership) -> W,
    {
        if threads == 0 {
            return Err(Error::ZeroWorkers);
        }

        let mut queues = Vec::with_capacity(threads);
        let mut ownerships = Vec::with_capacity(threads);
        let mut handles = Vec::with_capacity(threads);
        let mut stats = Vec::with_capacity(threads);

        for id in 0..threads {
            let ownership = ScanlineOwnership::new(id, threads);
            let queue = Arc::new(Queue::new());
            let worker_stats = Arc::new(WorkerStats::default());
            let worker = make_worker(ownership.clone());

            let thread_queue = queue.clone();
            let thread_stats = worker_stats.clone();
            let handle = std::thread::Builder::new()
                .name(format!("onca-ral-software-worker-{id}"))
                .spawn(move || worker_loop(thread_queue, worker, thread_stats))
                .expect("failed to spawn rasterizer worker thread");

            queues.push(queue);
            ownerships.push(ownership);
            handles.push(handle);
            stats.push(worker_stats);
        }

        log::info!(target: crate::LOG_CAT_DISPATCH, "spawned {threads} rasterizer worker threads");

        Ok(WorkerPool { queues, ownerships, handles, stats })
    }

    pub fn threads(&self) -> usize {
        self.queues.len()
    }

    /// A point-in-time snapshot of every worker's total draws/pixels processed so
    /// far, mirroring `GSPerfMon::WorkerDraw0 + id` (§10.5).
    pub fn stats(&self) -> Vec<WorkerSnapshot> {
        self.stats
            .iter()
            .map(|s| WorkerSnapshot {
                draws: s.draws.load(Ordering::Relaxed),
                pixels: s.pixels.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Dispatches a draw to every worker whose rows might intersect it. If the
    /// draw is a syncpoint, every queue is drained first so it can never race an
    /// in-flight draw (§4.5).
    pub fn queue(&self, data: Arc<RasterizerData>, top: i32, bottom: i32) {
        if data.syncpoint {
            log::debug!(target: crate::LOG_CAT_DISPATCH, "syncpoint draw, draining all queues first");
            self.sync();
        }

        for (queue, ownership) in self.queues.iter().zip(&self.ownerships) {
            if ownership.owns_band(top, bottom) {
                queue.push(data.clone());
            }
        }
    }

    /// Blocks until every worker's queue is empty and idle.
    pub fn sync(&self) {
        for queue in &self.queues {
            queue.wait_idle();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for queue in &self.queues {
            queue.shutdown();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use super::*;
    use crate::backend::Rect;
    use crate::selector::ScanlineGlobalData;
    use crate::vertex::{PrimitiveClass, V};

    struct CountingWorker {
        ownership: ScanlineOwnership,
        total: Arc<AtomicU64>,
    }

    impl DrawWorker for CountingWorker {
        fn draw(&mut self, data: &RasterizerData) {
            assert!(self.ownership.owns_band(data.bbox.top, data.bbox.bottom));
            self.total.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn make_data(top: i32, bottom: i32, syncpoint: bool) -> Arc<RasterizerData> {
        let mut data = RasterizerData::new(
            PrimitiveClass::Point,
            vec![V::ZERO],
            Rect { left: 0, top, right: 1, bottom },
            Rect { left: 0, top, right: 1, bottom },
            false,
            ScanlineGlobalData::default(),
            0,
            vec![],
            vec![],
            vec![],
            0,
            None,
        )
        .unwrap();
        data.syncpoint = syncpoint;
        Arc::new(data)
    }

    #[test]
    fn zero_workers_is_rejected() {
        let result = WorkerPool::new(0, |o| CountingWorker { ownership: o, total: Arc::new(AtomicU64::new(0)) });
        assert!(matches!(result, Err(Error::ZeroWorkers)));
    }

    #[test]
    fn queue_then_sync_drains_and_runs_every_matching_worker() {
        let total = Arc::new(AtomicU64::new(0));
        let pool = WorkerPool::new(4, {
            let total = total.clone();
            move |o| CountingWorker { ownership: o, total: total.clone() }
        })
        .unwrap();

        for i in 0..20 {
            let data = make_data(i * 16, i * 16 + 16, false);
            pool.queue(data, i * 16, i * 16 + 16);
        }
        pool.sync();

        assert_eq!(total.load(Ordering::Relaxed), 20);
    }

    #[test]
    fn stats_snapshot_tracks_draws_and_pixels_per_worker() {
        let total = Arc::new(AtomicU64::new(0));
        let pool = WorkerPool::new(2, {
            let total = total.clone();
            move |o| CountingWorker { ownership: o, total: total.clone() }
        })
        .unwrap();

        pool.queue(make_data(0, 16, false), 0, 16);
        pool.queue(make_data(16, 32, false), 16, 32);
        pool.sync();

        let stats = pool.stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats.iter().map(|s| s.draws).sum::<u64>(), 2);
    }

    #[test]
    fn syncpoint_draw_waits_for_prior_work_before_dispatch() {
        let total = Arc::new(AtomicU64::new(0));
        let pool = WorkerPool::new(2, {
            let total = total.clone();
            move |o| CountingWorker { ownership: o, total: total.clone() }
        })
        .unwrap();

        pool.queue(make_data(0, 16, false), 0, 16);
        pool.queue(make_data(0, 16, true), 0, 16);
        pool.sync();

        assert_eq!(total.load(Ordering::Relaxed), 2);
    }
}
