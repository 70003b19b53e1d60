use std::{panic, thread};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, mpsc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_queue::SegQueue;
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::format::BatchPos;

/// JobSystem manages a configurable amount of worker threads to distribute jobs to. Jobs do not
/// return anything themselves, see [`BatchProcessor`] for collecting results.
pub struct JobSystem {
    worker_handles: HashMap<ThreadId, JoinHandle<()>>,
    is_running: Arc<AtomicBool>,
    /// Jobs that were pushed but did not finish yet, queued and running ones alike.
    outstanding: Arc<AtomicUsize>,

    queue: Arc<SegQueue<Job>>,
    sleeping_threads: Arc<SegQueue<ThreadId>>,
}

struct Job {
    cancelled: Arc<AtomicBool>,
    exec: Box<dyn FnOnce() + Send>,
}

pub struct JobHandle {
    cancelled: Arc<AtomicBool>,
}

impl JobHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl JobSystem {
    /// Spawns `worker_count` threads, at least one.
    pub fn new(worker_count: usize) -> JobSystem {
        let mut system = JobSystem {
            worker_handles: HashMap::new(),
            is_running: Arc::new(AtomicBool::new(true)),
            outstanding: Arc::new(AtomicUsize::new(0)),
            queue: Arc::new(SegQueue::<Job>::new()),
            sleeping_threads: Arc::new(SegQueue::<ThreadId>::new()),
        };

        for _ in 0..worker_count.max(1) {
            let handle = system.spawn_worker();
            system.worker_handles.insert(handle.thread().id(), handle);
        }

        system
    }

    pub fn worker_count(&self) -> usize {
        self.worker_handles.len()
    }

    /// stop signals all worker threads to stop and joins them. Currently processed jobs are not
    /// cancelled and will cause this method to block.
    pub fn stop(self) {
        self.is_running.store(false, Ordering::Relaxed);

        for (_, handle) in self.worker_handles {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("job worker exited with a panic");
            }
        }
    }

    /// push enqueues a new job. Panics inside the job are caught by the worker.
    pub fn push<Fn: FnOnce() + Send + 'static>(&self, exec: Fn) -> JobHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let job = Job {
            cancelled: Arc::clone(&cancelled),
            exec: Box::new(exec),
        };
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.queue.push(job);

        if let Some(thread) = self.sleeping_threads.pop() {
            if let Some(handle) = self.worker_handles.get(&thread) {
                handle.thread().unpark();
            }
        }

        JobHandle { cancelled }
    }

    /// clear discards all queued up jobs.
    pub fn clear(&self) {
        while self.queue.pop().is_some() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// is_idle returns true if no job is queued or running.
    pub fn is_idle(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) == 0
    }

    /// wait_until_empty_and_processed spin-loops until all queued elements have been picked up by
    /// a worker thread and all threads have finished processing their jobs.
    pub fn wait_until_empty_and_processed(&self) {
        while !self.is_idle() {
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn spawn_worker(&self) -> JoinHandle<()> {
        let is_running = self.is_running.clone();
        let outstanding = self.outstanding.clone();
        let queue = self.queue.clone();
        let sleeping_threads = self.sleeping_threads.clone();

        thread::spawn(move || {
            let mut last_exec = Instant::now();

            while is_running.load(Ordering::Relaxed) {
                let Some(job) = queue.pop() else {
                    if last_exec.elapsed().as_millis() > 100 {
                        sleeping_threads.push(thread::current().id());
                        thread::park_timeout(Duration::from_millis(100));
                        last_exec = Instant::now();
                    }
                    continue;
                };
                last_exec = Instant::now();

                if !job.cancelled.load(Ordering::Relaxed) {
                    if panic::catch_unwind(AssertUnwindSafe(job.exec)).is_err() {
                        warn!("job panicked");
                    }
                }
                outstanding.fetch_sub(1, Ordering::SeqCst);
            }
        })
    }
}

/// BatchProcessor is a decorator for [`JobSystem`]. It runs one job per [`BatchPos`] and hands
/// back each result together with the position it was computed for.
pub struct BatchProcessor<'a, T> {
    job_system: &'a JobSystem,
    tx: Sender<(u64, BatchResult<T>)>,
    rx: Receiver<(u64, BatchResult<T>)>,
    /// Latest job per position, tagged with the generation it was enqueued with.
    batch_jobs: FxHashMap<BatchPos, (u64, JobHandle)>,
    next_generation: u64,
}

#[derive(Debug, Eq, PartialEq)]
pub struct BatchResult<T> {
    pub pos: BatchPos,
    pub value: T,
}

impl<'a, T: Send + 'static> BatchProcessor<'a, T> {
    pub fn new(job_system: &'a JobSystem) -> BatchProcessor<'a, T> {
        let (tx, rx) = mpsc::channel();
        BatchProcessor { job_system, tx, rx, batch_jobs: FxHashMap::default(), next_generation: 0 }
    }

    /// Enqueues a job for `pos` and replaces any earlier job for the same position. A replaced
    /// job is cancelled if it did not start yet, otherwise its result is discarded.
    pub fn enqueue<Fn: FnOnce() -> T + Send + 'static>(&mut self, pos: BatchPos, exec: Fn) {
        self.dequeue(&pos);

        let generation = self.next_generation;
        self.next_generation += 1;

        let tx = self.tx.clone();
        let handle = self.job_system.push(move || {
            let value = exec();
            // the receiver only goes away once the processor was dropped
            _ = tx.send((generation, BatchResult { pos, value }));
        });
        self.batch_jobs.insert(pos, (generation, handle));
    }

    pub fn dequeue(&mut self, pos: &BatchPos) {
        if let Some((_, handle)) = self.batch_jobs.remove(pos) {
            handle.cancel();
        }
    }

    /// Cancels all jobs that did not start yet. Results of running jobs are discarded.
    pub fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.batch_jobs.drain() {
            handle.cancel();
        }
    }

    pub fn pending(&self) -> usize {
        self.batch_jobs.len()
    }

    /// Blocks until the next result arrives. Returns `None` once no job is left that could still
    /// report a result. Jobs that panicked or were cancelled never report one.
    pub fn next_result(&mut self) -> Option<BatchResult<T>> {
        while !self.batch_jobs.is_empty() {
            match self.rx.recv_timeout(Duration::from_millis(50)) {
                Ok((generation, result)) => {
                    if let Some(result) = self.accept(generation, result) {
                        return Some(result);
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if self.job_system.is_idle() {
                        // drain anything that was sent right before the workers went idle
                        while let Ok((generation, result)) = self.rx.try_recv() {
                            if let Some(result) = self.accept(generation, result) {
                                return Some(result);
                            }
                        }
                        return None;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    /// Returns `result` if it belongs to the latest job of its position. Results of replaced or
    /// dequeued jobs are dropped.
    fn accept(&mut self, generation: u64, result: BatchResult<T>) -> Option<BatchResult<T>> {
        let is_current = matches!(self.batch_jobs.get(&result.pos), Some((current, _)) if *current == generation);
        if !is_current {
            debug!("dropping outdated result for batch {}", result.pos);
            return None;
        }
        self.batch_jobs.remove(&result.pos);
        Some(result)
    }

    /// Returns the positions of all jobs that were enqueued but did not report a result.
    pub fn unfinished(&self) -> Vec<BatchPos> {
        let mut positions: Vec<BatchPos> = self.batch_jobs.keys().copied().collect();
        positions.sort();
        positions
    }
}


#[cfg(test)]
mod batch_processor_tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use crate::format::BatchPos;
    use crate::systems::jobs::{BatchProcessor, BatchResult, JobSystem};
    use crate::systems::jobs::job_system_tests::wait;

    /// Tests that enqueue & dequeue work for all possible scenarios.
    #[test]
    fn enqueue() {
        // only one worker to process one at a time
        let js = JobSystem::new(1);
        let mut bp = BatchProcessor::new(&js);

        // push job to allow for other jobs to be enqueued
        let signal = Arc::new(AtomicBool::new(false));
        let s0 = signal.clone();
        bp.enqueue(BatchPos::new(0, 0, 0), move || {
            s0.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(250));
            "waiter"
        });
        wait(signal);

        // enqueue same position twice to test override
        bp.enqueue(BatchPos::new(1, 0, 0), || "first");
        bp.enqueue(BatchPos::new(1, 0, 0), || "first override");

        // test dequeue
        bp.enqueue(BatchPos::new(3, 0, 0), || "second");
        bp.dequeue(&BatchPos::new(3, 0, 0));

        bp.enqueue(BatchPos::new(4, 0, 0), || "third");
        assert_eq!(bp.pending(), 3);

        let mut results = Vec::new();
        while let Some(result) = bp.next_result() {
            results.push(result);
        }
        assert_eq!(results, vec![
            BatchResult { pos: BatchPos::new(0, 0, 0), value: "waiter" },
            BatchResult { pos: BatchPos::new(1, 0, 0), value: "first override" },
            BatchResult { pos: BatchPos::new(4, 0, 0), value: "third" },
        ]);
        assert_eq!(bp.pending(), 0);
        assert!(bp.unfinished().is_empty());

        drop(bp);
        js.stop();
    }

    /// Tests that re-enqueueing a position while its job is running only reports the new result.
    #[test]
    fn override_running_job() {
        let js = JobSystem::new(2);
        let mut bp = BatchProcessor::new(&js);

        let signal = Arc::new(AtomicBool::new(false));
        let s0 = signal.clone();
        bp.enqueue(BatchPos::new(1, 0, 0), move || {
            s0.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            "outdated"
        });
        wait(signal);

        bp.enqueue(BatchPos::new(1, 0, 0), || "override");
        assert_eq!(bp.pending(), 1);

        let mut results = Vec::new();
        while let Some(result) = bp.next_result() {
            results.push(result);
        }
        assert_eq!(results, vec![BatchResult { pos: BatchPos::new(1, 0, 0), value: "override" }]);
        assert!(bp.unfinished().is_empty());

        drop(bp);
        js.stop();
    }

    /// Tests that a running job that was dequeued does not report a result.
    #[test]
    fn dequeue_running_job() {
        let js = JobSystem::new(1);
        let mut bp = BatchProcessor::new(&js);

        let signal = Arc::new(AtomicBool::new(false));
        let s0 = signal.clone();
        bp.enqueue(BatchPos::new(2, 0, 0), move || {
            s0.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            1
        });
        wait(signal);
        bp.dequeue(&BatchPos::new(2, 0, 0));
        bp.enqueue(BatchPos::new(3, 0, 0), || 2);

        let mut results = Vec::new();
        while let Some(result) = bp.next_result() {
            results.push(result);
        }
        assert_eq!(results, vec![BatchResult { pos: BatchPos::new(3, 0, 0), value: 2 }]);

        drop(bp);
        js.stop();
    }

    /// Tests that a panicking job is reported as unfinished instead of blocking forever.
    #[test]
    fn panicking_job_is_unfinished() {
        let js = JobSystem::new(2);
        let mut bp = BatchProcessor::new(&js);

        bp.enqueue(BatchPos::new(1, 2, 3), || -> u32 { panic!("diff failed") });
        bp.enqueue(BatchPos::new(0, 0, 0), || 7);

        let mut results = Vec::new();
        while let Some(result) = bp.next_result() {
            results.push(result);
        }
        assert_eq!(results, vec![BatchResult { pos: BatchPos::new(0, 0, 0), value: 7 }]);
        assert_eq!(bp.unfinished(), vec![BatchPos::new(1, 2, 3)]);

        drop(bp);
        js.stop();
    }
}
