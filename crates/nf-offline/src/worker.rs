//! Chunk worker pool
//!
//! Fixed-size pool of render threads for parallel chunked mode. Jobs move
//! through a FIFO channel with no priorities; chunk buffers are moved (not
//! copied) in both directions. Workers that fail three jobs retire
//! themselves; a chunk that fails three attempts surfaces as
//! `WorkerJobFailed`. Cancellation is a monotonic flag polled between job
//! completions, so in-flight chunks are never interrupted.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use nf_core::{MixSnapshot, NfError, NfResult, Sample};

use crate::progress::{ProgressFn, RenderPhase, RenderProgress};
use crate::render::{cancelled, render_span_sequential, CancelFlag};

/// Pool size cap
const MAX_WORKERS: usize = 8;
/// Per-worker init handshake deadline
const WORKER_INIT_TIMEOUT_MS: u64 = 5000;
/// A chunk is retried until this many attempts have failed
const MAX_CHUNK_ATTEMPTS: u32 = 3;
/// A worker retires after this many failed jobs
const MAX_WORKER_FAILURES: u32 = 3;

/// One chunk render job
#[derive(Debug, Clone)]
pub(crate) struct ChunkJob {
    /// Chunk position in the assembled output
    pub index: usize,
    /// Timeline start of the chunk proper
    pub start: usize,
    /// Chunk length in the assembled output
    pub len: usize,
    /// Leading context samples rendered for seam blending
    pub context: usize,
}

impl ChunkJob {
    pub fn render_start(&self) -> usize {
        self.start - self.context
    }

    pub fn render_len(&self) -> usize {
        self.len + self.context
    }
}

/// Worker→dispatcher message
enum WorkerMsg {
    Ready {
        #[allow(dead_code)]
        worker: usize,
    },
    Done {
        index: usize,
        result: Result<Vec<Sample>, String>,
    },
    Retired,
}

/// Fixed pool of chunk render threads
pub(crate) struct WorkerPool {
    job_tx: Option<Sender<ChunkJob>>,
    msg_rx: Receiver<WorkerMsg>,
    cancel: CancelFlag,
    workers: usize,
}

impl WorkerPool {
    /// Spawn `min(hardware_concurrency, 8)` workers and wait for each to
    /// come online within the init deadline. A missed deadline fails with
    /// `WorkerInitTimeout`; the caller degrades to sequential rendering.
    pub fn spawn(snapshot: Arc<MixSnapshot>, base_seed: u64) -> NfResult<Self> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_WORKERS);

        let (job_tx, job_rx) = unbounded::<ChunkJob>();
        let (msg_tx, msg_rx) = unbounded::<WorkerMsg>();
        let cancel: CancelFlag = Arc::new(AtomicBool::new(false));

        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let msg_tx = msg_tx.clone();
            let cancel = Arc::clone(&cancel);
            let snapshot = Arc::clone(&snapshot);

            thread::Builder::new()
                .name(format!("nf-chunk-worker-{worker}"))
                .spawn(move || {
                    worker_loop(worker, &snapshot, base_seed, &job_rx, &msg_tx, &cancel)
                })
                .map_err(|e| NfError::Internal(format!("spawn worker {worker}: {e}")))?;
        }

        let pool = Self {
            job_tx: Some(job_tx),
            msg_rx,
            cancel,
            workers,
        };

        // Init handshake, one deadline per worker
        for worker in 0..workers {
            match pool
                .msg_rx
                .recv_timeout(Duration::from_millis(WORKER_INIT_TIMEOUT_MS))
            {
                Ok(WorkerMsg::Ready { .. }) => {}
                _ => {
                    pool.cancel.store(true, Ordering::Relaxed);
                    return Err(NfError::WorkerInitTimeout(worker, WORKER_INIT_TIMEOUT_MS));
                }
            }
        }

        Ok(pool)
    }

    /// Submit all jobs FIFO, collect buffers in chunk-index order, retry
    /// failed chunks, and honor cancellation requests from the progress
    /// callback after in-flight jobs settle.
    pub fn dispatch(
        mut self,
        jobs: Vec<ChunkJob>,
        progress: &mut ProgressFn<'_>,
    ) -> NfResult<Vec<Vec<Sample>>> {
        let total = jobs.len();
        let tx = self.job_tx.take().expect("job queue present");
        for job in &jobs {
            tx.send(job.clone())
                .map_err(|_| NfError::Internal("job queue closed".into()))?;
        }

        let mut buffers: Vec<Option<Vec<Sample>>> = (0..total).map(|_| None).collect();
        let mut attempts = vec![1u32; total];
        let mut completed = 0usize;
        let mut active = self.workers;

        while completed < total {
            if active == 0 {
                self.cancel.store(true, Ordering::Relaxed);
                let missing = buffers.iter().position(|b| b.is_none()).unwrap_or(0);
                return Err(NfError::WorkerJobFailed {
                    chunk: missing,
                    attempts: attempts[missing],
                    reason: "no live workers remain".into(),
                });
            }

            let msg = self
                .msg_rx
                .recv()
                .map_err(|_| NfError::Internal("worker channel closed".into()))?;

            match msg {
                WorkerMsg::Done {
                    index,
                    result: Ok(buffer),
                } => {
                    if buffers[index].is_none() {
                        buffers[index] = Some(buffer);
                        completed += 1;
                        let report =
                            RenderProgress::new(RenderPhase::Processing, completed, total);
                        if !progress(report) && completed < total {
                            self.cancel.store(true, Ordering::Relaxed);
                            drop(tx);
                            return self.drain_after_cancel();
                        }
                    }
                }
                WorkerMsg::Done {
                    index,
                    result: Err(reason),
                } => {
                    if attempts[index] >= MAX_CHUNK_ATTEMPTS {
                        self.cancel.store(true, Ordering::Relaxed);
                        return Err(NfError::WorkerJobFailed {
                            chunk: index,
                            attempts: attempts[index],
                            reason,
                        });
                    }
                    attempts[index] += 1;
                    tx.send(jobs[index].clone())
                        .map_err(|_| NfError::Internal("job queue closed".into()))?;
                }
                WorkerMsg::Retired => active -= 1,
                WorkerMsg::Ready { .. } => {}
            }
        }

        Ok(buffers.into_iter().map(|b| b.expect("all chunks done")).collect())
    }

    /// Wait for in-flight jobs to settle (workers exit once the queue is
    /// closed and the flag is up), then resolve with `Cancelled`
    fn drain_after_cancel(self) -> NfResult<Vec<Vec<Sample>>> {
        while self.msg_rx.recv().is_ok() {}
        Err(NfError::Cancelled)
    }
}

fn worker_loop(
    worker: usize,
    snapshot: &MixSnapshot,
    base_seed: u64,
    job_rx: &Receiver<ChunkJob>,
    msg_tx: &Sender<WorkerMsg>,
    cancel: &CancelFlag,
) {
    let _ = msg_tx.send(WorkerMsg::Ready { worker });
    let mut failures = 0u32;

    while let Ok(job) = job_rx.recv() {
        // Cancellation is polled between jobs; the current job always
        // runs to completion
        if cancelled(cancel) {
            break;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            render_span_sequential(snapshot, base_seed, job.render_start(), job.render_len())
        }));

        match outcome {
            Ok(buffer) => {
                let _ = msg_tx.send(WorkerMsg::Done {
                    index: job.index,
                    result: Ok(buffer),
                });
            }
            Err(panic) => {
                failures += 1;
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "worker panicked".into());
                let _ = msg_tx.send(WorkerMsg::Done {
                    index: job.index,
                    result: Err(reason),
                });
                if failures >= MAX_WORKER_FAILURES {
                    break;
                }
            }
        }
    }

    let _ = msg_tx.send(WorkerMsg::Retired);
}
