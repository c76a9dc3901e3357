//! Background execution of a simulation run.
//!
//! One worker thread per run, explicit create -> run -> join/cancel ->
//! dispose lifecycle. The caller stays responsive and consumes progress
//! ticks plus a single terminal event over an mpsc channel.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::core::error::{Result, SimError};
use crate::core::types::{RiskReport, SimulationOutput, SimulationRequest};
use crate::engine::simulate::run_simulation;
use crate::stats::aggregate::aggregate;
use crate::stats::allocation::AllocationStrategy;

/// Event emitted by a background simulation run.
///
/// A run emits zero or more `Progress` events followed by exactly one
/// terminal event: `Complete`, `Cancelled`, or `Failed`.
#[derive(Debug)]
pub enum SimulationEvent {
    /// Percentage of runs completed, 1..=100. Advisory.
    Progress(u8),
    /// The run finished; carries the report and the raw engine output
    /// (outcome sample plus the bounded trajectory prefix).
    Complete {
        report: RiskReport,
        output: SimulationOutput,
    },
    /// The run was aborted through [`SimulationHandle::cancel`]. No partial
    /// report is produced.
    Cancelled,
    /// Validation failed on the worker, or a panic was caught at the run
    /// boundary.
    Failed(String),
}

/// Spawns background simulation runs. Stateless; each call produces an
/// independent handle with its own worker, channel, and cancel flag.
pub struct SimulationRunner;

impl SimulationRunner {
    /// Start a run on a dedicated worker thread.
    ///
    /// The worker validates, simulates, aggregates, and emits events on the
    /// handle's channel. Dropped receivers only make sends fail, which is
    /// ignored: losing a progress tick never aborts the computation.
    pub fn spawn(
        request: SimulationRequest,
        strategy: Box<dyn AllocationStrategy + Send + Sync>,
    ) -> SimulationHandle {
        let (tx, rx) = channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let worker = std::thread::Builder::new()
            .name("fundsim-worker".to_string())
            .spawn(move || run_worker(request, strategy, worker_cancel, tx))
            .expect("failed to spawn simulation worker thread");

        SimulationHandle {
            events: rx,
            cancel,
            worker: Some(worker),
        }
    }
}

fn run_worker(
    request: SimulationRequest,
    strategy: Box<dyn AllocationStrategy + Send + Sync>,
    cancel: Arc<AtomicBool>,
    tx: Sender<SimulationEvent>,
) -> Result<()> {
    info!(
        simulations = request.simulation_count,
        horizon_years = request.time_horizon_years,
        assets = request.asset_profiles.len(),
        "starting simulation run"
    );

    let progress_tx = tx.clone();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let output = run_simulation(&request, &cancel, |percent| {
            debug!(percent, "simulation progress");
            let _ = progress_tx.send(SimulationEvent::Progress(percent));
        })?;
        let report = aggregate(
            output.sample.clone(),
            &request.asset_profiles,
            strategy.as_ref(),
            request.seed,
        )?;
        Ok::<_, SimError>((report, output))
    }));

    match outcome {
        Ok(Ok((report, output))) => {
            info!(
                expected_value = report.expected_value,
                probability_of_loss = report.probability_of_loss,
                "simulation run complete"
            );
            let _ = tx.send(SimulationEvent::Complete { report, output });
            Ok(())
        }
        Ok(Err(SimError::Cancelled)) => {
            info!("simulation run cancelled");
            let _ = tx.send(SimulationEvent::Cancelled);
            Err(SimError::Cancelled)
        }
        Ok(Err(err)) => {
            warn!(error = %err, "simulation run failed");
            let _ = tx.send(SimulationEvent::Failed(err.to_string()));
            Err(err)
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_string());
            warn!(error = %message, "simulation worker panicked");
            let _ = tx.send(SimulationEvent::Failed(message.clone()));
            Err(SimError::unexpected(message))
        }
    }
}

/// Handle to one background simulation run.
#[derive(Debug)]
pub struct SimulationHandle {
    events: Receiver<SimulationEvent>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl SimulationHandle {
    /// The run's event channel.
    pub fn events(&self) -> &Receiver<SimulationEvent> {
        &self.events
    }

    /// Block for the next event, or `None` once the worker is done and the
    /// channel is drained.
    pub fn recv(&self) -> Option<SimulationEvent> {
        self.events.recv().ok()
    }

    /// Request cancellation. The engine checks the flag between runs, so
    /// the abort lands within one outer-loop pass.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the worker to finish and return its outcome.
    pub fn join(mut self) -> Result<()> {
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .unwrap_or_else(|_| Err(SimError::unexpected("worker thread panicked"))),
            None => Ok(()),
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        // Abandoned handle: stop the worker instead of leaking it.
        self.cancel.store(true, Ordering::Relaxed);
        let _ = self.join_inner();
    }
}
