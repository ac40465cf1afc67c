// Transport - Run control and completion state
// Starts a step loop (plus optional clock) on its own thread and reports how it ended

use crate::midi::sink::MidiSink;
use crate::sequencer::clock::TransportClock;
use crate::sequencer::params::SequenceParams;
use crate::sequencer::player::{CompletionReason, StepSequencer};
use crate::sequencer::scale::Scale;
use crate::sequencer::switch::RunSwitch;
use crate::sequencer::SequencerError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// How a run ended
pub type RunOutcome = Result<CompletionReason, SequencerError>;

type CompletionCallback = Box<dyn FnOnce(&RunOutcome) + Send>;

/// Run status as seen from the controlling thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// Nothing was started
    #[default]
    Idle,
    Running,
    /// Played every step
    Completed,
    /// Stopped by the user before the pattern ended
    Cancelled,
    /// Stopped by a transport error
    Failed,
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Cancelled | RunStatus::Failed
        )
    }

    fn from_outcome(outcome: &RunOutcome) -> Self {
        match outcome {
            Ok(CompletionReason::EndOfPattern) => RunStatus::Completed,
            Ok(CompletionReason::Cancelled) => RunStatus::Cancelled,
            Err(_) => RunStatus::Failed,
        }
    }
}

enum Completion {
    Pending(Vec<CompletionCallback>),
    Finished(RunOutcome),
}

fn lock_completion(completion: &Mutex<Completion>) -> MutexGuard<'_, Completion> {
    // Callbacks never run under this lock, so a poisoned guard still holds valid state
    completion.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Stores the outcome, then runs every registered callback exactly once
fn publish(completion: &Mutex<Completion>, outcome: RunOutcome) {
    let callbacks = {
        let mut slot = lock_completion(completion);
        match std::mem::replace(&mut *slot, Completion::Finished(outcome.clone())) {
            Completion::Pending(callbacks) => callbacks,
            Completion::Finished(previous) => {
                *slot = Completion::Finished(previous);
                return;
            }
        }
    };

    for callback in callbacks {
        callback(&outcome);
    }
}

/// Starts a run on a background thread.
///
/// Parameters are validated and the sequencer is built before anything is
/// spawned, so configuration errors are reported here and the sink is left
/// untouched.
pub fn start<S: MidiSink + 'static>(
    params: SequenceParams,
    scale: Scale,
    sink: S,
) -> Result<RunHandle, SequencerError> {
    let rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let sequencer = StepSequencer::new(params, scale, rng)?;

    let switch = RunSwitch::armed();
    let completion = Arc::new(Mutex::new(Completion::Pending(Vec::new())));

    let thread = {
        let switch = switch.clone();
        let completion = Arc::clone(&completion);
        thread::Builder::new()
            .name("step-sequencer".to_string())
            .spawn(move || {
                let outcome = run_to_completion(sequencer, sink, &switch);
                publish(&completion, outcome);
            })
            .map_err(|e| {
                SequencerError::TransportFailure(format!("could not start run thread: {}", e))
            })?
    };

    Ok(RunHandle {
        switch,
        completion,
        thread: Some(thread),
    })
}

fn run_to_completion<S: MidiSink + 'static>(
    mut sequencer: StepSequencer<StdRng>,
    sink: S,
    switch: &RunSwitch,
) -> RunOutcome {
    let sink = Arc::new(Mutex::new(sink));
    let params = sequencer.params().clone();

    let clock = if params.start_external_clock {
        Some(
            TransportClock::new(params.bpm, params.send_clock_stop)
                .spawn(Arc::clone(&sink), switch.clone()),
        )
    } else {
        None
    };

    let step_result = match &clock {
        Some(Err(e)) => Err(e.clone()),
        _ => sequencer.run(&*sink, switch),
    };

    // A finished pattern also stops the clock
    switch.stop();

    let clock_result = match clock {
        Some(Ok(handle)) => match handle.join() {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(SequencerError::TransportFailure(
                "clock thread panicked".to_string(),
            )),
        },
        _ => Ok(()),
    };

    lock_sink(&sink).close();

    let outcome = step_result.and_then(|reason| clock_result.map(|_| reason));
    match &outcome {
        Ok(CompletionReason::EndOfPattern) => log::info!(target: "sequencer", "End of pattern"),
        Ok(CompletionReason::Cancelled) => {
            log::info!(target: "sequencer", "Sequence ended by user")
        }
        Err(e) => log::error!(target: "sequencer", "Sequence failed: {}", e),
    }
    outcome
}

fn lock_sink<S: MidiSink>(sink: &Mutex<S>) -> MutexGuard<'_, S> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle on a started run
pub struct RunHandle {
    switch: RunSwitch,
    completion: Arc<Mutex<Completion>>,
    thread: Option<JoinHandle<()>>,
}

impl RunHandle {
    /// Asks the run to stop after the step in flight
    pub fn cancel(&self) {
        if self.switch.stop() {
            log::debug!(target: "sequencer", "cancel requested");
        }
    }

    /// A clone of the run's cancellation switch
    pub fn switch(&self) -> RunSwitch {
        self.switch.clone()
    }

    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    pub fn status(&self) -> RunStatus {
        match &*lock_completion(&self.completion) {
            Completion::Pending(_) => RunStatus::Running,
            Completion::Finished(outcome) => RunStatus::from_outcome(outcome),
        }
    }

    /// Registers a callback for the outcome.
    ///
    /// Runs immediately on the calling thread if the run already finished,
    /// otherwise on the run thread once teardown is complete.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&RunOutcome) + Send + 'static,
    {
        let finished = {
            let mut slot = lock_completion(&self.completion);
            match &mut *slot {
                Completion::Pending(callbacks) => {
                    callbacks.push(Box::new(callback));
                    return;
                }
                Completion::Finished(outcome) => outcome.clone(),
            }
        };
        callback(&finished);
    }

    /// Blocks until the run thread has exited and returns the outcome.
    ///
    /// A published outcome stands even if a completion callback panicked
    /// on the run thread afterwards.
    pub fn wait(mut self) -> RunOutcome {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!(target: "sequencer", "run thread panicked");
            }
        }

        match &*lock_completion(&self.completion) {
            Completion::Finished(outcome) => outcome.clone(),
            Completion::Pending(_) => Err(SequencerError::TransportFailure(
                "run thread exited without an outcome".to_string(),
            )),
        }
    }
}

/// Controller owning at most one run at a time
#[derive(Default)]
pub struct Transport {
    current: Option<RunHandle>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new run; refused while the previous one is still playing
    pub fn start<S: MidiSink + 'static>(
        &mut self,
        params: SequenceParams,
        scale: Scale,
        sink: S,
    ) -> Result<(), SequencerError> {
        if self.is_running() {
            return Err(SequencerError::AlreadyRunning);
        }

        self.current = Some(start(params, scale, sink)?);
        Ok(())
    }

    /// Cancels the current run, if any
    pub fn stop(&self) {
        if let Some(handle) = &self.current {
            handle.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    pub fn status(&self) -> RunStatus {
        self.current
            .as_ref()
            .map(RunHandle::status)
            .unwrap_or_default()
    }

    pub fn on_complete<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&RunOutcome) + Send + 'static,
    {
        match &self.current {
            Some(handle) => {
                handle.on_complete(callback);
                true
            }
            None => false,
        }
    }

    /// Waits for the current run; `None` when nothing was started
    pub fn wait(&mut self) -> Option<RunOutcome> {
        self.current.take().map(RunHandle::wait)
    }
}
