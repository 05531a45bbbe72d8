//! Engine execution context.
//!
//! One named thread owns the [`Engine`] and drains a FIFO of units of work.
//! Every engine mutation goes through [`Strand::post`] or [`Strand::submit`];
//! units run one at a time in submission order. Dropping the strand closes
//! the queue, lets already queued units finish and joins the thread.

use crate::engine::Engine;
use crate::error::{Outcome, SceneError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

pub const STRAND_THREAD_NAME: &str = "filament-strand";

type Unit = Box<dyn FnOnce(&mut dyn Engine) + Send>;

pub struct Strand {
    sender: Option<Sender<Unit>>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl Strand {
    pub fn spawn(engine: Box<dyn Engine>) -> Result<Self, SceneError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Unit>();
        let thread = thread::Builder::new()
            .name(STRAND_THREAD_NAME.to_string())
            .spawn(move || run(engine, receiver))
            .map_err(SceneError::Spawn)?;
        let thread_id = thread.thread().id();
        log::debug!("Engine strand started ({thread_id:?})");
        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
            thread_id,
        })
    }

    /// True when called from inside a unit running on this strand.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Queues a unit without waiting for it.
    pub fn post<F>(&self, unit: F) -> Result<(), SceneError>
    where
        F: FnOnce(&mut dyn Engine) + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or(SceneError::ExecutionContextClosed)?;
        sender
            .send(Box::new(unit))
            .map_err(|_| SceneError::ExecutionContextClosed)
    }

    /// Queues a unit and returns a handle to its result.
    pub fn submit<T, F>(&self, unit: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn Engine) -> T + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let posted = self.post(move |engine| {
            let _ = tx.send(unit(engine));
        });
        match posted {
            Ok(()) => Completion {
                state: CompletionState::Pending(rx),
                strand_thread: Some(self.thread_id),
            },
            Err(_) => Completion {
                state: CompletionState::Closed,
                strand_thread: None,
            },
        }
    }
}

impl Drop for Strand {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(thread) = self.thread.take() {
            if self.is_current() {
                log::warn!("Engine strand dropped from its own thread; not joining");
                return;
            }
            if thread.join().is_err() {
                log::error!("Engine strand thread panicked during shutdown");
            }
        }
    }
}

fn run(mut engine: Box<dyn Engine>, receiver: Receiver<Unit>) {
    let mut executed = 0u64;
    while let Ok(unit) = receiver.recv() {
        log::trace!("strand unit {executed} begin");
        let result = panic::catch_unwind(AssertUnwindSafe(|| unit(engine.as_mut())));
        if result.is_err() {
            log::error!("Engine unit {executed} panicked; continuing with the next unit");
        }
        log::trace!("strand unit {executed} end");
        executed += 1;
    }
    log::debug!("Engine strand stopped after {executed} units");
}

enum CompletionState<T> {
    Ready(Option<T>),
    Pending(Receiver<T>),
    Closed,
}

/// One-shot result of a unit of work.
pub struct Completion<T> {
    state: CompletionState<T>,
    strand_thread: Option<ThreadId>,
}

impl<T> Completion<T> {
    /// A completion that already holds its value.
    pub fn ready(value: T) -> Self {
        Self {
            state: CompletionState::Ready(Some(value)),
            strand_thread: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        match &self.state {
            CompletionState::Ready(_) | CompletionState::Closed => true,
            CompletionState::Pending(rx) => !rx.is_empty(),
        }
    }

    /// Blocks until the unit has run.
    pub fn wait(self) -> Result<T, SceneError> {
        self.check_thread()?;
        match self.state {
            CompletionState::Ready(Some(value)) => Ok(value),
            CompletionState::Ready(None) => Err(SceneError::UnitAborted),
            CompletionState::Pending(rx) => rx.recv().map_err(|_| SceneError::UnitAborted),
            CompletionState::Closed => Err(SceneError::ExecutionContextClosed),
        }
    }

    /// Blocks for at most `timeout`. The completion stays usable after a timeout.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<T, SceneError> {
        self.check_thread()?;
        match &mut self.state {
            CompletionState::Ready(value) => value.take().ok_or(SceneError::UnitAborted),
            CompletionState::Pending(rx) => match rx.recv_timeout(timeout) {
                Ok(value) => Ok(value),
                Err(RecvTimeoutError::Timeout) => Err(SceneError::Timeout),
                Err(RecvTimeoutError::Disconnected) => Err(SceneError::UnitAborted),
            },
            CompletionState::Closed => Err(SceneError::ExecutionContextClosed),
        }
    }

    /// Takes the value if the unit has already run.
    pub fn try_take(&mut self) -> Option<Result<T, SceneError>> {
        match &mut self.state {
            CompletionState::Ready(value) => value.take().map(Ok),
            CompletionState::Pending(rx) => match rx.try_recv() {
                Ok(value) => Some(Ok(value)),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Err(SceneError::UnitAborted)),
            },
            CompletionState::Closed => Some(Err(SceneError::ExecutionContextClosed)),
        }
    }

    fn check_thread(&self) -> Result<(), SceneError> {
        let pending = matches!(self.state, CompletionState::Pending(_));
        if pending && self.strand_thread == Some(thread::current().id()) {
            return Err(SceneError::WouldDeadlock);
        }
        Ok(())
    }
}

impl Completion<Outcome> {
    /// Waits and flattens the unit's own outcome into the result.
    pub fn resolve(self) -> Outcome {
        self.wait()?
    }
}
