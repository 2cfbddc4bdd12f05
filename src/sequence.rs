//! Ordered, fail-fast, cancellable task runner.
//!
//! # State Flow
//!
//! ```text
//! Ready
//!   ↓ execute()
//! Running ──→ Failed      (a task reported failure)
//!   │   └───→ Cancelled   (cancel() observed before the next task)
//!   ↓
//! Completed
//! ```
//!
//! Tasks run one at a time on the calling thread, in insertion order.
//! Cancellation is cooperative: the flag is checked before each task starts
//! and never interrupts a task already running.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strum::Display;
use tracing::{info, warn};

use crate::error::{InstallKitError, Result};
use crate::progress::{NoProgress, ProgressReporter};
use crate::task::{Outcome, Task};

/// Lifecycle of a [`Sequence`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SequenceState {
    /// Constructed, not yet executed
    Ready,
    /// Executing tasks
    Running,
    /// Every task succeeded (terminal)
    Completed,
    /// A task reported failure (terminal)
    Failed,
    /// Stopped early on request, without failure (terminal)
    Cancelled,
}

impl SequenceState {
    /// Returns true for Completed, Failed and Cancelled
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag; `cancel` is safe from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that no further task be started.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a fixed list of tasks in order.
///
/// # Example
///
/// ```
/// use installkit::sequence::{Sequence, SequenceState};
/// use installkit::tasks::DeleteFiles;
/// use std::path::PathBuf;
///
/// let mut sequence = Sequence::new(vec![Box::new(
///     DeleteFiles::new(PathBuf::from("does-not-exist.tmp")).fail_on_doesnt_exist(false),
/// )]);
/// sequence.execute().unwrap();
/// assert_eq!(sequence.state(), SequenceState::Completed);
/// ```
pub struct Sequence {
    tasks: Vec<Box<dyn Task>>,
    cancel: CancelToken,
    state: SequenceState,
    progress: Box<dyn ProgressReporter>,
    dry_run: bool,
    executed: usize,
}

impl Sequence {
    /// Create a sequence; insertion order is execution order.
    pub fn new(tasks: Vec<Box<dyn Task>>) -> Self {
        Self {
            tasks,
            cancel: CancelToken::new(),
            state: SequenceState::Ready,
            progress: Box::new(NoProgress),
            dry_run: false,
            executed: 0,
        }
    }

    /// Report progress to `progress` (default: discarded)
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Observe an externally created cancellation flag
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Report and log every task without executing any of them
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Run the tasks in order.
    ///
    /// Returns `Ok(Outcome::Success)` when every task succeeded or when the
    /// run was cancelled; inspect [`Sequence::state`] to tell them apart.
    ///
    /// # Errors
    ///
    /// - `InstallationFailed` naming the first task that reported failure;
    ///   no later task is started
    /// - `State` if the sequence was already executed
    pub fn execute(&mut self) -> Result<Outcome> {
        if self.state != SequenceState::Ready {
            return Err(InstallKitError::state(format!(
                "Cannot execute a sequence in state {} (sequences run once)",
                self.state
            )));
        }
        self.state = SequenceState::Running;

        let total = self.tasks.len();
        info!(tasks = total, dry_run = self.dry_run, "sequence started");

        for (index, task) in self.tasks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(
                    completed = index,
                    skipped = total - index,
                    "sequence cancelled"
                );
                self.state = SequenceState::Cancelled;
                self.progress.finish();
                return Ok(Outcome::Success);
            }

            let name = task.name();
            self.progress.advance(name, index + 1, total);

            if self.dry_run {
                info!(task = name, "[DRY RUN] Skipped");
                continue;
            }

            info!(task = name, position = index + 1, total, "task started");
            self.executed += 1;
            match task.execute() {
                Outcome::Success => info!(task = name, "task completed"),
                Outcome::Failure(message) => {
                    warn!(task = name, error = %message, "task failed");
                    self.state = SequenceState::Failed;
                    self.progress.finish();
                    return Err(InstallKitError::installation_failed(name, message));
                }
            }
        }

        self.state = SequenceState::Completed;
        self.progress.finish();
        info!(tasks = total, "sequence completed");
        Ok(Outcome::Success)
    }

    /// Request cancellation; see [`CancelToken::cancel`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that can cancel this sequence from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Number of tasks whose `execute` was invoked
    pub fn executed(&self) -> usize {
        self.executed
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }
}

impl FromIterator<Box<dyn Task>> for Sequence {
    fn from_iter<I: IntoIterator<Item = Box<dyn Task>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("tasks", &self.task_names())
            .field("state", &self.state)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
