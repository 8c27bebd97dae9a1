/// Running a command picked from the palette
///
/// The pick is recorded before the command runs, so a command that fails or
/// never returns still counts as recently used.

use crate::core::recency::RecencyStore;
use crate::error::{PaletteError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Why a command did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// User or host aborted the command; not worth reporting
    Cancelled,
    Failed(String),
}

/// Executes commands by id
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, command_id: &str) -> std::result::Result<(), ExecutionError>;
}

pub struct CommandRunner {
    history: Arc<RecencyStore>,
    executor: Arc<dyn CommandExecutor>,
    run_delay: Duration,
}

impl CommandRunner {
    pub fn new(history: Arc<RecencyStore>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            history,
            executor,
            run_delay: Duration::ZERO,
        }
    }

    /// Pause between closing the palette and running the command
    pub fn with_run_delay(mut self, run_delay: Duration) -> Self {
        self.run_delay = run_delay;
        self
    }

    /// Record the pick, then run it
    ///
    /// # Arguments
    /// * `command_id` - Command to execute
    /// * `label` - Display label, used in the error message
    pub async fn run(&self, command_id: &str, label: &str) -> Result<()> {
        self.history.push(command_id).await;

        if !self.run_delay.is_zero() {
            tokio::time::sleep(self.run_delay).await;
        }

        match self.executor.execute(command_id) {
            Ok(()) => Ok(()),
            Err(ExecutionError::Cancelled) => {
                tracing::debug!(command_id, "command cancelled");
                Ok(())
            }
            Err(ExecutionError::Failed(message)) => Err(PaletteError::CommandFailed {
                label: label.to_string(),
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::sync::Mutex;

    /// Records what ran and replies with a fixed outcome
    struct FakeExecutor {
        outcome: std::result::Result<(), ExecutionError>,
        ran: Mutex<Vec<String>>,
        history: Option<Arc<RecencyStore>>,
        seen_counter: Mutex<Option<u64>>,
    }

    impl FakeExecutor {
        fn new(outcome: std::result::Result<(), ExecutionError>) -> Self {
            Self {
                outcome,
                ran: Mutex::new(Vec::new()),
                history: None,
                seen_counter: Mutex::new(None),
            }
        }

        fn watching(mut self, history: Arc<RecencyStore>) -> Self {
            self.history = Some(history);
            self
        }
    }

    impl CommandExecutor for FakeExecutor {
        fn execute(&self, command_id: &str) -> std::result::Result<(), ExecutionError> {
            self.ran.lock().unwrap().push(command_id.to_string());
            if let Some(history) = &self.history {
                *self.seen_counter.lock().unwrap() = history.peek(command_id);
            }
            self.outcome.clone()
        }
    }

    async fn history() -> Arc<RecencyStore> {
        let db = Arc::new(Database::new_test().await.unwrap());
        Arc::new(RecencyStore::load(db, 50).await.unwrap())
    }

    #[tokio::test]
    async fn test_pick_recorded_before_execution() {
        let history = history().await;
        let executor = Arc::new(FakeExecutor::new(Ok(())).watching(Arc::clone(&history)));
        let runner = CommandRunner::new(Arc::clone(&history), executor.clone());

        runner.run("file.save", "File: Save").await.unwrap();

        assert_eq!(*executor.ran.lock().unwrap(), vec!["file.save".to_string()]);
        assert_eq!(*executor.seen_counter.lock().unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_failure_reported_but_still_counted() {
        let history = history().await;
        let executor = Arc::new(FakeExecutor::new(Err(ExecutionError::Failed(
            "disk full".to_string(),
        ))));
        let runner = CommandRunner::new(Arc::clone(&history), executor);

        let result = runner.run("file.save", "File: Save").await;

        match result {
            Err(PaletteError::CommandFailed { label, message }) => {
                assert_eq!(label, "File: Save");
                assert_eq!(message, "disk full");
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
        assert!(history.peek("file.save").is_some());
    }

    #[tokio::test]
    async fn test_cancellation_is_not_an_error() {
        let history = history().await;
        let executor = Arc::new(FakeExecutor::new(Err(ExecutionError::Cancelled)));
        let runner = CommandRunner::new(Arc::clone(&history), executor);

        assert!(runner.run("git.push", "Git: Push").await.is_ok());
        assert!(history.peek("git.push").is_some());
    }

    #[tokio::test]
    async fn test_run_delay_applies_after_push() {
        let history = history().await;
        let executor = Arc::new(FakeExecutor::new(Ok(())).watching(Arc::clone(&history)));
        let runner = CommandRunner::new(Arc::clone(&history), executor.clone())
            .with_run_delay(Duration::from_secs(30));

        // Database setup above ran on the real clock
        tokio::time::pause();
        let started = tokio::time::Instant::now();
        runner.run("view.zoom", "Zoom In").await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(*executor.ran.lock().unwrap(), vec!["view.zoom".to_string()]);
        assert_eq!(*executor.seen_counter.lock().unwrap(), Some(1));
    }
}
