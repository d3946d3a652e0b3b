// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tower::BoxError;
use tracing::error;

/// Wait for the first task in the set to exit and return its result.
pub async fn wait_for_any_task(tasks: &mut JoinSet<Result<(), BoxError>>) -> Result<(), BoxError> {
    match tasks.join_next().await {
        // Empty set, nothing left to wait on
        None => Ok(()),
        Some(res) => res?,
    }
}

/// Drain the set with no deadline, returning the last task error seen.
pub async fn wait_for_tasks(tasks: &mut JoinSet<Result<(), BoxError>>) -> Result<(), BoxError> {
    let mut result = Ok(());
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => result = Err(e),
            Err(e) => error!(error = ?e, "Failed to join with task"),
        }
    }
    result
}

pub async fn wait_for_tasks_with_timeout(
    tasks: &mut JoinSet<Result<(), BoxError>>,
    timeout: Duration,
) -> Result<(), BoxError> {
    wait_for_tasks_with_deadline(tasks, Instant::now() + timeout).await
}

/// Drain the set, returning the last task error seen. Tasks still running
/// at `stop_at` produce a timeout error.
pub async fn wait_for_tasks_with_deadline(
    tasks: &mut JoinSet<Result<(), BoxError>>,
    stop_at: Instant,
) -> Result<(), BoxError> {
    let mut result = Ok(());
    loop {
        match timeout_at(stop_at, tasks.join_next()).await {
            Err(_) => {
                result = Err("timed out waiting for tasks to complete".into());
                break;
            }
            Ok(None) => break,
            Ok(Some(Ok(Ok(())))) => {}
            Ok(Some(Ok(Err(e)))) => result = Err(e),
            Ok(Some(Err(e))) => error!(error = ?e, "Failed to join with task"),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_any_task_returns_first_error() {
        let mut tasks: JoinSet<Result<(), BoxError>> = JoinSet::new();
        tasks.spawn(async { Err("scanner failed".into()) });

        let res = wait_for_any_task(&mut tasks).await;
        assert_eq!(res.unwrap_err().to_string(), "scanner failed");
    }

    #[tokio::test]
    async fn test_empty_set_completes() {
        let mut tasks: JoinSet<Result<(), BoxError>> = JoinSet::new();
        assert_ok!(wait_for_any_task(&mut tasks).await);
        assert_ok!(wait_for_tasks_with_timeout(&mut tasks, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_deadline_expires_for_stuck_task() {
        let mut tasks: JoinSet<Result<(), BoxError>> = JoinSet::new();
        tasks.spawn(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });

        let res = wait_for_tasks_with_timeout(&mut tasks, Duration::from_millis(20)).await;
        assert_err!(res);

        // The stuck task is still in the set after the deadline
        assert_eq!(tasks.len(), 1);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn test_wait_for_tasks_outlasts_slow_task() {
        let mut tasks: JoinSet<Result<(), BoxError>> = JoinSet::new();
        tasks.spawn(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        });
        tasks.spawn(async { Err("flush failed".into()) });

        let res = wait_for_tasks(&mut tasks).await;
        assert_eq!(res.unwrap_err().to_string(), "flush failed");
        assert!(tasks.is_empty());
    }
}
