//! Deadline-bounded fan-out of independent futures.
//!
//! A stage issues all of its backend calls at once and keeps whichever
//! complete before the stage deadline. Abandonment is soft: outstanding
//! calls are not interrupted remotely, their results are simply never
//! observed.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::time::Duration;

/// Result of driving a fan-out set against a deadline.
#[derive(Debug)]
pub struct FanOutResult<T> {
    /// Outputs of the futures that completed in time, in completion order.
    pub completed: Vec<T>,
    /// How many futures were abandoned at the deadline.
    pub abandoned: usize,
    /// Whether the deadline fired before every future completed.
    pub deadline_hit: bool,
}

/// Drives `futures` concurrently, collecting completions until `deadline`.
///
/// Returns once every future has completed or the deadline elapses,
/// whichever comes first. Completion order is not related to submission
/// order; callers must not assume any ordering among the results.
pub async fn collect_until_deadline<T, F>(
    futures: Vec<F>,
    deadline: Duration,
) -> FanOutResult<T>
where
    F: Future<Output = T> + Send,
    T: Send,
{
    let total = futures.len();
    let mut pending: FuturesUnordered<F> = futures.into_iter().collect();
    let mut completed = Vec::with_capacity(total);

    let timer = tokio::time::sleep(deadline);
    tokio::pin!(timer);

    let mut deadline_hit = false;
    loop {
        tokio::select! {
            maybe = pending.next() => {
                match maybe {
                    Some(output) => completed.push(output),
                    None => break,
                }
            }
            () = &mut timer => {
                deadline_hit = true;
                break;
            }
        }
    }

    let abandoned = total - completed.len();
    FanOutResult {
        completed,
        abandoned,
        deadline_hit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn reply_after(value: u32, delay_ms: u64) -> u32 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        value
    }

    #[tokio::test]
    async fn test_all_complete_before_deadline() {
        let futures = vec![
            reply_after(1, 5),
            reply_after(2, 10),
            reply_after(3, 1),
        ];

        let result = collect_until_deadline(futures, Duration::from_secs(5)).await;

        assert_eq!(result.completed.len(), 3);
        assert_eq!(result.abandoned, 0);
        assert!(!result.deadline_hit);
    }

    #[tokio::test]
    async fn test_partial_results_kept_at_deadline() {
        let futures = vec![
            reply_after(1, 5),
            reply_after(2, 500),
            reply_after(3, 500),
        ];

        let result = collect_until_deadline(futures, Duration::from_millis(60)).await;

        assert_eq!(result.completed, vec![1]);
        assert_eq!(result.abandoned, 2);
        assert!(result.deadline_hit);
    }

    #[tokio::test]
    async fn test_empty_set() {
        let futures: Vec<std::future::Ready<u32>> = Vec::new();
        let result = collect_until_deadline(futures, Duration::from_millis(10)).await;

        assert!(result.completed.is_empty());
        assert_eq!(result.abandoned, 0);
        assert!(!result.deadline_hit);
    }

    #[test]
    fn test_completion_order_not_submission_order() {
        tokio_test::block_on(async {
            let futures = vec![reply_after(1, 40), reply_after(2, 5)];
            let result = collect_until_deadline(futures, Duration::from_secs(5)).await;
            assert_eq!(result.completed, vec![2, 1]);
        });
    }
}
