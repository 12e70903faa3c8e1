// Batch – joins a set of concurrent API calls and reports partial failure.
//
// None of the hosting API calls are transactional. When one call of a batch
// fails the others may already have been applied, so a failed batch carries
// how many calls went through alongside every individual error.

use futures::future::join_all;
use std::fmt;
use std::future::Future;

use crate::error::ApiError;

/// Outcome of a batch in which at least one call failed.
#[derive(Debug)]
pub struct BatchFailure {
    /// Number of calls issued.
    pub total: usize,
    /// Number of calls that succeeded (and whose effects are visible).
    pub succeeded: usize,
    /// Failed calls with their position in the batch.
    pub failures: Vec<(usize, ApiError)>,
}

impl BatchFailure {
    /// A one-call batch that failed.
    pub fn single(error: ApiError) -> Self {
        Self {
            total: 1,
            succeeded: 0,
            failures: vec![(0, error)],
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether some calls of the batch were applied before it failed.
    pub fn is_partial(&self) -> bool {
        self.succeeded > 0
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} calls failed, {} applied",
            self.failed(),
            self.total,
            self.succeeded
        )
    }
}

impl std::error::Error for BatchFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|(_, e)| e as &(dyn std::error::Error + 'static))
    }
}

/// Drive every call to completion concurrently and return the results in
/// request order.
///
/// All calls are awaited even after one fails, so the failure report is
/// complete. Completion order is not observable to the caller.
pub async fn join_all_reporting<I, F, T>(calls: I) -> Result<Vec<T>, BatchFailure>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, ApiError>>,
{
    let results = join_all(calls).await;
    let total = results.len();

    let mut values = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(value) => values.push(value),
            Err(error) => {
                tracing::warn!("call {} of {} failed: {}", index + 1, total, error);
                failures.push((index, error));
            }
        }
    }

    if failures.is_empty() {
        return Ok(values);
    }

    let failure = BatchFailure {
        total,
        succeeded: values.len(),
        failures,
    };
    if failure.is_partial() {
        tracing::warn!(
            "{} of {} calls were applied despite the failure",
            failure.succeeded,
            failure.total
        );
    }
    Err(failure)
}
