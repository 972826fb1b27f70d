use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::ApiResult;

/// Outcome of an optimistic mutation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Applied locally and confirmed remotely.
    Applied,
    /// Refused: a mutation on the same entity is still pending. Nothing
    /// was applied; the caller should keep the control disabled.
    InFlight,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Entity ids with a mutation currently in flight.
///
/// Rollback arithmetic is only exact when each optimistic apply is
/// paired with at most one inverse, so a second mutation on the same
/// entity is refused until the first settles. Claims release on drop.
#[derive(Debug, Default, Clone)]
pub struct InFlightSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims an entity, or returns `None` if it is already claimed.
    pub fn try_claim(&self, key: &str) -> Option<InFlightClaim> {
        if lock(&self.inner).insert(key.to_string()) {
            Some(InFlightClaim {
                set: Arc::clone(&self.inner),
                key: key.to_string(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.inner).contains(key)
    }
}

pub struct InFlightClaim {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.key);
    }
}

/// The one optimistic-update pattern every store reuses: apply the
/// forward transform under the state lock, run the remote operation,
/// and apply the exact inverse if it fails.
///
/// The lock is never held across the await; UI reads between dispatch
/// and settlement see the optimistic value, which is the point.
pub async fn apply_with_rollback<S, O, F>(
    state: &Mutex<S>,
    forward: impl FnOnce(&mut S),
    inverse: impl FnOnce(&mut S),
    remote: F,
) -> ApiResult<O>
where
    F: Future<Output = ApiResult<O>>,
{
    {
        let mut guard = lock(state);
        forward(&mut guard);
    }

    match remote.await {
        Ok(value) => Ok(value),
        Err(error) => {
            log::warn!("remote mutation failed, rolling back: {}", error);
            let mut guard = lock(state);
            inverse(&mut guard);
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;

    #[test]
    fn test_claim_blocks_second_claim_until_dropped() {
        let set = InFlightSet::new();
        let claim = set.try_claim("p1").unwrap();
        assert!(set.try_claim("p1").is_none());
        assert!(set.try_claim("p2").is_some(), "other entities unaffected");

        drop(claim);
        assert!(set.try_claim("p1").is_some());
    }

    #[tokio::test]
    async fn test_rollback_applies_inverse_on_failure() {
        let state = Mutex::new(5i64);
        let result: ApiResult<()> = apply_with_rollback(
            &state,
            |v| *v += 1,
            |v| *v -= 1,
            async { Err(ApiError::Api("boom".to_string())) },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(*lock(&state), 5, "state restored after failure");
    }

    #[tokio::test]
    async fn test_success_keeps_optimistic_value() {
        let state = Mutex::new(5i64);
        let result: ApiResult<i64> = apply_with_rollback(
            &state,
            |v| *v += 1,
            |v| *v -= 1,
            async { Ok(42) },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*lock(&state), 6);
    }
}
