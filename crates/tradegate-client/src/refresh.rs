//! Single-flight refresh coordination.
//!
//! At most one credential refresh runs at a time. The first 401 creates the
//! operation; every 401 that arrives while it is outstanding awaits the same
//! memoized future instead of starting a second one. The operation runs on a
//! spawned task, so a waiter dropping out never stalls or cancels the
//! refresh for its siblings.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Clonable failure carried to every waiter of a failed refresh.
#[derive(Debug, Clone, Error)]
#[error("refresh failed: {message}")]
pub struct RefreshFailure {
    message: String,
}

impl RefreshFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

#[derive(Default)]
struct GateInner {
    in_flight: Mutex<Option<SharedRefresh>>,
}

/// The refresh coordinator: a memoized in-flight refresh operation.
///
/// The check-and-create of the slot happens under one lock acquisition, so
/// two concurrent 401 handlers can never both become the leader.
#[derive(Default)]
pub struct RefreshGate {
    inner: Arc<GateInner>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the in-flight refresh, creating it from `make_op` if none is
    /// outstanding. Returns the new access token.
    ///
    /// `make_op` is only invoked by the caller that finds the slot empty.
    /// The operation itself must store the new credential and escalate on
    /// failure; the gate only deduplicates and fans out the outcome.
    pub async fn wait<F, Fut>(&self, make_op: F) -> Result<String, RefreshFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, RefreshFailure>> + Send + 'static,
    {
        let shared = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(shared) => {
                    debug!("refresh already in flight, queueing");
                    shared.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let op = make_op();
                    // Detached task: the refresh settles even if every
                    // waiter is dropped, and the settled task clears the
                    // slot for the next cycle.
                    let handle = tokio::spawn(async move {
                        let result = op.await;
                        inner.in_flight.lock().await.take();
                        if let Err(error) = &result {
                            warn!(%error, "refresh operation failed");
                        }
                        result
                    });
                    let shared: SharedRefresh = async move {
                        match handle.await {
                            Ok(result) => result,
                            Err(_) => Err(RefreshFailure::new("refresh task aborted")),
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Whether a refresh operation is currently outstanding.
    pub async fn is_in_flight(&self) -> bool {
        self.inner.in_flight.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_flight_for_concurrent_waiters() {
        let gate = Arc::new(RefreshGate::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                gate.wait(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok("T2".to_string())
                })
                .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "T2");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_fans_out_to_all_waiters() {
        let gate = Arc::new(RefreshGate::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = gate.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                gate.wait(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err(RefreshFailure::new("refresh token expired"))
                })
                .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slot_clears_after_settlement() {
        let gate = Arc::new(RefreshGate::new());

        gate.wait(|| async { Ok("T2".to_string()) }).await.unwrap();

        // The detached task clears the slot once the operation settles;
        // give it a tick to run.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!gate.is_in_flight().await);

        // A later cycle starts a fresh operation.
        let second = gate.wait(|| async { Ok("T3".to_string()) }).await.unwrap();
        assert_eq!(second, "T3");
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_disturb_siblings() {
        let gate = Arc::new(RefreshGate::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = {
            let gate = gate.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                gate.wait(move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(60)).await;
                    Ok("T2".to_string())
                })
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let cancelled = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait(|| async { Ok(String::new()) }).await })
        };
        let survivor = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait(|| async { Ok(String::new()) }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        cancelled.abort();

        assert_eq!(leader.await.unwrap().unwrap(), "T2");
        assert_eq!(survivor.await.unwrap().unwrap(), "T2");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_survives_leader_cancellation() {
        let gate = Arc::new(RefreshGate::new());

        let leader = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.wait(|| async {
                    tokio::time::sleep(Duration::from_millis(60)).await;
                    Ok("T2".to_string())
                })
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let follower = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait(|| async { Ok(String::new()) }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        leader.abort();

        // The operation runs on a detached task, so the follower still
        // receives the settled result.
        assert_eq!(follower.await.unwrap().unwrap(), "T2");
    }
}
