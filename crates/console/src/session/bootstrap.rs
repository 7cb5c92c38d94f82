//! One-time identity probe that resolves the session at startup.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::retry::{RetryDecision, RetryPolicy};
use super::{SessionContext, SessionStatus};
use crate::api::ConsoleApi;

/// Resolve the session with the identity probe.
///
/// The session is `Loading` while this runs and ends `Authenticated` or
/// `Anonymous`; exhausting the retry budget is treated as anonymous. A 401
/// stops immediately. Calling this when bootstrap already started returns
/// the current status without probing again.
#[instrument(skip_all, fields(max_attempts = policy.max_attempts))]
pub async fn bootstrap<A: ConsoleApi>(
    api: &A,
    session: &SessionContext,
    policy: &RetryPolicy,
) -> SessionStatus {
    if !session.begin_loading() {
        debug!("Session bootstrap already started");
        return session.status();
    }

    let status = probe(api, policy).await;
    session.replace(status.clone());
    status
}

async fn probe<A: ConsoleApi>(api: &A, policy: &RetryPolicy) -> SessionStatus {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let err = match api.who_am_i().await {
            Ok(principal) => {
                info!(
                    attempts,
                    user_id = %principal.id,
                    role = %principal.role,
                    "Session authenticated"
                );
                return SessionStatus::Authenticated(principal);
            }
            Err(err) => err,
        };

        match policy.decide(err.class(), attempts) {
            RetryDecision::Retry(delay) => {
                warn!(
                    attempts,
                    error = %err,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Identity probe failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::Stop => {
                info!(attempts, error = %err, "Identity probe failed, session is anonymous");
                return SessionStatus::Anonymous;
            }
        }
    }
}

/// Run [`bootstrap`] on a task so its owner can cancel it.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
#[must_use]
pub fn spawn_bootstrap<A: ConsoleApi>(
    api: Arc<A>,
    session: SessionContext,
    policy: RetryPolicy,
) -> BootstrapHandle {
    let task_session = session.clone();
    let task = tokio::spawn(async move { bootstrap(api.as_ref(), &task_session, &policy).await });
    BootstrapHandle { task, session }
}

/// Handle to a spawned bootstrap.
#[derive(Debug)]
pub struct BootstrapHandle {
    task: JoinHandle<SessionStatus>,
    session: SessionContext,
}

impl BootstrapHandle {
    /// Wait for bootstrap to resolve the session.
    pub async fn join(self) -> SessionStatus {
        match self.task.await {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "Session bootstrap task failed");
                self.session.abandon_loading();
                self.session.status()
            }
        }
    }

    /// Stop the probe and its retries. An unresolved session goes back to
    /// `Uninitialized` so a later bootstrap can run.
    pub async fn cancel(self) {
        self.task.abort();
        // Wait for the task to stop so it cannot resolve the session late.
        let _ = self.task.await;
        self.session.abandon_loading();
        debug!("Session bootstrap cancelled");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use backoffice_core::{Principal, Role, UserId};

    use super::*;
    use crate::api::{ApiCall, ApiError, MemoryApi};

    fn admin() -> Principal {
        Principal::new(UserId::new(1), Role::Admin)
    }

    fn probes(api: &MemoryApi) -> usize {
        api.count(|c| matches!(c, ApiCall::WhoAmI))
    }

    #[tokio::test]
    async fn test_success_authenticates() {
        let api = MemoryApi::new().signed_in(admin());
        let session = SessionContext::new();

        let status = bootstrap(&api, &session, &RetryPolicy::default()).await;
        assert_eq!(status, SessionStatus::Authenticated(admin()));
        assert_eq!(session.status(), status);
        assert_eq!(probes(&api), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_is_never_retried() {
        let api = MemoryApi::new();
        let session = SessionContext::new();

        let status = bootstrap(&api, &session, &RetryPolicy::default()).await;
        assert_eq!(status, SessionStatus::Anonymous);
        assert_eq!(probes(&api), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_stop_after_three_attempts() {
        let api = MemoryApi::new().signed_in(admin());
        for _ in 0..5 {
            api.script_who_am_i(Err(ApiError::Transient("503".to_string())));
        }
        let session = SessionContext::new();

        let status = bootstrap(&api, &session, &RetryPolicy::default()).await;
        assert_eq!(status, SessionStatus::Anonymous);
        assert_eq!(probes(&api), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_retry() {
        let api = MemoryApi::new().signed_in(admin());
        api.script_who_am_i(Err(ApiError::Transient("timeout".to_string())));
        let session = SessionContext::new();

        let status = bootstrap(&api, &session, &RetryPolicy::default()).await;
        assert_eq!(status, SessionStatus::Authenticated(admin()));
        assert_eq!(probes(&api), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_after_transient_stops() {
        let api = MemoryApi::new();
        api.script_who_am_i(Err(ApiError::Transient("502".to_string())));
        let session = SessionContext::new();

        let status = bootstrap(&api, &session, &RetryPolicy::default()).await;
        assert_eq!(status, SessionStatus::Anonymous);
        assert_eq!(probes(&api), 2);
    }

    #[tokio::test]
    async fn test_second_bootstrap_is_a_no_op() {
        let api = MemoryApi::new().signed_in(admin());
        let session = SessionContext::new();
        bootstrap(&api, &session, &RetryPolicy::default()).await;

        let again = bootstrap(&api, &session, &RetryPolicy::default()).await;
        assert_eq!(again, SessionStatus::Authenticated(admin()));
        assert_eq!(probes(&api), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_is_loading_until_resolved() {
        let api = Arc::new(MemoryApi::new().signed_in(admin()));
        api.script_who_am_i(Err(ApiError::Transient("503".to_string())));
        let session = SessionContext::new();

        let handle = spawn_bootstrap(api, session.clone(), RetryPolicy::default());
        tokio::task::yield_now().await;
        assert_eq!(session.status(), SessionStatus::Loading);

        assert_eq!(session.resolved().await, SessionStatus::Authenticated(admin()));
        assert_eq!(handle.join().await, SessionStatus::Authenticated(admin()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_retries() {
        let api = Arc::new(MemoryApi::new());
        for _ in 0..3 {
            api.script_who_am_i(Err(ApiError::Transient("503".to_string())));
        }
        let session = SessionContext::new();

        let handle = spawn_bootstrap(api.clone(), session.clone(), RetryPolicy::default());
        tokio::task::yield_now().await;
        handle.cancel().await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(probes(&api), 1);
        assert_eq!(session.status(), SessionStatus::Uninitialized);
    }
}
