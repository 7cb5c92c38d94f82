//! Application-scoped session: bootstrap, login and logout.
//!
//! The [`SessionContext`] is created once per run and handed to everything
//! that needs it. Its status is only ever replaced whole, by bootstrap,
//! login or logout.

mod bootstrap;
mod retry;

pub use bootstrap::{BootstrapHandle, bootstrap, spawn_bootstrap};
pub use retry::{RetryDecision, RetryPolicy};

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use backoffice_core::Principal;

use crate::api::{ConsoleApi, Credentials};
use crate::error::ConsoleError;

/// Lifecycle of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Bootstrap has not started.
    Uninitialized,
    /// The identity probe is in progress.
    Loading,
    Authenticated(Principal),
    Anonymous,
}

impl SessionStatus {
    /// Whether bootstrap has settled the session one way or the other.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::Anonymous)
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }
}

/// Shared handle to the single session of the application.
///
/// Clones observe the same status.
#[derive(Debug, Clone)]
pub struct SessionContext {
    status: Arc<watch::Sender<SessionStatus>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// New, uninitialized session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: Arc::new(watch::Sender::new(SessionStatus::Uninitialized)),
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Wait until the session is authenticated or anonymous.
    pub async fn resolved(&self) -> SessionStatus {
        let mut changes = self.status.subscribe();
        match changes.wait_for(SessionStatus::is_resolved).await {
            Ok(status) => status.clone(),
            Err(_) => self.status(),
        }
    }

    fn replace(&self, status: SessionStatus) {
        self.status.send_replace(status);
    }

    /// Move `Uninitialized` to `Loading`. False if bootstrap already ran.
    fn begin_loading(&self) -> bool {
        self.status.send_if_modified(|status| {
            if *status == SessionStatus::Uninitialized {
                *status = SessionStatus::Loading;
                true
            } else {
                false
            }
        })
    }

    /// Move an interrupted `Loading` back to `Uninitialized`.
    fn abandon_loading(&self) {
        self.status.send_if_modified(|status| {
            if *status == SessionStatus::Loading {
                *status = SessionStatus::Uninitialized;
                true
            } else {
                false
            }
        });
    }
}

/// Sign in with email and password and replace the session.
///
/// Only principals whose role may use the console are accepted; anyone else
/// is signed out again and the session stays anonymous.
///
/// # Errors
///
/// - `Api` when the credentials are rejected or the API fails
/// - `NotAllowed` when the principal's role cannot use the console
#[instrument(skip_all)]
pub async fn login<A: ConsoleApi>(
    api: &A,
    session: &SessionContext,
    credentials: &Credentials,
) -> Result<Principal, ConsoleError> {
    api.login(credentials).await?;
    let principal = api.who_am_i().await?;

    if !principal.role.can_use_console() {
        if let Err(err) = api.logout().await {
            warn!(error = %err, "Failed to end rejected session");
        }
        session.replace(SessionStatus::Anonymous);
        return Err(ConsoleError::NotAllowed(principal.role));
    }

    info!(user_id = %principal.id, role = %principal.role, "Signed in");
    session.replace(SessionStatus::Authenticated(principal.clone()));
    Ok(principal)
}

/// End the session. The session becomes anonymous even if the call fails.
#[instrument(skip_all)]
pub async fn logout<A: ConsoleApi>(api: &A, session: &SessionContext) {
    if let Err(err) = api.logout().await {
        warn!(error = %err, "Logout call failed, clearing session anyway");
    }
    session.replace(SessionStatus::Anonymous);
    info!("Signed out");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use backoffice_core::{Role, UserId};

    use super::*;
    use crate::api::{ApiCall, ApiError, MemoryApi};

    fn credentials(email: &str) -> Credentials {
        Credentials::new(email, SecretString::from("correct-horse"))
    }

    fn api() -> MemoryApi {
        MemoryApi::new()
            .with_account(
                "admin@pizza.example",
                "correct-horse",
                Principal::new(UserId::new(1), Role::Admin),
            )
            .with_account(
                "guest@pizza.example",
                "correct-horse",
                Principal::new(UserId::new(2), Role::Customer),
            )
    }

    #[tokio::test]
    async fn test_login_authenticates_console_roles() {
        let api = api();
        let session = SessionContext::new();

        let principal = login(&api, &session, &credentials("admin@pizza.example"))
            .await
            .unwrap();
        assert_eq!(principal.role, Role::Admin);
        assert_eq!(session.status(), SessionStatus::Authenticated(principal));
    }

    #[tokio::test]
    async fn test_login_rejects_customers() {
        let api = api();
        let session = SessionContext::new();

        let err = login(&api, &session, &credentials("guest@pizza.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::NotAllowed(Role::Customer)));
        assert_eq!(session.status(), SessionStatus::Anonymous);
        assert_eq!(api.count(|c| matches!(c, ApiCall::Logout)), 1);
    }

    #[tokio::test]
    async fn test_login_with_bad_password_leaves_session_alone() {
        let api = api();
        let session = SessionContext::new();
        session.replace(SessionStatus::Anonymous);

        let bad = Credentials::new("admin@pizza.example", SecretString::from("wrong"));
        let err = login(&api, &session, &bad).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Api(ApiError::Unauthorized)));
        assert_eq!(session.status(), SessionStatus::Anonymous);
    }

    /// Writer that keeps formatted log lines for inspection.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_logs_user_id_not_email() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let api = api();
        let session = SessionContext::new();
        login(&api, &session, &credentials("admin@pizza.example"))
            .await
            .unwrap();

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Signed in"));
        assert!(output.contains("user_id=1"));
        assert!(!output.contains("pizza.example"));
    }

    #[tokio::test]
    async fn test_logout_always_clears_session() {
        let api = api();
        let session = SessionContext::new();
        login(&api, &session, &credentials("admin@pizza.example"))
            .await
            .unwrap();

        let observer = session.clone();
        logout(&api, &session).await;
        assert_eq!(observer.status(), SessionStatus::Anonymous);
    }
}
