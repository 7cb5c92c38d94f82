//! Command implementations and the shared console connection.
//!
//! # Environment Variables
//!
//! - `CONSOLE_PASSWORD` - Operator password used with `--operator`
//! - `CONSOLE_NEW_USER_PASSWORD` - Password of accounts created with `users create`

pub mod session;
pub mod tenants;
pub mod users;

use std::sync::Arc;

use backoffice_console::api::ApiError;
use backoffice_console::family::Family;
use backoffice_console::guard::{Navigation, Route, resolve};
use backoffice_console::session::{bootstrap, login};
use backoffice_console::{
    ConsoleConfig, ConsoleError, Credentials, HttpApi, InvalidationBus,
    ListController, MutationCoordinator, RetryPolicy, SessionContext,
};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Console(#[from] ConsoleError),

    /// The page guard redirected instead of rendering.
    #[error("{route} is not available to this session (redirected to {redirect})")]
    Redirected { route: Route, redirect: Route },

    /// The session is not resolved.
    #[error("Session is not established")]
    NoSession,

    /// Record lookup failed.
    #[error("No {0} found")]
    NotFound(String),

    /// Argument could not be parsed.
    #[error("Invalid {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },

    /// The list could not be fetched.
    #[error("List fetch failed: {0}")]
    ListFailed(String),
}

impl CliError {
    /// Log the failure. Unexpected console and API failures also go to Sentry.
    pub fn report(&self) {
        match self {
            Self::Console(err) => err.report(),
            Self::Api(err) => ConsoleError::Api(err.clone()).report(),
            other => tracing::error!(error = %other, "Command failed"),
        }
    }
}

/// Resolved session plus the API it was resolved against.
pub struct Console {
    pub api: Arc<HttpApi>,
    pub session: SessionContext,
    pub bus: InvalidationBus,
    pub config: ConsoleConfig,
}

impl Console {
    /// Bootstrap the session, signing in with `email` and `CONSOLE_PASSWORD`
    /// when the probe finds no session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built, the password is
    /// missing, or the login is rejected.
    pub async fn connect(config: ConsoleConfig, email: Option<&str>) -> Result<Self, CliError> {
        let api = Arc::new(HttpApi::new(&config)?);
        let session = SessionContext::new();
        let policy = RetryPolicy::with_max_attempts(config.bootstrap_attempts);

        let status = bootstrap(api.as_ref(), &session, &policy).await;
        if let Some(email) = email.filter(|_| !status.is_authenticated()) {
            let password = std::env::var("CONSOLE_PASSWORD")
                .map_err(|_| CliError::MissingEnvVar("CONSOLE_PASSWORD"))?;
            let credentials = Credentials::new(email, SecretString::from(password));
            login(api.as_ref(), &session, &credentials).await?;
        }

        Ok(Self {
            api,
            session,
            bus: InvalidationBus::new(),
            config,
        })
    }

    /// Check the route's guards, as a page render would.
    ///
    /// # Errors
    ///
    /// Returns `Redirected` when a guard sends the operator elsewhere.
    pub fn enter(&self, route: Route) -> Result<(), CliError> {
        match resolve(route, &self.session.status()) {
            Navigation::Render(_) => Ok(()),
            Navigation::Redirect(redirect) => Err(CliError::Redirected {
                route,
                redirect: redirect.to,
            }),
            Navigation::Blocked => Err(CliError::NoSession),
        }
    }

    /// Mount the list page of a family.
    #[must_use]
    pub fn mount<F: Family>(&self) -> ListController<F, HttpApi> {
        ListController::mount(Arc::clone(&self.api), &self.bus, &self.config)
    }

    #[must_use]
    pub fn mutations<F: Family>(&self) -> MutationCoordinator<F, HttpApi> {
        MutationCoordinator::new(Arc::clone(&self.api), self.bus.clone())
    }
}

/// Page through a mounted list until `matches` finds a record.
///
/// # Errors
///
/// Returns `ListFailed` when a page cannot be fetched and `NotFound` when
/// no page holds a match.
pub async fn find_record<F: Family>(
    list: &ListController<F, HttpApi>,
    what: &str,
    matches: impl Fn(&F::Record) -> bool,
) -> Result<F::Record, CliError> {
    let mut page = 1;
    loop {
        list.set_page(page);
        let state = list.settled().await;
        if let Some(error) = state.error {
            return Err(CliError::ListFailed(error));
        }
        let Some(result) = state.result else {
            return Err(CliError::NotFound(what.to_string()));
        };
        if let Some(record) = result.items.into_iter().find(|r| matches(r)) {
            return Ok(record);
        }
        if u64::from(page) * u64::from(state.query.per_page()) >= result.total {
            return Err(CliError::NotFound(what.to_string()));
        }
        page += 1;
    }
}
