//! Route guards.
//!
//! Guards are pure checks over the current [`SessionStatus`], evaluated on
//! every navigation. Nothing is cached: the session context is the single
//! source of truth.
//!
//! # Example
//!
//! ```
//! use backoffice_console::guard::{Navigation, Redirect, Route, resolve};
//! use backoffice_console::session::SessionStatus;
//!
//! let navigation = resolve(Route::Users, &SessionStatus::Anonymous);
//! assert_eq!(
//!     navigation,
//!     Navigation::Redirect(Redirect { to: Route::Login, replace: true })
//! );
//! ```

use std::fmt;

use tracing::{debug, warn};

use backoffice_core::Role;

use crate::session::SessionStatus;

/// Redirect hops followed before navigation gives up.
const MAX_HOPS: usize = 4;

/// Console pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Users,
    Tenants,
}

impl Route {
    pub const ALL: [Self; 4] = [Self::Home, Self::Login, Self::Users, Self::Tenants];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/auth/login",
            Self::Users => "/users",
            Self::Tenants => "/restaurants",
        }
    }

    /// Route for a path, ignoring a trailing slash.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Self::ALL.into_iter().find(|route| route.path() == path)
    }

    /// Guards evaluated, in order, before the page renders.
    #[must_use]
    pub const fn guards(self) -> &'static [Guard] {
        match self {
            Self::Home => &[Guard::RequireAuthenticated],
            Self::Login => &[Guard::RequireAnonymous],
            Self::Users | Self::Tenants => &[
                Guard::RequireAuthenticated,
                Guard::RequireRole(Role::Admin),
            ],
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Navigation that replaces the current history entry or pushes a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub to: Route,
    pub replace: bool,
}

impl Redirect {
    #[must_use]
    pub const fn replace(to: Route) -> Self {
        Self { to, replace: true }
    }
}

/// Why a guard refused a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    /// Nobody is signed in.
    RedirectToLogin,
    /// Already signed in; the login page is not reachable.
    AlreadyAuthenticated,
    /// Signed in with a role other than the one required.
    InsufficientRole { required: Role, actual: Role },
}

impl GuardRejection {
    /// Where the rejected navigation goes instead. Every redirect replaces
    /// the history entry so back-navigation cannot loop into a guarded page.
    #[must_use]
    pub const fn redirect(self) -> Redirect {
        match self {
            Self::RedirectToLogin => Redirect::replace(Route::Login),
            Self::AlreadyAuthenticated | Self::InsufficientRole { .. } => {
                Redirect::replace(Route::Home)
            }
        }
    }
}

/// A route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    RequireAuthenticated,
    RequireAnonymous,
    RequireRole(Role),
}

impl Guard {
    /// Check the guard against the session.
    ///
    /// # Errors
    ///
    /// Returns the rejection when the session does not satisfy the guard.
    pub fn check(self, session: &SessionStatus) -> Result<(), GuardRejection> {
        match (self, session.principal()) {
            (Self::RequireAuthenticated | Self::RequireRole(_), None) => {
                Err(GuardRejection::RedirectToLogin)
            }
            (Self::RequireAnonymous, Some(_)) => Err(GuardRejection::AlreadyAuthenticated),
            (Self::RequireRole(required), Some(principal)) if principal.role != required => {
                Err(GuardRejection::InsufficientRole {
                    required,
                    actual: principal.role,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Outcome of a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Render the requested page.
    Render(Route),
    /// Render another page instead.
    Redirect(Redirect),
    /// The session is not resolved yet; render nothing.
    Blocked,
}

/// Resolve a navigation to `route`, following guard redirects.
#[must_use]
pub fn resolve(route: Route, session: &SessionStatus) -> Navigation {
    if !session.is_resolved() {
        return Navigation::Blocked;
    }

    let mut current = route;
    let mut replace = false;
    for _ in 0..MAX_HOPS {
        let rejection = current
            .guards()
            .iter()
            .find_map(|guard| guard.check(session).err());

        let Some(rejection) = rejection else {
            return if current == route {
                Navigation::Render(route)
            } else {
                Navigation::Redirect(Redirect {
                    to: current,
                    replace,
                })
            };
        };

        let redirect = rejection.redirect();
        debug!(from = %current, to = %redirect.to, ?rejection, "Navigation redirected");
        replace |= redirect.replace;
        current = redirect.to;
    }

    warn!(%route, "Navigation did not settle");
    Navigation::Blocked
}
