//! Authentication gate.
//!
//! Decides whether the login screen or the application is shown. There are
//! exactly two resting states; `Checking` only lasts until the session probe
//! answers.

use tracing::{info, warn};

use crate::cmms::error::ApiError;
use crate::cmms::types::User;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
  /// Waiting for `GET /api/auth/me`
  Checking,
  Authenticated(User),
  Unauthenticated,
}

#[derive(Debug, Clone)]
pub struct AuthGate {
  state: AuthState,
}

impl Default for AuthGate {
  fn default() -> Self {
    Self::new()
  }
}

impl AuthGate {
  pub fn new() -> Self {
    Self {
      state: AuthState::Checking,
    }
  }

  pub fn state(&self) -> &AuthState {
    &self.state
  }

  pub fn user(&self) -> Option<&User> {
    match &self.state {
      AuthState::Authenticated(user) => Some(user),
      _ => None,
    }
  }

  pub fn is_authenticated(&self) -> bool {
    matches!(self.state, AuthState::Authenticated(_))
  }

  /// Outcome of the startup probe. Any failure, whether the server said no
  /// or could not be reached, means the login screen.
  pub fn probe_finished(&mut self, result: Result<User, ApiError>) {
    self.state = match result {
      Ok(user) => {
        info!(user = %user.full_name, "existing session");
        AuthState::Authenticated(user)
      }
      Err(e) => {
        info!(error = %e, "no usable session");
        AuthState::Unauthenticated
      }
    };
  }

  /// A login form submission succeeded.
  pub fn logged_in(&mut self, user: User) {
    info!(user = %user.full_name, "logged in");
    self.state = AuthState::Authenticated(user);
  }

  pub fn logged_out(&mut self) {
    info!("logged out");
    self.state = AuthState::Unauthenticated;
  }

  /// The server answered 401 to some request.
  ///
  /// Returns true when this ended an authenticated session.
  pub fn session_rejected(&mut self) -> bool {
    let was_authenticated = self.is_authenticated();
    if was_authenticated {
      warn!("session rejected by server");
    }
    self.state = AuthState::Unauthenticated;
    was_authenticated
  }
}
