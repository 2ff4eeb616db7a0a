//! Optimistic field transactions.
//!
//! A view proposes a new value, shows it immediately, and later either
//! commits it (the server agreed) or reverts to the last confirmed value.

/// Where the field stands relative to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
  /// A proposed value is shown but not yet confirmed
  Pending,
  /// The shown value matches what the server confirmed
  Committed,
  /// The last proposal failed and the confirmed value was restored
  Reverted,
}

/// Identifies one proposed change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeToken(u64);

#[derive(Debug, Clone)]
pub struct OptimisticField<T> {
  confirmed: T,
  current: T,
  state: FieldState,
  pending: Option<ChangeToken>,
  next_token: u64,
}

impl<T: Clone> OptimisticField<T> {
  pub fn new(value: T) -> Self {
    Self {
      confirmed: value.clone(),
      current: value,
      state: FieldState::Committed,
      pending: None,
      next_token: 0,
    }
  }

  /// The value to display.
  pub fn value(&self) -> &T {
    &self.current
  }

  pub fn confirmed(&self) -> &T {
    &self.confirmed
  }

  pub fn state(&self) -> FieldState {
    self.state
  }

  pub fn is_pending(&self) -> bool {
    self.state == FieldState::Pending
  }

  /// Show `value` right away. Supersedes any earlier pending change.
  pub fn propose(&mut self, value: T) -> ChangeToken {
    self.next_token += 1;
    let token = ChangeToken(self.next_token);
    self.current = value;
    self.state = FieldState::Pending;
    self.pending = Some(token);
    token
  }

  /// Confirm the change identified by `token` with the value the server
  /// returned. Returns false (and changes nothing) for a superseded token.
  pub fn commit(&mut self, token: ChangeToken, value: T) -> bool {
    if self.pending != Some(token) {
      return false;
    }
    self.confirmed = value.clone();
    self.current = value;
    self.state = FieldState::Committed;
    self.pending = None;
    true
  }

  /// Restore the last confirmed value after the change identified by
  /// `token` failed. Returns false for a superseded token.
  pub fn revert(&mut self, token: ChangeToken) -> bool {
    if self.pending != Some(token) {
      return false;
    }
    self.current = self.confirmed.clone();
    self.state = FieldState::Reverted;
    self.pending = None;
    true
  }

  /// Take in a freshly fetched server value.
  ///
  /// A pending proposal keeps being shown until its own result arrives.
  pub fn sync(&mut self, value: T) {
    self.confirmed = value.clone();
    if self.pending.is_none() {
      self.current = value;
    }
  }
}
