//! The logger's lifecycle state machine.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where the logger is in its life.
///
/// Advances `Uninit -> Idle -> Working <-> Idle -> Stopped`. `Stopped` is
/// terminal and is only reached by the worker executing a stop directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
  /// The worker loop has not started.
  Uninit = 0,
  /// Waiting on the queue for work.
  Idle = 1,
  /// Executing one message.
  Working = 2,
  /// The stop directive has been executed; nothing further runs.
  Stopped = 3,
}

impl TryFrom<u8> for LifecycleState {
  type Error = u8;

  /// Decodes the discriminant; any other byte is handed back.
  fn try_from(raw: u8) -> Result<Self, Self::Error> {
    match raw {
      0 => Ok(LifecycleState::Uninit),
      1 => Ok(LifecycleState::Idle),
      2 => Ok(LifecycleState::Working),
      3 => Ok(LifecycleState::Stopped),
      other => Err(other),
    }
  }
}

impl LifecycleState {
  /// Whether the state machine allows moving from `self` to `next`.
  pub fn can_transition_to(self, next: LifecycleState) -> bool {
    use LifecycleState::*;
    matches!(
      (self, next),
      (Uninit, Idle) | (Idle, Working) | (Working, Idle) | (Working, Stopped)
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      LifecycleState::Uninit => "uninit",
      LifecycleState::Idle => "idle",
      LifecycleState::Working => "working",
      LifecycleState::Stopped => "stopped",
    }
  }
}

impl fmt::Display for LifecycleState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A shared, lock-free holder of the current [`LifecycleState`].
///
/// Only the worker thread writes it; producers read it for introspection.
/// Admission of new work is decided by the queue under its own lock, so a
/// stale read here never lets a send through after a close.
#[derive(Debug)]
pub(crate) struct StateCell {
  raw: AtomicU8,
}

impl StateCell {
  pub(crate) fn new(initial: LifecycleState) -> Self {
    Self {
      raw: AtomicU8::new(initial as u8),
    }
  }

  #[inline]
  pub(crate) fn load(&self) -> LifecycleState {
    Self::decode(self.raw.load(Ordering::Acquire))
  }

  // The cell is only ever written with `LifecycleState as u8`.
  fn decode(raw: u8) -> LifecycleState {
    LifecycleState::try_from(raw)
      .unwrap_or_else(|raw| unreachable!("corrupt lifecycle state byte {}", raw))
  }

  /// Moves to `next` if the transition is legal from the current state.
  ///
  /// Returns the state observed before the attempt.
  pub(crate) fn transition(&self, next: LifecycleState) -> Result<LifecycleState, LifecycleState> {
    let mut current = self.load();
    loop {
      if current == next {
        return Ok(current);
      }
      if !current.can_transition_to(next) {
        return Err(current);
      }
      match self.raw.compare_exchange(
        current as u8,
        next as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
      ) {
        Ok(_) => return Ok(current),
        Err(observed) => current = Self::decode(observed),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use LifecycleState::*;

  #[test]
  fn legal_transitions() {
    let cell = StateCell::new(Uninit);
    assert_eq!(cell.transition(Idle), Ok(Uninit));
    assert_eq!(cell.transition(Working), Ok(Idle));
    assert_eq!(cell.transition(Idle), Ok(Working));
    assert_eq!(cell.transition(Working), Ok(Idle));
    assert_eq!(cell.transition(Stopped), Ok(Working));
    assert_eq!(cell.load(), Stopped);
  }

  #[test]
  fn stopped_is_terminal() {
    let cell = StateCell::new(Working);
    cell.transition(Stopped).unwrap();
    for next in [Uninit, Idle, Working] {
      assert_eq!(cell.transition(next), Err(Stopped));
    }
    assert_eq!(cell.load(), Stopped);
  }

  #[test]
  fn stopped_only_from_working() {
    assert_eq!(StateCell::new(Idle).transition(Stopped), Err(Idle));
    assert_eq!(StateCell::new(Uninit).transition(Stopped), Err(Uninit));
  }

  #[test]
  fn no_regression_to_uninit() {
    let cell = StateCell::new(Idle);
    assert_eq!(cell.transition(Uninit), Err(Idle));
  }

  #[test]
  fn decodes_only_known_discriminants() {
    for state in [Uninit, Idle, Working, Stopped] {
      assert_eq!(LifecycleState::try_from(state as u8), Ok(state));
    }
    assert_eq!(LifecycleState::try_from(4), Err(4));
    assert_eq!(LifecycleState::try_from(u8::MAX), Err(u8::MAX));
  }

  #[test]
  fn display_names() {
    assert_eq!(Working.to_string(), "working");
    assert_eq!(Stopped.to_string(), "stopped");
  }
}
