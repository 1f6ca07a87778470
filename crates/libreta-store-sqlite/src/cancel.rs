//! Rollback-on-drop for writes.
//!
//! A write runs on the connection's own thread and keeps going even if the
//! future awaiting it is dropped. [`CancelOnDrop`] lives in that future; when
//! it is dropped before the write reports back, it raises a flag the write
//! checks before starting and again right before `COMMIT`.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use crate::{Error, Result};

/// Held by the awaiting future. Raises the flag when dropped while armed.
pub struct CancelOnDrop {
  flag:  Arc<AtomicBool>,
  armed: bool,
}

/// Checked by the write on the connection thread.
#[derive(Clone)]
pub struct Cancellation {
  flag: Arc<AtomicBool>,
}

impl CancelOnDrop {
  pub fn new() -> (Self, Cancellation) {
    let flag = Arc::new(AtomicBool::new(false));
    let cancellation = Cancellation { flag: Arc::clone(&flag) };
    (Self { flag, armed: true }, cancellation)
  }

  /// The write finished; dropping no longer cancels anything.
  pub fn disarm(mut self) { self.armed = false; }
}

impl Drop for CancelOnDrop {
  fn drop(&mut self) {
    if self.armed {
      self.flag.store(true, Ordering::Release);
    }
  }
}

impl Cancellation {
  pub fn is_cancelled(&self) -> bool { self.flag.load(Ordering::Acquire) }

  pub fn check(&self) -> Result<()> {
    if self.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dropping_armed_guard_cancels() {
    let (guard, cancellation) = CancelOnDrop::new();
    assert!(cancellation.check().is_ok());
    drop(guard);
    assert!(matches!(cancellation.check(), Err(Error::Cancelled)));
  }

  #[test]
  fn disarmed_guard_does_not_cancel() {
    let (guard, cancellation) = CancelOnDrop::new();
    guard.disarm();
    assert!(!cancellation.is_cancelled());
  }
}
