//! Cancellable one-shot and repeating timers over an externally driven clock.
//!
//! Nothing here sleeps. The event loop feeds elapsed time into [`Scheduler::pop_due`]
//! and tests feed virtual time the same way, so timer behaviour is deterministic.

use std::time::Duration;

/// Handle returned when a timer is scheduled. Cancelling a stale handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
  /// Refreshes the progress bar from the engine's current position.
  PositionRefresh,
  /// Refreshes the status/terminal panel and samples the system colour scheme.
  StatusRefresh,
  /// Checks whether buffering is still stuck on the constrained profile.
  BufferingRetry,
  /// Second step of the stream quality reduction.
  QualityStep,
}

#[derive(Debug)]
struct Entry {
  handle: TimerHandle,
  kind: TimerKind,
  due: Duration,
  period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
  now: Duration,
  next_id: u64,
  entries: Vec<Entry>,
}

impl Scheduler {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current clock value as last observed by [`Scheduler::pop_due`].
  pub fn now(&self) -> Duration {
    self.now
  }

  /// Fire `kind` once after `delay`.
  pub fn once(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
    self.insert(kind, delay, None)
  }

  /// Fire `kind` every `period`, first after one period. Zero periods are bumped to 1ms.
  pub fn every(&mut self, period: Duration, kind: TimerKind) -> TimerHandle {
    let period = period.max(Duration::from_millis(1));
    self.insert(kind, period, Some(period))
  }

  fn insert(&mut self, kind: TimerKind, delay: Duration, period: Option<Duration>) -> TimerHandle {
    self.next_id += 1;
    let handle = TimerHandle(self.next_id);
    self.entries.push(Entry { handle, kind, due: self.now + delay, period });
    handle
  }

  /// Cancel a timer. Returns whether it was still scheduled.
  pub fn cancel(&mut self, handle: TimerHandle) -> bool {
    let before = self.entries.len();
    self.entries.retain(|e| e.handle != handle);
    self.entries.len() != before
  }

  /// Cancel the timer in `slot`, if any, leaving `None` behind.
  pub fn cancel_slot(&mut self, slot: &mut Option<TimerHandle>) {
    if let Some(handle) = slot.take() {
      self.cancel(handle);
    }
  }

  /// Number of live timers of the given kind.
  pub fn count(&self, kind: TimerKind) -> usize {
    self.entries.iter().filter(|e| e.kind == kind).count()
  }

  /// Earliest pending deadline, used by the event loop to size its poll timeout.
  pub fn next_deadline(&self) -> Option<Duration> {
    self.entries.iter().map(|e| e.due).min()
  }

  /// Advance the clock to `now` and pop the earliest timer that is due.
  ///
  /// Call repeatedly until it returns `None`; handlers may schedule or cancel timers
  /// between calls. Repeating timers are rescheduled one period after their deadline;
  /// periods missed while the clock jumped are skipped, not replayed.
  pub fn pop_due(&mut self, now: Duration) -> Option<(TimerHandle, TimerKind)> {
    if now > self.now {
      self.now = now;
    }
    let idx = self
      .entries
      .iter()
      .enumerate()
      .filter(|(_, e)| e.due <= self.now)
      .min_by_key(|(_, e)| (e.due, e.handle.0))
      .map(|(i, _)| i)?;

    let entry = &self.entries[idx];
    let (fired, period) = ((entry.handle, entry.kind), entry.period);
    match period {
      Some(period) => {
        let next = self.entries[idx].due + period;
        self.entries[idx].due = if next > self.now { next } else { self.now + period };
      }
      None => {
        self.entries.swap_remove(idx);
      }
    }
    Some(fired)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  fn drain(s: &mut Scheduler, now: Duration) -> Vec<TimerKind> {
    std::iter::from_fn(|| s.pop_due(now).map(|(_, kind)| kind)).collect()
  }

  #[test]
  fn one_shot_fires_once() {
    let mut s = Scheduler::new();
    let h = s.once(ms(1800), TimerKind::BufferingRetry);
    assert!(drain(&mut s, ms(1799)).is_empty());
    assert_eq!(drain(&mut s, ms(1800)), vec![TimerKind::BufferingRetry]);
    assert!(!s.cancel(h));
    assert!(drain(&mut s, ms(5000)).is_empty());
  }

  #[test]
  fn repeating_timer_keeps_its_period() {
    let mut s = Scheduler::new();
    s.every(ms(500), TimerKind::PositionRefresh);
    assert_eq!(drain(&mut s, ms(500)).len(), 1);
    assert_eq!(drain(&mut s, ms(999)).len(), 0);
    assert_eq!(drain(&mut s, ms(1000)).len(), 1);
    assert_eq!(s.next_deadline(), Some(ms(1500)));
    assert_eq!(s.count(TimerKind::PositionRefresh), 1);
  }

  #[test]
  fn repeating_timer_skips_missed_periods() {
    let mut s = Scheduler::new();
    s.every(ms(500), TimerKind::PositionRefresh);
    s.every(ms(2500), TimerKind::StatusRefresh);
    let fired = drain(&mut s, ms(600_000));
    assert_eq!(fired.iter().filter(|k| **k == TimerKind::PositionRefresh).count(), 1);
    assert_eq!(fired.iter().filter(|k| **k == TimerKind::StatusRefresh).count(), 1);
    assert_eq!(s.next_deadline(), Some(ms(600_500)));
    assert_eq!(drain(&mut s, ms(600_500)), vec![TimerKind::PositionRefresh]);
  }

  #[test]
  fn cancelled_timer_never_fires() {
    let mut s = Scheduler::new();
    let h = s.once(ms(100), TimerKind::QualityStep);
    assert!(s.cancel(h));
    assert!(!s.cancel(h));
    assert!(drain(&mut s, ms(1000)).is_empty());
  }

  #[test]
  fn cancel_slot_clears_handle() {
    let mut s = Scheduler::new();
    let mut slot = Some(s.every(ms(500), TimerKind::PositionRefresh));
    s.cancel_slot(&mut slot);
    assert!(slot.is_none());
    assert_eq!(s.count(TimerKind::PositionRefresh), 0);
    // Cancelling an empty slot is harmless.
    s.cancel_slot(&mut slot);
  }

  #[test]
  fn timers_fire_in_deadline_order() {
    let mut s = Scheduler::new();
    s.once(ms(300), TimerKind::QualityStep);
    s.once(ms(100), TimerKind::BufferingRetry);
    assert_eq!(drain(&mut s, ms(400)), vec![TimerKind::BufferingRetry, TimerKind::QualityStep]);
  }

  #[test]
  fn delays_are_relative_to_last_observed_time() {
    let mut s = Scheduler::new();
    assert!(s.pop_due(ms(1000)).is_none());
    s.once(ms(500), TimerKind::BufferingRetry);
    assert_eq!(s.next_deadline(), Some(ms(1500)));
  }

  #[test]
  fn clock_never_runs_backwards() {
    let mut s = Scheduler::new();
    s.pop_due(ms(1000));
    s.pop_due(ms(10));
    assert_eq!(s.now(), ms(1000));
  }
}
