use std::time::{Duration, Instant};

/// Ceiling of the simulated curve. Only real data may go past it.
const SIMULATED_CEILING: f64 = 98.0;
/// Ceiling of real progress before the completion event arrives.
const REAL_CEILING: f64 = 99.0;

/// Advisory progress of a stream session, in percent.
///
/// Until the backend reports how many entries there are, the value follows
/// an ease toward 98% driven by elapsed time. Once the count is known the
/// real fraction replaces the simulated value, even when that is lower, and
/// only moves forward from there. Completion snaps to 100.
#[derive(Debug, Clone)]
pub struct Progress {
  started_at: Option<Instant>,
  time_constant: Duration,
  total: Option<usize>,
  done: usize,
  value: f64,
  finished: bool,
}

impl Progress {
  pub fn new(time_constant: Duration) -> Self {
    Self {
      started_at: None,
      time_constant: time_constant.max(Duration::from_millis(1)),
      total: None,
      done: 0,
      value: 0.0,
      finished: false,
    }
  }

  pub fn start(&mut self, now: Instant) {
    *self = Self { started_at: Some(now), ..Self::new(self.time_constant) };
  }

  /// Stops the simulation without completing (cancel or failure).
  pub fn halt(&mut self) {
    self.started_at = None;
  }

  pub fn is_simulating(&self) -> bool {
    self.started_at.is_some() && self.total.is_none() && !self.finished
  }

  pub fn tick(&mut self, now: Instant) {
    let Some(started) = self.started_at else { return };
    if !self.is_simulating() {
      return;
    }
    let elapsed = now.saturating_duration_since(started).as_secs_f64();
    let simulated = simulated_percent(elapsed, self.time_constant.as_secs_f64());
    self.raise(simulated);
  }

  /// Real entry count is known; simulation stops and the real fraction
  /// takes over from here.
  pub fn set_total(&mut self, total: usize) {
    if self.finished {
      return;
    }
    let first = self.total.is_none();
    self.total = Some(total);
    match self.real_percent() {
      Some(real) if first => self.value = real,
      _ => self.apply_real(),
    }
  }

  pub fn item_done(&mut self) {
    if self.finished {
      return;
    }
    self.done += 1;
    self.apply_real();
  }

  pub fn finish(&mut self) {
    self.finished = true;
    self.started_at = None;
    self.value = 100.0;
  }

  pub fn percent(&self) -> u8 {
    self.value.round().clamp(0.0, 100.0) as u8
  }

  fn apply_real(&mut self) {
    if let Some(real) = self.real_percent() {
      self.raise(real);
    }
  }

  fn real_percent(&self) -> Option<f64> {
    let total = self.total?;
    if total == 0 {
      return Some(REAL_CEILING);
    }
    Some((self.done.min(total) as f64 / total as f64) * REAL_CEILING)
  }

  fn raise(&mut self, candidate: f64) {
    if candidate > self.value {
      self.value = candidate;
    }
  }
}

/// `98 * (1 - e^(-t / tau))`.
pub fn simulated_percent(elapsed_secs: f64, tau_secs: f64) -> f64 {
  SIMULATED_CEILING * (1.0 - (-elapsed_secs / tau_secs).exp())
}
