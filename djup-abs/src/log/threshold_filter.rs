use tracing::{
  field::{Field, Visit},
  Event,
  Subscriber,
};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

use super::get_global_logging_threshold;

/// Suppresses events logged above the global verbosity. The level macros attach the threshold as
/// a `u64` field named `threshold`; an event carrying none always passes.
pub(crate) struct ThresholdFilterLayer;

impl<S> Layer<S> for ThresholdFilterLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
  fn event_enabled(&self, event: &Event<'_>, _ctx: Context<'_, S>) -> bool {
    let mut gate = ThresholdGate { enabled: true };
    event.record(&mut gate);
    gate.enabled
  }
}

/// Compares the `threshold` field against the global verbosity while the record is visited.
struct ThresholdGate {
  enabled: bool,
}

impl ThresholdGate {
  fn check(&mut self, threshold: u64) {
    self.enabled = threshold <= get_global_logging_threshold() as u64;
  }
}

impl Visit for ThresholdGate {
  fn record_u64(&mut self, field: &Field, value: u64) {
    if field.name() == "threshold" {
      self.check(value);
    }
  }

  // The macros always emit the threshold as a u64; a signed value can only come from a foreign
  // event, where a negative threshold means "always".
  fn record_i64(&mut self, field: &Field, value: i64) {
    if field.name() == "threshold" {
      self.check(value.max(0) as u64);
    }
  }

  fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}
