/*!

Threshold-filtered logging for the engine, backed by the `tracing` crate.

Every message is logged "at" a numeric threshold; only messages whose threshold is at most the
global verbosity are emitted, whatever their level. Higher global values mean chattier logs, and
a message logged at threshold 0 always comes through:

```
use djup_abs::log::{get_global_logging_threshold, set_global_logging_threshold};

set_global_logging_threshold(4);
assert_eq!(get_global_logging_threshold(), 4);
```

The macros `critical!`, `error!`, `warning!`, `info!`, `debug!` and `trace!` take an optional
leading threshold (defaulting to 0) followed by `format!`-style arguments:

```ignore
debug!(3, "expanding node {}", node);
warning!("always emitted");
```

The subscriber is installed lazily on first use; the macros take care of it. The global threshold
is an atomic, so the macros are safe to use from any thread.

*/
mod formatter;
mod macros;
mod threshold_filter;

use std::sync::{
  atomic::{AtomicU8, Ordering},
  Once,
};

use tracing_subscriber::{fmt, layer::SubscriberExt, Registry};

pub use macros::*;

/// Verbosity before anyone calls `set_global_logging_threshold`.
const DEFAULT_THRESHOLD: u8 = 3;

static GLOBAL_LOGGING_THRESHOLD: AtomicU8 = AtomicU8::new(DEFAULT_THRESHOLD);
static INSTALL_SUBSCRIBER: Once = Once::new();

/// Installs the threshold-filtering subscriber. The logging macros call this implicitly; calling
/// it again is a no-op.
pub fn init_logger() {
  INSTALL_SUBSCRIBER.call_once(|| {
    let subscriber = Registry::default()
        .with(threshold_filter::ThresholdFilterLayer)
        .with(
          fmt::layer()
              .fmt_fields(formatter::ThresholdFieldFormatter)
              .with_target(false)
              .without_time()
              .with_writer(std::io::stdout),
        );

    // An embedding application may have installed its own subscriber already; in that case the
    // macros degrade to plain tracing events.
    let _ = tracing::subscriber::set_global_default(subscriber);
  });
}

/// Sets the global verbosity. Messages logged at a greater threshold are not emitted.
pub fn set_global_logging_threshold(new_threshold: u8) {
  GLOBAL_LOGGING_THRESHOLD.store(new_threshold, Ordering::Relaxed);
}

/// Reads the global verbosity.
pub fn get_global_logging_threshold() -> u8 {
  GLOBAL_LOGGING_THRESHOLD.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn threshold_roundtrip() {
    set_global_logging_threshold(5);
    assert_eq!(get_global_logging_threshold(), 5);

    let node = 7;
    info!(2, "expanding node {}", node);
    debug!(9, "not emitted, threshold exceeds the global verbosity");
    warning!("always emitted, implicit threshold 0");
    critical!(1, "scary but emitted: {}", node);

    set_global_logging_threshold(DEFAULT_THRESHOLD);
  }
}
