use std::fmt::Write;

use tracing::field::{Field, Visit};
use tracing_subscriber::{
  field::RecordFields,
  fmt::{format::Writer, FormatFields},
};

/// Renders event fields with the synthetic `threshold` field stripped: the message first, any
/// remaining fields after it as `name=value` pairs.
pub(crate) struct ThresholdFieldFormatter;

impl<'writer> FormatFields<'writer> for ThresholdFieldFormatter {
  fn format_fields<R: RecordFields>(&self, mut writer: Writer<'writer>, fields: R) -> std::fmt::Result {
    let mut collector = FieldCollector::default();
    fields.record(&mut collector);

    write!(writer, "{}", collector.message)?;
    if !collector.extra.is_empty() {
      write!(writer, " {}", collector.extra.trim_end())?;
    }
    Ok(())
  }
}

/// Buffers the message and the other fields so they can be emitted in a fixed order, whatever
/// order they were recorded in.
#[derive(Default)]
struct FieldCollector {
  message: String,
  extra: String,
}

impl Visit for FieldCollector {
  // All the typed `record_*` methods funnel into this one by default.
  fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
    match field.name() {
      "message" => {
        let _ = write!(self.message, "{:?}", value);
      }
      "threshold" => {}
      name => {
        let _ = write!(self.extra, "{}={:?} ", name, value);
      }
    }
  }
}
