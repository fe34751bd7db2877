//! Exposition text rendering.
//!
//! One line per sample: `name{esxi_name="..",port_id="..",client_name=".."} value`.
//! No `# TYPE` / `# HELP` lines are written and metric names are used as
//! built.

use std::fmt::Write;

use crate::metrics::MetricSample;

/// Renders samples in order, each line terminated by `\n`.
pub fn render(samples: &[MetricSample]) -> String {
    let mut out = String::new();
    for sample in samples {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{}{{esxi_name=\"{}\",port_id=\"{}\",client_name=\"{}\"}} {}",
            sample.name,
            escape_label_value(&sample.labels.esxi_name),
            sample.labels.port_id,
            escape_label_value(&sample.labels.client_name),
            sample.value
        );
    }
    out
}

/// Escapes `\`, `"` and newlines in a label value.
fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}
