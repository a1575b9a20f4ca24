//! Structured metric lines.
//!
//! Every counter bump in the decision path also emits a single
//! `name key=value ...` line through `tracing`. Lines are buffered per thread
//! (bounded) so tests can assert on exactly what a decision emitted.

use std::cell::RefCell;

/// Upper bound on buffered lines per thread.
pub const MAX_BUFFERED_METRIC_LINES: usize = 4096;

thread_local! {
    static METRIC_LINES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Emit `name tail` as a structured metric line.
pub fn emit_metric_line(name: &str, tail: &str) {
    let line = if tail.is_empty() {
        name.to_string()
    } else {
        format!("{name} {tail}")
    };
    tracing::debug!(target: "barter_metrics", "{line}");
    METRIC_LINES.with(|lines| {
        let mut lines = lines.borrow_mut();
        if lines.len() >= MAX_BUFFERED_METRIC_LINES {
            lines.remove(0);
        }
        lines.push(line);
    });
}

/// Drain all metric lines buffered on the current thread.
pub fn take_metric_lines() -> Vec<String> {
    METRIC_LINES.with(|lines| std::mem::take(&mut *lines.borrow_mut()))
}
