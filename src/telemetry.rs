//! Per-run timing/counting accumulator, one instance per unit. Nesting is
//! a plain stack of `(tag, Instant)` pairs; each `stop` folds its elapsed
//! time into the tag's running totals.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct TagStats {
    pub calls: u64,
    pub total: Duration,
    pub elements: u64,
    pub flops: u64,
}

pub struct Telemetry {
    stack: Vec<(String, Instant)>,
    stats: HashMap<String, TagStats>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            stats: HashMap::new(),
        }
    }

    /// Pushes `tag` onto the nesting stack and records the start time.
    pub fn start(&mut self, tag: &str) {
        self.stack.push((tag.to_string(), Instant::now()));
    }

    /// Pops the most recently started tag (must be `tag`, matching the
    /// original's LIFO `start`/`stop` contract) and folds its elapsed time
    /// plus the given element/flop counts into that tag's running totals.
    pub fn stop(&mut self, tag: &str, elements: u64, flops: u64) {
        let (started, at) = self
            .stack
            .pop()
            .unwrap_or_else(|| panic!("Telemetry::stop({tag}) with no matching start"));
        debug_assert_eq!(started, tag, "Telemetry start/stop tags must nest");
        let elapsed = at.elapsed();
        let entry = self.stats.entry(tag.to_string()).or_default();
        entry.calls += 1;
        entry.total += elapsed;
        entry.elements += elements;
        entry.flops += flops;
    }

    /// Emits the final summary, rank 0 only.
    pub fn print(&self, rank: usize, tags: &[&str]) {
        if rank != 0 {
            return;
        }
        for &tag in tags {
            if let Some(s) = self.stats.get(tag) {
                info!(
                    tag,
                    calls = s.calls,
                    total_ms = s.total.as_secs_f64() * 1e3,
                    elements = s.elements,
                    flops = s.flops,
                    "telemetry summary"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_start_stop_accumulates_per_tag() {
        let mut t = Telemetry::new();
        t.start("smoothen");
        t.start("smoothen");
        t.stop("smoothen", 10, 60);
        t.stop("smoothen", 10, 60);
        let s = t.stats.get("smoothen").unwrap();
        assert_eq!(s.calls, 2);
        assert_eq!(s.elements, 20);
    }

    #[test]
    #[should_panic(expected = "no matching start")]
    fn stop_without_start_panics() {
        let mut t = Telemetry::new();
        t.stop("ghost", 0, 0);
    }
}
