use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for detection-loop and extraction events.
///
/// Keeps the use cases free of any particular output channel: the CLI
/// reports through the `log` facade, tests use the silent variant.
pub trait PipelineLogger: Send {
    /// Called once per completed detection cycle.
    fn cycle(&mut self, index: usize);

    /// Record how long a named stage took within one cycle.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time measurement (faces per frame, discards).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit the end-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn cycle(&mut self, _index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Default)]
struct Series {
    count: usize,
    total: f64,
    max: f64,
}

impl Series {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        self.max = self.max.max(value);
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Forwards events to the `log` facade and aggregates timings and metrics
/// for a summary when the loop stops.
///
/// Cycle heartbeats go out at debug level every `throttle_cycles` cycles.
pub struct LogPipelineLogger {
    throttle_cycles: usize,
    timings: BTreeMap<String, Series>,
    metrics: BTreeMap<String, Series>,
    start_time: Instant,
    cycles: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle_cycles: usize) -> Self {
        Self {
            throttle_cycles: throttle_cycles.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            cycles: 0,
        }
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Returns `(count, avg)` for a recorded stage.
    pub fn timing_stats(&self, stage: &str) -> Option<(usize, f64)> {
        self.timings.get(stage).map(|s| (s.count, s.avg()))
    }

    /// Returns `(count, avg)` for a recorded metric.
    pub fn metric_stats(&self, name: &str) -> Option<(usize, f64)> {
        self.metrics.get(name).map(|s| (s.count, s.avg()))
    }

    /// Formats the report, or `None` when nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Detection summary ({} cycles, {elapsed:.1}s):",
            self.cycles
        )];

        for (stage, s) in &self.timings {
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  n={}",
                s.avg(),
                s.max,
                s.count
            ));
        }
        for (name, s) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}  max {:.0}", s.avg(), s.max));
        }
        if self.cycles > 0 && elapsed > 0.0 {
            lines.push(format!(
                "  Rate: {:.1} cycles/s",
                self.cycles as f64 / elapsed
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(50)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn cycle(&mut self, index: usize) {
        self.cycles += 1;
        if index % self.throttle_cycles == 0 {
            log::debug!("Detection cycle {index}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
