//! Request lifecycle tracking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lifecycle phases for a server-rendered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Request received, processing started.
    Start,
    /// Every matched loader reached a terminal state.
    Prefetched,
    /// Render completed and extractors are final.
    Rendered,
    /// The first bytes of the document were written.
    ShellSent,
    /// Response ended normally.
    Completion,
    /// The transport closed or failed before the response ended.
    Aborted(String),
    /// A contained failure degraded the response.
    Error(String),
}

/// Timing context for observability.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark. Re-marking keeps the first instant.
    pub fn mark(&mut self, name: &str) {
        self.marks
            .entry(name.to_string())
            .or_insert_with(Instant::now);
    }

    /// Time from request start to a mark.
    pub fn since_start(&self, name: &str) -> Option<Duration> {
        self.marks.get(name).map(|t| t.duration_since(self.start))
    }

    /// Time between two marks.
    pub fn between(&self, from: &str, to: &str) -> Option<Duration> {
        let from = self.marks.get(from)?;
        let to = self.marks.get(to)?;
        Some(to.saturating_duration_since(*from))
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get time to first byte written.
    pub fn time_to_shell(&self) -> Option<Duration> {
        self.since_start("shell_sent")
    }

    /// Snapshot of all marks relative to start, sorted by time.
    pub fn marks(&self) -> Vec<(String, Duration)> {
        let mut marks: Vec<(String, Duration)> = self
            .marks
            .iter()
            .map(|(k, t)| (k.clone(), t.duration_since(self.start)))
            .collect();
        marks.sort_by_key(|(_, d)| *d);
        marks
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer trait for lifecycle events.
pub trait LifecycleObserver: Send + Sync {
    /// Called when a lifecycle phase occurs.
    fn on_phase(&self, phase: LifecyclePhase, elapsed: Duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_keeps_first_instant() {
        let mut timing = TimingContext::new();
        timing.mark("render_done");
        let first = timing.since_start("render_done");
        std::thread::sleep(Duration::from_millis(2));
        timing.mark("render_done");

        assert_eq!(timing.since_start("render_done"), first);
    }

    #[test]
    fn test_between_marks() {
        let mut timing = TimingContext::new();
        timing.mark("a");
        timing.mark("b");

        assert!(timing.between("a", "b").is_some());
        assert!(timing.between("a", "missing").is_none());
    }

    #[test]
    fn test_marks_sorted() {
        let mut timing = TimingContext::new();
        timing.mark("prefetch_done");
        std::thread::sleep(Duration::from_millis(1));
        timing.mark("render_done");

        let names: Vec<String> = timing.marks().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["prefetch_done", "render_done"]);
    }
}
