use std::collections::HashMap;

/// Observer for recognition pipeline events.
///
/// Injected into the use case so the library never configures a global
/// logger; callers choose where events go.
pub trait PipelineLogger: Send {
    /// Number of faces that survived localization.
    fn faces_detected(&mut self, count: usize);

    /// Label predicted for the face at `index` (detection order).
    fn emotion_predicted(&mut self, index: usize, label: &str);

    /// How long a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn info(&mut self, message: &str);

    /// End-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events. The default for library callers and tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn faces_detected(&mut self, _count: usize) {}
    fn emotion_predicted(&mut self, _index: usize, _label: &str) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Forwards events to the `log` facade and keeps per-stage timings for
/// a summary line.
#[derive(Default)]
pub struct LogPipelineLogger {
    timings: HashMap<String, Vec<f64>>,
    faces: usize,
    labels: Vec<String>,
}

impl LogPipelineLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.labels.is_empty() {
            return None;
        }

        let mut lines = vec![format!("Recognition summary ({} faces):", self.faces)];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let total_ms: f64 = self.timings[stage].iter().sum();
            lines.push(format!("  {stage:10}: {total_ms:7.1}ms"));
        }

        if !self.labels.is_empty() {
            lines.push(format!("  labels: {}", self.labels.join(", ")));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn faces_detected(&mut self, count: usize) {
        self.faces = count;
        log::info!("Detected {count} faces");
    }

    fn emotion_predicted(&mut self, index: usize, label: &str) {
        self.labels.push(label.to_string());
        log::info!("Predicted emotion for face {index}: {label}");
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
        log::debug!("{stage} took {duration_ms:.1}ms");
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
