//! Host application state.
//!
//! `AppState` is shared by every command handler and by the event forwarders
//! started in `main`.

use parking_lot::Mutex;
use serde::Serialize;
use soundsight_core::engine::DiagnosticsSnapshot;
use soundsight_core::{RecognizerHandle, SoundSightSession, SourceHandle};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use crate::settings::AppSettings;

pub struct AppState {
    /// The core session. Wrapped in `Arc` so forwarders can hold it too.
    pub session: Arc<SoundSightSession>,
    /// Persisted app settings cache.
    pub settings: Arc<Mutex<AppSettings>>,
    /// Absolute path to `settings.json`.
    pub settings_path: PathBuf,
    /// Rolling handler latency metrics.
    pub perf_metrics: Arc<Mutex<PerfMetrics>>,
}

impl AppState {
    pub fn new(
        settings: AppSettings,
        settings_path: PathBuf,
        source: SourceHandle,
        recognizer: RecognizerHandle,
    ) -> Self {
        let session = SoundSightSession::new(settings.session_config(), source, recognizer);
        Self {
            session: Arc::new(session),
            settings: Arc::new(Mutex::new(settings)),
            settings_path,
            perf_metrics: Arc::new(Mutex::new(PerfMetrics::default())),
        }
    }

    pub fn perf_snapshot(&self) -> PerfSnapshot {
        let metrics = self.perf_metrics.lock().snapshot();
        PerfSnapshot {
            session: self.session.diagnostics_snapshot(),
            scene_render_ms: metrics.scene_render_ms,
            voice_dispatch_ms: metrics.voice_dispatch_ms,
            persist_ms: metrics.persist_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfSnapshot {
    pub session: DiagnosticsSnapshot,
    pub scene_render_ms: StageSnapshot,
    pub voice_dispatch_ms: StageSnapshot,
    pub persist_ms: StageSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSnapshot {
    pub count: usize,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Default)]
pub struct PerfMetrics {
    scene_render_ms: StageWindow,
    voice_dispatch_ms: StageWindow,
    persist_ms: StageWindow,
}

#[derive(Debug, Clone, Copy)]
pub struct PerfMetricsSnapshot {
    pub scene_render_ms: StageSnapshot,
    pub voice_dispatch_ms: StageSnapshot,
    pub persist_ms: StageSnapshot,
}

impl PerfMetrics {
    pub fn record_scene_render(&mut self, elapsed_ms: f64) {
        self.scene_render_ms.record(elapsed_ms);
    }

    pub fn record_voice_dispatch(&mut self, elapsed_ms: f64) {
        self.voice_dispatch_ms.record(elapsed_ms);
    }

    pub fn record_persist(&mut self, elapsed_ms: f64) {
        self.persist_ms.record(elapsed_ms);
    }

    pub fn snapshot(&self) -> PerfMetricsSnapshot {
        PerfMetricsSnapshot {
            scene_render_ms: self.scene_render_ms.snapshot(),
            voice_dispatch_ms: self.voice_dispatch_ms.snapshot(),
            persist_ms: self.persist_ms.snapshot(),
        }
    }
}

const WINDOW_CAP: usize = 256;

/// Bounded window of recent samples plus lifetime count, sum and max.
#[derive(Debug)]
struct StageWindow {
    samples: VecDeque<f64>,
    count: usize,
    sum_ms: f64,
    max_ms: f64,
}

impl Default for StageWindow {
    fn default() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_CAP),
            count: 0,
            sum_ms: 0.0,
            max_ms: 0.0,
        }
    }
}

impl StageWindow {
    fn record(&mut self, elapsed_ms: f64) {
        let v = if elapsed_ms.is_finite() { elapsed_ms.max(0.0) } else { 0.0 };
        if self.samples.len() == WINDOW_CAP {
            self.samples.pop_front();
        }
        self.samples.push_back(v);
        self.count = self.count.saturating_add(1);
        self.sum_ms += v;
        self.max_ms = self.max_ms.max(v);
    }

    fn snapshot(&self) -> StageSnapshot {
        if self.samples.is_empty() {
            return StageSnapshot {
                count: 0,
                mean_ms: 0.0,
                p50_ms: 0.0,
                p95_ms: 0.0,
                max_ms: 0.0,
            };
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let percentile = |p: f64| {
            let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };

        StageSnapshot {
            count: self.count,
            mean_ms: self.sum_ms / self.count as f64,
            p50_ms: percentile(0.50),
            p95_ms: percentile(0.95),
            max_ms: self.max_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_reports_zeroes() {
        let metrics = PerfMetrics::default();
        let snap = metrics.snapshot();
        assert_eq!(snap.persist_ms.count, 0);
        assert_eq!(snap.persist_ms.p95_ms, 0.0);
    }

    #[test]
    fn window_tracks_percentiles_and_ignores_bad_samples() {
        let mut metrics = PerfMetrics::default();
        for ms in 1..=100 {
            metrics.record_scene_render(ms as f64);
        }
        metrics.record_scene_render(f64::NAN);

        let snap = metrics.snapshot().scene_render_ms;
        assert_eq!(snap.count, 101);
        assert_eq!(snap.max_ms, 100.0);
        assert_eq!(snap.p50_ms, 50.0);
        assert!(snap.p95_ms >= 94.0);
    }

    #[test]
    fn window_is_bounded_but_count_is_lifetime() {
        let mut window = StageWindow::default();
        for _ in 0..(WINDOW_CAP + 10) {
            window.record(2.0);
        }
        assert_eq!(window.samples.len(), WINDOW_CAP);
        assert_eq!(window.snapshot().count, WINDOW_CAP + 10);
        assert_eq!(window.snapshot().mean_ms, 2.0);
    }
}
