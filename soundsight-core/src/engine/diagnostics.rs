//! Session counters for observability.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct SessionDiagnostics {
    pub frames_in: AtomicUsize,
    pub source_errors: AtomicUsize,
    pub objects_in: AtomicUsize,
    pub objects_filtered: AtomicUsize,
    pub cues_emitted: AtomicUsize,
    pub mapping_issues: AtomicUsize,
    pub nav_ticks: AtomicUsize,
    pub nav_ticks_held: AtomicUsize,
    pub nav_ticks_discarded: AtomicUsize,
    pub voice_dispatches: AtomicUsize,
    pub recognitions_discarded: AtomicUsize,
}

impl SessionDiagnostics {
    pub fn bump(counter: &AtomicUsize, n: usize) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn reset_detection(&self) {
        self.frames_in.store(0, Ordering::Relaxed);
        self.source_errors.store(0, Ordering::Relaxed);
        self.objects_in.store(0, Ordering::Relaxed);
        self.objects_filtered.store(0, Ordering::Relaxed);
        self.cues_emitted.store(0, Ordering::Relaxed);
        self.mapping_issues.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            objects_in: self.objects_in.load(Ordering::Relaxed),
            objects_filtered: self.objects_filtered.load(Ordering::Relaxed),
            cues_emitted: self.cues_emitted.load(Ordering::Relaxed),
            mapping_issues: self.mapping_issues.load(Ordering::Relaxed),
            nav_ticks: self.nav_ticks.load(Ordering::Relaxed),
            nav_ticks_held: self.nav_ticks_held.load(Ordering::Relaxed),
            nav_ticks_discarded: self.nav_ticks_discarded.load(Ordering::Relaxed),
            voice_dispatches: self.voice_dispatches.load(Ordering::Relaxed),
            recognitions_discarded: self.recognitions_discarded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub frames_in: usize,
    pub source_errors: usize,
    pub objects_in: usize,
    pub objects_filtered: usize,
    pub cues_emitted: usize,
    pub mapping_issues: usize,
    pub nav_ticks: usize,
    pub nav_ticks_held: usize,
    pub nav_ticks_discarded: usize,
    pub voice_dispatches: usize,
    pub recognitions_discarded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_detection_keeps_navigation_and_voice_counters() {
        let diag = SessionDiagnostics::default();
        SessionDiagnostics::bump(&diag.frames_in, 3);
        SessionDiagnostics::bump(&diag.cues_emitted, 7);
        SessionDiagnostics::bump(&diag.nav_ticks, 2);
        SessionDiagnostics::bump(&diag.voice_dispatches, 1);

        diag.reset_detection();
        let snap = diag.snapshot();
        assert_eq!(snap.frames_in, 0);
        assert_eq!(snap.cues_emitted, 0);
        assert_eq!(snap.nav_ticks, 2);
        assert_eq!(snap.voice_dispatches, 1);
    }
}
