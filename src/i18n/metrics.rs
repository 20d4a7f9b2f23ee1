//! Translation metrics and observability module.
//!
//! Counters are owned by a `Translator` and shared with every localizer it
//! hands out, so two translators in one process never mix their numbers.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for one translator.
#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Resolutions that found the message in some language
    resolved: AtomicUsize,

    /// Resolutions that fell back to the message id
    missing: AtomicUsize,

    /// Successful catalog reloads (the initial load included)
    reloads: AtomicUsize,

    /// Reloads that failed and left the previous catalog live
    reload_failures: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_resolved(&self) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing(&self) {
        self.missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reload(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reload_failure(&self) {
        self.reload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn resolved(&self) -> usize {
        self.resolved.load(Ordering::Relaxed)
    }

    pub fn missing(&self) -> usize {
        self.missing.load(Ordering::Relaxed)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::Relaxed)
    }

    pub fn reload_failures(&self) -> usize {
        self.reload_failures.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let resolved = self.resolved();
        let missing = self.missing();
        let total = resolved + missing;
        let hit_rate = if total > 0 {
            (resolved as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            resolved,
            missing,
            hit_rate,
            reloads: self.reloads(),
            reload_failures: self.reload_failures(),
        }
    }
}

/// Metrics report containing current translation statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    /// Number of resolutions that found a translation
    pub resolved: usize,

    /// Number of resolutions that returned the message id
    pub missing: usize,

    /// Share of resolutions that found a translation, as a percentage (0-100)
    pub hit_rate: f64,

    /// Number of successful catalog loads
    pub reloads: usize,

    /// Number of failed catalog loads
    pub reload_failures: usize,
}
