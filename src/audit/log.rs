//! Activity log for analysis work.
//!
//! Keeps counters of what the engine has processed without storing any
//! participant data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Activity counters for the current process.
#[derive(Debug)]
pub struct ActivityLog {
    samples_recorded: AtomicU64,
    analyses_completed: AtomicU64,
    /// Analyses refused for lack of data
    analyses_refused: AtomicU64,
    reports_exported: AtomicU64,
    started_at: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            samples_recorded: AtomicU64::new(0),
            analyses_completed: AtomicU64::new(0),
            analyses_refused: AtomicU64::new(0),
            reports_exported: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create an activity log that carries counts over from `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous activity stats: {}", e);
        }

        log
    }

    pub fn record_samples(&self, count: u64) {
        self.samples_recorded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_analysis_completed(&self) {
        self.analyses_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_analysis_refused(&self) {
        self.analyses_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_report_exported(&self) {
        self.reports_exported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ActivityStats {
        ActivityStats {
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            analyses_completed: self.analyses_completed.load(Ordering::Relaxed),
            analyses_refused: self.analyses_refused.load(Ordering::Relaxed),
            reports_exported: self.reports_exported.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Activity:\n\
             - Samples recorded: {}\n\
             - Analyses completed: {}\n\
             - Analyses refused (no data): {}\n\
             - Reports exported: {}\n\
             - Uptime: {} seconds",
            stats.samples_recorded,
            stats.analyses_completed,
            stats.analyses_refused,
            stats.reports_exported,
            stats.uptime_secs
        )
    }

    /// Save counters to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                samples_recorded: stats.samples_recorded,
                analyses_completed: stats.analyses_completed,
                analyses_refused: stats.analyses_refused,
                reports_exported: stats.reports_exported,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.samples_recorded
                    .store(persisted.samples_recorded, Ordering::Relaxed);
                self.analyses_completed
                    .store(persisted.analyses_completed, Ordering::Relaxed);
                self.analyses_refused
                    .store(persisted.analyses_refused, Ordering::Relaxed);
                self.reports_exported
                    .store(persisted.reports_exported, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.samples_recorded.store(0, Ordering::Relaxed);
        self.analyses_completed.store(0, Ordering::Relaxed);
        self.analyses_refused.store(0, Ordering::Relaxed);
        self.reports_exported.store(0, Ordering::Relaxed);
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of activity counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub samples_recorded: u64,
    pub analyses_completed: u64,
    pub analyses_refused: u64,
    pub reports_exported: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    samples_recorded: u64,
    analyses_completed: u64,
    analyses_refused: u64,
    reports_exported: u64,
    last_updated: DateTime<Utc>,
}

pub type SharedActivityLog = Arc<ActivityLog>;

pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedActivityLog {
    Arc::new(ActivityLog::with_persistence(path))
}
