//! Core analysis engine.
//!
//! This module contains:
//! - Feature extraction from a session's samples
//! - The marker rule battery
//! - Score aggregation and recommendation tiers
//! - The session analysis orchestrator
//! - Screening report building for export

pub mod analysis;
pub mod features;
pub mod report;
pub mod rules;
pub mod scoring;

// Re-export commonly used types
pub use analysis::{analyze_samples, Clock, SessionAnalyzer};
pub use features::{compute_features, partition_by_category, Dispersion, SessionFeatures};
pub use report::{ReportBuilder, ScreeningReport, PRODUCER_NAME, REPORT_VERSION};
pub use rules::{MarkerRule, RuleBattery, WeightedMarker};
pub use scoring::{aggregate_score, select_recommendations, RiskTier};
