//! Session analysis orchestration.
//!
//! Fetches a session's samples, extracts features, runs the rule battery,
//! aggregates the score, picks recommendations and hands the result to the
//! result sink. Re-running an analysis overwrites the previous result.

use chrono::Utc;
use std::sync::Arc;

use crate::core::features::compute_features;
use crate::core::rules::RuleBattery;
use crate::core::scoring::{aggregate_score, select_recommendations};
use crate::error::AnalysisError;
use crate::session::store::{ResultSink, SampleRepository};
use crate::session::types::{AnalysisResult, CallerId, Sample, SessionId};

/// Source of the current time in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(|| Utc::now().timestamp_millis())
}

/// Run the pure part of the pipeline over an already-fetched sample set.
///
/// No I/O happens here; identical inputs give bit-identical results.
pub fn analyze_samples(
    session_id: &SessionId,
    samples: &[Sample],
    session_duration_ms: i64,
    battery: &RuleBattery,
) -> Result<AnalysisResult, AnalysisError> {
    let features = compute_features(session_id, samples, session_duration_ms)?;
    tracing::debug!("Features for session {}: {:?}", session_id, features);

    let fired = battery.evaluate(&features);
    let overall_score = aggregate_score(&fired);
    let recommendations = select_recommendations(overall_score);

    Ok(AnalysisResult {
        markers: fired.into_iter().map(|w| w.marker).collect(),
        overall_score,
        recommendations,
    })
}

/// Analysis entry point bound to a sample repository and a result sink.
pub struct SessionAnalyzer<R, K> {
    repository: R,
    sink: K,
    battery: RuleBattery,
    clock: Clock,
}

impl<R: SampleRepository, K: ResultSink> SessionAnalyzer<R, K> {
    /// Create an analyzer with the standard battery and the system clock.
    pub fn new(repository: R, sink: K) -> Self {
        Self {
            repository,
            sink,
            battery: RuleBattery::standard(),
            clock: system_clock(),
        }
    }

    /// Replace the rule battery.
    pub fn with_battery(mut self, battery: RuleBattery) -> Self {
        self.battery = battery;
        self
    }

    /// Replace the clock used to measure sessions that have not ended.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn battery(&self) -> &RuleBattery {
        &self.battery
    }

    /// Run the full pipeline for a session and persist the result.
    ///
    /// Repository errors propagate unchanged. An empty sample set fails with
    /// `InsufficientData` and nothing is persisted.
    pub fn analyze(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<AnalysisResult, AnalysisError> {
        let session = self.repository.fetch_session(caller, session_id)?;
        let samples = self.repository.fetch_samples(caller, session_id)?;

        // Unrepresentable spans leave blink rate uncomputable
        let duration_ms = session.duration_ms((self.clock)()).unwrap_or(0);
        let result = match analyze_samples(session_id, &samples, duration_ms, &self.battery) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Analysis of session {} refused: {}", session_id, e);
                return Err(e);
            }
        };

        self.sink.store_result(session_id, &result)?;

        tracing::info!(
            "Analyzed session {}: {} samples, {} markers, score {:.3}",
            session_id,
            samples.len(),
            result.markers.len(),
            result.overall_score
        );
        Ok(result)
    }

    /// Previously stored result for a session, without recomputation.
    pub fn get_result(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
    ) -> Result<Option<AnalysisResult>, AnalysisError> {
        self.sink.load_result(caller, session_id)
    }
}
