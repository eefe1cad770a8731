//! Screening report builder.
//!
//! Turns an analyzed session into an exportable report document. The report
//! restates the stored result; it never recomputes anything.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::scoring::{severity_label, RiskTier};
use crate::session::types::{AnalysisResult, Session};
use crate::SCREENING_DISCLAIMER;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "ocular-screen";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// Participant details copied from the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Session start (RFC3339)
    pub session_date: String,
}

/// One reported indicator, derived from a marker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportIndicator {
    pub indicator: String,
    /// "High", "Moderate" or "Low"
    pub severity: String,
    pub severity_score: f64,
    /// Confidence as a whole percentage
    pub confidence_pct: u32,
    pub description: String,
}

/// A complete screening report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningReport {
    pub report_version: String,
    pub report_id: String,
    pub session_id: String,
    /// When this report was generated (RFC3339)
    pub generated_at: String,
    pub producer: ReportProducer,
    pub participant: ParticipantInfo,
    pub session_type: String,
    /// Rounded session length; absent while the session is in progress
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    pub overall_score: f64,
    pub risk_tier: RiskTier,
    pub risk_level: String,
    pub key_findings: Vec<String>,
    pub indicators: Vec<ReportIndicator>,
    pub recommendations: Vec<String>,
    pub disclaimer: String,
}

/// Builder for screening reports.
pub struct ReportBuilder {
    instance_id: Uuid,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuilder {
    /// Create a new report builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn build(&self, session: &Session, result: &AnalysisResult) -> ScreeningReport {
        let tier = RiskTier::from_score(result.overall_score);

        let indicators: Vec<ReportIndicator> = result
            .markers
            .iter()
            .map(|m| ReportIndicator {
                indicator: m.name.clone(),
                severity: severity_label(m.severity).to_string(),
                severity_score: m.severity,
                confidence_pct: (m.confidence * 100.0).round() as u32,
                description: m.description.clone(),
            })
            .collect();

        let key_findings = if result.markers.is_empty() {
            vec![
                "The eye-tracking analysis did not identify significant PTSD markers in this session."
                    .to_string(),
            ]
        } else {
            result
                .markers
                .iter()
                .map(|m| m.description.clone())
                .collect()
        };

        let session_date = Utc
            .timestamp_millis_opt(session.start_time)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        ScreeningReport {
            report_version: REPORT_VERSION.to_string(),
            report_id: Uuid::new_v4().to_string(),
            session_id: session.id.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: self.instance_id.to_string(),
            },
            participant: ParticipantInfo {
                name: session.participant_name.clone(),
                age: session.participant_age,
                session_date,
            },
            session_type: session.session_type.clone(),
            duration_minutes: session
                .end_time
                .and_then(|end| end.checked_sub(session.start_time))
                .map(|ms| (ms as f64 / 60_000.0).round() as i64),
            overall_score: result.overall_score,
            risk_tier: tier,
            risk_level: tier.label().to_string(),
            key_findings,
            indicators,
            recommendations: result.recommendations.clone(),
            disclaimer: SCREENING_DISCLAIMER.trim().to_string(),
        }
    }

    /// Build a report and serialize it to pretty JSON.
    pub fn build_json(
        &self,
        session: &Session,
        result: &AnalysisResult,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.build(session, result))
    }
}
