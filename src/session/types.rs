//! Session records and eye-tracking samples.
//!
//! Samples are immutable once recorded. Every numeric field is a raw
//! observation; nothing here is derived except the stimulus category tag,
//! which is resolved once when a sample is recorded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;

/// Identifier of a recording session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random session identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of the caller on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Validate a caller identity. Missing or blank identities are rejected.
    pub fn authenticate(identity: Option<&str>) -> Result<Self, AnalysisError> {
        match identity.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(Self(id.to_string())),
            _ => Err(AnalysisError::Unauthorized),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic category of a presented stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusCategory {
    Neutral,
    Emotional,
    #[serde(alias = "trauma-related")]
    TraumaRelated,
}

impl StimulusCategory {
    pub const ALL: [StimulusCategory; 3] = [
        StimulusCategory::Neutral,
        StimulusCategory::Emotional,
        StimulusCategory::TraumaRelated,
    ];

    /// Substring that marks a stimulus identifier as belonging to this category.
    fn id_marker(&self) -> &'static str {
        match self {
            StimulusCategory::Neutral => "neutral",
            StimulusCategory::Emotional => "emotional",
            StimulusCategory::TraumaRelated => "trauma",
        }
    }

    /// Infer a category from a legacy stimulus identifier.
    ///
    /// Returns `None` unless exactly one category marker occurs in the id.
    pub fn infer(stimulus_id: &str) -> Option<Self> {
        let mut matches = Self::ALL
            .iter()
            .copied()
            .filter(|c| stimulus_id.contains(c.id_marker()));
        match (matches.next(), matches.next()) {
            (Some(category), None) => Some(category),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StimulusCategory::Neutral => "neutral",
            StimulusCategory::Emotional => "emotional",
            StimulusCategory::TraumaRelated => "trauma_related",
        }
    }
}

impl fmt::Display for StimulusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StimulusCategory {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Ok(StimulusCategory::Neutral),
            "emotional" => Ok(StimulusCategory::Emotional),
            "trauma_related" | "trauma-related" | "trauma" => Ok(StimulusCategory::TraumaRelated),
            other => Err(AnalysisError::InvalidInput(format!(
                "unknown stimulus category: {other}"
            ))),
        }
    }
}

/// One eye-tracking observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Observation time (epoch milliseconds)
    pub timestamp: i64,
    /// Stimulus on screen when the sample was taken
    #[serde(default, alias = "stimulusId", skip_serializing_if = "Option::is_none")]
    pub stimulus_id: Option<String>,
    /// Category of that stimulus, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<StimulusCategory>,
    /// Horizontal gaze position (percent of screen width, center = 50)
    #[serde(alias = "gazeX")]
    pub gaze_x: f64,
    /// Vertical gaze position (percent of screen height, center = 50)
    #[serde(alias = "gazeY")]
    pub gaze_y: f64,
    /// Pupil diameter in millimetres
    #[serde(alias = "pupilDiameter")]
    pub pupil_diameter: f64,
    #[serde(default, alias = "blinkDetected")]
    pub blink_detected: bool,
    /// Fixation duration in milliseconds
    #[serde(default, alias = "fixationDuration", skip_serializing_if = "Option::is_none")]
    pub fixation_duration: Option<f64>,
    /// Saccade velocity in degrees per second
    #[serde(default, alias = "saccadeVelocity", skip_serializing_if = "Option::is_none")]
    pub saccade_velocity: Option<f64>,
}

impl Sample {
    /// Create a sample with no stimulus, blink, fixation or saccade data.
    pub fn new(timestamp: i64, gaze_x: f64, gaze_y: f64, pupil_diameter: f64) -> Self {
        Self {
            timestamp,
            stimulus_id: None,
            category: None,
            gaze_x,
            gaze_y,
            pupil_diameter,
            blink_detected: false,
            fixation_duration: None,
            saccade_velocity: None,
        }
    }

    pub fn with_stimulus(mut self, stimulus_id: impl Into<String>) -> Self {
        self.stimulus_id = Some(stimulus_id.into());
        self
    }

    pub fn with_category(mut self, category: StimulusCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_blink(mut self) -> Self {
        self.blink_detected = true;
        self
    }

    pub fn with_fixation(mut self, duration_ms: f64) -> Self {
        self.fixation_duration = Some(duration_ms);
        self
    }

    pub fn with_saccade(mut self, velocity: f64) -> Self {
        self.saccade_velocity = Some(velocity);
        self
    }

    /// Reject samples carrying non-finite measurements.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let required = [
            ("gaze_x", self.gaze_x),
            ("gaze_y", self.gaze_y),
            ("pupil_diameter", self.pupil_diameter),
        ];
        let optional = [
            ("fixation_duration", self.fixation_duration),
            ("saccade_velocity", self.saccade_velocity),
        ];

        for (field, value) in required
            .into_iter()
            .chain(optional.into_iter().filter_map(|(f, v)| v.map(|v| (f, v))))
        {
            if !value.is_finite() {
                return Err(AnalysisError::InvalidInput(format!(
                    "sample at {} has non-finite {field}",
                    self.timestamp
                )));
            }
        }
        Ok(())
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

/// A recording session and, once analyzed, its latest result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub owner: CallerId,
    pub participant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_age: Option<u32>,
    /// Kind of session, e.g. "calibration", "screening" or "complete"
    pub session_type: String,
    #[serde(default)]
    pub status: SessionStatus,
    /// Start time (epoch milliseconds)
    pub start_time: i64,
    /// End time (epoch milliseconds), set when the session completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_results: Option<AnalysisResult>,
}

impl Session {
    /// Session length in milliseconds, measured up to `now_ms` while still open.
    ///
    /// `None` if the timestamps are too far apart to represent.
    pub fn duration_ms(&self, now_ms: i64) -> Option<i64> {
        self.end_time.unwrap_or(now_ms).checked_sub(self.start_time)
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis_results.is_some()
    }
}

/// A triggered risk indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    /// Severity in [0, 1]
    pub severity: f64,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub description: String,
}

impl Marker {
    /// Create a marker, clamping severity and confidence into [0, 1].
    pub fn new(
        name: impl Into<String>,
        severity: f64,
        confidence: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            severity: severity.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            description: description.into(),
        }
    }
}

/// Outcome of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Markers in rule evaluation order
    pub markers: Vec<Marker>,
    /// Clamped weighted score in [0, 1]
    pub overall_score: f64,
    pub recommendations: Vec<String>,
}
