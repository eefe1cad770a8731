//! Score aggregation and recommendation tiers.

use serde::{Deserialize, Serialize};

use crate::core::rules::WeightedMarker;

/// Scores at or above this fall in the urgent tier.
pub const URGENT_THRESHOLD: f64 = 0.70;

/// Scores at or above this (and below urgent) fall in the moderate tier.
pub const MODERATE_THRESHOLD: f64 = 0.40;

const URGENT_RECOMMENDATIONS: [&str; 4] = [
    "URGENT: Comprehensive PTSD assessment by qualified mental health professional recommended within 48 hours",
    "Consider immediate safety assessment and crisis intervention if needed",
    "Implement trauma-informed care protocols",
    "Monitor for additional trauma-related symptoms and comorbidities",
];

const MODERATE_RECOMMENDATIONS: [&str; 4] = [
    "Follow-up PTSD screening recommended within 2-4 weeks",
    "Consider stress management and coping skills interventions",
    "Monitor sleep patterns and anxiety levels",
    "Provide psychoeducation about trauma responses",
];

const LOW_RECOMMENDATIONS: [&str; 4] = [
    "No significant PTSD markers detected in current eye tracking analysis",
    "Continue routine mental health monitoring",
    "Maintain healthy stress management practices",
    "Consider annual screening if risk factors present",
];

/// Weighted sum of marker severities, clamped to [0, 1].
///
/// Weights are not renormalized, so the raw sum may exceed 1 before clamping.
pub fn aggregate_score(markers: &[WeightedMarker]) -> f64 {
    markers
        .iter()
        .fold(0.0, |score, m| score + m.contribution())
        .clamp(0.0, 1.0)
}

/// Guidance band selected by the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Moderate,
    Urgent,
}

impl RiskTier {
    pub fn from_score(score: f64) -> Self {
        if score >= URGENT_THRESHOLD {
            RiskTier::Urgent
        } else if score >= MODERATE_THRESHOLD {
            RiskTier::Moderate
        } else {
            RiskTier::Low
        }
    }

    /// The fixed recommendation list for this tier.
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            RiskTier::Urgent => &URGENT_RECOMMENDATIONS,
            RiskTier::Moderate => &MODERATE_RECOMMENDATIONS,
            RiskTier::Low => &LOW_RECOMMENDATIONS,
        }
    }

    /// Human-readable risk label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Urgent => "High Risk",
            RiskTier::Moderate => "Moderate Risk",
            RiskTier::Low => "Low Risk",
        }
    }
}

/// Owned copy of the recommendation list for a score.
pub fn select_recommendations(score: f64) -> Vec<String> {
    RiskTier::from_score(score)
        .recommendations()
        .iter()
        .map(|r| r.to_string())
        .collect()
}

/// Severity band label for a single marker ("High", "Moderate" or "Low").
pub fn severity_label(severity: f64) -> &'static str {
    if severity >= 0.7 {
        "High"
    } else if severity >= 0.4 {
        "Moderate"
    } else {
        "Low"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::Marker;

    fn weighted(severity: f64, weight: f64) -> WeightedMarker {
        WeightedMarker {
            marker: Marker::new("m", severity, 0.5, "d"),
            weight,
        }
    }

    #[test]
    fn test_empty_score_is_zero() {
        assert_eq!(aggregate_score(&[]), 0.0);
    }

    #[test]
    fn test_score_sums_contributions() {
        let score = aggregate_score(&[weighted(0.8, 0.25), weighted(0.5, 0.30)]);
        assert!((score - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_clamped() {
        let all_max: Vec<WeightedMarker> = [0.25, 0.30, 0.35, 0.25, 0.20, 0.15, 0.20]
            .iter()
            .map(|&w| weighted(1.0, w))
            .collect();
        // Raw sum is 1.70
        assert_eq!(aggregate_score(&all_max), 1.0);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(RiskTier::from_score(0.0), RiskTier::Low);
        assert_eq!(RiskTier::from_score(0.3999), RiskTier::Low);
        assert_eq!(RiskTier::from_score(0.40), RiskTier::Moderate);
        assert_eq!(RiskTier::from_score(0.6999), RiskTier::Moderate);
        assert_eq!(RiskTier::from_score(0.70), RiskTier::Urgent);
        assert_eq!(RiskTier::from_score(1.0), RiskTier::Urgent);
    }

    #[test]
    fn test_tier_recommendations_are_fixed() {
        for tier in [RiskTier::Low, RiskTier::Moderate, RiskTier::Urgent] {
            assert_eq!(tier.recommendations().len(), 4);
        }
        assert!(RiskTier::Urgent.recommendations()[0].starts_with("URGENT"));
        assert_eq!(
            select_recommendations(0.1)[0],
            "No significant PTSD markers detected in current eye tracking analysis"
        );
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(severity_label(0.9), "High");
        assert_eq!(severity_label(0.4), "Moderate");
        assert_eq!(severity_label(0.39), "Low");
    }
}
