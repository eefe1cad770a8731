//! Marker rule battery.
//!
//! Each rule looks at the extracted features and emits at most one marker.
//! A rule whose inputs are not computable stays silent. All triggers are
//! strict comparisons: a value sitting exactly on a threshold does not fire.

use crate::core::features::SessionFeatures;
use crate::session::types::{Marker, StimulusCategory};

/// One independent marker detector.
pub trait MarkerRule: Send + Sync {
    /// Marker name emitted by this rule.
    fn name(&self) -> &'static str;

    /// Coefficient applied to this rule's severity in the overall score.
    fn weight(&self) -> f64;

    fn evaluate(&self, features: &SessionFeatures) -> Option<Marker>;
}

/// A fired marker together with the weight of the rule that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedMarker {
    pub marker: Marker,
    pub weight: f64,
}

impl WeightedMarker {
    /// Amount this marker adds to the unclamped score.
    pub fn contribution(&self) -> f64 {
        self.marker.severity * self.weight
    }
}

/// Pupil size varies more than autonomic regulation normally allows.
pub struct PupilDysregulationRule;

impl PupilDysregulationRule {
    const THRESHOLD_MM: f64 = 0.4;
}

impl MarkerRule for PupilDysregulationRule {
    fn name(&self) -> &'static str {
        "Pupil Dilation Dysregulation"
    }

    fn weight(&self) -> f64 {
        0.25
    }

    fn evaluate(&self, features: &SessionFeatures) -> Option<Marker> {
        let variability = features.pupil.std_dev;
        if variability > Self::THRESHOLD_MM {
            Some(Marker::new(
                self.name(),
                (variability * 1.5).min(1.0),
                0.85,
                format!(
                    "Significant pupil size variability ({variability:.2}mm) indicates autonomic \
                     nervous system dysregulation, commonly associated with hyperarousal in PTSD"
                ),
            ))
        } else {
            None
        }
    }
}

/// Fixations on emotional stimuli are markedly shorter than on neutral ones.
pub struct EmotionalAvoidanceRule;

impl EmotionalAvoidanceRule {
    const RATIO_THRESHOLD: f64 = 0.7;
}

impl MarkerRule for EmotionalAvoidanceRule {
    fn name(&self) -> &'static str {
        "Emotional Stimulus Avoidance"
    }

    fn weight(&self) -> f64 {
        0.30
    }

    fn evaluate(&self, features: &SessionFeatures) -> Option<Marker> {
        let ratio = features
            .fixations
            .ratio_to_neutral(StimulusCategory::Emotional)?;
        if ratio < Self::RATIO_THRESHOLD {
            Some(Marker::new(
                self.name(),
                (Self::RATIO_THRESHOLD - ratio) / Self::RATIO_THRESHOLD,
                0.80,
                format!(
                    "Reduced fixation duration on emotional stimuli ({:.1}% of neutral baseline) \
                     suggests avoidance behavior characteristic of PTSD",
                    ratio * 100.0
                ),
            ))
        } else {
            None
        }
    }
}

/// Fixations on trauma-related stimuli are severely shortened.
pub struct TraumaAvoidanceRule;

impl TraumaAvoidanceRule {
    const RATIO_THRESHOLD: f64 = 0.6;
}

impl MarkerRule for TraumaAvoidanceRule {
    fn name(&self) -> &'static str {
        "Trauma-Related Avoidance"
    }

    fn weight(&self) -> f64 {
        0.35
    }

    fn evaluate(&self, features: &SessionFeatures) -> Option<Marker> {
        let ratio = features
            .fixations
            .ratio_to_neutral(StimulusCategory::TraumaRelated)?;
        if ratio < Self::RATIO_THRESHOLD {
            Some(Marker::new(
                self.name(),
                (Self::RATIO_THRESHOLD - ratio) / Self::RATIO_THRESHOLD,
                0.90,
                format!(
                    "Severe avoidance of trauma-related stimuli ({:.1}% of neutral baseline) \
                     indicates strong trauma-specific avoidance patterns",
                    ratio * 100.0
                ),
            ))
        } else {
            None
        }
    }
}

/// Saccades are fast on average.
pub struct HypervigilanceRule;

impl HypervigilanceRule {
    const THRESHOLD_DEG_PER_SEC: f64 = 280.0;
    const SEVERITY_SPAN: f64 = 150.0;
}

impl MarkerRule for HypervigilanceRule {
    fn name(&self) -> &'static str {
        "Hypervigilant Scanning Pattern"
    }

    fn weight(&self) -> f64 {
        0.25
    }

    fn evaluate(&self, features: &SessionFeatures) -> Option<Marker> {
        let mean = features.saccade?.mean;
        if mean > Self::THRESHOLD_DEG_PER_SEC {
            Some(Marker::new(
                self.name(),
                ((mean - Self::THRESHOLD_DEG_PER_SEC) / Self::SEVERITY_SPAN).min(1.0),
                0.75,
                format!(
                    "Elevated saccadic velocity ({mean:.1}°/s) indicates hypervigilant \
                     environmental scanning behavior typical of PTSD hyperarousal"
                ),
            ))
        } else {
            None
        }
    }
}

/// Saccade velocity is highly irregular.
pub struct ErraticScanRule;

impl ErraticScanRule {
    const THRESHOLD_DEG_PER_SEC: f64 = 80.0;
    const SEVERITY_SCALE: f64 = 120.0;
}

impl MarkerRule for ErraticScanRule {
    fn name(&self) -> &'static str {
        "Erratic Scan Patterns"
    }

    fn weight(&self) -> f64 {
        0.20
    }

    fn evaluate(&self, features: &SessionFeatures) -> Option<Marker> {
        let variability = features.saccade?.std_dev;
        if variability > Self::THRESHOLD_DEG_PER_SEC {
            Some(Marker::new(
                self.name(),
                (variability / Self::SEVERITY_SCALE).min(1.0),
                0.70,
                "High variability in eye movement patterns suggests disrupted attention \
                 regulation and hypervigilant threat scanning",
            ))
        } else {
            None
        }
    }
}

/// Blink rate is above the resting range.
pub struct StressResponseRule;

impl StressResponseRule {
    const THRESHOLD_PER_MIN: f64 = 18.0;
    const SEVERITY_SPAN: f64 = 12.0;
}

impl MarkerRule for StressResponseRule {
    fn name(&self) -> &'static str {
        "Elevated Stress Response"
    }

    fn weight(&self) -> f64 {
        0.15
    }

    fn evaluate(&self, features: &SessionFeatures) -> Option<Marker> {
        let rate = features.blink_rate?;
        if rate > Self::THRESHOLD_PER_MIN {
            Some(Marker::new(
                self.name(),
                ((rate - Self::THRESHOLD_PER_MIN) / Self::SEVERITY_SPAN).min(1.0),
                0.65,
                format!(
                    "Increased blink rate ({rate:.1} blinks/min) may indicate elevated stress \
                     and anxiety levels during assessment"
                ),
            ))
        } else {
            None
        }
    }
}

/// Gaze wanders far from the fixation target.
pub struct AttentionDysregulationRule;

impl AttentionDysregulationRule {
    const THRESHOLD: f64 = 15.0;
    const SEVERITY_SCALE: f64 = 25.0;
}

impl MarkerRule for AttentionDysregulationRule {
    fn name(&self) -> &'static str {
        "Attention Dysregulation"
    }

    fn weight(&self) -> f64 {
        0.20
    }

    fn evaluate(&self, features: &SessionFeatures) -> Option<Marker> {
        let instability = features.gaze_instability;
        if instability > Self::THRESHOLD {
            Some(Marker::new(
                self.name(),
                (instability / Self::SEVERITY_SCALE).min(1.0),
                0.70,
                "Unstable gaze patterns indicate difficulty maintaining focused attention, \
                 consistent with PTSD-related concentration problems",
            ))
        } else {
            None
        }
    }
}

/// Ordered set of marker rules.
pub struct RuleBattery {
    rules: Vec<Box<dyn MarkerRule>>,
}

impl Default for RuleBattery {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleBattery {
    /// An empty battery.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard seven-rule battery in its fixed evaluation order.
    pub fn standard() -> Self {
        Self::empty()
            .with_rule(PupilDysregulationRule)
            .with_rule(EmotionalAvoidanceRule)
            .with_rule(TraumaAvoidanceRule)
            .with_rule(HypervigilanceRule)
            .with_rule(ErraticScanRule)
            .with_rule(StressResponseRule)
            .with_rule(AttentionDysregulationRule)
    }

    /// Append a rule; it is evaluated after all existing rules.
    pub fn with_rule(mut self, rule: impl MarkerRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Evaluate every rule in order, keeping the ones that fire.
    pub fn evaluate(&self, features: &SessionFeatures) -> Vec<WeightedMarker> {
        self.rules
            .iter()
            .filter_map(|rule| {
                rule.evaluate(features).map(|marker| {
                    tracing::debug!(
                        "Marker fired: {} (severity {:.3}, weight {:.2})",
                        marker.name,
                        marker.severity,
                        rule.weight()
                    );
                    WeightedMarker {
                        marker,
                        weight: rule.weight(),
                    }
                })
            })
            .collect()
    }
}
