//! Feature extraction from a session's samples.
//!
//! Every feature is a read-only reduction over the sample set, so the result
//! does not depend on sample order. Features whose inputs are absent are
//! `None` rather than zero.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::AnalysisError;
use crate::session::types::{Sample, SessionId, StimulusCategory};

/// Nominal gaze target (screen center, in percent coordinates).
pub const GAZE_REFERENCE_POINT: f64 = 50.0;

/// Milliseconds per minute, for rate conversion.
const MS_PER_MINUTE: f64 = 60_000.0;

/// Mean and population standard deviation of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    pub mean: f64,
    pub std_dev: f64,
}

impl Dispersion {
    /// `None` for an empty set.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            mean: values.iter().mean(),
            std_dev: values.iter().population_std_dev(),
        })
    }
}

/// Mean fixation duration per stimulus category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryFixations {
    pub neutral: Option<f64>,
    pub emotional: Option<f64>,
    pub trauma_related: Option<f64>,
}

impl CategoryFixations {
    pub fn get(&self, category: StimulusCategory) -> Option<f64> {
        match category {
            StimulusCategory::Neutral => self.neutral,
            StimulusCategory::Emotional => self.emotional,
            StimulusCategory::TraumaRelated => self.trauma_related,
        }
    }

    /// Ratio of a category's mean fixation to the neutral mean.
    ///
    /// Not computable if either mean is missing or the neutral mean is not
    /// positive.
    pub fn ratio_to_neutral(&self, category: StimulusCategory) -> Option<f64> {
        match (self.get(category), self.neutral) {
            (Some(mean), Some(neutral)) if neutral > 0.0 => Some(mean / neutral),
            _ => None,
        }
    }
}

/// Samples split by stimulus category. Untagged samples are in none of them.
#[derive(Debug, Default)]
pub struct CategoryPartitions<'a> {
    pub neutral: Vec<&'a Sample>,
    pub emotional: Vec<&'a Sample>,
    pub trauma_related: Vec<&'a Sample>,
}

impl<'a> CategoryPartitions<'a> {
    pub fn get(&self, category: StimulusCategory) -> &[&'a Sample] {
        match category {
            StimulusCategory::Neutral => &self.neutral,
            StimulusCategory::Emotional => &self.emotional,
            StimulusCategory::TraumaRelated => &self.trauma_related,
        }
    }
}

/// Everything the marker rules look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFeatures {
    pub sample_count: usize,
    /// Pupil diameter statistics over all samples
    pub pupil: Dispersion,
    pub fixations: CategoryFixations,
    /// Saccade velocity statistics over samples that carry one
    pub saccade: Option<Dispersion>,
    pub blink_count: usize,
    pub session_duration_ms: i64,
    /// Blinks per minute; `None` when the session has no positive duration
    pub blink_rate: Option<f64>,
    /// Mean of the RMS deviations of gaze x and y from screen center
    pub gaze_instability: f64,
}

/// Split samples by category.
///
/// The explicit tag wins; untagged samples fall back to inference from their
/// stimulus id.
pub fn partition_by_category(samples: &[Sample]) -> CategoryPartitions<'_> {
    let mut partitions = CategoryPartitions::default();
    for sample in samples {
        let category = sample
            .category
            .or_else(|| sample.stimulus_id.as_deref().and_then(StimulusCategory::infer));
        match category {
            Some(StimulusCategory::Neutral) => partitions.neutral.push(sample),
            Some(StimulusCategory::Emotional) => partitions.emotional.push(sample),
            Some(StimulusCategory::TraumaRelated) => partitions.trauma_related.push(sample),
            None => {}
        }
    }
    partitions
}

/// Compute all features for one session.
///
/// Fails with `InsufficientData` on an empty sample set.
pub fn compute_features(
    session_id: &SessionId,
    samples: &[Sample],
    session_duration_ms: i64,
) -> Result<SessionFeatures, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::InsufficientData(session_id.to_string()));
    }

    let pupil_sizes: Vec<f64> = samples.iter().map(|s| s.pupil_diameter).collect();
    // Non-empty, so always computable
    let pupil = Dispersion::of(&pupil_sizes)
        .ok_or_else(|| AnalysisError::InsufficientData(session_id.to_string()))?;

    let partitions = partition_by_category(samples);
    let fixations = CategoryFixations {
        neutral: mean_fixation(&partitions.neutral),
        emotional: mean_fixation(&partitions.emotional),
        trauma_related: mean_fixation(&partitions.trauma_related),
    };

    let velocities: Vec<f64> = samples.iter().filter_map(|s| s.saccade_velocity).collect();
    let saccade = Dispersion::of(&velocities);

    let blink_count = samples.iter().filter(|s| s.blink_detected).count();
    let blink_rate = compute_blink_rate(blink_count, session_duration_ms);

    let gaze_instability = compute_gaze_instability(samples);

    Ok(SessionFeatures {
        sample_count: samples.len(),
        pupil,
        fixations,
        saccade,
        blink_count,
        session_duration_ms,
        blink_rate,
        gaze_instability,
    })
}

/// Mean fixation duration over the samples that carry one.
fn mean_fixation(samples: &[&Sample]) -> Option<f64> {
    let durations: Vec<f64> = samples.iter().filter_map(|s| s.fixation_duration).collect();
    if durations.is_empty() {
        None
    } else {
        Some(durations.iter().mean())
    }
}

/// Blinks per minute of session time.
fn compute_blink_rate(blink_count: usize, session_duration_ms: i64) -> Option<f64> {
    if session_duration_ms <= 0 {
        return None;
    }
    let minutes = session_duration_ms as f64 / MS_PER_MINUTE;
    Some(blink_count as f64 / minutes)
}

/// Average of the x and y root-mean-square deviations from screen center.
///
/// Deviation is measured from the fixed reference point, not the sample
/// mean.
fn compute_gaze_instability(samples: &[Sample]) -> f64 {
    let x_deviation = rms_deviation(samples.iter().map(|s| s.gaze_x));
    let y_deviation = rms_deviation(samples.iter().map(|s| s.gaze_y));
    (x_deviation + y_deviation) / 2.0
}

fn rms_deviation(values: impl Iterator<Item = f64>) -> f64 {
    let squared: Vec<f64> = values
        .map(|v| (v - GAZE_REFERENCE_POINT).powi(2))
        .collect();
    if squared.is_empty() {
        return 0.0;
    }
    squared.iter().mean().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> SessionId {
        SessionId::new("test-session")
    }

    #[test]
    fn test_empty_samples_rejected() {
        let err = compute_features(&id(), &[], 60_000).unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientData("test-session".to_string()));
    }

    #[test]
    fn test_pupil_statistics() {
        let samples: Vec<Sample> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| Sample::new(i as i64, 50.0, 50.0, p))
            .collect();

        let features = compute_features(&id(), &samples, 60_000).unwrap();
        assert!((features.pupil.mean - 5.0).abs() < 1e-9);
        // Population std dev of this classic set is exactly 2
        assert!((features.pupil.std_dev - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_pupil_has_zero_dispersion() {
        let samples: Vec<Sample> = (0..10).map(|i| Sample::new(i, 50.0, 50.0, 3.5)).collect();
        let features = compute_features(&id(), &samples, 60_000).unwrap();
        assert_eq!(features.pupil.std_dev, 0.0);
        assert_eq!(features.gaze_instability, 0.0);
        assert_eq!(features.blink_rate, Some(0.0));
        assert!(features.saccade.is_none());
    }

    #[test]
    fn test_fixation_means_per_category() {
        let samples = vec![
            Sample::new(0, 50.0, 50.0, 3.5)
                .with_category(StimulusCategory::Neutral)
                .with_fixation(200.0),
            Sample::new(1, 50.0, 50.0, 3.5)
                .with_category(StimulusCategory::Neutral)
                .with_fixation(400.0),
            // Present in the partition but without a fixation value
            Sample::new(2, 50.0, 50.0, 3.5).with_category(StimulusCategory::Emotional),
            Sample::new(3, 50.0, 50.0, 3.5).with_fixation(1000.0),
        ];

        let features = compute_features(&id(), &samples, 60_000).unwrap();
        assert_eq!(features.fixations.neutral, Some(300.0));
        assert_eq!(features.fixations.emotional, None);
        assert_eq!(features.fixations.trauma_related, None);
    }

    #[test]
    fn test_zero_fixation_counts_as_present() {
        let samples = vec![
            Sample::new(0, 50.0, 50.0, 3.5)
                .with_category(StimulusCategory::Emotional)
                .with_fixation(0.0),
        ];
        let features = compute_features(&id(), &samples, 60_000).unwrap();
        assert_eq!(features.fixations.emotional, Some(0.0));
    }

    #[test]
    fn test_ratio_to_neutral() {
        let fixations = CategoryFixations {
            neutral: Some(300.0),
            emotional: Some(150.0),
            trauma_related: None,
        };
        assert_eq!(
            fixations.ratio_to_neutral(StimulusCategory::Emotional),
            Some(0.5)
        );
        assert_eq!(
            fixations.ratio_to_neutral(StimulusCategory::TraumaRelated),
            None
        );

        let zero_neutral = CategoryFixations {
            neutral: Some(0.0),
            ..fixations
        };
        assert_eq!(
            zero_neutral.ratio_to_neutral(StimulusCategory::Emotional),
            None
        );
    }

    #[test]
    fn test_saccade_statistics_skip_missing() {
        let samples = vec![
            Sample::new(0, 50.0, 50.0, 3.5).with_saccade(300.0),
            Sample::new(1, 50.0, 50.0, 3.5),
            Sample::new(2, 50.0, 50.0, 3.5).with_saccade(500.0),
        ];
        let features = compute_features(&id(), &samples, 60_000).unwrap();
        let saccade = features.saccade.unwrap();
        assert!((saccade.mean - 400.0).abs() < 1e-9);
        assert!((saccade.std_dev - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_blink_rate() {
        let samples: Vec<Sample> = (0..30)
            .map(|i| {
                let s = Sample::new(i, 50.0, 50.0, 3.5);
                if i % 2 == 0 {
                    s.with_blink()
                } else {
                    s
                }
            })
            .collect();

        // 15 blinks over 30 seconds = 30 per minute
        let features = compute_features(&id(), &samples, 30_000).unwrap();
        assert_eq!(features.blink_count, 15);
        assert!((features.blink_rate.unwrap() - 30.0).abs() < 1e-9);

        let no_duration = compute_features(&id(), &samples, 0).unwrap();
        assert_eq!(no_duration.blink_rate, None);
    }

    #[test]
    fn test_gaze_instability_uses_screen_center() {
        // Mean x is 80 with zero spread, but deviation from center is 30
        let samples = vec![
            Sample::new(0, 80.0, 50.0, 3.5),
            Sample::new(1, 80.0, 50.0, 3.5),
        ];
        let features = compute_features(&id(), &samples, 60_000).unwrap();
        assert!((features.gaze_instability - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_uncategorized_samples_still_count_globally() {
        let samples = vec![
            Sample::new(0, 20.0, 80.0, 3.0).with_stimulus("calibration"),
            Sample::new(1, 50.0, 50.0, 4.0)
                .with_category(StimulusCategory::Neutral)
                .with_fixation(250.0),
        ];
        let partitions = partition_by_category(&samples);
        assert_eq!(partitions.get(StimulusCategory::Neutral).len(), 1);
        assert!(partitions.get(StimulusCategory::Emotional).is_empty());

        let features = compute_features(&id(), &samples, 60_000).unwrap();
        assert_eq!(features.sample_count, 2);
        assert!((features.pupil.mean - 3.5).abs() < 1e-9);
        assert!(features.gaze_instability > 0.0);
    }

    #[test]
    fn test_untagged_samples_inferred_from_stimulus_id() {
        let samples = vec![
            Sample::new(0, 50.0, 50.0, 3.5)
                .with_stimulus("neutral_1")
                .with_fixation(300.0),
            Sample::new(1, 50.0, 50.0, 3.5)
                .with_stimulus("trauma_4")
                .with_fixation(90.0),
            // Tag overrides what the id suggests
            Sample::new(2, 50.0, 50.0, 3.5)
                .with_stimulus("emotional_2")
                .with_category(StimulusCategory::Neutral)
                .with_fixation(100.0),
            Sample::new(3, 50.0, 50.0, 3.5)
                .with_stimulus("neutral_vs_trauma")
                .with_fixation(5000.0),
        ];

        let partitions = partition_by_category(&samples);
        assert_eq!(partitions.get(StimulusCategory::Neutral).len(), 2);
        assert_eq!(partitions.get(StimulusCategory::TraumaRelated).len(), 1);
        assert!(partitions.get(StimulusCategory::Emotional).is_empty());

        let features = compute_features(&id(), &samples, 60_000).unwrap();
        assert_eq!(features.fixations.neutral, Some(200.0));
        assert_eq!(features.fixations.trauma_related, Some(90.0));
    }

    #[test]
    fn test_order_independence() {
        let mut samples = vec![
            Sample::new(0, 30.0, 60.0, 3.1).with_saccade(310.0),
            Sample::new(1, 55.0, 45.0, 3.9).with_blink(),
            Sample::new(2, 70.0, 20.0, 4.4)
                .with_category(StimulusCategory::Neutral)
                .with_fixation(320.0),
            Sample::new(3, 48.0, 52.0, 2.8).with_saccade(190.0),
        ];
        let forward = compute_features(&id(), &samples, 120_000).unwrap();
        samples.reverse();
        let backward = compute_features(&id(), &samples, 120_000).unwrap();

        assert!((forward.pupil.std_dev - backward.pupil.std_dev).abs() < 1e-12);
        assert!((forward.gaze_instability - backward.gaze_instability).abs() < 1e-12);
        assert_eq!(forward.blink_rate, backward.blink_rate);
        assert_eq!(forward.fixations, backward.fixations);
    }
}
