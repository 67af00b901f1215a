//! Session-level evaluation of a finalized period collection.
//!
//! Runs once, after capture has stopped, over the complete
//! [`SessionInfo`]. The evaluation is pure: no clock reads, no
//! randomness beyond the instance id generated at construction, so the
//! same evaluator always produces the same assessment for the same
//! session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::aggregator::{Period, SessionInfo};
use crate::vision::label::EmotionLabel;

/// Name reported in every assessment this module produces.
pub const EVALUATOR_NAME: &str = "emotion-sentinel-agent";

/// Tuning for the verdict ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorSettings {
    /// Negative share at or above which the session rates Strained.
    pub strained_cutoff: f64,
    /// Negative share at or above which the session rates Critical.
    pub critical_cutoff: f64,
    /// Labels whose combined share can lift the verdict to Positive.
    pub positive_labels: Vec<EmotionLabel>,
    /// Labels counted as negative affect.
    pub negative_labels: Vec<EmotionLabel>,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            strained_cutoff: 0.25,
            critical_cutoff: 0.50,
            positive_labels: vec![EmotionLabel::Happy, EmotionLabel::Surprised],
            negative_labels: vec![
                EmotionLabel::Angry,
                EmotionLabel::Disgusted,
                EmotionLabel::Fearful,
                EmotionLabel::Sad,
            ],
        }
    }
}

/// Overall rating of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionVerdict {
    Positive,
    Balanced,
    Strained,
    Critical,
}

impl std::fmt::Display for SessionVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionVerdict::Positive => "Positive",
            SessionVerdict::Balanced => "Balanced",
            SessionVerdict::Strained => "Strained",
            SessionVerdict::Critical => "Critical",
        };
        f.write_str(name)
    }
}

/// Per-label rollup over the session's periods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelTotals {
    /// Summed period duration in milliseconds.
    pub total_ms: i64,
    pub period_count: usize,
    /// Longest single period in milliseconds.
    pub longest_ms: i64,
    /// Duration-weighted share over the whole session, 0.0 when the
    /// session has no duration.
    pub share: f64,
}

/// The evaluator's output for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAssessment {
    pub evaluator: String,
    pub version: String,
    /// Identifies the evaluator instance that produced this assessment.
    pub instance_id: String,
    pub session_id: String,
    pub totals: BTreeMap<EmotionLabel, LabelTotals>,
    /// Summed duration of every period, in milliseconds.
    pub session_ms: i64,
    /// Time with a face visible, in milliseconds.
    pub observed_ms: i64,
    /// Time in negative labels, in milliseconds.
    pub negative_ms: i64,
    /// `negative_ms` over `observed_ms`; 0.0 when nothing was observed.
    pub negative_share: f64,
    /// Positive-label time over `observed_ms`; 0.0 when nothing was observed.
    pub positive_share: f64,
    /// Label with the largest total; ties go to the lower wire index.
    pub dominant: Option<EmotionLabel>,
    pub verdict: SessionVerdict,
}

impl SessionAssessment {
    /// Human-readable multi-line summary for console output.
    pub fn summary(&self) -> String {
        let dominant = self
            .dominant
            .map(|label| label.as_str())
            .unwrap_or("(none)");
        format!(
            "Session Assessment:\n\
             - Verdict: {}\n\
             - Dominant emotion: {}\n\
             - Observed (face visible): {} ms\n\
             - Negative share: {:.1}%\n\
             - Positive share: {:.1}%",
            self.verdict,
            dominant,
            self.observed_ms,
            self.negative_share * 100.0,
            self.positive_share * 100.0,
        )
    }
}

/// Produces a [`SessionAssessment`] from a finalized [`SessionInfo`].
pub struct SessionEvaluator {
    settings: EvaluatorSettings,
    instance_id: Uuid,
}

impl SessionEvaluator {
    pub fn new(settings: EvaluatorSettings) -> Self {
        Self {
            settings,
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn evaluate(&self, session: &SessionInfo) -> SessionAssessment {
        let mut totals: BTreeMap<EmotionLabel, LabelTotals> = BTreeMap::new();
        let mut session_ms: i64 = 0;
        for label in EmotionLabel::ALL {
            let periods = session.periods_for(label);
            let total_ms: i64 = periods.iter().map(Period::duration_ms).sum();
            let longest_ms = periods.iter().map(Period::duration_ms).max().unwrap_or(0);
            session_ms += total_ms;
            totals.insert(
                label,
                LabelTotals {
                    total_ms,
                    period_count: periods.len(),
                    longest_ms,
                    share: 0.0,
                },
            );
        }
        if session_ms > 0 {
            for rollup in totals.values_mut() {
                rollup.share = rollup.total_ms as f64 / session_ms as f64;
            }
        }

        let observed_ms = session_ms - totals[&EmotionLabel::NoFace].total_ms;
        let negative_ms: i64 = self
            .settings
            .negative_labels
            .iter()
            .map(|label| totals[label].total_ms)
            .sum();
        let positive_ms: i64 = self
            .settings
            .positive_labels
            .iter()
            .map(|label| totals[label].total_ms)
            .sum();
        let (negative_share, positive_share) = if observed_ms > 0 {
            (
                negative_ms as f64 / observed_ms as f64,
                positive_ms as f64 / observed_ms as f64,
            )
        } else {
            (0.0, 0.0)
        };

        // Strictly-greater comparison keeps the first maximum, so ties
        // resolve to the lower wire index.
        let mut dominant: Option<EmotionLabel> = None;
        let mut dominant_ms: i64 = 0;
        for label in EmotionLabel::ALL {
            let total = totals[&label].total_ms;
            if total > dominant_ms {
                dominant = Some(label);
                dominant_ms = total;
            }
        }

        let verdict = if negative_share >= self.settings.critical_cutoff {
            SessionVerdict::Critical
        } else if negative_share >= self.settings.strained_cutoff {
            SessionVerdict::Strained
        } else if positive_share > 0.5 {
            SessionVerdict::Positive
        } else {
            SessionVerdict::Balanced
        };

        SessionAssessment {
            evaluator: EVALUATOR_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instance_id: self.instance_id.to_string(),
            session_id: session.session_id.clone(),
            totals,
            session_ms,
            observed_ms,
            negative_ms,
            negative_share,
            positive_share,
            dominant,
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::{AggregatorSettings, EmotionAggregator};
    use chrono::{DateTime, Utc};

    fn ts(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn session_from(runs: &[(EmotionLabel, i64)]) -> SessionInfo {
        let mut agg = EmotionAggregator::new(
            "SESS-TEST",
            AggregatorSettings {
                warning_threshold_ms: i64::MAX,
                ..AggregatorSettings::default()
            },
        );
        let mut clock = 0;
        for (label, duration) in runs {
            agg.add_frame(*label, ts(clock));
            clock += duration;
            agg.add_frame(*label, ts(clock));
        }
        agg.finish(ts(clock))
    }

    #[test]
    fn test_empty_session_is_balanced() {
        let session = EmotionAggregator::new("e", AggregatorSettings::default()).finish(ts(0));
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        assert_eq!(assessment.verdict, SessionVerdict::Balanced);
        assert_eq!(assessment.dominant, None);
        assert_eq!(assessment.session_ms, 0);
        assert_eq!(assessment.negative_share, 0.0);
        assert_eq!(assessment.totals.len(), EmotionLabel::ALL.len());
    }

    #[test]
    fn test_mostly_happy_session_is_positive() {
        let session = session_from(&[
            (EmotionLabel::Happy, 800),
            (EmotionLabel::Neutral, 100),
            (EmotionLabel::Happy, 100),
        ]);
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        assert_eq!(assessment.verdict, SessionVerdict::Positive);
        assert_eq!(assessment.dominant, Some(EmotionLabel::Happy));
        assert!(assessment.positive_share > 0.8);
    }

    #[test]
    fn test_negative_share_crosses_strained_cutoff() {
        let session = session_from(&[(EmotionLabel::Neutral, 700), (EmotionLabel::Sad, 300)]);
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        assert_eq!(assessment.verdict, SessionVerdict::Strained);
        assert!((assessment.negative_share - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_negative_majority_is_critical() {
        let session = session_from(&[(EmotionLabel::Angry, 600), (EmotionLabel::Happy, 400)]);
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        assert_eq!(assessment.verdict, SessionVerdict::Critical);
        assert_eq!(assessment.dominant, Some(EmotionLabel::Angry));
    }

    #[test]
    fn test_noface_time_excluded_from_shares() {
        // Half the session has no face; shares are over observed time only.
        let session = session_from(&[(EmotionLabel::NoFace, 500), (EmotionLabel::Sad, 500)]);
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        assert_eq!(assessment.observed_ms, 500);
        assert!((assessment.negative_share - 1.0).abs() < 1e-9);
        assert_eq!(assessment.verdict, SessionVerdict::Critical);
    }

    #[test]
    fn test_all_noface_session_is_balanced() {
        let session = session_from(&[(EmotionLabel::NoFace, 1000)]);
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        assert_eq!(assessment.observed_ms, 0);
        assert_eq!(assessment.negative_share, 0.0);
        assert_eq!(assessment.verdict, SessionVerdict::Balanced);
        assert_eq!(assessment.dominant, Some(EmotionLabel::NoFace));
    }

    #[test]
    fn test_dominant_tie_goes_to_lower_wire_index() {
        let session = session_from(&[(EmotionLabel::Happy, 500), (EmotionLabel::Angry, 500)]);
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        // Angry is wire index 0, Happy is 3.
        assert_eq!(assessment.dominant, Some(EmotionLabel::Angry));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let session = session_from(&[(EmotionLabel::Happy, 300), (EmotionLabel::Sad, 200)]);
        let evaluator = SessionEvaluator::new(EvaluatorSettings::default());
        let first = evaluator.evaluate(&session);
        let second = evaluator.evaluate(&session);
        assert_eq!(first.instance_id, second.instance_id);
        assert_eq!(first.verdict, second.verdict);
        assert_eq!(first.negative_share, second.negative_share);
        assert_eq!(first.dominant, second.dominant);
    }

    #[test]
    fn test_longest_period_tracked_per_label() {
        let session = session_from(&[
            (EmotionLabel::Happy, 100),
            (EmotionLabel::Neutral, 50),
            (EmotionLabel::Happy, 400),
        ]);
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        let happy = &assessment.totals[&EmotionLabel::Happy];
        assert_eq!(happy.period_count, 2);
        assert_eq!(happy.total_ms, 500);
        assert_eq!(happy.longest_ms, 400);
    }

    #[test]
    fn test_assessment_serializes() {
        let session = session_from(&[(EmotionLabel::Happy, 100)]);
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        let json = serde_json::to_string(&assessment).unwrap();
        let back: SessionAssessment = serde_json::from_str(&json).unwrap();
        assert_eq!(back.verdict, SessionVerdict::Positive);
        assert_eq!(back.session_id, "SESS-TEST");
    }

    #[test]
    fn test_summary_mentions_verdict() {
        let session = session_from(&[(EmotionLabel::Sad, 1000)]);
        let assessment = SessionEvaluator::new(EvaluatorSettings::default()).evaluate(&session);
        let summary = assessment.summary();
        assert!(summary.contains("Critical"));
        assert!(summary.contains("Sad"));
    }
}
