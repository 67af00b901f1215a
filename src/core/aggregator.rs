//! Run-length aggregation of the per-frame emotion stream into periods.
//!
//! The capture worker feeds one label per frame (possibly several when
//! multiple faces are visible). Consecutive frames with the same label
//! fold into a single [`Period`]; a label change closes the open period
//! at the last frame that carried the old label and opens a new one.
//! All durations are in milliseconds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vision::label::EmotionLabel;

/// Tuning for the aggregation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorSettings {
    /// How long a negative run must last, in milliseconds, before the
    /// sustained-negative warning raises.
    pub warning_threshold_ms: i64,
    /// Labels counted as negative affect.
    pub negative_labels: Vec<EmotionLabel>,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            warning_threshold_ms: 3000,
            negative_labels: vec![
                EmotionLabel::Angry,
                EmotionLabel::Disgusted,
                EmotionLabel::Fearful,
                EmotionLabel::Sad,
            ],
        }
    }
}

impl AggregatorSettings {
    pub fn is_negative(&self, label: EmotionLabel) -> bool {
        self.negative_labels.contains(&label)
    }
}

/// One maximal contiguous run of frames sharing an emotion label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub label: EmotionLabel,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// Length of this period in milliseconds, the duration unit used
    /// throughout. A single-frame run has duration zero.
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// The complete set of periods for one capture session, keyed by label.
///
/// Every label has a slot from the moment the session starts, so readers
/// iterate the full label set without existence checks. Slots for labels
/// that never occurred stay empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    /// Set when the session is finalized.
    pub ended_at: Option<DateTime<Utc>>,
    pub periods: BTreeMap<EmotionLabel, Vec<Period>>,
}

impl SessionInfo {
    pub fn new(session_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        let mut periods = BTreeMap::new();
        for label in EmotionLabel::ALL {
            periods.insert(label, Vec::new());
        }
        Self {
            session_id: session_id.into(),
            started_at,
            ended_at: None,
            periods,
        }
    }

    pub fn periods_for(&self, label: EmotionLabel) -> &[Period] {
        self.periods.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_periods(&self) -> usize {
        self.periods.values().map(Vec::len).sum()
    }

    /// Summed duration of all periods for one label, in milliseconds.
    pub fn total_duration_ms(&self, label: EmotionLabel) -> i64 {
        self.periods_for(label).iter().map(Period::duration_ms).sum()
    }

    /// True when no frame was ever aggregated.
    pub fn is_empty(&self) -> bool {
        self.total_periods() == 0
    }

    /// All periods across labels, ordered by start time. Reconstructs the
    /// session timeline from the per-label map.
    pub fn timeline(&self) -> Vec<&Period> {
        let mut all: Vec<&Period> = self.periods.values().flatten().collect();
        all.sort_by_key(|p| p.start);
        all
    }
}

#[derive(Debug, Clone)]
struct CurrentRun {
    label: EmotionLabel,
    start: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

/// Builds the per-label period map incrementally from the frame stream.
///
/// `finish` consumes the aggregator, so a session cannot be finalized
/// twice or extended after finalization.
pub struct EmotionAggregator {
    settings: AggregatorSettings,
    session: SessionInfo,
    current: Option<CurrentRun>,
    warning: bool,
}

impl EmotionAggregator {
    pub fn new(session_id: impl Into<String>, settings: AggregatorSettings) -> Self {
        Self {
            settings,
            session: SessionInfo::new(session_id, Utc::now()),
            current: None,
            warning: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.session.started_at
    }

    /// Label of the open run, if any frame has been fed.
    pub fn current_label(&self) -> Option<EmotionLabel> {
        self.current.as_ref().map(|run| run.label)
    }

    /// Sustained-negative warning state after the most recent frame.
    pub fn warning(&self) -> bool {
        self.warning
    }

    /// Fold one frame's label into the period stream.
    ///
    /// Timestamps are expected non-decreasing; this holds for a single
    /// capture loop feeding frames in order. After updating the run, the
    /// warning flag is recomputed: it raises once the open negative run
    /// has lasted at least the threshold, stays up across consecutive
    /// negative runs, and clears the moment a non-negative label arrives.
    pub fn add_frame(&mut self, label: EmotionLabel, at: DateTime<Utc>) {
        match self.current.as_mut() {
            None => {
                self.current = Some(CurrentRun {
                    label,
                    start: at,
                    last_seen: at,
                });
            }
            Some(run) if run.label == label => {
                run.last_seen = at;
            }
            Some(_) => {
                let finished = self.current.take().map(|run| Period {
                    label: run.label,
                    start: run.start,
                    end: run.last_seen,
                });
                if let Some(period) = finished {
                    self.push_period(period);
                }
                self.current = Some(CurrentRun {
                    label,
                    start: at,
                    last_seen: at,
                });
            }
        }

        if let Some(run) = self.current.as_ref() {
            if self.settings.is_negative(run.label) {
                let run_ms = (at - run.start).num_milliseconds();
                if run_ms >= self.settings.warning_threshold_ms {
                    self.warning = true;
                }
            } else {
                self.warning = false;
            }
        }
    }

    /// Finalize the session, closing the open run at `at` (or at the run's
    /// last frame, whichever is later) and stamping the end time.
    pub fn finish(mut self, at: DateTime<Utc>) -> SessionInfo {
        if let Some(run) = self.current.take() {
            let period = Period {
                label: run.label,
                start: run.start,
                end: at.max(run.last_seen),
            };
            self.push_period(period);
        }
        self.session.ended_at = Some(at);
        self.session
    }

    fn push_period(&mut self, period: Period) {
        self.session
            .periods
            .entry(period.label)
            .or_default()
            .push(period);
    }
}
