//! Core session logic for the Emotion Sentinel Agent.
//!
//! This module contains:
//! - Run-length aggregation of the frame label stream into periods
//! - Session evaluation over the finalized period collection

pub mod aggregator;
pub mod evaluate;

// Re-export commonly used types
pub use aggregator::{AggregatorSettings, EmotionAggregator, Period, SessionInfo};
pub use evaluate::{
    EvaluatorSettings, LabelTotals, SessionAssessment, SessionEvaluator, SessionVerdict,
    EVALUATOR_NAME,
};
