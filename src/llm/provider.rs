//! Model capability trait and structured output types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Structured feedback for one snapshot of code and thoughts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Feedback {
    /// Assessment of the current thinking process.
    pub feedback: String,
    /// Concrete improvements to the code and approach.
    pub suggestions: Vec<String>,
    /// Proof obligations for the steps taken so far.
    pub proofs: Vec<String>,
    /// What a strong competitor would be thinking at this point.
    pub meta_cognition: Vec<String>,
}

/// Consolidated view over a problem's whole feedback history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSummary {
    pub feedback: String,
    pub proof: String,
    pub meta_cognition: String,
}

/// A model that can coach on a snapshot and summarize a history.
///
/// Both calls may fail transiently (network, rate limit) or return output
/// that fails schema validation; in the latter case implementations keep
/// the raw model text as the primary feedback field rather than dropping
/// the response.
#[async_trait]
pub trait CoachModel: Send + Sync {
    /// Structured feedback on the current code and reasoning, given the
    /// problem statement.
    async fn feedback(
        &self,
        code: &str,
        thoughts: &str,
        statement: &str,
    ) -> Result<Feedback, LlmError>;

    /// One consolidated summary over the collected history.
    async fn summarize(
        &self,
        statement: &str,
        feedbacks: &[String],
        proofs: &[String],
        meta_cognition: &[String],
    ) -> Result<FeedbackSummary, LlmError>;
}
