//! Model integration.
//!
//! The session loop and the summarizer depend on the `CoachModel`
//! capability; the production implementation speaks an OpenAI-compatible
//! chat completions API with structured outputs.

mod openai;
mod provider;

pub use openai::OpenAiCoach;
pub use provider::{CoachModel, Feedback, FeedbackSummary};
