//! Credit assessments (5 C's)

mod model;
pub mod scoring;
mod service;

pub use model::{CreateAssessmentRequest, CreditAssessment};
pub use scoring::{FiveCScores, ScoreOutcome};
pub use service::AssessmentService;
