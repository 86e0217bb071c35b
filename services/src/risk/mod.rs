//! Academic risk scoring: a pure classifier plus a cache of its results per (student, course).

pub mod rules;
mod service;

pub use rules::{classify, Classification, RiskInputs};
pub use service::{CourseRiskReport, RiskEngine, RiskSummary};
