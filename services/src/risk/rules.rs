//! Risk classification as an ordered rule table.
//!
//! Rules are evaluated top to bottom against the inputs and the level reached so far. A rule
//! that fires may raise the level and always appends its factor.

use db::models::risk_assessment::RiskLevel;
use serde::Serialize;

pub const LOW_ATTENDANCE_POOR_PERFORMANCE: &str = "Low attendance with poor performance";
pub const CRITICALLY_LOW_ATTENDANCE: &str = "Critically low attendance";
pub const CONSECUTIVE_FAILURES: &str = "Multiple consecutive failures";
pub const MODERATE_ATTENDANCE_DECLINING: &str = "Moderate attendance with declining performance";
pub const GOOD_STANDING: &str = "Good attendance and performance";

#[derive(Debug, Clone, Copy)]
pub struct RiskInputs<'a> {
    pub attendance_percentage: f64,
    pub average_score: f64,
    /// Assessment percentages in submission order, oldest first.
    pub assessment_percentages: &'a [f64],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub level: RiskLevel,
    pub factors: Vec<String>,
}

struct Rule {
    applies: fn(&RiskInputs<'_>, RiskLevel) -> bool,
    /// `None` keeps the current level.
    sets: Option<RiskLevel>,
    factor: &'static str,
}

fn poor_and_absent(i: &RiskInputs<'_>) -> bool {
    i.attendance_percentage < 60.0 && i.average_score < 50.0
}

const RULES: &[Rule] = &[
    Rule {
        applies: |i, _| poor_and_absent(i),
        sets: Some(RiskLevel::High),
        factor: LOW_ATTENDANCE_POOR_PERFORMANCE,
    },
    Rule {
        applies: |i, _| !poor_and_absent(i) && i.attendance_percentage < 40.0,
        sets: Some(RiskLevel::High),
        factor: CRITICALLY_LOW_ATTENDANCE,
    },
    Rule {
        applies: |i, _| {
            let scores = i.assessment_percentages;
            scores.len() >= 2 && scores[scores.len() - 2..].iter().all(|p| *p < 50.0)
        },
        sets: Some(RiskLevel::High),
        factor: CONSECUTIVE_FAILURES,
    },
    Rule {
        applies: |i, level| {
            level != RiskLevel::High
                && (60.0..75.0).contains(&i.attendance_percentage)
                && i.average_score < 60.0
        },
        sets: Some(RiskLevel::Medium),
        factor: MODERATE_ATTENDANCE_DECLINING,
    },
    Rule {
        applies: |_, level| level == RiskLevel::Low,
        sets: None,
        factor: GOOD_STANDING,
    },
];

/// Total and pure: every input, including out-of-range or NaN values, yields a classification.
pub fn classify(inputs: RiskInputs<'_>) -> Classification {
    let mut level = RiskLevel::Low;
    let mut factors = Vec::new();

    for rule in RULES {
        if (rule.applies)(&inputs, level) {
            if let Some(next) = rule.sets {
                level = next;
            }
            factors.push(rule.factor.to_string());
        }
    }

    Classification { level, factors }
}
