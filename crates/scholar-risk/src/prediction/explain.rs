use super::domain::{Factor, RiskLevel, StudentInput, TestPrep};

const ENGLISH_AVERAGE_STRONG_THRESHOLD: f64 = 70.0;

/// Factors and recommendations attached to a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub factors: Vec<Factor>,
    pub recommendations: Vec<String>,
}

/// Keep any explanation the resolution path already produced and synthesize the rest.
pub fn complete(
    input: &StudentInput,
    english_average: f64,
    risk_level: RiskLevel,
    factors: Option<Vec<Factor>>,
    recommendations: Option<Vec<String>>,
) -> Explanation {
    Explanation {
        factors: factors.unwrap_or_else(|| synthesize_factors(input, english_average)),
        recommendations: recommendations
            .unwrap_or_else(|| synthesize_recommendations(risk_level, english_average)),
    }
}

pub fn synthesize_factors(input: &StudentInput, english_average: f64) -> Vec<Factor> {
    let english_impact = if english_average >= ENGLISH_AVERAGE_STRONG_THRESHOLD {
        0.867
    } else {
        0.567
    };

    let (prep_label, prep_impact) = match input.test_prep() {
        TestPrep::Prepared => ("Prepared", 0.022),
        TestPrep::NotPrepared => ("Not Prepared", 0.005),
    };

    vec![
        Factor {
            name: "English Average Score".to_string(),
            value: format!("{english_average:.1}/100"),
            impact: english_impact,
            explanation: "Primary performance indicator".to_string(),
        },
        Factor {
            name: "Study Time".to_string(),
            value: input.study_time_label().replace('_', " "),
            impact: 0.010,
            explanation: "Weekly study commitment".to_string(),
        },
        Factor {
            name: "Test Preparation".to_string(),
            value: prep_label.to_string(),
            impact: prep_impact,
            explanation: "Preparation level affects performance".to_string(),
        },
    ]
}

pub fn synthesize_recommendations(risk_level: RiskLevel, english_average: f64) -> Vec<String> {
    let base: [&str; 4] = match risk_level {
        RiskLevel::AtRisk => [
            "Schedule intensive tutoring sessions (3+ times weekly)",
            "Increase study time to at least 10 hours per week",
            "Focus on foundational English skills",
            "Use online resources for additional practice",
        ],
        RiskLevel::Satisfactory => [
            "Maintain current study habits",
            "Target specific weak areas in writing/reading/speaking",
            "Join study groups for collaborative learning",
            "Take practice tests regularly",
        ],
        RiskLevel::HighAchiever => [
            "Challenge yourself with advanced materials",
            "Consider mentoring other students",
            "Explore academic competitions",
            "Prepare for advanced English certifications",
        ],
    };

    let mut recommendations: Vec<String> = base.iter().map(|item| item.to_string()).collect();
    if let Some(extra) = tiered_recommendation(english_average) {
        recommendations.push(extra.to_string());
    }
    recommendations
}

fn tiered_recommendation(english_average: f64) -> Option<&'static str> {
    if english_average < 60.0 {
        Some("Focus on basic grammar and vocabulary building")
    } else if english_average < 70.0 {
        Some("Practice reading comprehension daily")
    } else if english_average < 80.0 {
        Some("Work on advanced writing techniques")
    } else {
        None
    }
}
