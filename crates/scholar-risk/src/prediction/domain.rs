use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Number of slots in an encoded [`FeatureVector`].
pub const FEATURE_COUNT: usize = 6;

/// Raw student record as supplied by a caller.
///
/// Categorical fields stay as strings so unseen categories reach the encoder, where they
/// resolve to default codes. Numeric fields accept numbers or numeric strings; anything
/// else is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    #[serde(default, deserialize_with = "lenient_label")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub age: Option<f64>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub student_education: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub study_time_per_week: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub absences: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub attendance_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub test_prep: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub writing_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub reading_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub speaking_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub extra_curricular: Option<bool>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub internet_access: Option<bool>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub tutoring: Option<bool>,
}

impl StudentInput {
    pub const DEFAULT_ATTENDANCE_RATE: f64 = 65.0;

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Unknown")
    }

    pub fn attendance_rate_or_default(&self) -> f64 {
        self.attendance_rate
            .unwrap_or(Self::DEFAULT_ATTENDANCE_RATE)
    }

    /// Unrounded mean of the writing, reading, and speaking scores; missing scores count as 0.
    pub fn english_average(&self) -> f64 {
        let writing = self.writing_score.unwrap_or(0.0);
        let reading = self.reading_score.unwrap_or(0.0);
        let speaking = self.speaking_score.unwrap_or(0.0);
        (writing + reading + speaking) / 3.0
    }

    pub fn study_time_label(&self) -> &str {
        self.study_time_per_week
            .as_deref()
            .unwrap_or(StudyTime::DEFAULT.label())
    }

    pub fn test_prep(&self) -> TestPrep {
        self.test_prep
            .as_deref()
            .and_then(TestPrep::from_label)
            .unwrap_or(TestPrep::NotPrepared)
    }
}

fn lenient_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(coerce_number))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Bool(flag)) => Some(flag),
        Some(Value::Number(number)) => number.as_f64().map(|value| value != 0.0),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Coerce-or-default: non-numeric and non-finite values become `None`.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const DEFAULT: Self = Self::Female;

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Education {
    Secondary,
    Bachelors,
    Masters,
    Doctorate,
}

impl Education {
    pub const DEFAULT: Self = Self::Secondary;

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "secondary" => Some(Self::Secondary),
            "bachelors" => Some(Self::Bachelors),
            "masters" => Some(Self::Masters),
            "doctorate" => Some(Self::Doctorate),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Secondary => "secondary",
            Self::Bachelors => "bachelors",
            Self::Masters => "masters",
            Self::Doctorate => "doctorate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyTime {
    LessThan2,
    TwoToFive,
    FiveToTen,
    MoreThan10,
}

impl StudyTime {
    pub const DEFAULT: Self = Self::TwoToFive;

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "less_than_2" => Some(Self::LessThan2),
            "2_to_5" => Some(Self::TwoToFive),
            "5_to_10" => Some(Self::FiveToTen),
            "more_than_10" => Some(Self::MoreThan10),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::LessThan2 => "less_than_2",
            Self::TwoToFive => "2_to_5",
            Self::FiveToTen => "5_to_10",
            Self::MoreThan10 => "more_than_10",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absences {
    None,
    OneToFive,
    SixToTen,
    MoreThan10,
}

impl Absences {
    pub const DEFAULT: Self = Self::None;

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "none" => Some(Self::None),
            "1_to_5" => Some(Self::OneToFive),
            "6_to_10" => Some(Self::SixToTen),
            "more_than_10" => Some(Self::MoreThan10),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::OneToFive => "1_to_5",
            Self::SixToTen => "6_to_10",
            Self::MoreThan10 => "more_than_10",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPrep {
    Prepared,
    NotPrepared,
}

impl TestPrep {
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "prepared" => Some(Self::Prepared),
            "not_prepared" => Some(Self::NotPrepared),
            _ => None,
        }
    }
}

/// Categorical outcome of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    AtRisk,
    Satisfactory,
    HighAchiever,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [Self::AtRisk, Self::Satisfactory, Self::HighAchiever];

    pub fn label(self) -> &'static str {
        match self {
            Self::AtRisk => "at_risk",
            Self::Satisfactory => "satisfactory",
            Self::HighAchiever => "high_achiever",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.label() == raw.trim())
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probability mass over the three risk levels. Serializes as a map keyed by label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskProbabilities {
    pub at_risk: f64,
    pub satisfactory: f64,
    pub high_achiever: f64,
}

impl RiskProbabilities {
    pub const fn new(at_risk: f64, satisfactory: f64, high_achiever: f64) -> Self {
        Self {
            at_risk,
            satisfactory,
            high_achiever,
        }
    }

    pub fn get(&self, level: RiskLevel) -> f64 {
        match level {
            RiskLevel::AtRisk => self.at_risk,
            RiskLevel::Satisfactory => self.satisfactory,
            RiskLevel::HighAchiever => self.high_achiever,
        }
    }

    pub fn total(&self) -> f64 {
        self.at_risk + self.satisfactory + self.high_achiever
    }

    /// Rescale so the three entries sum to one. Returns `None` when there is no usable mass.
    pub fn normalized(self) -> Option<Self> {
        let values = [self.at_risk, self.satisfactory, self.high_achiever];
        if values.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return None;
        }
        let total = self.total();
        if total <= 0.0 {
            return None;
        }
        Some(Self::new(
            self.at_risk / total,
            self.satisfactory / total,
            self.high_achiever / total,
        ))
    }
}

/// Encoded model input in the fixed training order
/// `[studyTime, absences, education, gender, attendanceRate, englishAverage]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub study_time: f64,
    pub absences: f64,
    pub education: f64,
    pub gender: f64,
    pub attendance_rate: f64,
    pub english_average: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.study_time,
            self.absences,
            self.education,
            self.gender,
            self.attendance_rate,
            self.english_average,
        ]
    }
}

/// Which resolution path produced the risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    Model,
    Fallback,
}

impl PredictionMethod {
    pub fn label(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Fallback => "fallback",
        }
    }
}

/// Weighted, human-readable contributor to a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub value: String,
    pub impact: f64,
    pub explanation: String,
}

/// Diagnostics describing what produced a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub features_used: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<usize>,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub probabilities: RiskProbabilities,
    pub predicted_score: f64,
    pub english_average: f64,
    pub factors: Vec<Factor>,
    pub recommendations: Vec<String>,
    pub prediction_method: PredictionMethod,
    pub model_info: ModelInfo,
    pub model_loaded: bool,
}

/// Round to one decimal place, half away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
