use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Absences, Education, FeatureVector, Gender, StudentInput, StudyTime};

/// Closed vocabulary learned at training time; a category's code is its index in `classes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `None` for categories outside the learned vocabulary.
    pub fn transform(&self, category: &str) -> Option<u32> {
        self.classes
            .iter()
            .position(|known| known == category)
            .and_then(|index| u32::try_from(index).ok())
    }
}

/// Categorical inputs that may have a trained encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedField {
    StudyTime,
    Absences,
    Education,
    Gender,
}

impl EncodedField {
    /// Table keys in lookup order; later entries are legacy spellings from older exports.
    pub fn table_keys(self) -> &'static [&'static str] {
        match self {
            Self::StudyTime => &["study_time"],
            Self::Absences => &["absence", "attendance"],
            Self::Education => &["education"],
            Self::Gender => &["gender", "Gender"],
        }
    }
}

/// Per-field encoders shipped alongside a classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderTable {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoder(mut self, key: impl Into<String>, encoder: LabelEncoder) -> Self {
        self.encoders.insert(key.into(), encoder);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    pub fn encoder_for(&self, field: EncodedField) -> Option<&LabelEncoder> {
        field
            .table_keys()
            .iter()
            .find_map(|key| self.encoders.get(*key))
    }

    fn lookup(&self, field: EncodedField, category: &str) -> Option<f64> {
        self.encoder_for(field)?
            .transform(category)
            .map(f64::from)
    }
}

/// Encode a student record into the fixed-order feature vector.
///
/// Never fails. A missing category is replaced by its default label before anything else,
/// so an omitted field encodes exactly like its default category. The encoder table is
/// tried first; the default code map covers a missing table, a missing key, or an unseen
/// category.
pub fn encode(input: &StudentInput, encoders: Option<&EncoderTable>) -> FeatureVector {
    let learned = |field: EncodedField, category: &str| {
        encoders.and_then(|table| table.lookup(field, category))
    };

    let study_time = input
        .study_time_per_week
        .as_deref()
        .unwrap_or(StudyTime::DEFAULT.label());
    let absences = input
        .absences
        .as_deref()
        .unwrap_or(Absences::DEFAULT.label());
    let education = input
        .student_education
        .as_deref()
        .unwrap_or(Education::DEFAULT.label());
    let gender = input.gender.as_deref().unwrap_or(Gender::DEFAULT.label());

    FeatureVector {
        study_time: learned(EncodedField::StudyTime, study_time)
            .unwrap_or_else(|| default_study_time_code(study_time)),
        absences: learned(EncodedField::Absences, absences)
            .unwrap_or_else(|| default_absences_code(absences)),
        education: learned(EncodedField::Education, education)
            .unwrap_or_else(|| default_education_code(education)),
        gender: learned(EncodedField::Gender, gender)
            .unwrap_or_else(|| default_gender_code(gender)),
        attendance_rate: input.attendance_rate_or_default(),
        english_average: input.english_average(),
    }
}

fn default_study_time_code(raw: &str) -> f64 {
    let study_time = StudyTime::from_label(raw)
        .unwrap_or(StudyTime::DEFAULT);
    match study_time {
        StudyTime::LessThan2 => 0.0,
        StudyTime::TwoToFive => 1.0,
        StudyTime::FiveToTen => 2.0,
        StudyTime::MoreThan10 => 3.0,
    }
}

fn default_absences_code(raw: &str) -> f64 {
    let absences = Absences::from_label(raw)
        .unwrap_or(Absences::DEFAULT);
    match absences {
        Absences::None => 3.0,
        Absences::OneToFive => 2.0,
        Absences::SixToTen => 1.0,
        Absences::MoreThan10 => 0.0,
    }
}

fn default_education_code(raw: &str) -> f64 {
    let education = Education::from_label(raw)
        .unwrap_or(Education::DEFAULT);
    match education {
        Education::Secondary => 2.0,
        Education::Bachelors => 0.0,
        Education::Masters | Education::Doctorate => 1.0,
    }
}

// Anything other than a recognised female label codes as not female.
fn default_gender_code(raw: &str) -> f64 {
    match Gender::from_label(raw) {
        Some(Gender::Female) => 1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_encoder_uses_class_index() {
        let encoder = LabelEncoder::new(["2_to_5", "5_to_10", "less_than_2", "more_than_10"]);
        assert_eq!(encoder.transform("less_than_2"), Some(2));
        assert_eq!(encoder.transform("weekly"), None);
    }

    #[test]
    fn legacy_keys_resolve_to_the_same_field() {
        let table = EncoderTable::new()
            .with_encoder("Gender", LabelEncoder::new(["female", "male"]))
            .with_encoder("attendance", LabelEncoder::new(["none", "1_to_5"]));

        assert!(table.encoder_for(EncodedField::Gender).is_some());
        assert!(table.encoder_for(EncodedField::Absences).is_some());
        assert!(table.encoder_for(EncodedField::Education).is_none());
    }

    #[test]
    fn gender_default_is_case_insensitive() {
        assert_eq!(default_gender_code("FEMALE"), 1.0);
        assert_eq!(default_gender_code("male"), 0.0);
        assert_eq!(default_gender_code("nonbinary"), 0.0);
    }

    #[test]
    fn study_time_default_map_covers_vocabulary() {
        assert_eq!(default_study_time_code("less_than_2"), 0.0);
        assert_eq!(default_study_time_code("more_than_10"), 3.0);
        assert_eq!(default_study_time_code("whenever"), 1.0);
    }
}
