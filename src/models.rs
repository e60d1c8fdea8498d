use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The three survey instruments an itinerary collects responses for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    SchoolOutput,
    ConsolidatedChecklist,
    PartnersInPlay,
}

impl Instrument {
    pub const ALL: [Instrument; 3] = [
        Instrument::SchoolOutput,
        Instrument::ConsolidatedChecklist,
        Instrument::PartnersInPlay,
    ];

    /// Stable identifier used in URLs, CSV imports and the `instrument` column.
    pub fn slug(&self) -> &'static str {
        match self {
            Instrument::SchoolOutput => "school-output",
            Instrument::ConsolidatedChecklist => "consolidated-checklist",
            Instrument::PartnersInPlay => "partners-in-play",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Instrument::SchoolOutput => "School Output",
            Instrument::ConsolidatedChecklist => "Consolidated Checklist",
            Instrument::PartnersInPlay => "Partners in Play",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Instrument::ALL
            .into_iter()
            .find(|instrument| instrument.slug() == value.trim())
            .ok_or_else(|| {
                format!(
                    "unknown instrument '{value}' (expected school-output, consolidated-checklist or partners-in-play)"
                )
            })
    }
}

/// A data-collection round that schools submit responses against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Submission identifier as issued by whichever store produced the response:
/// integer keys from the monitoring app, UUIDs from the local store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmissionId {
    Number(i64),
    Text(String),
}

impl From<Uuid> for SubmissionId {
    fn from(id: Uuid) -> Self {
        SubmissionId::Text(id.to_string())
    }
}

impl From<i64> for SubmissionId {
    fn from(id: i64) -> Self {
        SubmissionId::Number(id)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionId::Number(id) => write!(f, "{id}"),
            SubmissionId::Text(id) => f.write_str(id),
        }
    }
}

/// Ids only attribute detail rows, so an id of any other shape is dropped
/// rather than failing the whole collection.
fn lenient_submission_id<'de, D>(deserializer: D) -> Result<Option<SubmissionId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_i64().map(SubmissionId::Number),
        Some(Value::String(text)) if !text.trim().is_empty() => Some(SubmissionId::Text(text)),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    #[serde(default)]
    pub answer_value: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub upload_file_path: Option<String>,
}

/// One submitted survey form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    #[serde(default, deserialize_with = "lenient_submission_id")]
    pub id: Option<SubmissionId>,
    #[serde(default)]
    pub school_id: Option<i64>,
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<i64>,
    #[serde(default)]
    pub teacher_name: Option<String>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl ResponseRecord {
    /// First answer recorded for `question_id`. An unmapped question never matches.
    pub fn answer_for(&self, question_id: Option<i64>) -> Option<&Answer> {
        let question_id = question_id?;
        self.answers
            .iter()
            .find(|answer| answer.question_id == question_id)
    }

    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            response_id: self.id.clone(),
            school_id: self.school_id,
            school_name: self.school_name.clone(),
            teacher_id: self.teacher_id,
            teacher_name: self.teacher_name.clone(),
        }
    }
}

/// The three response collections loaded for one itinerary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSet {
    #[serde(default)]
    pub school_output: Vec<ResponseRecord>,
    #[serde(default)]
    pub consolidated_checklist: Vec<ResponseRecord>,
    #[serde(default)]
    pub partners_in_play: Vec<ResponseRecord>,
}

impl ResponseSet {
    pub fn collection(&self, instrument: Instrument) -> &[ResponseRecord] {
        match instrument {
            Instrument::SchoolOutput => &self.school_output,
            Instrument::ConsolidatedChecklist => &self.consolidated_checklist,
            Instrument::PartnersInPlay => &self.partners_in_play,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordIdentity {
    pub response_id: Option<SubmissionId>,
    pub school_id: Option<i64>,
    pub school_name: Option<String>,
    pub teacher_id: Option<i64>,
    pub teacher_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationPlanIndicator {
    pub percentage: f64,
    pub schools_with_plans: usize,
    pub total_schools: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopmentPlanIndicator {
    pub percentage: f64,
    pub schools_with_development_plans: usize,
    pub total_schools: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanIndicator {
    pub percentage: f64,
    pub teachers_with_lesson_plans: usize,
    pub total_teachers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningEnvironmentDetail {
    #[serde(flatten)]
    pub identity: RecordIdentity,
    pub tone_score: u8,
    pub effort_score: u8,
    pub participation_score: f64,
    pub weighted_score: f64,
    #[serde(rename = "usesLtPMethods")]
    pub uses_ltp_methods: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningEnvironmentIndicator {
    pub percentage: f64,
    #[serde(rename = "environmentsUsingLtP")]
    pub environments_using_ltp: usize,
    pub total_environments: usize,
    pub average_score: f64,
    pub detailed_scores: Vec<LearningEnvironmentDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSkillDetail {
    #[serde(flatten)]
    pub identity: RecordIdentity,
    /// Sub-score per mapped skill question, keyed by the mapping name.
    pub scores: BTreeMap<String, f64>,
    pub avg_score: f64,
    #[serde(rename = "hasLtPSkills")]
    pub has_ltp_skills: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSkillIndicator {
    pub percentage: f64,
    pub teachers_with_skills: usize,
    pub total_teachers: usize,
    pub average_score: f64,
    pub detailed_scores: Vec<TeacherSkillDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentTotals {
    pub total_enrollment: i64,
    pub boys_enrollment: i64,
    pub girls_enrollment: i64,
    pub school_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolsReached {
    pub schools_reached: usize,
}

/// Every outcome indicator for one itinerary. Serialized as the API body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeIndicators {
    pub itinerary_id: i64,
    pub implementation_plans: ImplementationPlanIndicator,
    pub development_plans: DevelopmentPlanIndicator,
    pub lesson_plans: LessonPlanIndicator,
    pub learning_environments: LearningEnvironmentIndicator,
    pub teacher_skills: TeacherSkillIndicator,
    pub enrollment: EnrollmentTotals,
    pub schools_reached: SchoolsReached,
}
