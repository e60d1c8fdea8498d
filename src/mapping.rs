use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;

/// Largest number of sub-questions the teacher-skills score averages over.
pub const MAX_SKILL_QUESTIONS: usize = 10;

/// Skill name to question ID.
pub type TeacherSkillQuestions = BTreeMap<String, i64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LearningEnvironmentQuestions {
    pub tone_question: Option<i64>,
    pub effort_question: Option<i64>,
    pub participation_question: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnrollmentQuestions {
    pub boys_enrolled_question: Option<i64>,
    pub girls_enrolled_question: Option<i64>,
}

/// Binds semantic question names to the numeric question IDs of the form
/// version used by an itinerary. Unmapped questions behave like missing answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionMappings {
    pub implementation_plan_question: Option<i64>,
    pub development_plan_question: Option<i64>,
    pub lesson_plan_question: Option<i64>,
    pub learning_environment: LearningEnvironmentQuestions,
    pub teacher_skills: TeacherSkillQuestions,
    pub enrollment: EnrollmentQuestions,
}

impl QuestionMappings {
    pub fn from_json(raw: &str) -> Result<Self, IndicatorError> {
        let mappings: QuestionMappings = serde_json::from_str(raw)?;
        mappings.validate()?;
        Ok(mappings)
    }

    pub fn from_path(path: &Path) -> Result<Self, IndicatorError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), IndicatorError> {
        if self.teacher_skills.len() > MAX_SKILL_QUESTIONS {
            return Err(IndicatorError::InvalidMappings(format!(
                "teacherSkills maps {} questions, at most {MAX_SKILL_QUESTIONS} are allowed",
                self.teacher_skills.len()
            )));
        }

        if let Some(name) = self.teacher_skills.keys().find(|name| name.trim().is_empty()) {
            return Err(IndicatorError::InvalidMappings(format!(
                "teacherSkills contains a blank skill name ({name:?})"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_mapping() {
        let mappings = QuestionMappings::from_json(
            r#"{
                "implementationPlanQuestion": 12,
                "developmentPlanQuestion": 13,
                "lessonPlanQuestion": 41,
                "learningEnvironment": {
                    "toneQuestion": 43,
                    "effortQuestion": 44,
                    "participationQuestion": 45
                },
                "teacherSkills": { "learnerChoice": 50, "openQuestions": 51 },
                "enrollment": { "boysEnrolledQuestion": 3, "girlsEnrolledQuestion": 4 }
            }"#,
        )
        .unwrap();

        assert_eq!(mappings.implementation_plan_question, Some(12));
        assert_eq!(mappings.learning_environment.participation_question, Some(45));
        assert_eq!(mappings.teacher_skills.get("openQuestions"), Some(&51));
        assert_eq!(mappings.enrollment.girls_enrolled_question, Some(4));
    }

    #[test]
    fn missing_sections_default_to_unmapped() {
        let mappings = QuestionMappings::from_json(r#"{ "lessonPlanQuestion": 7 }"#).unwrap();
        assert_eq!(mappings.lesson_plan_question, Some(7));
        assert_eq!(mappings.implementation_plan_question, None);
        assert!(mappings.teacher_skills.is_empty());
        assert_eq!(mappings.learning_environment, LearningEnvironmentQuestions::default());
    }

    #[test]
    fn rejects_more_than_ten_skill_questions() {
        let mut mappings = QuestionMappings::default();
        for index in 0..11 {
            mappings
                .teacher_skills
                .insert(format!("skill{index}"), 100 + index);
        }

        let err = mappings.validate().unwrap_err();
        assert!(matches!(err, IndicatorError::InvalidMappings(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = QuestionMappings::from_json(r#"{ "lessonPlanQuestion": "seven" }"#).unwrap_err();
        assert!(matches!(err, IndicatorError::Json(_)));
    }
}
