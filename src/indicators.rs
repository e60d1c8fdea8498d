//! Per-indicator calculators.
//!
//! Every calculator is a pure function over borrowed response collections.
//! An empty collection produces a zeroed result, never an error.

use std::collections::{BTreeMap, HashSet};

use crate::mapping::{EnrollmentQuestions, LearningEnvironmentQuestions, TeacherSkillQuestions};
use crate::models::{
    DevelopmentPlanIndicator, EnrollmentTotals, ImplementationPlanIndicator,
    LearningEnvironmentDetail, LearningEnvironmentIndicator, LessonPlanIndicator, ResponseRecord,
    SchoolsReached, TeacherSkillDetail, TeacherSkillIndicator,
};
use crate::scoring::{self, ScoreMapper};

pub const TONE_WEIGHT: f64 = 0.3;
pub const EFFORT_WEIGHT: f64 = 0.3;
pub const PARTICIPATION_WEIGHT: f64 = 0.4;

/// Pass mark shared by the weighted learning-environment score and the
/// teacher-skills average.
pub const DEFAULT_THRESHOLD: f64 = 3.5;

/// Pass marks for the two weighted-score indicators. A score equal to the
/// threshold passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub learning_environment: f64,
    pub teacher_skills: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            learning_environment: DEFAULT_THRESHOLD,
            teacher_skills: DEFAULT_THRESHOLD,
        }
    }
}

fn count_matching<F>(responses: &[ResponseRecord], predicate: F) -> (usize, usize)
where
    F: Fn(&ResponseRecord) -> bool,
{
    let matched = responses.iter().filter(|response| predicate(response)).count();
    (matched, responses.len())
}

pub fn calculate_schools_with_implementation_plans(
    responses: &[ResponseRecord],
    question_id: Option<i64>,
) -> ImplementationPlanIndicator {
    let (matched, total) = count_matching(responses, |response| {
        scoring::is_yes(response.answer_for(question_id))
    });

    ImplementationPlanIndicator {
        percentage: scoring::percentage(matched, total),
        schools_with_plans: matched,
        total_schools: total,
    }
}

pub fn calculate_schools_with_ltp_development_plans(
    responses: &[ResponseRecord],
    question_id: Option<i64>,
) -> DevelopmentPlanIndicator {
    let (matched, total) = count_matching(responses, |response| {
        scoring::has_upload(response.answer_for(question_id))
    });

    DevelopmentPlanIndicator {
        percentage: scoring::percentage(matched, total),
        schools_with_development_plans: matched,
        total_schools: total,
    }
}

pub fn calculate_teachers_with_ltp_lesson_plans(
    responses: &[ResponseRecord],
    question_id: Option<i64>,
) -> LessonPlanIndicator {
    let (matched, total) = count_matching(responses, |response| {
        scoring::is_yes(response.answer_for(question_id))
    });

    LessonPlanIndicator {
        percentage: scoring::percentage(matched, total),
        teachers_with_lesson_plans: matched,
        total_teachers: total,
    }
}

/// `0.3 * tone + 0.3 * effort + 0.4 * participation`.
pub fn weighted_environment_score(tone: u8, effort: u8, participation: f64) -> f64 {
    TONE_WEIGHT * f64::from(tone) + EFFORT_WEIGHT * f64::from(effort) + PARTICIPATION_WEIGHT * participation
}

pub fn calculate_learning_environments_with_ltp_methods(
    responses: &[ResponseRecord],
    questions: &LearningEnvironmentQuestions,
    threshold: f64,
) -> LearningEnvironmentIndicator {
    let mut weighted_scores = Vec::with_capacity(responses.len());
    let mut detailed_scores = Vec::with_capacity(responses.len());

    for response in responses {
        let tone = ScoreMapper::Tone.score_answer(response.answer_for(questions.tone_question));
        let effort =
            ScoreMapper::Effort.score_answer(response.answer_for(questions.effort_question));
        let participation =
            scoring::answer_number(response.answer_for(questions.participation_question));
        let weighted = weighted_environment_score(tone, effort, participation);

        weighted_scores.push(weighted);
        detailed_scores.push(LearningEnvironmentDetail {
            identity: response.identity(),
            tone_score: tone,
            effort_score: effort,
            participation_score: scoring::round2(participation),
            weighted_score: scoring::round2(weighted),
            uses_ltp_methods: weighted >= threshold,
        });
    }

    let passing = detailed_scores
        .iter()
        .filter(|detail| detail.uses_ltp_methods)
        .count();

    LearningEnvironmentIndicator {
        percentage: scoring::percentage(passing, responses.len()),
        environments_using_ltp: passing,
        total_environments: responses.len(),
        average_score: scoring::round2(scoring::mean(&weighted_scores)),
        detailed_scores,
    }
}

pub fn calculate_teachers_with_ltp_skills(
    responses: &[ResponseRecord],
    questions: &TeacherSkillQuestions,
    threshold: f64,
) -> TeacherSkillIndicator {
    let mut record_scores = Vec::with_capacity(responses.len());
    let mut detailed_scores = Vec::with_capacity(responses.len());

    for response in responses {
        let sub_scores: Vec<(&String, f64)> = questions
            .iter()
            .map(|(name, question_id)| {
                let score = scoring::answer_number(response.answer_for(Some(*question_id)));
                (name, score)
            })
            .collect();
        let values: Vec<f64> = sub_scores.iter().map(|(_, score)| *score).collect();
        let avg = scoring::mean(&values);

        record_scores.push(avg);
        detailed_scores.push(TeacherSkillDetail {
            identity: response.identity(),
            scores: sub_scores
                .into_iter()
                .map(|(name, score)| (name.clone(), scoring::round2(score)))
                .collect::<BTreeMap<_, _>>(),
            avg_score: scoring::round2(avg),
            has_ltp_skills: avg >= threshold,
        });
    }

    let passing = detailed_scores
        .iter()
        .filter(|detail| detail.has_ltp_skills)
        .count();

    TeacherSkillIndicator {
        percentage: scoring::percentage(passing, responses.len()),
        teachers_with_skills: passing,
        total_teachers: responses.len(),
        average_score: scoring::round2(scoring::mean(&record_scores)),
        detailed_scores,
    }
}

pub fn calculate_total_primary_enrollment(
    responses: &[ResponseRecord],
    questions: &EnrollmentQuestions,
) -> EnrollmentTotals {
    let (boys, girls) = responses.iter().fold((0i64, 0i64), |(boys, girls), response| {
        (
            boys.saturating_add(scoring::answer_int(
                response.answer_for(questions.boys_enrolled_question),
            )),
            girls.saturating_add(scoring::answer_int(
                response.answer_for(questions.girls_enrolled_question),
            )),
        )
    });

    EnrollmentTotals {
        total_enrollment: boys.saturating_add(girls),
        boys_enrollment: boys,
        girls_enrollment: girls,
        school_count: responses.len(),
    }
}

/// Distinct schools with at least one submission in any collection.
pub fn calculate_schools_reached(
    school_responses: &[ResponseRecord],
    consolidated_responses: &[ResponseRecord],
    pip_responses: &[ResponseRecord],
) -> SchoolsReached {
    let schools: HashSet<i64> = school_responses
        .iter()
        .chain(consolidated_responses)
        .chain(pip_responses)
        .filter_map(|response| response.school_id)
        .collect();

    SchoolsReached {
        schools_reached: schools.len(),
    }
}
