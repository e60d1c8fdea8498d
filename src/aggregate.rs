use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::{IndicatorError, Result};
use crate::indicators::{self, Thresholds};
use crate::mapping::QuestionMappings;
use crate::models::{Instrument, OutcomeIndicators, ResponseRecord, ResponseSet};
use crate::source::ResponseSource;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub thresholds: Thresholds,
    /// Upper bound for each of the three fetches.
    pub fetch_timeout: Duration,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Runs every indicator calculator over an already-loaded response set.
pub fn aggregate(
    itinerary_id: i64,
    responses: &ResponseSet,
    mappings: &QuestionMappings,
    thresholds: Thresholds,
) -> OutcomeIndicators {
    let school_output = &responses.school_output;
    let consolidated = &responses.consolidated_checklist;
    let pip = &responses.partners_in_play;

    OutcomeIndicators {
        itinerary_id,
        implementation_plans: indicators::calculate_schools_with_implementation_plans(
            consolidated,
            mappings.implementation_plan_question,
        ),
        development_plans: indicators::calculate_schools_with_ltp_development_plans(
            consolidated,
            mappings.development_plan_question,
        ),
        lesson_plans: indicators::calculate_teachers_with_ltp_lesson_plans(
            pip,
            mappings.lesson_plan_question,
        ),
        learning_environments: indicators::calculate_learning_environments_with_ltp_methods(
            pip,
            &mappings.learning_environment,
            thresholds.learning_environment,
        ),
        teacher_skills: indicators::calculate_teachers_with_ltp_skills(
            pip,
            &mappings.teacher_skills,
            thresholds.teacher_skills,
        ),
        enrollment: indicators::calculate_total_primary_enrollment(
            school_output,
            &mappings.enrollment,
        ),
        schools_reached: indicators::calculate_schools_reached(school_output, consolidated, pip),
    }
}

async fn fetch_with_timeout<S>(
    source: &S,
    instrument: Instrument,
    itinerary_id: i64,
    timeout: Duration,
) -> Result<Vec<ResponseRecord>>
where
    S: ResponseSource + ?Sized,
{
    match tokio::time::timeout(timeout, source.fetch_responses(instrument, itinerary_id)).await {
        Ok(Ok(records)) => {
            debug!(%instrument, itinerary_id, count = records.len(), "fetched responses");
            Ok(records)
        }
        Ok(Err(err)) => Err(IndicatorError::Fetch {
            instrument,
            source: Box::new(err),
        }),
        Err(_) => Err(IndicatorError::Timeout {
            instrument,
            elapsed: timeout,
        }),
    }
}

/// Fetches the three collections concurrently. The first failure or timeout
/// aborts the whole load.
pub async fn load_responses<S>(
    source: &S,
    itinerary_id: i64,
    timeout: Duration,
) -> Result<ResponseSet>
where
    S: ResponseSource + ?Sized,
{
    let (school_output, consolidated_checklist, partners_in_play) = tokio::try_join!(
        fetch_with_timeout(source, Instrument::SchoolOutput, itinerary_id, timeout),
        fetch_with_timeout(source, Instrument::ConsolidatedChecklist, itinerary_id, timeout),
        fetch_with_timeout(source, Instrument::PartnersInPlay, itinerary_id, timeout),
    )?;

    Ok(ResponseSet {
        school_output,
        consolidated_checklist,
        partners_in_play,
    })
}

pub async fn load_and_aggregate<S>(
    source: &S,
    itinerary_id: i64,
    mappings: &QuestionMappings,
    options: AggregateOptions,
) -> Result<OutcomeIndicators>
where
    S: ResponseSource + ?Sized,
{
    let responses = match load_responses(source, itinerary_id, options.fetch_timeout).await {
        Ok(responses) => responses,
        Err(err) => {
            error!(itinerary_id, error = %err, "failed to load outcome indicators");
            return Err(err);
        }
    };

    info!(
        itinerary_id,
        school_output = responses.school_output.len(),
        consolidated_checklist = responses.consolidated_checklist.len(),
        partners_in_play = responses.partners_in_play.len(),
        "aggregating outcome indicators"
    );

    Ok(aggregate(itinerary_id, &responses, mappings, options.thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Answer;
    use async_trait::async_trait;
    use uuid::Uuid;

    fn answer(question_id: i64, value: &str) -> Answer {
        Answer {
            question_id,
            answer_value: Some(value.to_string()),
            score: None,
            upload_file_path: None,
        }
    }

    fn record(school_id: i64, answers: Vec<Answer>) -> ResponseRecord {
        ResponseRecord {
            id: Some(Uuid::new_v4().into()),
            school_id: Some(school_id),
            school_name: None,
            teacher_id: None,
            teacher_name: None,
            answers,
        }
    }

    fn sample_set() -> ResponseSet {
        ResponseSet {
            school_output: vec![
                record(1, vec![answer(3, "10"), answer(4, "12")]),
                record(2, vec![answer(3, "5"), answer(4, "8")]),
            ],
            consolidated_checklist: vec![
                record(1, vec![answer(12, "Yes")]),
                record(3, vec![answer(12, "no")]),
            ],
            partners_in_play: vec![record(
                4,
                vec![
                    answer(41, "yes"),
                    answer(43, "Frequently"),
                    answer(44, "Not at all"),
                    answer(45, "5"),
                ],
            )],
        }
    }

    fn sample_mappings() -> QuestionMappings {
        QuestionMappings::from_json(
            r#"{
                "implementationPlanQuestion": 12,
                "developmentPlanQuestion": 13,
                "lessonPlanQuestion": 41,
                "learningEnvironment": { "toneQuestion": 43, "effortQuestion": 44, "participationQuestion": 45 },
                "enrollment": { "boysEnrolledQuestion": 3, "girlsEnrolledQuestion": 4 }
            }"#,
        )
        .unwrap()
    }

    struct FailingSource {
        failing: Instrument,
    }

    #[async_trait]
    impl ResponseSource for FailingSource {
        async fn fetch_responses(
            &self,
            instrument: Instrument,
            _itinerary_id: i64,
        ) -> Result<Vec<ResponseRecord>> {
            if instrument == self.failing {
                Err(IndicatorError::Config("upstream unavailable".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct StalledSource;

    #[async_trait]
    impl ResponseSource for StalledSource {
        async fn fetch_responses(
            &self,
            instrument: Instrument,
            _itinerary_id: i64,
        ) -> Result<Vec<ResponseRecord>> {
            if instrument == Instrument::PartnersInPlay {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(Vec::new())
        }
    }

    #[test]
    fn aggregate_routes_collections_to_calculators() {
        let result = aggregate(7, &sample_set(), &sample_mappings(), Thresholds::default());

        assert_eq!(result.itinerary_id, 7);
        assert_eq!(result.implementation_plans.schools_with_plans, 1);
        assert_eq!(result.implementation_plans.total_schools, 2);
        assert_eq!(result.development_plans.schools_with_development_plans, 0);
        assert_eq!(result.lesson_plans.teachers_with_lesson_plans, 1);
        assert_eq!(result.learning_environments.environments_using_ltp, 1);
        assert_eq!(result.teacher_skills.total_teachers, 1);
        assert_eq!(result.teacher_skills.average_score, 0.0);
        assert_eq!(result.enrollment.total_enrollment, 35);
        assert_eq!(result.schools_reached.schools_reached, 4);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let responses = sample_set();
        let mappings = sample_mappings();
        let first = aggregate(7, &responses, &mappings, Thresholds::default());
        let second = aggregate(7, &responses, &mappings, Thresholds::default());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn load_and_aggregate_uses_source_collections() {
        let source = sample_set();
        let result = load_and_aggregate(&source, 7, &sample_mappings(), AggregateOptions::default())
            .await
            .unwrap();

        assert_eq!(result, aggregate(7, &source, &sample_mappings(), Thresholds::default()));
    }

    #[tokio::test]
    async fn fetch_failure_aborts_aggregation() {
        let source = FailingSource {
            failing: Instrument::ConsolidatedChecklist,
        };

        let err = load_and_aggregate(&source, 7, &sample_mappings(), AggregateOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, IndicatorError::Fetch { .. }));
        assert_eq!(err.instrument(), Some(Instrument::ConsolidatedChecklist));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out() {
        let options = AggregateOptions {
            fetch_timeout: Duration::from_secs(5),
            ..AggregateOptions::default()
        };

        let err = load_and_aggregate(&StalledSource, 7, &sample_mappings(), options)
            .await
            .unwrap_err();

        match err {
            IndicatorError::Timeout { instrument, elapsed } => {
                assert_eq!(instrument, Instrument::PartnersInPlay);
                assert_eq!(elapsed, Duration::from_secs(5));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
