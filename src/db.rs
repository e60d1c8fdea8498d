use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{IndicatorError, Result};
use crate::models::{Answer, Instrument, Itinerary, ResponseRecord};
use crate::source::ResponseSource;

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(sqlx::Error::from)?;
    Ok(())
}

/// A response waiting to be written, keyed by its submission key for idempotent imports.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResponse {
    pub submission_key: String,
    pub school_id: Option<i64>,
    pub school_name: Option<String>,
    pub teacher_id: Option<i64>,
    pub teacher_name: Option<String>,
    pub answers: Vec<Answer>,
}

pub fn validate_itinerary(itinerary: &Itinerary) -> Result<()> {
    if itinerary.name.trim().is_empty() {
        return Err(IndicatorError::InvalidItinerary(format!(
            "itinerary {} has a blank name",
            itinerary.id
        )));
    }

    if itinerary.end_date < itinerary.start_date {
        return Err(IndicatorError::InvalidItinerary(format!(
            "itinerary {} ends ({}) before it starts ({})",
            itinerary.id, itinerary.end_date, itinerary.start_date
        )));
    }

    Ok(())
}

pub async fn upsert_itinerary(pool: &PgPool, itinerary: &Itinerary) -> Result<()> {
    validate_itinerary(itinerary)?;

    sqlx::query(
        r#"
        INSERT INTO ltp_indicators.itineraries (id, name, start_date, end_date)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name, start_date = EXCLUDED.start_date, end_date = EXCLUDED.end_date
        "#,
    )
    .bind(itinerary.id)
    .bind(&itinerary.name)
    .bind(itinerary.start_date)
    .bind(itinerary.end_date)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_itinerary(pool: &PgPool, itinerary_id: i64) -> Result<Option<Itinerary>> {
    let row = sqlx::query(
        "SELECT id, name, start_date, end_date FROM ltp_indicators.itineraries WHERE id = $1",
    )
    .bind(itinerary_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Itinerary {
        id: row.get("id"),
        name: row.get("name"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
    }))
}

/// Writes one response and its answers. Returns `false` when the submission
/// key was already imported.
async fn insert_response(
    conn: &mut PgConnection,
    itinerary_id: i64,
    instrument: Instrument,
    response: &NewResponse,
) -> Result<bool> {
    let inserted: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO ltp_indicators.responses
        (id, itinerary_id, instrument, school_id, school_name, teacher_id, teacher_name, submission_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (submission_key) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(itinerary_id)
    .bind(instrument.slug())
    .bind(response.school_id)
    .bind(&response.school_name)
    .bind(response.teacher_id)
    .bind(&response.teacher_name)
    .bind(&response.submission_key)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(response_id) = inserted else {
        return Ok(false);
    };

    for (position, answer) in response.answers.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO ltp_indicators.answers
            (response_id, position, question_id, answer_value, score, upload_file_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(response_id)
        .bind(position as i32)
        .bind(answer.question_id)
        .bind(&answer.answer_value)
        .bind(answer.score)
        .bind(&answer.upload_file_path)
        .execute(&mut *conn)
        .await?;
    }

    Ok(true)
}

pub async fn insert_responses(
    pool: &PgPool,
    itinerary_id: i64,
    instrument: Instrument,
    responses: &[NewResponse],
) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for response in responses {
        if insert_response(&mut *tx, itinerary_id, instrument, response).await? {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

fn seed_answer(question_id: i64, value: &str) -> Answer {
    Answer {
        question_id,
        answer_value: Some(value.to_string()),
        score: None,
        upload_file_path: None,
    }
}

fn seed_response(
    key: &str,
    school: (i64, &str),
    teacher: Option<(i64, &str)>,
    answers: Vec<Answer>,
) -> NewResponse {
    NewResponse {
        submission_key: key.to_string(),
        school_id: Some(school.0),
        school_name: Some(school.1.to_string()),
        teacher_id: teacher.map(|(id, _)| id),
        teacher_name: teacher.map(|(_, name)| name.to_string()),
        answers,
    }
}

fn observation(
    key: &str,
    school: (i64, &str),
    teacher: (i64, &str),
    observed: (&str, &str, &str, &str),
    skill_scores: [f64; 10],
) -> NewResponse {
    let (lesson_plan, tone, effort, participation) = observed;
    let mut answers = vec![
        seed_answer(41, lesson_plan),
        seed_answer(43, tone),
        seed_answer(44, effort),
        seed_answer(45, participation),
    ];
    answers.extend(skill_scores.iter().zip(50..).map(|(score, question_id)| Answer {
        question_id,
        answer_value: Some(score.to_string()),
        score: Some(*score),
        upload_file_path: None,
    }));

    seed_response(key, school, Some(teacher), answers)
}

/// Loads a demo itinerary whose question IDs match `demos/question_mappings.json`.
pub async fn seed(pool: &PgPool) -> Result<()> {
    let start = NaiveDate::from_ymd_opt(2026, 1, 12)
        .ok_or_else(|| IndicatorError::InvalidItinerary("invalid seed start date".to_string()))?;
    let end = NaiveDate::from_ymd_opt(2026, 4, 3)
        .ok_or_else(|| IndicatorError::InvalidItinerary("invalid seed end date".to_string()))?;

    upsert_itinerary(
        pool,
        &Itinerary {
            id: 1,
            name: "Term 1 2026 LtP rollout".to_string(),
            start_date: start,
            end_date: end,
        },
    )
    .await?;

    let kibera = (101, "Kibera Primary");
    let mathare = (102, "Mathare North Primary");
    let olympic = (103, "Olympic Primary");
    let ayany = (104, "Ayany Primary");

    let school_output = vec![
        seed_response("seed-so-101", kibera, None, vec![seed_answer(3, "210"), seed_answer(4, "225")]),
        seed_response("seed-so-102", mathare, None, vec![seed_answer(3, "180"), seed_answer(4, "196")]),
        seed_response("seed-so-103", olympic, None, vec![seed_answer(3, "240"), seed_answer(4, "251")]),
    ];

    let mut kibera_plan = seed_answer(13, "Uploaded");
    kibera_plan.upload_file_path = Some("uploads/ltp-plans/kibera-2026.pdf".to_string());
    let consolidated = vec![
        seed_response("seed-cc-101", kibera, None, vec![seed_answer(12, "Yes"), kibera_plan]),
        seed_response("seed-cc-102", mathare, None, vec![seed_answer(12, "No")]),
        seed_response("seed-cc-104", ayany, None, vec![seed_answer(12, "yes")]),
    ];

    let partners_in_play = vec![
        observation(
            "seed-pip-1",
            kibera,
            (1, "Grace Achieng"),
            ("Yes", "Frequently", "Sometimes", "4"),
            [4.0, 5.0, 4.0, 4.0, 3.0, 4.0, 5.0, 4.0, 4.0, 3.0],
        ),
        observation(
            "seed-pip-2",
            mathare,
            (2, "Peter Otieno"),
            ("No", "Only boys", "Not at all", "2"),
            [2.0, 3.0, 2.0, 3.0, 2.0, 2.0, 3.0, 2.0, 3.0, 2.0],
        ),
        observation(
            "seed-pip-3",
            olympic,
            (3, "Mary Wanjiru"),
            ("yes", "Sometimes", "Frequently", "3"),
            [3.0, 4.0, 3.0, 4.0, 4.0, 3.0, 3.0, 4.0, 3.0, 4.0],
        ),
    ];

    for (instrument, responses) in [
        (Instrument::SchoolOutput, school_output),
        (Instrument::ConsolidatedChecklist, consolidated),
        (Instrument::PartnersInPlay, partners_in_play),
    ] {
        let inserted = insert_responses(pool, 1, instrument, &responses).await?;
        info!(%instrument, inserted, "seeded responses");
    }

    Ok(())
}

pub async fn fetch_responses(
    pool: &PgPool,
    instrument: Instrument,
    itinerary_id: i64,
) -> Result<Vec<ResponseRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, school_id, school_name, teacher_id, teacher_name
        FROM ltp_indicators.responses
        WHERE itinerary_id = $1 AND instrument = $2
        ORDER BY submitted_at, id
        "#,
    )
    .bind(itinerary_id)
    .bind(instrument.slug())
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = rows.iter().map(|row| row.get("id")).collect();
    let answer_rows = sqlx::query(
        r#"
        SELECT response_id, question_id, answer_value, score, upload_file_path
        FROM ltp_indicators.answers
        WHERE response_id = ANY($1)
        ORDER BY response_id, position
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut answers: HashMap<Uuid, Vec<Answer>> = HashMap::new();
    for row in answer_rows {
        answers
            .entry(row.get("response_id"))
            .or_default()
            .push(Answer {
                question_id: row.get("question_id"),
                answer_value: row.get("answer_value"),
                score: row.get("score"),
                upload_file_path: row.get("upload_file_path"),
            });
    }

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let id: Uuid = row.get("id");
        records.push(ResponseRecord {
            id: Some(id.into()),
            school_id: row.get("school_id"),
            school_name: row.get("school_name"),
            teacher_id: row.get("teacher_id"),
            teacher_name: row.get("teacher_name"),
            answers: answers.remove(&id).unwrap_or_default(),
        });
    }

    Ok(records)
}

/// Reads responses out of the local Postgres store.
#[derive(Clone)]
pub struct PgResponseSource {
    pool: PgPool,
}

impl PgResponseSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResponseSource for PgResponseSource {
    async fn fetch_responses(
        &self,
        instrument: Instrument,
        itinerary_id: i64,
    ) -> Result<Vec<ResponseRecord>> {
        fetch_responses(&self.pool, instrument, itinerary_id).await
    }
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    submission_key: String,
    school_id: Option<i64>,
    school_name: Option<String>,
    teacher_id: Option<i64>,
    teacher_name: Option<String>,
    question_id: i64,
    answer_value: Option<String>,
    score: Option<f64>,
    upload_file_path: Option<String>,
}

/// Groups one-answer-per-row CSV data into responses, in first-seen order.
pub fn read_csv_responses<R: Read>(reader: R) -> Result<Vec<NewResponse>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut responses: Vec<NewResponse> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let answer = Answer {
            question_id: row.question_id,
            answer_value: row.answer_value,
            score: row.score,
            upload_file_path: row.upload_file_path,
        };

        match index_by_key.get(&row.submission_key) {
            Some(&index) => responses[index].answers.push(answer),
            None => {
                index_by_key.insert(row.submission_key.clone(), responses.len());
                responses.push(NewResponse {
                    submission_key: row.submission_key,
                    school_id: row.school_id,
                    school_name: row.school_name,
                    teacher_id: row.teacher_id,
                    teacher_name: row.teacher_name,
                    answers: vec![answer],
                });
            }
        }
    }

    Ok(responses)
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &Path,
    itinerary_id: i64,
    instrument: Instrument,
) -> Result<usize> {
    let file = std::fs::File::open(csv_path)?;
    let responses = read_csv_responses(file)?;
    insert_responses(pool, itinerary_id, instrument, &responses).await
}
