use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::models::{Instrument, ResponseRecord};
use crate::source::ResponseSource;

/// Loads responses from the monitoring web app's REST API.
#[derive(Clone)]
pub struct HttpResponseSource {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl HttpResponseSource {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn responses_url(&self, instrument: Instrument, itinerary_id: i64) -> String {
        format!(
            "{}/api/itineraries/{itinerary_id}/{}/responses",
            self.base_url,
            instrument.slug()
        )
    }
}

#[async_trait]
impl ResponseSource for HttpResponseSource {
    async fn fetch_responses(
        &self,
        instrument: Instrument,
        itinerary_id: i64,
    ) -> Result<Vec<ResponseRecord>> {
        let url = self.responses_url(instrument, itinerary_id);
        debug!(%url, "requesting responses");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let records = request
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ResponseRecord>>()
            .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubmissionId;

    #[test]
    fn builds_instrument_urls() {
        let source = HttpResponseSource::new("https://monitoring.example.org/", None);
        assert_eq!(source.base_url(), "https://monitoring.example.org");
        assert_eq!(
            source.responses_url(Instrument::PartnersInPlay, 7),
            "https://monitoring.example.org/api/itineraries/7/partners-in-play/responses"
        );
        assert_eq!(
            source.responses_url(Instrument::SchoolOutput, 7),
            "https://monitoring.example.org/api/itineraries/7/school-output/responses"
        );
    }

    #[test]
    fn decodes_partial_response_records() {
        let body = r#"[
            {
                "id": "6f1b0b5e-8d3a-4c61-9f0e-3c2f1a7d9b10",
                "school_id": 4,
                "answers": [
                    { "question_id": 12, "answer_value": "Yes" },
                    { "question_id": 13, "upload_file_path": "plans/4.pdf", "extra": true }
                ]
            }
        ]"#;

        let records: Vec<ResponseRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].school_id, Some(4));
        assert_eq!(records[0].teacher_id, None);
        assert_eq!(records[0].answers[1].answer_value, None);
        assert_eq!(
            records[0].answers[1].upload_file_path.as_deref(),
            Some("plans/4.pdf")
        );
    }

    #[test]
    fn decodes_integer_and_missing_ids() {
        let body = r#"[
            { "id": 17, "school_id": 4, "answers": [{ "question_id": 12, "answer_value": "yes" }] },
            { "school_id": 5, "answers": [] },
            { "id": null, "school_id": 6 },
            { "id": 2.5, "school_id": 7 }
        ]"#;

        let records: Vec<ResponseRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].id, Some(SubmissionId::Number(17)));
        assert_eq!(records[0].answers.len(), 1);
        assert_eq!(records[1].id, None);
        assert_eq!(records[2].id, None);
        assert_eq!(records[3].id, None);
        assert_eq!(records[3].school_id, Some(7));
    }

    #[test]
    fn keeps_string_ids_verbatim() {
        let body = r#"[{ "id": "6f1b0b5e-8d3a-4c61-9f0e-3c2f1a7d9b10" }, { "id": "sub-88" }]"#;

        let records: Vec<ResponseRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(
            records[0].id,
            Some(SubmissionId::Text("6f1b0b5e-8d3a-4c61-9f0e-3c2f1a7d9b10".to_string()))
        );
        assert_eq!(records[1].id.as_ref().map(ToString::to_string).as_deref(), Some("sub-88"));
    }
}
