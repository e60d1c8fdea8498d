//! Answer coercion and categorical score scales.
//!
//! Survey submissions are frequently incomplete, so every helper here degrades
//! to zero or `false` instead of failing.

use crate::models::Answer;

/// Observation frequency labels used by the tone and effort questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyLabel {
    Frequently,
    Sometimes,
    OnlyBoys,
    OnlyGirls,
    NotAtAll,
}

impl FrequencyLabel {
    /// Case-insensitive, whitespace-trimmed match. Unrecognized labels yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "frequently" => Some(FrequencyLabel::Frequently),
            "sometimes" => Some(FrequencyLabel::Sometimes),
            "only boys" => Some(FrequencyLabel::OnlyBoys),
            "only girls" => Some(FrequencyLabel::OnlyGirls),
            "not at all" => Some(FrequencyLabel::NotAtAll),
            _ => None,
        }
    }

    pub fn score(self) -> u8 {
        match self {
            FrequencyLabel::Frequently => 5,
            FrequencyLabel::Sometimes => 4,
            FrequencyLabel::OnlyBoys | FrequencyLabel::OnlyGirls => 3,
            FrequencyLabel::NotAtAll => 0,
        }
    }
}

/// Categorical scales applied to learning-environment observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMapper {
    Tone,
    Effort,
}

impl ScoreMapper {
    pub fn score(self, raw: &str) -> u8 {
        match self {
            ScoreMapper::Tone | ScoreMapper::Effort => {
                FrequencyLabel::parse(raw).map_or(0, FrequencyLabel::score)
            }
        }
    }

    pub fn score_answer(self, answer: Option<&Answer>) -> u8 {
        answer
            .and_then(|answer| answer.answer_value.as_deref())
            .map_or(0, |raw| self.score(raw))
    }
}

/// Rounds to 2 decimals. Values too large to scale are already whole and come
/// back unchanged; non-finite input becomes `0`.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}

/// `matched / total` as a rounded percentage, `0` for an empty denominator.
pub fn percentage(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(matched as f64 / total as f64 * 100.0)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let count = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        sum / count
    } else {
        values.iter().map(|value| value / count).sum()
    }
}

/// Parses the leading decimal number of `raw`, ignoring trailing text
/// (`"3.5 points"` is `3.5`). Returns `None` when no digits lead the value.
pub fn lenient_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    trimmed[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parses the leading integer of `raw` (`"10.7"` is `10`).
pub fn lenient_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }

    trimmed[..end].parse::<i64>().ok()
}

/// Numeric value of an answer: the stored score, else the parsed answer value, else `0`.
pub fn answer_number(answer: Option<&Answer>) -> f64 {
    let Some(answer) = answer else {
        return 0.0;
    };

    answer
        .score
        .filter(|score| score.is_finite())
        .or_else(|| answer.answer_value.as_deref().and_then(lenient_float))
        .unwrap_or(0.0)
}

pub fn answer_int(answer: Option<&Answer>) -> i64 {
    answer
        .and_then(|answer| answer.answer_value.as_deref())
        .and_then(lenient_int)
        .unwrap_or(0)
}

pub fn is_yes(answer: Option<&Answer>) -> bool {
    answer
        .and_then(|answer| answer.answer_value.as_deref())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("yes"))
}

pub fn has_upload(answer: Option<&Answer>) -> bool {
    answer
        .and_then(|answer| answer.upload_file_path.as_deref())
        .is_some_and(|path| !path.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(value: Option<&str>, score: Option<f64>) -> Answer {
        Answer {
            question_id: 1,
            answer_value: value.map(str::to_string),
            score,
            upload_file_path: None,
        }
    }

    #[test]
    fn frequency_labels_follow_scale() {
        assert_eq!(ScoreMapper::Tone.score("Frequently"), 5);
        assert_eq!(ScoreMapper::Tone.score("  sometimes "), 4);
        assert_eq!(ScoreMapper::Effort.score("Only Boys"), 3);
        assert_eq!(ScoreMapper::Effort.score("only girls"), 3);
        assert_eq!(ScoreMapper::Effort.score("NOT AT ALL"), 0);
    }

    #[test]
    fn unknown_labels_are_distinguishable_and_score_zero() {
        assert_eq!(FrequencyLabel::parse("often"), None);
        assert_eq!(FrequencyLabel::parse("not at all"), Some(FrequencyLabel::NotAtAll));
        assert_eq!(ScoreMapper::Tone.score("often"), 0);
        assert_eq!(ScoreMapper::Tone.score_answer(None), 0);
    }

    #[test]
    fn lenient_float_reads_leading_number() {
        assert_eq!(lenient_float("5"), Some(5.0));
        assert_eq!(lenient_float(" 3.5 points"), Some(3.5));
        assert_eq!(lenient_float("-.5"), Some(-0.5));
        assert_eq!(lenient_float("2e1x"), Some(20.0));
        assert_eq!(lenient_float("4e"), Some(4.0));
        assert_eq!(lenient_float("abc"), None);
        assert_eq!(lenient_float("."), None);
        assert_eq!(lenient_float(""), None);
    }

    #[test]
    fn lenient_int_truncates_at_first_non_digit() {
        assert_eq!(lenient_int("12"), Some(12));
        assert_eq!(lenient_int("10.7"), Some(10));
        assert_eq!(lenient_int(" 8 pupils"), Some(8));
        assert_eq!(lenient_int("-3"), Some(-3));
        assert_eq!(lenient_int("n/a"), None);
    }

    #[test]
    fn answer_number_prefers_stored_score() {
        assert_eq!(answer_number(Some(&answer(Some("2"), Some(4.0)))), 4.0);
        assert_eq!(answer_number(Some(&answer(Some("2.5"), None))), 2.5);
        assert_eq!(answer_number(Some(&answer(Some("none"), None))), 0.0);
        assert_eq!(answer_number(None), 0.0);
    }

    #[test]
    fn percentage_handles_empty_denominator() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 4), 75.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
    }

    #[test]
    fn round2_stays_finite() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(-1.236), -1.24);
        assert_eq!(round2(1e308), 1e308);
        assert_eq!(round2(f64::MAX), f64::MAX);
        assert_eq!(round2(f64::INFINITY), 0.0);
        assert_eq!(round2(f64::NAN), 0.0);
    }

    #[test]
    fn mean_avoids_overflowing_sum() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 4.5]), 2.5);

        let huge = mean(&[f64::MAX, f64::MAX]);
        assert!(huge.is_finite());
        assert_eq!(huge, f64::MAX);
    }

    #[test]
    fn yes_and_upload_predicates() {
        assert!(is_yes(Some(&answer(Some("YES"), None))));
        assert!(is_yes(Some(&answer(Some(" yes "), None))));
        assert!(!is_yes(Some(&answer(Some("No"), None))));
        assert!(!is_yes(Some(&answer(None, None))));
        assert!(!is_yes(None));

        let mut uploaded = answer(None, None);
        uploaded.upload_file_path = Some("plans/school-4.pdf".to_string());
        assert!(has_upload(Some(&uploaded)));
        uploaded.upload_file_path = Some("   ".to_string());
        assert!(!has_upload(Some(&uploaded)));
        assert!(!has_upload(None));
    }
}
