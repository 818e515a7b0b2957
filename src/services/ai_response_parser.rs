//! Extraction of a structured analysis from free-form AI output.
//!
//! Model output is untrusted text that is *expected* to contain a JSON
//! object. Parsing runs in two tiers: the trimmed text as-is, then a
//! regex-repaired candidate (code fences stripped, outermost object
//! extracted, smart quotes and trailing commas fixed). The template
//! fallback lives in the composer, not here.

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::StructuredAnalysis;

const MESSAGE_KEYS: [&str; 4] = ["message", "body", "pesan", "analysis"];
const TITLE_KEYS: [&str; 2] = ["title", "judul"];
const RECOMMENDATION_KEYS: [&str; 3] = ["recommendation", "rekomendasi", "saran"];

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("AI response is empty")]
    Empty,
    #[error("no JSON object found in AI response")]
    NoJsonObject,
    #[error("invalid JSON in AI response: {0}")]
    InvalidJson(String),
    #[error("AI response is missing field '{0}'")]
    MissingField(&'static str),
}

pub fn parse_ai_response(text: &str) -> Result<StructuredAnalysis, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(trimmed) {
        return from_object(&object);
    }

    let candidate = repair(trimmed).ok_or(ParseError::NoJsonObject)?;
    match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Object(object)) => from_object(&object),
        Ok(_) => Err(ParseError::NoJsonObject),
        Err(e) => Err(ParseError::InvalidJson(e.to_string())),
    }
}

/// Best-effort cleanup of a JSON object embedded in prose.
fn repair(text: &str) -> Option<String> {
    let fence = Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").ok()?;
    let unfenced = fence
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let object = Regex::new(r"(?s)\{.*\}").ok()?;
    let span = object.find(unfenced)?.as_str();

    let normalized = span
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    let trailing_comma = Regex::new(r",(\s*[}\]])").ok()?;
    Some(trailing_comma.replace_all(&normalized, "$1").into_owned())
}

fn first_string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn from_object(object: &Map<String, Value>) -> Result<StructuredAnalysis, ParseError> {
    let message = first_string(object, &MESSAGE_KEYS).ok_or(ParseError::MissingField("message"))?;

    Ok(StructuredAnalysis {
        title: first_string(object, &TITLE_KEYS),
        message,
        recommendation: first_string(object, &RECOMMENDATION_KEYS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let parsed = parse_ai_response(
            r#"{"title": "Cabai naik", "message": "Minat naik 12.5%", "recommendation": "Tambah stok"}"#,
        )
        .unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Cabai naik"));
        assert_eq!(parsed.message, "Minat naik 12.5%");
        assert_eq!(parsed.recommendation.as_deref(), Some("Tambah stok"));
    }

    #[test]
    fn test_json_inside_code_fence_and_prose() {
        let text = "Berikut analisisnya:\n```json\n{\"message\": \"Harga beras turun\", \"saran\": \"Tunda pembelian\",}\n```\nSemoga membantu!";
        let parsed = parse_ai_response(text).unwrap();
        assert_eq!(parsed.message, "Harga beras turun");
        assert_eq!(parsed.recommendation.as_deref(), Some("Tunda pembelian"));
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_smart_quotes_are_repaired() {
        let text = "Analisis: {\u{201C}pesan\u{201D}: \u{201C}Telur stabil\u{201D}}";
        assert_eq!(parse_ai_response(text).unwrap().message, "Telur stabil");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_ai_response("   \n"), Err(ParseError::Empty));
    }

    #[test]
    fn test_no_object() {
        assert_eq!(
            parse_ai_response("Maaf, saya tidak bisa membantu."),
            Err(ParseError::NoJsonObject)
        );
    }

    #[test]
    fn test_broken_json() {
        assert!(matches!(
            parse_ai_response("hasil: {message: tanpa kutip}"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_missing_message() {
        assert_eq!(
            parse_ai_response(r#"{"title": "Hanya judul"}"#),
            Err(ParseError::MissingField("message"))
        );
        assert_eq!(
            parse_ai_response(r#"{"message": "   "}"#),
            Err(ParseError::MissingField("message"))
        );
    }

    #[test]
    fn test_top_level_array_is_not_an_object() {
        assert_eq!(parse_ai_response("[1, 2, 3]"), Err(ParseError::NoJsonObject));
    }
}
