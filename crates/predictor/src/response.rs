//! Turning chat-completion content into a prediction line.

use contract_tag_eval::record::MAX_NAME_TAG_CHARS;
use contract_tag_eval::{Field, RecordLine};
use serde_json::{Map, Value};

use crate::error::PredictError;

/// Strips markdown code fences and a leading `json` language tag.
pub fn clean_content(content: &str) -> &str {
    let mut cleaned = content.trim();
    if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest.trim_end();
        cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned);
    }
    cleaned = cleaned.trim_start();
    cleaned.strip_prefix("json").unwrap_or(cleaned).trim()
}

/// Parses model output into a prediction for `address`.
///
/// Every descriptive field must be a non-empty string and the name tag must
/// fit the length limit; anything else rejects the whole answer.
pub fn parse_prediction(address: &str, content: &str) -> Result<RecordLine, PredictError> {
    let value: Value = serde_json::from_str(clean_content(content))?;
    let Value::Object(map) = value else {
        return Err(PredictError::InvalidPrediction(
            "expected a JSON object".into(),
        ));
    };

    let mut line = RecordLine::empty(address);
    for field in Field::DESCRIPTIVE {
        let text = required_text(&map, field)?;
        match field {
            Field::ProjectName => line.project_name = text,
            Field::PublicNameTag => {
                let chars = text.chars().count();
                if chars > MAX_NAME_TAG_CHARS {
                    return Err(PredictError::InvalidPrediction(format!(
                        "'{}' is {chars} characters, limit is {MAX_NAME_TAG_CHARS}",
                        field.json_key()
                    )));
                }
                line.public_name_tag = text;
            }
            Field::UiLink => line.ui_link = text,
            Field::PublicNote => line.public_note = text,
            Field::ContractAddress => {}
        }
    }
    Ok(line)
}

fn required_text(map: &Map<String, Value>, field: Field) -> Result<String, PredictError> {
    match map.get(field.json_key()) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(PredictError::InvalidPrediction(format!(
            "missing or empty '{}'",
            field.json_key()
        ))),
    }
}
