//! Delegates field extraction to a language model and parses its JSON reply.

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm::generate_llm_response;
use crate::prompt::field_extraction_prompt;
use crate::schema::{Extraction, Field, MISSING};
use crate::{LLMParams, TARGET_EXTRACT};

#[derive(Clone, Debug)]
pub struct ModelExtractor {
    params: LLMParams,
}

impl ModelExtractor {
    pub fn new(params: LLMParams) -> Self {
        Self { params }
    }

    pub fn model(&self) -> &str {
        &self.params.model
    }

    /// Asks the model for the fields. Any failure drops the text; nothing is retried.
    pub async fn extract(&self, text: &str) -> Option<Extraction> {
        let prompt = field_extraction_prompt(text);
        let response = generate_llm_response(&prompt, &self.params).await?;

        match parse_model_response(&response) {
            Ok(Some(extraction)) => {
                info!(target: TARGET_EXTRACT, "Model extracted {} fields", extraction.len());
                Some(extraction)
            }
            Ok(None) => {
                debug!(target: TARGET_EXTRACT, "Model reported no fields");
                None
            }
            Err(e) => {
                warn!(
                    target: TARGET_EXTRACT,
                    "Failed to parse model response: {}. Raw content: {}",
                    e,
                    response.chars().take(500).collect::<String>()
                );
                None
            }
        }
    }
}

/// Parses the model's reply into an [`Extraction`].
///
/// The reply may be wrapped in a Markdown code fence or surrounded by prose;
/// only the outermost `{...}` is read. Keys outside the schema are dropped, and
/// `null`, empty or `"N/A"` values count as missing. `Ok(None)` means the
/// reply was valid but carried no fields.
pub fn parse_model_response(response: &str) -> Result<Option<Extraction>> {
    let start = response
        .find('{')
        .ok_or_else(|| anyhow!("No JSON object in response"))?;
    let end = response
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| anyhow!("Unterminated JSON object in response"))?;

    let json: Value = serde_json::from_str(&response[start..=end])
        .map_err(|e| anyhow!("Invalid JSON response: {}", e))?;
    let object = json
        .as_object()
        .ok_or_else(|| anyhow!("Response is not a JSON object"))?;

    let mut extraction = Extraction::new();
    for (key, value) in object {
        let Some(field) = Field::from_key(&key.trim().to_lowercase()) else {
            debug!(target: TARGET_EXTRACT, "Ignoring unknown key '{}' in model response", key);
            continue;
        };

        let value = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };

        if value.is_empty() || value.eq_ignore_ascii_case(MISSING) {
            continue;
        }
        extraction.insert_first(field, value);
    }

    Ok(if extraction.is_empty() {
        None
    } else {
        Some(extraction)
    })
}
