//! Parsing model output into typed values.

use super::{CompletionRequest, LanguageModel};
use crate::error::{Result, StudyflowError};
use serde::de::DeserializeOwned;

/// Run a completion and parse the response into `T`.
///
/// Fails with [`StudyflowError::SchemaParse`] when the response does not match `T`.
pub async fn complete_structured<T: DeserializeOwned>(
    llm: &dyn LanguageModel,
    request: &CompletionRequest,
) -> Result<T> {
    let raw = llm.complete(request).await?;
    parse_structured(&raw)
}

/// Parse a model response into `T`, tolerating markdown fences and surrounding prose.
pub fn parse_structured<T: DeserializeOwned>(response: &str) -> Result<T> {
    let json_str = extract_json(response);

    serde_json::from_str(json_str).map_err(|e| {
        StudyflowError::SchemaParse(format!(
            "{}. Response was: {}",
            e,
            response.chars().take(300).collect::<String>()
        ))
    })
}

/// Extract the outermost JSON object or array from a response.
///
/// Returns the input unchanged when no balanced delimiters are found.
pub fn extract_json(response: &str) -> &str {
    let object = response.find('{').zip(response.rfind('}'));
    let array = response.find('[').zip(response.rfind(']'));

    let span = match (object, array) {
        (Some(o), Some(a)) => {
            if a.0 < o.0 {
                Some(a)
            } else {
                Some(o)
            }
        }
        (Some(o), None) => Some(o),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    };

    match span {
        Some((start, end)) if end > start => &response[start..=end],
        _ => response,
    }
}
