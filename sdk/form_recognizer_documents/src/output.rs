//! Text rendering of result documents.

use form_recognizer_core::error::{FormRecognizerError, FormRecognizerResult};

use crate::models::ResultDocument;

/// Render a result document as indented JSON (two spaces per level, keys sorted).
pub fn format_result(document: &ResultDocument) -> FormRecognizerResult<String> {
    serde_json::to_string_pretty(document.fields()).map_err(FormRecognizerError::Encode)
}
