//! The end-to-end analysis run used by the `analyze-document` binary.
//!
//! Submits the configured document, polls until the job succeeds, and writes
//! progress lines followed by the indented result JSON to a writer.

use std::io::Write;

use form_recognizer_core::config::Settings;
use form_recognizer_core::error::FormRecognizerError;

use crate::document_analysis::{self, DocumentAnalysisRequest};
use crate::models::ResultDocument;
use crate::output::format_result;

/// The step a run was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading the settings file.
    LoadingSettings,
    /// Building and sending the submit request.
    Analyzing,
    /// Polling the job.
    Polling,
    /// Rendering the result document.
    Encoding,
    /// Writing progress or result text.
    Writing,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LoadingSettings => "loading .env file",
            Self::Analyzing => "analyzing document",
            Self::Polling => "getting analyze result",
            Self::Encoding => "encoding detailed results to JSON",
            Self::Writing => "writing output",
        };
        f.write_str(s)
    }
}

/// A failed run: the error plus the step it happened in.
#[derive(Debug)]
pub struct RunFailure {
    pub stage: Stage,
    pub error: FormRecognizerError,
}

impl RunFailure {
    pub fn new(stage: Stage, error: FormRecognizerError) -> Self {
        Self { stage, error }
    }

    /// Process exit code, taken from the error kind.
    pub fn exit_code(&self) -> u8 {
        self.error.exit_code()
    }
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn write_line<W: Write>(out: &mut W, line: std::fmt::Arguments<'_>) -> Result<(), RunFailure> {
    writeln!(out, "{line}").map_err(|e| RunFailure::new(Stage::Writing, e.into()))
}

/// Run one analysis with `settings`, writing progress and the result to `out`.
///
/// Returns the final result document on success.
pub async fn run<W: Write>(settings: &Settings, out: &mut W) -> Result<ResultDocument, RunFailure> {
    write_line(out, format_args!("Sending POST request to analyze document..."))?;

    let client = settings
        .client()
        .map_err(|e| RunFailure::new(Stage::Analyzing, e))?;
    let request = DocumentAnalysisRequest::from_settings(settings);

    let operation = document_analysis::analyze(&client, &request)
        .await
        .map_err(|e| RunFailure::new(Stage::Analyzing, e))?;

    write_line(out, format_args!("Result ID: {}", operation.operation_location))?;
    write_line(out, format_args!("Checking for results..."))?;

    let document = document_analysis::poll_until_complete_with_progress(
        &client,
        &operation.operation_location,
        &settings.poll_policy,
        |_, document| {
            writeln!(out, "Status: {}", document.raw_status())?;
            Ok(())
        },
    )
    .await
    .map_err(|e| match e {
        FormRecognizerError::Output(_) => RunFailure::new(Stage::Writing, e),
        other => RunFailure::new(Stage::Polling, other),
    })?;

    write_line(out, format_args!("Analysis completed successfully. Detailed Results:"))?;

    let json = format_result(&document).map_err(|e| RunFailure::new(Stage::Encoding, e))?;
    write_line(out, format_args!("{json}"))?;

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_names_stage() {
        let failure = RunFailure::new(
            Stage::Analyzing,
            FormRecognizerError::unexpected_status(400, "bad request"),
        );
        assert_eq!(
            failure.to_string(),
            "Error analyzing document: unexpected status code: 400, response body: bad request"
        );
        assert_eq!(failure.exit_code(), 6);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::LoadingSettings.to_string(), "loading .env file");
        assert_eq!(Stage::Polling.to_string(), "getting analyze result");
        assert_eq!(Stage::Encoding.to_string(), "encoding detailed results to JSON");
    }
}
