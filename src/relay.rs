//! The conversion relay: one inbound CSS snippet, one upstream call, one
//! validated `{output, analysis}` pair back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::upstream::{GenerateContentResponse, Upstream, UpstreamPayload, upstream_error_message};

/// What a successful conversion returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub output: String,
    pub analysis: String,
}

/// Wires a [`RelayConfig`] to an [`Upstream`]. Holds no per-call state, so
/// one instance serves every request concurrently.
pub struct ConversionRelay {
    config: RelayConfig,
    upstream: Arc<dyn Upstream>,
}

impl ConversionRelay {
    pub fn new(config: RelayConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self { config, upstream }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        self.upstream.model()
    }

    /// Convert CSS into Tailwind classes.
    ///
    /// Fails before any network activity when the API key is missing
    /// ([`RelayError::Configuration`]) or the CSS is absent or blank
    /// ([`RelayError::Validation`]). Makes exactly one upstream call otherwise.
    pub async fn convert(&self, css_code: Option<&str>) -> Result<ConversionResult, RelayError> {
        let api_key = self.config.api_key().ok_or(RelayError::Configuration)?;

        let css = css_code
            .filter(|css| !css.trim().is_empty())
            .ok_or_else(|| RelayError::validation("cssCode is required"))?;

        info!(bytes = css.len(), model = self.upstream.model(), "converting css");

        let payload = UpstreamPayload::new(css, self.config.system_instruction());
        let reply = self
            .upstream
            .send(api_key, &payload)
            .await
            .map_err(RelayError::UpstreamTransport)?;

        if !reply.is_success() {
            warn!(status = reply.status, body = %reply.body, "upstream returned an error");
            return Err(RelayError::UpstreamApi {
                status: reply.status,
                message: upstream_error_message(&reply.body),
            });
        }

        let text = extract_text(&reply.body)?;
        parse_conversion(&text)
    }
}

/// Decode a 2xx reply and take the first candidate's first text part.
fn extract_text(body: &str) -> Result<String, RelayError> {
    let response: GenerateContentResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, body = %body, "undecodable upstream reply");
            return Err(RelayError::EmptyResponse);
        }
    };

    if let Some(usage) = response.usage_metadata {
        debug!(
            input = usage.prompt_token_count,
            output = usage.candidates_token_count,
            total = usage.total(),
            "token usage"
        );
    }

    match response.first_text() {
        Some(text) => Ok(text.to_string()),
        None => {
            error!(
                reason = response.stop_reason().unwrap_or("unknown"),
                "upstream reply has no text"
            );
            Err(RelayError::EmptyResponse)
        }
    }
}

/// Parse the model's text into a [`ConversionResult`].
///
/// Strict: both `output` and `analysis` must be present and be strings.
/// Extra keys are ignored, empty strings are accepted.
pub fn parse_conversion(text: &str) -> Result<ConversionResult, RelayError> {
    let json_str = extract_json(text);

    let value: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
        error!(error = %e, raw = %text, "model output is not valid JSON");
        RelayError::MalformedOutput {
            reason: e.to_string(),
        }
    })?;

    let Some(object) = value.as_object() else {
        error!(raw = %text, "model output is not a JSON object");
        return Err(RelayError::MalformedOutput {
            reason: "expected a JSON object".to_string(),
        });
    };

    let field = |name: &str| -> Result<String, RelayError> {
        object
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                error!(field = name, raw = %text, "model output lacks a required field");
                RelayError::MalformedOutput {
                    reason: format!("missing string field `{}`", name),
                }
            })
    };

    Ok(ConversionResult {
        output: field("output")?,
        analysis: field("analysis")?,
    })
}

/// Gemini sometimes wraps structured output in a single markdown fence
/// (```` ```json ````, ```` ```JSON ```` or a bare ```` ``` ````). Peel one fence
/// off, tag included; anything unfenced comes back trimmed.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    // The info string runs up to the first newline, if it is a bare word
    match inner.split_once('\n') {
        Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body.trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed_reason(result: Result<ConversionResult, RelayError>) -> String {
        match result {
            Err(RelayError::MalformedOutput { reason }) => reason,
            other => panic!("expected MalformedOutput, got {:?}", other),
        }
    }

    #[test]
    fn parse_well_formed() {
        let result =
            parse_conversion(r#"{"output": ".a: text-red-500", "analysis": "Converted color."}"#)
                .unwrap();
        assert_eq!(result.output, ".a: text-red-500");
        assert_eq!(result.analysis, "Converted color.");
    }

    #[test]
    fn parse_fenced_json() {
        let text = "```json\n{\"output\": \"x\", \"analysis\": \"y\"}\n```";
        let result = parse_conversion(text).unwrap();
        assert_eq!(result.output, "x");
    }

    #[test]
    fn parse_invalid_json_fails() {
        let reason = malformed_reason(parse_conversion("not-json{{{"));
        assert!(!reason.is_empty());
    }

    #[test]
    fn parse_missing_analysis_fails() {
        let reason = malformed_reason(parse_conversion(r#"{"output": "x"}"#));
        assert!(reason.contains("analysis"));
    }

    #[test]
    fn parse_missing_output_fails() {
        let reason = malformed_reason(parse_conversion(r#"{"analysis": "y"}"#));
        assert!(reason.contains("output"));
    }

    #[test]
    fn parse_non_string_field_fails() {
        let reason = malformed_reason(parse_conversion(r#"{"output": 42, "analysis": "y"}"#));
        assert!(reason.contains("output"));
    }

    #[test]
    fn parse_null_field_fails() {
        malformed_reason(parse_conversion(r#"{"output": "x", "analysis": null}"#));
    }

    #[test]
    fn parse_non_object_fails() {
        let reason = malformed_reason(parse_conversion(r#"["output", "analysis"]"#));
        assert!(reason.contains("object"));
    }

    #[test]
    fn parse_ignores_extra_keys() {
        let result =
            parse_conversion(r#"{"output": "x", "analysis": "y", "confidence": 0.9}"#).unwrap();
        assert_eq!(
            result,
            ConversionResult {
                output: "x".to_string(),
                analysis: "y".to_string(),
            }
        );
    }

    #[test]
    fn parse_accepts_empty_strings() {
        let result = parse_conversion(r#"{"output": "", "analysis": ""}"#).unwrap();
        assert!(result.output.is_empty());
        assert!(result.analysis.is_empty());
    }

    #[test]
    fn extract_text_from_reply() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "hello"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "hello");
    }

    #[test]
    fn extract_text_undecodable_reply() {
        assert!(matches!(
            extract_text("<html>oops</html>"),
            Err(RelayError::EmptyResponse)
        ));
    }

    #[test]
    fn extract_text_no_candidates() {
        assert!(matches!(
            extract_text(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#),
            Err(RelayError::EmptyResponse)
        ));
    }

    #[test]
    fn unfenced_model_output_is_only_trimmed() {
        let text = "\n  {\"output\": \".a: p-4\", \"analysis\": \"Padding.\"}\t";
        assert_eq!(
            extract_json(text),
            r#"{"output": ".a: p-4", "analysis": "Padding."}"#
        );
    }

    #[test]
    fn fence_tag_is_dropped_whatever_its_case() {
        for tag in ["json", "JSON", ""] {
            let text = format!("```{}\n{{\"output\": \"x\", \"analysis\": \"y\"}}\n```", tag);
            assert_eq!(
                extract_json(&text),
                r#"{"output": "x", "analysis": "y"}"#,
                "tag {:?}",
                tag
            );
        }
    }

    #[test]
    fn single_line_fence_is_unwrapped() {
        assert_eq!(extract_json("```{\"output\": \"x\"}```"), r#"{"output": "x"}"#);
    }

    #[test]
    fn unterminated_fence_stays_malformed() {
        let text = "```json\n{\"output\": \"x\", \"analysis\": \"y\"}";
        malformed_reason(parse_conversion(text));
    }

    #[test]
    fn huge_token_counts_do_not_panic_with_debug_logging() {
        let body = r#"{
            "candidates": [{"content": {"parts": [{"text": "hello"}]}}],
            "usageMetadata": {"promptTokenCount": 18446744073709551615, "candidatesTokenCount": 1}
        }"#;
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();

        let text = tracing::subscriber::with_default(subscriber, || extract_text(body));
        assert_eq!(text.unwrap(), "hello");
    }
}
