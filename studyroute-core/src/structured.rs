//! Structured output validation
//!
//! Model output is expected to be a single JSON document, optionally wrapped
//! in a markdown code fence. [`parse_structured`] strips the fence, parses
//! the document into the expected type and runs the type's semantic checks.
//! On failure the returned [`SchemaViolation`] carries a repair prompt that
//! can be sent back to the model as-is.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::fmt;

/// Payload type a routed call can be validated into
///
/// Structural rules (required fields, types, unknown fields) come from the
/// serde derive; [`StructuredOutput::validate`] adds the semantic ones.
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send + 'static {
    /// Semantic checks run after successful deserialization
    fn validate(&self) -> Result<(), Vec<String>> {
        Ok(())
    }
}

/// Output that failed validation against its expected schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Human-readable diagnostics, one per line
    pub diagnostics: String,
    /// The model output exactly as received
    pub invalid_output: String,
    /// Ready-to-send prompt asking the model to correct its output
    pub repair_prompt: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LLM output failed schema validation: {}", self.diagnostics)
    }
}

impl std::error::Error for SchemaViolation {}

impl SchemaViolation {
    /// Build a violation for `T` with its repair prompt
    pub fn new<T: StructuredOutput>(
        invalid_output: impl Into<String>,
        diagnostics: impl Into<String>,
    ) -> Self {
        let invalid_output = invalid_output.into();
        let diagnostics = diagnostics.into();
        let repair_prompt = build_repair_prompt::<T>(&invalid_output, &diagnostics);
        Self {
            diagnostics,
            invalid_output,
            repair_prompt,
        }
    }
}

/// Remove a surrounding ```` ``` ```` or ```` ```json ```` fence
///
/// Text that is not a complete fence of at least three lines is returned
/// trimmed but otherwise unchanged.
pub fn strip_markdown_fence(value: &str) -> &str {
    let stripped = value.trim();
    if !stripped.starts_with("```") {
        return stripped;
    }

    let lines: Vec<&str> = stripped.lines().collect();
    if lines.len() < 3 {
        return stripped;
    }

    let first_line = lines[0].trim().to_lowercase();
    let last_line = lines[lines.len() - 1].trim();
    if last_line != "```" {
        return stripped;
    }
    if first_line != "```" && !first_line.starts_with("```json") {
        return stripped;
    }

    // Inner text runs from the end of the first line to the start of the last
    let start = stripped.find('\n').map(|i| i + 1).unwrap_or(stripped.len());
    let end = stripped.rfind('\n').unwrap_or(start);
    if end <= start {
        return "";
    }
    stripped[start..end].trim()
}

/// Parse and validate model output into `T`
pub fn parse_structured<T: StructuredOutput>(output_text: &str) -> Result<T, SchemaViolation> {
    let normalized = strip_markdown_fence(output_text);

    let parsed: T = serde_json::from_str(normalized)
        .map_err(|e| SchemaViolation::new::<T>(output_text, e.to_string()))?;

    parsed
        .validate()
        .map_err(|errors| SchemaViolation::new::<T>(output_text, errors.join("\n")))?;

    Ok(parsed)
}

/// Pretty-printed JSON schema of `T`
pub fn schema_json<T: JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

/// Prompt asking the model to correct `invalid_output` so it matches `T`
pub fn build_repair_prompt<T: JsonSchema>(invalid_output: &str, diagnostics: &str) -> String {
    format!(
        "Fix the response so that it strictly matches the JSON schema.\n\
         Return only valid JSON with no explanations.\n\n\
         JSON schema:\n{}\n\n\
         Validation errors:\n{}\n\n\
         Original invalid output:\n{}",
        schema_json::<T>(),
        diagnostics,
        invalid_output
    )
}
