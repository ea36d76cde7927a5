use std::path::PathBuf;

use lookout_core::{LookoutError, ReviewComment, Severity};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "\
You are Lookout, an expert code reviewer for pull requests. Your job is to \
find genuine problems in code changes before they merge.

Rules:
- Only comment on issues you are confident about
- Reference line numbers from the new side of the diff
- Do not speculate about code behavior you cannot verify from the diff
- If unsure, do not comment
- Do not comment on style, formatting, or naming unless it creates a bug
- Focus on: bugs, security vulnerabilities, logic errors, performance \
problems, resource leaks

Respond with a JSON object:
{
  \"comments\": [
    {
      \"file\": \"path/to/file.rs\",
      \"line\": 42,
      \"severity\": \"bug\" | \"warning\" | \"suggestion\" | \"info\",
      \"message\": \"Clear explanation of the issue\",
      \"confidence\": 0-100,
      \"suggestion\": \"Optional fix suggestion\"
    }
  ]
}

If you find no issues, return: { \"comments\": [] }";

/// Build the system prompt for the review LLM.
///
/// # Examples
///
/// ```
/// use lookout_review::prompt::build_system_prompt;
///
/// let prompt = build_system_prompt();
/// assert!(prompt.contains("Lookout"));
/// assert!(prompt.contains("bugs"));
/// ```
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Build the user prompt containing the diff to review.
///
/// # Examples
///
/// ```
/// use lookout_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt("+new line", None);
/// assert!(prompt.contains("+new line"));
/// ```
pub fn build_review_prompt(diff: &str, file_context: Option<&str>) -> String {
    let mut prompt = format!("Review the following code changes:\n\n```diff\n{diff}\n```\n");
    if let Some(ctx) = file_context {
        prompt.push_str(&format!("\nAdditional context:\n{ctx}\n"));
    }
    prompt
}

#[derive(Deserialize)]
struct LlmResponse {
    comments: Vec<LlmComment>,
}

#[derive(Deserialize)]
struct LlmComment {
    file: String,
    line: Option<serde_json::Value>,
    severity: String,
    message: String,
    confidence: Option<serde_json::Value>,
    suggestion: Option<String>,
}

/// Parse the LLM JSON response into validated [`ReviewComment`] entries.
///
/// Handles markdown code fences around JSON. A response that is not the
/// expected JSON document is an error and fails the run; individually
/// invalid entries (missing line, unknown severity) inside a well-formed
/// document are skipped.
///
/// # Errors
///
/// Returns [`LookoutError::Llm`] if the response is not a well-formed
/// comments document.
///
/// # Examples
///
/// ```
/// use lookout_review::prompt::parse_review_response;
///
/// let json = r#"{"comments":[]}"#;
/// let comments = parse_review_response(json).unwrap();
/// assert!(comments.is_empty());
/// ```
pub fn parse_review_response(response: &str) -> Result<Vec<ReviewComment>, LookoutError> {
    let cleaned = strip_code_fences(response);

    let parsed: LlmResponse = serde_json::from_str(cleaned)
        .map_err(|e| LookoutError::Llm(format!("malformed review response: {e}")))?;

    let mut comments = Vec::new();
    for c in parsed.comments {
        let line = match &c.line {
            Some(serde_json::Value::Number(n)) => {
                let Some(l) = n.as_u64() else { continue };
                if l == 0 {
                    continue;
                }
                l as u32
            }
            _ => continue,
        };

        let severity = match c.severity.to_lowercase().as_str() {
            "bug" => Severity::Bug,
            "warning" => Severity::Warning,
            "suggestion" => Severity::Suggestion,
            "info" => Severity::Info,
            _ => continue,
        };

        let confidence = match &c.confidence {
            Some(serde_json::Value::Number(n)) => {
                let v = n.as_f64().unwrap_or(0.0);
                v.clamp(0.0, 100.0)
            }
            _ => 50.0,
        };

        comments.push(ReviewComment {
            file_path: PathBuf::from(&c.file),
            line,
            severity,
            message: c.message.clone(),
            confidence,
            suggestion: c.suggestion.clone(),
        });
    }

    Ok(comments)
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    trimmed
}
