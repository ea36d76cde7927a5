use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LookoutError;
use crate::types::Severity;

/// Top-level configuration loaded from `.lookout.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
/// Credentials are never read from the file, only from the environment.
///
/// # Examples
///
/// ```
/// use lookout_core::LookoutConfig;
///
/// let config = LookoutConfig::default();
/// assert_eq!(config.review.max_comments, 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookoutConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl LookoutConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Io`] if the file cannot be read, or
    /// [`LookoutError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lookout_core::LookoutConfig;
    /// use std::path::Path;
    ///
    /// let config = LookoutConfig::from_file(Path::new(".lookout.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, LookoutError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_core::LookoutConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// max_comments = 3
    /// "#;
    /// let config = LookoutConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.max_comments, 3);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, LookoutError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// LLM provider configuration for the Anthropic Messages API.
///
/// # Examples
///
/// ```
/// use lookout_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "claude-sonnet-4-20250514");
/// assert_eq!(config.max_output_tokens, 4096);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key; normally supplied via `ANTHROPIC_API_KEY`.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Maximum tokens the model may generate per request (default: 4096).
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}

fn default_max_output_tokens() -> u32 {
    4096
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

/// Review behavior configuration.
///
/// # Examples
///
/// ```
/// use lookout_core::ReviewConfig;
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.min_confidence, 80.0);
/// assert_eq!(config.max_comments, 10);
/// assert_eq!(config.max_diff_tokens, 4000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Maximum number of comments per review (default: 10).
    #[serde(default = "default_max_comments")]
    pub max_comments: usize,
    /// Minimum LLM confidence to include a comment (default: 80.0).
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Only show comments at these severity levels.
    #[serde(default = "default_severity_filter")]
    pub severity_filter: Vec<Severity>,
    /// Additional glob patterns to skip before sending to LLM.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    /// Additional file extensions to skip before sending to LLM.
    #[serde(default)]
    pub skip_extensions: Vec<String>,
    /// Token threshold for splitting the diff into per-file LLM calls (default: 4000).
    #[serde(default = "default_max_diff_tokens")]
    pub max_diff_tokens: usize,
    /// Include suggestion-level comments (default: false).
    #[serde(default)]
    pub include_suggestions: bool,
}

fn default_max_comments() -> usize {
    10
}

fn default_min_confidence() -> f64 {
    80.0
}

fn default_severity_filter() -> Vec<Severity> {
    vec![Severity::Bug, Severity::Warning]
}

fn default_max_diff_tokens() -> usize {
    4000
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_comments: default_max_comments(),
            min_confidence: default_min_confidence(),
            severity_filter: default_severity_filter(),
            skip_patterns: Vec::new(),
            skip_extensions: Vec::new(),
            max_diff_tokens: default_max_diff_tokens(),
            include_suggestions: false,
        }
    }
}

/// The pull-request context a CI invocation runs against.
///
/// Built once per run from the workflow environment, consumed exactly once,
/// never persisted. The triggering event guarantees the PR is open and
/// synchronized, so the context is not re-validated against the API.
///
/// # Examples
///
/// ```
/// use lookout_core::CiContext;
///
/// let ctx = CiContext::resolve(
///     Some("octocat".into()),
///     Some("hello-world".into()),
///     Some("42".into()),
///     None,
/// )
/// .unwrap();
/// assert_eq!(ctx.pr_number, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiContext {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub pr_number: u64,
    /// Head commit SHA, when the workflow provides one.
    pub head_sha: Option<String>,
}

impl CiContext {
    /// Build the context from the workflow environment.
    ///
    /// Reads `REPO_OWNER`, `REPO_NAME`, `PR_NUMBER`, and `GITHUB_SHA`.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Config`] if a required variable is missing,
    /// empty, or malformed.
    pub fn from_env() -> Result<Self, LookoutError> {
        Self::resolve(
            std::env::var("REPO_OWNER").ok(),
            std::env::var("REPO_NAME").ok(),
            std::env::var("PR_NUMBER").ok(),
            std::env::var("GITHUB_SHA").ok(),
        )
    }

    /// Resolve the context from captured variable values.
    ///
    /// Empty or whitespace-only values count as missing. When `REPO_OWNER`
    /// is absent, an `owner/name` value in `REPO_NAME` is split instead —
    /// workflows commonly export `github.repository` as a single value.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Config`] naming the variable that is missing
    /// or malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_core::CiContext;
    ///
    /// let ctx = CiContext::resolve(None, Some("octocat/hello".into()), Some("7".into()), None)
    ///     .unwrap();
    /// assert_eq!(ctx.owner, "octocat");
    /// assert_eq!(ctx.repo, "hello");
    /// ```
    pub fn resolve(
        owner: Option<String>,
        repo: Option<String>,
        pr_number: Option<String>,
        head_sha: Option<String>,
    ) -> Result<Self, LookoutError> {
        let owner = non_empty(owner);
        let repo = non_empty(repo);
        let pr_number = non_empty(pr_number)
            .ok_or_else(|| LookoutError::Config("PR_NUMBER not set".into()))?;

        let (owner, repo) = match (owner, repo) {
            (Some(o), Some(r)) => (o, r),
            (None, Some(r)) => match r.split_once('/') {
                Some((o, r)) if !o.is_empty() && !r.is_empty() => (o.to_string(), r.to_string()),
                _ => {
                    return Err(LookoutError::Config(
                        "REPO_OWNER not set and REPO_NAME is not owner/name".into(),
                    ))
                }
            },
            (_, None) => return Err(LookoutError::Config("REPO_NAME not set".into())),
        };

        let pr_number: u64 = pr_number
            .parse()
            .map_err(|_| LookoutError::Config(format!("invalid PR_NUMBER: {pr_number}")))?;

        Ok(Self {
            owner,
            repo,
            pr_number,
            head_sha: non_empty(head_sha),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = LookoutConfig::default();
        assert_eq!(config.review.max_comments, 10);
        assert_eq!(config.review.min_confidence, 80.0);
        assert_eq!(config.review.max_diff_tokens, 4000);
        assert!(!config.review.include_suggestions);
        assert!(config.review.skip_patterns.is_empty());
        assert!(config.review.skip_extensions.is_empty());
        assert_eq!(config.llm.model, "claude-sonnet-4-20250514");
        assert_eq!(config.llm.max_output_tokens, 4096);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[review]
max_comments = 3
min_confidence = 95.0
"#;
        let config = LookoutConfig::from_toml(toml).unwrap();
        assert_eq!(config.review.max_comments, 3);
        assert_eq!(config.review.min_confidence, 95.0);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[llm]
model = "claude-opus-4-20250514"
base_url = "https://api.anthropic.com"
max_output_tokens = 2048

[review]
max_comments = 3
min_confidence = 95.0
severity_filter = ["bug"]
skip_patterns = ["*.test.ts", "fixtures/**"]
skip_extensions = ["snap", "lock"]
max_diff_tokens = 8000
include_suggestions = true
"#;
        let config = LookoutConfig::from_toml(toml).unwrap();
        assert_eq!(config.llm.model, "claude-opus-4-20250514");
        assert_eq!(config.llm.max_output_tokens, 2048);
        assert_eq!(config.review.max_comments, 3);
        assert_eq!(config.review.severity_filter, vec![Severity::Bug]);
        assert_eq!(
            config.review.skip_patterns,
            vec!["*.test.ts", "fixtures/**"]
        );
        assert_eq!(config.review.skip_extensions, vec!["snap", "lock"]);
        assert_eq!(config.review.max_diff_tokens, 8000);
        assert!(config.review.include_suggestions);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = LookoutConfig::from_toml("").unwrap();
        assert_eq!(config.review.max_comments, 10);
        assert_eq!(config.llm.model, "claude-sonnet-4-20250514");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = LookoutConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn ci_context_resolves_all_fields() {
        let ctx = CiContext::resolve(
            Some("octocat".into()),
            Some("hello-world".into()),
            Some("42".into()),
            Some("abc123".into()),
        )
        .unwrap();
        assert_eq!(ctx.owner, "octocat");
        assert_eq!(ctx.repo, "hello-world");
        assert_eq!(ctx.pr_number, 42);
        assert_eq!(ctx.head_sha.as_deref(), Some("abc123"));
    }

    #[test]
    fn ci_context_splits_combined_repo_name() {
        let ctx =
            CiContext::resolve(None, Some("octocat/hello".into()), Some("7".into()), None).unwrap();
        assert_eq!(ctx.owner, "octocat");
        assert_eq!(ctx.repo, "hello");
    }

    #[test]
    fn ci_context_missing_pr_number() {
        let err =
            CiContext::resolve(Some("o".into()), Some("r".into()), None, None).unwrap_err();
        assert!(err.to_string().contains("PR_NUMBER"));
    }

    #[test]
    fn ci_context_empty_values_count_as_missing() {
        let err = CiContext::resolve(
            Some("o".into()),
            Some("r".into()),
            Some("   ".into()),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("PR_NUMBER"));
    }

    #[test]
    fn ci_context_invalid_pr_number() {
        let err = CiContext::resolve(
            Some("o".into()),
            Some("r".into()),
            Some("abc".into()),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid PR_NUMBER"));
    }

    #[test]
    fn ci_context_missing_repo_name() {
        let err = CiContext::resolve(Some("o".into()), None, Some("1".into()), None).unwrap_err();
        assert!(err.to_string().contains("REPO_NAME"));
    }

    #[test]
    fn ci_context_bare_repo_without_owner() {
        let err = CiContext::resolve(None, Some("hello".into()), Some("1".into()), None)
            .unwrap_err();
        assert!(err.to_string().contains("REPO_OWNER"));
    }
}
