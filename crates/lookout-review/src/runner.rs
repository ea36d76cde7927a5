use std::fmt;
use std::path::PathBuf;

use lookout_core::{LookoutError, ReviewComment, ReviewConfig, Severity};
use lookout_diff::filter::DiffFilter;
use lookout_diff::parser::FileDiff;
use serde::Serialize;

use crate::llm::AnthropicClient;
use crate::prompt;

/// Result of a completed review run.
///
/// # Examples
///
/// ```
/// use lookout_review::runner::{ReviewResult, ReviewStats};
///
/// let result = ReviewResult {
///     comments: vec![],
///     stats: ReviewStats {
///         files_reviewed: 0,
///         files_skipped: 0,
///         skipped_files: vec![],
///         total_hunks: 0,
///         llm_calls: 0,
///         comments_generated: 0,
///         comments_filtered: 0,
///         input_tokens: None,
///         output_tokens: None,
///         model_used: "claude-sonnet-4-20250514".into(),
///     },
/// };
/// assert!(result.comments.is_empty());
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    /// Filtered and sorted review comments.
    pub comments: Vec<ReviewComment>,
    /// Statistics about the review run.
    pub stats: ReviewStats,
}

/// Statistics about a review run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    /// Number of files sent for review.
    pub files_reviewed: usize,
    /// Number of files the pre-LLM filter removed.
    pub files_skipped: usize,
    /// The skipped files with their reasons.
    pub skipped_files: Vec<SkippedEntry>,
    /// Total number of diff hunks sent.
    pub total_hunks: usize,
    /// Number of LLM requests made.
    pub llm_calls: usize,
    /// Raw comments from the LLM before filtering.
    pub comments_generated: usize,
    /// Comments removed by confidence/severity filters.
    pub comments_filtered: usize,
    /// Tokens consumed across all LLM calls, when the API reports them.
    pub input_tokens: Option<u64>,
    /// Tokens generated across all LLM calls, when the API reports them.
    pub output_tokens: Option<u64>,
    /// Model identifier used for the review.
    pub model_used: String,
}

/// A skipped file recorded in the run statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEntry {
    /// Path of the skipped file.
    pub path: PathBuf,
    /// Human-readable skip reason.
    pub reason: String,
}

/// Review orchestrator that drives the full pipeline.
///
/// Filters parsed diffs, batches them against the diff-token budget, sends
/// each batch to the model, parses the responses, and applies
/// confidence/severity filtering. Posting is a separate step so callers that
/// only print results never touch the GitHub API.
pub struct ReviewRunner {
    llm: AnthropicClient,
    config: ReviewConfig,
}

impl ReviewRunner {
    /// Create a new runner from an LLM client and review config.
    pub fn new(llm: AnthropicClient, config: ReviewConfig) -> Self {
        Self { llm, config }
    }

    /// Run a review on parsed diffs and return filtered comments.
    ///
    /// An empty diff (or a diff where every file is filtered out) produces a
    /// successful result with zero comments and zero LLM calls.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Llm`] if an LLM call fails or a response is
    /// not a well-formed comments document.
    pub async fn review(&self, diffs: Vec<FileDiff>) -> Result<ReviewResult, LookoutError> {
        let filter = DiffFilter::from_config(&self.config);
        let filtered = filter.filter(diffs);

        let skipped_files: Vec<SkippedEntry> = filtered
            .skipped
            .iter()
            .map(|s| SkippedEntry {
                path: s.path.clone(),
                reason: s.reason.to_string(),
            })
            .collect();
        let files_reviewed = filtered.kept.len();
        let files_skipped = skipped_files.len();
        let total_hunks: usize = filtered.kept.iter().map(|d| d.hunks.len()).sum();

        if filtered.kept.is_empty() {
            return Ok(ReviewResult {
                comments: Vec::new(),
                stats: ReviewStats {
                    files_reviewed,
                    files_skipped,
                    skipped_files,
                    total_hunks,
                    llm_calls: 0,
                    comments_generated: 0,
                    comments_filtered: 0,
                    input_tokens: None,
                    output_tokens: None,
                    model_used: self.llm.model().to_string(),
                },
            });
        }

        let batches = plan_batches(&filtered.kept, self.config.max_diff_tokens);
        let llm_calls = batches.len();
        let system = prompt::build_system_prompt();

        let mut raw_comments: Vec<ReviewComment> = Vec::new();
        let mut input_tokens: Option<u64> = None;
        let mut output_tokens: Option<u64> = None;
        for batch in &batches {
            let diff_text = diffs_to_text(batch);
            let user = prompt::build_review_prompt(&diff_text, None);
            let completion = self.llm.complete(&system, &user).await?;
            input_tokens = sum_optional(input_tokens, completion.input_tokens);
            output_tokens = sum_optional(output_tokens, completion.output_tokens);
            raw_comments.extend(prompt::parse_review_response(&completion.content)?);
        }
        let comments_generated = raw_comments.len();

        let (comments, comments_filtered) = filter_and_sort(raw_comments, &self.config);

        Ok(ReviewResult {
            comments,
            stats: ReviewStats {
                files_reviewed,
                files_skipped,
                skipped_files,
                total_hunks,
                llm_calls,
                comments_generated,
                comments_filtered,
                input_tokens,
                output_tokens,
                model_used: self.llm.model().to_string(),
            },
        })
    }
}

/// Estimate the token count of a chunk of diff text.
///
/// Four bytes per token is the usual rough cut for code.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Group files into LLM request batches.
///
/// When the whole diff fits inside `max_diff_tokens` it goes out as one
/// request; otherwise each file gets its own request so one oversized file
/// cannot starve the rest of their context.
pub fn plan_batches(diffs: &[FileDiff], max_diff_tokens: usize) -> Vec<Vec<&FileDiff>> {
    let total: usize = diffs
        .iter()
        .map(|d| estimate_tokens(&file_text(d)))
        .sum();

    if total <= max_diff_tokens {
        vec![diffs.iter().collect()]
    } else {
        diffs.iter().map(|d| vec![d]).collect()
    }
}

fn file_text(diff: &FileDiff) -> String {
    use std::fmt::Write;
    let mut text = String::new();
    let _ = writeln!(text, "--- a/{}", diff.old_path.display());
    let _ = writeln!(text, "+++ b/{}", diff.new_path.display());
    for hunk in &diff.hunks {
        let _ = writeln!(
            text,
            "@@ -{},{} +{},{} @@",
            hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
        );
        text.push_str(&hunk.content);
    }
    text
}

fn diffs_to_text(diffs: &[&FileDiff]) -> String {
    let mut text = String::new();
    for diff in diffs {
        text.push_str(&file_text(diff));
    }
    text
}

fn sum_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    }
}

/// Apply confidence/severity filtering and sort the survivors by severity.
pub fn filter_and_sort(
    comments: Vec<ReviewComment>,
    config: &ReviewConfig,
) -> (Vec<ReviewComment>, usize) {
    let before = comments.len();

    let mut kept: Vec<ReviewComment> = Vec::new();
    for comment in comments {
        if comment.confidence < config.min_confidence {
            continue;
        }
        if !config.severity_filter.contains(&comment.severity) {
            continue;
        }
        kept.push(comment);
    }

    kept.sort_by_key(|c| c.severity.rank());

    kept.truncate(config.max_comments);
    let filtered = before - kept.len();
    (kept, filtered)
}

impl fmt::Display for ReviewResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Review Results")?;
        writeln!(f, "==============")?;
        writeln!(
            f,
            "Model: {} | Files: {} (skipped: {}) | Hunks: {} | Comments: {} (filtered: {})\n",
            self.stats.model_used,
            self.stats.files_reviewed,
            self.stats.files_skipped,
            self.stats.total_hunks,
            self.comments.len(),
            self.stats.comments_filtered,
        )?;

        if self.comments.is_empty() {
            writeln!(f, "No issues found.")?;
        } else {
            for c in &self.comments {
                let label = match c.severity {
                    Severity::Bug => "BUG",
                    Severity::Warning => "WARNING",
                    Severity::Suggestion => "SUGGESTION",
                    Severity::Info => "INFO",
                };
                writeln!(
                    f,
                    "[{label}] {}:{} (confidence: {:.0}%)",
                    c.file_path.display(),
                    c.line,
                    c.confidence,
                )?;
                writeln!(f, "  {}", c.message)?;
                if let Some(s) = &c.suggestion {
                    writeln!(f, "  Suggestion: {s}")?;
                }
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

impl ReviewResult {
    /// Render the review result as markdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_review::runner::{ReviewResult, ReviewStats};
    ///
    /// let result = ReviewResult {
    ///     comments: vec![],
    ///     stats: ReviewStats {
    ///         files_reviewed: 0,
    ///         files_skipped: 0,
    ///         skipped_files: vec![],
    ///         total_hunks: 0,
    ///         llm_calls: 0,
    ///         comments_generated: 0,
    ///         comments_filtered: 0,
    ///         input_tokens: None,
    ///         output_tokens: None,
    ///         model_used: "claude-sonnet-4-20250514".into(),
    ///     },
    /// };
    /// let md = result.to_markdown();
    /// assert!(md.contains("# Review Results"));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Review Results\n\n");
        out.push_str(&format!(
            "**Model:** {} | **Files:** {} | **Hunks:** {} | **Comments:** {} (filtered: {})\n\n",
            self.stats.model_used,
            self.stats.files_reviewed,
            self.stats.total_hunks,
            self.comments.len(),
            self.stats.comments_filtered,
        ));

        if self.comments.is_empty() {
            out.push_str("No issues found.\n");
        } else {
            for c in &self.comments {
                let emoji = match c.severity {
                    Severity::Bug => "\u{1f41b}",
                    Severity::Warning => "\u{26a0}\u{fe0f}",
                    Severity::Suggestion => "\u{1f4a1}",
                    Severity::Info => "\u{2139}\u{fe0f}",
                };
                let label = match c.severity {
                    Severity::Bug => "Bug",
                    Severity::Warning => "Warning",
                    Severity::Suggestion => "Suggestion",
                    Severity::Info => "Info",
                };
                out.push_str(&format!(
                    "## {emoji} {label} — `{}:{}` ({:.0}%)\n\n",
                    c.file_path.display(),
                    c.line,
                    c.confidence,
                ));
                out.push_str(&format!("{}\n\n", c.message));
                if let Some(s) = &c.suggestion {
                    out.push_str(&format!("> **Suggestion:** {s}\n\n"));
                }
            }
        }
        out
    }

    /// One-line summary used as the review body when posting.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_review::runner::{ReviewResult, ReviewStats};
    ///
    /// let result = ReviewResult {
    ///     comments: vec![],
    ///     stats: ReviewStats {
    ///         files_reviewed: 2,
    ///         files_skipped: 1,
    ///         skipped_files: vec![],
    ///         total_hunks: 3,
    ///         llm_calls: 1,
    ///         comments_generated: 0,
    ///         comments_filtered: 0,
    ///         input_tokens: None,
    ///         output_tokens: None,
    ///         model_used: "claude-sonnet-4-20250514".into(),
    ///     },
    /// };
    /// assert!(result.summary().contains("2 files"));
    /// ```
    pub fn summary(&self) -> String {
        format!(
            "Lookout Code Review: {} comments ({} files reviewed)",
            self.comments.len(),
            self.stats.files_reviewed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::AnthropicClient;
    use lookout_core::LlmConfig;
    use lookout_diff::parser::parse_unified_diff;

    fn make_comments() -> Vec<ReviewComment> {
        vec![
            ReviewComment {
                file_path: PathBuf::from("a.rs"),
                line: 1,
                severity: Severity::Info,
                message: "info comment".into(),
                confidence: 95.0,
                suggestion: None,
            },
            ReviewComment {
                file_path: PathBuf::from("b.rs"),
                line: 10,
                severity: Severity::Bug,
                message: "real bug".into(),
                confidence: 98.0,
                suggestion: Some("fix it".into()),
            },
            ReviewComment {
                file_path: PathBuf::from("c.rs"),
                line: 20,
                severity: Severity::Warning,
                message: "potential issue".into(),
                confidence: 85.0,
                suggestion: None,
            },
            ReviewComment {
                file_path: PathBuf::from("d.rs"),
                line: 30,
                severity: Severity::Bug,
                message: "low confidence bug".into(),
                confidence: 50.0,
                suggestion: None,
            },
        ]
    }

    #[test]
    fn filter_removes_low_confidence() {
        let config = ReviewConfig {
            min_confidence: 90.0,
            severity_filter: vec![Severity::Bug, Severity::Warning, Severity::Info],
            ..ReviewConfig::default()
        };
        let (kept, filtered) = filter_and_sort(make_comments(), &config);
        // c.rs (85%) and d.rs (50%) should be removed
        assert_eq!(kept.len(), 2);
        assert_eq!(filtered, 2);
    }

    #[test]
    fn filter_removes_non_matching_severity() {
        let config = ReviewConfig {
            min_confidence: 0.0,
            severity_filter: vec![Severity::Bug, Severity::Warning],
            ..ReviewConfig::default()
        };
        let (kept, _) = filter_and_sort(make_comments(), &config);
        // Info comment should be removed
        for c in &kept {
            assert!(c.severity == Severity::Bug || c.severity == Severity::Warning);
        }
    }

    #[test]
    fn sort_by_severity_bug_first() {
        let config = ReviewConfig {
            min_confidence: 0.0,
            severity_filter: vec![
                Severity::Bug,
                Severity::Warning,
                Severity::Suggestion,
                Severity::Info,
            ],
            ..ReviewConfig::default()
        };
        let (kept, _) = filter_and_sort(make_comments(), &config);
        assert!(kept.len() >= 2);
        // Bugs should come before warnings/info
        assert_eq!(kept[0].severity, Severity::Bug);
    }

    #[test]
    fn truncate_to_max_comments() {
        let config = ReviewConfig {
            min_confidence: 0.0,
            severity_filter: vec![
                Severity::Bug,
                Severity::Warning,
                Severity::Suggestion,
                Severity::Info,
            ],
            max_comments: 2,
            ..ReviewConfig::default()
        };
        let (kept, _) = filter_and_sort(make_comments(), &config);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn small_diff_goes_out_as_one_batch() {
        let diff = "\
diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
@@ -1 +1,2 @@
 line1
+line2
diff --git a/b.rs b/b.rs
--- a/b.rs
+++ b/b.rs
@@ -1 +1,2 @@
 line1
+line2
";
        let diffs = parse_unified_diff(diff).unwrap();
        let batches = plan_batches(&diffs, 4000);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[test]
    fn oversized_diff_splits_per_file() {
        let mut diff = String::new();
        for name in ["a.rs", "b.rs", "c.rs"] {
            diff.push_str(&format!(
                "diff --git a/{name} b/{name}\n--- a/{name}\n+++ b/{name}\n@@ -1 +1,2 @@\n line1\n+{}\n",
                "x".repeat(200),
            ));
        }
        let diffs = parse_unified_diff(&diff).unwrap();
        // ~230 bytes per file => ~57 tokens; force a split with a tiny budget
        let batches = plan_batches(&diffs, 100);
        assert_eq!(batches.len(), 3);
        for batch in &batches {
            assert_eq!(batch.len(), 1);
        }
    }

    #[test]
    fn sum_optional_keeps_known_counts() {
        assert_eq!(sum_optional(None, None), None);
        assert_eq!(sum_optional(Some(3), None), Some(3));
        assert_eq!(sum_optional(None, Some(4)), Some(4));
        assert_eq!(sum_optional(Some(3), Some(4)), Some(7));
    }

    #[test]
    fn estimate_tokens_rounds_down() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcdefg"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[tokio::test]
    async fn empty_diff_produces_no_comments_and_no_llm_calls() {
        let llm = AnthropicClient::new(&LlmConfig {
            api_key: Some("test-key".into()),
            ..LlmConfig::default()
        })
        .unwrap();
        let runner = ReviewRunner::new(llm, ReviewConfig::default());

        let result = runner.review(Vec::new()).await.unwrap();
        assert!(result.comments.is_empty());
        assert_eq!(result.stats.llm_calls, 0);
        assert_eq!(result.stats.files_reviewed, 0);
    }

    #[tokio::test]
    async fn fully_filtered_diff_skips_the_llm() {
        let diff = "\
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1 +1,2 @@
 intro
+more docs
";
        let diffs = parse_unified_diff(diff).unwrap();
        let llm = AnthropicClient::new(&LlmConfig {
            api_key: Some("test-key".into()),
            ..LlmConfig::default()
        })
        .unwrap();
        let runner = ReviewRunner::new(llm, ReviewConfig::default());

        let result = runner.review(diffs).await.unwrap();
        assert!(result.comments.is_empty());
        assert_eq!(result.stats.llm_calls, 0);
        assert_eq!(result.stats.files_skipped, 1);
        assert_eq!(result.stats.skipped_files[0].reason, "excluded path");
    }

    #[test]
    fn display_and_markdown_output() {
        let result = ReviewResult {
            comments: vec![ReviewComment {
                file_path: PathBuf::from("test.rs"),
                line: 5,
                severity: Severity::Bug,
                message: "test bug".into(),
                confidence: 99.0,
                suggestion: Some("fix it".into()),
            }],
            stats: ReviewStats {
                files_reviewed: 1,
                files_skipped: 0,
                skipped_files: vec![],
                total_hunks: 1,
                llm_calls: 1,
                comments_generated: 1,
                comments_filtered: 0,
                input_tokens: Some(1200),
                output_tokens: Some(80),
                model_used: "test".into(),
            },
        };
        let text = format!("{result}");
        assert!(text.contains("[BUG]"));
        assert!(text.contains("test.rs:5"));

        let md = result.to_markdown();
        assert!(md.contains("# Review Results"));
        assert!(md.contains("Bug"));
    }
}
