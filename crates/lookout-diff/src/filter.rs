//! Pre-LLM file filtering to eliminate noise at the source.
//!
//! Filters out binary and deleted files, documentation-only paths the CI
//! trigger already excludes, lock files, generated code, vendored
//! dependencies, minified files, and files matching custom patterns before
//! they reach the LLM.

use std::path::{Path, PathBuf};

use lookout_core::ReviewConfig;

use crate::parser::FileDiff;

/// Files and patterns to skip before sending to LLM.
///
/// # Examples
///
/// ```
/// use lookout_diff::filter::DiffFilter;
///
/// let filter = DiffFilter::default_filter();
/// assert!(filter.should_skip("package-lock.json"));
/// assert!(filter.should_skip("README.md"));
/// assert!(!filter.should_skip("src/main.rs"));
/// ```
pub struct DiffFilter {
    skip_patterns: Vec<glob::Pattern>,
    skip_extensions: Vec<String>,
    max_file_size_lines: usize,
}

impl DiffFilter {
    /// Create a filter with sensible defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_diff::filter::DiffFilter;
    ///
    /// let filter = DiffFilter::default_filter();
    /// assert!(filter.should_skip("yarn.lock"));
    /// ```
    pub fn default_filter() -> Self {
        Self {
            skip_patterns: Vec::new(),
            skip_extensions: Vec::new(),
            max_file_size_lines: 1000,
        }
    }

    /// Create a filter from review configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_core::ReviewConfig;
    /// use lookout_diff::filter::DiffFilter;
    ///
    /// let config = ReviewConfig::default();
    /// let filter = DiffFilter::from_config(&config);
    /// assert!(filter.should_skip("Cargo.lock"));
    /// ```
    pub fn from_config(config: &ReviewConfig) -> Self {
        let mut skip_patterns = Vec::new();
        for pat in &config.skip_patterns {
            if let Ok(p) = glob::Pattern::new(pat) {
                skip_patterns.push(p);
            }
        }

        Self {
            skip_patterns,
            skip_extensions: config.skip_extensions.clone(),
            max_file_size_lines: 1000,
        }
    }

    /// Check if a single file path should be skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_diff::filter::DiffFilter;
    ///
    /// let filter = DiffFilter::default_filter();
    /// assert!(filter.should_skip("vendor/lib.js"));
    /// assert!(!filter.should_skip("src/lib.rs"));
    /// ```
    pub fn should_skip(&self, path: &str) -> bool {
        self.check_skip(Path::new(path), "", 0).is_some()
    }

    /// Filter a list of `FileDiff`s, returning only reviewable ones.
    ///
    /// Binary and deleted files are always skipped; the run continues with
    /// the remaining files.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout_diff::filter::DiffFilter;
    /// use lookout_diff::parser::parse_unified_diff;
    ///
    /// let diff = "diff --git a/src/main.rs b/src/main.rs\n\
    ///             --- a/src/main.rs\n\
    ///             +++ b/src/main.rs\n\
    ///             @@ -1,2 +1,3 @@\n\
    ///              line\n\
    ///             +new\n";
    /// let diffs = parse_unified_diff(diff).unwrap();
    /// let filter = DiffFilter::default_filter();
    /// let result = filter.filter(diffs);
    /// assert_eq!(result.kept.len(), 1);
    /// assert!(result.skipped.is_empty());
    /// ```
    pub fn filter(&self, diffs: Vec<FileDiff>) -> FilterResult {
        let mut kept = Vec::new();
        let mut skipped = Vec::new();

        for diff in diffs {
            let path = diff.review_path().clone();
            let path_str = path.to_string_lossy();

            if diff.is_binary {
                skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::BinaryFile,
                });
                continue;
            }

            if diff.is_deleted_file {
                skipped.push(SkippedFile {
                    path,
                    reason: SkipReason::DeletedFile,
                });
                continue;
            }

            let content = Self::collect_hunk_content(&diff);
            let changed_lines = Self::count_changed_lines(&diff);

            if let Some(reason) = self.check_skip(&path, &content, changed_lines) {
                skipped.push(SkippedFile { path, reason });
            } else {
                // Check custom pattern matches
                let mut matched = false;
                for pat in &self.skip_patterns {
                    if pat.matches(&path_str) {
                        skipped.push(SkippedFile {
                            path: path.clone(),
                            reason: SkipReason::PatternMatch(pat.to_string()),
                        });
                        matched = true;
                        break;
                    }
                }
                if !matched {
                    kept.push(diff);
                }
            }
        }

        FilterResult { kept, skipped }
    }

    fn check_skip(&self, path: &Path, content: &str, changed_lines: usize) -> Option<SkipReason> {
        let path_str = path.to_string_lossy();
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();

        // Paths the CI trigger excludes; mirrored here for non-CI invocations
        if is_excluded_path(&file_name) {
            return Some(SkipReason::ExcludedPath);
        }

        // Lock files
        if is_lock_file(&file_name) {
            return Some(SkipReason::LockFile);
        }

        // Vendored code
        if is_vendored(&path_str) {
            return Some(SkipReason::VendoredCode);
        }

        // Minified files
        if is_minified(&file_name, content) {
            return Some(SkipReason::MinifiedFile);
        }

        // Generated files (by name pattern)
        if is_generated_by_name(&file_name) {
            return Some(SkipReason::GeneratedFile);
        }

        // Generated files (by content header)
        if is_generated_by_content(content) {
            return Some(SkipReason::GeneratedFile);
        }

        // Custom extension skip
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            for skip_ext in &self.skip_extensions {
                if ext == skip_ext {
                    return Some(SkipReason::PatternMatch(format!("*.{skip_ext}")));
                }
            }
        }

        // Too large
        if changed_lines > self.max_file_size_lines {
            return Some(SkipReason::TooLarge);
        }

        None
    }

    fn collect_hunk_content(diff: &FileDiff) -> String {
        let mut content = String::new();
        for hunk in &diff.hunks {
            content.push_str(&hunk.content);
        }
        content
    }

    fn count_changed_lines(diff: &FileDiff) -> usize {
        let mut count = 0;
        for hunk in &diff.hunks {
            for line in hunk.content.lines() {
                if line.starts_with('+') || line.starts_with('-') {
                    count += 1;
                }
            }
        }
        count
    }
}

/// Result of filtering diffs.
///
/// # Examples
///
/// ```
/// use lookout_diff::filter::FilterResult;
///
/// let result = FilterResult {
///     kept: vec![],
///     skipped: vec![],
/// };
/// assert!(result.kept.is_empty());
/// ```
pub struct FilterResult {
    /// Diffs that passed the filter.
    pub kept: Vec<FileDiff>,
    /// Files that were skipped with reasons.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was skipped during filtering.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use lookout_diff::filter::{SkipReason, SkippedFile};
///
/// let skipped = SkippedFile {
///     path: PathBuf::from("package-lock.json"),
///     reason: SkipReason::LockFile,
/// };
/// assert!(matches!(skipped.reason, SkipReason::LockFile));
/// ```
#[derive(Debug, Clone)]
pub struct SkippedFile {
    /// Path of the skipped file.
    pub path: PathBuf,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Reason a file was skipped.
///
/// # Examples
///
/// ```
/// use lookout_diff::filter::SkipReason;
///
/// let reason = SkipReason::LockFile;
/// assert_eq!(format!("{reason}"), "lock file");
/// ```
#[derive(Debug, Clone)]
pub enum SkipReason {
    /// Binary change with no textual diff.
    BinaryFile,
    /// File was deleted in this change.
    DeletedFile,
    /// Documentation path excluded by the CI trigger.
    ExcludedPath,
    /// Package manager lock file.
    LockFile,
    /// Auto-generated code.
    GeneratedFile,
    /// Third-party vendored code.
    VendoredCode,
    /// Minified or bundled file.
    MinifiedFile,
    /// File exceeds max changed lines threshold.
    TooLarge,
    /// Matched a custom skip pattern.
    PatternMatch(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::BinaryFile => write!(f, "binary file"),
            SkipReason::DeletedFile => write!(f, "deleted file"),
            SkipReason::ExcludedPath => write!(f, "excluded path"),
            SkipReason::LockFile => write!(f, "lock file"),
            SkipReason::GeneratedFile => write!(f, "generated file"),
            SkipReason::VendoredCode => write!(f, "vendored code"),
            SkipReason::MinifiedFile => write!(f, "minified file"),
            SkipReason::TooLarge => write!(f, "too large"),
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
        }
    }
}

// The trigger's paths-ignore list: **.md, .gitignore, LICENSE
fn is_excluded_path(file_name: &str) -> bool {
    file_name.ends_with(".md") || file_name == ".gitignore" || file_name == "LICENSE"
}

const LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "Cargo.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Gemfile.lock",
    "composer.lock",
    "go.sum",
];

fn is_lock_file(file_name: &str) -> bool {
    LOCK_FILES.contains(&file_name)
}

fn is_vendored(path: &str) -> bool {
    let parts: Vec<&str> = path.split('/').collect();
    for part in &parts {
        if *part == "vendor" || *part == "third_party" || *part == "node_modules" {
            return true;
        }
    }
    false
}

fn is_minified(file_name: &str, content: &str) -> bool {
    if file_name.ends_with(".min.js") || file_name.ends_with(".min.css") {
        return true;
    }
    // Heuristic: any line longer than 500 chars suggests minification
    for line in content.lines() {
        if line.len() > 500 {
            return true;
        }
    }
    false
}

fn is_generated_by_name(file_name: &str) -> bool {
    if file_name.contains(".generated.") {
        return true;
    }
    if file_name.ends_with(".g.dart") {
        return true;
    }
    if file_name.ends_with(".pb.go") || file_name.ends_with(".pb.rs") {
        return true;
    }
    false
}

fn is_generated_by_content(content: &str) -> bool {
    let mut line_count = 0;
    for line in content.lines() {
        // Only look at added lines for header detection
        let check_line = if let Some(stripped) = line.strip_prefix('+') {
            stripped
        } else if line.starts_with('-') || line.starts_with(' ') {
            // Also check context/removed lines (the file might have the header already)
            &line[1..]
        } else {
            line
        };

        if check_line.contains("// Code generated") || check_line.contains("# AUTO-GENERATED") {
            return true;
        }
        line_count += 1;
        if line_count >= 5 {
            break;
        }
    }
    false
}
