use std::fmt;
use std::path::PathBuf;

use lookout_core::{ChangeType, DiffHunk, LookoutError};

/// A complete diff for a single file, containing one or more hunks.
///
/// # Examples
///
/// ```
/// use lookout_diff::parser::parse_unified_diff;
///
/// let diff = "diff --git a/hello.rs b/hello.rs\n\
///             --- a/hello.rs\n\
///             +++ b/hello.rs\n\
///             @@ -1,3 +1,4 @@\n\
///              fn main() {\n\
///             +    println!(\"hello\");\n\
///              }\n";
/// let files = parse_unified_diff(diff).unwrap();
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].hunks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Path in the old version.
    pub old_path: PathBuf,
    /// Path in the new version.
    pub new_path: PathBuf,
    /// Parsed hunks for this file.
    pub hunks: Vec<DiffHunk>,
    /// Whether this is a newly created file.
    pub is_new_file: bool,
    /// Whether this file was deleted.
    pub is_deleted_file: bool,
    /// Whether this file was renamed.
    pub is_rename: bool,
    /// Whether this is a binary change with no textual hunks.
    pub is_binary: bool,
}

impl FileDiff {
    fn empty() -> Self {
        Self {
            old_path: PathBuf::new(),
            new_path: PathBuf::new(),
            hunks: Vec::new(),
            is_new_file: false,
            is_deleted_file: false,
            is_rename: false,
            is_binary: false,
        }
    }

    /// The path reviews should anchor to: the new path, unless the file was
    /// deleted.
    pub fn review_path(&self) -> &PathBuf {
        if self.is_deleted_file {
            &self.old_path
        } else {
            &self.new_path
        }
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} hunks)",
            self.new_path.display(),
            self.hunks.len()
        )
    }
}

/// Parse a unified diff string (as produced by `git diff` or the GitHub diff
/// endpoint) into structured [`FileDiff`] entries.
///
/// Handles standard unified diff format including new files, deleted files,
/// renamed files, and binary files (kept, flagged, and left without hunks so
/// the filter can report them as skipped).
///
/// # Errors
///
/// Returns [`LookoutError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use lookout_diff::parser::parse_unified_diff;
///
/// let files = parse_unified_diff("").unwrap();
/// assert!(files.is_empty());
/// ```
pub fn parse_unified_diff(input: &str) -> Result<Vec<FileDiff>, LookoutError> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut current_hunk: Option<DiffHunk> = None;

    for line in input.lines() {
        if line.starts_with("diff --git ") {
            flush_hunk(&mut current, &mut current_hunk);
            if let Some(file) = current.take() {
                files.push(file);
            }
            current = Some(FileDiff::empty());
            continue;
        }

        // Implicitly start a file if we see a header but have no current file
        // This handles standard patches that lack the "diff --git" command line
        if line.starts_with("--- ") && current.is_none() {
            current = Some(FileDiff::empty());
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            file.is_binary = true;
            if file.new_path.as_os_str().is_empty() {
                if let Some(path) = binary_path(line) {
                    file.new_path = path.clone();
                    file.old_path = path;
                }
            }
            continue;
        }

        if line.starts_with("new file mode") {
            file.is_new_file = true;
            continue;
        }

        if line.starts_with("deleted file mode") {
            file.is_deleted_file = true;
            continue;
        }

        if line.starts_with("rename from ") || line.starts_with("rename to ") {
            file.is_rename = true;
            continue;
        }

        if line.starts_with("index ") || line.starts_with("similarity index") {
            continue;
        }

        if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = parse_path(path);
            if path == "/dev/null" {
                file.is_new_file = true;
            }
            continue;
        }

        if let Some(path) = line.strip_prefix("+++ ") {
            file.new_path = parse_path(path);
            if path == "/dev/null" {
                file.is_deleted_file = true;
            }
            continue;
        }

        if line.starts_with("@@ ") {
            flush_hunk(&mut current, &mut current_hunk);
            // Re-borrow after flush
            let file = current.as_ref().unwrap();
            let file_path = file.review_path().clone();
            let (old_start, old_lines, new_start, new_lines) = parse_hunk_header(line)?;
            let change_type = if file.is_new_file || old_lines == 0 {
                ChangeType::Add
            } else if file.is_deleted_file || new_lines == 0 {
                ChangeType::Delete
            } else {
                ChangeType::Modify
            };
            current_hunk = Some(DiffHunk {
                file_path,
                old_start,
                old_lines,
                new_start,
                new_lines,
                content: String::new(),
                change_type,
            });
            continue;
        }

        if line == "\\ No newline at end of file" {
            continue;
        }

        if let Some(hunk) = current_hunk.as_mut() {
            if line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') {
                hunk.content.push_str(line);
                hunk.content.push('\n');
            }
        }
    }

    flush_hunk(&mut current, &mut current_hunk);
    if let Some(file) = current.take() {
        files.push(file);
    }

    Ok(files)
}

fn flush_hunk(current: &mut Option<FileDiff>, hunk: &mut Option<DiffHunk>) {
    if let Some(h) = hunk.take() {
        if let Some(file) = current.as_mut() {
            file.hunks.push(h);
        }
    }
}

fn parse_path(raw: &str) -> PathBuf {
    let normalized = raw.trim_matches('"');

    if normalized == "/dev/null" {
        return PathBuf::from("/dev/null");
    }

    let stripped = normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized);

    PathBuf::from(stripped)
}

// "Binary files a/img.png and b/img.png differ"
fn binary_path(line: &str) -> Option<PathBuf> {
    let inner = line
        .strip_prefix("Binary files ")?
        .strip_suffix(" differ")?;
    let (_, after) = inner.split_once(" and ")?;
    Some(parse_path(after))
}

fn parse_hunk_header(line: &str) -> Result<(u32, u32, u32, u32), LookoutError> {
    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(|| LookoutError::Parse(format!("invalid hunk header: {line}")))?;

    let parts: Vec<&str> = inner.split(' ').collect();
    if parts.len() != 2 {
        return Err(LookoutError::Parse(format!("invalid hunk header: {line}")));
    }

    let old = parts[0]
        .strip_prefix('-')
        .ok_or_else(|| LookoutError::Parse(format!("invalid old range in hunk: {line}")))?;
    let new = parts[1]
        .strip_prefix('+')
        .ok_or_else(|| LookoutError::Parse(format!("invalid new range in hunk: {line}")))?;

    let (old_start, old_lines) = parse_range(old, line)?;
    let (new_start, new_lines) = parse_range(new, line)?;

    Ok((old_start, old_lines, new_start, new_lines))
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32), LookoutError> {
    if let Some((start, count)) = range.split_once(',') {
        let s = start
            .parse()
            .map_err(|_| LookoutError::Parse(format!("invalid range number in: {context}")))?;
        let c = count
            .parse()
            .map_err(|_| LookoutError::Parse(format!("invalid range count in: {context}")))?;
        Ok((s, c))
    } else {
        let s = range
            .parse()
            .map_err(|_| LookoutError::Parse(format!("invalid range number in: {context}")))?;
        Ok((s, 1))
    }
}
