use std::io::IsTerminal;
use std::io::Read;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};

use lookout_core::{CiContext, LookoutConfig, OutputFormat, Severity};
use lookout_review::github::GitHubClient;
use lookout_review::llm::AnthropicClient;
use lookout_review::runner::ReviewRunner;

#[derive(Parser)]
#[command(
    name = "lookout",
    version,
    about = "AI pull-request review runner",
    long_about = "Lookout reviews pull requests with an LLM and posts the findings back.\n\n\
                   Designed to run inside CI on pull-request events, but the same pipeline\n\
                   works locally against stdin, a patch file, or a GitHub PR.\n\n\
                   Examples:\n  \
                     lookout run                     Review the PR described by the CI environment\n  \
                     git diff main | lookout review  Review a diff from stdin\n  \
                     lookout review --pr owner/repo#1 --post-comments\n  \
                     lookout doctor                  Check credentials and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .lookout.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Review the pull request described by the CI environment
    #[command(long_about = "Review the pull request described by the CI environment.\n\n\
        Reads REPO_OWNER, REPO_NAME, PR_NUMBER (and optionally GITHUB_SHA) plus the\n\
        ANTHROPIC_API_KEY and GITHUB_TOKEN credentials, fetches the PR diff, reviews\n\
        it, and posts the findings as a single PR review. Exits non-zero on any\n\
        unrecoverable failure so the enclosing job is marked failed.\n\n\
        Example:\n  lookout run")]
    Run {
        /// Analyze and print findings without posting to GitHub
        #[arg(long)]
        dry_run: bool,
    },
    /// Run an AI review against a local diff or a GitHub PR
    #[command(long_about = "Run an AI review against a local diff or a GitHub PR.\n\n\
        Accepts diffs from stdin, a file, or a GitHub PR reference.\n\n\
        Examples:\n  git diff | lookout review\n  lookout review --pr owner/repo#123 --post-comments\n  lookout review --file changes.patch --fail-on warning")]
    Review {
        /// GitHub PR to review (format: owner/repo#123)
        #[arg(
            long,
            long_help = "GitHub PR to review.\n\nFormat: owner/repo#123\nRequires GITHUB_TOKEN env var."
        )]
        pr: Option<String>,
        /// Read diff from file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        /// Post comments to the GitHub PR
        #[arg(
            long,
            long_help = "Post review comments directly to the GitHub PR.\n\nRequires --pr and GITHUB_TOKEN."
        )]
        post_comments: bool,
        /// Additional glob patterns to skip (e.g. "*.test.ts")
        #[arg(long)]
        skip_pattern: Vec<String>,
        /// Include suggestion-level comments (default: only bug+warning)
        #[arg(long)]
        include_suggestions: bool,
        /// Exit with non-zero code if findings meet severity threshold
        #[arg(
            long,
            long_help = "Exit with non-zero code if findings of this severity or higher are found.\n\nSeverity ranking: bug > warning > suggestion > info.\nUseful in CI pipelines to fail builds on serious issues."
        )]
        fail_on: Option<Severity>,
    },
    /// Check your Lookout setup and environment
    #[command(long_about = "Check your Lookout setup and environment.\n\n\
        Runs diagnostics for the config file, LLM API key, GitHub token, and the\n\
        CI context variables. Use --format json for machine-readable output.")]
    Doctor,
    /// Create a default .lookout.toml configuration file
    #[command(long_about = "Create a default .lookout.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .lookout.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1m\x1b[33m\u{1f441}\x1b[0m \x1b[1mlookout\x1b[0m v{version} — AI review for pull requests\n");

        println!("Quick start:");
        println!("  \x1b[36mlookout init\x1b[0m                  Create a .lookout.toml config file");
        println!("  \x1b[36mgit diff | lookout review\x1b[0m     Review your latest changes");
        println!("  \x1b[36mlookout doctor\x1b[0m                Check credentials and environment\n");

        println!("All commands:");
        println!("  \x1b[32mrun\x1b[0m       CI mode: review the PR from the workflow environment");
        println!("  \x1b[32mreview\x1b[0m    Review a diff (stdin, file, or GitHub PR)");
        println!("  \x1b[32mdoctor\x1b[0m    Check your setup and environment");
        println!("  \x1b[32minit\x1b[0m      Create default configuration\n");
    } else {
        println!("lookout v{version} — AI review for pull requests\n");

        println!("Quick start:");
        println!("  lookout init                  Create a .lookout.toml config file");
        println!("  git diff | lookout review     Review your latest changes");
        println!("  lookout doctor                Check credentials and environment\n");

        println!("All commands:");
        println!("  run       CI mode: review the PR from the workflow environment");
        println!("  review    Review a diff (stdin, file, or GitHub PR)");
        println!("  doctor    Check your setup and environment");
        println!("  init      Create default configuration\n");
    }

    println!("Run 'lookout <command> --help' for details.");
}

fn read_diff_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(config: &LookoutConfig, format: OutputFormat, use_color: bool) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    let config_path = std::path::Path::new(".lookout.toml");
    if config_path.exists() {
        checks.push(CheckResult::pass("config_file", ".lookout.toml found"));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            ".lookout.toml not found",
            "run 'lookout init' to create a default config",
        ));
    }

    // 2. LLM model + API key
    checks.push(CheckResult::pass(
        "llm_model",
        config.llm.model.clone(),
    ));
    if config.llm.api_key.is_some() || std::env::var("ANTHROPIC_API_KEY").is_ok() {
        checks.push(CheckResult::pass("llm_api_key", "ANTHROPIC_API_KEY set"));
    } else {
        checks.push(CheckResult::fail(
            "llm_api_key",
            "ANTHROPIC_API_KEY not set",
            "export ANTHROPIC_API_KEY=... or set api_key in .lookout.toml",
        ));
    }

    // 3. GitHub token
    if std::env::var("GITHUB_TOKEN").is_ok() {
        checks.push(CheckResult::pass("github_token", "GITHUB_TOKEN set"));
    } else {
        checks.push(CheckResult::fail(
            "github_token",
            "GITHUB_TOKEN not set",
            "export GITHUB_TOKEN=... (needed for --pr and posting)",
        ));
    }

    // 4. CI context (informational outside CI)
    match CiContext::from_env() {
        Ok(ctx) => checks.push(CheckResult::pass(
            "ci_context",
            format!("{}/{}#{}", ctx.owner, ctx.repo, ctx.pr_number),
        )),
        Err(e) => checks.push(CheckResult::info(
            "ci_context",
            format!("not set ({e}) — only needed for 'lookout run'"),
        )),
    }

    // Output
    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            let version = env!("CARGO_PKG_VERSION");
            println!("Lookout v{version} — Environment Check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                // Pad the name for alignment
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<20} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Lookout Configuration
# See: https://github.com/lookout-ci/lookout

[llm]
# model = "claude-sonnet-4-20250514"
# base_url = "https://api.anthropic.com"
# max_output_tokens = 4096

[review]
# max_comments = 10
# min_confidence = 80.0
# severity_filter = ["bug", "warning"]
# skip_patterns = ["*.lock", "*.min.js", "vendor/**"]
# skip_extensions = ["snap"]
# max_diff_tokens = 4000
# include_suggestions = false
"#;

fn load_config(path: &Option<PathBuf>) -> Result<LookoutConfig> {
    match path {
        Some(path) => LookoutConfig::from_file(path).into_diagnostic(),
        None => {
            let default_path = std::path::Path::new(".lookout.toml");
            if default_path.exists() {
                LookoutConfig::from_file(default_path).into_diagnostic()
            } else {
                Ok(LookoutConfig::default())
            }
        }
    }
}

fn apply_review_overrides(
    config: &mut LookoutConfig,
    skip_pattern: &[String],
    include_suggestions: bool,
) {
    if !skip_pattern.is_empty() {
        config
            .review
            .skip_patterns
            .extend(skip_pattern.iter().cloned());
    }
    if include_suggestions {
        config.review.include_suggestions = true;
        if !config
            .review
            .severity_filter
            .contains(&Severity::Suggestion)
        {
            config.review.severity_filter.push(Severity::Suggestion);
        }
    }
}

fn print_verbose_stats(result: &lookout_review::runner::ReviewResult) {
    eprintln!("--- Review Stats ---");
    eprintln!(
        "Files reviewed: {} | Files skipped: {}",
        result.stats.files_reviewed, result.stats.files_skipped
    );
    if !result.stats.skipped_files.is_empty() {
        eprintln!("Skipped files:");
        for sf in &result.stats.skipped_files {
            eprintln!("  {} ({})", sf.path.display(), sf.reason);
        }
    }
    eprintln!("LLM calls: {}", result.stats.llm_calls);
    if let (Some(input), Some(output)) = (result.stats.input_tokens, result.stats.output_tokens) {
        eprintln!("Tokens: {input} in, {output} out");
    }
    eprintln!(
        "Comments: {} generated, {} filtered, {} final",
        result.stats.comments_generated,
        result.stats.comments_filtered,
        result.comments.len(),
    );
    eprintln!("--------------------");
}

fn print_result(result: &lookout_review::runner::ReviewResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(result).into_diagnostic()?
            );
        }
        OutputFormat::Markdown => {
            print!("{}", result.to_markdown());
        }
        OutputFormat::Text => {
            print!("{result}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config = load_config(&cli.config)?;

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
            return Ok(());
        }
        Some(Command::Run { dry_run }) => {
            let ctx = CiContext::from_env()?;

            // Both credentials are checked here, before any network call
            let llm_client = AnthropicClient::new(&config.llm)?;
            let github = GitHubClient::new(None)?;

            if cli.verbose {
                eprintln!(
                    "Reviewing {}/{}#{} with {}",
                    ctx.owner,
                    ctx.repo,
                    ctx.pr_number,
                    llm_client.model(),
                );
            }

            let diff_input = github
                .get_pr_diff(&ctx.owner, &ctx.repo, ctx.pr_number)
                .await?;
            let diffs = lookout_diff::parser::parse_unified_diff(&diff_input)?;

            let runner = ReviewRunner::new(llm_client, config.review.clone());
            let result = runner.review(diffs).await?;

            if cli.verbose {
                print_verbose_stats(&result);
            }
            print_result(&result, cli.format)?;

            if result.comments.is_empty() {
                eprintln!("No findings to post.");
            } else if dry_run {
                eprintln!(
                    "Dry run: {} comments not posted to {}/{}#{}",
                    result.comments.len(),
                    ctx.owner,
                    ctx.repo,
                    ctx.pr_number,
                );
            } else {
                github
                    .post_review(
                        &ctx.owner,
                        &ctx.repo,
                        ctx.pr_number,
                        &result.comments,
                        &result.summary(),
                        ctx.head_sha.as_deref(),
                    )
                    .await?;
                eprintln!(
                    "Posted {} comments to {}/{}#{}",
                    result.comments.len(),
                    ctx.owner,
                    ctx.repo,
                    ctx.pr_number,
                );
            }
        }
        Some(Command::Review {
            ref pr,
            ref file,
            post_comments,
            ref skip_pattern,
            include_suggestions,
            fail_on,
        }) => {
            let mut config = config;
            apply_review_overrides(&mut config, skip_pattern, include_suggestions);

            let diff_input = if let Some(pr_ref) = pr {
                let (owner, repo, pr_number) =
                    lookout_review::github::parse_pr_reference(pr_ref)?;
                let github = GitHubClient::new(None)?;
                github.get_pr_diff(&owner, &repo, pr_number).await?
            } else {
                read_diff_input(file)?
            };

            // Hint: empty diff input from stdin
            if diff_input.trim().is_empty() && pr.is_none() {
                miette::bail!(miette::miette!(
                    help = "Pipe a diff to lookout, e.g.: git diff | lookout review\n       Or use --file <path> or --pr owner/repo#123",
                    "Empty diff input"
                ));
            }

            let diffs = lookout_diff::parser::parse_unified_diff(&diff_input)?;

            let llm_client = AnthropicClient::new(&config.llm)?;
            let runner = ReviewRunner::new(llm_client, config.review.clone());

            let is_tty = std::io::stderr().is_terminal();
            let spinner = if is_tty {
                let pb = indicatif::ProgressBar::new_spinner();
                pb.set_style(
                    indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                        .unwrap(),
                );
                pb.set_message("Reviewing changes...");
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                Some(pb)
            } else {
                None
            };

            let result = runner.review(diffs).await.inspect_err(|_e| {
                if let Some(pb) = &spinner {
                    pb.finish_with_message("Failed");
                }
            })?;

            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            if cli.verbose {
                print_verbose_stats(&result);
            }
            print_result(&result, cli.format)?;

            if post_comments {
                let Some(pr_ref) = pr else {
                    miette::bail!("--post-comments requires --pr");
                };
                let (owner, repo, pr_number) =
                    lookout_review::github::parse_pr_reference(pr_ref)?;
                let github = GitHubClient::new(None)?;
                github
                    .post_review(
                        &owner,
                        &repo,
                        pr_number,
                        &result.comments,
                        &result.summary(),
                        None,
                    )
                    .await?;
                eprintln!("Posted {} comments to {pr_ref}", result.comments.len());
            }

            if let Some(threshold) = fail_on {
                let has_findings = result
                    .comments
                    .iter()
                    .any(|c| c.severity.meets_threshold(threshold));
                if has_findings {
                    std::process::exit(1);
                }
            }
        }
        Some(Command::Doctor) => {
            run_doctor(&config, cli.format, use_color)?;
        }
        Some(Command::Init) => {
            let path = std::path::Path::new(".lookout.toml");
            if path.exists() {
                miette::bail!(".lookout.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .lookout.toml with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "lookout", &mut std::io::stdout());
        }
    }

    Ok(())
}
