use lookout_core::LookoutConfig;

#[test]
fn load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".lookout.toml");
    std::fs::write(&path, "[review]\nmax_comments = 2\n").unwrap();

    let config = LookoutConfig::from_file(&path).unwrap();
    assert_eq!(config.review.max_comments, 2);
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".lookout.toml");

    assert!(LookoutConfig::from_file(&path).is_err());
}

#[test]
fn commented_template_yields_defaults() {
    // Mirrors the template written by `lookout init`: every option commented out
    let template = "\
# Lookout Configuration

[llm]
# model = \"claude-sonnet-4-20250514\"
# max_output_tokens = 4096

[review]
# max_comments = 10
# min_confidence = 80.0
";
    let value: toml::Value = toml::from_str(template).unwrap();
    assert!(value.get("llm").is_some());
    assert!(value.get("review").is_some());

    let config = LookoutConfig::from_toml(template).unwrap();
    assert_eq!(config.review.max_comments, 10);
    assert_eq!(config.llm.model, "claude-sonnet-4-20250514");
}
