use std::path::Path;

use log::{debug, info};

use super::error::ReleaseError;
use super::notes::{LabelTaxonomy, CLOSING_PATTERNS, DEFAULT_LABEL};

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDataLabel
{
    pub label: String,
    pub title: String,
}

/// Contents of `.release.json`. Every field is optional.
#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReleaseData
{
    pub manifest: String,
    pub notes_file: String,
    pub test_command: String,
    pub publish_command: String,
    pub remote: String,
    pub host: String,
    pub repository: Option<String>,
    pub token_env: String,
    pub editor: Option<String>,
    pub labels: Vec<ReleaseDataLabel>,
    pub default_title: String,
    pub closing_patterns: Vec<String>,
}

impl Default for ReleaseData
{
    fn default() -> Self
    {
        let taxonomy = LabelTaxonomy::default();
        let mut labels = Vec::new();
        let mut default_title = String::new();
        for (label, title) in taxonomy.sections()
        {
            if label == DEFAULT_LABEL
            {
                default_title = title.to_string();
            }
            else
            {
                labels.push(ReleaseDataLabel { label: label.to_string(), title: title.to_string() });
            }
        }

        ReleaseData {
            manifest: "package.json".to_string(),
            notes_file: ".last-release-notes".to_string(),
            test_command: "npm test".to_string(),
            publish_command: "npm publish".to_string(),
            remote: "origin".to_string(),
            host: "github".to_string(),
            repository: None,
            token_env: "GITHUB_TOKEN".to_string(),
            editor: None,
            labels,
            default_title,
            closing_patterns: CLOSING_PATTERNS.iter().map(|pattern| pattern.to_string()).collect(),
        }
    }
}

impl ReleaseData
{
    /// Read the configuration. A missing file means every default applies;
    /// a file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<ReleaseData, ReleaseError>
    {
        if !path.exists()
        {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(ReleaseData::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|error| ReleaseError::io(format!("Unable to read {}", path.display()), error))?;
        let data = ReleaseData::parse(&contents)
            .map_err(|error| ReleaseError::Configuration(format!("Invalid {}: {}", path.display(), error)))?;
        data.validate()?;

        info!("Read Release Data from {}", path.display());
        Ok(data)
    }

    pub fn parse(contents: &str) -> Result<ReleaseData, serde_json::Error>
    {
        serde_json::from_str(contents)
    }

    /// `_default` names the catch-all bucket and cannot be configured.
    pub fn validate(&self) -> Result<(), ReleaseError>
    {
        match self.labels.iter().find(|rule| rule.label == DEFAULT_LABEL)
        {
            Some(rule) => Err(ReleaseError::Configuration(format!(
                "Label `{}` (\"{}\") is reserved for issues without a known label; use `default_title` to rename that section",
                rule.label, rule.title))),
            None => Ok(()),
        }
    }

    pub fn taxonomy(&self) -> LabelTaxonomy
    {
        LabelTaxonomy::new(
            self.labels.iter().map(|rule| (rule.label.clone(), rule.title.clone())).collect(),
            &self.default_title,
        )
    }
}

#[test]
fn test_defaults_match_builtin_taxonomy()
{
    let data = ReleaseData::parse("{}").unwrap();
    assert_eq!(data, ReleaseData::default());
    assert_eq!(data.taxonomy(), LabelTaxonomy::default());
    assert_eq!(data.closing_patterns, vec!["Fix #", "Fixes #", "Closes #"]);
    assert_eq!(data.notes_file, ".last-release-notes");
}

#[test]
fn test_partial_configuration()
{
    let data = ReleaseData::parse(r#"{
        "test_command": "cargo test",
        "publish_command": "cargo publish",
        "labels": [ { "label": "breaking", "title": "Breaking Changes" } ]
    }"#).unwrap();

    assert_eq!(data.test_command, "cargo test");
    assert_eq!(data.publish_command, "cargo publish");
    assert_eq!(data.manifest, "package.json");

    let sections: Vec<(String, String)> = data.taxonomy().sections().map(|(l, t)| (l.to_string(), t.to_string())).collect();
    assert_eq!(sections, vec![
        ("breaking".to_string(), "Breaking Changes".to_string()),
        ("_default".to_string(), "Other resolved tickets".to_string()),
    ]);
}

#[test]
fn test_load()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".release.json");

    assert_eq!(ReleaseData::load(&path).unwrap(), ReleaseData::default());

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(ReleaseData::load(&path), Err(ReleaseError::Configuration(_))));
}

#[test]
fn test_reserved_default_label_rejected()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".release.json");
    std::fs::write(&path, r#"{ "labels": [ { "label": "bug", "title": "Bug Fixes" }, { "label": "_default", "title": "Misc" } ] }"#).unwrap();

    let result = ReleaseData::load(&path);
    assert!(matches!(result, Err(ReleaseError::Configuration(message)) if message.contains("_default")));
    assert!(ReleaseData::default().validate().is_ok());
}
