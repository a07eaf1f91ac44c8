//! Release notes composition and the local draft file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use super::error::ReleaseError;
use super::release::Issue;

/// Key of the catch-all bucket for issues that carry none of the taxonomy labels.
pub const DEFAULT_LABEL: &str = "_default";

/// Commit messages following one of these conventions already close an issue,
/// so the issue section mentions them and the commit log leaves them out.
pub const CLOSING_PATTERNS: [&str; 3] = ["Fix #", "Fixes #", "Closes #"];

/// One line per commit: `- <subject>`.
pub const LOG_FORMAT: &str = "- %s";

/// Ordered `(label, heading)` pairs. The order is both the priority used when
/// an issue carries several labels and the order sections are written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTaxonomy
{
    entries: Vec<(String, String)>,
    default_title: String,
}

impl LabelTaxonomy
{
    // Ctor
    pub fn new(entries: Vec<(String, String)>, default_title: &str) -> LabelTaxonomy
    {
        LabelTaxonomy { entries, default_title: default_title.to_string() }
    }

    /// The label under which `issue` is listed: the first taxonomy entry it
    /// carries, otherwise the default bucket.
    pub fn bucket_for(&self, issue: &Issue) -> &str
    {
        self.entries.iter()
            .map(|(label, _)| label.as_str())
            .find(|label| issue.has_label(label))
            .unwrap_or(DEFAULT_LABEL)
    }

    /// Every bucket in display order, the default bucket last.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &str)>
    {
        self.entries.iter()
            .map(|(label, title)| (label.as_str(), title.as_str()))
            .chain(std::iter::once((DEFAULT_LABEL, self.default_title.as_str())))
    }
}

impl Default for LabelTaxonomy
{
    fn default() -> Self
    {
        LabelTaxonomy::new(vec![
            ("feature".to_string(), "New Features".to_string()),
            ("enhancement".to_string(), "Enhancements".to_string()),
            ("bug".to_string(), "Bug Fixes".to_string()),
        ], "Other resolved tickets")
    }
}

pub fn format_issue(issue: &Issue) -> String
{
    format!("- {} (#{})\n", issue.title, issue.number)
}

/// Build the default release notes from the filtered commit log and the
/// issues closed since the last release. Deterministic, and always trimmed.
pub fn compose(log: &str, issues: &[Issue], taxonomy: &LabelTaxonomy) -> String
{
    let mut labeled: HashMap<&str, String> = HashMap::new();
    for issue in issues
    {
        labeled.entry(taxonomy.bucket_for(issue))
            .or_default()
            .push_str(&format_issue(issue));
    }

    let mut contents = String::new();
    for (label, title) in taxonomy.sections()
    {
        if let Some(content) = labeled.get(label).filter(|content| !content.is_empty())
        {
            contents += &format!("\n**{}**:\n{}", title, content);
        }
    }

    if !log.is_empty()
    {
        contents += "\n**Notes**:\n";
        contents += log;
    }

    contents.trim().to_string()
}

/// The local file holding in-progress release notes between runs.
#[derive(Debug, Clone)]
pub struct DraftNotes
{
    path: PathBuf,
}

impl DraftNotes
{
    pub fn new(path: impl AsRef<Path>) -> DraftNotes
    {
        DraftNotes { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// The draft's contents, or `None` when there is no draft yet.
    pub fn contents(&self) -> Result<Option<String>, ReleaseError>
    {
        match std::fs::read_to_string(&self.path)
        {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ReleaseError::io(format!("Unable to read {}", self.path.display()), error)),
        }
    }

    pub fn write(&self, contents: &str) -> Result<(), ReleaseError>
    {
        std::fs::write(&self.path, contents)
            .map_err(|error| ReleaseError::io(format!("Unable to write {}", self.path.display()), error))
    }

    /// Remove the draft. A draft that is already gone is not an error.
    pub fn delete(&self) -> Result<(), ReleaseError>
    {
        match std::fs::remove_file(&self.path)
        {
            Ok(()) =>
            {
                debug!("Deleted draft notes {}", self.path.display());
                Ok(())
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ReleaseError::io(format!("Unable to delete {}", self.path.display()), error)),
        }
    }
}

#[cfg(test)]
mod tests
{
    use maplit::btreeset;

    use super::*;

    fn issue(number: u64, title: &str, labels: std::collections::BTreeSet<&str>) -> Issue
    {
        Issue { number, title: title.to_string(), labels: labels.into_iter().map(String::from).collect() }
    }

    #[test]
    fn test_sections_follow_taxonomy_order()
    {
        let issues = vec![
            issue(5, "Crash on start", btreeset!{"bug"}),
            issue(7, "Add dark mode", btreeset!{"feature"}),
            issue(9, "Typo", btreeset!{}),
        ];

        let notes = compose("", &issues, &LabelTaxonomy::default());

        assert_eq!(notes, "**New Features**:\n- Add dark mode (#7)\n\n\
                           **Bug Fixes**:\n- Crash on start (#5)\n\n\
                           **Other resolved tickets**:\n- Typo (#9)");
        assert!(!notes.contains("**Notes**"));
    }

    #[test]
    fn test_first_matching_label_wins()
    {
        // Label order on the issue does not matter, only taxonomy order.
        let issues = vec![issue(3, "Faster sync", btreeset!{"bug", "enhancement", "feature"})];

        let notes = compose("", &issues, &LabelTaxonomy::default());

        assert_eq!(notes, "**New Features**:\n- Faster sync (#3)");
        assert_eq!(notes.matches("(#3)").count(), 1);
    }

    #[test]
    fn test_unmatched_labels_land_in_default_bucket()
    {
        let taxonomy = LabelTaxonomy::default();
        let tagged = issue(11, "Docs", btreeset!{"documentation"});
        assert_eq!(taxonomy.bucket_for(&tagged), DEFAULT_LABEL);

        let notes = compose("", &[tagged], &taxonomy);
        assert_eq!(notes, "**Other resolved tickets**:\n- Docs (#11)");
    }

    #[test]
    fn test_default_bucket_omitted_when_empty()
    {
        let notes = compose("", &[issue(1, "Retry", btreeset!{"enhancement"})], &LabelTaxonomy::default());
        assert!(!notes.contains("Other resolved tickets"));
    }

    #[test]
    fn test_commit_log_goes_last()
    {
        let notes = compose("- Bump deps\n- Refactor socket", &[issue(2, "Hang", btreeset!{"bug"})], &LabelTaxonomy::default());
        assert_eq!(notes, "**Bug Fixes**:\n- Hang (#2)\n\n**Notes**:\n- Bump deps\n- Refactor socket");

        let log_only = compose("- Bump deps\n", &[], &LabelTaxonomy::default());
        assert_eq!(log_only, "**Notes**:\n- Bump deps");
    }

    #[test]
    fn test_nothing_to_report_is_empty()
    {
        assert_eq!(compose("", &[], &LabelTaxonomy::default()), "");
    }

    #[test]
    fn test_custom_taxonomy()
    {
        let taxonomy = LabelTaxonomy::new(vec![("security".to_string(), "Security".to_string())], "Misc");
        let issues = vec![
            issue(1, "Leak", btreeset!{"bug"}),
            issue(2, "CVE", btreeset!{"bug", "security"}),
        ];

        assert_eq!(compose("", &issues, &taxonomy), "**Security**:\n- CVE (#2)\n\n**Misc**:\n- Leak (#1)");
    }

    #[test]
    fn test_draft_notes_lifecycle()
    {
        let dir = tempfile::tempdir().unwrap();
        let draft = DraftNotes::new(dir.path().join(".last-release-notes"));

        assert_eq!(draft.contents().unwrap(), None);
        draft.delete().unwrap();

        draft.write("Hand written").unwrap();
        assert_eq!(draft.contents().unwrap().as_deref(), Some("Hand written"));

        draft.delete().unwrap();
        assert!(!draft.path().exists());
    }

    #[test]
    fn test_draft_io_failures_name_the_file()
    {
        let dir = tempfile::tempdir().unwrap();
        let draft = DraftNotes::new(dir.path());

        let error = draft.delete().unwrap_err();
        assert!(matches!(error, ReleaseError::Io { .. }));
        assert!(error.to_string().starts_with("Unable to delete "));
        assert!(!error.to_string().contains("Configuration"));
    }
}
