use log::info;

use crate::libs::{
    error::ReleaseError,
    notes::{compose, LabelTaxonomy, LOG_FORMAT},
    release::Tag,
};

use super::{release::IssueTracker, vcs::{LogQuery, VersionControl}};

/// Gathers what happened since the last release and turns it into default
/// release notes.
pub struct ReleaseNotesBuilder<'a>
{
    vcs: &'a dyn VersionControl,
    tracker: &'a dyn IssueTracker,
    taxonomy: &'a LabelTaxonomy,
    closing_patterns: &'a [String],
}

impl<'a> ReleaseNotesBuilder<'a>
{
    pub fn new(vcs: &'a dyn VersionControl, tracker: &'a dyn IssueTracker, taxonomy: &'a LabelTaxonomy, closing_patterns: &'a [String]) -> ReleaseNotesBuilder<'a>
    {
        ReleaseNotesBuilder { vcs, tracker, taxonomy, closing_patterns }
    }

    /// Commits since `latest_tag` (minus those that close an issue) and issues
    /// closed since it was created. Without a previous tag, all of history.
    pub fn build(&self, latest_tag: Option<&Tag>) -> Result<String, ReleaseError>
    {
        let range = latest_tag.map(Tag::range_to_head).unwrap_or_else(|| "HEAD".to_string());
        let log = self.vcs.log(&LogQuery { range, exclude: self.closing_patterns, format: LOG_FORMAT })?;

        let since = latest_tag.and_then(|tag| tag.created);
        let issues = self.tracker.find_closed_issues(since)?;

        let notes = compose(&log, &issues, self.taxonomy);
        info!("Built default release notes ({} issues, {} bytes)", issues.len(), notes.len());
        Ok(notes)
    }
}
