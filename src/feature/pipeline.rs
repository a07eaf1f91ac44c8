//! The release itself: a fixed sequence of verification gates.
//!
//! Stages run strictly in order and the first failure ends the run. Nothing
//! that already happened is undone, so a failure after `Publish` leaves a
//! published package without a tag or release.

use std::fmt::Display;

use log::{info, warn};

use crate::libs::{
    data::ReleaseData,
    error::ReleaseError,
    notes::{DraftNotes, LabelTaxonomy, CLOSING_PATTERNS},
    release::{Release, Tag},
    verify::Verification,
    version::{ManifestReader, Version},
};

use super::{
    notes::ReleaseNotesBuilder,
    process::{CommandRunner, Editor},
    release::{IssueTracker, ReleaseService},
    vcs::VersionControl,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage
{
    VersionCheck,
    TestRun,
    NotesAcquisition,
    NotesEditing,
    Publish,
    TagAndPush,
    RemoteRelease,
    Cleanup,
}

impl Display for Stage
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let name = match self
        {
            Stage::VersionCheck => "version check",
            Stage::TestRun => "test run",
            Stage::NotesAcquisition => "notes acquisition",
            Stage::NotesEditing => "notes editing",
            Stage::Publish => "publish",
            Stage::TagAndPush => "tag and push",
            Stage::RemoteRelease => "remote release",
            Stage::Cleanup => "cleanup",
        };
        write!(f, "{}", name)
    }
}

/// Everything the pipeline talks to.
pub struct Collaborators<'a>
{
    pub manifest:   &'a dyn ManifestReader,
    pub vcs:        &'a dyn VersionControl,
    pub tracker:    &'a dyn IssueTracker,
    pub tests:      &'a dyn CommandRunner,
    pub editor:     &'a dyn Editor,
    pub publisher:  &'a dyn CommandRunner,
    pub releases:   &'a dyn ReleaseService,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions
{
    pub remote: String,
    pub taxonomy: LabelTaxonomy,
    pub closing_patterns: Vec<String>,
    pub dry_run: bool,
}

impl Default for PipelineOptions
{
    fn default() -> Self
    {
        PipelineOptions {
            remote: "origin".to_string(),
            taxonomy: LabelTaxonomy::default(),
            closing_patterns: CLOSING_PATTERNS.iter().map(|pattern| pattern.to_string()).collect(),
            dry_run: false,
        }
    }
}

impl PipelineOptions
{
    pub fn from_data(data: &ReleaseData, dry_run: bool) -> PipelineOptions
    {
        PipelineOptions {
            remote: data.remote.clone(),
            taxonomy: data.taxonomy(),
            closing_patterns: data.closing_patterns.clone(),
            dry_run,
        }
    }
}

/// State carried from one stage to the next, built once by the version check.
#[derive(Debug)]
pub struct ReleaseContext
{
    pub version: Version,
    pub latest_tag: Option<Tag>,
    pub draft: DraftNotes,
    pub notes: String,
}

pub struct ReleasePipeline<'a>
{
    collaborators: Collaborators<'a>,
    draft: DraftNotes,
    options: PipelineOptions,
}

impl<'a> ReleasePipeline<'a>
{
    pub fn new(collaborators: Collaborators<'a>, draft: DraftNotes, options: PipelineOptions) -> ReleasePipeline<'a>
    {
        ReleasePipeline { collaborators, draft, options }
    }

    pub fn run(&self) -> Result<Release, ReleaseError>
    {
        let mut context = self.check_version()?;
        self.run_tests()?;

        let contents = self.acquire_notes(&context)?;
        context.notes = self.edit_notes(&context, &contents)?;

        if self.options.dry_run
        {
            info!("Dry run: skipping publish, tag and release of {}", context.version);
            println!("Release notes for {}:\n\n{}\n", context.version, context.notes);
            return Ok(Release { version: context.version, notes: context.notes });
        }

        self.publish()?;

        println!("Uploading to GitHub...");
        self.tag_and_push(&context)?;
        self.create_release(&context)?;

        self.cleanup(&context);

        Ok(Release { version: context.version, notes: context.notes })
    }

    fn enter(&self, stage: Stage)
    {
        info!("Stage: {}", stage);
    }

    fn check_version(&self) -> Result<ReleaseContext, ReleaseError>
    {
        self.enter(Stage::VersionCheck);

        let version = Verification::of(self.collaborators.manifest.version()).or_terminate()?;
        info!("Version: {}", version);

        Verification::of(self.collaborators.vcs.tag_exists(version.as_str()))
            .ensure_not(|| ReleaseError::TagAlreadyExists(version.to_string()))
            .or_terminate()?;

        let latest_tag = Verification::of(self.collaborators.vcs.latest_tag()).or_terminate()?;

        Ok(ReleaseContext { version, latest_tag, draft: self.draft.clone(), notes: String::new() })
    }

    fn run_tests(&self) -> Result<(), ReleaseError>
    {
        self.enter(Stage::TestRun);

        let tests = self.collaborators.tests;
        let outcome = Verification::of(tests.run());
        if outcome.succeeds()
        {
            info!("Tests passed: {}", tests.describe());
        }

        outcome
            .ensure(|| ReleaseError::TestFailure { command: tests.describe().to_string(), reason: "exited with a failure".to_string() })
            .map_failure(|error| match error
            {
                failure @ ReleaseError::TestFailure { .. } => failure,
                other => ReleaseError::TestFailure { command: tests.describe().to_string(), reason: other.to_string() },
            })
            .or_terminate()?;
        Ok(())
    }

    /// An existing draft wins; otherwise notes are built from history. The
    /// draft file is removed either way so editing starts from a clean slate.
    fn acquire_notes(&self, context: &ReleaseContext) -> Result<String, ReleaseError>
    {
        self.enter(Stage::NotesAcquisition);

        let builder = ReleaseNotesBuilder::new(
            self.collaborators.vcs,
            self.collaborators.tracker,
            &self.options.taxonomy,
            &self.options.closing_patterns,
        );

        let contents = Verification::of(context.draft.contents())
            .recover_with(|| {
                info!("No draft notes at {}, building defaults", context.draft.path().display());
                builder.build(context.latest_tag.as_ref()).map(Some)
            })
            .or_terminate()?
            .unwrap_or_default();

        Verification::of(context.draft.delete()).or_terminate()?;
        Ok(contents)
    }

    fn edit_notes(&self, context: &ReleaseContext, contents: &str) -> Result<String, ReleaseError>
    {
        self.enter(Stage::NotesEditing);

        let edited = Verification::of(self.collaborators.editor.edit(&context.draft, contents))
            .ensure(|| ReleaseError::EmptyNotesAborted)
            .or_terminate()?;

        edited.ok_or(ReleaseError::EmptyNotesAborted)
    }

    fn publish(&self) -> Result<(), ReleaseError>
    {
        self.enter(Stage::Publish);

        let publisher = self.collaborators.publisher;
        Verification::of(publisher.run())
            .map_failure(|error| ReleaseError::PublishFailure { command: publisher.describe().to_string(), reason: error.to_string() })
            .ensure(|| ReleaseError::PublishFailure { command: publisher.describe().to_string(), reason: "exited with a failure".to_string() })
            .or_terminate()?;
        Ok(())
    }

    fn tag_and_push(&self, context: &ReleaseContext) -> Result<(), ReleaseError>
    {
        self.enter(Stage::TagAndPush);

        let name = context.version.as_str();
        let vcs = self.collaborators.vcs;

        Verification::of(vcs.create_tag(name, &format!("Release {}", name))).or_terminate()?;
        Verification::of(vcs.push_tag(name, &self.options.remote)).or_terminate()?;
        Ok(())
    }

    fn create_release(&self, context: &ReleaseContext) -> Result<(), ReleaseError>
    {
        self.enter(Stage::RemoteRelease);

        Verification::of(self.collaborators.releases.create_release(&context.version, &context.notes))
            .map_failure(|error| match error
            {
                failure @ ReleaseError::ReleaseCreationFailure(_) => failure,
                other => ReleaseError::ReleaseCreationFailure(other.to_string()),
            })
            .or_terminate()
    }

    /// The release is already public by now, so a draft that cannot be removed
    /// is only reported.
    fn cleanup(&self, context: &ReleaseContext)
    {
        self.enter(Stage::Cleanup);

        if let Err(error) = context.draft.delete()
        {
            warn!("{}; remove it before the next release", error);
        }
    }
}
