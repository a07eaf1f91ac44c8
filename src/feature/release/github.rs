use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, error, info};

use crate::libs::{data::ReleaseData, error::ReleaseError, release::Issue, version::Version};

use super::{IssueTracker, ReleaseService};

/// Fallback location of the API token when the environment has none.
pub const TOKEN_FILE: &str = ".github.token";

pub struct GitHub
{
    octocrab: octocrab::Octocrab,
    owner: String,
    repo: String,
    // The rest of the tool is synchronous; every request blocks on this.
    runtime: tokio::runtime::Runtime,
}

impl GitHub
{
    pub fn connect(data: &ReleaseData, remote_url: Option<&str>) -> Result<GitHub, ReleaseError>
    {
        let token = resolve_token(&data.token_env, Path::new(TOKEN_FILE))?;

        let repository_env = data.repository.clone()
            .or_else(|| std::env::var("GITHUB_REPOSITORY").ok())
            .or_else(|| remote_url.and_then(parse_repository_slug))
            .ok_or_else(|| ReleaseError::Configuration(
                "Unable to tell which GitHub repository to release to. Set `repository` in the config, or GITHUB_REPOSITORY.".to_string()))?;

        let (owner, repo) = repository_env.split_once('/')
            .ok_or_else(|| ReleaseError::Configuration(format!("Expected `owner/repo`, got `{}`", repository_env)))?;

        debug!("Loading Repository: {:?}", repository_env);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| ReleaseError::Configuration(format!("Failed to start the async runtime: {}", error)))?;

        let octocrab = {
            let _guard = runtime.enter();
            octocrab::Octocrab::builder()
                .personal_token(token)
                .build()
                .map_err(|error| ReleaseError::Configuration(format!("Failed to create Octocrab instance: {}", error)))?
        };

        Ok(GitHub { octocrab, owner: owner.to_string(), repo: repo.to_string(), runtime })
    }
}

impl IssueTracker for GitHub
{
    fn find_closed_issues(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Issue>, ReleaseError>
    {
        let result = self.runtime.block_on(async {
            let handler = self.octocrab.issues(&self.owner, &self.repo);
            let mut request = handler.list()
                .state(octocrab::params::State::Closed)
                .per_page(100u8);
            if let Some(since) = since
            {
                request = request.since(since);
            }
            let page = request.send().await?;
            let issues = self.octocrab.all_pages(page).await?;
            Ok::<_, octocrab::Error>(issues)
        });

        let issues = result.map_err(|error| {
            error!("Failed to list issues: {:?}", error);
            ReleaseError::IssueTrackerFailure(error.to_string())
        })?;

        info!("Closed Issues: {}", issues.len());
        Ok(issues.into_iter()
            .map(|issue| Issue {
                number: issue.number,
                title: issue.title,
                labels: issue.labels.into_iter().map(|label| label.name).collect(),
            })
            .collect())
    }
}

impl ReleaseService for GitHub
{
    fn create_release(&self, version: &Version, body: &str) -> Result<(), ReleaseError>
    {
        let version = version.to_string();

        info!("Creating Release: {}", version);

        let result = self.runtime.block_on(async {
            self.octocrab
                .repos(&self.owner, &self.repo)
                .releases()
                .create(version.as_str())
                .name(version.as_str())
                .body(body)
                .draft(false)
                .prerelease(false)
                .send().await
        });

        match result
        {
            Ok(release) =>
            {
                info!("Created Release: {}", release.html_url);
                Ok(())
            },
            Err(error) =>
            {
                error!("Failed to create release: {:?}", error);
                Err(ReleaseError::ReleaseCreationFailure(error.to_string()))
            },
        }
    }
}

/// `$<token_env>` if set, else the contents of `token_file`.
pub fn resolve_token(token_env: &str, token_file: &Path) -> Result<String, ReleaseError>
{
    if let Ok(token) = std::env::var(token_env)
    {
        if !token.trim().is_empty()
        {
            return Ok(token.trim().to_string());
        }
    }

    match std::fs::read_to_string(token_file)
    {
        Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(ReleaseError::Configuration(format!(
            "An API token is required. Put one in {} or set ${}.", token_file.display(), token_env))),
    }
}

/// `owner/repo` from an SSH or HTTPS GitHub remote URL.
pub fn parse_repository_slug(url: &str) -> Option<String>
{
    let (_, path) = url.split_once("github.com:")
        .or_else(|| url.split_once("github.com/"))?;
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let (owner, repo) = path.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/')
    {
        return None;
    }
    Some(format!("{}/{}", owner, repo))
}

#[test]
fn test_parse_repository_slug()
{
    assert_eq!(parse_repository_slug("git@github.com:dhleong/ps4-waker.git").as_deref(), Some("dhleong/ps4-waker"));
    assert_eq!(parse_repository_slug("https://github.com/dhleong/ps4-waker").as_deref(), Some("dhleong/ps4-waker"));
    assert_eq!(parse_repository_slug("ssh://git@github.com/dhleong/ps4-waker.git").as_deref(), Some("dhleong/ps4-waker"));
    assert_eq!(parse_repository_slug("https://gitlab.com/dhleong/ps4-waker.git"), None);
    assert_eq!(parse_repository_slug("https://github.com/dhleong"), None);
}

#[test]
fn test_resolve_token()
{
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join(TOKEN_FILE);
    let token_env = "CUT_RELEASE_TEST_TOKEN_UNSET";

    assert!(matches!(resolve_token(token_env, &token_file), Err(ReleaseError::Configuration(_))));

    std::fs::write(&token_file, "ghp_fromfile\n").unwrap();
    assert_eq!(resolve_token(token_env, &token_file).unwrap(), "ghp_fromfile");

    std::env::set_var("CUT_RELEASE_TEST_TOKEN", "ghp_fromenv");
    assert_eq!(resolve_token("CUT_RELEASE_TEST_TOKEN", &token_file).unwrap(), "ghp_fromenv");
}
