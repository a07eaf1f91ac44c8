use std::cell::RefCell;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::libs::{error::ReleaseError, release::Tag};

/// A `git log` request: which commits, which to leave out, how to print each.
#[derive(Debug, Clone)]
pub struct LogQuery<'a>
{
    pub range: String,
    pub exclude: &'a [String],
    pub format: &'a str,
}

pub trait VersionControl
{
    /// Most recent tag reachable from HEAD, if the repository has any.
    fn latest_tag(&self) -> Result<Option<Tag>, ReleaseError>;
    fn tag_exists(&self, name: &str) -> Result<bool, ReleaseError>;
    fn create_tag(&self, name: &str, message: &str) -> Result<(), ReleaseError>;
    fn push_tag(&self, name: &str, remote: &str) -> Result<(), ReleaseError>;
    fn log(&self, query: &LogQuery) -> Result<String, ReleaseError>;
}

pub struct GitRepository
{
    repository: git2::Repository,
}

impl GitRepository
{
    pub fn open(path: impl AsRef<Path>) -> Result<GitRepository, ReleaseError>
    {
        let repository = git2::Repository::open(path.as_ref())
            .map_err(|error| ReleaseError::git("open", error.message()))?;
        if repository.is_bare()
        {
            return Err(ReleaseError::git("open", "Repository is bare!"));
        }
        Ok(GitRepository { repository })
    }

    pub fn remote_url(&self, remote: &str) -> Option<String>
    {
        let remote = self.repository.find_remote(remote).ok()?;
        remote.url().map(str::to_string)
    }

    fn tag_created(&self, name: &str) -> Result<Option<DateTime<Utc>>, git2::Error>
    {
        let object = self.repository.revparse_single(&format!("refs/tags/{}", name))?;
        let seconds = match object.as_tag().and_then(|tag| tag.tagger().map(|tagger| tagger.when().seconds()))
        {
            Some(seconds) => seconds,
            None => object.peel_to_commit()?.time().seconds(),
        };
        Ok(DateTime::from_timestamp(seconds, 0))
    }
}

impl VersionControl for GitRepository
{
    fn latest_tag(&self) -> Result<Option<Tag>, ReleaseError>
    {
        let tags = self.repository.tag_names(None).map_err(|error| ReleaseError::git("tag", error.message()))?;
        if tags.is_empty()
        {
            warn!("Repository has no tags yet");
            return Ok(None);
        }

        // Same answer as `git describe --tags --abbrev=0`.
        let mut options = git2::DescribeOptions::new();
        options.describe_tags();
        let describe = match self.repository.describe(&options)
        {
            Ok(describe) => describe,
            Err(error) if error.code() == git2::ErrorCode::NotFound || error.class() == git2::ErrorClass::Describe =>
            {
                warn!("No tag is reachable from HEAD: {}", error.message());
                return Ok(None);
            },
            Err(error) => return Err(ReleaseError::git("describe", error.message())),
        };

        let mut format = git2::DescribeFormatOptions::new();
        format.abbreviated_size(0);
        let name = describe.format(Some(&format)).map_err(|error| ReleaseError::git("describe", error.message()))?;

        let created = self.tag_created(&name).map_err(|error| ReleaseError::git("describe", error.message()))?;
        info!("Latest Tag: {} ({:?})", name, created);

        Ok(Some(Tag { name, created }))
    }

    fn tag_exists(&self, name: &str) -> Result<bool, ReleaseError>
    {
        match self.repository.find_reference(&format!("refs/tags/{}", name))
        {
            Ok(_) => Ok(true),
            Err(error) if error.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(error) => Err(ReleaseError::git("tag", error.message())),
        }
    }

    fn create_tag(&self, name: &str, message: &str) -> Result<(), ReleaseError>
    {
        let create = || -> Result<git2::Oid, git2::Error> {
            let commit = self.repository.head()?.peel_to_commit()?;
            let signature = self.repository.signature()?;
            self.repository.tag(name, commit.as_object(), &signature, message, false)
        };

        let tag_oid = create().map_err(|error| ReleaseError::git("tag", error.message()))?;
        info!("Created Tag: {} ({})", name, tag_oid);
        Ok(())
    }

    fn push_tag(&self, name: &str, remote: &str) -> Result<(), ReleaseError>
    {
        let rejected: RefCell<Option<String>> = RefCell::new(None);
        let refspec = format!("refs/tags/{0}:refs/tags/{0}", name);

        let push = || -> Result<(), git2::Error> {
            let config = self.repository.config()?;
            let mut remote = self.repository.find_remote(remote)?;

            let mut attempts = 0;
            let mut callbacks = git2::RemoteCallbacks::new();
            callbacks.credentials(move |url, username, allowed| {
                attempts += 1;
                if attempts > 3
                {
                    return Err(git2::Error::from_str("authentication failed"));
                }
                git_credentials_callback(&config, url, username, allowed)
            });
            callbacks.push_update_reference(|reference, status| {
                if let Some(status) = status
                {
                    *rejected.borrow_mut() = Some(format!("{} rejected: {}", reference, status));
                }
                Ok(())
            });

            let mut options = git2::PushOptions::new();
            options.remote_callbacks(callbacks);
            remote.push(&[refspec.as_str()], Some(&mut options))
        };

        push().map_err(|error| ReleaseError::git("push", error.message()))?;
        if let Some(reason) = rejected.into_inner()
        {
            return Err(ReleaseError::git("push", reason));
        }

        info!("Pushed Tag: {} to {}", name, remote);
        Ok(())
    }

    fn log(&self, query: &LogQuery) -> Result<String, ReleaseError>
    {
        let excludes = query.exclude.iter()
            .map(|pattern| regex::Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| ReleaseError::Configuration(format!("Invalid closing pattern: {}", error)))?;

        let walk = || -> Result<Vec<String>, git2::Error> {
            let mut revwalk = self.repository.revwalk()?;
            revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
            if query.range.contains("..")
            {
                revwalk.push_range(&query.range)?;
            }
            else
            {
                let commit = self.repository.revparse_single(&query.range)?.peel_to_commit()?;
                revwalk.push(commit.id())?;
            }

            let mut lines = Vec::new();
            for oid in revwalk
            {
                let commit = self.repository.find_commit(oid?)?;
                let message = commit.message().unwrap_or_default();
                if excludes.iter().any(|pattern| pattern.is_match(message))
                {
                    debug!("Commit: [CLOSES ISSUE] {} - {}", commit.id(), message.trim());
                    continue;
                }
                lines.push(render_commit(query.format, &commit));
            }
            Ok(lines)
        };

        let lines = walk().map_err(|error| ReleaseError::git("log", error.message()))?;
        info!("Commits: {}", lines.len());
        Ok(lines.join("\n"))
    }
}

/// Expand the `git log --pretty` placeholders this tool uses.
fn render_commit(format: &str, commit: &git2::Commit) -> String
{
    let id = commit.id().to_string();
    let author = commit.author();
    format
        .replace("%H", &id)
        .replace("%h", &id[..7.min(id.len())])
        .replace("%an", author.name().unwrap_or_default())
        .replace("%s", commit.summary().unwrap_or_default())
}

/// SSH agent or `GIT_SSH_KEY_PATH` for SSH remotes, the configured credential
/// helper for HTTPS ones.
pub fn git_credentials_callback(config: &git2::Config, url: &str, username: Option<&str>, allowed: git2::CredentialType) -> Result<git2::Cred, git2::Error>
{
    let username = username.unwrap_or("git");
    if allowed.contains(git2::CredentialType::SSH_KEY)
    {
        if let Ok(key_path) = std::env::var("GIT_SSH_KEY_PATH")
        {
            debug!("Git Credentials: {}", key_path);
            return git2::Cred::ssh_key(username, None, Path::new(&key_path), None);
        }
        return git2::Cred::ssh_key_from_agent(username);
    }
    if allowed.contains(git2::CredentialType::USER_PASS_PLAINTEXT)
    {
        return git2::Cred::credential_helper(config, url, Some(username));
    }
    git2::Cred::default()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn scratch_repository() -> (tempfile::TempDir, GitRepository)
    {
        let dir = tempfile::tempdir().unwrap();
        let repository = git2::Repository::init(dir.path()).unwrap();
        {
            let mut config = repository.config().unwrap();
            config.set_str("user.name", "Tester").unwrap();
            config.set_str("user.email", "tester@example.com").unwrap();
        }
        (dir, GitRepository { repository })
    }

    fn commit(git: &GitRepository, message: &str) -> git2::Oid
    {
        let repository = &git.repository;
        let signature = git2::Signature::now("Tester", "tester@example.com").unwrap();
        let tree_id = repository.index().unwrap().write_tree().unwrap();
        let tree = repository.find_tree(tree_id).unwrap();
        let parents = match repository.head()
        {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parents: Vec<&git2::Commit> = parents.iter().collect();
        repository.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents).unwrap()
    }

    fn closing_patterns() -> Vec<String>
    {
        crate::libs::notes::CLOSING_PATTERNS.iter().map(|pattern| pattern.to_string()).collect()
    }

    #[test]
    fn test_no_tags()
    {
        let (_dir, git) = scratch_repository();
        commit(&git, "Initial commit");

        assert_eq!(git.latest_tag().unwrap(), None);
        assert!(!git.tag_exists("1.0.0").unwrap());
    }

    #[test]
    fn test_latest_tag_and_existence()
    {
        let (_dir, git) = scratch_repository();
        commit(&git, "Initial commit");
        git.create_tag("1.0.0", "Release 1.0.0").unwrap();
        commit(&git, "Add remote control");

        let latest = git.latest_tag().unwrap().unwrap();
        assert_eq!(latest.name, "1.0.0");
        assert!(latest.created.is_some());
        assert_eq!(latest.range_to_head(), "1.0.0..HEAD");

        assert!(git.tag_exists("1.0.0").unwrap());
        assert!(!git.tag_exists("1.1.0").unwrap());
    }

    #[test]
    fn test_tags_unreachable_from_head()
    {
        let (_dir, git) = scratch_repository();

        // A tag on a root commit HEAD does not descend from.
        let side = {
            let repository = &git.repository;
            let signature = git2::Signature::now("Tester", "tester@example.com").unwrap();
            let tree_id = repository.index().unwrap().write_tree().unwrap();
            let tree = repository.find_tree(tree_id).unwrap();
            repository.commit(None, &signature, &signature, "Old release branch", &tree, &[]).unwrap()
        };
        let side = git.repository.find_object(side, None).unwrap();
        git.repository.tag_lightweight("0.9.0", &side, false).unwrap();

        commit(&git, "Squashed history");

        assert!(git.tag_exists("0.9.0").unwrap());
        assert_eq!(git.latest_tag().unwrap(), None);
    }

    #[test]
    fn test_log_excludes_issue_closing_commits()
    {
        let (_dir, git) = scratch_repository();
        commit(&git, "Initial commit");
        git.create_tag("1.0.0", "Release 1.0.0").unwrap();
        commit(&git, "Refactor socket handling");
        commit(&git, "Fixes #12: crash on wake");
        commit(&git, "Handle timeouts\n\nCloses #14");
        commit(&git, "Bump dependencies");

        let exclude = closing_patterns();
        let log = git.log(&LogQuery { range: "1.0.0..HEAD".to_string(), exclude: &exclude, format: "- %s" }).unwrap();

        assert_eq!(log, "- Bump dependencies\n- Refactor socket handling");
    }

    #[test]
    fn test_log_of_whole_history()
    {
        let (_dir, git) = scratch_repository();
        commit(&git, "Initial commit");
        commit(&git, "Fix #1 typo");

        let exclude = closing_patterns();
        let log = git.log(&LogQuery { range: "HEAD".to_string(), exclude: &exclude, format: "- %s" }).unwrap();
        assert_eq!(log, "- Initial commit");

        let none = git.log(&LogQuery { range: "HEAD".to_string(), exclude: &["commit".to_string(), "typo".to_string()], format: "- %s" }).unwrap();
        assert_eq!(none, "");
    }

    #[test]
    fn test_push_to_missing_remote_fails()
    {
        let (_dir, git) = scratch_repository();
        commit(&git, "Initial commit");
        git.create_tag("1.0.0", "Release 1.0.0").unwrap();

        let result = git.push_tag("1.0.0", "origin");
        assert!(matches!(result, Err(ReleaseError::GitOperationFailure { operation, .. }) if operation == "push"));
    }
}
