use thiserror::Error;

/// Every way a release can be aborted.
///
/// Each variant is reported where it is detected and ends the run; nothing
/// is retried or rolled back.
#[derive(Debug, Error)]
pub enum ReleaseError
{
    #[error("No version!? Could not find a \"version\" field in `{manifest}`")]
    MissingVersion { manifest: String },

    #[error("Version `{0}` already exists!")]
    TagAlreadyExists(String),

    #[error("Tests failed: `{command}` {reason}")]
    TestFailure { command: String, reason: String },

    #[error("Aborted due to empty message")]
    EmptyNotesAborted,

    #[error("Publish failed: `{command}` {reason}")]
    PublishFailure { command: String, reason: String },

    #[error("Git {operation} failed: {reason}")]
    GitOperationFailure { operation: String, reason: String },

    #[error("Failed to create release: {0}")]
    ReleaseCreationFailure(String),

    #[error("Failed to fetch closed issues: {0}")]
    IssueTrackerFailure(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{context}: {source}")]
    Io { context: String, source: std::io::Error },
}

impl ReleaseError
{
    pub fn git(operation: &str, error: impl std::fmt::Display) -> ReleaseError
    {
        ReleaseError::GitOperationFailure { operation: operation.to_string(), reason: error.to_string() }
    }

    pub fn io(context: String, source: std::io::Error) -> ReleaseError
    {
        ReleaseError::Io { context, source }
    }
}

#[test]
fn test_messages_name_the_condition()
{
    assert_eq!(ReleaseError::TagAlreadyExists("2.1.0".to_string()).to_string(), "Version `2.1.0` already exists!");
    assert_eq!(ReleaseError::EmptyNotesAborted.to_string(), "Aborted due to empty message");

    let error = ReleaseError::git("push", "remote rejected");
    assert_eq!(error.to_string(), "Git push failed: remote rejected");

    let error = ReleaseError::io("Unable to delete .last-release-notes".to_string(), std::io::Error::from(std::io::ErrorKind::PermissionDenied));
    assert!(error.to_string().starts_with("Unable to delete .last-release-notes: "));
    assert!(std::error::Error::source(&error).is_some());
}
