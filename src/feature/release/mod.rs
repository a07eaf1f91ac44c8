use chrono::{DateTime, Utc};

use crate::libs::{data::ReleaseData, error::ReleaseError, release::Issue, version::Version};

pub mod github;

pub trait IssueTracker
{
    /// Closed issues, optionally only those updated since `since`, in the
    /// order the tracker returns them.
    fn find_closed_issues(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Issue>, ReleaseError>;
}

pub trait ReleaseService
{
    fn create_release(&self, version: &Version, body: &str) -> Result<(), ReleaseError>;
}

pub fn connect(data: &ReleaseData, remote_url: Option<&str>) -> Result<github::GitHub, ReleaseError>
{
    match data.host.as_str()
    {
        "github" => github::GitHub::connect(data, remote_url),
        other => Err(ReleaseError::Configuration(format!("Repository Type `{}` is not supported", other))),
    }
}

#[test]
fn test_unsupported_host()
{
    let data = ReleaseData { host: "gitlab".to_string(), ..Default::default() };
    let result = connect(&data, None);
    assert!(matches!(result, Err(ReleaseError::Configuration(message)) if message.contains("gitlab")));
}
