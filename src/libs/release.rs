use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::version::Version;


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag
{
    pub name:       String,
    pub created:    Option<DateTime<Utc>>,
}

impl Tag
{
    /// Range of commits made since this tag, in `git log` notation.
    pub fn range_to_head(&self) -> String
    {
        format!("{}..HEAD", self.name)
    }
}

/// A closed ticket from the issue tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue
{
    pub number:     u64,
    pub title:      String,
    pub labels:     BTreeSet<String>,
}

impl Issue
{
    pub fn has_label(&self, label: &str) -> bool
    {
        self.labels.contains(label)
    }
}

#[derive(Debug, Clone)]
pub struct Release
{
    pub version:    Version,
    pub notes:      String,
}
