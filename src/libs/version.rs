use std::fmt::Display;
use std::path::{Path, PathBuf};

use log::debug;

use super::error::ReleaseError;

/// The version being released, exactly as the manifest spells it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(String);

impl Version
{
    // Ctor
    pub fn new(version: &str) -> Option<Version>
    {
        let version = version.trim();
        if version.is_empty()
        {
            return None;
        }
        Some(Version(version.to_string()))
    }

    pub fn as_str(&self) -> &str
    {
        &self.0
    }

    // Parse
    pub fn parse_manifest(contents: &str) -> Option<Version>
    {
        let pattern = regex::Regex::new(r#""version"\s*:\s*"([^"]*)""#).ok()?;
        let captures = pattern.captures(contents)?;
        Version::new(captures.get(1)?.as_str())
    }
}

impl Display for Version
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Where the version to release comes from.
pub trait ManifestReader
{
    fn version(&self) -> Result<Version, ReleaseError>;
}

/// A `package.json`-style manifest with a `"version": "<value>"` field.
pub struct PackageManifest
{
    path: PathBuf,
}

impl PackageManifest
{
    pub fn new(path: impl AsRef<Path>) -> PackageManifest
    {
        PackageManifest { path: path.as_ref().to_path_buf() }
    }
}

impl ManifestReader for PackageManifest
{
    fn version(&self) -> Result<Version, ReleaseError>
    {
        let missing = || ReleaseError::MissingVersion { manifest: self.path.display().to_string() };

        let contents = std::fs::read_to_string(&self.path).map_err(|error| {
            debug!("Unable to read manifest {}: {}", self.path.display(), error);
            missing()
        })?;

        Version::parse_manifest(&contents).ok_or_else(missing)
    }
}

#[test]
fn test_parse_manifest()
{
    let manifest = r#"{
  "name": "ps4-waker",
  "version": "2.1.0",
  "description": "Wake your PS4"
}"#;
    assert_eq!(Version::parse_manifest(manifest), Version::new("2.1.0"));
    assert_eq!(Version::parse_manifest(r#"{"version":"1.0.0-beta.1","main":"index.js"}"#).unwrap().as_str(), "1.0.0-beta.1");
    assert_eq!(Version::parse_manifest(r#"{"name": "nothing"}"#), None);
    assert_eq!(Version::parse_manifest(r#"{"version": ""}"#), None);
}

#[test]
fn test_package_manifest()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.json");

    let missing = PackageManifest::new(&path).version();
    assert!(matches!(missing, Err(ReleaseError::MissingVersion { .. })));

    std::fs::write(&path, "{\n  \"version\": \"2.1.0\"\n}\n").unwrap();
    assert_eq!(PackageManifest::new(&path).version().unwrap().to_string(), "2.1.0");
}
