//! Verification gates.
//!
//! A `Verification` wraps the outcome of one fallible step. A step counts as
//! successful only when it returned `Ok` *and* its value is truthy: an empty
//! string, a missing option or a `false` flag all fail the gate the same way
//! an error does.

use log::debug;

use super::error::ReleaseError;

/// Values that can pass or fail a gate on their own.
pub trait Truthy
{
    fn truthy(&self) -> bool;
}

impl Truthy for bool
{
    fn truthy(&self) -> bool
    {
        *self
    }
}

impl Truthy for String
{
    fn truthy(&self) -> bool
    {
        !self.trim().is_empty()
    }
}

impl<T: Truthy> Truthy for Option<T>
{
    fn truthy(&self) -> bool
    {
        self.as_ref().is_some_and(Truthy::truthy)
    }
}

impl Truthy for ()
{
    fn truthy(&self) -> bool
    {
        true
    }
}

#[derive(Debug)]
pub struct Verification<T>
{
    outcome: Result<T, ReleaseError>,
}

impl<T> Verification<T>
{
    // Ctor
    pub fn of(outcome: Result<T, ReleaseError>) -> Verification<T>
    {
        Verification { outcome }
    }

    pub fn failure(error: ReleaseError) -> Verification<T>
    {
        Verification { outcome: Err(error) }
    }

    /// Replace the failure with a more specific one. Successes pass through.
    pub fn map_failure(self, map: impl FnOnce(ReleaseError) -> ReleaseError) -> Verification<T>
    {
        Verification { outcome: self.outcome.map_err(map) }
    }

    /// Report the failure on stdout and hand it back to the caller, who is
    /// expected to stop the whole run with it.
    pub fn or_terminate(self) -> Result<T, ReleaseError>
    {
        if let Err(error) = &self.outcome
        {
            debug!("Release aborted: {:?}", error);
            println!("!! {}", error);
        }
        self.outcome
    }

    pub fn into_result(self) -> Result<T, ReleaseError>
    {
        self.outcome
    }
}

impl<T: Truthy> Verification<T>
{
    pub fn succeeds(&self) -> bool
    {
        matches!(&self.outcome, Ok(value) if value.truthy())
    }

    /// The wrapped value, or `fallback` when the step failed or came back empty.
    pub fn value_or(self, fallback: impl FnOnce() -> T) -> T
    {
        match self.outcome
        {
            Ok(value) if value.truthy() => value,
            _ => fallback(),
        }
    }

    /// Like `value_or`, but for fallbacks that can fail themselves.
    pub fn recover_with(self, fallback: impl FnOnce() -> Result<T, ReleaseError>) -> Verification<T>
    {
        match self.outcome
        {
            Ok(value) if value.truthy() => Verification::of(Ok(value)),
            _ => Verification::of(fallback()),
        }
    }

    /// Fail with `failure` when the step came back falsy, e.g. a non-zero exit.
    /// Underlying errors are kept as they are.
    pub fn ensure(self, failure: impl FnOnce() -> ReleaseError) -> Verification<T>
    {
        match self.outcome
        {
            Ok(value) if !value.truthy() => Verification::failure(failure()),
            other => Verification::of(other),
        }
    }

    /// Fail with `failure` when the step produced a truthy value, e.g. "the tag
    /// already exists". Underlying errors are kept as they are.
    pub fn ensure_not(self, failure: impl FnOnce() -> ReleaseError) -> Verification<T>
    {
        match self.outcome
        {
            Ok(value) if value.truthy() => Verification::failure(failure()),
            other => Verification::of(other),
        }
    }
}

#[test]
fn test_value_or_falls_back_on_empty_and_failure()
{
    let present = Verification::of(Ok("draft".to_string()));
    assert_eq!(present.value_or(|| "default".to_string()), "draft");

    let empty = Verification::of(Ok("  \n".to_string()));
    assert_eq!(empty.value_or(|| "default".to_string()), "default");

    let missing: Verification<Option<String>> = Verification::of(Ok(None));
    assert_eq!(missing.value_or(|| Some("default".to_string())), Some("default".to_string()));

    let failed: Verification<String> = Verification::failure(ReleaseError::EmptyNotesAborted);
    assert_eq!(failed.value_or(|| "default".to_string()), "default");
}

#[test]
fn test_recover_with_only_runs_when_needed()
{
    let mut calls = 0;
    let kept = Verification::of(Ok("draft".to_string())).recover_with(|| { calls += 1; Ok("built".to_string()) });
    assert_eq!(kept.into_result().unwrap(), "draft");
    assert_eq!(calls, 0);

    let rebuilt = Verification::of(Ok(String::new())).recover_with(|| Err(ReleaseError::IssueTrackerFailure("offline".to_string())));
    assert!(matches!(rebuilt.into_result(), Err(ReleaseError::IssueTrackerFailure(_))));
}

#[test]
fn test_gates()
{
    assert!(Verification::of(Ok(true)).succeeds());
    assert!(!Verification::of(Ok(false)).succeeds());
    assert!(!Verification::<bool>::failure(ReleaseError::EmptyNotesAborted).succeeds());

    let passed = Verification::of(Ok(false)).ensure_not(|| ReleaseError::TagAlreadyExists("1.0.0".to_string()));
    assert!(passed.into_result().is_ok());

    let rejected = Verification::of(Ok(true)).ensure_not(|| ReleaseError::TagAlreadyExists("1.0.0".to_string()));
    assert!(matches!(rejected.into_result(), Err(ReleaseError::TagAlreadyExists(v)) if v == "1.0.0"));

    let failed = Verification::of(Ok(false)).ensure(|| ReleaseError::EmptyNotesAborted);
    assert!(matches!(failed.or_terminate(), Err(ReleaseError::EmptyNotesAborted)));

    let kept = Verification::<bool>::failure(ReleaseError::git("tag", "locked")).ensure(|| ReleaseError::EmptyNotesAborted);
    assert!(matches!(kept.into_result(), Err(ReleaseError::GitOperationFailure { .. })));

    let remapped = Verification::<()>::failure(ReleaseError::git("push", "denied"))
        .map_failure(|error| ReleaseError::ReleaseCreationFailure(error.to_string()));
    assert!(matches!(remapped.into_result(), Err(ReleaseError::ReleaseCreationFailure(_))));
}

#[test]
fn test_or_terminate_hands_back_outcome()
{
    // Reported once on stdout; the caller decides how to stop.
    assert_eq!(Verification::of(Ok("1.2.0")).or_terminate().unwrap(), "1.2.0");

    let aborted = Verification::<()>::failure(ReleaseError::TestFailure { command: "npm test".to_string(), reason: "exit 1".to_string() });
    assert!(matches!(aborted.or_terminate(), Err(ReleaseError::TestFailure { command, .. }) if command == "npm test"));
}
