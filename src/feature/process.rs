use std::process::{Command, ExitStatus};

use log::{debug, info};

use crate::libs::{error::ReleaseError, notes::DraftNotes};

/// Something the pipeline runs and waits on, e.g. the test suite or the
/// registry publish.
pub trait CommandRunner
{
    fn describe(&self) -> &str;

    /// `Ok(true)` when the command exited zero. Output goes straight to the
    /// terminal.
    fn run(&self) -> Result<bool, ReleaseError>;
}

pub struct ShellCommand
{
    command: String,
}

impl ShellCommand
{
    pub fn new(command: &str) -> ShellCommand
    {
        ShellCommand { command: command.to_string() }
    }

    fn spawn(&self) -> std::io::Result<ExitStatus>
    {
        let mut shell = if cfg!(windows)
        {
            let mut shell = Command::new("cmd");
            shell.arg("/C");
            shell
        }
        else
        {
            let mut shell = Command::new("sh");
            shell.arg("-c");
            shell
        };
        shell.arg(&self.command).status()
    }
}

impl CommandRunner for ShellCommand
{
    fn describe(&self) -> &str
    {
        &self.command
    }

    fn run(&self) -> Result<bool, ReleaseError>
    {
        info!("Running: {}", self.command);
        match self.spawn()
        {
            Ok(status) =>
            {
                debug!("`{}` finished with {}", self.command, status);
                Ok(status.success())
            },
            Err(error) => Err(ReleaseError::io(format!("Unable to run `{}`", self.command), error)),
        }
    }
}

/// Hands the draft to a human.
pub trait Editor
{
    /// Write `initial` to the draft, let the user edit it, and return what they
    /// saved. `None` means they left it empty or abandoned the edit.
    fn edit(&self, draft: &DraftNotes, initial: &str) -> Result<Option<String>, ReleaseError>;
}

pub struct ExternalEditor
{
    program: String,
    args: Vec<String>,
}

impl ExternalEditor
{
    /// The configured editor, then `$VISUAL`, `$EDITOR`, and finally `vi`.
    pub fn discover(configured: Option<&str>) -> ExternalEditor
    {
        let command = configured.map(str::to_string)
            .or_else(|| std::env::var("VISUAL").ok())
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|command| !command.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        ExternalEditor::new(&command)
    }

    pub fn new(command: &str) -> ExternalEditor
    {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_else(|| "vi".to_string());
        ExternalEditor { program, args: words.collect() }
    }
}

impl Editor for ExternalEditor
{
    fn edit(&self, draft: &DraftNotes, initial: &str) -> Result<Option<String>, ReleaseError>
    {
        draft.write(initial)?;

        info!("Opening {} in {}", draft.path().display(), self.program);
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(draft.path())
            .status()
            .map_err(|error| ReleaseError::io(format!("Unable to start editor `{}`", self.program), error))?;

        if !status.success()
        {
            debug!("Editor exited with {}", status);
            return Ok(None);
        }

        Ok(draft.contents()?.filter(|contents| !contents.trim().is_empty()))
    }
}

#[test]
fn test_shell_command_status()
{
    assert!(ShellCommand::new("exit 0").run().unwrap());
    assert!(!ShellCommand::new("exit 3").run().unwrap());
    assert_eq!(ShellCommand::new("npm test").describe(), "npm test");
}

#[test]
fn test_editor_command_words()
{
    let editor = ExternalEditor::new("code --wait");
    assert_eq!(editor.program, "code");
    assert_eq!(editor.args, vec!["--wait".to_string()]);

    assert_eq!(ExternalEditor::discover(Some("nano")).program, "nano");
}

#[test]
fn test_missing_editor_is_reported()
{
    let dir = tempfile::tempdir().unwrap();
    let draft = DraftNotes::new(dir.path().join(".last-release-notes"));

    let result = ExternalEditor::new("cut-release-no-such-editor").edit(&draft, "notes");
    assert!(matches!(result, Err(ReleaseError::Io { context, .. }) if context.contains("cut-release-no-such-editor")));
}

#[cfg(unix)]
#[test]
fn test_external_editor_outcomes()
{
    let dir = tempfile::tempdir().unwrap();
    let draft = DraftNotes::new(dir.path().join(".last-release-notes"));

    // `true` saves the file untouched.
    let kept = ExternalEditor::new("true").edit(&draft, "**Notes**:\n- Bump deps").unwrap();
    assert_eq!(kept.as_deref(), Some("**Notes**:\n- Bump deps"));

    let emptied = ExternalEditor::new("cp /dev/null").edit(&draft, "**Notes**:\n- Bump deps").unwrap();
    assert_eq!(emptied, None);

    let abandoned = ExternalEditor::new("false").edit(&draft, "anything").unwrap();
    assert_eq!(abandoned, None);

    // Nothing synthesized and nothing typed.
    assert_eq!(ExternalEditor::new("true").edit(&draft, "").unwrap(), None);
}
