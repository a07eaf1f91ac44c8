use std::path::PathBuf;

use clap::Parser;
use log::{debug, info};

use cut_release::{
    feature::{
        pipeline::{Collaborators, PipelineOptions, ReleasePipeline},
        process::{ExternalEditor, ShellCommand},
        release,
        vcs::GitRepository,
    },
    libs::{
        data::ReleaseData,
        error::ReleaseError,
        notes::DraftNotes,
        release::Release,
        verify::Verification,
        version::PackageManifest,
    },
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Release configuration, relative to the repository.
    #[arg(short, long, default_value = ".release.json")]
    config: PathBuf,

    #[arg(short, long, default_value = ".")]
    repository: PathBuf,

    /// Stop after the notes are edited; publish, tag and release nothing.
    #[arg(long, action)]
    dry_run: bool,

    #[arg(short, long, action)]
    verbose: bool,
}

fn main() {
    // Parse the command line arguments
    let args = Args::parse();

    // Initialize the logger, while in debug mode, log everything; otherwise, log only errors, warnings and info.
    let level = if cfg!(debug_assertions)
    {
        log::LevelFilter::max()
    }
    else if args.verbose
    {
        log::LevelFilter::Debug
    }
    else
    {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run_release(&args)
    {
        Ok(release) if args.dry_run => println!("Dry run complete for {}; notes kept for the real release.", release.version),
        Ok(release) => println!("Done! Published {}", release.version),
        Err(error) => terminate(error),
    }
}

/// Every aborted step ends here. The message was already printed where the
/// failure was detected.
fn terminate(error: ReleaseError) -> !
{
    debug!("Exiting after: {:?}", error);
    std::process::exit(1);
}

fn run_release(args: &Args) -> Result<Release, ReleaseError>
{
    Verification::of(std::env::set_current_dir(&args.repository)
        .map_err(|error| ReleaseError::io(format!("Unable to enter {}", args.repository.display()), error)))
        .or_terminate()?;

    let data = Verification::of(ReleaseData::load(&args.config)).or_terminate()?;

    let git = Verification::of(GitRepository::open(".")).or_terminate()?;
    let remote_url = git.remote_url(&data.remote);
    let host = Verification::of(release::connect(&data, remote_url.as_deref())).or_terminate()?;

    let manifest = PackageManifest::new(&data.manifest);
    let tests = ShellCommand::new(&data.test_command);
    let publisher = ShellCommand::new(&data.publish_command);
    let editor = ExternalEditor::discover(data.editor.as_deref());

    info!("Releasing {} from {}", data.manifest, args.repository.display());

    let collaborators = Collaborators {
        manifest: &manifest,
        vcs: &git,
        tracker: &host,
        tests: &tests,
        editor: &editor,
        publisher: &publisher,
        releases: &host,
    };

    ReleasePipeline::new(collaborators, DraftNotes::new(&data.notes_file), PipelineOptions::from_data(&data, args.dry_run)).run()
}

#[test]
fn test_args_defaults()
{
    let args = Args::try_parse_from(["cut-release"]).unwrap();
    assert_eq!(args.config, PathBuf::from(".release.json"));
    assert_eq!(args.repository, PathBuf::from("."));
    assert!(!args.dry_run);

    let args = Args::try_parse_from(["cut-release", "--dry-run", "-r", "../ps4-waker"]).unwrap();
    assert!(args.dry_run);
    assert_eq!(args.repository, PathBuf::from("../ps4-waker"));
}
