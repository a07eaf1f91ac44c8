pub mod notes;
pub mod pipeline;
pub mod process;
pub mod release;
pub mod vcs;
