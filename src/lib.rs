//! Cut a release: verify, test, write the notes, publish, tag, and announce.

pub mod feature;
pub mod libs;
