pub mod data;
pub mod error;
pub mod notes;
pub mod release;
pub mod verify;
pub mod version;
