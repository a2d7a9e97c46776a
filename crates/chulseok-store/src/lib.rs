//! Local persistence: run log (JSON lines), roster file, post capture files.

mod error;
pub use error::LocalStoreError;

pub mod capture;
pub mod roster;
pub mod runlog;

pub use capture::{FilePostSource, read_capture};
pub use roster::{ChallengeInfo, Roster};
pub use runlog::JsonlRunLog;
