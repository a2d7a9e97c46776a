//! Sync layer: spreadsheet values API (tabular store) and HTTP post fetcher.

#[cfg(feature = "http")]
mod error;
#[cfg(feature = "http")]
pub mod posts;
#[cfg(feature = "http")]
pub mod sheets;

#[cfg(feature = "http")]
pub use error::SyncError;
#[cfg(feature = "http")]
pub use posts::HttpPostSource;
#[cfg(feature = "http")]
pub use sheets::SheetsClient;
