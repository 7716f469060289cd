//! Google API plumbing shared by the queue and evidence backends

pub mod auth;

pub use auth::{ServiceAccountKey, TokenProvider};

/// Sheets API root
pub const SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com";

/// Drive API root (metadata and permissions)
pub const DRIVE_API_BASE_URL: &str = "https://www.googleapis.com";
