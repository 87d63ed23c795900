//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use stormscout::features::EncodeError;
use stormscout::service::ServiceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Discovery or descent failed
    Scrape(ServiceError),
    /// Collected records could not be encoded as GeoJSON
    Encode(EncodeError),
    /// Output serialization failed
    Serialize(serde_json::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        if let CliError::Scrape(ServiceError::Config(_)) = self {
            eprintln!();
            eprintln!("Check that the instance and view identifiers match a live");
            eprintln!("Storm Center deployment (they appear in the outage map URL).");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Scrape(e) => write!(f, "Scrape failed: {}", e),
            CliError::Encode(e) => write!(f, "Failed to encode GeoJSON: {}", e),
            CliError::Serialize(e) => write!(f, "Failed to serialize output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Scrape(e) => Some(e),
            CliError::Encode(e) => Some(e),
            CliError::Serialize(e) => Some(e),
        }
    }
}
