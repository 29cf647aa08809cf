// Errors raised while loading and parsing source files
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid date format: {0}")]
    InvalidDate(String),

    #[error("invalid ISO week format: {0}")]
    InvalidIsoWeek(String),

    #[error("invalid Czech week format: {0}")]
    InvalidCzechWeek(String),

    #[error("source file {path} has no header row")]
    MissingHeader { path: String },

    #[error("source file {path} not found and downloads are disabled")]
    NotAvailable { path: String },

    #[error("download of {url} failed with status {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SourceError::InvalidIsoWeek("2025-1".to_string()).to_string(),
            "invalid ISO week format: 2025-1"
        );
        assert_eq!(
            SourceError::DownloadFailed { url: "https://x/y.csv".to_string(), status: 404 }.to_string(),
            "download of https://x/y.csv failed with status 404"
        );
    }
}
