use thiserror::Error;

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid region name: {0:?}")]
    InvalidRegionName(String),

    #[error("Cache storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Maximum length for response bodies quoted in fetch errors
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl CacheError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    /// Build the error reported when a priming fetch answers with a non-2xx status.
    pub fn from_status(url: &str, status: u16, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        let reason = if truncated.is_empty() {
            format!("status {}", status)
        } else {
            format!("status {}: {}", status, truncated)
        };
        CacheError::Fetch {
            url: url.to_string(),
            reason,
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, CacheError::Fetch { .. })
    }
}
