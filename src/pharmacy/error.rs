use thiserror::Error;

#[derive(Debug, Error)]
pub enum PharmacyApiError {
    /// The API answered with a non-2xx status.
    #[error("pharmacy API returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("pharmacy API unreachable: {0}")]
    Network(String),

    #[error("malformed pharmacy API response: {0}")]
    Malformed(String),

    #[error("pharmacy API misconfigured: {0}")]
    Configuration(String),
}

impl PharmacyApiError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PharmacyApiError::Http { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            PharmacyApiError::Network(_) => true,
            PharmacyApiError::Malformed(_) | PharmacyApiError::Configuration(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PharmacyApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PharmacyApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PharmacyApiError::Malformed(err.to_string())
        } else if err.is_builder() {
            PharmacyApiError::Configuration(err.to_string())
        } else {
            PharmacyApiError::Network(err.to_string())
        }
    }
}
