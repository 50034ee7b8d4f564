//! Error taxonomy for the fetch → enrich → render loop.
//!
//! Only [`BootstrapError`] and a first-page [`SourceError`] ever reach the
//! user (wrapped in [`ViewError`]).  Everything else is logged and absorbed
//! by the scheduler.
//!
//! Every type here is `Clone` so that [`crate::scheduler::SchedulerState`]
//! can be snapshotted and handed to the UI thread.

use thiserror::Error;

/// Credentials or session configuration could not be obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    /// The credential endpoint answered with a non-success status.
    #[error("credential endpoint returned HTTP {status}")]
    Status { status: u16 },

    /// The request never produced a response (DNS, refused, timeout).
    #[error("credential request failed: {0}")]
    Network(String),

    /// The response arrived but could not be decoded.
    #[error("credential response is malformed: {0}")]
    Decode(String),

    /// The backend explicitly refused to hand out credentials.
    #[error("backend refused credentials: {0}")]
    Rejected(String),
}

/// A page request against an [`crate::source::ItemSource`] failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("page {page}: HTTP {status}")]
    Status { page: u32, status: u16 },

    #[error("page {page}: request failed: {message}")]
    Network { page: u32, message: String },

    #[error("page {page}: malformed response: {message}")]
    Decode { page: u32, message: String },
}

impl SourceError {
    /// Page number the failed request was for.
    pub fn page(&self) -> u32 {
        match self {
            SourceError::Status { page, .. }
            | SourceError::Network { page, .. }
            | SourceError::Decode { page, .. } => *page,
        }
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a transport-level `reqwest` failure for `page`.
    pub fn from_reqwest(page: u32, err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::Status {
                page,
                status: status.as_u16(),
            },
            // A timeout is a network failure whatever stage it hit.
            None if err.is_timeout() => SourceError::Network {
                page,
                message: err.to_string(),
            },
            None if err.is_decode() => SourceError::Decode {
                page,
                message: err.to_string(),
            },
            None => SourceError::Network {
                page,
                message: err.to_string(),
            },
        }
    }
}

/// One auxiliary read for one item failed.  Always absorbed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("{item}/{field}: HTTP {status}")]
    Status {
        item: String,
        field: String,
        status: u16,
    },

    #[error("{item}/{field}: request failed: {message}")]
    Network {
        item: String,
        field: String,
        message: String,
    },

    #[error("{item}/{field}: cannot decode content: {message}")]
    Decode {
        item: String,
        field: String,
        message: String,
    },
}

impl EnrichmentError {
    pub fn from_reqwest(item: &str, field: &str, err: reqwest::Error) -> Self {
        let (item, field) = (item.to_string(), field.to_string());
        match err.status() {
            Some(status) => EnrichmentError::Status {
                item,
                field,
                status: status.as_u16(),
            },
            None if err.is_timeout() => EnrichmentError::Network {
                item,
                field,
                message: err.to_string(),
            },
            None if err.is_decode() => EnrichmentError::Decode {
                item,
                field,
                message: err.to_string(),
            },
            None => EnrichmentError::Network {
                item,
                field,
                message: err.to_string(),
            },
        }
    }
}

/// The one user-visible failure of a page view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("could not connect: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("could not load the first page: {0}")]
    FirstPage(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_exposes_page_and_status() {
        let err = SourceError::Status {
            page: 3,
            status: 403,
        };
        assert_eq!(err.page(), 3);
        assert_eq!(err.status(), Some(403));

        let err = SourceError::Network {
            page: 1,
            message: "timed out".into(),
        };
        assert_eq!(err.status(), None);
    }

    #[test]
    fn view_error_messages_mention_the_cause() {
        let err: ViewError = BootstrapError::Rejected("bad token".into()).into();
        assert_eq!(
            err.to_string(),
            "could not connect: backend refused credentials: bad token"
        );

        let err: ViewError = SourceError::Status {
            page: 1,
            status: 500,
        }
        .into();
        assert!(err.to_string().contains("HTTP 500"));
    }
}
