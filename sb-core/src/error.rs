use thiserror::Error;

/// Typed error surface at the component boundary, mapping 1:1 to spec
/// §7's error kinds so the HTTP façade can translate to a status code
/// without inspecting message text.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("network has no edges")]
    EmptyNetwork,

    #[error("degenerate partition: {0}")]
    Degenerate(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidBoundingBox(_) => 400,
            Error::UpstreamUnavailable(_) => 502,
            Error::Timeout(_) => 504,
            Error::EmptyNetwork => 200,
            Error::Degenerate(_) => 200,
            Error::Internal(_) => 500,
        }
    }

    /// CLI exit codes per spec §6.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidBoundingBox(_) => 1,
            Error::UpstreamUnavailable(_) | Error::Timeout(_) => 2,
            Error::EmptyNetwork | Error::Degenerate(_) => 0,
            Error::Internal(_) => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
