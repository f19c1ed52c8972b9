use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),
    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary track error: {0}")]
    Binary(#[from] bincode::Error),
    #[error("unsupported track file version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("unknown track file format: {0}")]
    UnknownFormat(String),
    #[error("invalid extraction parameters: {0}")]
    InvalidParams(String),
    #[error("invalid track mask: {0}")]
    InvalidMask(String),
    #[error("no drivable sample found on the mask")]
    SeedNotFound,
    #[error("waypoint index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, TrackError>;
